
mod config;
mod cooccur;
mod hashing;
mod pipeline;
mod records;
mod shuffle;
mod tokens;
mod vocab;

pub use config::{init_logging, Config, CoocParams, PipelineParams, ShuffleParams, VocabParams};
pub use cooccur::Cooccur;
pub use pipeline::Pipeline;
pub use records::{run_file_name, CoocRec, RECORD_SIZE};
pub use shuffle::Shuffle;
pub use tokens::{Token, Tokenizer};
pub use vocab::VocabCount;
