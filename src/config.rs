

use log::LevelFilter;
use serde_json::Value;
use std::{error::Error, fmt::Display, fs};

#[derive(Clone, Debug)]
pub struct VocabParams {
    pub min_count: i64,
    pub max_vocab: i64,
}

impl Display for VocabParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "vocab parameters:
        min_count: {},
        max_vocab: {}",
            self.min_count, self.max_vocab
        )
    }
}

#[derive(Clone, Debug)]
pub struct CoocParams {
    pub window_size: usize,
    pub symmetric: bool,
    pub memory_limit: f64,
    pub max_product: Option<i64>,
    pub overflow_length: Option<usize>,
    pub overflow_file: String,
    pub vocab_file: String,
}

impl Display for CoocParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cooccur parameters:
        window_size: {},
        symmetric: {},
        memory_limit: {},
        max_product: {:?},
        overflow_length: {:?},
        overflow_file: {},
        vocab_file: {}",
            self.window_size,
            self.symmetric,
            self.memory_limit,
            self.max_product,
            self.overflow_length,
            self.overflow_file,
            self.vocab_file
        )
    }
}

#[derive(Clone, Debug)]
pub struct ShuffleParams {
    pub memory_limit: f64,
    pub array_size: Option<usize>,
    pub temp_file: String,
    pub seed: u64,
}

impl Display for ShuffleParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "shuffle parameters:
        memory_limit: {},
        array_size: {:?},
        temp_file: {},
        seed: {}",
            self.memory_limit, self.array_size, self.temp_file, self.seed
        )
    }
}

#[derive(Clone, Debug)]
pub struct PipelineParams {
    pub corpus_file: Option<String>,
    pub output_dir: Option<String>,
    pub verbose: u8,
    pub vocab: VocabParams,
    pub cooccur: CoocParams,
    pub shuffle: ShuffleParams,
}

impl Display for PipelineParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "using parameters:
        corpus_file: {:?}
        output_dir: {:?}
        verbose: {}
        Using {}
        Using {}
        Using {}",
            self.corpus_file, self.output_dir, self.verbose, self.vocab, self.cooccur, self.shuffle
        )
    }
}

pub struct Config {
    params: PipelineParams,
}

impl Config {
    pub fn get_params(&self) -> PipelineParams {
        self.params.clone()
    }

    pub fn new(args: &[String]) -> Result<Config, Box<dyn Error>> {
        if args.len() != 2 {
            return Err("input should be a path to a json file only".to_string().into());
        }

        // parse input json
        let f = fs::File::open(&args[1]).map_err(|e| format!("cannot open json file: {}", e))?;
        let json: Value =
            serde_json::from_reader(f).map_err(|e| format!("cannot read json file: {}", e))?;

        // paths are only required by the pipeline binary, the stage
        // binaries work over stdin and stdout
        let corpus_file = match json.get("corpus_file") {
            Some(v) => Some(
                v.as_str()
                    .ok_or("cannot cast corpus_file to string")?
                    .to_owned(),
            ),
            None => None,
        };
        let output_dir = match json.get("output_dir") {
            Some(v) => Some(
                v.as_str()
                    .ok_or("cannot cast output_dir to string")?
                    .to_owned(),
            ),
            None => None,
        };

        let verbose = match json.get("verbose") {
            Some(v) => v.as_i64().ok_or("given verbose is not numeric")? as u8,
            None => 2,
        };

        let empty = Value::Object(serde_json::Map::new());

        // handle default vs input parameters, section by section
        let vocab_json = json.get("vocab").unwrap_or(&empty);
        let min_count = match vocab_json.get("min_count") {
            Some(v) => v.as_i64().ok_or("given min_count is not numeric")?,
            None => 1,
        };
        if min_count < 1 {
            return Err("min_count must be at least 1".to_string().into());
        }
        let max_vocab = match vocab_json.get("max_vocab") {
            Some(v) => v.as_i64().ok_or("given max_vocab is not numeric")?,
            None => 0,
        };
        if max_vocab < 0 {
            return Err("max_vocab must be non-negative".to_string().into());
        }

        let cooccur_json = json.get("cooccur").unwrap_or(&empty);
        let window_size = match cooccur_json.get("window_size") {
            Some(v) => v.as_i64().ok_or("given window_size is not numeric")?,
            None => 15,
        };
        if window_size < 1 {
            return Err("window_size must be at least 1".to_string().into());
        }
        let symmetric = match cooccur_json.get("symmetric") {
            Some(v) => v.as_i64().ok_or("given symmetric is not numeric")? != 0,
            None => true,
        };
        let cooccur_memory = match cooccur_json.get("memory_limit") {
            Some(v) => v.as_f64().ok_or("given memory_limit is not numeric")?,
            None => 4.0,
        };
        let max_product = match cooccur_json.get("max_product") {
            Some(v) => Some(v.as_i64().ok_or("given max_product is not numeric")?),
            None => None,
        };
        let overflow_length = match cooccur_json.get("overflow_length") {
            Some(v) => Some(v.as_i64().ok_or("given overflow_length is not numeric")? as usize),
            None => None,
        };
        let overflow_file = match cooccur_json.get("overflow_file") {
            Some(v) => v
                .as_str()
                .ok_or("cannot cast overflow_file to string")?
                .to_owned(),
            None => "overflow".to_owned(),
        };
        let vocab_file = match cooccur_json.get("vocab_file") {
            Some(v) => v
                .as_str()
                .ok_or("cannot cast vocab_file to string")?
                .to_owned(),
            None => "vocab.txt".to_owned(),
        };

        let shuffle_json = json.get("shuffle").unwrap_or(&empty);
        let shuffle_memory = match shuffle_json.get("memory_limit") {
            Some(v) => v.as_f64().ok_or("given memory_limit is not numeric")?,
            None => 4.0,
        };
        let array_size = match shuffle_json.get("array_size") {
            Some(v) => Some(v.as_i64().ok_or("given array_size is not numeric")? as usize),
            None => None,
        };
        let temp_file = match shuffle_json.get("temp_file") {
            Some(v) => v
                .as_str()
                .ok_or("cannot cast temp_file to string")?
                .to_owned(),
            None => "temp_shuffle".to_owned(),
        };
        let seed = match shuffle_json.get("seed") {
            Some(v) => v.as_u64().ok_or("given seed is not numeric")?,
            None => 1,
        };

        let params = PipelineParams {
            corpus_file,
            output_dir,
            verbose,
            vocab: VocabParams {
                min_count,
                max_vocab,
            },
            cooccur: CoocParams {
                window_size: window_size as usize,
                symmetric,
                memory_limit: cooccur_memory,
                max_product,
                overflow_length,
                overflow_file,
                vocab_file,
            },
            shuffle: ShuffleParams {
                memory_limit: shuffle_memory,
                array_size,
                temp_file,
                seed,
            },
        };

        Ok(Self { params })
    }
}

// map the configured verbosity onto the logger: 0 warnings only,
// 1 stage banners, 2 progress counters as well
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .try_init();
}

#[cfg(test)]
mod tests {

    use super::Config;
    use std::io::Write;

    fn parse(json: &str) -> super::PipelineParams {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("args.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(json.as_bytes()).unwrap();
        drop(f);

        let args = vec![
            "glove-prep".to_string(),
            path.to_str().unwrap().to_string(),
        ];
        match Config::new(&args) {
            Ok(config) => config.get_params(),
            Err(e) => panic!("{}", e),
        }
    }

    #[test]
    fn defaults_test() {
        let params = parse("{}");
        assert_eq!(params.verbose, 2);
        assert_eq!(params.vocab.min_count, 1);
        assert_eq!(params.vocab.max_vocab, 0);
        assert_eq!(params.cooccur.window_size, 15);
        assert!(params.cooccur.symmetric);
        assert_eq!(params.cooccur.memory_limit, 4.0);
        assert_eq!(params.cooccur.max_product, None);
        assert_eq!(params.cooccur.overflow_file, "overflow");
        assert_eq!(params.cooccur.vocab_file, "vocab.txt");
        assert_eq!(params.shuffle.memory_limit, 4.0);
        assert_eq!(params.shuffle.temp_file, "temp_shuffle");
        assert_eq!(params.shuffle.seed, 1);
    }

    #[test]
    fn overrides_test() {
        let params = parse(
            r#"{
                "corpus_file": "corpus.txt",
                "output_dir": "out",
                "verbose": 0,
                "vocab": {"min_count": 5, "max_vocab": 100000},
                "cooccur": {"window_size": 10, "symmetric": 0, "memory_limit": 8.0,
                            "max_product": 4000, "overflow_length": 12345,
                            "overflow_file": "tempoverflow", "vocab_file": "v.txt"},
                "shuffle": {"memory_limit": 2.0, "array_size": 777, "temp_file": "ts", "seed": 42}
            }"#,
        );
        assert_eq!(params.corpus_file.as_deref(), Some("corpus.txt"));
        assert_eq!(params.output_dir.as_deref(), Some("out"));
        assert_eq!(params.vocab.min_count, 5);
        assert_eq!(params.vocab.max_vocab, 100000);
        assert_eq!(params.cooccur.window_size, 10);
        assert!(!params.cooccur.symmetric);
        assert_eq!(params.cooccur.max_product, Some(4000));
        assert_eq!(params.cooccur.overflow_length, Some(12345));
        assert_eq!(params.cooccur.overflow_file, "tempoverflow");
        assert_eq!(params.cooccur.vocab_file, "v.txt");
        assert_eq!(params.shuffle.array_size, Some(777));
        assert_eq!(params.shuffle.temp_file, "ts");
        assert_eq!(params.shuffle.seed, 42);
    }

    #[test]
    fn rejects_zero_window_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("args.json");
        std::fs::write(&path, r#"{"cooccur": {"window_size": 0}}"#).unwrap();
        let args = vec![
            "glove-prep".to_string(),
            path.to_str().unwrap().to_string(),
        ];
        assert!(Config::new(&args).is_err());
    }
}
