use std::env;

use glove_prep::{init_logging, Config, Pipeline};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() == 1 {
        println!("Pipeline turning a tokenized corpus into shuffled cooccurrence records");
        println!();
        println!("Usage: glove-prep <config.json>");
        println!();
        println!("Required json keys:");
        println!("\tcorpus_file: path to the whitespace tokenized corpus");
        println!("\toutput_dir: directory for vocab.txt, cooccurrence.bin and cooccurrence.shuf.bin");
        println!("Optional sections with their defaults:");
        println!("\tverbose: 0, 1 or 2 (default 2)");
        println!("\tvocab: {{min_count: 1, max_vocab: 0}}");
        println!("\tcooccur: {{window_size: 15, symmetric: 1, memory_limit: 4.0, overflow_file: \"overflow\"}}");
        println!("\tshuffle: {{memory_limit: 4.0, temp_file: \"temp_shuffle\", seed: 1}}");
        return;
    }

    let params = match Config::new(&args) {
        Ok(config) => config.get_params(),
        Err(e) => panic!("{}", e),
    };
    init_logging(params.verbose);

    if let Err(e) = Pipeline::run(&params) {
        panic!("{}", e);
    }
}
