use std::env;
use std::io::{self, BufWriter};

use glove_prep::{init_logging, Config, Cooccur};

// standalone cooccurrence counter: tokenized corpus on stdin, sorted
// duplicate-free binary records on stdout

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() == 1 {
        println!("Tool to calculate word-word cooccurrence statistics");
        println!();
        println!("Usage: cooccur <config.json> < corpus.txt > cooccurrence.bin");
        println!();
        println!("Relevant json keys:");
        println!("\tverbose: 0, 1 or 2 (default 2)");
        println!("\tcooccur.symmetric: 0 for left context only, 1 for both sides (default 1)");
        println!("\tcooccur.window_size: context words to each side (default 15)");
        println!("\tcooccur.vocab_file: vocabulary produced by vocab_count (default vocab.txt)");
        println!("\tcooccur.memory_limit: soft memory bound in GB (default 4.0)");
        println!("\tcooccur.max_product: override of the dense-region cutoff");
        println!("\tcooccur.overflow_length: override of the overflow buffer size");
        println!("\tcooccur.overflow_file: prefix for temporary files (default overflow)");
        return;
    }

    let params = match Config::new(&args) {
        Ok(config) => config.get_params(),
        Err(e) => panic!("{}", e),
    };
    init_logging(params.verbose);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut output = BufWriter::new(stdout.lock());
    if let Err(e) = Cooccur::run(stdin.lock(), &mut output, &params.cooccur) {
        panic!("{}", e);
    }
}
