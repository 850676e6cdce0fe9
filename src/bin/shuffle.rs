use std::env;
use std::io::{self, BufWriter};

use glove_prep::{init_logging, Config, Shuffle};

// standalone shuffler: binary cooccurrence records on stdin, the same
// records uniformly permuted on stdout

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() == 1 {
        println!("Tool to shuffle entries of word-word cooccurrence files");
        println!();
        println!("Usage: shuffle <config.json> < cooccurrence.bin > cooccurrence.shuf.bin");
        println!();
        println!("Relevant json keys:");
        println!("\tverbose: 0, 1 or 2 (default 2)");
        println!("\tshuffle.memory_limit: soft memory bound in GB (default 4.0)");
        println!("\tshuffle.array_size: override of the chunk buffer length");
        println!("\tshuffle.temp_file: prefix for temporary files (default temp_shuffle)");
        println!("\tshuffle.seed: seed of the random source (default 1)");
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
    if let Err(e) = Shuffle::run(&mut stdin.lock(), &mut output, &params.shuffle) {
        panic!("{}", e);
    }
}
