use std::env;
use std::io::{self, BufWriter};

use glove_prep::{init_logging, Config, VocabCount};

// standalone vocabulary builder: whitespace tokenized corpus on
// stdin, ranked "word count" lines on stdout

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() == 1 {
        println!("Tool to extract unigram counts from a tokenized corpus");
        println!();
        println!("Usage: vocab_count <config.json> < corpus.txt > vocab.txt");
        println!();
        println!("Relevant json keys:");
        println!("\tverbose: 0, 1 or 2 (default 2)");
        println!("\tvocab.max_vocab: keep only the most frequent words, 0 for no limit (default 0)");
        println!("\tvocab.min_count: discard words occurring fewer times (default 1)");
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
    if let Err(e) = VocabCount::run(stdin.lock(), &mut output, &params.vocab) {
        panic!("{}", e);
    }
}
