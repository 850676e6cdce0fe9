
use log::{debug, info};
use std::error::Error;
use std::io::{BufRead, Write};

use crate::config::VocabParams;
use crate::hashing::WordTable;
use crate::tokens::{Token, Tokenizer};

pub struct VocabCount {}

impl VocabCount {
    // streams whitespace separated tokens from the input, counts them
    // in the hash table and emits "word count" lines ranked by
    // descending count with alphabetic tie breaks. Returns the number
    // of emitted entries, which is the vocabulary size the downstream
    // stages will see.
    pub fn run<R: BufRead, W: Write>(
        input: R,
        output: &mut W,
        params: &VocabParams,
    ) -> Result<u64, Box<dyn Error>> {
        info!("building vocabulary");

        let mut table = WordTable::new();
        let mut tokenizer = Tokenizer::new(input);
        let mut processed: u64 = 0;
        loop {
            match tokenizer.next_token()? {
                Token::Word(word) => {
                    if word.as_slice() == b"<unk>" {
                        return Err(
                            "<unk> found in corpus, the token is reserved; please remove it"
                                .to_string()
                                .into(),
                        );
                    }
                    table.add(&word);
                    processed += 1;
                    if processed % 100_000 == 0 {
                        debug!("processed {} tokens", processed);
                    }
                }
                Token::LineBreak => continue,
                Token::Eof => break,
            }
        }
        info!(
            "processed {} tokens, counted {} unique words",
            processed,
            table.len()
        );

        let mut vocab = table.into_entries();
        let unique = vocab.len() as i64;

        // when the vocabulary exceeds the cap, first sort by bare count
        // so that equal-count words at the cut boundary end up in an
        // order that scatters them over the alphabet, then truncate
        let mut max_vocab = params.max_vocab;
        if max_vocab > 0 && max_vocab < unique {
            vocab.sort_unstable_by(|a, b| b.1.cmp(&a.1));
            vocab.truncate(max_vocab as usize);
        } else {
            max_vocab = unique;
        }
        vocab.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut emitted: i64 = 0;
        for (word, count) in &vocab {
            if *count < params.min_count {
                info!("truncating vocabulary at min count {}", params.min_count);
                break;
            }
            output.write_all(word)?;
            writeln!(output, " {}", count)?;
            emitted += 1;
        }
        if emitted == max_vocab && max_vocab < unique {
            info!("truncating vocabulary at size {}", max_vocab);
        }
        output.flush()?;
        info!("using vocabulary of size {}", emitted);

        Ok(emitted as u64)
    }
}
