
use std::io::{self, BufRead};

// tokens longer than this are truncated, the excess bytes are dropped
pub const MAX_TOKEN_LENGTH: usize = 1000;

// what one call to next_token produced. A newline with no pending
// token bytes is reported as a line break so that callers can reset
// their window state; a token flushed at end of line re-delivers the
// line break on the following call.
#[derive(Debug, PartialEq)]
pub enum Token {
    Word(Vec<u8>),
    LineBreak,
    Eof,
}

// streaming whitespace tokenizer over an arbitrary byte source.
// Tokens are opaque byte runs delimited by space, tab or newline;
// carriage returns are discarded.
pub struct Tokenizer<R: BufRead> {
    input: R,
    pending_newline: bool,
}

impl<R: BufRead> Tokenizer<R> {
    pub fn new(input: R) -> Tokenizer<R> {
        Tokenizer {
            input,
            pending_newline: false,
        }
    }

    pub fn next_token(&mut self) -> io::Result<Token> {
        if self.pending_newline {
            self.pending_newline = false;
            return Ok(Token::LineBreak);
        }

        let mut word: Vec<u8> = Vec::new();
        loop {
            let byte = match self.read_byte()? {
                Some(b) => b,
                None => break,
            };
            match byte {
                b'\r' => continue,
                b' ' | b'\t' => {
                    if !word.is_empty() {
                        break;
                    }
                }
                b'\n' => {
                    if word.is_empty() {
                        return Ok(Token::LineBreak);
                    }
                    self.pending_newline = true;
                    break;
                }
                b => {
                    if word.len() < MAX_TOKEN_LENGTH {
                        word.push(b);
                    }
                }
            }
        }

        if word.is_empty() {
            return Ok(Token::Eof);
        }
        Ok(Token::Word(word))
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let buf = self.input.fill_buf()?;
        if buf.is_empty() {
            return Ok(None);
        }
        let byte = buf[0];
        self.input.consume(1);
        Ok(Some(byte))
    }
}
