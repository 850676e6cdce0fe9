
use std::io::{self, Read, Write};

// A single cooccurrence record as it travels between the pipeline
// stages, on disk and on pipes: two 1-based frequency ranks and the
// accumulated weight. The layout is fixed (i32, i32, f64) in host
// byte order, so the format is not portable across architectures.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoocRec {
    pub word1: i32,
    pub word2: i32,
    pub val: f64,
}

// on-disk size of one record
pub const RECORD_SIZE: usize = 16;

impl CoocRec {
    pub fn new(word1: i32, word2: i32, val: f64) -> CoocRec {
        CoocRec { word1, word2, val }
    }

    pub fn key(&self) -> (i32, i32) {
        (self.word1, self.word2)
    }

    pub fn write_into<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let mut buf = [0u8; RECORD_SIZE];
        buf[0..4].copy_from_slice(&self.word1.to_ne_bytes());
        buf[4..8].copy_from_slice(&self.word2.to_ne_bytes());
        buf[8..16].copy_from_slice(&self.val.to_ne_bytes());
        out.write_all(&buf)
    }

    // reads one record. Ok(None) marks a clean end of stream, a stream
    // that ends inside a record is an error
    pub fn read_from<R: Read>(input: &mut R) -> io::Result<Option<CoocRec>> {
        let mut buf = [0u8; RECORD_SIZE];
        let mut filled = 0;
        while filled < RECORD_SIZE {
            let n = input.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled < RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "truncated cooccurrence record",
            ));
        }
        let mut word = [0u8; 4];
        word.copy_from_slice(&buf[0..4]);
        let word1 = i32::from_ne_bytes(word);
        word.copy_from_slice(&buf[4..8]);
        let word2 = i32::from_ne_bytes(word);
        let mut val = [0u8; 8];
        val.copy_from_slice(&buf[8..16]);
        Ok(Some(CoocRec::new(word1, word2, f64::from_ne_bytes(val))))
    }
}

// run files are named by a stable prefix plus a 4-digit index
pub fn run_file_name(prefix: &str, index: usize) -> String {
    format!("{}_{:04}.bin", prefix, index)
}
