
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cmp;
use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};

use crate::config::ShuffleParams;
use crate::records::{run_file_name, CoocRec, RECORD_SIZE};

const GIGABYTE: f64 = 1_073_741_824.0;

fn write_chunk<W: Write>(array: &[CoocRec], out: &mut W) -> io::Result<()> {
    for rec in array {
        rec.write_into(out)?;
    }
    Ok(())
}

pub struct Shuffle {}

impl Shuffle {
    // two-stage shuffle of a record stream that never holds more than
    // one buffer of records in memory. Stage one shuffles fixed-size
    // chunks into temporary run files, stage two re-reads the runs in
    // round-robin slices and shuffles each refill before emitting it.
    // Not a mathematically perfect permutation across chunk borders,
    // but good enough for the downstream consumer.
    pub fn run<R: Read, W: Write>(
        input: &mut R,
        output: &mut W,
        params: &ShuffleParams,
    ) -> Result<(), Box<dyn Error>> {
        let array_size = match params.array_size {
            Some(size) => size,
            None => (0.95 * params.memory_limit * GIGABYTE / RECORD_SIZE as f64) as usize,
        };
        let mut rng = StdRng::seed_from_u64(params.seed);

        info!("shuffling cooccurrences");
        info!("array size: {}", array_size);

        // stage one: fill, shuffle, spill
        let mut array: Vec<CoocRec> = Vec::with_capacity(array_size);
        let mut lines: u64 = 0;
        let mut fidcounter: usize = 0;
        loop {
            array.clear();
            while array.len() < array_size {
                match CoocRec::read_from(input)? {
                    Some(rec) => array.push(rec),
                    None => break,
                }
            }
            if array.is_empty() && fidcounter > 0 {
                break;
            }
            array.shuffle(&mut rng);
            lines += array.len() as u64;

            let name = run_file_name(&params.temp_file, fidcounter);
            let file =
                File::create(&name).map_err(|e| format!("unable to open file {}: {}", name, e))?;
            let mut run = BufWriter::new(file);
            write_chunk(&array, &mut run)?;
            run.flush()?;
            fidcounter += 1;
            debug!("processed {} lines", lines);

            if array.len() < array_size {
                break;
            }
        }
        info!("wrote {} temporary file(s)", fidcounter);

        // stage two: interleave a slice of every run into one buffer,
        // shuffle it and emit. The quota is at least one record per
        // run so that more runs than buffer slots still drain.
        let mut readers = Vec::with_capacity(fidcounter);
        for i in 0..fidcounter {
            let name = run_file_name(&params.temp_file, i);
            let file =
                File::open(&name).map_err(|e| format!("unable to open file {}: {}", name, e))?;
            readers.push(BufReader::new(file));
        }
        let per_file = cmp::max(1, array_size / fidcounter);

        let mut merged: u64 = 0;
        loop {
            array.clear();
            for reader in readers.iter_mut() {
                for _ in 0..per_file {
                    match CoocRec::read_from(reader)? {
                        Some(rec) => array.push(rec),
                        None => break,
                    }
                }
            }
            if array.is_empty() {
                break;
            }
            array.shuffle(&mut rng);
            merged += array.len() as u64;
            write_chunk(&array, output)?;
            debug!("merged {} lines", merged);
        }
        output.flush()?;
        info!("merged {} lines from temp files", merged);

        for i in 0..fidcounter {
            fs::remove_file(run_file_name(&params.temp_file, i))?;
        }
        Ok(())
    }
}
