

// imports
use crate::config::PipelineParams;
use crate::cooccur::Cooccur;
use crate::shuffle::Shuffle;
use crate::vocab::VocabCount;

use log::info;
use std::error::Error;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::time::Instant;

pub struct Pipeline {}

impl Pipeline {
    // runs the three stages in order over files in the output
    // directory -
    // -> vocabulary building into vocab.txt
    // -> cooccurrence counting into cooccurrence.bin
    // -> shuffling into cooccurrence.shuf.bin
    pub fn run(params: &PipelineParams) -> Result<(), Box<dyn Error>> {
        let corpus_file = params
            .corpus_file
            .as_deref()
            .ok_or("corpus_file was not supplied through json")?;
        let output_dir = params
            .output_dir
            .as_deref()
            .ok_or("output_dir was not supplied through json")?;
        fs::create_dir_all(output_dir)?;

        let timer = Instant::now();
        info!("starting vocabulary building");
        let vocab_path = format!("{}/vocab.txt", output_dir);
        let corpus = BufReader::new(File::open(corpus_file)?);
        let mut vocab_out = BufWriter::new(File::create(&vocab_path)?);
        let vocab_size = VocabCount::run(corpus, &mut vocab_out, &params.vocab)?;
        info!(
            "finished vocabulary of {} words, took {} seconds",
            vocab_size,
            timer.elapsed().as_secs()
        );

        let timer = Instant::now();
        info!("starting cooccurrence counting");
        // the stage reads the vocabulary this run just wrote, and its
        // run files land next to the output
        let mut cooc_params = params.cooccur.clone();
        cooc_params.vocab_file = vocab_path;
        cooc_params.overflow_file = format!("{}/{}", output_dir, cooc_params.overflow_file);
        let cooc_path = format!("{}/cooccurrence.bin", output_dir);
        let corpus = BufReader::new(File::open(corpus_file)?);
        let mut cooc_out = BufWriter::new(File::create(&cooc_path)?);
        Cooccur::run(corpus, &mut cooc_out, &cooc_params)?;
        info!(
            "finished cooccurrence counting, took {} seconds",
            timer.elapsed().as_secs()
        );

        let timer = Instant::now();
        info!("starting shuffle");
        let mut shuffle_params = params.shuffle.clone();
        shuffle_params.temp_file = format!("{}/{}", output_dir, shuffle_params.temp_file);
        let shuf_path = format!("{}/cooccurrence.shuf.bin", output_dir);
        let mut shuf_in = BufReader::new(File::open(&cooc_path)?);
        let mut shuf_out = BufWriter::new(File::create(&shuf_path)?);
        Shuffle::run(&mut shuf_in, &mut shuf_out, &shuffle_params)?;
        info!("finished shuffle, took {} seconds", timer.elapsed().as_secs());

        Ok(())
    }
}
