
use log::{debug, info, warn};
use ndarray::Array1;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};

use crate::config::CoocParams;
use crate::hashing::WordTable;
use crate::records::{run_file_name, CoocRec, RECORD_SIZE};
use crate::tokens::{Token, Tokenizer};

// constant term of the harmonic-sum estimate that sizes the dense
// region: sum over w of min(n, n/w) grows like n * (ln n + 0.1544...)
const HARMONIC_TAIL: f64 = 0.154_431_329_8;

const GIGABYTE: f64 = 1_073_741_824.0;

// resolved sizing for the dense table and the overflow buffer. The
// soft memory limit bounds the number of records held in memory: 85%
// goes to the dense region, another sixth of that record count to the
// overflow buffer. Explicit configuration overrides either.
struct MemoryPlan {
    max_product: i64,
    overflow_length: usize,
}

impl MemoryPlan {
    fn new(params: &CoocParams) -> MemoryPlan {
        let rlimit = 0.85 * params.memory_limit * GIGABYTE / RECORD_SIZE as f64;
        let mut n = 1e5_f64;
        while (rlimit - n * (n.ln() + HARMONIC_TAIL)).abs() > 1e-3 {
            n = rlimit / (n.ln() + HARMONIC_TAIL);
        }
        MemoryPlan {
            max_product: params.max_product.unwrap_or(n as i64),
            overflow_length: params.overflow_length.unwrap_or((rlimit / 6.0) as usize),
        }
    }
}

// the dense region: one flat array of weights covering every rank
// pair whose frequency-rank product stays under max_product. The
// lookup table packs the jagged rows so that row w1 spans exactly
// min(vocab_size, max_product / w1) cells, and cell (w1, w2) lives at
// lookup[w1 - 1] + w2 - 2 (lookup[0] is biased to 1).
struct DenseTable {
    lookup: Vec<i64>,
    cells: Array1<f64>,
    max_product: i64,
}

impl DenseTable {
    fn new(vocab_size: usize, max_product: i64) -> DenseTable {
        let mut lookup = vec![0i64; vocab_size + 1];
        lookup[0] = 1;
        for a in 1..=vocab_size {
            let row = max_product / a as i64;
            lookup[a] = if row < vocab_size as i64 {
                lookup[a - 1] + row
            } else {
                lookup[a - 1] + vocab_size as i64
            };
        }
        let cells = Array1::zeros(lookup[vocab_size] as usize);
        DenseTable {
            lookup,
            cells,
            max_product,
        }
    }

    fn n_cells(&self) -> usize {
        self.cells.len()
    }

    // decides the dense/sparse partition for a (context, target) pair.
    // The mirrored symmetric pair follows the same decision: whenever
    // (w1, w2) is dense the cell for (w2, w1) exists as well.
    fn is_dense(&self, w1: i64, w2: i64) -> bool {
        w1 < self.max_product / w2
    }

    fn add(&mut self, w1: i64, w2: i64, weight: f64) {
        let index = (self.lookup[(w1 - 1) as usize] + w2 - 2) as usize;
        self.cells[index] += weight;
    }

    // emits every nonzero cell in (w1, w2) order, which is the sorted
    // run 0000 consumed by the merge
    fn write_to<W: Write>(&self, out: &mut W) -> io::Result<u64> {
        let vocab_size = self.lookup.len() - 1;
        let mut written: u64 = 0;
        for x in 1..=vocab_size {
            let row = self.lookup[x] - self.lookup[x - 1];
            for y in 1..=row {
                let val = self.cells[(self.lookup[x - 1] - 2 + y) as usize];
                if val != 0.0 {
                    CoocRec::new(x as i32, y as i32, val).write_into(out)?;
                    written += 1;
                }
            }
        }
        Ok(written)
    }
}

// reads "word count" lines and maps each word to its 1-based line
// number, the frequency rank used by the whole pipeline. The count
// column is ignored. A duplicate word cannot legitimately occur in a
// well-formed vocabulary, it is kept at its first rank and flagged.
fn load_vocab(path: &str) -> Result<(WordTable, i64), Box<dyn Error>> {
    let file = File::open(path).map_err(|e| format!("unable to open vocab file {}: {}", path, e))?;
    let mut reader = BufReader::new(file);
    let mut table = WordTable::new();
    let mut rank: i64 = 0;
    let mut line: Vec<u8> = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        while let Some(&last) = line.last() {
            if last == b'\n' || last == b'\r' {
                line.pop();
            } else {
                break;
            }
        }
        let word = match line.iter().position(|&b| b == b' ') {
            Some(pos) => &line[..pos],
            None => &line[..],
        };
        if word.is_empty() {
            continue;
        }
        rank += 1;
        if !table.insert(word, rank) {
            warn!(
                "duplicate vocabulary entry: {}",
                String::from_utf8_lossy(word)
            );
        }
    }
    Ok((table, rank))
}

// sorts the overflow buffer by rank pair, folds adjacent duplicates
// by summing their weights and appends the result to the current run
fn write_chunk<W: Write>(buffer: &mut Vec<CoocRec>, out: &mut W) -> io::Result<()> {
    if buffer.is_empty() {
        return Ok(());
    }
    buffer.sort_unstable_by_key(|rec| rec.key());
    let mut old = buffer[0];
    for rec in &buffer[1..] {
        if rec.key() == old.key() {
            old.val += rec.val;
            continue;
        }
        old.write_into(out)?;
        old = *rec;
    }
    old.write_into(out)?;
    Ok(())
}

fn open_run(prefix: &str, index: usize) -> Result<BufWriter<File>, Box<dyn Error>> {
    let name = run_file_name(prefix, index);
    let file = File::create(&name).map_err(|e| format!("unable to open file {}: {}", name, e))?;
    Ok(BufWriter::new(file))
}

// a record queued in the k-way merge, tagged with its source run.
// Ordering is on the rank pair first and the run index second, so
// equal keys pop in a stable order and duplicate folding stays exact.
struct HeapEntry {
    rec: CoocRec,
    fid: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rec
            .key()
            .cmp(&other.rec.key())
            .then(self.fid.cmp(&other.fid))
    }
}

// external k-way merge over the sorted run files. Every run is
// individually sorted and duplicate free, so a min-heap primed with
// one record per run yields a globally sorted stream in which equal
// keys are adjacent and can be folded into one output record.
fn merge_runs<W: Write>(prefix: &str, num: usize, out: &mut W) -> Result<(), Box<dyn Error>> {
    info!("merging {} cooccurrence files", num);

    let mut readers = Vec::with_capacity(num);
    for i in 0..num {
        let name = run_file_name(prefix, i);
        let file = File::open(&name).map_err(|e| format!("unable to open file {}: {}", name, e))?;
        readers.push(BufReader::new(file));
    }

    let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::with_capacity(num);
    for (fid, reader) in readers.iter_mut().enumerate() {
        if let Some(rec) = CoocRec::read_from(reader)? {
            heap.push(Reverse(HeapEntry { rec, fid }));
        }
    }

    let mut old: Option<CoocRec> = None;
    let mut written: u64 = 0;
    while let Some(Reverse(entry)) = heap.pop() {
        let rec = entry.rec;
        match &mut old {
            Some(prev) if prev.key() == rec.key() => prev.val += rec.val,
            Some(prev) => {
                prev.write_into(out)?;
                written += 1;
                if written % 100_000 == 0 {
                    debug!("merged {} records", written);
                }
                *prev = rec;
            }
            None => old = Some(rec),
        }
        if let Some(next) = CoocRec::read_from(&mut readers[entry.fid])? {
            heap.push(Reverse(HeapEntry {
                rec: next,
                fid: entry.fid,
            }));
        }
    }
    if let Some(prev) = old {
        prev.write_into(out)?;
        written += 1;
    }
    out.flush()?;
    info!("merged {} records", written);

    // the runs served their purpose, failures above leave them on
    // disk for post-mortem
    for i in 0..num {
        fs::remove_file(run_file_name(prefix, i))?;
    }
    Ok(())
}

pub struct Cooccur {}

impl Cooccur {
    // single streaming pass over the corpus: every in-vocabulary pair
    // within the window on the same line contributes 1/distance to
    // either the dense table or the overflow buffer, overflow spills
    // to sorted run files, and the run files merge into one sorted,
    // duplicate-free record stream on the output.
    pub fn run<R: BufRead, W: Write>(
        input: R,
        output: &mut W,
        params: &CoocParams,
    ) -> Result<(), Box<dyn Error>> {
        let plan = MemoryPlan::new(params);
        info!("counting cooccurrences");
        info!("window size: {}", params.window_size);
        info!(
            "context: {}",
            if params.symmetric {
                "symmetric"
            } else {
                "asymmetric"
            }
        );
        debug!("max product: {}", plan.max_product);
        debug!("overflow length: {}", plan.overflow_length);

        debug!("reading vocab from file {}", params.vocab_file);
        let (mut vocab, vocab_size) = load_vocab(&params.vocab_file)?;
        info!("loaded {} words", vocab_size);

        let mut dense = DenseTable::new(vocab_size as usize, plan.max_product);
        debug!("lookup table contains {} cells", dense.n_cells());

        let window = params.window_size;
        let mut history = vec![0i64; window];
        // one extra slot of slack: the symmetric mirror of the last
        // pair can land past the flush threshold
        let mut overflow: Vec<CoocRec> = Vec::with_capacity(plan.overflow_length + 1);
        let mut fidcounter: usize = 1;
        let mut run = open_run(&params.overflow_file, fidcounter)?;
        let mut tokenizer = Tokenizer::new(input);
        let mut j: usize = 0; // in-vocabulary position on the current line
        let mut processed: u64 = 0;

        loop {
            // spill the overflow buffer while a full window still fits
            if overflow.len() >= plan.overflow_length.saturating_sub(window) {
                write_chunk(&mut overflow, &mut run)?;
                run.flush()?;
                overflow.clear();
                fidcounter += 1;
                run = open_run(&params.overflow_file, fidcounter)?;
            }

            let word = match tokenizer.next_token()? {
                Token::Word(word) => word,
                Token::LineBreak => {
                    j = 0;
                    continue;
                }
                Token::Eof => break,
            };
            processed += 1;
            if processed % 100_000 == 0 {
                debug!("processed {} tokens", processed);
            }

            // out-of-vocabulary tokens do not advance j, they are
            // invisible to the window
            let w2 = match vocab.get(&word) {
                Some(rank) => rank,
                None => continue,
            };

            let start = if j > window { j - window } else { 0 };
            for k in (start..j).rev() {
                let w1 = history[k % window];
                let weight = 1.0 / (j - k) as f64;
                if dense.is_dense(w1, w2) {
                    dense.add(w1, w2, weight);
                    if params.symmetric {
                        dense.add(w2, w1, weight);
                    }
                } else {
                    overflow.push(CoocRec::new(w1 as i32, w2 as i32, weight));
                    if params.symmetric {
                        overflow.push(CoocRec::new(w2 as i32, w1 as i32, weight));
                    }
                }
            }
            history[j % window] = w2;
            j += 1;
        }

        // final partial spill, the buffer is usually not full here
        write_chunk(&mut overflow, &mut run)?;
        run.flush()?;
        drop(run);
        info!("processed {} tokens", processed);

        // the dense region becomes run 0000
        debug!("writing dense cooccurrences to disk");
        let dense_name = run_file_name(&params.overflow_file, 0);
        let dense_file = File::create(&dense_name)
            .map_err(|e| format!("unable to open file {}: {}", dense_name, e))?;
        let mut dense_out = BufWriter::new(dense_file);
        let dense_written = dense.write_to(&mut dense_out)?;
        dense_out.flush()?;
        drop(dense_out);
        debug!(
            "wrote {} dense records, {} files in total",
            dense_written,
            fidcounter + 1
        );

        // release the big tables before the merge holds its buffers
        drop(dense);
        drop(vocab);
        drop(overflow);

        merge_runs(&params.overflow_file, fidcounter + 1, output)
    }
}

#[cfg(test)]
mod tests {

    use super::{Cooccur, DenseTable, MemoryPlan};
    use crate::config::CoocParams;
    use crate::records::CoocRec;
    use std::collections::HashMap;

    fn run_stage(
        corpus: &str,
        vocab: &str,
        window: usize,
        symmetric: bool,
        max_product: i64,
        overflow_length: usize,
    ) -> Vec<CoocRec> {
        let dir = tempfile::tempdir().unwrap();
        let vocab_path = dir.path().join("vocab.txt");
        std::fs::write(&vocab_path, vocab).unwrap();

        let params = CoocParams {
            window_size: window,
            symmetric,
            memory_limit: 1.0,
            max_product: Some(max_product),
            overflow_length: Some(overflow_length),
            overflow_file: dir.path().join("overflow").to_str().unwrap().to_string(),
            vocab_file: vocab_path.to_str().unwrap().to_string(),
        };

        let mut output: Vec<u8> = Vec::new();
        if let Err(e) = Cooccur::run(corpus.as_bytes(), &mut output, &params) {
            panic!("{}", e);
        }

        // all run files must be gone after a successful merge
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|entry| {
                entry
                    .as_ref()
                    .unwrap()
                    .file_name()
                    .to_str()
                    .unwrap()
                    .starts_with("overflow_")
            })
            .count();
        assert_eq!(leftovers, 0);

        let mut reader = &output[..];
        let mut records = Vec::new();
        while let Some(rec) = CoocRec::read_from(&mut reader).unwrap() {
            records.push(rec);
        }
        records
    }

    // counts the same corpus the straightforward way, as the golden
    // reference for the streaming implementation
    fn brute_force(
        corpus: &str,
        ranks: &HashMap<&str, i64>,
        window: usize,
        symmetric: bool,
    ) -> HashMap<(i32, i32), f64> {
        let mut golden: HashMap<(i32, i32), f64> = HashMap::new();
        for line in corpus.lines() {
            let ids: Vec<i64> = line
                .split_whitespace()
                .filter_map(|t| ranks.get(t).copied())
                .collect();
            for j in 0..ids.len() {
                for k in j.saturating_sub(window)..j {
                    let weight = 1.0 / (j - k) as f64;
                    *golden.entry((ids[k] as i32, ids[j] as i32)).or_insert(0.0) += weight;
                    if symmetric {
                        *golden.entry((ids[j] as i32, ids[k] as i32)).or_insert(0.0) += weight;
                    }
                }
            }
        }
        golden
    }

    #[test]
    fn memory_plan_test() {
        let params = CoocParams {
            window_size: 15,
            symmetric: true,
            memory_limit: 4.0,
            max_product: None,
            overflow_length: None,
            overflow_file: "overflow".to_string(),
            vocab_file: "vocab.txt".to_string(),
        };
        let plan = MemoryPlan::new(&params);

        // 4 GB holds about 2.28e8 records, n (ln n + 0.1544) = rlimit
        // puts the product cutoff in the low tens of millions
        assert!(plan.max_product > 10_000_000 && plan.max_product < 20_000_000);
        assert_eq!(plan.overflow_length, (0.85 * 4.0 * 1_073_741_824.0 / 16.0 / 6.0) as usize);

        let explicit = CoocParams {
            max_product: Some(77),
            overflow_length: Some(123),
            ..params
        };
        let plan = MemoryPlan::new(&explicit);
        assert_eq!(plan.max_product, 77);
        assert_eq!(plan.overflow_length, 123);
    }

    #[test]
    fn lookup_table_test() {
        // rows are min(vocab_size, max_product / w1), biased by one
        let table = DenseTable::new(3, 100);
        assert_eq!(table.lookup, vec![1, 4, 7, 10]);
        assert_eq!(table.n_cells(), 10);

        let table = DenseTable::new(3, 4);
        assert_eq!(table.lookup, vec![1, 4, 6, 7]);
        assert_eq!(table.n_cells(), 7);
    }

    #[test]
    fn symmetric_window_test() {
        let records = run_stage("a b a c\nb a", "a 3\nb 2\nc 1\n", 2, true, 10_000, 100);
        assert_eq!(
            records,
            vec![
                CoocRec::new(1, 1, 1.0),
                CoocRec::new(1, 2, 3.0),
                CoocRec::new(1, 3, 1.0),
                CoocRec::new(2, 1, 3.0),
                CoocRec::new(2, 3, 0.5),
                CoocRec::new(3, 1, 1.0),
                CoocRec::new(3, 2, 0.5),
            ]
        );
    }

    #[test]
    fn asymmetric_window_test() {
        let records = run_stage("a b a c\nb a", "a 3\nb 2\nc 1\n", 2, false, 10_000, 100);
        assert_eq!(
            records,
            vec![
                CoocRec::new(1, 1, 1.0),
                CoocRec::new(1, 2, 1.0),
                CoocRec::new(1, 3, 1.0),
                CoocRec::new(2, 1, 2.0),
                CoocRec::new(2, 3, 0.5),
                CoocRec::new(3, 2, 0.5),
            ]
        );
    }

    #[test]
    fn line_boundary_test() {
        // the window never crosses a line break
        let records = run_stage("a b\nb a", "a 2\nb 2\n", 5, true, 10_000, 100);
        assert_eq!(
            records,
            vec![CoocRec::new(1, 2, 2.0), CoocRec::new(2, 1, 2.0)]
        );
    }

    #[test]
    fn oov_does_not_advance_window_test() {
        // "x" is invisible, so the two "a" sit at distance 1
        let records = run_stage("a x a", "a 2\n", 5, false, 10_000, 100);
        assert_eq!(records, vec![CoocRec::new(1, 1, 1.0)]);

        let records = run_stage("a x a", "a 2\n", 5, true, 10_000, 100);
        assert_eq!(records, vec![CoocRec::new(1, 1, 2.0)]);
    }

    #[test]
    fn duplicate_vocab_entry_test() {
        // the duplicate line still consumes a rank, the first mapping wins
        let records = run_stage("a b", "a 3\na 2\nb 1\n", 1, false, 10_000, 100);
        assert_eq!(records, vec![CoocRec::new(1, 3, 1.0)]);
    }

    #[test]
    fn overflow_merge_matches_dense_only_test() {
        // deterministic corpus of 200 tokens over 5 words, lines of 9.
        // The window is 2, so every weight is 1 or 1/2 and the sums
        // are exact in floating point whatever the accumulation order.
        let words = ["a", "b", "c", "d", "e"];
        let mut corpus = String::new();
        for i in 0..200usize {
            corpus.push_str(words[(i * 7 + i / 3) % 5]);
            if i % 9 == 8 {
                corpus.push('\n');
            } else {
                corpus.push(' ');
            }
        }
        let vocab = "a 5\nb 4\nc 3\nd 2\ne 1\n";

        // dense-only: the cutoff covers every pair. Sparse-only: the
        // cutoff covers nothing and the tiny buffer forces a spill
        // before nearly every token
        let dense_only = run_stage(&corpus, vocab, 2, true, 10_000, 1000);
        let via_overflow = run_stage(&corpus, vocab, 2, true, 1, 3);
        assert_eq!(dense_only, via_overflow);

        // output is strictly increasing in (w1, w2)
        for pair in dense_only.windows(2) {
            assert!(pair[0].key() < pair[1].key());
        }

        // and conserves the total weight of all window pairs
        let ranks: HashMap<&str, i64> =
            words.iter().enumerate().map(|(i, w)| (*w, i as i64 + 1)).collect();
        let golden = brute_force(&corpus, &ranks, 2, true);
        assert_eq!(dense_only.len(), golden.len());
        for rec in &dense_only {
            assert_eq!(golden.get(&rec.key()), Some(&rec.val));
        }
    }

    #[test]
    fn bigram_window_test() {
        // window 1 asymmetric is exactly the ordered bigram multiset
        let records = run_stage("a b b a", "a 2\nb 2\n", 1, false, 10_000, 100);
        assert_eq!(
            records,
            vec![
                CoocRec::new(1, 2, 1.0),
                CoocRec::new(2, 1, 1.0),
                CoocRec::new(2, 2, 1.0),
            ]
        );
    }

    #[test]
    fn missing_vocab_file_test() {
        let params = CoocParams {
            window_size: 2,
            symmetric: true,
            memory_limit: 1.0,
            max_product: Some(10),
            overflow_length: Some(10),
            overflow_file: "overflow".to_string(),
            vocab_file: "does_not_exist.txt".to_string(),
        };
        let mut output: Vec<u8> = Vec::new();
        let err = Cooccur::run("a b".as_bytes(), &mut output, &params).unwrap_err();
        assert!(err.to_string().contains("unable to open vocab file"));
    }
}
