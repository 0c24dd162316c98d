//! Lazy record pipelines over whole datasets
//!
//! A [`RecordStream`] walks a dataset directory and yields one
//! [`EncodedRecord`] per readable sample, in source order (or a
//! one-time shuffled order). Per-sample failures are reported through
//! `tracing` with the file and field that caused them and then
//! skipped; only dataset-level problems (no files at all, an invalid
//! schema) surface as errors. Streams hold no shared state, so any
//! number of them can run concurrently and any of them can be dropped
//! mid-iteration.

use std::io::Read;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::warn;

use crate::encode::{EncodedRecord, SampleEncoder};
use crate::schema::{GraphSchema, Mode};
use crate::source::{discover_files, open_samples, shuffle_files, SampleStream};
use crate::Result;

/// How a dataset directory is traversed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Permute the file list before reading
    pub shuffle: bool,
    /// Fixed shuffle seed for reproducible epochs
    pub seed: Option<u64>,
}

impl ReadOptions {
    /// Shuffle with a fresh random permutation
    pub fn shuffled() -> Self {
        ReadOptions {
            shuffle: true,
            seed: None,
        }
    }

    /// Shuffle with a fixed seed
    pub fn shuffled_with_seed(seed: u64) -> Self {
        ReadOptions {
            shuffle: true,
            seed: Some(seed),
        }
    }
}

/// Lazy iterator of encoded records over one dataset directory
pub struct RecordStream {
    encoder: SampleEncoder,
    files: std::vec::IntoIter<PathBuf>,
    current: Option<(PathBuf, SampleStream<Box<dyn Read>>)>,
}

impl RecordStream {
    /// Open a dataset directory for encoding
    ///
    /// Validates the schema and lists the sample files up front;
    /// `EmptyDataset` and `InvalidSchema` fail here, before any record
    /// is produced. No file is opened until iteration reaches it.
    pub fn open<P: AsRef<Path>>(
        dir: P,
        schema: GraphSchema,
        mode: Mode,
        options: ReadOptions,
    ) -> Result<Self> {
        let encoder = SampleEncoder::new(schema, mode)?;
        let mut files = discover_files(dir.as_ref())?;
        if options.shuffle {
            shuffle_files(&mut files, options.seed);
        }

        Ok(RecordStream {
            encoder,
            files: files.into_iter(),
            current: None,
        })
    }

    /// The files this stream will visit, in visit order
    pub fn remaining_files(&self) -> &[PathBuf] {
        self.files.as_slice()
    }
}

impl Iterator for RecordStream {
    type Item = EncodedRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (path, samples) = match &mut self.current {
                Some(current) => current,
                None => {
                    let path = self.files.next()?;
                    match open_samples(&path) {
                        Ok(stream) => {
                            self.current = Some((path, stream));
                            continue;
                        }
                        Err(err) => {
                            warn!(file = %path.display(), error = %err, "skipping unreadable sample file");
                            continue;
                        }
                    }
                }
            };

            match samples.next() {
                None => {
                    self.current = None;
                }
                Some(Err(err)) => {
                    warn!(file = %path.display(), error = %err, "skipping malformed sample");
                }
                Some(Ok(sample)) => match self.encoder.encode(&sample) {
                    Ok(record) => return Some(record),
                    Err(err) => {
                        warn!(file = %path.display(), error = %err, "skipping sample");
                    }
                },
            }
        }
    }
}

/// Encode in-memory JSON sample documents
///
/// The in-memory analog of [`RecordStream`]: one record per parseable
/// document, bad documents reported and skipped.
pub fn encode_samples<I, S>(
    documents: I,
    schema: GraphSchema,
    mode: Mode,
) -> Result<Vec<EncodedRecord>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let encoder = SampleEncoder::new(schema, mode)?;

    Ok(documents
        .into_iter()
        .enumerate()
        .filter_map(|(position, document)| {
            match encoder.encode_json(document.as_ref()) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(sample = position, error = %err, "skipping sample");
                    None
                }
            }
        })
        .collect())
}

/// Encode a whole dataset with one rayon worker per file
///
/// Record order matches the (possibly shuffled) file order; records
/// within one file keep their document order. Encoding one sample
/// touches no shared state, so files fan out cleanly.
pub fn encode_dataset_parallel<P: AsRef<Path>>(
    dir: P,
    schema: GraphSchema,
    mode: Mode,
    options: ReadOptions,
) -> Result<Vec<EncodedRecord>> {
    let encoder = SampleEncoder::new(schema, mode)?;
    let mut files = discover_files(dir.as_ref())?;
    if options.shuffle {
        shuffle_files(&mut files, options.seed);
    }

    Ok(files
        .par_iter()
        .map(|path| encode_file(&encoder, path))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect())
}

/// Encode every readable sample of one file, skipping the rest
fn encode_file(encoder: &SampleEncoder, path: &Path) -> Vec<EncodedRecord> {
    let samples = match open_samples(path) {
        Ok(samples) => samples,
        Err(err) => {
            warn!(file = %path.display(), error = %err, "skipping unreadable sample file");
            return Vec::new();
        }
    };

    samples
        .filter_map(|sample| {
            let sample = match sample {
                Ok(sample) => sample,
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "skipping malformed sample");
                    return None;
                }
            };
            match encoder.encode(&sample) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "skipping sample");
                    None
                }
            }
        })
        .collect()
}
