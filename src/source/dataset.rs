//! Dataset directories of sample files
//!
//! A dataset is a flat directory of `.json` documents and `.tar.gz`
//! archives. Files are visited in name order so a dataset reads the
//! same way on every filesystem; an optional one-time shuffle permutes
//! the file list up front (never the records within a file).

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::archive::read_archive_member;
use super::stream::SampleStream;
use crate::{GraphFeedError, Result};

/// Whether a directory entry looks like a sample file
pub fn is_sample_file(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };
    name.ends_with(".json") || name.ends_with(".tar.gz")
}

/// List a dataset directory's sample files in name order
///
/// Fails with `EmptyDataset` when nothing matches: a misspelled
/// directory should surface before training starts, not stream zero
/// records.
pub fn discover_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_sample_file(path))
        .collect();

    if files.is_empty() {
        return Err(GraphFeedError::EmptyDataset(dir.to_path_buf()));
    }

    files.sort();
    Ok(files)
}

/// Permute a file list once, optionally from a fixed seed
pub fn shuffle_files(files: &mut [PathBuf], seed: Option<u64>) {
    match seed {
        Some(seed) => files.shuffle(&mut StdRng::seed_from_u64(seed)),
        None => files.shuffle(&mut rand::thread_rng()),
    }
}

/// Open one sample file as a lazy sample stream
///
/// Archives are unpacked through their `data.json` member; plain JSON
/// files are streamed straight from disk.
pub fn open_samples(path: &Path) -> Result<SampleStream<Box<dyn Read>>> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

    let reader: Box<dyn Read> = if name.ends_with(".tar.gz") {
        Box::new(Cursor::new(read_archive_member(path)?))
    } else {
        Box::new(BufReader::new(File::open(path)?))
    };

    SampleStream::new(reader)
}
