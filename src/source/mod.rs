//! Streaming sample sources
//!
//! Everything that turns bytes on disk into [`Sample`](crate::Sample)s:
//! dataset directory discovery and ordering, tar.gz archive unpacking,
//! and incremental parsing of JSON sample documents.

mod archive;
mod dataset;
mod stream;

pub use archive::{read_archive_member, DATA_MEMBER};
pub use dataset::{discover_files, is_sample_file, open_samples, shuffle_files};
pub use stream::{ArrayScanner, SampleStream, ScanEvent};
