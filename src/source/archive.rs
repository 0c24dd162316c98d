//! Reading gzip-compressed tar sample archives
//!
//! An archive holds exactly one member named `data.json`, itself a
//! sample document (object or array). Anything else is a malformed
//! archive: the file is skipped and the dataset sequence continues.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;

use crate::{GraphFeedError, Result};

/// Name of the sample document inside every archive
pub const DATA_MEMBER: &str = "data.json";

fn malformed(path: &Path, reason: impl Into<String>) -> GraphFeedError {
    GraphFeedError::MalformedArchive {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Extract the bytes of the `data.json` member of one archive
pub fn read_archive_member(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|err| malformed(path, err.to_string()))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let entries = archive
        .entries()
        .map_err(|err| malformed(path, err.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|err| malformed(path, err.to_string()))?;
        let member = entry
            .path()
            .map_err(|err| malformed(path, err.to_string()))?
            .into_owned();
        let member = member.strip_prefix("./").unwrap_or(&member);

        if member == Path::new(DATA_MEMBER) {
            let mut bytes = Vec::new();
            entry
                .read_to_end(&mut bytes)
                .map_err(|err| malformed(path, err.to_string()))?;
            return Ok(bytes);
        }
    }

    Err(malformed(path, format!("no '{}' member", DATA_MEMBER)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn write_archive(path: &Path, member: &str, contents: &[u8]) {
        let file = File::create(path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, member, contents).unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_member_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.tar.gz");
        write_archive(&path, DATA_MEMBER, br#"{"a": 1}"#);

        let bytes = read_archive_member(&path).unwrap();
        assert_eq!(bytes, br#"{"a": 1}"#);
    }

    #[test]
    fn test_missing_member_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.tar.gz");
        write_archive(&path, "other.json", b"{}");

        assert!(matches!(
            read_archive_member(&path),
            Err(GraphFeedError::MalformedArchive { .. })
        ));
    }

    #[test]
    fn test_garbage_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.tar.gz");
        std::fs::write(&path, b"not an archive at all").unwrap();

        assert!(matches!(
            read_archive_member(&path),
            Err(GraphFeedError::MalformedArchive { .. })
        ));
    }

    #[test]
    fn test_absent_file_is_malformed() {
        let path = Path::new("/nonexistent/sample.tar.gz");
        assert!(matches!(
            read_archive_member(path),
            Err(GraphFeedError::MalformedArchive { .. })
        ));
    }
}
