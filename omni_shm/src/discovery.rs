//! Segment discovery metadata.
//!
//! The segment owner drops a small JSON file under `/dev/shm` describing
//! the live segment, so tooling can find the key, size and owning process
//! without scanning the System V id space. The file is removed when the
//! owner destroys the segment.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ShmError, ShmResult};

const META_DIR: &str = "/dev/shm";

/// Metadata describing one live shared segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentInfo {
    /// System V key of the segment.
    pub key: i32,
    /// Segment size in bytes.
    pub size: usize,
    /// PID of the owning bridge process.
    pub pid: u32,
}

fn meta_path(dir: &Path, key: i32) -> PathBuf {
    dir.join(format!("omni_{key}.meta"))
}

fn write_in(dir: &Path, key: i32, size: usize) -> ShmResult<()> {
    let info = SegmentInfo {
        key,
        size,
        pid: std::process::id(),
    };
    let json = serde_json::to_string_pretty(&info)
        .map_err(|e| ShmError::Metadata(e.to_string()))?;
    fs::write(meta_path(dir, key), json).map_err(|e| ShmError::Metadata(e.to_string()))
}

fn read_in(dir: &Path, key: i32) -> ShmResult<SegmentInfo> {
    let path = meta_path(dir, key);
    let text = fs::read_to_string(&path)
        .map_err(|e| ShmError::Metadata(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&text).map_err(|e| ShmError::Metadata(e.to_string()))
}

fn remove_in(dir: &Path, key: i32) -> ShmResult<()> {
    let path = meta_path(dir, key);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ShmError::Metadata(format!("{}: {e}", path.display()))),
    }
}

/// Write the metadata file for a freshly created segment.
pub fn write_segment_info(key: i32, size: usize) -> ShmResult<()> {
    write_in(Path::new(META_DIR), key, size)
}

/// Read the metadata file for a segment key.
pub fn read_segment_info(key: i32) -> ShmResult<SegmentInfo> {
    read_in(Path::new(META_DIR), key)
}

/// Remove the metadata file for a segment key. Missing files are fine.
pub fn remove_segment_info(key: i32) -> ShmResult<()> {
    remove_in(Path::new(META_DIR), key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        write_in(dir.path(), 901, 624).unwrap();

        let info = read_in(dir.path(), 901).unwrap();
        assert_eq!(info.key, 901);
        assert_eq!(info.size, 624);
        assert_eq!(info.pid, std::process::id());

        remove_in(dir.path(), 901).unwrap();
        assert!(read_in(dir.path(), 901).is_err());
        // Removing twice is fine.
        remove_in(dir.path(), 901).unwrap();
    }

    #[test]
    fn missing_file_is_metadata_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_in(dir.path(), 902),
            Err(ShmError::Metadata(_))
        ));
    }
}
