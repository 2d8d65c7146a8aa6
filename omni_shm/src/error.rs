//! Error types for the shared-memory channel.

use thiserror::Error;

/// Errors raised by segment creation, attachment and teardown.
#[derive(Debug, Error)]
pub enum ShmError {
    /// `shmget` failed both to attach and to create a segment for this key.
    #[error("shared segment key {key} unavailable (errno {errno})")]
    Unavailable { key: i32, errno: i32 },

    /// Attach-only open was requested and no segment exists for this key.
    #[error("no shared segment found for key {key}")]
    NotFound { key: i32 },

    /// `shmat` refused to map an existing segment into this process.
    #[error("failed to attach shared segment key {key} (errno {errno})")]
    AttachFailed { key: i32, errno: i32 },

    /// Reading or writing the segment metadata file failed.
    #[error("segment metadata error: {0}")]
    Metadata(String),
}

pub type ShmResult<T> = Result<T, ShmError>;
