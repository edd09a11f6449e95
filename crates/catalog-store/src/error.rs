use std::fmt;
use std::io;
use std::path::PathBuf;

/// Where in the backing file a problem was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Position {
    /// A 1-based line number, with the byte offset the line starts at.
    Line { number: u64, offset: u64 },
    /// A byte offset reached through the index, without a line count.
    Offset(u64),
}

impl Position {
    pub fn line(&self) -> Option<u64> {
        match self {
            Self::Line { number, .. } => Some(*number),
            Self::Offset(_) => None,
        }
    }

    pub fn offset(&self) -> u64 {
        match self {
            Self::Line { offset, .. } | Self::Offset(offset) => *offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line { number, offset } => write!(f, "line {number} (byte {offset})"),
            Self::Offset(offset) => write!(f, "byte {offset}"),
        }
    }
}

/// Errors produced by the record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record is indexed under the key.
    #[error("record not found: {key}")]
    NotFound { key: String },

    /// A record with the same key is already indexed; nothing was written.
    #[error("record already exists: {key}")]
    AlreadyExists { key: String },

    /// A line in the backing file is not a valid record.
    #[error("invalid data format in {} at {position}: {source}", .path.display())]
    InvalidDataFormat {
        path: PathBuf,
        position: Position,
        #[source]
        source: serde_json::Error,
    },

    /// The record at an indexed offset has a different identity than the key.
    #[error("index mismatch for {key}: record at byte {offset} has another identity")]
    IndexMismatch { key: String, offset: u64 },

    /// Index build met the same key twice under `DuplicatePolicy::Reject`.
    #[error("duplicate key {key} in {} at line {line}", .path.display())]
    DuplicateKey { path: PathBuf, key: String, line: u64 },

    /// A line exceeds the configured maximum length.
    #[error("line too long in {} at {position}: limit is {limit} bytes", .path.display())]
    LineTooLong {
        path: PathBuf,
        position: Position,
        limit: usize,
    },

    /// A record could not be encoded for writing.
    #[error("serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// I/O error from the backing file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for errors that mean the backing file itself is damaged.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::InvalidDataFormat { .. }
                | Self::IndexMismatch { .. }
                | Self::DuplicateKey { .. }
                | Self::LineTooLong { .. }
        )
    }

    /// The 1-based line number the error refers to, when known.
    pub fn line(&self) -> Option<u64> {
        match self {
            Self::InvalidDataFormat { position, .. } | Self::LineTooLong { position, .. } => {
                position.line()
            }
            Self::DuplicateKey { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the store crate.
pub type StoreResult<T> = Result<T, StoreError>;
