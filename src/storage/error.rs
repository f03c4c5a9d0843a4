//! Storage layer error types.

use std::io;
use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Page size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Out of bounds: {len} bytes at offset {offset} exceed page size {size}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    #[error("IO error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("File manager is closed")]
    Closed,

    #[error("Failed to close {} file(s): {}", .0.len(), describe_failures(.0))]
    Close(Vec<CloseFailure>),
}

impl StorageError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        StorageError::Io {
            context: context.into(),
            source,
        }
    }
}

/// A handle that could not be released cleanly during shutdown.
#[derive(Debug)]
pub struct CloseFailure {
    pub filename: String,
    pub source: io::Error,
}

fn describe_failures(failures: &[CloseFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.filename, f.source))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
