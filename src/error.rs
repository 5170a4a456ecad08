//! Error types for the Halberd library.
//!
//! All errors are represented by the [`HalberdError`] enum. The variants follow
//! the failure classes of the engine: analysis failures are scoped to a single
//! document, storage failures abort the running operation, lock conflicts and
//! parse errors are surfaced to the caller immediately.
//!
//! # Examples
//!
//! ```
//! use halberd::error::{HalberdError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(HalberdError::invalid_argument("limit must be positive"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Halberd operations.
#[derive(Error, Debug)]
pub enum HalberdError {
    /// I/O errors from the storage medium.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Analysis errors (malformed input text, tokenizer failures).
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Storage errors (missing blobs, checksum mismatches, closed storage).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Another writer already holds the index write lock.
    #[error("Lock conflict: {0}")]
    LockConflict(String),

    /// Malformed query text.
    #[error("Parse error at offset {offset}: {message}")]
    Parse {
        /// What went wrong.
        message: String,
        /// Byte offset into the query string.
        offset: usize,
    },

    /// A named item does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Index state errors (closed writer, inconsistent manifest).
    #[error("Index error: {0}")]
    Index(String),

    /// Invalid argument passed by the caller.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation cancelled through a cancellation flag.
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error.
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with HalberdError.
pub type Result<T> = std::result::Result<T, HalberdError>;

impl HalberdError {
    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        HalberdError::Analysis(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        HalberdError::Storage(msg.into())
    }

    /// Create a new lock conflict error.
    pub fn lock_conflict<S: Into<String>>(msg: S) -> Self {
        HalberdError::LockConflict(msg.into())
    }

    /// Create a new parse error at the given byte offset.
    pub fn parse<S: Into<String>>(msg: S, offset: usize) -> Self {
        HalberdError::Parse {
            message: msg.into(),
            offset,
        }
    }

    /// Create a new not found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        HalberdError::NotFound(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        HalberdError::Index(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        HalberdError::InvalidArgument(msg.into())
    }

    /// Create a new cancelled error.
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        HalberdError::Cancelled(msg.into())
    }

    /// Byte offset of a parse error, if this is one.
    pub fn parse_offset(&self) -> Option<usize> {
        match self {
            HalberdError::Parse { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Whether the error only affects a single document during ingestion.
    pub fn is_document_scoped(&self) -> bool {
        matches!(self, HalberdError::Analysis(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = HalberdError::index("Test index error");
        assert_eq!(error.to_string(), "Index error: Test index error");

        let error = HalberdError::analysis("bad bytes");
        assert_eq!(error.to_string(), "Analysis error: bad bytes");
        assert!(error.is_document_scoped());

        let error = HalberdError::parse("empty query", 0);
        assert_eq!(error.to_string(), "Parse error at offset 0: empty query");
        assert_eq!(error.parse_offset(), Some(0));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = HalberdError::from(io_error);

        match error {
            HalberdError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
        assert!(!HalberdError::lock_conflict("write.lock").is_document_scoped());
    }
}
