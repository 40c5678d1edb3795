//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. See `ERRORS.md` for design rationale.
//!
//! Import and search have their own error types, see
//! [`import::error`](crate::import::error) and [`search::error`](crate::search::error).

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The dump root does not exist or is not a directory.
    #[display("dump root is not a directory: {}", _0.display())]
    DumpRootNotFound(#[error(not(source))] PathBuf),
    /// Walking the dump root for archives failed.
    #[display("failed to scan dump root for archives")]
    ArchiveScan,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ArchiveScan)
    }
}
