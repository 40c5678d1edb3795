//! Error types for the [`import`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.
//! See `ERRORS.md` for design rationale.

use super::ImportSummary;
use derive_more::{Display, Error};

/// An import error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for import operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of an import failure.
///
/// ### Operational Errors
/// - [`ErrorKind::ImportBatchFailed`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Dump`]
/// - [`ErrorKind::Archive`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A batch could not be persisted and was rolled back. Every earlier batch
    /// is committed, so re-running the same dump resumes from here.
    #[display("import batch starting at LIBID {first_id} failed and was rolled back")]
    ImportBatchFailed {
        /// `LIBID` of the first record in the failed batch.
        first_id: u64,
        /// What was committed, skipped and rolled back up to and including
        /// the failed batch.
        summary: Box<ImportSummary>,
    },
    /// The dump could not be opened or read past a single record.
    #[display("failed to read dump")]
    Dump,
    /// The dump root could not be scanned for archives.
    #[display("failed to index dump archives")]
    Archive,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Committed batches become no-ops on a second run.
        matches!(self, Self::ImportBatchFailed { .. })
    }
}
