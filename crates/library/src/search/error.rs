//! Error types for the [`search`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.
//! See `ERRORS.md` for design rationale.

use derive_more::{Display, Error};

/// A search error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The query is not valid text. Ask the user for a different query.
    #[display("query is not valid UTF-8 text")]
    InvalidQuery,
    /// Reading books from the catalog failed.
    #[display("catalog error")]
    Catalog,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Catalog)
    }
}
