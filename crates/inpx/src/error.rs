//! Dump Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. See `ERRORS.md` for design rationale.
//!
//! A single unparseable line surfaces as [`ErrorKind::MalformedRecord`] (with
//! the entry name and line number), raised on top of the detail kind that
//! describes *what* was wrong with it.

use derive_more::{Display, Error};

/// A dump error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for dump operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// One catalog line could not be turned into a record. Skip it.
    #[display("malformed record at {entry}:{line}")]
    MalformedRecord {
        /// Name of the `.inp` entry inside the dump.
        entry: String,
        /// 1-based line number within the entry.
        line: usize,
    },
    /// A required field is absent or empty.
    #[display("missing required field: {_0}")]
    MissingField(#[error(not(source))] &'static str),
    /// A field was found but could not be parsed.
    #[display("failed to parse field '{field}', found value: {value}")]
    InvalidField {
        /// The field that failed to parse.
        field: &'static str,
        /// The offending raw value.
        value: String,
    },
    /// The line is not valid UTF-8.
    #[display("line is not valid UTF-8")]
    Encoding,
    /// The field layout (`structure.info`) is unusable.
    #[display("invalid field layout: {_0}")]
    InvalidStructure(#[error(not(source))] String),
    /// The dump container could not be read as a ZIP archive, even after
    /// attempting to recover a missing central directory terminator.
    #[display("invalid dump archive")]
    InvalidArchive,
    /// Reading the dump from disk failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }

    /// Returns `true` if only a single record is affected and reading the
    /// rest of the dump can carry on.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            Self::MalformedRecord { .. } | Self::MissingField(_) | Self::InvalidField { .. } | Self::Encoding
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::MalformedRecord { entry: "fb2-000001-000100.inp".to_string(), line: 7 }.to_string(),
            "malformed record at fb2-000001-000100.inp:7"
        );
        assert_eq!(ErrorKind::MissingField("LIBID").to_string(), "missing required field: LIBID");
        assert_eq!(
            ErrorKind::InvalidField { field: "DATE", value: "yesterday".to_string() }.to_string(),
            "failed to parse field 'DATE', found value: yesterday"
        );
    }

    #[test]
    fn error_kind_classification() {
        assert!(ErrorKind::Encoding.is_record_level());
        assert!(!ErrorKind::InvalidArchive.is_record_level());
        assert!(ErrorKind::Io.is_retryable());
        assert!(!ErrorKind::MissingField("TITLE").is_retryable());
    }
}
