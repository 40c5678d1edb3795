//! Reading of INPX library dumps.
//!
//! An INPX dump is a ZIP archive of `.inp` catalog entries, one book record
//! per line, with fields separated by `0x04`. This crate opens the container
//! (repairing a missing central directory terminator when needed), resolves
//! the field layout, and turns each line into a normalized [`Record`].

mod consts;
mod dump;
pub mod error;
pub mod models;
mod normalize;
mod structure;

pub use crate::consts::DEFAULT_STRUCTURE;
pub use crate::dump::{Dump, Records};
pub use crate::models::{AuthorName, Record};
pub use crate::structure::Structure;

/// Parse a single raw catalog line using the default field layout.
pub fn parse_line(line: impl AsRef<[u8]>) -> error::Result<Record> {
    Record::parse(line.as_ref(), &Structure::default())
}
