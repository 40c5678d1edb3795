//! Import of INPX dumps into the catalog, and free-text search over it.
//!
//! - [`import`] reads a dump in batches and upserts it into a
//!   [`Repository`](flibook_catalog::Repository),
//! - [`archive`] locates the book, cover and image archives of a dump root,
//! - [`search`] matches queries against titles and author names.

pub mod archive;
pub mod error;
pub mod import;
pub mod search;

pub use crate::archive::ArchiveResolver;
pub use crate::import::{ImportEvent, ImportOptions, ImportSummary, import, import_dump};
pub use crate::search::{BookView, Locator, Query, search, search_bytes};
