//! SQLite catalog of books, authors and series.
//!
//! The catalog is rebuilt from INPX dumps: it is never the source of truth,
//! and re-importing the same dump is a no-op.
//!
//! # Architecture
//! - **Series** and **Authors** are keyed by an external id derived from
//!   their case-folded names (the dump carries no ids for them).
//! - **Books** are keyed by the dump's `LIBID`, and link to at most one series
//!   and to any number of authors through `book_authors`.
//!
//! Imports write through a [`Batch`] (one transaction each); reads go through
//! the [`Repository`] and always join books to their series and authors.

mod batch;
mod db;
pub mod error;
mod models;
mod repo;

pub use crate::batch::Batch;
pub use crate::db::Database;
pub use crate::models::{Archives, Author, Book, BookFile, Counts, Series, Upserted, series_external_id};
pub use crate::repo::Repository;
