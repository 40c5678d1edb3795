//! Free-text search over the catalog.
//!
//! A query is split into tokens and every token must appear, case-insensitively,
//! in a book's title or in a name part of one of its authors. Matching is done
//! here rather than in SQL so that case folding covers all of Unicode, not just
//! ASCII.

pub mod error;
mod predicate;
mod query;
mod view;

pub use self::predicate::{Predicate, Surface};
pub use self::query::Query;
pub use self::view::{BookView, Locator};
use crate::search::error::{ErrorKind, Result};
use exn::ResultExt;
use flibook_catalog::Repository;
use futures::StreamExt;
use std::pin::pin;
use tracing::instrument;

/// Find every book matching `query`, ordered by title then `LIBID`.
///
/// An empty query returns the whole catalog.
pub async fn search(repo: &Repository, query: &str) -> Result<Vec<BookView>> {
    search_query(repo, &Query::parse(query)).await
}

/// Like [`search`], for a query that has not been decoded yet.
///
/// # Errors
///
/// [`InvalidQuery`](ErrorKind::InvalidQuery) if `raw` is not valid UTF-8.
pub async fn search_bytes(repo: &Repository, raw: &[u8]) -> Result<Vec<BookView>> {
    search_query(repo, &Query::from_bytes(raw)?).await
}

#[instrument(skip(repo), fields(tokens = query.tokens().len()))]
pub async fn search_query(repo: &Repository, query: &Query) -> Result<Vec<BookView>> {
    let predicate = query.compile();
    let mut books = pin!(repo.books());
    let mut scanned = 0usize;
    let mut results = Vec::new();
    while let Some(book) = books.next().await {
        let book = book.or_raise(|| ErrorKind::Catalog)?;
        scanned += 1;
        if predicate.matches(&book) {
            results.push(BookView::from(&book));
        }
    }
    tracing::debug!(scanned, matched = results.len(), "search complete");
    Ok(results)
}
