//! A single import batch: one SQLite transaction plus per-batch lookups.

use crate::error::{ErrorKind, Result};
use crate::models::{Archives, BookRow, StoredBookRow, Upserted, series_external_id};
use exn::ResultExt;
use flibook_inpx::{AuthorName, Record};
use sqlx::{Sqlite, Transaction};
use std::collections::{BTreeSet, HashMap};

/// Writes made through a batch become visible together on
/// [`commit`](Self::commit), or not at all.
///
/// Dropping a batch without committing rolls it back.
pub struct Batch {
    tx: Transaction<'static, Sqlite>,
    dry_run: bool,
    /// External id to (surrogate id, spelling last written).
    authors: HashMap<String, (i64, AuthorName)>,
    series: HashMap<String, (i64, String)>,
}
impl Batch {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>, dry_run: bool) -> Self {
        Self { tx, dry_run, authors: HashMap::new(), series: HashMap::new() }
    }

    // =========================================================================
    // Upsert
    // =========================================================================

    /// Create or rename the series identified by `name`, returning its id.
    pub async fn upsert_series(&mut self, name: &str) -> Result<i64> {
        let external_id = series_external_id(name);
        if let Some((id, seen)) = self.series.get(&external_id)
            && seen == name
        {
            return Ok(*id);
        }
        let id: i64 = sqlx::query_scalar(include_str!("../queries/upsert_series.sql"))
            .bind(&external_id)
            .bind(name)
            .fetch_one(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        self.series.insert(external_id, (id, name.to_string()));
        Ok(id)
    }

    /// Create the author, or update the spelling of an existing one, returning its id.
    pub async fn upsert_author(&mut self, author: &AuthorName) -> Result<i64> {
        let external_id = author.external_id();
        if let Some((id, seen)) = self.authors.get(&external_id)
            && seen == author
        {
            return Ok(*id);
        }
        let id: i64 = sqlx::query_scalar(include_str!("../queries/upsert_author.sql"))
            .bind(&external_id)
            .bind(&author.last)
            .bind(author.first.as_deref())
            .bind(author.middle.as_deref())
            .fetch_one(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        self.authors.insert(external_id, (id, author.clone()));
        Ok(id)
    }

    /// Insert the book, update it in place if any stored value differs, or
    /// leave it untouched.
    pub async fn upsert_book(
        &mut self,
        record: &Record,
        series_id: Option<i64>,
        archives: &Archives,
    ) -> Result<Upserted> {
        let row = BookRow::new(record, series_id, archives)?;
        let existing: Option<StoredBookRow> = sqlx::query_as(include_str!("../queries/get_book_row.sql"))
            .bind(row.external_id)
            .fetch_optional(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        match existing {
            Some(stored) if stored.book == row => Ok(Upserted::Unchanged(stored.id)),
            Some(stored) => {
                sqlx::query(include_str!("../queries/update_book.sql"))
                    .bind(row.title)
                    .bind(row.series_id)
                    .bind(row.series_number)
                    .bind(row.date)
                    .bind(row.lang)
                    .bind(row.file_name)
                    .bind(row.file_ext)
                    .bind(row.folder)
                    .bind(row.file_size)
                    .bind(row.deleted)
                    .bind(row.book_archive)
                    .bind(row.cover_archive)
                    .bind(row.images_archive)
                    .bind(stored.id)
                    .execute(&mut *self.tx)
                    .await
                    .or_raise(|| ErrorKind::Database)?;
                Ok(Upserted::Updated(stored.id))
            },
            None => {
                let id: i64 = sqlx::query_scalar(include_str!("../queries/insert_book.sql"))
                    .bind(row.external_id)
                    .bind(row.title)
                    .bind(row.series_id)
                    .bind(row.series_number)
                    .bind(row.date)
                    .bind(row.lang)
                    .bind(row.file_name)
                    .bind(row.file_ext)
                    .bind(row.folder)
                    .bind(row.file_size)
                    .bind(row.deleted)
                    .bind(row.book_archive)
                    .bind(row.cover_archive)
                    .bind(row.images_archive)
                    .fetch_one(&mut *self.tx)
                    .await
                    .or_raise(|| ErrorKind::Database)?;
                Ok(Upserted::Inserted(id))
            },
        }
    }

    // =========================================================================
    // Associations
    // =========================================================================

    /// Make the book's author links exactly `author_ids`.
    ///
    /// Returns `true` if any link was added or removed.
    pub async fn link_authors(&mut self, book_id: i64, author_ids: &[i64]) -> Result<bool> {
        let current: Vec<i64> = sqlx::query_scalar(include_str!("../queries/list_book_author_ids.sql"))
            .bind(book_id)
            .fetch_all(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let current: BTreeSet<i64> = current.into_iter().collect();
        let wanted: BTreeSet<i64> = author_ids.iter().copied().collect();
        let mut changed = false;
        for author_id in current.difference(&wanted) {
            sqlx::query(include_str!("../queries/unlink_author.sql"))
                .bind(book_id)
                .bind(*author_id)
                .execute(&mut *self.tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
            changed = true;
        }
        for author_id in wanted.difference(&current) {
            sqlx::query(include_str!("../queries/link_author.sql"))
                .bind(book_id)
                .bind(*author_id)
                .execute(&mut *self.tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
            changed = true;
        }
        Ok(changed)
    }

    // =========================================================================
    // Completion
    // =========================================================================

    /// Commit every write made through this batch. In dry-run mode the batch
    /// is rolled back instead.
    pub async fn commit(self) -> Result<()> {
        if self.dry_run {
            tracing::debug!("dry run, rolling back batch instead of committing");
            return self.rollback().await;
        }
        self.tx.commit().await.or_raise(|| ErrorKind::Database)
    }

    /// Discard every write made through this batch.
    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.or_raise(|| ErrorKind::Database)
    }
}
