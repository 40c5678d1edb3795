//! Repository over the catalog's books, authors and series.
//!
//! Writes go through a [`Batch`] (one transaction per import batch); reads
//! always join books to their series and authors explicitly.

use crate::Database;
use crate::batch::Batch;
use crate::error::{ErrorKind, Result};
use crate::models::{Book, BookAssembler, Counts, SurfaceRow};
use async_stream::stream;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use sqlx::SqlitePool;

/// Repository for the catalog database.
///
/// # Relationships
///
/// - A book belongs to at most one series (deleting the series unlinks it)
/// - Books and authors are many-to-many through `book_authors`
/// - Deleting a book or an author cascades to its `book_authors` rows
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    dry_run: bool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone(), dry_run: false }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    ///
    /// In dry-run mode every batch is rolled back instead of committed.
    pub fn new(pool: SqlitePool, dry_run: bool) -> Self {
        Self { pool, dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    // =========================================================================
    // Write
    // =========================================================================

    /// Start an import batch (a new transaction).
    pub async fn begin_batch(&self) -> Result<Batch> {
        let tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        Ok(Batch::new(tx, self.dry_run))
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Get a book, with its series and authors, by its external id (`LIBID`).
    pub async fn get_book(&self, external_id: u64) -> Result<Option<Book>> {
        let external_id = i64::try_from(external_id).or_raise(|| ErrorKind::InvalidData("external id"))?;
        let rows: Vec<SurfaceRow> = sqlx::query_as(include_str!("../queries/get_book.sql"))
            .bind(external_id)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let mut assembler = BookAssembler::default();
        for row in rows {
            // Every row belongs to the same book, so nothing is emitted early.
            assembler.push(row)?;
        }
        Ok(assembler.finish())
    }

    /// Stream every book with its series and authors, ordered by title then
    /// external id. Authors within a book are ordered by last, first and
    /// middle name.
    ///
    /// The first error terminates the stream.
    pub fn books(&self) -> impl Stream<Item = Result<Book>> + '_ {
        // `rustfmt` does not format macros that use braces. Wrap in parentheses!
        stream!({
            let mut rows = sqlx::query_as::<_, SurfaceRow>(include_str!("../queries/list_books.sql")).fetch(&self.pool);
            let mut assembler = BookAssembler::default();
            while let Some(row) = rows.next().await {
                match row.or_raise(|| ErrorKind::Database).and_then(|row| assembler.push(row)) {
                    Ok(Some(book)) => {
                        yield Ok(book);
                    },
                    Ok(None) => {},
                    Err(e) => {
                        yield Err(e);
                        return;
                    },
                }
            }
            if let Some(book) = assembler.finish() {
                yield Ok(book);
            }
        })
    }

    /// Count the rows of every catalog table.
    pub async fn counts(&self) -> Result<Counts> {
        let (books, authors, series, links): (i64, i64, i64, i64) =
            sqlx::query_as(include_str!("../queries/counts.sql"))
                .fetch_one(&self.pool)
                .await
                .or_raise(|| ErrorKind::Database)?;
        let count = |n: i64| u64::try_from(n).or_raise(|| ErrorKind::InvalidData("count"));
        Ok(Counts { books: count(books)?, authors: count(authors)?, series: count(series)?, links: count(links)? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Archives, Upserted};
    use flibook_inpx::{AuthorName, Record};
    use futures::TryStreamExt;
    use std::path::PathBuf;

    fn record(lib_id: u64, title: &str, authors: &[(&str, Option<&str>)]) -> Record {
        Record {
            lib_id,
            title: title.to_string(),
            authors: authors.iter().map(|(last, first)| AuthorName::new(*last, *first, None::<String>)).collect(),
            genres: vec![],
            series: None,
            series_number: None,
            file: lib_id.to_string(),
            ext: "fb2".to_string(),
            size: None,
            deleted: false,
            date: None,
            lang: Some("ru".to_string()),
            keywords: vec![],
            folder: None,
        }
    }

    async fn repo() -> (Database, Repository) {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        (db, repo)
    }

    /// Upsert a record and its authors the way an importer would.
    async fn store(batch: &mut Batch, record: &Record) -> Upserted {
        let series_id = match record.series.as_deref() {
            Some(name) => Some(batch.upsert_series(name).await.unwrap()),
            None => None,
        };
        let upserted = batch.upsert_book(record, series_id, &Archives::default()).await.unwrap();
        let mut author_ids = Vec::new();
        for author in &record.authors {
            author_ids.push(batch.upsert_author(author).await.unwrap());
        }
        batch.link_authors(upserted.id(), &author_ids).await.unwrap();
        upserted
    }

    #[tokio::test]
    async fn test_upsert_book_insert_update_unchanged() {
        let (db, repo) = repo().await;
        let mut batch = repo.begin_batch().await.unwrap();
        let original = record(1, "Пищеблок", &[("Иванов", Some("Алексей"))]);
        let inserted = batch.upsert_book(&original, None, &Archives::default()).await.unwrap();
        assert!(matches!(inserted, Upserted::Inserted(_)));
        let unchanged = batch.upsert_book(&original, None, &Archives::default()).await.unwrap();
        assert_eq!(unchanged, Upserted::Unchanged(inserted.id()));
        let renamed = record(1, "Пищеблок (роман)", &[("Иванов", Some("Алексей"))]);
        let updated = batch.upsert_book(&renamed, None, &Archives::default()).await.unwrap();
        assert_eq!(updated, Upserted::Updated(inserted.id()));
        batch.commit().await.unwrap();

        let book = repo.get_book(1).await.unwrap().unwrap();
        assert_eq!(book.title, "Пищеблок (роман)");
        assert_eq!(repo.counts().await.unwrap().books, 1);
        db.close().await;
    }

    #[tokio::test]
    async fn test_link_authors_rebuilds_associations() {
        let (db, repo) = repo().await;
        let mut batch = repo.begin_batch().await.unwrap();
        let book = store(&mut batch, &record(7, "Пикник на обочине", &[("Стругацкий", Some("Аркадий"))])).await;
        let boris = batch.upsert_author(&AuthorName::new("Стругацкий", Some("Борис"), None::<String>)).await.unwrap();
        assert!(batch.link_authors(book.id(), &[boris]).await.unwrap());
        assert!(!batch.link_authors(book.id(), &[boris, boris]).await.unwrap());
        batch.commit().await.unwrap();

        let book = repo.get_book(7).await.unwrap().unwrap();
        let names: Vec<String> = book.authors.iter().map(|a| a.display_name()).collect();
        assert_eq!(names, vec!["Стругацкий Борис"]);
        assert_eq!(repo.counts().await.unwrap(), Counts { books: 1, authors: 2, series: 0, links: 1 });
        db.close().await;
    }

    #[tokio::test]
    async fn test_get_book_joins_series_and_sorted_authors() {
        let (db, repo) = repo().await;
        let mut batch = repo.begin_batch().await.unwrap();
        let mut noon = record(3, "Полдень, XXII век", &[("Стругацкий", Some("Борис")), ("Стругацкий", Some("Аркадий"))]);
        noon.series = Some("Мир Полудня".to_string());
        noon.series_number = Some(1);
        store(&mut batch, &noon).await;
        batch.commit().await.unwrap();

        let book = repo.get_book(3).await.unwrap().unwrap();
        let series = book.series.unwrap();
        assert_eq!(series.name, "Мир Полудня");
        assert_eq!(series.external_id, "мир полудня");
        assert_eq!(book.series_number, Some(1));
        let firsts: Vec<Option<&str>> = book.authors.iter().map(|a| a.first_name.as_deref()).collect();
        assert_eq!(firsts, vec![Some("Аркадий"), Some("Борис")]);
        assert_eq!(repo.get_book(4).await.unwrap(), None);
        db.close().await;
    }

    #[tokio::test]
    async fn test_books_stream_order() {
        let (db, repo) = repo().await;
        let mut batch = repo.begin_batch().await.unwrap();
        store(&mut batch, &record(30, "Утопия", &[("Мор", Some("Томас"))])).await;
        store(&mut batch, &record(20, "Пищеблок", &[("Иванов", Some("Алексей"))])).await;
        store(&mut batch, &record(10, "Утопия", &[])).await;
        store(&mut batch, &record(40, "Пищеблок", &[("Иванов", Some("Алексей")), ("Доу", None)])).await;
        batch.commit().await.unwrap();

        let books: Vec<Book> = repo.books().try_collect().await.unwrap();
        let ids: Vec<u64> = books.iter().map(|b| b.external_id).collect();
        assert_eq!(ids, vec![20, 40, 10, 30]);
        assert_eq!(books[1].authors.len(), 2);
        assert!(books[2].authors.is_empty());
        db.close().await;
    }

    #[tokio::test]
    async fn test_author_latest_spelling_wins() {
        let (db, repo) = repo().await;
        let mut batch = repo.begin_batch().await.unwrap();
        let first = batch.upsert_author(&AuthorName::new("иванов", Some("алексей"), None::<String>)).await.unwrap();
        let again = batch.upsert_author(&AuthorName::new("Иванов", Some("Алексей"), None::<String>)).await.unwrap();
        assert_eq!(first, again);
        let series = batch.upsert_series("мир  полудня").await.unwrap();
        assert_eq!(batch.upsert_series("Мир Полудня").await.unwrap(), series);
        batch.commit().await.unwrap();

        let last: String = sqlx::query_scalar("SELECT last_name FROM authors").fetch_one(db.pool()).await.unwrap();
        assert_eq!(last, "Иванов");
        let counts = repo.counts().await.unwrap();
        assert_eq!((counts.authors, counts.series), (1, 1));
        db.close().await;
    }

    #[tokio::test]
    async fn test_rollback_discards_batch() {
        let (db, repo) = repo().await;
        let mut committed = repo.begin_batch().await.unwrap();
        store(&mut committed, &record(1, "Kept", &[("Doe", None)])).await;
        committed.commit().await.unwrap();

        let mut failed = repo.begin_batch().await.unwrap();
        store(&mut failed, &record(2, "Lost", &[("Roe", None)])).await;
        failed.rollback().await.unwrap();

        assert_eq!(repo.counts().await.unwrap(), Counts { books: 1, authors: 1, series: 0, links: 1 });
        assert_eq!(repo.get_book(2).await.unwrap(), None);
        db.close().await;
    }

    #[tokio::test]
    async fn test_dry_run_commit_rolls_back() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::new(db.pool().clone(), true);
        assert!(repo.is_dry_run());
        let mut batch = repo.begin_batch().await.unwrap();
        store(&mut batch, &record(1, "Nothing", &[])).await;
        batch.commit().await.unwrap();
        assert_eq!(repo.counts().await.unwrap(), Counts::default());
        db.close().await;
    }

    #[tokio::test]
    async fn test_archives_round_trip() {
        let (db, repo) = repo().await;
        let archives = Archives {
            book: Some(PathBuf::from("/dump/fb2-000001-000100.zip")),
            cover: Some(PathBuf::from("/dump/covers/fb2-000001-000100.zip")),
            images: None,
        };
        let mut batch = repo.begin_batch().await.unwrap();
        batch.upsert_book(&record(5, "Located", &[]), None, &archives).await.unwrap();
        batch.commit().await.unwrap();
        assert_eq!(repo.get_book(5).await.unwrap().unwrap().archives, archives);
        db.close().await;
    }

    #[tokio::test]
    async fn test_deleting_book_cascades_to_links() {
        let (db, repo) = repo().await;
        let mut batch = repo.begin_batch().await.unwrap();
        store(&mut batch, &record(1, "Gone", &[("Doe", None), ("Roe", None)])).await;
        batch.commit().await.unwrap();

        sqlx::query("DELETE FROM books WHERE external_id = 1").execute(db.pool()).await.unwrap();
        assert_eq!(repo.counts().await.unwrap(), Counts { books: 0, authors: 2, series: 0, links: 0 });
        db.close().await;
    }
}
