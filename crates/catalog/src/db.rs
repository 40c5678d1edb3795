//! Opening, migrating and closing the catalog database.

use exn::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// The importer holds one connection for a whole batch; searches use the rest.
const MAX_CONNECTIONS: u32 = 4;
/// How long a search waits for an importing batch to commit.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
/// Page cache per connection, in KiB. A batch of a thousand books touches the
/// books table, both name indexes and the link table, so the default 2 MiB
/// cache thrashes.
const CACHE_SIZE_KIB: u32 = 64 * 1024;
/// WAL pages written before an automatic checkpoint. Large enough that a
/// typical batch commits without checkpointing halfway through.
const WAL_AUTOCHECKPOINT_PAGES: u32 = 4000;
/// Rows sampled per index by `PRAGMA optimize` on close.
const ANALYSIS_LIMIT: u32 = 1000;

/// Handle to the catalog database.
///
/// There is no global handle: a caller opens one, hands it (or a
/// [`Repository`](crate::Repository) built from it) to the importer or to
/// search, and closes it when done.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the catalog at `path`, creating the file if needed, and bring its
    /// schema up to date.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = catalog_options().filename(path.as_ref()).create_if_missing(true);
        Self::open(options, MAX_CONNECTIONS).await
    }

    /// Open a fresh, empty catalog that lives only as long as the handle.
    ///
    /// Not limited to tests, so that dependent crates can use it in theirs.
    pub async fn connect_in_memory() -> Result<Self> {
        // Every `:memory:` connection is its own database, so the pool must
        // never open a second one.
        Self::open(catalog_options().filename(":memory:"), 1).await
    }

    async fn open(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    #[instrument("migrating catalog schema", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for every connection to be returned, then close them all.
    ///
    /// Each connection runs `PRAGMA optimize` as it closes, so the query
    /// planner sees the statistics of the rows an import just wrote.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("catalog closed");
    }
}

/// Options every catalog connection is opened with. The pool applies them to
/// each connection it opens, not only the first.
fn catalog_options() -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        // Searches read a consistent snapshot while a batch is being written.
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        // `book_authors` relies on cascading deletes.
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT)
        .pragma("cache_size", format!("-{CACHE_SIZE_KIB}"))
        .pragma("temp_store", "MEMORY")
        .pragma("wal_autocheckpoint", WAL_AUTOCHECKPOINT_PAGES.to_string())
        .optimize_on_close(true, ANALYSIS_LIMIT)
}
