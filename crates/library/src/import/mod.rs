//! Deduplicating import of INPX dumps into the catalog.
//!
//! Records are read lazily from the dump, grouped into batches, and each batch
//! is upserted in its own transaction: series and authors by their derived
//! external ids, books by `LIBID`. Re-importing the same dump changes nothing;
//! re-importing an updated dump updates books in place.
//!
//! The primary entry point is [`import_dump`], which opens the dump and
//! indexes the dump root before driving the [`import`] event stream to
//! completion.

pub mod error;
mod stream;

pub use self::stream::{ImportEvent, import};
use crate::ArchiveResolver;
use crate::import::error::{ErrorKind, Result};
use exn::ResultExt;
use flibook_catalog::Repository;
pub use flibook_config::BatchFailurePolicy;
use flibook_config::{DEFAULT_BATCH_SIZE, ImportConfig};
use flibook_inpx::Dump;
use futures::StreamExt;
use std::path::Path;
use std::pin::pin;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Maximum number of records per transaction (at least 1).
    pub batch_size: usize,
    pub on_batch_failure: BatchFailurePolicy,
}
impl Default for ImportOptions {
    fn default() -> Self {
        Self { batch_size: DEFAULT_BATCH_SIZE, on_batch_failure: BatchFailurePolicy::default() }
    }
}
impl From<&ImportConfig> for ImportOptions {
    fn from(config: &ImportConfig) -> Self {
        Self { batch_size: config.batch_size, on_batch_failure: config.on_batch_failure }
    }
}

/// Outcome of one committed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// `LIBID` of the first record in the batch.
    pub first_id: u64,
    pub records: usize,
    pub imported: u64,
    /// Books whose columns or author links changed.
    pub updated: u64,
    pub unchanged: u64,
}

/// A batch that was rolled back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedBatch {
    pub first_id: u64,
    pub records: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: u64,
    pub updated: u64,
    pub unchanged: u64,
    /// Catalog lines that could not be parsed.
    pub malformed: u64,
    pub batches_committed: u64,
    pub failed_batches: Vec<FailedBatch>,
    /// Batches were rolled back instead of committed.
    pub dry_run: bool,
}
impl ImportSummary {
    fn add(&mut self, batch: &BatchStats) {
        self.imported += batch.imported;
        self.updated += batch.updated;
        self.unchanged += batch.unchanged;
        self.batches_committed += 1;
    }
}

/// Import the dump at `dump_path`, resolving archive locators against
/// `dump_root` when given.
///
/// # Errors
///
/// - [`ImportBatchFailed`](ErrorKind::ImportBatchFailed) when a batch fails
///   under [`BatchFailurePolicy::Halt`]; earlier batches stay committed and
///   are counted in the summary the error carries,
/// - [`Dump`](ErrorKind::Dump) when the dump cannot be opened or read,
/// - [`Archive`](ErrorKind::Archive) when the dump root cannot be indexed.
#[instrument(skip_all, fields(dump = %dump_path.as_ref().display()))]
pub async fn import_dump(
    repo: &Repository,
    dump_path: impl AsRef<Path>,
    dump_root: Option<&Path>,
    options: ImportOptions,
) -> Result<ImportSummary> {
    let dump = Dump::open(dump_path.as_ref()).or_raise(|| ErrorKind::Dump)?;
    let resolver = dump_root.map(ArchiveResolver::scan).transpose().or_raise(|| ErrorKind::Archive)?;

    let mut malformed = 0u64;
    let mut committed = 0u64;
    let mut events = pin!(import(repo, dump.records(), resolver.as_ref(), options));
    while let Some(event) = events.next().await {
        match event {
            Ok(ImportEvent::Complete(summary)) => {
                tracing::info!(
                    imported = summary.imported,
                    updated = summary.updated,
                    unchanged = summary.unchanged,
                    malformed = summary.malformed,
                    failed_batches = summary.failed_batches.len(),
                    "import complete"
                );
                return Ok(summary);
            },
            Ok(ImportEvent::Malformed(_)) => malformed += 1,
            Ok(ImportEvent::BatchCommitted(_)) => committed += 1,
            Ok(ImportEvent::Started | ImportEvent::BatchFailed(_)) => {},
            Err(err) => {
                tracing::warn!(batches_committed = committed, malformed, "import stopped early");
                return Err(err);
            },
        }
    }
    // The stream always ends with either `Complete` or an error.
    exn::bail!(ErrorKind::Dump)
}
