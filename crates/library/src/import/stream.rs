use super::{BatchStats, FailedBatch, ImportOptions, ImportSummary};
use crate::ArchiveResolver;
use crate::import::error::{ErrorKind, Result};
use async_stream::stream;
use flibook_catalog::error::Result as CatalogResult;
use flibook_catalog::{Batch, Repository, Upserted};
use flibook_config::BatchFailurePolicy;
use flibook_inpx::Record;
use flibook_inpx::error::Result as DumpResult;
use futures::Stream;

/// Progress events emitted by [`import`] as it works through a dump.
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) exactly once.
/// 2. [`Malformed`](Self::Malformed), [`BatchCommitted`](Self::BatchCommitted)
///    and [`BatchFailed`](Self::BatchFailed) in dump order.
/// 3. [`Complete`](Self::Complete) exactly once, with the final summary.
///
/// An error terminates the stream early, in which case [`Complete`](Self::Complete)
/// is never emitted.
#[derive(Debug)]
pub enum ImportEvent {
    /// Importing has begun; emitted exactly once before any other event.
    Started,
    /// A catalog line could not be parsed and was skipped.
    Malformed(flibook_inpx::error::Error),
    /// A batch was committed (or rolled back, in dry-run mode).
    BatchCommitted(BatchStats),
    /// A batch failed and was rolled back.
    BatchFailed(FailedBatch),
    /// Every record has been consumed; the stream is finished.
    Complete(ImportSummary),
}

/// Streams [`ImportEvent`]s while upserting `records` into `repo`, one
/// transaction per batch of at most `options.batch_size` records.
///
/// Malformed records are reported and skipped without taking a batch slot. A
/// batch failure is reported as [`ImportEvent::BatchFailed`]; under
/// [`BatchFailurePolicy::Halt`] it is followed by an
/// [`ImportBatchFailed`](ErrorKind::ImportBatchFailed) error that ends the
/// stream and carries the summary so far. Any other error reading the dump
/// also ends the stream.
pub fn import<'a, I>(
    repo: &'a Repository,
    records: I,
    resolver: Option<&'a ArchiveResolver>,
    options: ImportOptions,
) -> impl Stream<Item = Result<ImportEvent>> + 'a
where
    I: IntoIterator<Item = DumpResult<Record>> + 'a,
{
    let batch_size = options.batch_size.max(1);
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        yield Ok(ImportEvent::Started);

        let mut summary = ImportSummary { dry_run: repo.is_dry_run(), ..Default::default() };
        let mut records = records.into_iter();
        let mut pending: Vec<Record> = Vec::with_capacity(batch_size);
        let mut exhausted = false;
        while !exhausted {
            match records.next() {
                Some(Ok(record)) => pending.push(record),
                Some(Err(err)) if err.is_record_level() => {
                    tracing::warn!(error = ?err, "skipping malformed record");
                    summary.malformed += 1;
                    yield Ok(ImportEvent::Malformed(err));
                    continue;
                },
                Some(Err(err)) => {
                    yield Err(err.raise(ErrorKind::Dump));
                    return;
                },
                None => exhausted = true,
            }
            if pending.is_empty() || (pending.len() < batch_size && !exhausted) {
                continue;
            }

            let batch = std::mem::replace(&mut pending, Vec::with_capacity(batch_size));
            let first_id = batch.first().map(|r| r.lib_id).unwrap_or_default();
            match write_batch(repo, &batch, resolver).await {
                Ok(stats) => {
                    tracing::info!(
                        first_id,
                        records = stats.records,
                        imported = stats.imported,
                        updated = stats.updated,
                        unchanged = stats.unchanged,
                        dry_run = summary.dry_run,
                        "committed batch"
                    );
                    summary.add(&stats);
                    yield Ok(ImportEvent::BatchCommitted(stats));
                },
                Err(err) => {
                    tracing::warn!(first_id, records = batch.len(), error = ?err, "batch failed and was rolled back");
                    let failed = FailedBatch { first_id, records: batch.len() };
                    summary.failed_batches.push(failed.clone());
                    yield Ok(ImportEvent::BatchFailed(failed));
                    if options.on_batch_failure == BatchFailurePolicy::Halt {
                        let summary = Box::new(summary);
                        yield Err(err.raise(ErrorKind::ImportBatchFailed { first_id, summary }));
                        return;
                    }
                },
            }
        }

        yield Ok(ImportEvent::Complete(summary));
    })
}

/// Persist one batch in its own transaction, rolling it back on failure.
async fn write_batch(
    repo: &Repository,
    records: &[Record],
    resolver: Option<&ArchiveResolver>,
) -> CatalogResult<BatchStats> {
    let mut batch = repo.begin_batch().await?;
    match write_records(&mut batch, records, resolver).await {
        Ok(stats) => {
            batch.commit().await?;
            Ok(stats)
        },
        Err(err) => {
            if let Err(rollback) = batch.rollback().await {
                tracing::warn!(error = ?rollback, "failed to roll back batch");
            }
            Err(err)
        },
    }
}

async fn write_records(
    batch: &mut Batch,
    records: &[Record],
    resolver: Option<&ArchiveResolver>,
) -> CatalogResult<BatchStats> {
    let mut stats = BatchStats {
        first_id: records.first().map(|r| r.lib_id).unwrap_or_default(),
        records: records.len(),
        ..Default::default()
    };
    for record in records {
        let series_id = match record.series.as_deref() {
            Some(name) => Some(batch.upsert_series(name).await?),
            None => None,
        };
        let archives = resolver.map(|r| r.resolve(record)).unwrap_or_default();
        let upserted = batch.upsert_book(record, series_id, &archives).await?;
        let mut author_ids = Vec::with_capacity(record.authors.len());
        for author in &record.authors {
            author_ids.push(batch.upsert_author(author).await?);
        }
        let relinked = batch.link_authors(upserted.id(), &author_ids).await?;
        tracing::trace!(lib_id = record.lib_id, ?upserted, relinked, "upserted book");
        match upserted {
            Upserted::Inserted(_) => stats.imported += 1,
            Upserted::Updated(_) => stats.updated += 1,
            Upserted::Unchanged(_) if relinked => stats.updated += 1,
            Upserted::Unchanged(_) => stats.unchanged += 1,
        }
    }
    Ok(stats)
}
