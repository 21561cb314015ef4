//! Bulk load orchestration: read, batch, fan out, fan in

use super::{Batcher, BulkSubmitter, Loader, LogReporter, Progress, ProgressReporter, RunSummary};
use crate::error::LoadError;
use crate::storage::LineReader;

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Default number of batches allowed in flight at once.
pub const DEFAULT_WORKERS: usize = 16;

/// How many batch submissions may run at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// One task per batch, all started as soon as the batch is formed.
    Unbounded,
    /// At most `n` batches in flight; reading pauses until a slot frees up.
    Bounded(NonZeroUsize),
}

impl Concurrency {
    /// `0` means unbounded.
    pub fn from_workers(workers: usize) -> Self {
        NonZeroUsize::new(workers).map_or(Self::Unbounded, Self::Bounded)
    }

    fn semaphore(&self) -> Option<Arc<Semaphore>> {
        match self {
            Self::Unbounded => None,
            Self::Bounded(n) => Some(Arc::new(Semaphore::new(n.get()))),
        }
    }
}

impl Default for Concurrency {
    fn default() -> Self {
        Self::from_workers(DEFAULT_WORKERS)
    }
}

impl std::fmt::Display for Concurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unbounded => write!(f, "unbounded"),
            Self::Bounded(n) => write!(f, "{}", n),
        }
    }
}

/// Check that a configured batch size is a positive integer.
///
/// # Errors
/// Returns [`LoadError::Config`] for zero or negative values.
pub fn validate_batch_limit(batch_limit: i64) -> Result<NonZeroUsize, LoadError> {
    usize::try_from(batch_limit)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            LoadError::Config(format!(
                "batch size must be a positive integer, got {}",
                batch_limit
            ))
        })
}

/// Bulk load pipeline from an NDJSON file to a batch [`Loader`]
///
/// The file is read sequentially on the calling task and cut into batches.
/// Each batch is submitted on its own tokio task; the pipeline only waits
/// once, after the whole file has been dispatched, for every task to finish.
/// Failed batches are counted, never retried, and never fail the run.
///
/// # Example
/// ```no_run
/// use couchdb_bulk_loader::etl::{Concurrency, Loader, Pipeline};
/// # use eyre::Result;
/// # struct MyLoader;
/// # impl Loader for MyLoader {
/// #     type Item = String;
/// #     async fn load(&self, items: Vec<Self::Item>) -> Result<usize> { Ok(items.len()) }
/// # }
///
/// # async fn example() -> Result<()> {
/// let pipeline = Pipeline::new(MyLoader).with_concurrency(Concurrency::from_workers(8));
///
/// let summary = pipeline.run("export.ndjson", 1000).await?;
/// println!("Loaded {} records, {} failed batches", summary.records_loaded, summary.batch_errors);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<L> {
    loader: Arc<L>,
    concurrency: Concurrency,
    reporter: Arc<dyn ProgressReporter>,
}

impl<L> Pipeline<L>
where
    L: Loader<Item = String> + 'static,
{
    /// Create a new pipeline with default concurrency that logs progress
    pub fn new(loader: L) -> Self {
        Self {
            loader: Arc::new(loader),
            concurrency: Concurrency::default(),
            reporter: Arc::new(LogReporter),
        }
    }

    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_reporter(mut self, reporter: impl ProgressReporter + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Load every line of `path` in batches of `batch_limit` records
    ///
    /// Steps:
    /// 1. Validate the batch size
    /// 2. Open the input file
    /// 3. Dispatch one submission task per batch, as batches are formed
    /// 4. Wait for all submissions, then summarize
    ///
    /// # Errors
    /// - [`LoadError::Config`] if `batch_limit` is not positive; nothing is opened
    /// - [`LoadError::Io`] if the file cannot be opened, or a read fails part-way.
    ///   In the latter case batches already dispatched are still awaited first.
    pub async fn run(
        &self,
        path: impl AsRef<Path>,
        batch_limit: i64,
    ) -> Result<RunSummary, LoadError> {
        let limit = validate_batch_limit(batch_limit)?;
        let path = path.as_ref();
        let lines = LineReader::open(path)?;

        log::info!(
            "Loading {} in batches of {} (concurrency: {})",
            path.display(),
            limit,
            self.concurrency
        );

        let progress = Arc::new(Progress::new(Arc::clone(&self.reporter)));
        let submitter = BulkSubmitter::new(Arc::clone(&self.loader), Arc::clone(&progress));
        let permits = self.concurrency.semaphore();

        let mut tasks = JoinSet::new();
        let mut dispatched = 0usize;
        let mut read_error = None;

        for batch in Batcher::new(lines, limit) {
            let batch = match batch {
                Ok(batch) => batch,
                Err(source) => {
                    log::error!("Read failed after {} batch(es): {}", dispatched, source);
                    read_error = Some(LoadError::io(path, source));
                    break;
                }
            };

            // Never closed, so acquisition cannot fail.
            let permit = match &permits {
                Some(semaphore) => Arc::clone(semaphore).acquire_owned().await.ok(),
                None => None,
            };

            log::debug!("Dispatching batch #{} ({} records)", batch.index(), batch.len());
            let submitter = submitter.clone();
            tasks.spawn(async move {
                let _permit = permit;
                submitter.submit(batch).await
            });
            dispatched += 1;
            reap_finished(&mut tasks);
        }

        log::debug!("Dispatched {} batch(es), waiting for completion", dispatched);

        while let Some(joined) = tasks.join_next().await {
            log_join_error(joined);
        }

        let summary = progress.finish(dispatched);

        if let Some(err) = read_error {
            return Err(err);
        }

        log::info!(
            "Loaded {} record(s) in {} batch(es) with {} error(s) in {:.2?}",
            summary.records_loaded,
            summary.batches,
            summary.batch_errors,
            summary.elapsed
        );

        Ok(summary)
    }
}

/// Drop already finished tasks so the set only holds batches in flight.
fn reap_finished(tasks: &mut JoinSet<bool>) -> usize {
    let mut reaped = 0;
    while let Some(joined) = tasks.try_join_next() {
        log_join_error(joined);
        reaped += 1;
    }
    reaped
}

fn log_join_error(joined: Result<bool, tokio::task::JoinError>) {
    if let Err(e) = joined {
        log::error!("Batch task did not finish: {}", e);
    }
}
