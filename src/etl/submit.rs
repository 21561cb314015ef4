//! Per-batch submission with failure containment

use super::{Batch, Loader, Progress};
use std::sync::Arc;

/// Submits batches through a [`Loader`] and reports each one to [`Progress`].
///
/// A loader error never propagates past the submitter: it is logged and
/// counted as a batch failure. Every submitted batch is reported exactly once,
/// including when the submission future is dropped or its loader panics.
pub struct BulkSubmitter<L> {
    loader: Arc<L>,
    progress: Arc<Progress>,
}

impl<L> Clone for BulkSubmitter<L> {
    fn clone(&self) -> Self {
        Self {
            loader: Arc::clone(&self.loader),
            progress: Arc::clone(&self.progress),
        }
    }
}

impl<L> BulkSubmitter<L>
where
    L: Loader<Item = String>,
{
    pub fn new(loader: Arc<L>, progress: Arc<Progress>) -> Self {
        Self { loader, progress }
    }

    /// Submit one batch. Returns whether its exchange completed.
    pub async fn submit(&self, batch: Batch) -> bool {
        let index = batch.index();
        let size = batch.len();
        let mut guard = CompletionGuard {
            progress: &self.progress,
            size,
            armed: true,
        };

        log::debug!("Submitting batch #{} ({} records)", index, size);

        let succeeded = match self.loader.load(batch.into_records()).await {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Batch #{} ({} records) failed: {:#}", index, size, e);
                false
            }
        };

        guard.armed = false;
        self.progress.record_batch_completion(size, succeeded);
        succeeded
    }
}

/// Records the batch as failed if the submission never reached its report.
struct CompletionGuard<'a> {
    progress: &'a Progress,
    size: usize,
    armed: bool,
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            log::warn!("Batch of {} records abandoned before completion", self.size);
            self.progress.record_batch_completion(self.size, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etl::{Batcher, SilentReporter};
    use eyre::Result;
    use std::num::NonZeroUsize;
    use std::sync::Mutex;

    struct RecordingLoader {
        fail: bool,
        received: Mutex<Vec<Vec<String>>>,
    }

    impl Loader for RecordingLoader {
        type Item = String;

        async fn load(&self, items: Vec<Self::Item>) -> Result<usize> {
            let count = items.len();
            self.received.lock().unwrap().push(items);
            if self.fail {
                eyre::bail!("connection refused");
            }
            Ok(count)
        }
    }

    struct PanickingLoader;

    impl Loader for PanickingLoader {
        type Item = String;

        async fn load(&self, _items: Vec<Self::Item>) -> Result<usize> {
            panic!("loader blew up");
        }
    }

    fn single_batch(n: usize) -> Batch {
        let lines = (0..n).map(|i| Ok::<_, std::convert::Infallible>(i.to_string()));
        Batcher::new(lines, NonZeroUsize::new(n.max(1)).unwrap())
            .next()
            .unwrap()
            .unwrap()
    }

    fn submitter<L: Loader<Item = String>>(loader: L) -> (BulkSubmitter<L>, Arc<Progress>) {
        let progress = Arc::new(Progress::new(Arc::new(SilentReporter)));
        (
            BulkSubmitter::new(Arc::new(loader), progress.clone()),
            progress,
        )
    }

    #[tokio::test]
    async fn test_successful_batch() {
        let (submitter, progress) = submitter(RecordingLoader {
            fail: false,
            received: Mutex::new(Vec::new()),
        });

        assert!(submitter.submit(single_batch(4)).await);

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.records_loaded, 4);
        assert_eq!(snapshot.batch_errors, 0);
        assert_eq!(
            submitter.loader.received.lock().unwrap()[0],
            vec!["0", "1", "2", "3"]
        );
    }

    #[tokio::test]
    async fn test_failed_batch_is_contained() {
        let (submitter, progress) = submitter(RecordingLoader {
            fail: true,
            received: Mutex::new(Vec::new()),
        });

        assert!(!submitter.submit(single_batch(10)).await);

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.records_loaded, 10);
        assert_eq!(snapshot.batch_errors, 1);
        assert_eq!(snapshot.batches_completed, 1);
    }

    #[tokio::test]
    async fn test_panicking_loader_is_counted_once() {
        let (submitter, progress) = submitter(PanickingLoader);

        let handle = tokio::spawn(async move { submitter.submit(single_batch(3)).await });
        assert!(handle.await.is_err());

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.records_loaded, 3);
        assert_eq!(snapshot.batch_errors, 1);
        assert_eq!(snapshot.batches_completed, 1);
    }
}
