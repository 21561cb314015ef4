//! Shared progress accounting for concurrent batch submissions

use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// A consistent view of the run counters at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Records in completed batches, whether the batch succeeded or not
    pub records_loaded: u64,
    /// Batches whose HTTP exchange failed
    pub batch_errors: u64,
    /// Batches that completed, successfully or not
    pub batches_completed: u64,
    pub elapsed: Duration,
}

/// Receives a snapshot after every completed batch.
///
/// Reports are delivered one at a time, in the order the counters changed,
/// so totals seen by a reporter never decrease. Closures taking a
/// `&ProgressSnapshot` implement this trait.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, snapshot: &ProgressSnapshot);
}

impl<F> ProgressReporter for F
where
    F: Fn(&ProgressSnapshot) + Send + Sync,
{
    fn report(&self, snapshot: &ProgressSnapshot) {
        self(snapshot)
    }
}

/// Reporter that writes each snapshot to the log at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn report(&self, snapshot: &ProgressSnapshot) {
        log::info!(
            "JSON objects loaded: {} | bulk operation running: {:.1?} | bulk errors: {}",
            snapshot.records_loaded,
            snapshot.elapsed,
            snapshot.batch_errors
        );
    }
}

/// Reporter that discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn report(&self, _snapshot: &ProgressSnapshot) {}
}

#[derive(Debug)]
struct RunState {
    records_loaded: u64,
    batch_errors: u64,
    batches_completed: u64,
    started: Instant,
}

impl RunState {
    fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            records_loaded: self.records_loaded,
            batch_errors: self.batch_errors,
            batches_completed: self.batches_completed,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Thread-safe accumulator of run counters.
///
/// One `Progress` lives for one run. Every submission calls
/// [`Progress::record_batch_completion`] exactly once; the counter update and
/// the report happen under the same lock so two reports never interleave.
pub struct Progress {
    state: Mutex<RunState>,
    reporter: Arc<dyn ProgressReporter>,
}

impl Progress {
    /// Start a new run clock.
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            state: Mutex::new(RunState {
                records_loaded: 0,
                batch_errors: 0,
                batches_completed: 0,
                started: Instant::now(),
            }),
            reporter,
        }
    }

    /// Account for a finished batch of `batch_size` records and report.
    ///
    /// Failed batches still add to `records_loaded`; they are counted
    /// separately in `batch_errors`.
    pub fn record_batch_completion(&self, batch_size: usize, succeeded: bool) {
        // A reporter that panicked poisons the lock but leaves the counters intact.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        state.records_loaded += batch_size as u64;
        state.batches_completed += 1;
        if !succeeded {
            state.batch_errors += 1;
        }

        let snapshot = state.snapshot();
        self.reporter.report(&snapshot);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    /// Final read of the counters once every batch has completed.
    pub fn finish(&self, batches_dispatched: usize) -> RunSummary {
        let snapshot = self.snapshot();
        RunSummary {
            records_loaded: snapshot.records_loaded,
            batch_errors: snapshot.batch_errors,
            batches: batches_dispatched as u64,
            elapsed: snapshot.elapsed,
        }
    }
}

/// Outcome of a complete run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub records_loaded: u64,
    pub batch_errors: u64,
    pub batches: u64,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn has_errors(&self) -> bool {
        self.batch_errors > 0
    }
}

fn serialize_secs<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn collecting() -> (Arc<Mutex<Vec<ProgressSnapshot>>>, Arc<dyn ProgressReporter>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter: Arc<dyn ProgressReporter> =
            Arc::new(move |s: &ProgressSnapshot| sink.lock().unwrap().push(*s));
        (seen, reporter)
    }

    #[test]
    fn test_counts_records_and_errors() {
        let progress = Progress::new(Arc::new(SilentReporter));
        progress.record_batch_completion(100, true);
        progress.record_batch_completion(100, false);
        progress.record_batch_completion(50, true);

        let summary = progress.finish(3);
        assert_eq!(summary.records_loaded, 250);
        assert_eq!(summary.batch_errors, 1);
        assert_eq!(summary.batches, 3);
        assert!(summary.has_errors());
    }

    #[test]
    fn test_reports_after_each_batch() {
        let (seen, reporter) = collecting();
        let progress = Progress::new(reporter);
        progress.record_batch_completion(10, true);
        progress.record_batch_completion(5, false);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].records_loaded, 10);
        assert_eq!(seen[0].batch_errors, 0);
        assert_eq!(seen[1].records_loaded, 15);
        assert_eq!(seen[1].batch_errors, 1);
    }

    #[test]
    fn test_concurrent_reports_are_monotonic() {
        let (seen, reporter) = collecting();
        let progress = Arc::new(Progress::new(reporter));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let progress = progress.clone();
                thread::spawn(move || {
                    for i in 0..250 {
                        progress.record_batch_completion(3, (t + i) % 5 != 0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let summary = progress.finish(2000);
        assert_eq!(summary.records_loaded, 6000);
        assert_eq!(summary.batch_errors, 400);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2000);
        for pair in seen.windows(2) {
            assert!(pair[1].records_loaded > pair[0].records_loaded);
            assert!(pair[1].batch_errors >= pair[0].batch_errors);
            assert!(pair[1].elapsed >= pair[0].elapsed);
        }
    }

    #[test]
    fn test_summary_serializes_elapsed_seconds() {
        let summary = RunSummary {
            records_loaded: 10,
            batch_errors: 1,
            batches: 1,
            elapsed: Duration::from_millis(1500),
        };
        let value = serde_json::to_value(summary).unwrap();
        assert_eq!(value["records_loaded"], 10);
        assert_eq!(value["batch_errors"], 1);
        assert_eq!(value["elapsed_secs"], 1.5);
    }
}
