//! Core bulk load abstractions
//!
//! Lines are grouped into [`Batch`]es by the [`Batcher`], each batch is handed
//! to a [`Loader`] by a [`BulkSubmitter`], and every completion is accounted
//! for in a shared [`Progress`]. [`Pipeline`] wires these together.

mod batch;
mod load;
mod pipeline;
mod progress;
mod submit;

pub use batch::{Batch, Batcher};
pub use load::Loader;
pub use pipeline::{Concurrency, DEFAULT_WORKERS, Pipeline, validate_batch_limit};
pub use progress::{
    LogReporter, Progress, ProgressReporter, ProgressSnapshot, RunSummary, SilentReporter,
};
pub use submit::BulkSubmitter;
