//! CouchDB Bulk Loader
//!
//! Loads newline-delimited JSON into CouchDB through concurrent `_bulk_docs` requests

pub mod cli;
pub mod client;
pub mod config;
pub mod couchdb;
pub mod error;
pub mod etl;
pub mod storage;

// Re-exports for convenience
pub use client::{Auth, CouchDbClient};
pub use config::LoaderConfig;
pub use couchdb::{BodyMode, BulkRequest, CouchDbLoader};
pub use error::LoadError;
pub use etl::{
    Batch, Batcher, BulkSubmitter, Concurrency, Loader, Pipeline, Progress, ProgressReporter,
    RunSummary,
};
pub use storage::LineReader;
