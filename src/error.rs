//! Error types for bulk loading runs.
//!
//! [`LoadError`] separates the failures that abort a run ([`LoadError::Config`],
//! [`LoadError::Io`]) from the per-batch [`LoadError::BatchTransport`] failure,
//! which is counted by the progress tracker and never ends a run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    /// Invalid run configuration, detected before the input is opened.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The input file could not be opened or read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single batch's HTTP exchange did not complete.
    #[error("bulk request did not complete: {0}")]
    BatchTransport(#[source] reqwest::Error),
}

impl LoadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.into(),
            source,
        }
    }
}
