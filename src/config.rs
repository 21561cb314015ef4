//! Loader configuration from environment variables
//!
//! Values usually come from a `.env` file sourced by the CLI. Expected variables:
//! - COUCHDB_URL: CouchDB base URL (required)
//! - COUCHDB_DATABASE: Target database name (required)
//! - COUCHDB_BATCH_SIZE: Documents per `_bulk_docs` request (default 1000)
//! - COUCHDB_WORKERS: Requests in flight at once, 0 for unbounded (default 16)
//! - COUCHDB_TIMEOUT_SECS: Per-request timeout, 0 to disable (default 300)
//! - COUCHDB_USERNAME / COUCHDB_PASSWORD: Basic auth (optional)
//! - COUCHDB_STRICT: Validate every line as a JSON object (default false)

use crate::client::Auth;
use crate::couchdb::BodyMode;
use crate::etl::{Concurrency, DEFAULT_WORKERS};

use eyre::{Context, Result};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BATCH_SIZE: i64 = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Clone)]
pub struct LoaderConfig {
    pub url: Url,
    pub database: String,
    /// Kept signed so a non-positive value reaches the pipeline's validation
    pub batch_size: i64,
    pub workers: usize,
    pub timeout: Option<Duration>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub strict: bool,
}

impl LoaderConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        let url_str =
            std::env::var("COUCHDB_URL").context("COUCHDB_URL environment variable not set")?;
        let url =
            Url::parse(&url_str).with_context(|| format!("Invalid COUCHDB_URL: {}", url_str))?;

        let database = std::env::var("COUCHDB_DATABASE")
            .context("COUCHDB_DATABASE environment variable not set")?;

        let timeout_secs: u64 = env_or("COUCHDB_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;

        Ok(Self {
            url,
            database,
            batch_size: env_or("COUCHDB_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            workers: env_or("COUCHDB_WORKERS", DEFAULT_WORKERS)?,
            timeout: timeout_from_secs(timeout_secs),
            username: std::env::var("COUCHDB_USERNAME").ok(),
            password: std::env::var("COUCHDB_PASSWORD").ok(),
            strict: env_or("COUCHDB_STRICT", false)?,
        })
    }

    pub fn with_batch_size(mut self, batch_size: Option<i64>) -> Self {
        if let Some(batch_size) = batch_size {
            self.batch_size = batch_size;
        }
        self
    }

    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        if let Some(workers) = workers {
            self.workers = workers;
        }
        self
    }

    pub fn with_timeout_secs(mut self, secs: Option<u64>) -> Self {
        if let Some(secs) = secs {
            self.timeout = timeout_from_secs(secs);
        }
        self
    }

    /// Strict mode can only be switched on from the command line
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict |= strict;
        self
    }

    pub fn auth(&self) -> Auth {
        Auth::new(self.username.clone(), self.password.clone())
    }

    pub fn concurrency(&self) -> Concurrency {
        Concurrency::from_workers(self.workers)
    }

    pub fn body_mode(&self) -> BodyMode {
        match self.strict {
            true => BodyMode::Strict,
            false => BodyMode::Verbatim,
        }
    }
}

impl std::fmt::Debug for LoaderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderConfig")
            .field("url", &self.url.as_str())
            .field("database", &self.database)
            .field("batch_size", &self.batch_size)
            .field("workers", &self.workers)
            .field("timeout", &self.timeout)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("strict", &self.strict)
            .finish()
    }
}

fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {}", key, value)),
        _ => Ok(default),
    }
}
