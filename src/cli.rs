//! CLI helper functions

use crate::{
    client::CouchDbClient,
    config::LoaderConfig,
    couchdb::CouchDbLoader,
    etl::{LogReporter, Pipeline, ProgressReporter, ProgressSnapshot, RunSummary},
};
use eyre::{Context, Result};
use owo_colors::OwoColorize;
use std::io::{IsTerminal, Write};
use std::path::Path;

/// Build a CouchDB client for the configured server and database
pub fn load_couchdb_client(config: &LoaderConfig) -> Result<CouchDbClient> {
    CouchDbClient::try_new(
        config.url.clone(),
        config.database.clone(),
        config.auth(),
        config.timeout,
    )
    .context("Failed to create CouchDB client")
}

/// Bulk load an NDJSON file into CouchDB
///
/// Pipeline: LineReader → Batcher → CouchDbLoader (one task per batch)
/// Batch failures are counted in the summary; only configuration and file
/// errors are returned as `Err`.
pub async fn load_file(
    file: impl AsRef<Path>,
    config: &LoaderConfig,
    reporter: impl ProgressReporter + 'static,
) -> Result<RunSummary> {
    let file = file.as_ref();

    if !file.is_file() {
        eyre::bail!("File doesn't exist: {}", file.display());
    }

    log::info!("Connecting to CouchDB...");
    let client = load_couchdb_client(config)?;
    log::info!("Target: {}", client.bulk_docs_url());

    let loader = CouchDbLoader::new(client).with_mode(config.body_mode());
    let pipeline = Pipeline::new(loader)
        .with_concurrency(config.concurrency())
        .with_reporter(reporter);

    pipeline
        .run(file, config.batch_size)
        .await
        .with_context(|| format!("Failed to load {}", file.display()))
}

/// Test connectivity and credentials against the configured server
pub async fn test_auth(config: &LoaderConfig) -> Result<()> {
    let client = load_couchdb_client(config)?;
    log::info!("Testing connection to {}", client.url());

    let response = client.test_connection().await?;
    let body: serde_json::Value = response
        .json()
        .await
        .context("Failed to parse server response")?;

    match body.get("version").and_then(|v| v.as_str()) {
        Some(version) => log::info!("✓ Connected to CouchDB {}", version),
        None => log::info!("✓ Connected to {}", client.url()),
    }
    Ok(())
}

/// Progress reporter that redraws a single status line on an interactive
/// stderr, and falls back to log lines otherwise.
#[derive(Debug, Clone, Copy)]
pub struct TerminalReporter {
    interactive: bool,
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self {
            interactive: std::io::stderr().is_terminal(),
        }
    }

    /// End the status line so later output starts on a fresh line.
    pub fn finish(&self) {
        if self.interactive {
            eprintln!();
        }
    }
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for TerminalReporter {
    fn report(&self, snapshot: &ProgressSnapshot) {
        if !self.interactive {
            LogReporter.report(snapshot);
            return;
        }

        let errors = match snapshot.batch_errors {
            0 => snapshot.batch_errors.green().to_string(),
            _ => snapshot.batch_errors.red().to_string(),
        };

        let mut stderr = std::io::stderr().lock();
        // Best effort: a closed stderr must not fail the load.
        let _ = write!(
            stderr,
            "\r{} {}  {} {:.1?}  {} {}",
            "JSON objects loaded:".bright_black(),
            snapshot.records_loaded.cyan(),
            "Bulk operation running:".bright_black(),
            snapshot.elapsed,
            "Bulk errors:".bright_black(),
            errors
        );
        let _ = stderr.flush();
    }
}

/// Render a summary for humans
pub fn format_summary(summary: &RunSummary) -> String {
    format!(
        "JSON objects loaded: {}\nBulk operation running: {:.2?}\nBulk errors: {}",
        summary.records_loaded, summary.elapsed, summary.batch_errors
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etl::SilentReporter;
    use std::time::Duration;
    use url::Url;

    fn config(url: &str) -> LoaderConfig {
        LoaderConfig {
            url: Url::parse(url).unwrap(),
            database: "people".to_string(),
            batch_size: 10,
            workers: 2,
            timeout: Some(Duration::from_secs(5)),
            username: None,
            password: None,
            strict: false,
        }
    }

    #[test]
    fn test_load_couchdb_client() {
        let client = load_couchdb_client(&config("http://localhost:5984")).unwrap();
        assert_eq!(
            client.bulk_docs_url().as_str(),
            "http://localhost:5984/people/_bulk_docs"
        );
    }

    #[tokio::test]
    async fn test_load_file_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("missing.ndjson");

        let result = load_file(&missing, &config("http://localhost:5984"), SilentReporter).await;
        assert!(result.unwrap_err().to_string().contains("File doesn't exist"));
    }

    #[test]
    fn test_format_summary() {
        let summary = RunSummary {
            records_loaded: 250,
            batch_errors: 1,
            batches: 3,
            elapsed: Duration::from_secs(2),
        };
        let text = format_summary(&summary);
        assert!(text.contains("JSON objects loaded: 250"));
        assert!(text.contains("Bulk errors: 1"));
    }
}
