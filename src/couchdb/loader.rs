//! `_bulk_docs` loader
//!
//! Loads one batch of raw NDJSON lines per POST /{db}/_bulk_docs

use super::{BodyMode, BulkRequest};
use crate::client::CouchDbClient;
use crate::error::LoadError;
use crate::etl::Loader;
use eyre::{Context, Result};

/// Loader for CouchDB documents
///
/// Each call to [`Loader::load`] sends exactly one `_bulk_docs` request.
/// Any response from the server counts as a delivered batch: the body is read
/// to the end and discarded without looking for per-document errors. Only a
/// failure to complete the exchange (connection, timeout, protocol) is an
/// error, reported as [`LoadError::BatchTransport`].
///
/// # Example
/// ```no_run
/// use couchdb_bulk_loader::client::{Auth, CouchDbClient};
/// use couchdb_bulk_loader::couchdb::CouchDbLoader;
/// use couchdb_bulk_loader::etl::Loader;
/// use url::Url;
///
/// # async fn example() -> eyre::Result<()> {
/// let url = Url::parse("http://localhost:5984")?;
/// let client = CouchDbClient::try_new(url, "people", Auth::None, None)?;
/// let loader = CouchDbLoader::new(client);
///
/// let count = loader.load(vec![r#"{"name":"ada"}"#.to_string()]).await?;
/// # Ok(())
/// # }
/// ```
pub struct CouchDbLoader {
    client: CouchDbClient,
    mode: BodyMode,
}

impl CouchDbLoader {
    /// Create a new loader that sends lines verbatim
    pub fn new(client: CouchDbClient) -> Self {
        Self {
            client,
            mode: BodyMode::Verbatim,
        }
    }

    /// Set how request bodies are built (default: verbatim)
    pub fn with_mode(mut self, mode: BodyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn client(&self) -> &CouchDbClient {
        &self.client
    }

    pub fn mode(&self) -> BodyMode {
        self.mode
    }
}

impl Loader for CouchDbLoader {
    type Item = String;

    async fn load(&self, items: Vec<Self::Item>) -> Result<usize> {
        let request = BulkRequest::build(&items, self.mode)
            .with_context(|| format!("Failed to build bulk request for {} doc(s)", items.len()))?;
        let docs = request.docs();

        let response = self
            .client
            .bulk_docs(request.into_body())
            .await
            .map_err(LoadError::BatchTransport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(LoadError::BatchTransport)?;

        if status.is_success() {
            log::debug!("Posted {} doc(s): {}", docs, status);
        } else {
            log::debug!(
                "Posted {} doc(s): {} ({} byte response discarded)",
                docs,
                status,
                body.len()
            );
        }

        Ok(docs)
    }
}
