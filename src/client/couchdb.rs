//! CouchDB client module
//!
//! Provides `CouchDbClient` for posting bulk document requests to one database.

use super::Auth;
use eyre::{Context, Result, eyre};
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::time::Duration;
use url::Url;

/// CouchDB client bound to a single database.
///
/// # Example
/// ```no_run
/// use couchdb_bulk_loader::client::{Auth, CouchDbClient};
/// use url::Url;
///
/// # async fn example() -> eyre::Result<()> {
/// let url = Url::parse("http://localhost:5984")?;
/// let client = CouchDbClient::try_new(url, "people", Auth::None, None)?;
///
/// assert_eq!(client.bulk_docs_url().as_str(), "http://localhost:5984/people/_bulk_docs");
/// let response = client.bulk_docs(r#"{ "docs" : [ {"name":"ada"} ] }"#.to_string()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct CouchDbClient {
    client: Client,
    url: Url,
    database: String,
    bulk_docs_url: Url,
}

impl CouchDbClient {
    /// Create a new client for `database` on the server at `url`.
    ///
    /// # Arguments
    /// * `url` - Base CouchDB URL, optionally with a path prefix
    /// * `database` - Database name; characters such as `/` are percent-encoded
    /// * `auth` - Authentication method
    /// * `timeout` - Per-request timeout, `None` to wait indefinitely
    ///
    /// # Errors
    /// Returns an error if:
    /// - The URL cannot carry a path (e.g. `mailto:`)
    /// - The database name is empty
    /// - The HTTP client cannot be built
    pub fn try_new(
        url: Url,
        database: impl Into<String>,
        auth: Auth,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let database = database.into();
        if database.is_empty() {
            eyre::bail!("Database name must not be empty");
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(value) = auth.header_value() {
            headers.insert(
                AUTHORIZATION,
                value
                    .parse::<HeaderValue>()
                    .context("Invalid credentials for Authorization header")?,
            );
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        let bulk_docs_url = bulk_docs_url(&url, &database)?;
        log::debug!("Bulk endpoint: {} (auth: {})", bulk_docs_url, auth);

        Ok(Self {
            client,
            url,
            database,
            bulk_docs_url,
        })
    }

    /// Get the base URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// `{url}/{database}/_bulk_docs`
    pub fn bulk_docs_url(&self) -> &Url {
        &self.bulk_docs_url
    }

    /// Verify the connection and authentication to CouchDB.
    ///
    /// Makes a GET request to the server root and fails on a non-success status.
    pub async fn test_connection(&self) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| eyre!("Failed to send request: {}", e))?;

        if !response.status().is_success() {
            eyre::bail!("CouchDB at {} returned {}", self.url, response.status());
        }
        Ok(response)
    }

    /// POST a prepared JSON body to the `_bulk_docs` endpoint.
    ///
    /// Any response, whatever its status, is returned as `Ok`; only a failure
    /// to complete the exchange is an error.
    pub async fn bulk_docs(&self, body: String) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .post(self.bulk_docs_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
    }
}

impl std::fmt::Display for CouchDbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (database: {})", self.url, self.database)
    }
}

fn bulk_docs_url(base: &Url, database: &str) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| eyre!("URL cannot be used as a base: {}", base))?
        .pop_if_empty()
        .push(database)
        .push("_bulk_docs");
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str, database: &str) -> Result<CouchDbClient> {
        CouchDbClient::try_new(Url::parse(url).unwrap(), database, Auth::None, None)
    }

    #[test]
    fn test_bulk_docs_url() {
        let client = client("http://localhost:5984", "people").unwrap();
        assert_eq!(
            client.bulk_docs_url().as_str(),
            "http://localhost:5984/people/_bulk_docs"
        );
        assert_eq!(client.database(), "people");
    }

    #[test]
    fn test_bulk_docs_url_with_prefix() {
        let client = client("http://localhost:8080/couch/", "people").unwrap();
        assert_eq!(
            client.bulk_docs_url().as_str(),
            "http://localhost:8080/couch/people/_bulk_docs"
        );
    }

    #[test]
    fn test_database_name_is_escaped() {
        let client = client("http://localhost:5984", "team/logs").unwrap();
        assert_eq!(
            client.bulk_docs_url().as_str(),
            "http://localhost:5984/team%2Flogs/_bulk_docs"
        );
    }

    #[test]
    fn test_empty_database_rejected() {
        let result = client("http://localhost:5984", "");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Database name"));
    }

    #[test]
    fn test_cannot_be_base_url_rejected() {
        let result = client("mailto:admin@example.com", "people");
        assert!(result.is_err());
    }

    #[test]
    fn test_client_with_auth_and_timeout() {
        let client = CouchDbClient::try_new(
            Url::parse("http://localhost:5984").unwrap(),
            "people",
            Auth::Basic("admin".to_string(), "secret".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.to_string(), "http://localhost:5984/ (database: people)");
    }
}
