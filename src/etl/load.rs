//! Loader trait for loading data to destinations

use eyre::Result;

/// Loader trait for loading a group of items to a destination
///
/// Implementors define how one batch of items reaches its destination, for
/// example a single `_bulk_docs` request to CouchDB. A returned error means
/// the whole group failed; the caller decides whether that is fatal.
///
/// # Example
/// ```no_run
/// use couchdb_bulk_loader::etl::Loader;
/// use eyre::Result;
/// use std::path::PathBuf;
///
/// struct FileLoader {
///     output: PathBuf,
/// }
///
/// impl Loader for FileLoader {
///     type Item = String;
///
///     async fn load(&self, items: Vec<Self::Item>) -> Result<usize> {
///         std::fs::write(&self.output, items.join("\n"))?;
///         Ok(items.len())
///     }
/// }
/// ```
pub trait Loader: Send + Sync {
    /// The type of items to load
    type Item: Send;

    /// Load items to the destination
    ///
    /// Returns the number of items handed to the destination
    ///
    /// # Errors
    /// Returns an error if the items could not be delivered (network, I/O, encoding, etc.)
    fn load(
        &self,
        items: Vec<Self::Item>,
    ) -> impl std::future::Future<Output = Result<usize>> + Send;
}
