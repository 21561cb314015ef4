//! CouchDB bulk document loading
//!
//! Builds `_bulk_docs` bodies from raw NDJSON lines and sends them through
//! a [`crate::client::CouchDbClient`].

mod loader;
mod request;

pub use loader::CouchDbLoader;
pub use request::{BodyMode, BulkRequest};
