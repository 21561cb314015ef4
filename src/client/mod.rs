//! CouchDB HTTP client and authentication.
//!
//! This module provides the [`CouchDbClient`] for talking to a CouchDB
//! database, along with the [`Auth`] credentials it sends.

mod auth;
mod couchdb;

pub use auth::Auth;
pub use couchdb::CouchDbClient;
