//! CouchDB HTTP client.
//!
//! [`CouchClient`] implements [`DocumentStore`](crate::store::DocumentStore) on top
//! of CouchDB's HTTP API, so the resolution strategies can run against a live
//! database.
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── fetch  - CouchClient and its HTTP calls
//! ├── config - Client configuration
//! └── utils  - Retry helpers
//! ```
//!
//! # Retries
//!
//! Document reads are idempotent and are retried with exponential backoff on
//! transport errors and retryable statuses. Bulk writes are sent exactly once.
//!
//! # Examples
//!
//! ```
//! use couch_deconflict::client::{exponential_backoff, is_retryable_status, ClientConfig, CouchClient};
//! use std::time::Duration;
//!
//! let client = CouchClient::new(ClientConfig::for_database("inventory")).unwrap();
//! assert_eq!(client.database_url().as_str(), "http://127.0.0.1:5984/inventory");
//!
//! assert!(is_retryable_status(503));
//! assert_eq!(exponential_backoff(2, 100), Duration::from_millis(400));
//! ```

mod config;
mod fetch;
mod utils;

pub use config::ClientConfig;
pub use fetch::CouchClient;
pub use utils::*;
