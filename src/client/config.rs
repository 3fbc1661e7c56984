//! Client configuration.

use serde::{Deserialize, Serialize};

/// Configuration for [`CouchClient`](super::CouchClient).
///
/// Deserializable so it can live in an application config file; every field
/// has a default.
///
/// # Examples
///
/// ```
/// use couch_deconflict::client::ClientConfig;
///
/// let config: ClientConfig = serde_json::from_str(r#"{"database": "orders", "max_retries": 5}"#).unwrap();
/// assert_eq!(config.database, "orders");
/// assert_eq!(config.max_retries, 5);
/// assert_eq!(config.base_url, "http://127.0.0.1:5984");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server root, e.g. `http://127.0.0.1:5984`
    pub base_url: String,
    /// Database name
    pub database: String,
    /// Basic-auth user name
    pub username: Option<String>,
    /// Basic-auth password
    pub password: Option<String>,
    /// Retries for idempotent reads
    pub max_retries: u32,
    /// Base backoff delay in milliseconds
    pub retry_delay_ms: u64,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Idle connections kept per host
    pub max_idle_connections: u32,
    /// Log retries
    pub enable_logging: bool,
}

impl ClientConfig {
    /// Default configuration pointing at `database`.
    pub fn for_database(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Default::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5984".to_string(),
            database: String::new(),
            username: None,
            password: None,
            max_retries: 3,
            retry_delay_ms: 100,
            request_timeout_ms: 30_000,
            max_idle_connections: 10,
            enable_logging: true,
        }
    }
}
