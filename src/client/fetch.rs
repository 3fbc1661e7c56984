//! CouchDB client implementation.
//!
//! # Examples
//!
//! ```ignore
//! use couch_deconflict::client::{ClientConfig, CouchClient};
//! use couch_deconflict::merge_all;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CouchClient::new(ClientConfig::for_database("orders"))?;
//!     let outcome = merge_all(&client, "order-17").await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

use crate::client::{config::ClientConfig, exponential_backoff};
use crate::error::{DeconflictError, Result};
use crate::protocol::{
    decode_bulk_results, decode_open_revs, doc_path_segments, encode_bulk_docs, BULK_DOCS,
    OPEN_REVS_ALL,
};
use crate::store::DocumentStore;
use crate::types::{BranchEntry, BulkReport, Document, Mutation};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

/// A CouchDB database reached over HTTP.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct CouchClient {
    client: reqwest::Client,
    db_url: Url,
    config: Arc<ClientConfig>,
}

impl CouchClient {
    /// Create a client for the database named in `config`.
    ///
    /// Fails if `base_url` is not a valid base URL or `database` is empty.
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.database.is_empty() {
            return Err(DeconflictError::Config("database name is empty".to_string()));
        }

        let mut db_url = Url::parse(&config.base_url)?;
        db_url
            .path_segments_mut()
            .map_err(|_| DeconflictError::InvalidUrl(format!("{} cannot be a base", config.base_url)))?
            .pop_if_empty()
            .push(&config.database);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(config.max_idle_connections as usize)
            .build()?;

        Ok(CouchClient {
            client,
            db_url,
            config: Arc::new(config),
        })
    }

    /// URL of the database.
    pub fn database_url(&self) -> &Url {
        &self.db_url
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// URL of a document or database endpoint.
    fn url_for(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.db_url.clone();
        url.path_segments_mut()
            .map_err(|_| DeconflictError::InvalidUrl(self.db_url.to_string()))?
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.username {
            Some(user) => request.basic_auth(user, self.config.password.as_deref()),
            None => request,
        }
    }

    /// GET a document resource, retrying transient failures.
    async fn get_json(&self, id: &str, query: Option<(&str, &str)>) -> Result<Value> {
        let mut url = self.url_for(&doc_path_segments(id))?;
        if let Some((key, value)) = query {
            url.query_pairs_mut().append_pair(key, value);
        }

        let mut attempt = 0;
        loop {
            match self.get_once(id, &url).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = exponential_backoff(attempt, self.config.retry_delay_ms);
                    if self.config.enable_logging {
                        tracing::warn!(
                            "Request failed (attempt {}), retrying after {:?}: {}",
                            attempt + 1,
                            delay,
                            e
                        );
                    }
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_once(&self, id: &str, url: &Url) -> Result<Value> {
        let response = self
            .authorize(self.client.get(url.clone()))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DeconflictError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeconflictError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Collapse transport-level failures of a read into the fetch error class.
fn fetch_failure(id: &str, err: DeconflictError) -> DeconflictError {
    let transport = matches!(
        err,
        DeconflictError::Http(_) | DeconflictError::Status { .. } | DeconflictError::Json(_)
    );
    if transport {
        DeconflictError::Fetch(format!("{id}: {err}"))
    } else {
        err
    }
}

#[async_trait]
impl DocumentStore for CouchClient {
    async fn fetch_all_revisions(&self, id: &str) -> Result<Vec<BranchEntry>> {
        let body = self
            .get_json(id, Some(OPEN_REVS_ALL))
            .await
            .map_err(|e| fetch_failure(id, e))?;
        decode_open_revs(body)
    }

    async fn fetch_current(&self, id: &str) -> Result<Document> {
        let body = self
            .get_json(id, None)
            .await
            .map_err(|e| fetch_failure(id, e))?;
        Document::from_json(body)
    }

    async fn bulk_write(&self, mutations: Vec<Mutation>) -> Result<BulkReport> {
        let url = self.url_for(&[BULK_DOCS])?;
        let response = self
            .authorize(self.client.post(url))
            .json(&encode_bulk_docs(&mutations))
            .send()
            .await?;

        // 417 means a validation function rejected some rows; the body still
        // carries one result per row.
        let status = response.status();
        if !status.is_success() && status != reqwest::StatusCode::EXPECTATION_FAILED {
            let body = response.text().await.unwrap_or_default();
            return Err(DeconflictError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes)?;
        Ok(BulkReport::from(decode_bulk_results(body)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Deletion, WriteResult};
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::ServerGuard) -> CouchClient {
        CouchClient::new(ClientConfig {
            base_url: server.url(),
            database: "db".to_string(),
            max_retries: 2,
            retry_delay_ms: 1,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = CouchClient::new(ClientConfig::for_database("db")).unwrap();
        assert_eq!(client.config().max_retries, 3);
        assert_eq!(client.database_url().as_str(), "http://127.0.0.1:5984/db");
    }

    #[test]
    fn test_client_rejects_bad_config() {
        assert!(matches!(
            CouchClient::new(ClientConfig::default()),
            Err(DeconflictError::Config(_))
        ));

        let config = ClientConfig {
            base_url: "not a url".into(),
            ..ClientConfig::for_database("db")
        };
        assert!(matches!(CouchClient::new(config), Err(DeconflictError::InvalidUrl(_))));
    }

    #[test]
    fn test_document_urls() {
        let client = CouchClient::new(ClientConfig {
            base_url: "http://couch.local:5984/prefix/".into(),
            ..ClientConfig::for_database("my db")
        })
        .unwrap();

        let url = client.url_for(&doc_path_segments("a/b c")).unwrap();
        assert_eq!(url.as_str(), "http://couch.local:5984/prefix/my%20db/a%2Fb%20c");

        let url = client.url_for(&doc_path_segments("_design/app")).unwrap();
        assert_eq!(url.as_str(), "http://couch.local:5984/prefix/my%20db/_design/app");
    }

    #[tokio::test]
    async fn test_fetch_all_revisions() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/db/d1")
            .match_query(Matcher::UrlEncoded("open_revs".into(), "all".into()))
            .match_header("accept", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    {"ok": {"_id": "d1", "_rev": "2-a", "score": 3}},
                    {"ok": {"_id": "d1", "_rev": "2-b", "_deleted": true}},
                    {"missing": "2-c"}
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let entries = client.fetch_all_revisions("d1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].ok().unwrap().get("score"), Some(&json!(3)));
        assert!(entries[1].ok().unwrap().deleted);
        assert_eq!(entries[2], BranchEntry::Missing("2-c".into()));
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/db/missing")
            .with_status(404)
            .with_body(r#"{"error":"not_found","reason":"missing"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.fetch_current("missing").await.unwrap_err();
        assert!(matches!(err, DeconflictError::NotFound(ref id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_fetch_retries_then_fails() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/db/d1")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.fetch_current("d1").await.unwrap_err();

        mock.assert_async().await;
        assert!(err.is_fetch_error());
    }

    #[tokio::test]
    async fn test_basic_auth_header() {
        let mut server = mockito::Server::new_async().await;
        // "admin:secret"
        let mock = server
            .mock("GET", "/db/d1")
            .match_header("authorization", "Basic YWRtaW46c2VjcmV0")
            .with_status(200)
            .with_body(r#"{"_id":"d1","_rev":"1-a"}"#)
            .create_async()
            .await;

        let client = CouchClient::new(ClientConfig {
            base_url: server.url(),
            username: Some("admin".into()),
            password: Some("secret".into()),
            ..ClientConfig::for_database("db")
        })
        .unwrap();

        let doc = client.fetch_current("d1").await.unwrap();
        mock.assert_async().await;
        assert_eq!(doc.rev, "1-a");
    }

    #[tokio::test]
    async fn test_bulk_write() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/db/_bulk_docs")
            .match_body(Matcher::Json(json!({"docs": [
                {"_id": "d1", "_rev": "2-a", "_deleted": true}
            ]})))
            .with_status(201)
            .with_body(
                json!([{"id": "d1", "error": "conflict", "reason": "Document update conflict."}])
                    .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let report = client
            .bulk_write(vec![Mutation::Delete(Deletion::new("d1", "2-a"))])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            report.results(),
            &[WriteResult::Error {
                id: "d1".into(),
                error: "conflict".into(),
                reason: "Document update conflict.".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_bulk_write_keeps_rows_on_validation_failure() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/db/_bulk_docs")
            .with_status(417)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    {"ok": true, "id": "d1", "rev": "3-a"},
                    {"id": "d1", "error": "forbidden", "reason": "nope"}
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let report = client
            .bulk_write(vec![
                Mutation::Delete(Deletion::new("d1", "2-a")),
                Mutation::Delete(Deletion::new("d1", "2-b")),
            ])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            report.results(),
            &[
                WriteResult::Ok { id: "d1".into(), rev: "3-a".into() },
                WriteResult::Error {
                    id: "d1".into(),
                    error: "forbidden".into(),
                    reason: "nope".into(),
                },
            ]
        );
        assert_eq!(report.succeeded(), 1);
    }

    #[tokio::test]
    async fn test_bulk_write_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/db/_bulk_docs")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.bulk_write(Vec::new()).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, DeconflictError::Status { status: 503, .. }));
    }
}
