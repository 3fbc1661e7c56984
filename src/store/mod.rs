//! The document store contract consumed by the resolution strategies.
//!
//! Strategies never talk to a database directly. They need three operations,
//! captured by [`DocumentStore`]:
//!
//! - fetch every leaf revision of a document,
//! - fetch the store's current default winner,
//! - apply a batch of mutations whose items succeed or fail independently.
//!
//! # Implementations
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CouchClient`](crate::client::CouchClient) | CouchDB over HTTP |
//! | [`InMemoryStore`] | In-process revision tree for tests and embedding |
//!
//! # Concurrency
//!
//! Implementations must be `Send + Sync`. Two resolutions of the *same* document
//! running at once may race; the store's revision check on delete is the only
//! guard, so the loser sees per-mutation `conflict` rows rather than corruption.
//! Serialize resolution per document id if that matters to you.

mod memory;

pub use memory::InMemoryStore;

use crate::error::Result;
use crate::types::{BranchEntry, BulkReport, Document, Mutation};
use async_trait::async_trait;
use std::sync::Arc;

/// A revision-tree document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch every leaf of the document's revision tree, in store order.
    ///
    /// Fails with a fetch-class error when the document cannot be retrieved.
    async fn fetch_all_revisions(&self, id: &str) -> Result<Vec<BranchEntry>>;

    /// Fetch the revision the store currently considers the winner.
    async fn fetch_current(&self, id: &str) -> Result<Document>;

    /// Apply a batch of mutations.
    ///
    /// Returns `Err` only when the batch as a whole could not be submitted.
    /// Rejected items are reported as [`WriteResult::Error`](crate::WriteResult::Error)
    /// rows in the returned report.
    async fn bulk_write(&self, mutations: Vec<Mutation>) -> Result<BulkReport>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn fetch_all_revisions(&self, id: &str) -> Result<Vec<BranchEntry>> {
        (**self).fetch_all_revisions(id).await
    }

    async fn fetch_current(&self, id: &str) -> Result<Document> {
        (**self).fetch_current(id).await
    }

    async fn bulk_write(&self, mutations: Vec<Mutation>) -> Result<BulkReport> {
        (**self).bulk_write(mutations).await
    }
}
