//! In-process revision-tree store.
//!
//! [`InMemoryStore`] keeps, per document id, the ordered list of leaf revisions
//! a CouchDB node would hold after replication. It reproduces the parts of
//! CouchDB's behaviour that conflict resolution depends on:
//!
//! - writes must name a current leaf revision, otherwise the row fails with
//!   `conflict`,
//! - a write replaces the leaf it names with a new generation,
//! - the default winner is the live leaf with the highest generation, ties broken
//!   by the greatest revision id; deleted leaves only win when nothing is live.
//!
//! Conflicts are created with [`InMemoryStore::insert_leaf`], which adds a leaf
//! the way replication from another node would.

use crate::error::{DeconflictError, Result};
use crate::store::DocumentStore;
use crate::types::{revision_generation, BranchEntry, BulkReport, Document, Mutation, WriteResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Thread-safe in-memory revision-tree store.
///
/// Cloning yields a handle to the same documents.
///
/// # Examples
///
/// ```
/// use couch_deconflict::{Document, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// let first = store.put(Document::new("d1", "")).unwrap();
/// assert!(first.rev.starts_with("1-"));
///
/// // Replication brings in a competing leaf
/// store.insert_leaf(Document::new("d1", "1-zzz"));
/// assert_eq!(store.leaves("d1").len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    /// Document id → leaves in insertion order
    docs: Arc<RwLock<HashMap<String, Vec<Document>>>>,
    bulk_writes: Arc<AtomicUsize>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a document on top of its `_rev`, like a CouchDB PUT.
    ///
    /// An empty `_rev` creates the document. Returns the stored revision, or a
    /// `conflict` error when `_rev` is not a live leaf.
    pub fn put(&self, doc: Document) -> Result<Document> {
        let mut docs = self.docs.write();
        apply(&mut docs, doc).map_err(|reason| DeconflictError::Status {
            status: 409,
            body: reason,
        })
    }

    /// Add a leaf verbatim, as replication from another node would.
    pub fn insert_leaf(&self, doc: Document) {
        let mut docs = self.docs.write();
        docs.entry(doc.id.clone()).or_default().push(doc);
    }

    /// All leaves of a document, live and deleted, in insertion order.
    pub fn leaves(&self, id: &str) -> Vec<Document> {
        self.docs.read().get(id).cloned().unwrap_or_default()
    }

    /// Live leaves of a document.
    pub fn live_leaves(&self, id: &str) -> Vec<Document> {
        self.leaves(id).into_iter().filter(|d| !d.deleted).collect()
    }

    /// Number of bulk writes received so far.
    pub fn bulk_write_count(&self) -> usize {
        self.bulk_writes.load(Ordering::SeqCst)
    }

    fn winner(leaves: &[Document]) -> Option<&Document> {
        leaves.iter().max_by(|a, b| {
            (!a.deleted, a.generation().unwrap_or(0), &a.rev).cmp(&(
                !b.deleted,
                b.generation().unwrap_or(0),
                &b.rev,
            ))
        })
    }
}

fn new_revision(generation: u64) -> String {
    format!("{generation}-{}", uuid::Uuid::new_v4().simple())
}

/// Apply one write to the leaf list. Errors carry a CouchDB-style reason.
fn apply(docs: &mut HashMap<String, Vec<Document>>, mut doc: Document) -> std::result::Result<Document, String> {
    let leaves = docs.entry(doc.id.clone()).or_default();

    if doc.rev.is_empty() {
        if leaves.iter().any(|l| !l.deleted) {
            return Err("Document update conflict.".to_string());
        }
        let generation = leaves.iter().filter_map(Document::generation).max().unwrap_or(0) + 1;
        doc.rev = new_revision(generation);
        leaves.push(doc.clone());
        return Ok(doc);
    }

    let Some(pos) = leaves.iter().position(|l| l.rev == doc.rev && !l.deleted) else {
        return Err("Document update conflict.".to_string());
    };

    let generation = revision_generation(&doc.rev).unwrap_or(0) + 1;
    doc.rev = new_revision(generation);
    leaves[pos] = doc.clone();
    Ok(doc)
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn fetch_all_revisions(&self, id: &str) -> Result<Vec<BranchEntry>> {
        let docs = self.docs.read();
        match docs.get(id) {
            Some(leaves) if !leaves.is_empty() => {
                Ok(leaves.iter().cloned().map(BranchEntry::Ok).collect())
            }
            _ => Err(DeconflictError::NotFound(id.to_string())),
        }
    }

    async fn fetch_current(&self, id: &str) -> Result<Document> {
        let docs = self.docs.read();
        docs.get(id)
            .and_then(|leaves| Self::winner(leaves))
            .filter(|doc| !doc.deleted)
            .cloned()
            .ok_or_else(|| DeconflictError::NotFound(id.to_string()))
    }

    async fn bulk_write(&self, mutations: Vec<Mutation>) -> Result<BulkReport> {
        self.bulk_writes.fetch_add(1, Ordering::SeqCst);
        let mut docs = self.docs.write();

        let results = mutations
            .into_iter()
            .map(|mutation| {
                let id = mutation.id().to_string();
                let doc = match mutation {
                    Mutation::Delete(d) => Document::new(d.id, d.rev).into_deleted(),
                    Mutation::Upsert(doc) => doc,
                };
                match apply(&mut docs, doc) {
                    Ok(stored) => WriteResult::Ok { id, rev: stored.rev },
                    Err(reason) => WriteResult::Error {
                        id,
                        error: "conflict".to_string(),
                        reason,
                    },
                }
            })
            .collect::<Vec<_>>();

        Ok(BulkReport::from(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Deletion;
    use serde_json::json;

    #[test]
    fn test_put_creates_and_updates() {
        let store = InMemoryStore::new();
        let v1 = store.put(Document::new("d1", "").with_field("n", 1)).unwrap();
        assert_eq!(v1.generation(), Some(1));

        let v2 = store.put(v1.clone().with_field("n", 2)).unwrap();
        assert_eq!(v2.generation(), Some(2));
        assert_eq!(store.leaves("d1").len(), 1);

        // Stale revision
        let err = store.put(v1).unwrap_err();
        assert!(matches!(err, DeconflictError::Status { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_fetch_unknown_document() {
        let store = InMemoryStore::new();
        let err = store.fetch_all_revisions("nope").await.unwrap_err();
        assert!(err.is_fetch_error());
        let err = store.fetch_current("nope").await.unwrap_err();
        assert!(err.is_fetch_error());
    }

    #[tokio::test]
    async fn test_winner_prefers_live_then_generation_then_rev() {
        let store = InMemoryStore::new();
        store.insert_leaf(Document::new("d1", "2-aaa"));
        store.insert_leaf(Document::new("d1", "2-bbb"));
        store.insert_leaf(Document::new("d1", "3-000").into_deleted());

        let current = store.fetch_current("d1").await.unwrap();
        assert_eq!(current.rev, "2-bbb");

        store.insert_leaf(Document::new("d1", "3-111"));
        assert_eq!(store.fetch_current("d1").await.unwrap().rev, "3-111");
    }

    #[tokio::test]
    async fn test_fetch_current_all_deleted() {
        let store = InMemoryStore::new();
        store.insert_leaf(Document::new("d1", "2-a").into_deleted());
        assert!(store.fetch_current("d1").await.unwrap_err().is_fetch_error());
        assert_eq!(store.fetch_all_revisions("d1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bulk_write_independent_rows() {
        let store = InMemoryStore::new();
        store.insert_leaf(Document::new("d1", "2-a").with_field("v", 1));
        store.insert_leaf(Document::new("d1", "2-b").with_field("v", 2));

        let report = store
            .bulk_write(vec![
                Mutation::Delete(Deletion::new("d1", "2-a")),
                Mutation::Delete(Deletion::new("d1", "2-zz")),
                Mutation::Upsert(Document::new("d1", "2-b").with_field("v", 3)),
            ])
            .await
            .unwrap();

        assert_eq!(report.len(), 3);
        assert!(report.results()[0].is_ok());
        assert!(!report.results()[1].is_ok());
        assert!(report.results()[2].is_ok());
        assert_eq!(store.bulk_write_count(), 1);

        let live = store.live_leaves("d1");
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].generation(), Some(3));
        assert_eq!(live[0].get("v"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn test_deleting_deleted_leaf_is_rejected() {
        let store = InMemoryStore::new();
        store.insert_leaf(Document::new("d1", "2-a").into_deleted());
        let report = store
            .bulk_write(vec![Mutation::Delete(Deletion::new("d1", "2-a"))])
            .await
            .unwrap();
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_clone_shares_state() {
        let store = InMemoryStore::new();
        let other = store.clone();
        store.insert_leaf(Document::new("d1", "1-a"));
        assert_eq!(other.leaves("d1").len(), 1);
    }
}
