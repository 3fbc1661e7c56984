//! Conflict resolution strategies.
//!
//! Each strategy fetches a document's leaves from a [`DocumentStore`], decides
//! which leaf survives, and submits exactly one bulk write that retires the
//! others. If at most one live leaf remains after filtering, nothing is written
//! and the strategy returns [`Outcome::NotConflicted`].
//!
//! | Strategy | Survivor | Extra write |
//! |----------|----------|-------------|
//! | [`HighestFieldWins`] | Leaf with the greatest numeric value of a field | none |
//! | [`MergeAll`] | The store's current winner, with every loser's fields layered on top | upsert of the merged winner |
//! | [`Nominated`] | The leaf with a caller-chosen revision | none |
//!
//! No strategy retries. Fetch failures end the call with an error; rejected rows
//! of the bulk write are returned inside the [`BulkReport`](crate::BulkReport).
//!
//! # Examples
//!
//! ```
//! use couch_deconflict::{highest_field_wins, Document, InMemoryStore, Outcome};
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryStore::new();
//! store.insert_leaf(Document::new("d1", "2-a").with_field("score", 3));
//! store.insert_leaf(Document::new("d1", "2-b").with_field("score", 7));
//! store.insert_leaf(Document::new("d1", "2-c").with_field("score", 5));
//!
//! let outcome = highest_field_wins(&store, "d1", "score").await.unwrap();
//! assert!(outcome.report().unwrap().is_complete());
//!
//! let live = store.live_leaves("d1");
//! assert_eq!(live.len(), 1);
//! assert_eq!(live[0].rev, "2-b");
//!
//! // A second pass has nothing to do
//! let again = highest_field_wins(&store, "d1", "score").await.unwrap();
//! assert_eq!(again, Outcome::NotConflicted);
//! # });
//! ```

mod choice;
mod highest;
mod merge_all;
mod nominated;

pub use choice::Strategy;
pub use highest::{numeric_key, HighestFieldWins};
pub use merge_all::MergeAll;
pub use nominated::Nominated;

use crate::error::Result;
use crate::revisions::filter_leaves;
use crate::store::DocumentStore;
use crate::types::{Document, Mutation, Outcome, WriteResult};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// A way of collapsing a conflicted document to a single live leaf.
#[async_trait]
pub trait ConflictStrategy: std::fmt::Debug + Send + Sync {
    /// Resolve the conflicts of document `id` in `store`.
    async fn resolve(&self, store: &dyn DocumentStore, id: &str) -> Result<Outcome>;
}

/// Fetch the live leaves of a document, optionally leaving one revision out.
pub async fn conflict_set(
    store: &dyn DocumentStore,
    id: &str,
    exclude_rev: Option<&str>,
) -> Result<Vec<Document>> {
    let entries = store.fetch_all_revisions(id).await?;
    let live = filter_leaves(&entries, exclude_rev);
    debug!(
        doc_id = id,
        fetched = entries.len(),
        live = live.len(),
        "built conflict set"
    );
    Ok(live)
}

/// Resolve by keeping the leaf whose `field` is numerically highest.
pub async fn highest_field_wins(
    store: &dyn DocumentStore,
    id: &str,
    field: &str,
) -> Result<Outcome> {
    HighestFieldWins::new(field).resolve(store, id).await
}

/// Resolve by merging every losing leaf into the current winner.
pub async fn merge_all(store: &dyn DocumentStore, id: &str) -> Result<Outcome> {
    MergeAll.resolve(store, id).await
}

/// Resolve by keeping only the nominated revision.
///
/// Fails with [`NominatedRevisionMissing`](crate::DeconflictError::NominatedRevisionMissing)
/// if `rev` is not a live leaf. See [`Nominated::allow_missing_nominee`] for the
/// unchecked variant.
pub async fn nominated(store: &dyn DocumentStore, id: &str, rev: &str) -> Result<Outcome> {
    Nominated::new(rev).resolve(store, id).await
}

/// Submit a resolution batch and log how it went.
async fn submit(store: &dyn DocumentStore, id: &str, mutations: Vec<Mutation>) -> Result<Outcome> {
    info!(doc_id = id, mutations = mutations.len(), "submitting resolution batch");

    let report = store.bulk_write(mutations).await?;

    for failure in report.failures() {
        if let WriteResult::Error { error, reason, .. } = failure {
            warn!(doc_id = id, error = %error, reason = %reason, "resolution mutation rejected");
        }
    }
    info!(
        doc_id = id,
        succeeded = report.succeeded(),
        failed = report.len() - report.succeeded(),
        "resolution batch applied"
    );

    Ok(Outcome::Written(report))
}
