//! Merge-everything resolution.

use super::{conflict_set, submit, ConflictStrategy};
use crate::error::Result;
use crate::merge::merge_all_into;
use crate::revisions::to_deletions;
use crate::store::DocumentStore;
use crate::types::{Document, Mutation, Outcome};
use async_trait::async_trait;
use tracing::{debug, Instrument};

/// Merge every losing leaf into the store's current winner.
///
/// Losers are layered onto the winner in fetch order with
/// [`merge_into`](crate::merge::merge_into): a loser applied later overrides
/// fields set by earlier losers and by the winner itself. The batch deletes all
/// losers and rewrites the winner on top of its fetched revision.
///
/// Underscore fields other than `_id`, `_rev` and `_deleted` are copied like any
/// other field. A loser's `_attachments` stubs therefore replace the winner's.
/// CouchDB rejects an upsert whose stubs name attachments the winner's revision
/// doesn't hold, so that row comes back as a `missing_stub` error in the
/// [`BulkReport`](crate::types::BulkReport) while the deletions still apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeAll;

impl MergeAll {
    /// Build the write-back batch for a winner and its losers.
    pub fn plan(mut winner: Document, losers: &[Document]) -> Result<Vec<Mutation>> {
        merge_all_into(&mut winner, losers);

        let mut mutations: Vec<Mutation> = to_deletions(losers)?
            .into_iter()
            .map(Mutation::Delete)
            .collect();
        mutations.push(Mutation::Upsert(winner));
        Ok(mutations)
    }
}

#[async_trait]
impl ConflictStrategy for MergeAll {
    async fn resolve(&self, store: &dyn DocumentStore, id: &str) -> Result<Outcome> {
        let span = tracing::debug_span!("merge_all", doc_id = id);
        async move {
            let winner = store.fetch_current(id).await?;
            debug!(winner = %winner.rev, "fetched current winner");

            let losers = conflict_set(store, id, Some(winner.rev.as_str())).await?;
            if losers.len() <= 1 {
                debug!("document is not conflicted");
                return Ok(Outcome::NotConflicted);
            }

            let mutations = Self::plan(winner, &losers)?;
            submit(store, id, mutations).await
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Deletion;
    use serde_json::json;

    #[test]
    fn test_plan_deletes_losers_then_upserts_winner() {
        let winner = Document::new("d1", "3-w").with_field("a", 1).with_field("keep", "w");
        let losers = vec![
            Document::new("d1", "3-x").with_field("a", 2).with_field("b", "x"),
            Document::new("d1", "3-y").with_field("a", 3),
        ];

        let plan = MergeAll::plan(winner, &losers).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0], Mutation::Delete(Deletion::new("d1", "3-x")));
        assert_eq!(plan[1], Mutation::Delete(Deletion::new("d1", "3-y")));

        let Mutation::Upsert(merged) = &plan[2] else {
            panic!("last mutation should be the merged winner");
        };
        assert_eq!(merged.rev, "3-w");
        assert_eq!(merged.get("a"), Some(&json!(3)));
        assert_eq!(merged.get("b"), Some(&json!("x")));
        assert_eq!(merged.get("keep"), Some(&json!("w")));
    }

    #[test]
    fn test_plan_copies_loser_attachments_onto_winner() {
        let winner = Document::new("d1", "3-w").with_field(
            "_attachments",
            json!({"w.txt": {"stub": true, "revpos": 2}}),
        );
        let losers = vec![
            Document::new("d1", "3-x"),
            Document::new("d1", "3-y").with_field(
                "_attachments",
                json!({"y.txt": {"stub": true, "revpos": 3}}),
            ),
        ];

        let plan = MergeAll::plan(winner, &losers).unwrap();
        let Mutation::Upsert(merged) = &plan[2] else {
            panic!("last mutation should be the merged winner");
        };
        assert_eq!(
            merged.get("_attachments"),
            Some(&json!({"y.txt": {"stub": true, "revpos": 3}}))
        );
    }
}
