//! Nominated-winner resolution.

use super::{submit, ConflictStrategy};
use crate::error::{DeconflictError, Result};
use crate::revisions::{filter_leaves, to_deletions};
use crate::store::DocumentStore;
use crate::types::{BranchEntry, Mutation, Outcome};
use async_trait::async_trait;
use tracing::{debug, warn, Instrument};

/// Keep one caller-chosen revision and delete every other live leaf.
///
/// By default the nominee must be a live leaf of the document; otherwise the
/// call fails with [`DeconflictError::NominatedRevisionMissing`] before anything
/// is written. [`allow_missing_nominee`](Nominated::allow_missing_nominee)
/// skips that check, in which case an unknown nominee deletes every live leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nominated {
    rev: String,
    allow_missing: bool,
}

impl Nominated {
    /// Keep revision `rev`.
    pub fn new(rev: impl Into<String>) -> Self {
        Self {
            rev: rev.into(),
            allow_missing: false,
        }
    }

    /// Do not check that the nominee exists.
    ///
    /// With an unknown nominee the document is left with no live leaf.
    pub fn allow_missing_nominee(mut self) -> Self {
        self.allow_missing = true;
        self
    }

    /// The revision that survives.
    pub fn rev(&self) -> &str {
        &self.rev
    }

    fn nominee_is_live(&self, entries: &[BranchEntry]) -> bool {
        entries
            .iter()
            .filter_map(BranchEntry::ok)
            .any(|doc| !doc.deleted && doc.rev == self.rev)
    }
}

#[async_trait]
impl ConflictStrategy for Nominated {
    async fn resolve(&self, store: &dyn DocumentStore, id: &str) -> Result<Outcome> {
        let span = tracing::debug_span!("nominated", doc_id = id, rev = %self.rev);
        async move {
            let entries = store.fetch_all_revisions(id).await?;
            let losers = filter_leaves(&entries, Some(self.rev.as_str()));
            debug!(fetched = entries.len(), losers = losers.len(), "built conflict set");

            if losers.len() <= 1 {
                debug!("document is not conflicted");
                return Ok(Outcome::NotConflicted);
            }

            if !self.nominee_is_live(&entries) {
                if !self.allow_missing {
                    return Err(DeconflictError::NominatedRevisionMissing {
                        id: id.to_string(),
                        rev: self.rev.clone(),
                    });
                }
                warn!(
                    leaves = losers.len(),
                    "nominated revision is not a live leaf; deleting every live leaf"
                );
            }

            let mutations = to_deletions(&losers)?
                .into_iter()
                .map(Mutation::Delete)
                .collect();
            submit(store, id, mutations).await
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Document;

    #[test]
    fn test_nominee_is_live() {
        let entries = vec![
            BranchEntry::Ok(Document::new("d1", "2-a")),
            BranchEntry::Ok(Document::new("d1", "2-b").into_deleted()),
            BranchEntry::Missing("2-c".into()),
        ];

        assert!(Nominated::new("2-a").nominee_is_live(&entries));
        assert!(!Nominated::new("2-b").nominee_is_live(&entries));
        assert!(!Nominated::new("2-c").nominee_is_live(&entries));
    }

    #[test]
    fn test_builder() {
        let strategy = Nominated::new("3-x").allow_missing_nominee();
        assert_eq!(strategy.rev(), "3-x");
        assert!(strategy.allow_missing);
    }
}
