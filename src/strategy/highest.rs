//! Highest-field-wins resolution.

use super::{conflict_set, submit, ConflictStrategy};
use crate::error::Result;
use crate::revisions::to_deletions;
use crate::store::DocumentStore;
use crate::types::{Document, Mutation, Outcome};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, Instrument};

/// Keep the leaf with the greatest numeric value of one field.
///
/// Leaves are sorted ascending by [`numeric_key`] with a stable sort and the
/// last one survives, so among equal values the leaf fetched last wins. Leaves
/// whose field is missing or non-numeric lose to any numeric value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighestFieldWins {
    field: String,
}

impl HighestFieldWins {
    /// Compare leaves by `field`.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// The field leaves are compared by.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Split a conflict set into the winner and the losers.
    ///
    /// Losers keep their relative fetch order. Returns `None` for an empty set.
    pub fn select(&self, mut leaves: Vec<Document>) -> Option<(Document, Vec<Document>)> {
        leaves.sort_by(|a, b| {
            numeric_key(a.get(&self.field)).total_cmp(&numeric_key(b.get(&self.field)))
        });
        let winner = leaves.pop()?;
        Some((winner, leaves))
    }
}

/// Ordering key for a field value.
///
/// Numbers sort by value and strings holding a finite number are coerced.
/// Everything else (missing, `null`, booleans, other strings, arrays, objects)
/// sorts below every number.
pub fn numeric_key(value: Option<&Value>) -> f64 {
    let key = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    key.filter(|k| k.is_finite()).unwrap_or(f64::NEG_INFINITY)
}

#[async_trait]
impl ConflictStrategy for HighestFieldWins {
    async fn resolve(&self, store: &dyn DocumentStore, id: &str) -> Result<Outcome> {
        let span = tracing::debug_span!("highest_field_wins", doc_id = id, field = %self.field);
        async move {
            let leaves = conflict_set(store, id, None).await?;
            let (winner, losers) = match self.select(leaves) {
                Some((winner, losers)) if !losers.is_empty() => (winner, losers),
                _ => {
                    debug!("document is not conflicted");
                    return Ok(Outcome::NotConflicted);
                }
            };
            debug!(winner = %winner.rev, losers = losers.len(), "selected highest leaf");

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
