//! Strategy selection from configuration.

use super::{ConflictStrategy, HighestFieldWins, MergeAll, Nominated};
use crate::error::{DeconflictError, Result};
use crate::store::DocumentStore;
use crate::types::Outcome;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A strategy chosen at runtime, e.g. by a change-feed listener reading its
/// configuration.
///
/// Parses from and displays as:
///
/// | Text | Strategy |
/// |------|----------|
/// | `highest:<field>` | [`HighestFieldWins`] on `field` |
/// | `merge` | [`MergeAll`] |
/// | `nominated:<rev>` | [`Nominated`] keeping `rev` (nominee checked) |
///
/// # Examples
///
/// ```
/// use couch_deconflict::Strategy;
///
/// let strategy: Strategy = "highest:updated_at".parse().unwrap();
/// assert_eq!(strategy, Strategy::HighestFieldWins("updated_at".into()));
/// assert_eq!(strategy.to_string(), "highest:updated_at");
///
/// assert!("highest:".parse::<Strategy>().is_err());
/// assert!("coin-flip".parse::<Strategy>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Strategy {
    /// Keep the leaf with the highest value of this field
    HighestFieldWins(String),
    /// Merge all leaves into the current winner
    MergeAll,
    /// Keep only this revision
    Nominated(String),
}

impl FromStr for Strategy {
    type Err = DeconflictError;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, arg) = match s.trim().split_once(':') {
            Some((kind, arg)) => (kind.trim(), Some(arg.trim())),
            None => (s.trim(), None),
        };

        let required = |what: &str| match arg {
            Some(a) if !a.is_empty() => Ok(a.to_string()),
            _ => Err(DeconflictError::Config(format!(
                "strategy {kind:?} requires a {what}, e.g. \"{kind}:<{what}>\""
            ))),
        };

        match kind {
            "highest" => Ok(Strategy::HighestFieldWins(required("field")?)),
            "nominated" => Ok(Strategy::Nominated(required("rev")?)),
            "merge" if arg.is_none() => Ok(Strategy::MergeAll),
            "merge" => Err(DeconflictError::Config(
                "strategy \"merge\" takes no argument".to_string(),
            )),
            other => Err(DeconflictError::Config(format!(
                "unknown strategy {other:?}; expected highest:<field>, merge or nominated:<rev>"
            ))),
        }
    }
}

impl TryFrom<String> for Strategy {
    type Error = DeconflictError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::HighestFieldWins(field) => write!(f, "highest:{field}"),
            Strategy::MergeAll => write!(f, "merge"),
            Strategy::Nominated(rev) => write!(f, "nominated:{rev}"),
        }
    }
}

impl From<Strategy> for String {
    fn from(strategy: Strategy) -> Self {
        strategy.to_string()
    }
}

#[async_trait]
impl ConflictStrategy for Strategy {
    async fn resolve(&self, store: &dyn DocumentStore, id: &str) -> Result<Outcome> {
        match self {
            Strategy::HighestFieldWins(field) => {
                HighestFieldWins::new(field.as_str()).resolve(store, id).await
            }
            Strategy::MergeAll => MergeAll.resolve(store, id).await,
            Strategy::Nominated(rev) => Nominated::new(rev.as_str()).resolve(store, id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(
            "nominated:4-abc".parse::<Strategy>().unwrap(),
            Strategy::Nominated("4-abc".into())
        );
        assert_eq!(" merge ".parse::<Strategy>().unwrap(), Strategy::MergeAll);
        assert!("merge:x".parse::<Strategy>().is_err());
        assert!("nominated".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for s in ["highest:ts", "merge", "nominated:2-b"] {
            assert_eq!(s.parse::<Strategy>().unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_serde() {
        let strategy: Strategy = serde_json::from_str("\"highest:score\"").unwrap();
        assert_eq!(strategy, Strategy::HighestFieldWins("score".into()));
        assert_eq!(serde_json::to_string(&Strategy::MergeAll).unwrap(), "\"merge\"");
        assert!(serde_json::from_str::<Strategy>("\"bogus\"").is_err());
    }
}
