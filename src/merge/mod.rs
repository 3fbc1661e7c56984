//! Field-level merging of conflicting revisions.
//!
//! When the [`MergeAll`](crate::strategy::MergeAll) strategy collapses a
//! conflicted document, every losing leaf is overlaid onto the winner one after
//! another. The overlay is unconditional: there is no per-field conflict
//! detection, so across a sequence of merges the last leaf applied wins each
//! field it sets.
//!
//! | Field kind | Behaviour |
//! |------------|-----------|
//! | `_id`, `_rev` | Never copied; the target keeps its identity |
//! | `_deleted` | Never copied; a merge cannot turn a live winner into a tombstone |
//! | Everything else | Copied from the source, replacing any value in the target |
//!
//! # Examples
//!
//! ```
//! use couch_deconflict::Document;
//! use couch_deconflict::merge::merge_into;
//! use serde_json::json;
//!
//! let mut winner = Document::new("d1", "3-w").with_field("a", 1).with_field("b", 1);
//! let loser = Document::new("d1", "3-l").with_field("b", 2).with_field("c", 2);
//!
//! merge_into(&mut winner, &loser);
//!
//! assert_eq!(winner.rev, "3-w");
//! assert_eq!(winner.get("a"), Some(&json!(1)));
//! assert_eq!(winner.get("b"), Some(&json!(2)));
//! assert_eq!(winner.get("c"), Some(&json!(2)));
//! ```

pub mod fields;

pub use fields::{merge_all_into, merge_into};
