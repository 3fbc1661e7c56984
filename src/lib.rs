#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Conflict resolution for CouchDB-style revision trees
//!
//! Multi-master replication never silently drops a write. When two nodes update
//! the same document independently, the store keeps both as divergent *leaf*
//! revisions and picks a deterministic but arbitrary winner. This crate
//! collapses such a document back to one live leaf with a single bulk write.
//!
//! ## Overview
//!
//! ```text
//! strategy ──► store.fetch_all_revisions(id)
//!          ──► filter_leaves        (drop deleted / missing / excluded leaves)
//!          ──► pick winner or merge
//!          ──► to_deletions (+ merged winner)
//!          ──► store.bulk_write(mutations) ──► Outcome
//! ```
//!
//! Three strategies are provided:
//!
//! 1. **[`HighestFieldWins`]** - keep the leaf with the greatest numeric value of a field
//! 2. **[`MergeAll`]** - layer every loser's fields onto the current winner and rewrite it
//! 3. **[`Nominated`]** - keep a revision the caller chose
//!
//! Deciding *when* to resolve (on a change feed, on read, in a batch job) is left
//! to the caller. No strategy retries; a stale revision surfaces as a rejected
//! row in the [`BulkReport`].
//!
//! ## Usage
//!
//! ```ignore
//! use couch_deconflict::client::{ClientConfig, CouchClient};
//! use couch_deconflict::{highest_field_wins, Outcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CouchClient::new(ClientConfig::for_database("orders"))?;
//!
//!     match highest_field_wins(&client, "order-17", "updated_at").await? {
//!         Outcome::NotConflicted => println!("nothing to do"),
//!         Outcome::Written(report) if report.is_complete() => println!("resolved"),
//!         Outcome::Written(report) => {
//!             for failure in report.failures() {
//!                 eprintln!("rejected: {:?}", failure);
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Documents, branch entries, mutations and outcomes
//! - **[error]** - Error types and result handling
//! - **[revisions]** - Leaf filtering and tombstone encoding
//! - **[merge]** - Field-level merging of revisions
//! - **[strategy]** - The resolution strategies
//! - **[store]** - The store contract and an in-memory store
//! - **[client]** - CouchDB HTTP client
//! - **[protocol]** - CouchDB wire format

pub mod client;
pub mod error;
pub mod merge;
pub mod protocol;
pub mod revisions;
pub mod store;
pub mod strategy;
pub mod types;

pub use client::{ClientConfig, CouchClient};
pub use error::{DeconflictError, Result};
pub use store::{DocumentStore, InMemoryStore};
pub use strategy::{
    conflict_set, highest_field_wins, merge_all, nominated, ConflictStrategy, HighestFieldWins,
    MergeAll, Nominated, Strategy,
};
pub use types::{BranchEntry, BulkReport, Deletion, Document, Mutation, Outcome, WriteResult};
