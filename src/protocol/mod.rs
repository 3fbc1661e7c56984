//! CouchDB wire format.
//!
//! This module knows the shape of the JSON a CouchDB-compatible store speaks for
//! the three calls conflict resolution needs:
//!
//! | Call | Request | Response |
//! |------|---------|----------|
//! | All leaves | `GET /{db}/{id}?open_revs=all` | `[{"ok": doc}, {"missing": rev}, ...]` |
//! | Current winner | `GET /{db}/{id}` | `doc` |
//! | Bulk write | `POST /{db}/_bulk_docs` with `{"docs": [...]}` | `[{"ok": true, "id", "rev"}, {"id", "error", "reason"}, ...]` |
//!
//! # Examples
//!
//! ```
//! use couch_deconflict::protocol::{decode_open_revs, is_identity_field};
//! use serde_json::json;
//!
//! let entries = decode_open_revs(json!([
//!     {"ok": {"_id": "d1", "_rev": "2-a", "n": 1}},
//!     {"missing": "2-zz"}
//! ])).unwrap();
//! assert_eq!(entries.len(), 2);
//! assert!(entries[0].ok().is_some());
//! assert!(entries[1].ok().is_none());
//!
//! assert!(is_identity_field("_rev"));
//! assert!(!is_identity_field("_attachments"));
//! ```

mod wire;

pub use wire::{decode_bulk_results, decode_open_revs, doc_path_segments, encode_bulk_docs};

/// Document id field
pub const ID_FIELD: &str = "_id";

/// Revision id field
pub const REV_FIELD: &str = "_rev";

/// Tombstone marker field
pub const DELETED_FIELD: &str = "_deleted";

/// Query parameter and value requesting every leaf revision
pub const OPEN_REVS_ALL: (&str, &str) = ("open_revs", "all");

/// Bulk write endpoint, relative to the database
pub const BULK_DOCS: &str = "_bulk_docs";

/// Document id prefixes whose `/` is part of the path rather than the id
pub const PATH_PREFIXES: [&str; 2] = ["_design/", "_local/"];

/// Whether `name` is one of the identity fields that merges never touch.
pub fn is_identity_field(name: &str) -> bool {
    name == ID_FIELD || name == REV_FIELD
}
