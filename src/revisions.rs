//! Leaf filtering and tombstone encoding.
//!
//! An all-revisions fetch returns every leaf of a document's revision tree,
//! including deleted leaves and branches the store could not materialize. The
//! functions here reduce that to the *conflict set* (the live leaves that a
//! strategy must collapse) and turn losing leaves into tombstones.
//!
//! # Examples
//!
//! ```
//! use couch_deconflict::{BranchEntry, Document};
//! use couch_deconflict::revisions::{filter_leaves, to_deletions};
//!
//! let fetched = vec![
//!     BranchEntry::Ok(Document::new("d1", "2-a")),
//!     BranchEntry::Ok(Document::new("d1", "2-b").into_deleted()),
//!     BranchEntry::Missing("2-c".into()),
//!     BranchEntry::Ok(Document::new("d1", "2-d")),
//! ];
//!
//! let live = filter_leaves(&fetched, Some("2-d"));
//! assert_eq!(live.len(), 1);
//! assert_eq!(live[0].rev, "2-a");
//!
//! let deletions = to_deletions(&live).unwrap();
//! assert!(deletions[0].deleted);
//! ```

use crate::error::{DeconflictError, Result};
use crate::types::{BranchEntry, Deletion, Document};

/// Select the live leaves of a fetch result.
///
/// A leaf is kept when it was returned (`ok`), is not deleted, and, if
/// `exclude_rev` is given, has a different revision. Missing branches are
/// skipped silently. Fetch order is preserved and nothing is deduplicated.
pub fn filter_leaves(entries: &[BranchEntry], exclude_rev: Option<&str>) -> Vec<Document> {
    entries
        .iter()
        .filter_map(BranchEntry::ok)
        .filter(|doc| !doc.deleted)
        .filter(|doc| exclude_rev.map_or(true, |rev| doc.rev != rev))
        .cloned()
        .collect()
}

/// Project losing leaves onto tombstones, one per document, in order.
///
/// Fails with [`DeconflictError::Structural`] if a document has an empty id
/// or revision.
pub fn to_deletions(docs: &[Document]) -> Result<Vec<Deletion>> {
    docs.iter()
        .map(|doc| {
            if doc.id.is_empty() || doc.rev.is_empty() {
                return Err(DeconflictError::Structural(format!(
                    "cannot delete leaf without identity (id {:?}, rev {:?})",
                    doc.id, doc.rev
                )));
            }
            Ok(Deletion::new(doc.id.clone(), doc.rev.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(rev: &str) -> BranchEntry {
        BranchEntry::Ok(Document::new("d1", rev))
    }

    #[test]
    fn test_filter_skips_deleted_and_missing() {
        let entries = vec![
            leaf("3-a"),
            BranchEntry::Ok(Document::new("d1", "3-b").into_deleted()),
            BranchEntry::Missing("3-c".into()),
            leaf("3-d"),
        ];

        let live = filter_leaves(&entries, None);
        let revs: Vec<&str> = live.iter().map(|d| d.rev.as_str()).collect();
        assert_eq!(revs, vec!["3-a", "3-d"]);
    }

    #[test]
    fn test_filter_excludes_revision() {
        let entries = vec![leaf("2-a"), leaf("2-b"), leaf("2-c")];

        let live = filter_leaves(&entries, Some("2-b"));
        let revs: Vec<&str> = live.iter().map(|d| d.rev.as_str()).collect();
        assert_eq!(revs, vec!["2-a", "2-c"]);

        // Excluding an unknown revision keeps everything
        assert_eq!(filter_leaves(&entries, Some("9-z")).len(), 3);
    }

    #[test]
    fn test_filter_empty() {
        assert!(filter_leaves(&[], None).is_empty());
    }

    #[test]
    fn test_to_deletions_preserves_order() {
        let docs = vec![
            Document::new("d1", "2-a").with_field("big", "payload"),
            Document::new("d1", "2-c"),
        ];

        let deletions = to_deletions(&docs).unwrap();
        assert_eq!(
            deletions,
            vec![Deletion::new("d1", "2-a"), Deletion::new("d1", "2-c")]
        );
    }

    #[test]
    fn test_to_deletions_requires_identity() {
        let docs = vec![Document::new("d1", "")];
        let err = to_deletions(&docs).unwrap_err();
        assert!(matches!(err, DeconflictError::Structural(_)));
    }
}
