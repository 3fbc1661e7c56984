//! Core types for revision-tree conflict resolution.
//!
//! These types model what a CouchDB-style store hands back when asked for every
//! leaf of a document (`open_revs=all`), and what it accepts in a `_bulk_docs`
//! write. All of them are ephemeral: a resolution call builds them from a single
//! fetch and drops them once the write-back batch is submitted.
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Document`] | One revision of a document: identity fields plus arbitrary JSON fields |
//! | [`BranchEntry`] | One entry of an all-revisions fetch: a leaf or a missing branch |
//! | [`Deletion`] | Tombstone instruction retiring exactly one leaf |
//! | [`Mutation`] | An entry of a bulk write: a deletion or an upsert |
//! | [`WriteResult`] | Per-mutation acknowledgement or error |
//! | [`BulkReport`] | The per-mutation results of one bulk write, in request order |
//! | [`Outcome`] | What a strategy did: nothing, or a bulk write |

use crate::error::{DeconflictError, Result};
use crate::protocol::{is_identity_field, DELETED_FIELD, ID_FIELD, REV_FIELD};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A single revision of a document.
///
/// The identity fields (`_id`, `_rev`) and the deleted marker live in dedicated
/// struct fields; everything else the store returned is kept in `fields`,
/// including other underscore-prefixed metadata such as `_attachments`.
///
/// # Examples
///
/// ```
/// use couch_deconflict::Document;
/// use serde_json::json;
///
/// let doc = Document::new("d1", "2-abc").with_field("score", 7);
/// assert_eq!(doc.get("score"), Some(&json!(7)));
/// assert_eq!(doc.generation(), Some(2));
/// assert_eq!(doc.to_json(), json!({"_id": "d1", "_rev": "2-abc", "score": 7}));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document id, stable across all revisions
    pub id: String,
    /// Store-assigned revision id, unique per state of the document
    pub rev: String,
    /// Whether this leaf is a tombstone
    pub deleted: bool,
    /// Application fields
    pub fields: Map<String, Value>,
}

impl Document {
    /// Create a live document with no application fields.
    pub fn new(id: impl Into<String>, rev: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rev: rev.into(),
            deleted: false,
            fields: Map::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Mark this leaf as deleted.
    pub fn into_deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    /// Read an application field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set an application field. Identity fields are ignored.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        if is_identity_field(&name) || name == DELETED_FIELD {
            return;
        }
        self.fields.insert(name, value.into());
    }

    /// Generation number of the revision (the `N` of `N-hash`).
    pub fn generation(&self) -> Option<u64> {
        revision_generation(&self.rev)
    }

    /// Encode in CouchDB wire form (`_id`, `_rev`, `_deleted`, then fields).
    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.fields.len() + 3);
        map.insert(ID_FIELD.to_string(), Value::String(self.id.clone()));
        map.insert(REV_FIELD.to_string(), Value::String(self.rev.clone()));
        if self.deleted {
            map.insert(DELETED_FIELD.to_string(), Value::Bool(true));
        }
        for (k, v) in &self.fields {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }

    /// Decode from CouchDB wire form.
    ///
    /// Fails with [`DeconflictError::Structural`] when the value is not an object
    /// or lacks a string `_id` or `_rev`.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(DeconflictError::Structural(
                "document is not a JSON object".to_string(),
            ));
        };

        let id = take_string(&mut map, ID_FIELD)?;
        let rev = take_string(&mut map, REV_FIELD).map_err(|e| match e {
            DeconflictError::Structural(msg) => {
                DeconflictError::Structural(format!("{msg} (document {id})"))
            }
            other => other,
        })?;
        let deleted = matches!(map.remove(DELETED_FIELD), Some(Value::Bool(true)));

        Ok(Self {
            id,
            rev,
            deleted,
            fields: map,
        })
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Result<String> {
    match map.remove(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(_) => Err(DeconflictError::Structural(format!("{key} is not a non-empty string"))),
        None => Err(DeconflictError::Structural(format!("missing {key}"))),
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Document::from_json(value).map_err(serde::de::Error::custom)
    }
}

/// Parse the generation number out of a `N-hash` revision id.
pub fn revision_generation(rev: &str) -> Option<u64> {
    rev.split_once('-').and_then(|(n, _)| n.parse().ok())
}

/// One entry of an all-revisions fetch.
///
/// `Ok` carries a leaf (live or deleted). `Missing` is a branch the store could
/// not materialize; it carries the requested revision, or the raw entry text
/// when the store gave no revision.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchEntry {
    /// A leaf revision
    Ok(Document),
    /// A branch the store could not return
    Missing(String),
}

impl BranchEntry {
    /// The leaf document, if this entry carries one.
    pub fn ok(&self) -> Option<&Document> {
        match self {
            BranchEntry::Ok(doc) => Some(doc),
            BranchEntry::Missing(_) => None,
        }
    }
}

/// A tombstone instruction retiring exactly one leaf.
///
/// Serializes to `{"_id": ..., "_rev": ..., "_deleted": true}` and carries no
/// application fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deletion {
    /// Document id
    #[serde(rename = "_id")]
    pub id: String,
    /// Revision being retired
    #[serde(rename = "_rev")]
    pub rev: String,
    /// Always `true`
    #[serde(rename = "_deleted")]
    pub deleted: bool,
}

impl Deletion {
    /// Create a deletion for one revision.
    pub fn new(id: impl Into<String>, rev: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rev: rev.into(),
            deleted: true,
        }
    }
}

/// One entry of a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Retire a leaf
    Delete(Deletion),
    /// Write a document on top of its `_rev`, creating a new revision
    Upsert(Document),
}

impl Mutation {
    /// Document id this mutation targets.
    pub fn id(&self) -> &str {
        match self {
            Mutation::Delete(d) => &d.id,
            Mutation::Upsert(doc) => &doc.id,
        }
    }

    /// Revision this mutation is based on.
    pub fn rev(&self) -> &str {
        match self {
            Mutation::Delete(d) => &d.rev,
            Mutation::Upsert(doc) => &doc.rev,
        }
    }

    /// Encode in CouchDB wire form.
    pub fn to_json(&self) -> Value {
        match self {
            Mutation::Delete(d) => serde_json::json!({
                "_id": d.id,
                "_rev": d.rev,
                "_deleted": true,
            }),
            Mutation::Upsert(doc) => doc.to_json(),
        }
    }
}

impl From<Deletion> for Mutation {
    fn from(d: Deletion) -> Self {
        Mutation::Delete(d)
    }
}

impl Serialize for Mutation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Result of one mutation in a bulk write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// The mutation was applied; `rev` is the new revision id
    Ok {
        /// Document id
        id: String,
        /// Newly created revision
        rev: String,
    },
    /// The mutation was rejected (e.g. stale revision)
    Error {
        /// Document id
        id: String,
        /// Short error code, e.g. `conflict`
        error: String,
        /// Human-readable reason
        reason: String,
    },
}

impl WriteResult {
    /// Whether this mutation was applied.
    pub fn is_ok(&self) -> bool {
        matches!(self, WriteResult::Ok { .. })
    }

    /// Document id this result refers to.
    pub fn id(&self) -> &str {
        match self {
            WriteResult::Ok { id, .. } | WriteResult::Error { id, .. } => id,
        }
    }
}

/// Per-mutation results of a bulk write, in request order.
///
/// Items succeed or fail independently; callers decide whether partial
/// success is acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BulkReport(pub Vec<WriteResult>);

impl BulkReport {
    /// All results in request order.
    pub fn results(&self) -> &[WriteResult] {
        &self.0
    }

    /// Whether every mutation was applied.
    pub fn is_complete(&self) -> bool {
        self.0.iter().all(WriteResult::is_ok)
    }

    /// Rejected mutations.
    pub fn failures(&self) -> impl Iterator<Item = &WriteResult> {
        self.0.iter().filter(|r| !r.is_ok())
    }

    /// Number of applied mutations.
    pub fn succeeded(&self) -> usize {
        self.0.iter().filter(|r| r.is_ok()).count()
    }

    /// Number of results.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the report holds no results.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<WriteResult>> for BulkReport {
    fn from(results: Vec<WriteResult>) -> Self {
        BulkReport(results)
    }
}

/// What a resolution strategy did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// At most one live leaf remained after filtering; nothing was written.
    NotConflicted,
    /// A bulk write was submitted; its per-mutation results are attached.
    Written(BulkReport),
}

impl Outcome {
    /// Whether the document had no actionable conflict.
    pub fn is_not_conflicted(&self) -> bool {
        matches!(self, Outcome::NotConflicted)
    }

    /// The bulk-write report, if a write was made.
    pub fn report(&self) -> Option<&BulkReport> {
        match self {
            Outcome::Written(report) => Some(report),
            Outcome::NotConflicted => None,
        }
    }
}
