//! Encoding and decoding of CouchDB request and response bodies.

use super::{BULK_DOCS, PATH_PREFIXES};
use crate::error::{DeconflictError, Result};
use crate::types::{BranchEntry, Document, Mutation, WriteResult};
use serde_json::{json, Value};

/// Decode an `open_revs=all` response into branch entries, in response order.
///
/// `{"ok": doc}` entries become [`BranchEntry::Ok`]; everything else becomes
/// [`BranchEntry::Missing`]. A leaf without `_id`/`_rev` is a
/// [`DeconflictError::Structural`] error.
pub fn decode_open_revs(body: Value) -> Result<Vec<BranchEntry>> {
    let Value::Array(entries) = body else {
        return Err(DeconflictError::Fetch(
            "open_revs response is not an array".to_string(),
        ));
    };

    entries
        .into_iter()
        .map(|entry| match entry {
            Value::Object(mut obj) => match obj.remove("ok") {
                Some(doc) => Document::from_json(doc).map(BranchEntry::Ok),
                None => Ok(BranchEntry::Missing(match obj.remove("missing") {
                    Some(Value::String(rev)) => rev,
                    _ => Value::Object(obj).to_string(),
                })),
            },
            other => Ok(BranchEntry::Missing(other.to_string())),
        })
        .collect()
}

/// Encode mutations as a `_bulk_docs` request body.
pub fn encode_bulk_docs(mutations: &[Mutation]) -> Value {
    let docs: Vec<Value> = mutations.iter().map(Mutation::to_json).collect();
    json!({ "docs": docs })
}

/// Decode a `_bulk_docs` response into per-mutation results.
pub fn decode_bulk_results(body: Value) -> Result<Vec<WriteResult>> {
    let Value::Array(rows) = body else {
        return Err(DeconflictError::Structural(format!(
            "{BULK_DOCS} response is not an array"
        )));
    };

    rows.into_iter().map(decode_bulk_row).collect()
}

fn decode_bulk_row(row: Value) -> Result<WriteResult> {
    let text = |key: &str| row.get(key).and_then(Value::as_str).map(str::to_string);

    let id = text("id").ok_or_else(|| {
        DeconflictError::Structural(format!("{BULK_DOCS} row without id: {row}"))
    })?;

    if let Some(error) = text("error") {
        return Ok(WriteResult::Error {
            id,
            error,
            reason: text("reason").unwrap_or_default(),
        });
    }

    match text("rev") {
        Some(rev) => Ok(WriteResult::Ok { id, rev }),
        None => Err(DeconflictError::Structural(format!(
            "{BULK_DOCS} row without rev or error: {row}"
        ))),
    }
}

/// Split a document id into URL path segments.
///
/// Ids are a single segment except for design and local documents, whose
/// prefix slash is kept as a path separator.
pub fn doc_path_segments(id: &str) -> Vec<&str> {
    for prefix in PATH_PREFIXES {
        if let Some(rest) = id.strip_prefix(prefix) {
            return vec![&prefix[..prefix.len() - 1], rest];
        }
    }
    vec![id]
}
