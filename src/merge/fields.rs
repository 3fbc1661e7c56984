//! Last-applied-wins field overlay.

use crate::types::Document;

/// Copy every application field of `source` into `target`.
///
/// Identity fields stay untouched because [`Document`] keeps them outside
/// `fields`. Returns `target` for chaining.
pub fn merge_into<'a>(target: &'a mut Document, source: &Document) -> &'a mut Document {
    for (name, value) in &source.fields {
        target.fields.insert(name.clone(), value.clone());
    }
    target
}

/// Overlay each source onto `target` in order.
pub fn merge_all_into<'a, 'b, I>(target: &'a mut Document, sources: I) -> &'a mut Document
where
    I: IntoIterator<Item = &'b Document>,
{
    for source in sources {
        merge_into(target, source);
    }
    target
}
