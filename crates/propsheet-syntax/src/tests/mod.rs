mod errors;

use crate::{parse_str, Document, Value};

/// Resolve the property at the dotted `path`.
pub(crate) fn resolved(document: &Document, path: &str) -> Option<Value> {
    document.root.property(path).map(|p| p.result())
}

pub(crate) fn parse(text: &str) -> Document {
    parse_str(text).unwrap()
}
