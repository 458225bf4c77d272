//! Expansion of iterator values (`source => template`, `(a, b) => template`).

use crate::value::Value;
use itertools::Itertools;
use propsheet_util::expand::{ExpandError, ExpandResult, MacroExpander};

/// The positional items bound while a template is evaluated for one tuple.
#[derive(Debug, Clone, Copy)]
pub struct EachItems<'a>(pub &'a [Value]);

impl EachItems<'_> {
    /// Resolve `each`, `N` or `N.M...` against the bound items. `each` is the first item;
    /// a trailing numeric path indexes into a collection item.
    pub fn resolve(&self, name: &str) -> Option<String> {
        let mut parts = name.split('.');
        let head = parts.next()?.trim();
        let index = match head {
            "each" => 0,
            n => n.parse::<usize>().ok()?,
        };

        let mut item = self.0.get(index)?.clone();
        for part in parts {
            let i = part.trim().parse::<usize>().ok()?;
            item = item.items().get(i)?.clone();
        }
        Some(item.value())
    }
}

/// The template strings an iterator evaluates: one per element for a collection template.
pub fn template_texts(template: &Value) -> Vec<String> {
    match template {
        Value::Collection(items) => items.iter().map(Value::value).collect(),
        other => vec![other.value()],
    }
}

/// Evaluate `template` once per tuple in the cross product of `sources`, binding the tuple
/// positionally. Macros the tuple cannot satisfy are left in place.
pub fn expand_iterator(sources: &[Vec<Value>], template: &str) -> ExpandResult<Vec<String>> {
    expand_iterator_with::<_, ExpandError>(sources, template, &MacroExpander::default(), |_| {
        Ok(None)
    })
}

/// Like [`expand_iterator`], but `outer` gets the first chance at every macro name; the
/// tuple items are only consulted for names `outer` does not know.
pub fn expand_iterator_with<F, E>(
    sources: &[Vec<Value>],
    template: &str,
    expander: &MacroExpander,
    mut outer: F,
) -> Result<Vec<String>, E>
where
    F: FnMut(&str) -> Result<Option<String>, E>,
    E: From<ExpandError>,
{
    if sources.is_empty() {
        return Ok(vec![]);
    }

    sources
        .iter()
        .map(|items| items.iter().cloned())
        .multi_cartesian_product()
        .map(|tuple| {
            let each = EachItems(&tuple);
            expander.try_expand(template, |name| match outer(name)? {
                Some(v) => Ok(Some(v)),
                None => Ok(each.resolve(name)),
            })
        })
        .collect()
}
