use crate::iterator::{expand_iterator, template_texts};
use itertools::Itertools;
use propsheet_util::expand::ExpandResult;
use propsheet_util::split::split_commas;
use std::fmt::{Display, Formatter};

/// The right-hand side of a property declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Flattened token text, trimmed.
    Scalar(String),
    /// `{ a, b, c }`
    Collection(Vec<Value>),
    /// An `<...>` block, passed through untouched.
    Instruction(String),
    /// `source => template` or `(a, b) => template`
    Iterator(IteratorValue),
}

/// Deferred cross-product template expansion: the template is evaluated once for each
/// tuple of elements drawn from `sources`, with `${0}`, `${1}`, ... (and `${each}`) bound to
/// the tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IteratorValue {
    pub sources: Vec<Value>,
    pub template: Box<Value>,
}

impl Value {
    pub fn empty() -> Value {
        Value::Scalar(String::new())
    }

    pub fn scalar<S: Into<String>>(s: S) -> Value {
        Value::Scalar(s.into())
    }

    pub fn collection<I, S>(items: I) -> Value
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::Collection(items.into_iter().map(|s| Value::Scalar(s.into())).collect())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Value::Scalar(s) | Value::Instruction(s) => s.is_empty(),
            Value::Collection(items) => items.is_empty(),
            Value::Iterator(it) => it.sources.is_empty(),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Value::Collection(_))
    }

    /// Collapse to one string. Collections are joined with `", "`. An iterator is kept in
    /// its written form; [`Value::try_value`] expands it.
    pub fn value(&self) -> String {
        match self {
            Value::Scalar(s) | Value::Instruction(s) => s.clone(),
            Value::Collection(items) => items.iter().map(Value::value).join(", "),
            Value::Iterator(_) => self.to_string(),
        }
    }

    /// Collapse to a list of strings. A bare scalar is split at commas (outside `${...}`);
    /// scalars that are already collection elements are not split again. An iterator is
    /// one element in its written form.
    pub fn values(&self) -> Vec<String> {
        match self {
            Value::Scalar(s) => split_commas(s).into_iter().map(String::from).collect(),
            Value::Instruction(s) => vec![s.clone()],
            Value::Collection(items) => items
                .iter()
                .flat_map(|item| match item {
                    Value::Scalar(s) => vec![s.clone()],
                    other => other.values(),
                })
                .collect(),
            Value::Iterator(_) => vec![self.to_string()],
        }
    }

    /// [`Value::value`] with iterators expanded.
    pub fn try_value(&self) -> ExpandResult<String> {
        Ok(match self {
            Value::Collection(items) => items
                .iter()
                .map(Value::try_value)
                .collect::<ExpandResult<Vec<_>>>()?
                .join(", "),
            Value::Iterator(it) => it.expand()?.join(", "),
            other => other.value(),
        })
    }

    /// [`Value::values`] with iterators expanded.
    pub fn try_values(&self) -> ExpandResult<Vec<String>> {
        match self {
            Value::Collection(items) => {
                let mut ret = vec![];
                for item in items {
                    match item {
                        Value::Scalar(s) => ret.push(s.clone()),
                        other => ret.extend(other.try_values()?),
                    }
                }
                Ok(ret)
            }
            Value::Iterator(it) => it.expand(),
            other => Ok(other.values()),
        }
    }

    /// The elements of this value as values: collection items, or comma-split scalars.
    pub fn items(&self) -> Vec<Value> {
        match self {
            Value::Collection(items) => items.clone(),
            Value::Instruction(_) | Value::Iterator(_) => vec![self.clone()],
            _ => self.values().into_iter().map(Value::Scalar).collect(),
        }
    }

    /// [`Value::items`] with an iterator replaced by its expansion.
    pub fn try_items(&self) -> ExpandResult<Vec<Value>> {
        match self {
            Value::Iterator(it) => Ok(it.expand()?.into_iter().map(Value::Scalar).collect()),
            other => Ok(other.items()),
        }
    }

    /// Rewrite every piece of scalar text (instructions stay opaque). Iterator templates are
    /// left alone; they are only meaningful once per tuple.
    pub fn try_map_text<E>(&self, f: &mut dyn FnMut(&str) -> Result<String, E>) -> Result<Value, E> {
        Ok(match self {
            Value::Scalar(s) => Value::Scalar(f(s)?),
            Value::Instruction(s) => Value::Instruction(s.clone()),
            Value::Collection(items) => Value::Collection(
                items
                    .iter()
                    .map(|item| item.try_map_text(f))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Iterator(it) => Value::Iterator(IteratorValue {
                sources: it
                    .sources
                    .iter()
                    .map(|s| s.try_map_text(f))
                    .collect::<Result<_, _>>()?,
                template: it.template.clone(),
            }),
        })
    }
}

impl IteratorValue {
    pub fn new(sources: Vec<Value>, template: Value) -> Self {
        IteratorValue {
            sources,
            template: Box::new(template),
        }
    }

    /// The element lists the template iterates over.
    pub fn source_items(&self) -> ExpandResult<Vec<Vec<Value>>> {
        self.sources.iter().map(Value::try_items).collect()
    }

    /// Evaluate the template for every tuple, with nothing but the tuple to resolve macros.
    pub fn expand(&self) -> ExpandResult<Vec<String>> {
        let sources = self.source_items()?;
        let mut ret = vec![];
        for template in template_texts(&self.template) {
            ret.extend(expand_iterator(&sources, &template)?);
        }
        Ok(ret)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::empty()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(s)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Scalar(s) => write!(f, "{s}"),
            Value::Instruction(s) => write!(f, "<{s}>"),
            Value::Collection(items) => write!(f, "{{ {} }}", items.iter().join(", ")),
            Value::Iterator(it) => {
                if it.sources.len() == 1 {
                    write!(f, "{} => {}", it.sources[0], it.template)
                } else {
                    write!(f, "({}) => {}", it.sources.iter().join(", "), it.template)
                }
            }
        }
    }
}
