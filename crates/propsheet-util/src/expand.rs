//! `${...}` macro expansion.
//!
//! A value like `${SRC}\include\${arch}` is expanded by repeatedly replacing every macro
//! reference whose name a resolver knows about, until a pass changes nothing. Unknown
//! macros are left in the text exactly as written.

use crate::split::ReplaceFallible;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scopeguard::{defer, guard, ScopeGuard};
use std::cell::RefCell;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, trace};

static MACRO_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^{}$]+)\}").unwrap());

pub const DEFAULT_MAX_PASSES: usize = 32;

/// Longest text (in bytes) an expansion may produce before it is abandoned.
pub const DEFAULT_MAX_LENGTH: usize = 1 << 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpandError {
    #[error("macro `${{{name}}}` references itself")]
    RecursiveReference { name: String },

    #[error("macro expansion of `{text}` did not settle after {passes} passes")]
    TooManyPasses { passes: usize, text: String },

    #[error("macro expansion of `{text}` grew past {limit} bytes")]
    TooLong { limit: usize, text: String },
}

pub type ExpandResult<T> = Result<T, ExpandError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandOptions {
    pub max_passes: usize,
    /// Upper bound on the expanded text, checked after every pass.
    pub max_length: usize,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        ExpandOptions {
            max_passes: DEFAULT_MAX_PASSES,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

#[derive(Debug, Default)]
struct ExpansionState {
    visited: HashSet<String>,
}

/// Drives macro expansion. Resolvers may call back into the same expander (for instance
/// when a macro names a property whose own value contains macros); the names currently
/// being resolved are tracked across those nested calls so a self-reference fails instead
/// of looping.
#[derive(Debug, Default)]
pub struct MacroExpander {
    options: ExpandOptions,
    expand_state: RefCell<Option<ExpansionState>>,
}

impl MacroExpander {
    pub fn new(options: ExpandOptions) -> Self {
        MacroExpander {
            options,
            expand_state: RefCell::new(None),
        }
    }

    pub fn options(&self) -> ExpandOptions {
        self.options
    }

    pub fn expand<F>(&self, text: &str, resolve: F) -> ExpandResult<String>
    where
        F: FnMut(&str) -> ExpandResult<Option<String>>,
    {
        self.try_expand(text, resolve)
    }

    /// Like [`expand`](MacroExpander::expand), for resolvers with their own error type.
    pub fn try_expand<F, E>(&self, text: &str, mut resolve: F) -> Result<String, E>
    where
        F: FnMut(&str) -> Result<Option<String>, E>,
        E: From<ExpandError>,
    {
        // The outermost call owns the expansion state and clears it on the way out
        let scope = guard((), |()| {
            RefCell::borrow_mut(&self.expand_state).take();
        });

        {
            let mut s = RefCell::borrow_mut(&self.expand_state);
            if s.is_none() {
                *s = Some(ExpansionState::default());
            } else {
                ScopeGuard::into_inner(scope);
            }
        }

        let mut value = text.to_string();
        for pass in 0..=self.options.max_passes {
            if !value.contains("${") {
                break;
            }

            trace!(pass, %value, "expanding");
            let new_value = MACRO_REGEX.replace_fallible(&value, |caps: &Captures| -> Result<String, E> {
                let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default().trim();

                {
                    let mut s = RefCell::borrow_mut(&self.expand_state);
                    let visited = &mut s.get_or_insert_with(ExpansionState::default).visited;
                    if !visited.insert(name.to_string()) {
                        return Err(ExpandError::RecursiveReference {
                            name: name.to_string(),
                        }
                        .into());
                    }
                }

                defer! {
                    if let Some(state) = RefCell::borrow_mut(&self.expand_state).as_mut() {
                        state.visited.remove(name);
                    }
                }

                match resolve(name)? {
                    Some(v) => Ok(v),
                    None => {
                        debug!(name, "unresolved macro left as written");
                        Ok(whole.to_string())
                    }
                }
            })?;

            if new_value == value {
                break;
            }
            if new_value.len() > self.options.max_length.max(text.len()) {
                return Err(ExpandError::TooLong {
                    limit: self.options.max_length,
                    text: text.to_string(),
                }
                .into());
            }
            if pass == self.options.max_passes {
                return Err(ExpandError::TooManyPasses {
                    passes: self.options.max_passes,
                    text: text.to_string(),
                }
                .into());
            }
            value = new_value.into_owned();
        }

        Ok(value)
    }
}

/// Expand with a fresh expander and default options.
pub fn expand<F>(text: &str, resolve: F) -> ExpandResult<String>
where
    F: FnMut(&str) -> ExpandResult<Option<String>>,
{
    MacroExpander::default().expand(text, resolve)
}

/// Whether `text` contains something that looks like a macro reference.
pub fn has_macros(text: &str) -> bool {
    MACRO_REGEX.is_match(text)
}
