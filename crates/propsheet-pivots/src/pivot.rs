use crate::errors::{PivotError, PivotResult};
use propsheet_syntax::Selector;
use propsheet_view::View;
use tracing::trace;

/// One choice of a pivot, e.g. `x86` of `platform`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub name: String,
    /// Other tokens that select this choice in expressions.
    pub aliases: Vec<String>,
    pub description: Option<String>,
    /// A literal MSBuild condition used instead of comparing the pivot's property.
    pub condition: Option<String>,
}

/// A named axis of build configuration.
///
/// ```text
/// configurations {
///     platform {
///         key: Platform;
///         choices: { Win32, x64 };
///         Win32.aliases: { x86, ia32 };
///     }
///     configuration {
///         choices {
///             release { description: "optimized"; }
///             debug { aliases: { dbg }; }
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pivot {
    pub name: String,
    /// The MSBuild property this pivot maps onto, when it is a built-in one.
    pub key: Option<String>,
    pub description: Option<String>,
    pub choices: Vec<Choice>,
}

fn text(view: View<'_>, path: &str) -> PivotResult<Option<String>> {
    match view.get(path)? {
        Some(v) if v.has_property() => Ok(Some(v.value()?)),
        _ => Ok(None),
    }
}

fn list(view: View<'_>, path: &str) -> PivotResult<Vec<String>> {
    match view.get(path)? {
        Some(v) if v.has_property() => Ok(v
            .values()?
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect()),
        _ => Ok(vec![]),
    }
}

impl Pivot {
    /// Read a pivot from its view under `configurations`.
    pub fn from_view(view: View<'_>) -> PivotResult<Pivot> {
        let name = view.name().to_string();

        let names: Vec<(String, Option<View<'_>>)> = match view.get("choices")? {
            Some(choices) if choices.has_property() => choices
                .values()?
                .into_iter()
                .filter(|s| !s.is_empty())
                .map(|s| (s, None))
                .collect(),
            Some(choices) => choices
                .children()?
                .into_iter()
                .map(|c| (c.name().to_string(), Some(c)))
                .collect(),
            None => vec![],
        };

        let mut choices: Vec<Choice> = vec![];
        for (choice, detail) in names {
            if choices.iter().any(|c| c.name.eq_ignore_ascii_case(&choice)) {
                return Err(PivotError::DuplicateChoice {
                    pivot: name,
                    choice,
                });
            }

            let detail = match detail {
                Some(d) => Some(d),
                None => view.child(&Selector::new(choice.as_str()))?,
            };
            let choice = match detail {
                Some(d) => Choice {
                    aliases: list(d, "aliases")?,
                    description: text(d, "description")?,
                    condition: text(d, "condition")?,
                    name: choice,
                },
                None => Choice {
                    name: choice,
                    aliases: vec![],
                    description: None,
                    condition: None,
                },
            };
            trace!(pivot = %name, choice = %choice.name, aliases = ?choice.aliases, "choice");
            choices.push(choice);
        }

        Ok(Pivot {
            key: text(view, "key")?,
            description: text(view, "description")?,
            name,
            choices,
        })
    }

    /// The index of the choice named `token`, ignoring case.
    pub fn choice_index(&self, token: &str) -> Option<usize> {
        self.choices
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(token))
    }

    /// The index of the choice that lists `token` among its aliases, ignoring case.
    pub fn alias_index(&self, token: &str) -> Option<usize> {
        self.choices
            .iter()
            .position(|c| c.aliases.iter().any(|a| a.eq_ignore_ascii_case(token)))
    }

    /// The MSBuild property compared against this pivot's choices.
    pub fn property(&self, package: &str) -> String {
        match &self.key {
            Some(key) => key.clone(),
            None => format!("{}-{package}", self.name),
        }
    }
}
