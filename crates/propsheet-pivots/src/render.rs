//! Rendering canonical terms as paths, labels and MSBuild conditions.

use crate::mdd::Term;
use crate::pivot::Pivot;
use derive_more::Display;
use itertools::Itertools;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Target {
    /// Folder name scoping package output, e.g. `x86/debug`.
    #[display("path")]
    Path,
    /// Readable boolean expression, e.g. `x86 & !debug`.
    #[display("label")]
    Label,
    /// An MSBuild `Condition` attribute value.
    #[display("msbuild")]
    MsBuild,
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "path" => Ok(Target::Path),
            "label" => Ok(Target::Label),
            "msbuild" => Ok(Target::MsBuild),
            other => Err(format!("unknown condition target `{other}`")),
        }
    }
}

pub(crate) fn render(term: &Term, target: Target, pivots: &[Pivot], package: &str) -> String {
    let renderer = Renderer {
        target,
        pivots,
        package,
    };
    match term {
        Term::Constant(true) => String::new(),
        Term::Constant(false) => match target {
            Target::Path => "none".to_string(),
            Target::Label | Target::MsBuild => "false".to_string(),
        },
        other => renderer.term(other, false),
    }
}

struct Renderer<'a> {
    target: Target,
    pivots: &'a [Pivot],
    package: &'a str,
}

impl Renderer<'_> {
    fn and(&self) -> &'static str {
        match self.target {
            Target::Path => "/",
            Target::Label => " & ",
            Target::MsBuild => " And ",
        }
    }

    fn or(&self) -> &'static str {
        match self.target {
            Target::Path => "+",
            Target::Label => " | ",
            Target::MsBuild => " Or ",
        }
    }

    fn group(&self, parts: Vec<String>, separator: &str, nested: bool) -> String {
        if parts.len() > 1 && nested {
            format!("({})", parts.join(separator))
        } else {
            parts.join(separator)
        }
    }

    fn choice_name(&self, pivot: usize, choice: usize) -> String {
        self.pivots
            .get(pivot)
            .and_then(|p| p.choices.get(choice))
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }

    fn term(&self, term: &Term, nested: bool) -> String {
        match term {
            Term::Constant(b) => b.to_string(),
            Term::Is {
                pivot,
                choices,
                negated,
            } => self.literal(*pivot, choices, *negated, nested),
            Term::And(items) => self.group(
                items.iter().map(|i| self.term(i, true)).collect(),
                self.and(),
                nested,
            ),
            Term::Or(items) => self.group(
                items.iter().map(|i| self.term(i, true)).collect(),
                self.or(),
                nested,
            ),
        }
    }

    fn literal(&self, pivot: usize, choices: &[usize], negated: bool, nested: bool) -> String {
        match self.target {
            Target::Path | Target::Label => {
                let separator = if self.target == Target::Path { "," } else { " | " };
                let names = choices
                    .iter()
                    .map(|&c| self.choice_name(pivot, c))
                    .collect_vec();
                if negated {
                    format!("!{}", self.group(names, separator, true))
                } else {
                    // a comma list needs no parentheses inside a path
                    self.group(names, separator, nested && self.target == Target::Label)
                }
            }
            Target::MsBuild => {
                let parts = choices
                    .iter()
                    .map(|&c| self.compare(pivot, c, negated))
                    .collect_vec();
                let separator = if negated { " And " } else { " Or " };
                self.group(parts, separator, nested)
            }
        }
    }

    fn compare(&self, pivot: usize, choice: usize, negated: bool) -> String {
        let Some(p) = self.pivots.get(pivot) else {
            return String::new();
        };
        let condition = p.choices.get(choice).and_then(|c| c.condition.as_ref());
        match (condition, negated) {
            (Some(condition), false) => format!("({condition})"),
            (Some(condition), true) => format!("!({condition})"),
            (None, false) => format!(
                "'$({})' == '{}'",
                p.property(self.package),
                self.choice_name(pivot, choice)
            ),
            (None, true) => format!(
                "'$({})' != '{}'",
                p.property(self.package),
                self.choice_name(pivot, choice)
            ),
        }
    }
}
