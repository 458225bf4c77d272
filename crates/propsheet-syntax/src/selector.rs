use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A path segment key: `name[parameter]<instruction>`.
///
/// `name` may be dotted (`a.b.c`), in which case the selector is *compound* and can be taken
/// apart with [`prefix`](Selector::prefix) and [`suffix`](Selector::suffix). The parameter
/// and instruction always belong to the last segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Selector {
    pub name: String,
    pub parameter: Option<String>,
    pub instruction: Option<String>,
}

/// Split at dots that are not inside `[...]` or `<...>`.
fn split_dotted(text: &str) -> Vec<&str> {
    let mut depth = 0usize;
    let mut start = 0;
    let mut parts = vec![];
    for (i, c) in text.char_indices() {
        match c {
            '[' | '<' => depth += 1,
            ']' | '>' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn first_dot(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '[' | '<' => depth += 1,
            ']' | '>' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

impl Selector {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Selector {
            name: name.into(),
            parameter: None,
            instruction: None,
        }
    }

    pub fn with_parameter<S: Into<String>>(mut self, parameter: S) -> Self {
        self.parameter = Some(parameter.into());
        self
    }

    pub fn with_instruction<S: Into<String>>(mut self, instruction: S) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    /// A selector with an empty parameter counts as parameterless.
    pub fn has_parameter(&self) -> bool {
        self.parameter.as_deref().is_some_and(|p| !p.is_empty())
    }

    pub fn is_compound(&self) -> bool {
        first_dot(&self.name).is_some()
    }

    /// The first segment of a compound selector.
    pub fn prefix(&self) -> Option<Selector> {
        let dot = first_dot(&self.name)?;
        Some(Self::parse_segment(&self.name[..dot]))
    }

    /// Everything after the first segment, keeping this selector's parameter and instruction.
    pub fn suffix(&self) -> Option<Selector> {
        let dot = first_dot(&self.name)?;
        Some(Selector {
            name: self.name[dot + 1..].to_string(),
            parameter: self.parameter.clone(),
            instruction: self.instruction.clone(),
        })
    }

    /// Join `prefix` in front of `suffix`; the inverse of `prefix()`/`suffix()`.
    pub fn compose(prefix: &Selector, suffix: &Selector) -> Selector {
        Selector {
            name: format!("{prefix}.{}", suffix.name),
            parameter: suffix.parameter.clone(),
            instruction: suffix.instruction.clone(),
        }
    }

    /// Build one compound selector out of single-segment selectors.
    pub fn from_segments(segments: &[Selector]) -> Option<Selector> {
        let (last, init) = segments.split_last()?;
        let mut ret = last.clone();
        for s in init.iter().rev() {
            ret = Selector::compose(s, &ret);
        }
        Some(ret)
    }

    /// The chain of single-segment selectors this (possibly compound) selector stands for.
    pub fn segments(&self) -> Vec<Selector> {
        let mut ret = vec![];
        let mut current = self.clone();
        while let (Some(prefix), Some(suffix)) = (current.prefix(), current.suffix()) {
            ret.push(prefix);
            current = suffix;
        }
        ret.push(current);
        ret
    }

    pub fn without_parameter(&self) -> Selector {
        Selector {
            name: self.name.clone(),
            parameter: None,
            instruction: self.instruction.clone(),
        }
    }

    /// Parse a dotted path like `a.b[x].c` into its segments.
    pub fn parse_path(text: &str) -> Vec<Selector> {
        split_dotted(text.trim())
            .into_iter()
            .map(Self::parse_segment)
            .collect()
    }

    fn parse_segment(text: &str) -> Selector {
        let text = text.trim();
        let (rest, instruction) = match (text.find('<'), text.ends_with('>')) {
            (Some(i), true) => (&text[..i], Some(text[i + 1..text.len() - 1].trim().to_string())),
            _ => (text, None),
        };
        let (name, parameter) = match (rest.find('['), rest.ends_with(']')) {
            (Some(i), true) => (&rest[..i], Some(rest[i + 1..rest.len() - 1].trim().to_string())),
            _ => (rest, None),
        };
        Selector {
            name: name.trim().to_string(),
            parameter,
            instruction,
        }
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        if let Some(parameter) = &self.parameter {
            write!(f, "[{parameter}]")?;
        }
        if let Some(instruction) = &self.instruction {
            write!(f, "<{instruction}>")?;
        }
        Ok(())
    }
}

impl FromStr for Selector {
    type Err = std::convert::Infallible;

    /// Parses `a.b[param]<instruction>` into a (possibly compound) selector.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = Selector::parse_path(s);
        Ok(Selector::from_segments(&segments).unwrap_or_else(|| Selector::new("")))
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        Selector::new(s)
    }
}
