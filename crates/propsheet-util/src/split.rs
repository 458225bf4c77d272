use itertools::Itertools;
use regex::{Captures, Regex};
use rowan::{TextRange, TextSize};
use std::borrow::Cow;

/// Split `s` at every character matching `is_separator`, except inside `${...}` macro
/// references. Each returned range is trimmed of surrounding whitespace, and empty pieces
/// are dropped.
pub fn split_outside_macros(s: &str, is_separator: impl Fn(char) -> bool) -> Vec<TextRange> {
    struct SplitItem {
        inexpr: u32,
        char_pos: usize,
        char: char,
    }

    #[derive(Default)]
    struct SplitState {
        previous_char: Option<char>,
        inexpr: u32,
    }

    let iter = s
        .char_indices()
        // depth of `${` nesting at each character
        .scan(SplitState::default(), |state: &mut SplitState, b| {
            match b.1 {
                '{' if matches!(state.previous_char, Some('$')) => state.inexpr += 1,
                '}' => state.inexpr = state.inexpr.saturating_sub(1),
                _ => {}
            }

            state.previous_char = Some(b.1);

            Some(SplitItem {
                inexpr: state.inexpr,
                char_pos: b.0,
                char: b.1,
            })
        })
        .chunk_by(|item| is_separator(item.char) && (item.inexpr == 0));

    let mut ret = vec![];
    for (is_sep, group) in &iter {
        if is_sep {
            continue;
        }

        let group = group.collect::<Vec<_>>();
        let Some(first) = group.iter().position(|item| !item.char.is_whitespace()) else {
            continue;
        };
        let last = group
            .iter()
            .rposition(|item| !item.char.is_whitespace())
            .unwrap_or(first);

        let range_start = group[first].char_pos;
        let range_end = group[last].char_pos + group[last].char.len_utf8();
        ret.push(TextRange::new(
            TextSize::from(range_start as u32),
            TextSize::from(range_end as u32),
        ));
    }
    ret
}

/// Comma-separated pieces of `s`, respecting `${...}` references.
pub fn split_commas(s: &str) -> Vec<&str> {
    split_outside_macros(s, |c| c == ',')
        .into_iter()
        .map(|range| &s[range])
        .collect()
}

/// `Regex::replace_all` with a replacement that can fail; the first error wins.
pub trait ReplaceFallible {
    fn replace_fallible<'t, F, E>(&self, text: &'t str, rep: F) -> Result<Cow<'t, str>, E>
    where
        F: FnMut(&Captures) -> Result<String, E>;
}

impl ReplaceFallible for Regex {
    fn replace_fallible<'t, F, E>(&self, text: &'t str, mut rep: F) -> Result<Cow<'t, str>, E>
    where
        F: FnMut(&Captures) -> Result<String, E>,
    {
        let mut error = None;

        let ret = self.replace_all(text, |caps: &Captures| {
            if error.is_some() {
                return Cow::Borrowed("");
            }
            match rep(caps) {
                Err(e) => {
                    error = Some(e);
                    Cow::Borrowed("")
                }
                Ok(v) => Cow::Owned(v),
            }
        });

        match error {
            Some(e) => Err(e),
            None => Ok(ret),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::split::{split_commas, split_outside_macros, ReplaceFallible};
    use pretty_assertions::assert_eq;
    use regex::Regex;

    #[test]
    fn whitespace_split_keeps_macros_whole() {
        let input = "  A B C  D E F ${Q B P} G";
        let parts = split_outside_macros(input, char::is_whitespace)
            .into_iter()
            .map(|range| &input[range])
            .collect::<Vec<_>>();

        assert_eq!(parts, &["A", "B", "C", "D", "E", "F", "${Q B P}", "G"]);
    }

    #[test]
    fn comma_split() {
        assert_eq!(split_commas("a, b ,c"), vec!["a", "b", "c"]);
        assert_eq!(split_commas("x, ${a,b}, , y"), vec!["x", "${a,b}", "y"]);
        assert!(split_commas("  ").is_empty());
    }

    #[test]
    fn replace_fallible_stops_at_first_error() {
        let re = Regex::new(r"\d").unwrap();
        let ok: Result<_, ()> = re.replace_fallible("a1b2", |c| Ok(format!("<{}>", &c[0])));
        assert_eq!(ok.unwrap(), "a<1>b<2>");

        let err = re.replace_fallible("a1b2", |c| {
            if &c[0] == "2" {
                Err("two")
            } else {
                Ok(String::new())
            }
        });
        assert_eq!(err, Err("two"));
    }
}
