//! Pivot expressions: choice tokens combined with `!`, `&` (or `,`, `\`, `/`), `|` and
//! parentheses. Two operands written next to each other are and-ed; `!` binds tightest,
//! then and, then or.

use crate::errors::{PivotError, PivotResult};
use derive_more::Display;
use muncher::Muncher;

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub(crate) enum Token {
    #[display("{_0}")]
    Choice(String),
    #[display("!")]
    Not,
    #[display("&")]
    And,
    #[display("|")]
    Or,
    #[display("(")]
    Open,
    #[display(")")]
    Close,
}

fn is_choice_char(c: char) -> bool {
    !(c.is_whitespace() || matches!(c, '!' | '&' | ',' | '\\' | '/' | '|' | '(' | ')'))
}

pub(crate) fn tokenize(text: &str) -> Vec<Token> {
    let mut muncher = Muncher::new(text);
    let mut tokens = vec![];

    while let Some(c) = muncher.eat() {
        muncher.reset_peek();
        let token = match c {
            c if c.is_whitespace() => continue,
            '!' => Token::Not,
            '&' | '|' => {
                // `&&` and `||` mean the same as the single characters
                if muncher.peek() == Some(&c) {
                    muncher.eat();
                }
                muncher.reset_peek();
                if c == '&' {
                    Token::And
                } else {
                    Token::Or
                }
            }
            ',' | '\\' | '/' => Token::And,
            '(' => Token::Open,
            ')' => Token::Close,
            c => {
                let mut name = c.to_string();
                while let Some(&next) = muncher.peek() {
                    if !is_choice_char(next) {
                        break;
                    }
                    name.push(next);
                    muncher.eat();
                    muncher.reset_peek();
                }
                muncher.reset_peek();
                Token::Choice(name)
            }
        };
        tokens.push(token);
    }
    tokens
}

/// A parsed expression over (pivot, choice) literals, both given as indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Expr {
    Choice { pivot: usize, choice: usize },
    Not(Box<Expr>),
    /// An empty conjunction is true.
    And(Vec<Expr>),
    /// An empty disjunction is false.
    Or(Vec<Expr>),
}

impl Expr {
    pub(crate) fn constant(value: bool) -> Expr {
        if value {
            Expr::And(vec![])
        } else {
            Expr::Or(vec![])
        }
    }

    pub(crate) fn as_constant(&self) -> Option<bool> {
        match self {
            Expr::And(items) if items.is_empty() => Some(true),
            Expr::Or(items) if items.is_empty() => Some(false),
            _ => None,
        }
    }

    /// `assignment[p]` is the chosen index for pivot `p`; anything out of range is unset.
    pub(crate) fn evaluate(&self, assignment: &[usize]) -> bool {
        match self {
            Expr::Choice { pivot, choice } => assignment.get(*pivot) == Some(choice),
            Expr::Not(inner) => !inner.evaluate(assignment),
            Expr::And(items) => items.iter().all(|i| i.evaluate(assignment)),
            Expr::Or(items) => items.iter().any(|i| i.evaluate(assignment)),
        }
    }

    pub(crate) fn mentions(&self, pivot: usize) -> bool {
        match self {
            Expr::Choice { pivot: p, .. } => *p == pivot,
            Expr::Not(inner) => inner.mentions(pivot),
            Expr::And(items) | Expr::Or(items) => items.iter().any(|i| i.mentions(pivot)),
        }
    }

    /// The expression with `pivot` fixed to `value`, constants folded away.
    pub(crate) fn restrict(&self, pivot: usize, value: usize) -> Expr {
        match self {
            Expr::Choice { pivot: p, choice } if *p == pivot => Expr::constant(*choice == value),
            Expr::Choice { .. } => self.clone(),
            Expr::Not(inner) => {
                let inner = inner.restrict(pivot, value);
                match inner.as_constant() {
                    Some(b) => Expr::constant(!b),
                    None => Expr::Not(Box::new(inner)),
                }
            }
            Expr::And(items) => fold(items.iter().map(|i| i.restrict(pivot, value)), true),
            Expr::Or(items) => fold(items.iter().map(|i| i.restrict(pivot, value)), false),
        }
    }
}

/// Combine `items` under and (`identity == true`) or or (`identity == false`).
fn fold(items: impl Iterator<Item = Expr>, identity: bool) -> Expr {
    let mut kept = vec![];
    for item in items {
        match item.as_constant() {
            Some(b) if b == identity => {}
            Some(_) => return Expr::constant(!identity),
            None => kept.push(item),
        }
    }
    match (kept.len(), identity) {
        (1, _) => kept.remove(0),
        (_, true) => Expr::And(kept),
        (_, false) => Expr::Or(kept),
    }
}

/// Recursive descent over the token list. `resolve` maps a choice token to its
/// (pivot, choice) indices.
pub(crate) struct ExpressionParser<'a, R> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    resolve: R,
}

impl<'a, R> ExpressionParser<'a, R>
where
    R: FnMut(&str) -> PivotResult<(usize, usize)>,
{
    pub(crate) fn new(text: &'a str, resolve: R) -> Self {
        ExpressionParser {
            text,
            tokens: tokenize(text),
            pos: 0,
            resolve,
        }
    }

    pub(crate) fn parse(mut self) -> PivotResult<Expr> {
        if self.tokens.is_empty() {
            return Ok(Expr::constant(true));
        }

        let expr = self.parse_or()?;
        match self.next() {
            None => Ok(expr),
            Some(Token::Close) => Err(self.unbalanced()),
            Some(token) => Err(self.unexpected(&token)),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_or(&mut self) -> PivotResult<Expr> {
        let mut terms = vec![self.parse_and()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            terms.push(self.parse_and()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::Or(terms)
        })
    }

    fn parse_and(&mut self) -> PivotResult<Expr> {
        let mut terms = vec![self.parse_unary()?];
        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.pos += 1;
                    terms.push(self.parse_unary()?);
                }
                Some(Token::Choice(_) | Token::Not | Token::Open) => {
                    terms.push(self.parse_unary()?)
                }
                _ => break,
            }
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::And(terms)
        })
    }

    fn parse_unary(&mut self) -> PivotResult<Expr> {
        match self.next() {
            Some(Token::Not) => Ok(Expr::Not(Box::new(self.parse_unary()?))),
            Some(Token::Open) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::Close) => Ok(inner),
                    None => Err(self.unbalanced()),
                    Some(token) => Err(self.unexpected(&token)),
                }
            }
            Some(Token::Choice(name)) => {
                let (pivot, choice) = (self.resolve)(&name)?;
                Ok(Expr::Choice { pivot, choice })
            }
            Some(Token::Close) => Err(self.unbalanced()),
            Some(token) => Err(self.unexpected(&token)),
            None => Err(PivotError::UnexpectedEnd {
                expression: self.text.to_string(),
            }),
        }
    }

    fn unbalanced(&self) -> PivotError {
        PivotError::UnbalancedParentheses {
            expression: self.text.to_string(),
        }
    }

    fn unexpected(&self, token: &Token) -> PivotError {
        PivotError::UnexpectedToken {
            token: token.to_string(),
            expression: self.text.to_string(),
        }
    }
}
