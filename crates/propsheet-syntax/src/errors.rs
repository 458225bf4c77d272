use crate::node::NodeKind;
use crate::selector::Selector;
use propsheet_lexer::LexerError;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("`{selector}` is already declared as {existing}, it cannot also be used as {requested}")]
    KindMismatch {
        selector: Selector,
        existing: NodeKind,
        requested: NodeKind,
    },
}

#[derive(Error, Debug)]
pub enum ParseErrorKind {
    #[error("{0}")]
    Lexical(LexerError),

    #[error("unexpected {found} at global scope")]
    UnexpectedTokenAtGlobalScope { found: String },

    #[error("unexpected {found} in object body")]
    UnexpectedTokenInObject { found: String },

    #[error("unexpected {found} in selector")]
    UnexpectedTokenInSelector { found: String },

    #[error("unexpected {found} in value")]
    UnexpectedTokenInValue { found: String },

    #[error("unexpected {found} in metadata declaration")]
    UnexpectedTokenInMetadata { found: String },

    #[error("unexpected {found} in alias declaration")]
    UnexpectedTokenInAlias { found: String },

    #[error("unexpected {found} in import declaration")]
    UnexpectedTokenInImport { found: String },

    #[error("unexpected end of input")]
    UnexpectedEndOfInput,

    #[error("import path `{path}` contains invalid characters")]
    InvalidImportPath { path: String },

    #[error("unable to import `{}`", path.display())]
    ImportFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error("expected '::'")]
    DoubleColonRequired,
}

impl ParseErrorKind {
    /// Stable numeric code for each kind of error.
    pub fn code(&self) -> u16 {
        match self {
            ParseErrorKind::Lexical(_) => 100,
            ParseErrorKind::UnexpectedTokenAtGlobalScope { .. } => 101,
            ParseErrorKind::UnexpectedTokenInObject { .. } => 102,
            ParseErrorKind::UnexpectedTokenInSelector { .. } => 103,
            ParseErrorKind::UnexpectedTokenInValue { .. } => 104,
            ParseErrorKind::UnexpectedTokenInMetadata { .. } => 105,
            ParseErrorKind::UnexpectedTokenInAlias { .. } => 106,
            ParseErrorKind::UnexpectedTokenInImport { .. } => 107,
            ParseErrorKind::UnexpectedEndOfInput => 108,
            ParseErrorKind::InvalidImportPath { .. } => 109,
            ParseErrorKind::ImportFailed { .. } => 110,
            ParseErrorKind::Node(_) => 111,
            ParseErrorKind::DoubleColonRequired => 112,
        }
    }
}

/// A fatal parse error located at the offending token.
#[derive(Error, Debug)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub file: Option<PathBuf>,
    pub row: usize,
    pub col: usize,
}

impl ParseError {
    pub fn code(&self) -> u16 {
        self.kind.code()
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let file = self
            .file
            .as_ref()
            .map(|f| f.display().to_string())
            .unwrap_or_else(|| "<input>".to_string());
        write!(
            f,
            "{file}:{}:{}: error PS{:03}: {}",
            self.row,
            self.col,
            self.code(),
            self.kind
        )
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
