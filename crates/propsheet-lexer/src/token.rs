use thiserror::Error;

/// One lexical token. `data` holds the cooked text (string literals unescaped, the inside of
/// `[...]` and `<...>` without their delimiters); `offset`/`len` locate the raw text in the
/// source so the input can be reproduced exactly. `row` and `col` are 1-based.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub data: String,
    /// Byte offset of the raw token text
    pub offset: usize,
    /// Byte length of the raw token text
    pub len: usize,
    pub row: usize,
    pub col: usize,
}

impl Token {
    pub fn is_whitespace(&self) -> bool {
        self.kind.is_whitespace()
    }

    pub fn is_trivia(&self) -> bool {
        self.kind.is_trivia()
    }

    pub fn is_end_of_input(&self) -> bool {
        self.kind.is_end_of_input()
    }

    pub fn get_fixed_str(&self) -> Option<&'static str> {
        self.kind.get_fixed_str()
    }

    /// The raw source text of this token.
    pub fn raw<'a>(&self, input: &'a str) -> &'a str {
        &input[self.offset..self.offset + self.len]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Error(LexerError),

    Alias,
    CloseBrace,
    CloseParenthesis,
    Colon,
    Comma,
    Dot,
    EmbeddedInstruction,
    EndOfInput,
    Equals,
    Identifier,
    Import,
    Lambda,
    LineComment,
    MultilineComment,
    OpenBrace,
    OpenParenthesis,
    PlusEquals,
    Pound,
    SelectorParameter,
    Semicolon,
    StringLiteral,
    Whitespace,
}

#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[error("{kind}")]
pub struct LexerError {
    pub kind: LexerErrorKind,
}

#[derive(Error, Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub enum LexerErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("unterminated selector parameter")]
    UnterminatedParameter,
    #[error("unterminated embedded instruction")]
    UnterminatedInstruction,
    #[error("unterminated macro reference")]
    UnterminatedMacro,
    #[error("unexpected character")]
    UnexpectedCharacter,
}

impl TokenKind {
    pub fn is_whitespace(&self) -> bool {
        matches!(self, TokenKind::Whitespace)
    }

    /// Whitespace and comments: tokens the parser skips wherever they are allowed.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::MultilineComment
        )
    }

    pub fn is_end_of_input(&self) -> bool {
        matches!(self, TokenKind::EndOfInput)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TokenKind::Error(_))
    }

    pub fn get_fixed_str(&self) -> Option<&'static str> {
        let ret = match self {
            TokenKind::Alias => "@alias",
            TokenKind::CloseBrace => "}",
            TokenKind::CloseParenthesis => ")",
            TokenKind::Colon => ":",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Equals => "=",
            TokenKind::Import => "@import",
            TokenKind::Lambda => "=>",
            TokenKind::OpenBrace => "{",
            TokenKind::OpenParenthesis => "(",
            TokenKind::PlusEquals => "+=",
            TokenKind::Pound => "#",
            TokenKind::Semicolon => ";",
            _ => return None,
        };

        Some(ret)
    }

    /// Human readable name used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Error(e) => format!("invalid input ({e})"),
            TokenKind::EmbeddedInstruction => "embedded instruction".into(),
            TokenKind::EndOfInput => "end of input".into(),
            TokenKind::Identifier => "identifier".into(),
            TokenKind::LineComment | TokenKind::MultilineComment => "comment".into(),
            TokenKind::SelectorParameter => "selector parameter".into(),
            TokenKind::StringLiteral => "string literal".into(),
            TokenKind::Whitespace => "whitespace".into(),
            other => format!("'{}'", other.get_fixed_str().unwrap_or("?")),
        }
    }
}
