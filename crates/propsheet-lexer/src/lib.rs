pub mod lexer;
pub mod token;

#[cfg(test)]
mod tests;

pub use lexer::{tokenize, PropertySheetLexer};
pub use token::{LexerError, LexerErrorKind, Token, TokenKind};
