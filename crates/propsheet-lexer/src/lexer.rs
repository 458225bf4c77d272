use muncher::Muncher;
use phf::{self, phf_map};

use crate::token::{LexerError, LexerErrorKind, Token, TokenKind};

static DIRECTIVE_KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "@alias" => TokenKind::Alias,
    "@import" => TokenKind::Import,
};

/// Characters that always end an identifier run. `]` and `>` are deliberately absent: on
/// their own they are ordinary value text.
fn is_punctuation(c: char) -> bool {
    matches!(
        c,
        '{' | '}' | '(' | ')' | '[' | '<' | ',' | ';' | '#' | '.' | ':' | '=' | '"' | '\''
    )
}

fn is_identifier_char(c: char) -> bool {
    !(c.is_whitespace() || c.is_control() || is_punctuation(c))
}

fn lexer_error(kind: LexerErrorKind) -> TokenKind {
    TokenKind::Error(LexerError { kind })
}

/// Turns property sheet source into tokens. Whitespace and comments are produced as tokens
/// like everything else; the stream always ends with a single `EndOfInput` token.
pub struct PropertySheetLexer<'input> {
    input: &'input str,
    muncher: Muncher<'input>,
    offset: usize,
    row: usize,
    col: usize,
    finished: bool,
    /// Kind of the last token that was not whitespace or a comment.
    last_significant: Option<TokenKind>,
}

impl<'input> PropertySheetLexer<'input> {
    pub fn new(input: &'input str) -> PropertySheetLexer<'input> {
        PropertySheetLexer {
            input,
            muncher: Muncher::new(input),
            offset: 0,
            row: 1,
            col: 1,
            finished: false,
            last_significant: None,
        }
    }

    /// Current (row, column), 1-based.
    pub fn pos(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.muncher.reset_peek();
        let c = self.muncher.peek().copied();
        self.muncher.reset_peek();
        c
    }

    fn peek_second(&mut self) -> Option<char> {
        self.muncher.reset_peek();
        self.muncher.peek();
        let c = self.muncher.peek().copied();
        self.muncher.reset_peek();
        c
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.muncher.eat()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.row += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn eat_while(&mut self, f: impl Fn(char) -> bool) {
        while let Some(c) = self.peek_char() {
            if !f(c) {
                break;
            }
            self.bump();
        }
    }

    fn raw_since(&self, start: usize) -> String {
        self.input[start..self.offset].to_string()
    }

    fn scan_block_comment(&mut self) -> TokenKind {
        // the opening '/*' has been eaten
        loop {
            match self.bump() {
                None => return lexer_error(LexerErrorKind::UnterminatedComment),
                Some('*') if self.peek_char() == Some('/') => {
                    self.bump();
                    return TokenKind::MultilineComment;
                }
                Some(_) => {}
            }
        }
    }

    fn scan_string(&mut self, quote: char) -> (TokenKind, String) {
        let mut data = String::new();
        loop {
            match self.bump() {
                None => return (lexer_error(LexerErrorKind::UnterminatedString), data),
                Some('\\') => match self.peek_char() {
                    Some(c) if c == quote || c == '\\' => {
                        self.bump();
                        data.push(c);
                    }
                    Some('n') => {
                        self.bump();
                        data.push('\n');
                    }
                    Some('t') => {
                        self.bump();
                        data.push('\t');
                    }
                    // Other backslashes are literal, which keeps Windows paths readable
                    _ => data.push('\\'),
                },
                Some(c) if c == quote => return (TokenKind::StringLiteral, data),
                Some(c) => data.push(c),
            }
        }
    }

    /// Scan up to the `close` that balances an already-eaten `open`; returns the text between.
    fn scan_delimited(
        &mut self,
        open: char,
        close: char,
        kind: TokenKind,
        error: LexerErrorKind,
    ) -> (TokenKind, String) {
        let mut depth = 1;
        let mut data = String::new();
        loop {
            match self.bump() {
                None => return (lexer_error(error), data),
                Some(c) if c == open => {
                    depth += 1;
                    data.push(c);
                }
                Some(c) if c == close => {
                    depth -= 1;
                    if depth == 0 {
                        return (kind, data.trim().to_string());
                    }
                    data.push(c);
                }
                Some(c) => data.push(c),
            }
        }
    }

    /// Whether a `<` just eaten opens an embedded instruction. It is comparison text instead
    /// when followed by whitespace, `=` or the end of input, or when it comes right after a
    /// string literal, as in `'$(V)' < '5'`.
    fn opens_instruction(&mut self) -> bool {
        let after_literal = self.last_significant == Some(TokenKind::StringLiteral);
        let spaced = match self.peek_char() {
            None => true,
            Some(c) => c.is_whitespace() || c == '=',
        };
        !(after_literal || spaced)
    }

    /// Consume the rest of a `${...}` reference after its `${`.
    fn scan_macro_tail(&mut self) -> bool {
        let mut depth = 1;
        while let Some(c) = self.bump() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }

    fn scan_identifier(&mut self, start: usize, first_char: char) -> TokenKind {
        if first_char == '$' && self.peek_char() == Some('{') {
            self.bump();
            if !self.scan_macro_tail() {
                return lexer_error(LexerErrorKind::UnterminatedMacro);
            }
        }

        while let Some(c) = self.peek_char() {
            match c {
                '$' if self.peek_second() == Some('{') => {
                    self.bump();
                    self.bump();
                    if !self.scan_macro_tail() {
                        return lexer_error(LexerErrorKind::UnterminatedMacro);
                    }
                }
                '+' if self.peek_second() == Some('=') => break,
                '/' if matches!(self.peek_second(), Some('/' | '*')) => break,
                c if is_identifier_char(c) => {
                    self.bump();
                }
                _ => break,
            }
        }

        DIRECTIVE_KEYWORDS
            .get(&self.input[start..self.offset])
            .copied()
            .unwrap_or(TokenKind::Identifier)
    }

    fn next_token(&mut self) -> Token {
        let (start, row, col) = (self.offset, self.row, self.col);

        let Some(c) = self.bump() else {
            return Token {
                kind: TokenKind::EndOfInput,
                data: String::new(),
                offset: start,
                len: 0,
                row,
                col,
            };
        };

        let mut data = None;
        let kind = match c {
            c if c.is_whitespace() => {
                self.eat_while(char::is_whitespace);
                TokenKind::Whitespace
            }
            '/' if self.peek_char() == Some('/') => {
                self.eat_while(|c| c != '\n');
                TokenKind::LineComment
            }
            '/' if self.peek_char() == Some('*') => {
                self.bump();
                self.scan_block_comment()
            }
            '{' => TokenKind::OpenBrace,
            '}' => TokenKind::CloseBrace,
            '(' => TokenKind::OpenParenthesis,
            ')' => TokenKind::CloseParenthesis,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '#' => TokenKind::Pound,
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            '=' => {
                if self.peek_char() == Some('>') {
                    self.bump();
                    TokenKind::Lambda
                } else {
                    TokenKind::Equals
                }
            }
            '+' if self.peek_char() == Some('=') => {
                self.bump();
                TokenKind::PlusEquals
            }
            '"' | '\'' => {
                let (kind, text) = self.scan_string(c);
                data = Some(text);
                kind
            }
            '[' => {
                let (kind, text) = self.scan_delimited(
                    '[',
                    ']',
                    TokenKind::SelectorParameter,
                    LexerErrorKind::UnterminatedParameter,
                );
                data = Some(text);
                kind
            }
            '<' if self.opens_instruction() => {
                let (kind, text) = self.scan_delimited(
                    '<',
                    '>',
                    TokenKind::EmbeddedInstruction,
                    LexerErrorKind::UnterminatedInstruction,
                );
                data = Some(text);
                kind
            }
            '<' if self.peek_char() == Some('=') => {
                self.bump();
                self.scan_identifier(start, c)
            }
            c if c.is_control() => lexer_error(LexerErrorKind::UnexpectedCharacter),
            _ => self.scan_identifier(start, c),
        };

        Token {
            kind,
            data: data.unwrap_or_else(|| self.raw_since(start)),
            offset: start,
            len: self.offset - start,
            row,
            col,
        }
    }
}

impl Iterator for PropertySheetLexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }

        let token = self.next_token();
        if token.is_end_of_input() {
            self.finished = true;
        }
        if !token.is_trivia() {
            self.last_significant = Some(token.kind);
        }
        Some(token)
    }
}

/// Tokenize all of `data`. The last token is always `EndOfInput`.
pub fn tokenize(data: &str) -> Vec<Token> {
    PropertySheetLexer::new(data).collect()
}
