use crate::errors::{ParseError, ParseErrorKind, ParseResult};
use crate::loader::{FileSystemLoader, SourceLoader};
use crate::node::{ObjectNode, Operation, PropertyNode};
use crate::selector::Selector;
use crate::value::{IteratorValue, Value};
use derive_builder::Builder;
use propsheet_lexer::{tokenize, Token, TokenKind};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, trace};

#[derive(Builder, Clone)]
#[builder(pattern = "owned")]
pub struct ParseOptions {
    /// Source of imported documents.
    #[builder(default = "Rc::new(FileSystemLoader)")]
    pub loader: Rc<dyn SourceLoader>,
    /// Resolve `@import` directives. When false they are checked and then ignored.
    #[builder(default = "true")]
    pub follow_imports: bool,
    /// Directory relative imports are resolved against when the document has no file name.
    #[builder(default, setter(into, strip_option))]
    pub base_dir: Option<PathBuf>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            loader: Rc::new(FileSystemLoader),
            follow_imports: true,
            base_dir: None,
        }
    }
}

/// A parsed property sheet. Imported documents are merged into `root`.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub root: ObjectNode,
    pub file: Option<PathBuf>,
    /// Canonical paths of every imported document, in import order.
    pub imports: Vec<PathBuf>,
}

/// Parse `text` with default options.
pub fn parse_str(text: &str) -> ParseResult<Document> {
    parse_with(text, None, &ParseOptions::default())
}

/// Read and parse the document at `path`.
pub fn parse_file<P: AsRef<Path>>(path: P, options: &ParseOptions) -> ParseResult<Document> {
    let path = path.as_ref();
    let text = options.loader.load(path).map_err(|source| ParseError {
        kind: ParseErrorKind::ImportFailed {
            path: path.to_path_buf(),
            source,
        },
        file: Some(path.to_path_buf()),
        row: 0,
        col: 0,
    })?;
    parse_with(&text, Some(path), options)
}

/// Parse `text`; `file` names the document in errors and anchors relative imports.
pub fn parse_with(
    text: &str,
    file: Option<&Path>,
    options: &ParseOptions,
) -> ParseResult<Document> {
    let mut document = Document {
        file: file.map(Path::to_path_buf),
        ..Default::default()
    };

    let mut imports = ImportSet::default();
    if let Some(canonical) = file.and_then(|f| options.loader.canonicalize(f).ok()) {
        imports.seen.insert(canonical);
    }

    Parser::new(
        text,
        file.map(Path::to_path_buf),
        options,
        &mut document.root,
        &mut imports,
    )
    .parse()?;

    document.imports = imports.order;
    Ok(document)
}

#[derive(Default)]
struct ImportSet {
    seen: HashSet<PathBuf>,
    order: Vec<PathBuf>,
}

fn located(file: &Option<PathBuf>, token: &Token, kind: ParseErrorKind) -> ParseError {
    ParseError {
        kind,
        file: file.clone(),
        row: token.row,
        col: token.col,
    }
}

/// Tokens of one document with single-step rewind.
struct TokenStream {
    input: String,
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    fn new(input: &str) -> Self {
        TokenStream {
            input: input.to_string(),
            tokens: tokenize(input),
            pos: 0,
        }
    }

    /// The next token, whatever it is. Error tokens are still delivered; the caller decides
    /// whether they are fatal. Past the end, the final `EndOfInput` repeats.
    fn next_raw(&mut self) -> Token {
        let index = self.pos.min(self.tokens.len().saturating_sub(1));
        self.pos = index + 1;
        self.tokens.get(index).cloned().unwrap_or_else(|| Token {
            kind: TokenKind::EndOfInput,
            data: String::new(),
            offset: self.input.len(),
            len: 0,
            row: 1,
            col: 1,
        })
    }

    /// Re-deliver the token returned by the last fetch.
    fn rewind(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    fn mark(&self) -> usize {
        self.pos
    }

    fn reset(&mut self, mark: usize) {
        self.pos = mark;
    }

    fn raw(&self, token: &Token) -> &str {
        token.raw(&self.input)
    }
}

enum MetadataTarget {
    Object(Vec<Selector>),
    Property(Vec<Selector>),
}

const PROPERTY_TERMINATORS: &[TokenKind] = &[TokenKind::Semicolon, TokenKind::CloseBrace];
const ELEMENT_TERMINATORS: &[TokenKind] = &[
    TokenKind::Comma,
    TokenKind::Semicolon,
    TokenKind::CloseBrace,
];
const MATRIX_TERMINATORS: &[TokenKind] = &[TokenKind::Comma, TokenKind::CloseParenthesis];

struct Parser<'a> {
    stream: TokenStream,
    file: Option<PathBuf>,
    options: &'a ParseOptions,
    root: &'a mut ObjectNode,
    imports: &'a mut ImportSet,
    /// Path of the innermost open object.
    scope: Vec<Selector>,
}

impl<'a> Parser<'a> {
    fn new(
        text: &str,
        file: Option<PathBuf>,
        options: &'a ParseOptions,
        root: &'a mut ObjectNode,
        imports: &'a mut ImportSet,
    ) -> Self {
        Parser {
            stream: TokenStream::new(text),
            file,
            options,
            root,
            imports,
            scope: vec![],
        }
    }

    fn error(&self, token: &Token, kind: ParseErrorKind) -> ParseError {
        located(&self.file, token, kind)
    }

    fn unexpected(&self, token: &Token, kind: fn(String) -> ParseErrorKind) -> ParseError {
        let kind = match token.kind {
            TokenKind::EndOfInput => ParseErrorKind::UnexpectedEndOfInput,
            TokenKind::Error(e) => ParseErrorKind::Lexical(e),
            _ => kind(token.kind.describe()),
        };
        self.error(token, kind)
    }

    fn next(&mut self) -> ParseResult<Token> {
        let token = self.stream.next_raw();
        match token.kind {
            TokenKind::Error(e) => Err(self.error(&token, ParseErrorKind::Lexical(e))),
            _ => Ok(token),
        }
    }

    /// The next token that is not whitespace or a comment.
    fn next_significant(&mut self) -> ParseResult<Token> {
        loop {
            let token = self.next()?;
            if !token.is_trivia() {
                return Ok(token);
            }
        }
    }

    fn peek_significant(&mut self) -> ParseResult<Token> {
        let mark = self.stream.mark();
        let token = self.next_significant();
        self.stream.reset(mark);
        token
    }

    fn parse(mut self) -> ParseResult<()> {
        debug!(file = ?self.file, "parsing property sheet");
        self.parse_object_body(true)?;
        debug!(file = ?self.file, "finished parsing");
        Ok(())
    }

    /// Statements up to the closing `}` (or end of input for the global scope).
    fn parse_object_body(&mut self, global: bool) -> ParseResult<()> {
        let unexpected: fn(String) -> ParseErrorKind = if global {
            |found| ParseErrorKind::UnexpectedTokenAtGlobalScope { found }
        } else {
            |found| ParseErrorKind::UnexpectedTokenInObject { found }
        };

        loop {
            let token = self.next_significant()?;
            match token.kind {
                TokenKind::EndOfInput if global => return Ok(()),
                TokenKind::CloseBrace if !global => return Ok(()),
                TokenKind::Semicolon => {}
                TokenKind::Import if global => self.parse_import(&token)?,
                TokenKind::Alias => self.parse_alias()?,
                TokenKind::Pound => {
                    let target = MetadataTarget::Object(self.scope.clone());
                    self.parse_metadata(&target)?;
                }
                TokenKind::Identifier | TokenKind::Colon => {
                    self.stream.rewind();
                    self.parse_statement()?;
                }
                _ => return Err(self.unexpected(&token, unexpected)),
            }
        }
    }

    /// `ident[param]<instr>(.ident[param]<instr>)*` up to one of `terminators`, which is
    /// returned alongside the segments.
    fn parse_segments(
        &mut self,
        terminators: &[TokenKind],
        unexpected: fn(String) -> ParseErrorKind,
    ) -> ParseResult<(Vec<Selector>, Token)> {
        let mut segments = vec![];
        loop {
            let token = self.next_significant()?;
            if token.kind != TokenKind::Identifier {
                return Err(self.unexpected(&token, unexpected));
            }
            let mut segment = Selector::new(token.data.trim());

            let mut next = self.next_significant()?;
            if next.kind == TokenKind::SelectorParameter {
                segment.parameter = Some(next.data.clone());
                next = self.next_significant()?;
            }
            if next.kind == TokenKind::EmbeddedInstruction {
                segment.instruction = Some(next.data.clone());
                next = self.next_significant()?;
                // an instruction only belongs on the last segment
                if next.kind == TokenKind::Dot {
                    return Err(self.unexpected(&next, unexpected));
                }
            }
            segments.push(segment);

            match next.kind {
                TokenKind::Dot => {}
                k if terminators.contains(&k) => return Ok((segments, next)),
                _ => return Err(self.unexpected(&next, unexpected)),
            }
        }
    }

    /// Expect the second colon of a `::` whose first colon was just read.
    fn expect_double_colon(&mut self) -> ParseResult<()> {
        let second = self.next()?;
        if second.kind != TokenKind::Colon {
            return Err(self.error(&second, ParseErrorKind::DoubleColonRequired));
        }
        Ok(())
    }

    /// Turn declared selector segments into a path from the root, applying `@alias`
    /// declarations of the open objects (innermost first) to the first segment.
    fn resolve_path(&self, root_scoped: bool, segments: Vec<Selector>) -> Vec<Selector> {
        let base: &[Selector] = if root_scoped { &[] } else { &self.scope };

        let Some(first) = segments.first() else {
            return base.to_vec();
        };

        for depth in (0..=base.len()).rev() {
            let Some(target) = self
                .root
                .object_at(&base[..depth])
                .and_then(|o| o.alias(&first.name))
            else {
                continue;
            };

            let mut target = target.segments();
            if let Some(last) = target.last_mut() {
                if last.parameter.is_none() {
                    last.parameter = first.parameter.clone();
                }
                if last.instruction.is_none() {
                    last.instruction = first.instruction.clone();
                }
            }
            trace!(alias = %first.name, depth, "declaration redirected through alias");

            let mut path = base[..depth].to_vec();
            path.extend(target);
            path.extend(segments.into_iter().skip(1));
            return path;
        }

        let mut path = base.to_vec();
        path.extend(segments);
        path
    }

    fn parse_statement(&mut self) -> ParseResult<()> {
        let mut root_scoped = false;
        if self.peek_significant()?.kind == TokenKind::Colon {
            self.next_significant()?;
            self.expect_double_colon()?;
            root_scoped = true;
        }

        let (segments, terminator) = self.parse_segments(
            &[
                TokenKind::OpenBrace,
                TokenKind::Colon,
                TokenKind::Equals,
                TokenKind::PlusEquals,
            ],
            |found| ParseErrorKind::UnexpectedTokenInSelector { found },
        )?;
        let path = self.resolve_path(root_scoped, segments);

        let operation = match terminator.kind {
            TokenKind::OpenBrace => {
                let file = &self.file;
                self.root
                    .object_at_mut(&path)
                    .map_err(|e| located(file, &terminator, e.into()))?;
                trace!(path = ?path, "open object");

                let outer = std::mem::replace(&mut self.scope, path);
                self.parse_object_body(false)?;
                self.scope = outer;
                return Ok(());
            }
            TokenKind::Colon => Operation::CollectionAssignment,
            TokenKind::Equals => Operation::Assignment,
            _ => Operation::AddToCollection,
        };

        // create it up front so kind conflicts are reported at the declaration
        self.property_at(&path, &terminator)?;

        let target = MetadataTarget::Property(path.clone());
        let value = self.parse_rvalue(PROPERTY_TERMINATORS, &target)?;
        trace!(path = ?path, ?operation, %value, "property");
        self.property_at(&path, &terminator)?.push(value, operation);

        loop {
            let token = self.next_significant()?;
            match token.kind {
                TokenKind::Pound => self.parse_metadata(&target)?,
                TokenKind::Semicolon => return Ok(()),
                TokenKind::CloseBrace | TokenKind::EndOfInput => {
                    self.stream.rewind();
                    return Ok(());
                }
                _ => {
                    return Err(self.unexpected(&token, |found| {
                        ParseErrorKind::UnexpectedTokenInValue { found }
                    }))
                }
            }
        }
    }

    fn property_at(&mut self, path: &[Selector], at: &Token) -> ParseResult<&mut PropertyNode> {
        let Some((last, parent)) = path.split_last() else {
            return Err(self.unexpected(at, |found| {
                ParseErrorKind::UnexpectedTokenInSelector { found }
            }));
        };
        let file = &self.file;
        self.root
            .object_at_mut(parent)
            .and_then(|o| o.property_mut(last))
            .map_err(|e| located(file, at, e.into()))
    }

    /// A value, ending before (never consuming) any of `terminators`.
    fn parse_rvalue(
        &mut self,
        terminators: &[TokenKind],
        metadata: &MetadataTarget,
    ) -> ParseResult<Value> {
        let unexpected = |found| ParseErrorKind::UnexpectedTokenInValue { found };

        let first = self.next_significant()?;
        let value = match first.kind {
            TokenKind::Colon => {
                self.expect_double_colon()?;
                let token = self.next_significant()?;
                match token.kind {
                    TokenKind::Identifier | TokenKind::StringLiteral => {
                        Value::Scalar(token.data.trim().to_string())
                    }
                    _ => return Err(self.unexpected(&token, unexpected)),
                }
            }
            TokenKind::OpenParenthesis => {
                let mut sources = vec![];
                loop {
                    sources.push(self.parse_rvalue(MATRIX_TERMINATORS, metadata)?);
                    let token = self.next_significant()?;
                    match token.kind {
                        TokenKind::Comma => {}
                        TokenKind::CloseParenthesis => break,
                        _ => return Err(self.unexpected(&token, unexpected)),
                    }
                }

                let lambda = self.next_significant()?;
                if lambda.kind != TokenKind::Lambda {
                    return Err(self.unexpected(&lambda, unexpected));
                }
                let template = self.parse_rvalue(terminators, metadata)?;
                return Ok(Value::Iterator(IteratorValue::new(sources, template)));
            }
            TokenKind::OpenBrace => self.parse_collection(metadata)?,
            TokenKind::EmbeddedInstruction => Value::Instruction(first.data.clone()),
            k if terminators.contains(&k) => {
                self.stream.rewind();
                Value::empty()
            }
            TokenKind::EndOfInput => return Err(self.unexpected(&first, unexpected)),
            _ => {
                self.stream.rewind();
                self.parse_scalar(terminators)?
            }
        };

        let next = self.next_significant()?;
        if next.kind == TokenKind::Lambda {
            let template = self.parse_rvalue(terminators, metadata)?;
            return Ok(Value::Iterator(IteratorValue::new(vec![value], template)));
        }
        self.stream.rewind();
        Ok(value)
    }

    /// A bare run of tokens. Whitespace inside the run is kept, string literals contribute
    /// their unescaped text and comments are dropped.
    fn parse_scalar(&mut self, terminators: &[TokenKind]) -> ParseResult<Value> {
        let mut text = String::new();
        loop {
            let token = self.next()?;
            match token.kind {
                k if terminators.contains(&k) => break,
                TokenKind::Lambda | TokenKind::EndOfInput | TokenKind::Pound => break,
                TokenKind::OpenBrace => {
                    return Err(self.unexpected(&token, |found| {
                        ParseErrorKind::UnexpectedTokenInValue { found }
                    }))
                }
                TokenKind::StringLiteral => text.push_str(&token.data),
                TokenKind::LineComment | TokenKind::MultilineComment => {}
                _ => text.push_str(self.stream.raw(&token)),
            }
        }
        self.stream.rewind();
        Ok(Value::Scalar(text.trim().to_string()))
    }

    /// `{ v, v; #meta = x }` after its `{`.
    fn parse_collection(&mut self, metadata: &MetadataTarget) -> ParseResult<Value> {
        let mut items = vec![];
        loop {
            let token = self.next_significant()?;
            match token.kind {
                TokenKind::CloseBrace => return Ok(Value::Collection(items)),
                TokenKind::Comma | TokenKind::Semicolon => {}
                TokenKind::Pound => self.parse_metadata(metadata)?,
                TokenKind::EndOfInput => {
                    return Err(self.error(&token, ParseErrorKind::UnexpectedEndOfInput))
                }
                _ => {
                    self.stream.rewind();
                    let item = self.parse_rvalue(ELEMENT_TERMINATORS, metadata)?;
                    if !matches!(&item, Value::Scalar(s) if s.is_empty()) {
                        items.push(item);
                    }
                }
            }
        }
    }

    /// Whether the tokens after an already-read `{` look like `name = ...` / `name: ...`.
    fn looks_like_metadata_object(&mut self) -> ParseResult<bool> {
        let mark = self.stream.mark();
        let first = self.next_significant();
        let second = self.next_significant();
        self.stream.reset(mark);
        Ok(first?.kind == TokenKind::Identifier
            && matches!(second?.kind, TokenKind::Equals | TokenKind::Colon))
    }

    /// Everything after a `#`.
    fn parse_metadata(&mut self, target: &MetadataTarget) -> ParseResult<()> {
        let unexpected = |found| ParseErrorKind::UnexpectedTokenInMetadata { found };

        let token = self.next_significant()?;
        match token.kind {
            TokenKind::OpenBrace => self.parse_metadata_object(target, None),
            TokenKind::Identifier => {
                let name = token.data.trim().to_string();
                let op = self.next_significant()?;
                match op.kind {
                    TokenKind::OpenBrace => self.parse_metadata_object(target, Some(&name)),
                    TokenKind::Equals | TokenKind::Colon => {
                        if self.peek_significant()?.kind == TokenKind::OpenBrace {
                            self.next_significant()?;
                            if self.looks_like_metadata_object()? {
                                return self.parse_metadata_object(target, Some(&name));
                            }
                            self.stream.rewind();
                        }
                        let value = self.parse_rvalue(ELEMENT_TERMINATORS, target)?;
                        self.set_metadata(target, name, value, &token)
                    }
                    _ => Err(self.unexpected(&op, unexpected)),
                }
            }
            _ => Err(self.unexpected(&token, unexpected)),
        }
    }

    /// `{ a = 1; b: 2 }` after its `{`. Keys are stored as `prefix.key` when nested under a
    /// named entry.
    fn parse_metadata_object(
        &mut self,
        target: &MetadataTarget,
        prefix: Option<&str>,
    ) -> ParseResult<()> {
        let unexpected = |found| ParseErrorKind::UnexpectedTokenInMetadata { found };

        loop {
            let token = self.next_significant()?;
            match token.kind {
                TokenKind::CloseBrace => return Ok(()),
                TokenKind::Comma | TokenKind::Semicolon => {}
                TokenKind::Identifier => {
                    let op = self.next_significant()?;
                    if !matches!(op.kind, TokenKind::Equals | TokenKind::Colon) {
                        return Err(self.unexpected(&op, unexpected));
                    }
                    let value = self.parse_rvalue(ELEMENT_TERMINATORS, target)?;
                    let key = match prefix {
                        Some(prefix) => format!("{prefix}.{}", token.data.trim()),
                        None => token.data.trim().to_string(),
                    };
                    self.set_metadata(target, key, value, &token)?;
                }
                _ => return Err(self.unexpected(&token, unexpected)),
            }
        }
    }

    fn set_metadata(
        &mut self,
        target: &MetadataTarget,
        key: String,
        value: Value,
        at: &Token,
    ) -> ParseResult<()> {
        trace!(%key, %value, "metadata");
        match target {
            MetadataTarget::Object(path) => {
                let file = &self.file;
                self.root
                    .object_at_mut(path)
                    .map_err(|e| located(file, at, e.into()))?
                    .set_metadata(key, value);
            }
            MetadataTarget::Property(path) => {
                self.property_at(path, at)?.set_metadata(key, value);
            }
        }
        Ok(())
    }

    /// `@alias name = a.b.c;` after `@alias`. Targets are relative to the declaring object.
    fn parse_alias(&mut self) -> ParseResult<()> {
        let unexpected = |found| ParseErrorKind::UnexpectedTokenInAlias { found };

        let name = self.next_significant()?;
        if name.kind != TokenKind::Identifier {
            return Err(self.unexpected(&name, unexpected));
        }
        let op = self.next_significant()?;
        if op.kind != TokenKind::Equals {
            return Err(self.unexpected(&op, unexpected));
        }

        let (segments, _) = self.parse_segments(
            &[TokenKind::Semicolon, TokenKind::EndOfInput],
            unexpected,
        )?;
        let Some(target) = Selector::from_segments(&segments) else {
            return Err(self.unexpected(&op, unexpected));
        };

        let alias = name.data.trim().to_string();
        debug!(%alias, %target, scope = ?self.scope, "alias");
        let file = &self.file;
        self.root
            .object_at_mut(&self.scope)
            .map_err(|e| located(file, &name, e.into()))?
            .add_alias(alias, target);
        Ok(())
    }

    /// `@import "path";` or `@import path;` after `@import`.
    fn parse_import(&mut self, directive: &Token) -> ParseResult<()> {
        let unexpected = |found| ParseErrorKind::UnexpectedTokenInImport { found };

        let first = self.next_significant()?;
        let path = match first.kind {
            TokenKind::StringLiteral => {
                let end = self.next_significant()?;
                if !matches!(end.kind, TokenKind::Semicolon | TokenKind::EndOfInput) {
                    return Err(self.unexpected(&end, unexpected));
                }
                first.data.clone()
            }
            TokenKind::Identifier | TokenKind::Dot | TokenKind::Colon => {
                let mut path = self.stream.raw(&first).to_string();
                loop {
                    let token = self.next()?;
                    match token.kind {
                        TokenKind::Identifier | TokenKind::Dot | TokenKind::Colon => {
                            path.push_str(self.stream.raw(&token))
                        }
                        TokenKind::Semicolon | TokenKind::EndOfInput => break,
                        TokenKind::Whitespace
                        | TokenKind::LineComment
                        | TokenKind::MultilineComment => {
                            let end = self.next_significant()?;
                            if !matches!(end.kind, TokenKind::Semicolon | TokenKind::EndOfInput) {
                                return Err(self.unexpected(&end, unexpected));
                            }
                            break;
                        }
                        _ => return Err(self.unexpected(&token, unexpected)),
                    }
                }
                path
            }
            _ => return Err(self.unexpected(&first, unexpected)),
        };

        if path.is_empty()
            || path
                .chars()
                .any(|c| matches!(c, '<' | '>' | '|' | '"' | '?' | '*') || c.is_control())
        {
            return Err(self.error(&first, ParseErrorKind::InvalidImportPath { path }));
        }

        if !self.options.follow_imports {
            debug!(%path, "imports disabled, skipping");
            return Ok(());
        }

        let base = match (&self.file, &self.options.base_dir) {
            (Some(file), _) => file.parent().map(Path::to_path_buf).unwrap_or_default(),
            (None, Some(dir)) => dir.clone(),
            (None, None) => PathBuf::new(),
        };
        let full = base.join(&path);

        let loader = self.options.loader.clone();
        let import_failed = |source| ParseErrorKind::ImportFailed {
            path: full.clone(),
            source,
        };
        let canonical = loader
            .canonicalize(&full)
            .map_err(|e| self.error(directive, import_failed(e)))?;

        if !self.imports.seen.insert(canonical.clone()) {
            debug!(path = %canonical.display(), "already imported, skipping");
            return Ok(());
        }

        let text = loader
            .load(&canonical)
            .map_err(|e| self.error(directive, import_failed(e)))?;
        self.imports.order.push(canonical.clone());
        debug!(path = %canonical.display(), "importing");

        Parser::new(
            &text,
            Some(canonical),
            self.options,
            &mut *self.root,
            &mut *self.imports,
        )
        .parse()
    }
}
