use crate::lexer::tokenize;
use crate::token::{LexerErrorKind, TokenKind};
use pretty_assertions::assert_eq;

/// Compare the (kind, data) pairs of the non-trivia tokens of `$input`, ignoring the final
/// end-of-input token.
macro_rules! assert_tokenizes_as {
    ($input:expr, $( ($kind:ident, $data:expr) ),* $(,)?) => {{
        let actual: Vec<(TokenKind, String)> = tokenize($input)
            .into_iter()
            .filter(|t| !t.is_trivia() && !t.is_end_of_input())
            .map(|t| (t.kind, t.data))
            .collect();
        let expected: Vec<(TokenKind, String)> = vec![$( (TokenKind::$kind, String::from($data)) ),*];
        assert_eq!(actual, expected);
    }};
}

fn kinds(input: &str) -> Vec<TokenKind> {
    tokenize(input).into_iter().map(|t| t.kind).collect()
}

#[test]
fn empty_input_is_just_end_of_input() {
    assert_eq!(kinds(""), vec![TokenKind::EndOfInput]);
}

#[test]
fn assignment_operators() {
    assert_tokenizes_as!(
        "a = 1; b += 2; c: 3;",
        (Identifier, "a"),
        (Equals, "="),
        (Identifier, "1"),
        (Semicolon, ";"),
        (Identifier, "b"),
        (PlusEquals, "+="),
        (Identifier, "2"),
        (Semicolon, ";"),
        (Identifier, "c"),
        (Colon, ":"),
        (Identifier, "3"),
        (Semicolon, ";"),
    );
}

#[test]
fn whitespace_and_comments_are_tokens() {
    assert_eq!(
        kinds("a // line\n/* block\n */ b"),
        vec![
            TokenKind::Identifier,
            TokenKind::Whitespace,
            TokenKind::LineComment,
            TokenKind::Whitespace,
            TokenKind::MultilineComment,
            TokenKind::Whitespace,
            TokenKind::Identifier,
            TokenKind::EndOfInput,
        ]
    );
}

#[test]
fn raw_text_round_trips() {
    let input = "@import \"common.props\";\nfoo.bar[x86] { a += 'q\\'s'; /* c */ b = ${x}.y => <code>; }\n";
    let rebuilt: String = tokenize(input).iter().map(|t| t.raw(input)).collect();
    assert_eq!(rebuilt, input);
}

#[test]
fn directives() {
    assert_tokenizes_as!(
        "@import \"a.props\"; @alias x = a.b;",
        (Import, "@import"),
        (StringLiteral, "a.props"),
        (Semicolon, ";"),
        (Alias, "@alias"),
        (Identifier, "x"),
        (Equals, "="),
        (Identifier, "a"),
        (Dot, "."),
        (Identifier, "b"),
        (Semicolon, ";"),
    );
}

#[test]
fn unknown_directive_is_an_identifier() {
    assert_tokenizes_as!("@nope", (Identifier, "@nope"));
}

#[test]
fn selector_parameters_and_instructions() {
    assert_tokenizes_as!(
        "file[x86\\debug] <if (a) { b[0](); }>",
        (Identifier, "file"),
        (SelectorParameter, "x86\\debug"),
        (EmbeddedInstruction, "if (a) { b[0](); }"),
    );
}

#[test]
fn macros_stay_inside_identifiers() {
    assert_tokenizes_as!(
        "${SRC}\\include\\${arch.name}\\*",
        (Identifier, "${SRC}\\include\\${arch.name}\\*"),
    );
    assert_tokenizes_as!("pre${a}", (Identifier, "pre${a}"));
}

#[test]
fn lambda_and_matrix() {
    assert_tokenizes_as!(
        "(a, b) => x",
        (OpenParenthesis, "("),
        (Identifier, "a"),
        (Comma, ","),
        (Identifier, "b"),
        (CloseParenthesis, ")"),
        (Lambda, "=>"),
        (Identifier, "x"),
    );
}

#[test]
fn string_escapes() {
    assert_tokenizes_as!(r#""a\"b\\c\d""#, (StringLiteral, "a\"b\\c\\d"));
    assert_tokenizes_as!(r#"'it\'s'"#, (StringLiteral, "it's"));
}

#[test]
fn rows_and_columns() {
    let tokens = tokenize("a\n  bb = c");
    let bb = tokens.iter().find(|t| t.data == "bb").unwrap();
    assert_eq!((bb.row, bb.col), (2, 3));
    let c = tokens.iter().find(|t| t.data == "c").unwrap();
    assert_eq!((c.row, c.col), (2, 8));
}

#[test]
fn errors_are_tokens() {
    let unterminated = |input: &str| {
        tokenize(input)
            .into_iter()
            .find_map(|t| match t.kind {
                TokenKind::Error(e) => Some(e.kind),
                _ => None,
            })
            .unwrap()
    };
    assert_eq!(unterminated("\"abc"), LexerErrorKind::UnterminatedString);
    assert_eq!(unterminated("/* abc"), LexerErrorKind::UnterminatedComment);
    assert_eq!(unterminated("a[b"), LexerErrorKind::UnterminatedParameter);
    assert_eq!(unterminated("<b"), LexerErrorKind::UnterminatedInstruction);
    assert_eq!(unterminated("${b"), LexerErrorKind::UnterminatedMacro);
    assert_eq!(unterminated("\u{1}"), LexerErrorKind::UnexpectedCharacter);

    // the stream still terminates after an error
    assert_eq!(tokenize("\"abc").last().map(|t| t.kind), Some(TokenKind::EndOfInput));
}

#[test]
fn plus_without_equals_is_value_text() {
    assert_tokenizes_as!("c++ += x", (Identifier, "c++"), (PlusEquals, "+="), (Identifier, "x"));
}

#[test]
fn comparisons_are_value_text() {
    assert_tokenizes_as!(
        "cond = '$(V)' < '5';",
        (Identifier, "cond"),
        (Equals, "="),
        (StringLiteral, "$(V)"),
        (Identifier, "<"),
        (StringLiteral, "5"),
        (Semicolon, ";"),
    );
    assert_tokenizes_as!(
        "'a'<'b' x <= y",
        (StringLiteral, "a"),
        (Identifier, "<"),
        (StringLiteral, "b"),
        (Identifier, "x"),
        (Identifier, "<="),
        (Identifier, "y"),
    );
    assert_tokenizes_as!(
        "a<instr> = 1;",
        (Identifier, "a"),
        (EmbeddedInstruction, "instr"),
        (Equals, "="),
        (Identifier, "1"),
        (Semicolon, ";"),
    );
}
