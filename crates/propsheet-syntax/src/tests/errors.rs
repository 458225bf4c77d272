use crate::{
    parse_str, parse_with, NodeError, NodeKind, ParseError, ParseErrorKind, ParseOptionsBuilder,
    Selector,
};
use pretty_assertions::assert_eq;

fn error(text: &str) -> ParseError {
    parse_str(text).unwrap_err()
}

#[test]
fn unexpected_at_global_scope() {
    let err = error("a = 1;\n  }");
    assert!(matches!(
        err.kind,
        ParseErrorKind::UnexpectedTokenAtGlobalScope { .. }
    ));
    assert_eq!((err.row, err.col), (2, 3));
    assert_eq!(err.code(), 101);
}

#[test]
fn unexpected_in_object_and_selector() {
    assert!(matches!(
        error("o { \"s\" = 1; }").kind,
        ParseErrorKind::UnexpectedTokenInObject { .. }
    ));
    assert!(matches!(
        error("a b = 1;").kind,
        ParseErrorKind::UnexpectedTokenInSelector { .. }
    ));

    let options = ParseOptionsBuilder::default()
        .follow_imports(false)
        .build()
        .unwrap();
    let err = parse_with("@import x; o { @import y; }", None, &options).unwrap_err();
    assert!(matches!(
        err.kind,
        ParseErrorKind::UnexpectedTokenInObject { .. }
    ));
}

#[test]
fn unexpected_end_of_input() {
    for text in ["o { a = 1;", "a = ", "a.", "x = { a, b"] {
        assert!(
            matches!(error(text).kind, ParseErrorKind::UnexpectedEndOfInput),
            "{text}"
        );
    }
}

#[test]
fn value_errors() {
    assert!(matches!(
        error("a = (x, y);").kind,
        ParseErrorKind::UnexpectedTokenInValue { .. }
    ));
    assert!(matches!(
        error("a = b { c };").kind,
        ParseErrorKind::UnexpectedTokenInValue { .. }
    ));
}

#[test]
fn metadata_and_alias_errors() {
    assert!(matches!(
        error("#= 1;").kind,
        ParseErrorKind::UnexpectedTokenInMetadata { .. }
    ));
    assert!(matches!(
        error("#a { b c }").kind,
        ParseErrorKind::UnexpectedTokenInMetadata { .. }
    ));
    assert!(matches!(
        error("@alias = x;").kind,
        ParseErrorKind::UnexpectedTokenInAlias { .. }
    ));
    assert!(matches!(
        error("@alias a = ::x;").kind,
        ParseErrorKind::UnexpectedTokenInAlias { .. }
    ));
}

#[test]
fn import_path_validation() {
    let err = error(r#"@import "a|b.props";"#);
    assert!(matches!(
        err.kind,
        ParseErrorKind::InvalidImportPath { ref path } if path == "a|b.props"
    ));
    assert!(matches!(
        error("@import {;").kind,
        ParseErrorKind::UnexpectedTokenInImport { .. }
    ));
}

#[test]
fn kind_conflict() {
    let err = error("a = 1;\na { }");
    assert_eq!((err.row, err.col), (2, 3));
    match err.kind {
        ParseErrorKind::Node(NodeError::KindMismatch {
            selector,
            existing,
            requested,
        }) => {
            assert_eq!(selector, Selector::new("a"));
            assert_eq!(existing, NodeKind::Property);
            assert_eq!(requested, NodeKind::Object);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn single_colon_where_double_required() {
    let err = error("o { :x = 1; }");
    assert!(matches!(err.kind, ParseErrorKind::DoubleColonRequired));
    assert_eq!(err.code(), 112);
}

#[test]
fn lexical_error() {
    let err = error("a = \"open");
    assert!(matches!(err.kind, ParseErrorKind::Lexical(_)));
    assert_eq!((err.row, err.col), (1, 5));
}

#[test]
fn display_has_location() {
    let err = error("\n\n  , x");
    assert_eq!(
        err.to_string(),
        "<input>:3:3: error PS101: unexpected ',' at global scope"
    );
}
