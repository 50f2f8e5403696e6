//! Error reporting tests for the parser.

mod common;

use cel_walk_parser::{parse, parse_with_options, Code, ParseOptions, DEFAULT_MAX_RECURSION_DEPTH};

#[test]
fn unclosed_delimiters() {
    for source in ["(1 + 2", "[1, 2", "{'a': 1", "f(1"] {
        let result = parse(source);
        assert!(result.is_err(), "{source} should fail");
    }
}

#[test]
fn missing_operator() {
    let errors = common::assert_parse_error("1 2");
    assert!(errors
        .first()
        .unwrap()
        .message
        .starts_with("unexpected tokens after expression"));
}

#[test]
fn trailing_operator() {
    let errors = common::assert_parse_error("1 +");
    assert_eq!(errors.first().unwrap().message, "unexpected end of input");
}

#[test]
fn empty_input() {
    let errors = common::assert_parse_error("");
    assert_eq!(errors.len(), 1);
}

#[test]
fn every_status_is_invalid_argument_with_span() {
    for source in ["1 +", "a.while", "[1,, 2]", "'unterminated"] {
        let errors = common::assert_parse_error(source);
        for status in &errors {
            assert_eq!(status.code, Code::InvalidArgument, "{source}: {status}");
            assert!(status.span.is_some(), "{source}: {status}");
        }
    }
}

#[test]
fn unterminated_string() {
    let errors = common::assert_parse_error("'abc");
    assert!(errors.first().unwrap().message.contains("invalid string literal"));
}

#[test]
fn bad_escape_in_string() {
    common::assert_parse_error(r#""\q""#);
    common::assert_parse_error(r#""\400""#);
}

#[test]
fn unicode_escape_in_bytes_is_rejected() {
    common::assert_parse_error(r#"b"\u0041""#);
}

#[test]
fn unknown_character() {
    let errors = common::assert_parse_error("a # b");
    assert!(errors.first().unwrap().message.contains("token recognition error"));
}

#[test]
fn int_overflow() {
    let errors = common::assert_parse_error("9223372036854775808");
    assert_eq!(errors.first().unwrap().message, "invalid int literal: 9223372036854775808");
    common::assert_parse_error("18446744073709551616u");
}

#[test]
fn reserved_words() {
    let errors = common::assert_parse_error("package");
    assert_eq!(errors.first().unwrap().message, "reserved identifier: package");
    common::assert_parse_error("a.if");
    common::assert_parse_error("var(1)");
}

#[test]
fn optional_syntax_is_rejected_by_default() {
    let errors = common::assert_parse_error("a.?b");
    assert_eq!(errors.first().unwrap().message, "unsupported syntax '.?'");
    let errors = common::assert_parse_error("a[?b]");
    assert_eq!(errors.first().unwrap().message, "unsupported syntax '[?'");
}

#[test]
fn bad_macro_arguments() {
    let errors = common::assert_parse_error("has(a)");
    assert_eq!(errors.first().unwrap().message, "invalid argument to has() macro");
    let errors = common::assert_parse_error("[1].exists(x.y, true)");
    assert_eq!(errors.first().unwrap().message, "argument must be a simple name");
}

#[test]
fn errors_in_several_list_elements() {
    let errors = common::assert_parse_error("[1 +, 2 *, 3]");
    assert_eq!(errors.len(), 2);
}

#[test]
fn partial_tree_contains_error_sentinel() {
    let result = parse("[1, 2 +, 3]");
    assert!(result.is_err());
    let cel_walk_parser::ExprKind::CreateList(elements) = &result.expr.kind else {
        panic!("expected list, got {:?}", result.expr);
    };
    assert_eq!(elements.len(), 3);
    assert!(elements[1].is_error());
}

#[test]
fn recursion_limit() {
    let options = ParseOptions {
        max_recursion_depth: 32,
        ..ParseOptions::default()
    };
    let deep = format!("{}x{}", "[".repeat(64), "]".repeat(64));
    let result = parse_with_options(&deep, &options);
    assert!(result.is_err());
    assert!(result
        .errors
        .iter()
        .any(|s| s.message == "expression recursion limit exceeded: 32"));

    let shallow = format!("{}x{}", "(".repeat(16), ")".repeat(16));
    assert!(parse_with_options(&shallow, &options).is_ok());
}

fn limit_message() -> String {
    format!("expression recursion limit exceeded: {DEFAULT_MAX_RECURSION_DEPTH}")
}

fn assert_within_default_limit(input: &str) {
    let result = parse(input);
    assert!(result.is_ok(), "{}", result.errors);
}

fn assert_past_default_limit(input: &str) {
    let result = parse(input);
    assert!(result.is_err());
    assert_eq!(result.errors.first().unwrap().message, limit_message());
}

#[test]
fn default_limit_on_parentheses() {
    let depth = DEFAULT_MAX_RECURSION_DEPTH;
    assert_within_default_limit(&format!("{}1{}", "(".repeat(depth - 1), ")".repeat(depth - 1)));
    assert_past_default_limit(&format!("{}1{}", "(".repeat(depth), ")".repeat(depth)));
}

#[test]
fn default_limit_on_lists() {
    let depth = DEFAULT_MAX_RECURSION_DEPTH;
    assert_within_default_limit(&format!("{}1{}", "[".repeat(depth - 1), "]".repeat(depth - 1)));
    assert_past_default_limit(&format!("{}1{}", "[".repeat(depth), "]".repeat(depth)));
}

#[test]
fn default_limit_on_select_chains() {
    let depth = DEFAULT_MAX_RECURSION_DEPTH;
    assert_within_default_limit(&format!("a{}", ".b".repeat(depth - 1)));
    assert_past_default_limit(&format!("a{}", ".b".repeat(depth)));
    assert_past_default_limit(&format!("a{}", ".b".repeat(500)));
}

#[test]
fn default_limit_on_operator_chains() {
    let depth = DEFAULT_MAX_RECURSION_DEPTH;
    assert_within_default_limit(&vec!["1"; depth].join(" + "));
    assert_past_default_limit(&vec!["1"; depth + 1].join(" + "));
    assert_past_default_limit(&vec!["1"; 3000].join(" + "));
}
