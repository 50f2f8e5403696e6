//! Shared helpers for the parser integration tests.

use cel_walk_parser::{parse, parse_with_options, ErrorSet, Expr, ParseOptions};

/// Parses `input`, panicking with every reported problem if it fails.
#[allow(dead_code)]
pub fn assert_parses(input: &str) -> Expr {
    assert_parses_with(input, &ParseOptions::default())
}

#[allow(dead_code)]
pub fn assert_parses_with(input: &str, options: &ParseOptions) -> Expr {
    let result = parse_with_options(input, options);
    if result.is_err() {
        panic!("failed to parse '{input}': {}", result.errors);
    }
    result.expr
}

/// Parses `input` and returns the problems, panicking if there were none.
#[allow(dead_code)]
pub fn assert_parse_error(input: &str) -> ErrorSet {
    let result = parse(input);
    if result.is_ok() {
        panic!("expected parse error for '{input}', but got: {:?}", result.expr);
    }
    result.errors
}

/// Collects every node id in the tree, including struct entry ids.
#[allow(dead_code)]
pub fn all_ids(expr: &Expr) -> Vec<u64> {
    let mut ids = vec![expr.id];
    if let cel_walk_parser::ExprKind::CreateStruct { entries, .. } = &expr.kind {
        ids.extend(entries.iter().map(|e| e.id));
    }
    for child in expr.children() {
        ids.extend(all_ids(child));
    }
    ids
}
