//! Integration tests for the public parse() API.

mod common;

use std::collections::HashSet;

use cel_walk_parser::{Constant, EntryKey, Expr, ExprKind, ParseOptions, ACCU_VAR};
use pretty_assertions::assert_eq;

fn constant(input: &str) -> Constant {
    match common::assert_parses(input).kind {
        ExprKind::Const(c) => c,
        other => panic!("expected constant for '{input}', got {other:?}"),
    }
}

fn call_parts(e: &Expr) -> (&str, Option<&Expr>, &[Expr]) {
    match &e.kind {
        ExprKind::Call {
            function,
            target,
            args,
        } => (function.as_str(), target.as_deref(), args.as_slice()),
        other => panic!("expected call, got {other:?}"),
    }
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn parse_integer_literals() {
    assert_eq!(constant("0"), Constant::Int(0));
    assert_eq!(constant("123"), Constant::Int(123));
    assert_eq!(constant("0x1F"), Constant::Int(31));
    assert_eq!(constant("0XAB"), Constant::Int(171));
    assert_eq!(constant("-42"), Constant::Int(-42));
    assert_eq!(constant("9223372036854775807"), Constant::Int(i64::MAX));
    assert_eq!(constant("-9223372036854775808"), Constant::Int(i64::MIN));
}

#[test]
fn parse_unsigned_integer_literals() {
    assert_eq!(constant("123u"), Constant::UInt(123));
    assert_eq!(constant("123U"), Constant::UInt(123));
    assert_eq!(constant("0x1Fu"), Constant::UInt(31));
}

#[test]
fn parse_double_literals() {
    assert_eq!(constant("1.5"), Constant::Double(1.5));
    assert_eq!(constant("1e10"), Constant::Double(1e10));
    assert_eq!(constant("1.5e-3"), Constant::Double(1.5e-3));
    assert_eq!(constant(".5"), Constant::Double(0.5));
    assert_eq!(constant("-2.5"), Constant::Double(-2.5));
}

#[test]
fn parse_string_literals() {
    assert_eq!(constant(r#""hello""#), Constant::String("hello".into()));
    assert_eq!(constant("'world'"), Constant::String("world".into()));
    assert_eq!(constant(r#""a\nb\t\"c\"""#), Constant::String("a\nb\t\"c\"".into()));
    assert_eq!(constant(r#""é\x41\101""#), Constant::String("éAA".into()));
    assert_eq!(constant(r#"r"a\nb""#), Constant::String("a\\nb".into()));
    assert_eq!(
        constant("\"\"\"line one\nline two\"\"\""),
        Constant::String("line one\nline two".into())
    );
}

#[test]
fn parse_bytes_literals() {
    assert_eq!(constant("b'abc'"), Constant::Bytes(b"abc".to_vec()));
    assert_eq!(constant(r#"b"\xff\000""#), Constant::Bytes(vec![0xff, 0x00]));
    assert_eq!(constant("b'ÿ'"), Constant::Bytes(vec![0xc3, 0xbf]));
}

#[test]
fn parse_keyword_literals() {
    assert_eq!(constant("true"), Constant::Bool(true));
    assert_eq!(constant("false"), Constant::Bool(false));
    assert_eq!(constant("null"), Constant::Null);
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn arithmetic_precedence() {
    let e = common::assert_parses("1 + 2 * 3");
    let (function, _, args) = call_parts(&e);
    assert_eq!(function, "_+_");
    assert_eq!(call_parts(&args[1]).0, "_*_");
}

#[test]
fn relations_bind_looser_than_arithmetic() {
    let e = common::assert_parses("a + 1 < b * 2");
    let (function, _, args) = call_parts(&e);
    assert_eq!(function, "_<_");
    assert_eq!(call_parts(&args[0]).0, "_+_");
    assert_eq!(call_parts(&args[1]).0, "_*_");
}

#[test]
fn in_operator() {
    let e = common::assert_parses("x in [1, 2]");
    let (function, _, args) = call_parts(&e);
    assert_eq!(function, "@in");
    assert_eq!(args[0], Expr::ident(1, "x"));
}

#[test]
fn conditional_is_right_associative() {
    let e = common::assert_parses("a ? b : c ? d : e");
    let (function, _, args) = call_parts(&e);
    assert_eq!(function, "_?_:_");
    assert_eq!(call_parts(&args[2]).0, "_?_:_");
}

#[test]
fn and_binds_tighter_than_or() {
    let e = common::assert_parses("a || b && c");
    let (function, _, args) = call_parts(&e);
    assert_eq!(function, "_||_");
    assert_eq!(call_parts(&args[1]).0, "_&&_");
}

#[test]
fn long_logical_chains_stay_shallow() {
    let source = (0..64).map(|i| format!("v{i}")).collect::<Vec<_>>().join(" && ");
    let e = common::assert_parses(&source);
    assert_eq!(e.call_function(), Some("_&&_"));
    assert!(e.depth() <= 8, "depth {}", e.depth());
}

#[test]
fn subtraction_of_negative_literal() {
    let e = common::assert_parses("4--4");
    let (function, _, args) = call_parts(&e);
    assert_eq!(function, "_-_");
    assert_eq!(args[1], Expr::constant(2, Constant::Int(-4)));
}

#[test]
fn negation_of_non_literal() {
    let e = common::assert_parses("-x");
    assert_eq!(e, Expr::call(2, "-_", vec![Expr::ident(1, "x")]));
}

#[test]
fn mixed_unary_operators_nest() {
    let e = common::assert_parses("!-x");
    let (function, _, args) = call_parts(&e);
    assert_eq!(function, "!_");
    assert_eq!(call_parts(&args[0]).0, "-_");
}

// ============================================================================
// Members, calls and constructors
// ============================================================================

#[test]
fn select_chain() {
    let e = common::assert_parses("a.b.c");
    let ExprKind::Select { operand, field, test_only } = &e.kind else {
        panic!("expected select");
    };
    assert_eq!(field, "c");
    assert!(!test_only);
    assert!(matches!(&operand.kind, ExprKind::Select { field, .. } if field == "b"));
}

#[test]
fn receiver_and_global_calls() {
    let e = common::assert_parses("s.startsWith('a')");
    let (function, target, args) = call_parts(&e);
    assert_eq!(function, "startsWith");
    assert_eq!(target, Some(&Expr::ident(1, "s")));
    assert_eq!(args.len(), 1);

    let e = common::assert_parses("size(x)");
    let (function, target, _) = call_parts(&e);
    assert_eq!(function, "size");
    assert!(target.is_none());
}

#[test]
fn leading_dot_names() {
    assert_eq!(common::assert_parses(".x"), Expr::ident(1, ".x"));
    let e = common::assert_parses(".f(1)");
    assert_eq!(call_parts(&e).0, ".f");
}

#[test]
fn list_and_map_literals() {
    let e = common::assert_parses("[1, 'two', 3.0]");
    let ExprKind::CreateList(elements) = &e.kind else {
        panic!("expected list");
    };
    assert_eq!(elements.len(), 3);
    assert_eq!(e.id, 4);

    let e = common::assert_parses("{'a': 1, 2: b}");
    let ExprKind::CreateStruct { message_name, entries } = &e.kind else {
        panic!("expected map");
    };
    assert!(message_name.is_empty());
    assert_eq!(entries.len(), 2);
    assert!(matches!(&entries[1].key, EntryKey::Map(k) if k.kind == ExprKind::Const(Constant::Int(2))));
}

#[test]
fn empty_constructors() {
    assert_eq!(common::assert_parses("[]"), Expr::new(1, ExprKind::CreateList(vec![])));
    let e = common::assert_parses("{}");
    assert!(matches!(e.kind, ExprKind::CreateStruct { ref entries, .. } if entries.is_empty()));
}

#[test]
fn message_construction() {
    let e = common::assert_parses("pkg.Msg{a: 1, b: 'x'}");
    let ExprKind::CreateStruct { message_name, entries } = &e.kind else {
        panic!("expected message");
    };
    assert_eq!(message_name, "pkg.Msg");
    let names: Vec<_> = entries
        .iter()
        .map(|entry| match &entry.key {
            EntryKey::Field(name) => name.as_str(),
            EntryKey::Map(_) => panic!("unexpected map key"),
        })
        .collect();
    assert_eq!(names, ["a", "b"]);
}

// ============================================================================
// Macros
// ============================================================================

#[test]
fn has_macro() {
    let e = common::assert_parses("has(m.f)");
    let ExprKind::Select { operand, field, test_only } = &e.kind else {
        panic!("expected select");
    };
    assert!(test_only);
    assert_eq!(field, "f");
    assert_eq!(**operand, Expr::ident(1, "m"));
}

#[test]
fn all_macro_expands_to_comprehension() {
    let e = common::assert_parses("[1, 2].all(x, x > 0)");
    let ExprKind::Comprehension {
        iter_var,
        iter_range,
        accu_var,
        accu_init,
        loop_condition,
        loop_step,
        result,
    } = &e.kind
    else {
        panic!("expected comprehension");
    };
    assert_eq!(iter_var, "x");
    assert_eq!(accu_var, ACCU_VAR);
    assert!(matches!(iter_range.kind, ExprKind::CreateList(_)));
    assert_eq!(accu_init.kind, ExprKind::Const(Constant::Bool(true)));
    assert_eq!(loop_condition.call_function(), Some("@not_strictly_false"));
    assert_eq!(loop_step.call_function(), Some("_&&_"));
    assert_eq!(result.as_ident(), Some(ACCU_VAR));
}

#[test]
fn every_iterating_macro_expands() {
    for source in [
        "xs.all(x, x)",
        "xs.exists(x, x)",
        "xs.exists_one(x, x)",
        "xs.map(x, x)",
        "xs.map(x, x, x)",
        "xs.filter(x, x)",
    ] {
        let e = common::assert_parses(source);
        assert!(
            matches!(e.kind, ExprKind::Comprehension { .. }),
            "{source} did not expand"
        );
    }
}

#[test]
fn nested_macros() {
    let e = common::assert_parses("xs.all(x, ys.exists(y, x == y))");
    let ExprKind::Comprehension { loop_step, .. } = &e.kind else {
        panic!("expected comprehension");
    };
    let (_, _, args) = call_parts(loop_step);
    assert!(matches!(args[1].kind, ExprKind::Comprehension { ref iter_var, .. } if iter_var == "y"));
}

#[test]
fn ids_are_unique() {
    for source in [
        "a.b[c] + f(d, e) * -g",
        "{'k': [1, 2], 'j': m.n}",
        "xs.filter(x, x > 1).map(y, y * 2)",
        "a ? b.c : pkg.Msg{f: 1}",
    ] {
        let ids = common::all_ids(&common::assert_parses(source));
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len(), "duplicate ids in {source}: {ids:?}");
        assert!(!ids.contains(&0));
    }
}

#[test]
fn root_id_is_largest() {
    for source in ["1 + 2 * 3", "[a, b].exists(x, x)", "f(a.b, {1: 2})"] {
        let e = common::assert_parses(source);
        let max = common::all_ids(&e).into_iter().max();
        assert_eq!(max, Some(e.id), "{source}");
    }
}

// ============================================================================
// Options
// ============================================================================

#[test]
fn optional_syntax_when_enabled() {
    let options = ParseOptions {
        enable_optional_syntax: true,
        ..ParseOptions::default()
    };
    let e = common::assert_parses_with("a.?b", &options);
    let (function, _, args) = call_parts(&e);
    assert_eq!(function, "_?._");
    assert_eq!(args[1].kind, ExprKind::Const(Constant::String("b".into())));

    let e = common::assert_parses_with("m[?'k']", &options);
    assert_eq!(call_parts(&e).0, "_[?_]");
}

#[test]
fn disabled_macros_parse_as_calls() {
    let options = ParseOptions {
        disable_macros: true,
        ..ParseOptions::default()
    };
    let e = common::assert_parses_with("has(a.b)", &options);
    assert_eq!(call_parts(&e).0, "has");
}

#[test]
fn whitespace_and_comments_are_skipped() {
    let e = common::assert_parses("1 +\n\t// trailing comment\n 2");
    assert_eq!(call_parts(&e).0, "_+_");
}
