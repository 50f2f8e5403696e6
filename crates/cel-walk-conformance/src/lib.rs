//! Conformance testing for cel-walk.
//!
//! Test files follow the CEL `SimpleTestFile` layout in proto3 JSON. Each
//! test runs through a [`ConformanceService`], split into the same parse,
//! check and eval phases that other CEL implementations expose to their
//! conformance drivers.

pub mod loader;
pub mod model;
pub mod runner;
pub mod service;
pub mod value;

pub use loader::{load_test_file, LoadError};
pub use model::{Decl, Expectation, SimpleTest, SimpleTestFile, SimpleTestSection};
pub use runner::{run_file, run_test, run_test_with, FileSummary, TestFailure, TestOutcome};
pub use service::CelWalkService;

use cel_walk::{Expr, ParseOptions, Value};

/// An issue encountered during parsing, checking, or evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub message: String,
    /// Where in the source the issue was found, for parse issues.
    pub position: Option<SourcePosition>,
    pub severity: IssueSeverity,
}

/// 1-indexed line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    /// The position of byte `offset` in `source`. Columns count chars.
    pub fn at(source: &str, offset: usize) -> Self {
        let mut line = 1;
        let mut column = 1;
        for (i, c) in source.char_indices() {
            if i >= offset {
                break;
            }
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Self { line, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Info,
    Warning,
    Error,
}

impl Issue {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
            severity: IssueSeverity::Error,
        }
    }

    pub fn error_at(message: impl Into<String>, position: SourcePosition) -> Self {
        Self {
            position: Some(position),
            ..Self::error(message)
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Info,
            ..Self::error(message)
        }
    }
}

fn has_errors(issues: &[Issue]) -> bool {
    issues.iter().any(|i| i.severity == IssueSeverity::Error)
}

/// Response from parsing a CEL expression.
#[derive(Debug)]
pub struct ParseResponse {
    pub expr: Option<Expr>,
    pub issues: Vec<Issue>,
}

impl ParseResponse {
    pub fn is_ok(&self) -> bool {
        self.expr.is_some() && !has_errors(&self.issues)
    }
}

/// Response from checking a parsed expression.
#[derive(Debug)]
pub struct CheckResponse {
    pub checked: Option<Expr>,
    pub issues: Vec<Issue>,
}

impl CheckResponse {
    pub fn is_ok(&self) -> bool {
        self.checked.is_some() && !has_errors(&self.issues)
    }
}

/// Response from evaluating an expression.
#[derive(Debug)]
pub struct EvalResponse {
    pub result: Option<Value>,
    pub issues: Vec<Issue>,
}

impl EvalResponse {
    pub fn is_ok(&self) -> bool {
        self.result.is_some() && !has_errors(&self.issues)
    }
}

/// A variable binding for evaluation.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub value: Value,
}

/// The three phases of processing a CEL expression.
pub trait ConformanceService {
    /// Parse source text into an expression tree.
    fn parse(&self, source: &str, options: &ParseOptions) -> ParseResponse;

    /// Check a parsed expression against the declared variables.
    fn check(&self, parsed: &Expr, type_env: &[Decl], container: &str) -> CheckResponse;

    /// Evaluate an expression with the given bindings.
    fn eval(&self, expr: &Expr, bindings: &[Binding], container: &str) -> EvalResponse;
}
