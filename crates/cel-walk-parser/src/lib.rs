//! Parser for the Common Expression Language (CEL).
//!
//! Parsing runs in three stages: [`lexer`] turns source text into tokens,
//! [`grammar`] builds a concrete parse tree, and [`builder`] lowers that
//! tree into the [`Expr`] AST, assigning node ids, balancing logical
//! chains and expanding macros along the way.
//!
//! ```
//! use cel_walk_parser::{parse, ExprKind};
//!
//! let result = parse("[1, 2, 3].exists(x, x > 2)");
//! assert!(result.is_ok());
//! assert!(matches!(result.expr.kind, ExprKind::Comprehension { .. }));
//! ```

pub mod ast;
pub mod balancer;
pub mod builder;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod macros;
pub mod operators;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use ast::{Constant, Entry, EntryKey, Expr, ExprKind, IdAllocator, ERROR_SENTINEL};
pub use builder::{build_expr, build_expr_with_macros};
pub use error::{Code, ErrorSet, LexError, Status, SyntaxError};
pub use lexer::Span;
pub use macros::{
    expand_macro, ArgCount, Macro, MacroContext, MacroError, MacroRegistry, MacroStyle, ACCU_VAR,
};
pub use operators::{find_macro, operator_for_text, Operator};

pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 100;

/// Switches that change what the parser accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Accept `a.?b` and `a[?b]`.
    pub enable_optional_syntax: bool,
    /// Keep every operator of a `!!x` or `--x` run instead of cancelling pairs.
    pub retain_repeated_unary: bool,
    /// Treat macro names as ordinary functions.
    pub disable_macros: bool,
    /// Nesting depth past which parsing stops with an error. Counts both
    /// grammar frames and the height of the resulting AST.
    pub max_recursion_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            enable_optional_syntax: false,
            retain_repeated_unary: false,
            disable_macros: false,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }
}

/// Output of a parse: the tree and every problem found.
///
/// The tree is always present. Subtrees that failed to build are replaced
/// by the `"<<error>>"` sentinel constant.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub expr: Expr,
    pub errors: ErrorSet,
}

impl ParseResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_err(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Discards the partial tree when there were errors.
    pub fn into_result(self) -> Result<Expr, ErrorSet> {
        if self.errors.is_empty() {
            Ok(self.expr)
        } else {
            Err(self.errors)
        }
    }
}

/// Parses `source` with default options.
pub fn parse(source: &str) -> ParseResult {
    parse_with_options(source, &ParseOptions::default())
}

pub fn parse_with_options(source: &str, options: &ParseOptions) -> ParseResult {
    parse_with_macros(source, options, MacroRegistry::standard_ref())
}

/// Parses `source`, expanding only the macros registered in `macros`.
#[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
pub fn parse_with_macros(source: &str, options: &ParseOptions, macros: &MacroRegistry) -> ParseResult {
    let mut ids = IdAllocator::new();

    let tokens = match lexer::lex(source) {
        Ok(tokens) => tokens,
        Err(err) => {
            debug!(error = %err, "lexing failed");
            return ParseResult {
                expr: Expr::error(ids.next_id()),
                errors: Status::from(err).into(),
            };
        }
    };

    let (tree, syntax_errors) = grammar::parse_tokens(&tokens, options.max_recursion_depth);
    let mut errors = ErrorSet::new();
    for err in syntax_errors {
        errors.push(err.into());
    }

    let (expr, build_errors) = build_expr_with_macros(&tree, &mut ids, options, macros);
    errors.extend(build_errors);

    debug!(errors = errors.len(), nodes = ids.peek() - 1, "parsed expression");
    ParseResult { expr, errors }
}
