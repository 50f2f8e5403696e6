//! cel-walk: parse and evaluate Common Expression Language expressions.
//!
//! # Quick Start
//!
//! ```
//! use cel_walk::{Environment, MapActivation, Value};
//!
//! let env = Environment::with_standard_library();
//! let activation = MapActivation::new().with("items", vec![Value::Int(3), Value::Int(8)]);
//!
//! let value = env
//!     .parse_and_eval("items.exists(i, i > 5) && size(items) == 2", &activation)
//!     .unwrap();
//! assert_eq!(value, Value::Bool(true));
//! ```
//!
//! # Architecture
//!
//! - **Parser** (`cel-walk-parser`): source text to an [`Expr`] tree, with
//!   macros expanded into comprehensions and every failure collected into an
//!   [`ErrorSet`].
//! - **Evaluator** ([`eval`]): walks the tree against an [`Activation`].
//! - **Environment**: holds the registries and options that every program
//!   built from it shares.

mod env;
pub mod eval;

pub use env::{EnvConfig, EnvError, Environment};

pub use eval::{
    Activation, Builtin, EmptyActivation, EvalError, EvalErrorKind, Evaluator, FunctionRegistry,
    HierarchicalActivation, MapActivation, MapKey, MemoryTypeRegistry, Message, MessageType,
    OptionalValue, Program, TypeRegistry, Value, ValueMap,
};

pub use cel_walk_parser::{
    parse, parse_with_options, Code, Constant, ErrorSet, Expr, ExprKind, ParseOptions,
    ParseResult, Span, Status,
};
