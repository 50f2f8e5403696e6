//! CEL evaluation engine.
//!
//! - [`Value`] is a runtime value.
//! - [`Activation`] supplies variable and function bindings.
//! - [`FunctionRegistry`] holds the builtins and caller functions.
//! - [`TypeRegistry`] resolves message literals.
//! - [`Program`] ties a parsed expression to its registries.
//! - [`Evaluator`] walks the tree.
//!
//! # Example
//!
//! ```
//! use cel_walk::eval::{MapActivation, Program, Value};
//!
//! let expr = cel_walk::parse("x + 1").into_result().unwrap();
//! let program = Program::new(expr);
//!
//! let activation = MapActivation::new().with("x", 41);
//! assert_eq!(program.eval(&activation), Ok(Value::Int(42)));
//! ```

mod activation;
mod error;
mod evaluator;
mod functions;
mod program;
mod registry;
mod value;

pub use activation::{Activation, EmptyActivation, HierarchicalActivation, MapActivation};
pub use error::{EvalError, EvalErrorKind};
pub use evaluator::{Evaluator, DEFAULT_MAX_EVAL_DEPTH};
pub use functions::{values_equal, Builtin, Function, FunctionImpl, FunctionRegistry};
pub use program::Program;
pub use registry::{MemoryTypeRegistry, Message, MessageType, TypeRegistry, WrapperKind};
pub use value::{MapKey, OptionalValue, Value, ValueMap};
