//! Compiled CEL program ready for evaluation.
//!
//! A `Program` pairs a parsed expression with the functions and message
//! types it runs against. It is immutable and can be shared across threads;
//! every call to [`Program::eval`] owns its own error set.

use std::sync::Arc;

use cel_walk_parser::{ErrorSet, Expr};
use tracing::{debug, debug_span};

use super::{Activation, EmptyActivation, Evaluator, FunctionRegistry, MemoryTypeRegistry, TypeRegistry, Value};

/// A parsed expression bound to a function registry and type registry.
#[derive(Clone)]
pub struct Program {
    expr: Arc<Expr>,
    functions: Arc<FunctionRegistry>,
    types: Arc<dyn TypeRegistry>,
    container: String,
}

impl Program {
    /// A program over the standard library and the wrapper types.
    pub fn new(expr: Expr) -> Self {
        Self::with_parts(
            Arc::new(expr),
            Arc::new(FunctionRegistry::standard()),
            Arc::new(MemoryTypeRegistry::new()),
        )
    }

    pub fn with_parts(
        expr: Arc<Expr>,
        functions: Arc<FunctionRegistry>,
        types: Arc<dyn TypeRegistry>,
    ) -> Self {
        Self {
            expr,
            functions,
            types,
            container: String::new(),
        }
    }

    /// Sets the namespace used to resolve unqualified names.
    ///
    /// With container `cel.expr.conformance` the name `TestAllTypes` is
    /// tried as `cel.expr.conformance.TestAllTypes`, then
    /// `cel.expr.TestAllTypes`, `cel.TestAllTypes` and `TestAllTypes`.
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Evaluates the program against `activation`.
    ///
    /// On success the value is returned even if errors were absorbed along
    /// the way (`true || 1/0`). On failure the error set holds every status
    /// recorded during the pass, in the order they arose.
    pub fn eval(&self, activation: &dyn Activation) -> Result<Value, ErrorSet> {
        let span = debug_span!("eval", root = self.expr.id, container = %self.container);
        let _guard = span.enter();

        let mut evaluator = Evaluator::new(&self.functions, self.types.as_ref())
            .with_container(&self.container);
        let result = evaluator.eval(&self.expr, activation);
        let mut errors = evaluator.into_errors();

        match result {
            Ok(value) => {
                if !errors.is_empty() {
                    debug!(absorbed = errors.len(), "evaluation succeeded with absorbed errors");
                }
                Ok(value)
            }
            Err(err) => {
                if errors.is_empty() {
                    errors.push(err.to_status());
                }
                debug!(errors = errors.len(), error = %err, "evaluation failed");
                Err(errors)
            }
        }
    }

    /// Evaluates the program without any variable bindings.
    pub fn eval_empty(&self) -> Result<Value, ErrorSet> {
        self.eval(&EmptyActivation)
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("expr", &self.expr)
            .field("functions", &self.functions.len())
            .field("container", &self.container)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::MapActivation;
    use cel_walk_parser::parse;

    fn program(source: &str) -> Program {
        Program::new(parse(source).into_result().unwrap())
    }

    #[test]
    fn program_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Program>();
    }

    #[test]
    fn eval_with_bindings() {
        let program = program("x * 2 + y");
        let activation = MapActivation::new().with("x", 20).with("y", 2);
        assert_eq!(program.eval(&activation), Ok(Value::Int(42)));
    }

    #[test]
    fn eval_reports_error_set() {
        let errors = program("1 / 0").eval_empty().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().unwrap().message, "divide by zero");
    }

    #[test]
    fn container_applies_to_identifiers() {
        let program = program("limit").with_container("acme.quota");
        let activation = MapActivation::new().with("acme.limit", 10);
        assert_eq!(program.eval(&activation), Ok(Value::Int(10)));
        assert_eq!(program.container(), "acme.quota");
    }

    #[test]
    fn program_is_reusable() {
        let program = program("x > 0");
        for (x, expected) in [(1, true), (-1, false), (0, false)] {
            let activation = MapActivation::new().with("x", x);
            assert_eq!(program.eval(&activation), Ok(Value::Bool(expected)));
        }
    }
}
