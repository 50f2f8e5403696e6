//! Unified environment for CEL expression processing.
//!
//! The `Environment` coordinates parse, check and program construction. It
//! owns the function registry, the type registry, the container namespace
//! and the parse options, and stamps them onto every [`Program`] it builds.

use std::sync::Arc;

use cel_walk_parser::{parse_with_options, ErrorSet, Expr, ParseOptions, ParseResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::eval::{
    Activation, EvalError, FunctionRegistry, MemoryTypeRegistry, Program, TypeRegistry, Value,
};

/// Errors surfaced by [`Environment`].
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("parse failed: {0}")]
    Parse(ErrorSet),
    #[error("evaluation failed: {0}")]
    Eval(ErrorSet),
    #[error("invalid environment config: {0}")]
    Config(#[from] serde_json::Error),
}

impl EnvError {
    /// The statuses behind a parse or evaluation failure.
    pub fn errors(&self) -> Option<&ErrorSet> {
        match self {
            EnvError::Parse(errors) | EnvError::Eval(errors) => Some(errors),
            EnvError::Config(_) => None,
        }
    }
}

/// Serializable settings for an [`Environment`].
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use cel_walk::EnvConfig;
///
/// let config = EnvConfig::from_json(r#"{"container": "acme"}"#).unwrap();
/// assert_eq!(config.container, "acme");
/// assert!(!config.parse.enable_optional_syntax);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub container: String,
    pub check: bool,
    pub parse: ParseOptions,
}

impl EnvConfig {
    pub fn from_json(json: &str) -> Result<Self, EnvError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Unified environment for CEL expression processing.
///
/// # Example
///
/// ```
/// use cel_walk::{Environment, MapActivation, Value};
///
/// let env = Environment::with_standard_library()
///     .with_function("double_it", |args: &[Value]| match args {
///         [Value::Int(n)] => Ok(Value::Int(n * 2)),
///         _ => Err(cel_walk::EvalError::no_such_overload("double_it", &[])),
///     });
///
/// let activation = MapActivation::new().with("x", 21);
/// let value = env.parse_and_eval("double_it(x)", &activation).unwrap();
/// assert_eq!(value, Value::Int(42));
/// ```
#[derive(Clone)]
pub struct Environment {
    functions: Arc<FunctionRegistry>,
    types: Arc<dyn TypeRegistry>,
    container: String,
    parse_options: ParseOptions,
    check: bool,
}

impl Environment {
    /// An environment with no functions at all.
    ///
    /// Use `with_standard_library()` for the builtin operators and functions.
    pub fn new() -> Self {
        Self {
            functions: Arc::new(FunctionRegistry::new()),
            types: Arc::new(MemoryTypeRegistry::new()),
            container: String::new(),
            parse_options: ParseOptions::default(),
            check: false,
        }
    }

    pub fn with_standard_library() -> Self {
        Self {
            functions: Arc::new(FunctionRegistry::standard()),
            ..Self::new()
        }
    }

    /// A standard-library environment configured from `config`.
    pub fn from_config(config: EnvConfig) -> Self {
        Self::with_standard_library()
            .with_container(config.container)
            .with_check(config.check)
            .with_parse_options(config.parse)
    }

    /// Sets the container namespace used for name resolution.
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    /// Registers a function, replacing any function of the same name.
    pub fn with_function<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.functions).register(name, function);
        self
    }

    pub fn with_type_registry(mut self, types: impl TypeRegistry + 'static) -> Self {
        self.types = Arc::new(types);
        self
    }

    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = options;
        self
    }

    pub fn with_check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn parse_options(&self) -> &ParseOptions {
        &self.parse_options
    }

    /// Parse a CEL expression.
    ///
    /// The returned `ParseResult` may hold both a partial tree and errors.
    pub fn parse(&self, source: &str) -> ParseResult {
        parse_with_options(source, &self.parse_options)
    }

    /// Type-checking pass. Expressions are evaluated dynamically, so this
    /// returns the tree unchanged.
    pub fn check(&self, expr: Expr) -> Expr {
        debug!(root = expr.id, "check is a pass-through");
        expr
    }

    /// Parse, and check when enabled.
    pub fn compile(&self, source: &str) -> Result<Expr, EnvError> {
        let expr = self.parse(source).into_result().map_err(EnvError::Parse)?;
        Ok(if self.check { self.check(expr) } else { expr })
    }

    /// Binds a compiled expression to this environment's registries.
    pub fn program(&self, expr: Expr) -> Program {
        Program::with_parts(
            Arc::new(expr),
            Arc::clone(&self.functions),
            Arc::clone(&self.types),
        )
        .with_container(self.container.clone())
    }

    /// Compiles and evaluates `source`. Parse errors are returned without
    /// evaluating anything.
    pub fn parse_and_eval(
        &self,
        source: &str,
        activation: &dyn Activation,
    ) -> Result<Value, EnvError> {
        let expr = self.compile(source)?;
        self.program(expr).eval(activation).map_err(EnvError::Eval)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("functions", &self.functions.len())
            .field("container", &self.container)
            .field("parse_options", &self.parse_options)
            .field("check", &self.check)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{EmptyActivation, MessageType};

    #[test]
    fn new_env_has_no_functions() {
        let env = Environment::new();
        assert!(env.functions().is_empty());
        let err = env.parse_and_eval("1 + 2", &EmptyActivation).unwrap_err();
        assert_eq!(err.errors().unwrap().first().unwrap().message, "unbound function");
    }

    #[test]
    fn standard_library() {
        let env = Environment::with_standard_library();
        assert!(env.functions().contains("_+_"));
        assert!(env.functions().contains("size"));
        assert_eq!(env.parse_and_eval("1 + 2", &EmptyActivation).unwrap(), Value::Int(3));
    }

    #[test]
    fn compile_parse_error() {
        let env = Environment::with_standard_library();
        let err = env.compile("1 +").unwrap_err();
        assert!(matches!(err, EnvError::Parse(_)));
    }

    #[test]
    fn parse_errors_skip_evaluation() {
        let env = Environment::with_standard_library().with_function("boom", |_: &[Value]| {
            Err(EvalError::internal("should not run"))
        });
        let err = env.parse_and_eval("boom() +", &EmptyActivation).unwrap_err();
        assert!(matches!(err, EnvError::Parse(_)));
    }

    #[test]
    fn container_and_types() {
        let types = MemoryTypeRegistry::new().with_message(MessageType::new("acme.Item").with_field("id"));
        let env = Environment::with_standard_library()
            .with_container("acme")
            .with_type_registry(types);
        assert_eq!(env.container(), "acme");
        assert_eq!(
            env.parse_and_eval("Item{id: 7}.id", &EmptyActivation).unwrap(),
            Value::Int(7)
        );
    }

    #[test]
    fn config_from_json() {
        let config = EnvConfig::from_json(
            r#"{"container": "acme", "check": true, "parse": {"enable_optional_syntax": true}}"#,
        )
        .unwrap();
        let env = Environment::from_config(config);
        assert_eq!(env.container(), "acme");
        assert!(env.parse_options().enable_optional_syntax);
        assert_eq!(
            env.parse_and_eval("{'a': 1}.?b.orValue(5)", &EmptyActivation).unwrap(),
            Value::Int(5)
        );
    }

    #[test]
    fn bad_config_is_an_error() {
        assert!(matches!(
            EnvConfig::from_json(r#"{"check": "yes"}"#),
            Err(EnvError::Config(_))
        ));
    }
}
