//! `ConformanceService` backed by a cel-walk [`Environment`].

use cel_walk::{Environment, Expr, MapActivation, ParseOptions};
use tracing::debug;

use crate::{
    Binding, CheckResponse, ConformanceService, Decl, EvalResponse, Issue, ParseResponse,
    SourcePosition,
};

/// Runs every phase through one standard-library environment. Per-request
/// settings such as the container are layered onto a clone.
#[derive(Debug, Clone)]
pub struct CelWalkService {
    env: Environment,
}

impl CelWalkService {
    pub fn new() -> Self {
        Self {
            env: Environment::with_standard_library(),
        }
    }

    pub fn with_environment(env: Environment) -> Self {
        Self { env }
    }
}

impl Default for CelWalkService {
    fn default() -> Self {
        Self::new()
    }
}

impl ConformanceService for CelWalkService {
    fn parse(&self, source: &str, options: &ParseOptions) -> ParseResponse {
        let result = self.env.clone().with_parse_options(options.clone()).parse(source);
        let issues: Vec<Issue> = result
            .errors
            .iter()
            .map(|status| match &status.span {
                Some(span) => {
                    Issue::error_at(&status.message, SourcePosition::at(source, span.start))
                }
                None => Issue::error(&status.message),
            })
            .collect();
        let expr = result.is_ok().then_some(result.expr);
        ParseResponse { expr, issues }
    }

    fn check(&self, parsed: &Expr, type_env: &[Decl], container: &str) -> CheckResponse {
        debug!(decls = type_env.len(), container, "check");
        let env = self.env.clone().with_container(container);
        CheckResponse {
            checked: Some(env.check(parsed.clone())),
            issues: Vec::new(),
        }
    }

    fn eval(&self, expr: &Expr, bindings: &[Binding], container: &str) -> EvalResponse {
        let activation: MapActivation = bindings
            .iter()
            .map(|b| (b.name.clone(), b.value.clone()))
            .collect();
        let program = self.env.clone().with_container(container).program(expr.clone());
        match program.eval(&activation) {
            Ok(value) => EvalResponse {
                result: Some(value),
                issues: Vec::new(),
            },
            Err(errors) => EvalResponse {
                result: None,
                issues: errors.iter().map(|s| Issue::error(&s.message)).collect(),
            },
        }
    }
}
