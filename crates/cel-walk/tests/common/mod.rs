//! Shared helpers for the evaluator integration tests.

use cel_walk::{EmptyActivation, EnvError, Environment, ErrorSet, MapActivation, Value};

/// Evaluates `source` with no bindings, panicking on any failure.
#[allow(dead_code)]
pub fn eval_ok(source: &str) -> Value {
    eval_ok_with(source, &MapActivation::new())
}

#[allow(dead_code)]
pub fn eval_ok_with(source: &str, activation: &MapActivation) -> Value {
    match Environment::with_standard_library().parse_and_eval(source, activation) {
        Ok(value) => value,
        Err(err) => panic!("failed to evaluate '{source}': {err}"),
    }
}

/// Evaluates `source` and returns the evaluation errors, panicking if it
/// succeeded or failed to parse.
#[allow(dead_code)]
pub fn eval_err(source: &str) -> ErrorSet {
    match Environment::with_standard_library().parse_and_eval(source, &EmptyActivation) {
        Ok(value) => panic!("expected evaluation error for '{source}', but got: {value}"),
        Err(EnvError::Eval(errors)) => errors,
        Err(err) => panic!("expected evaluation error for '{source}', but got: {err}"),
    }
}

/// The message of the first recorded error.
#[allow(dead_code)]
pub fn eval_err_message(source: &str) -> String {
    let errors = eval_err(source);
    errors
        .first()
        .map(|status| status.message.clone())
        .unwrap_or_default()
}

#[allow(dead_code)]
pub fn ints(values: &[i64]) -> Value {
    Value::list(values.iter().map(|&v| Value::Int(v)).collect::<Vec<_>>())
}

/// Routes evaluator logs to the test output. Safe to call more than once.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}
