//! Parse an expression once and evaluate it against bindings.
//!
//! Run with: cargo run -p cel-walk --example quickstart

use cel_walk::{EnvError, Environment, MapActivation, Value};

fn main() -> Result<(), EnvError> {
    let env = Environment::with_standard_library();

    let source = "age >= 21 && user.startsWith('admin')";
    let expr = env.compile(source)?;
    let program = env.program(expr);

    let mut activation = MapActivation::new();
    activation.insert("user", "admin_alice");
    activation.insert("age", 25);

    let result = program.eval(&activation).map_err(EnvError::Eval)?;
    assert_eq!(result, Value::Bool(true));

    println!("Expression: {source}");
    println!("Result: {result}");
    Ok(())
}
