//! What parse and evaluation failures look like.
//!
//! Run with: cargo run -p cel-walk --example error_handling

use cel_walk::{Environment, MapActivation, MapKey, Value};

fn show(env: &Environment, source: &str, activation: &MapActivation) {
    println!("=== {source} ===");
    match env.parse_and_eval(source, activation) {
        Ok(value) => println!("Result: {value}"),
        Err(err) => {
            println!("Error: {err}");
            for status in err.errors().into_iter().flat_map(|errors| errors.iter()) {
                println!("  [{:?}] {}", status.code, status.message);
            }
        }
    }
    println!();
}

fn main() {
    let env = Environment::with_standard_library();
    let activation = MapActivation::new()
        .with("x", 0)
        .with("items", vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        .with(
            "config",
            Value::map([(MapKey::String("host".into()), Value::from("localhost"))]),
        );

    // Two syntax errors are reported from one parse.
    show(&env, "(1 + ) && [1, 2", &activation);

    show(&env, "10 / x", &activation);
    show(&env, "items[10]", &activation);
    show(&env, "config.missing_key", &activation);
    show(&env, "9223372036854775807 + 1", &activation);

    // The error on the right is absorbed by a decisive left operand.
    show(&env, "x == 0 || 10 / x > 1", &activation);

    show(
        &env,
        "has(config.missing_key) ? config.missing_key : 'default'",
        &activation,
    );
}
