//! Builtin functions and the function registry.
//!
//! Every operator is an ordinary function over evaluated arguments,
//! registered under its symbol (`_+_`, `@in`, ...). The closed set of
//! builtins is the [`Builtin`] enum; callers add their own functions as
//! closures. Registering a name again replaces the previous entry, so user
//! functions can shadow builtins.
//!
//! A receiver call `x.f(y)` reaches its implementation as `f(x, y)`.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use cel_walk_parser::Operator;

use super::{EvalError, MapKey, OptionalValue, Value};

/// A caller-supplied function implementation.
pub type FunctionImpl = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync>;

/// The standard library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    LogicalAnd,
    LogicalOr,
    LogicalNot,
    Conditional,
    NotStrictlyFalse,
    Equals,
    NotEquals,
    Less,
    LessEquals,
    Greater,
    GreaterEquals,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Negate,
    Index,
    OptIndex,
    OptSelect,
    In,
    Size,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
    Dyn,
    Double,
    Int,
    UInt,
    String,
    Bytes,
    OptionalOf,
    OptionalNone,
    HasValue,
    Value,
    OrValue,
}

impl Builtin {
    pub const ALL: [Builtin; 37] = [
        Builtin::LogicalAnd,
        Builtin::LogicalOr,
        Builtin::LogicalNot,
        Builtin::Conditional,
        Builtin::NotStrictlyFalse,
        Builtin::Equals,
        Builtin::NotEquals,
        Builtin::Less,
        Builtin::LessEquals,
        Builtin::Greater,
        Builtin::GreaterEquals,
        Builtin::Add,
        Builtin::Subtract,
        Builtin::Multiply,
        Builtin::Divide,
        Builtin::Modulo,
        Builtin::Negate,
        Builtin::Index,
        Builtin::OptIndex,
        Builtin::OptSelect,
        Builtin::In,
        Builtin::Size,
        Builtin::Contains,
        Builtin::StartsWith,
        Builtin::EndsWith,
        Builtin::Matches,
        Builtin::Dyn,
        Builtin::Double,
        Builtin::Int,
        Builtin::UInt,
        Builtin::String,
        Builtin::Bytes,
        Builtin::OptionalOf,
        Builtin::OptionalNone,
        Builtin::HasValue,
        Builtin::Value,
        Builtin::OrValue,
    ];

    /// The name the builtin is registered under.
    pub fn name(self) -> &'static str {
        let op = match self {
            Builtin::LogicalAnd => Operator::LogicalAnd,
            Builtin::LogicalOr => Operator::LogicalOr,
            Builtin::LogicalNot => Operator::LogicalNot,
            Builtin::Conditional => Operator::Conditional,
            Builtin::NotStrictlyFalse => Operator::NotStrictlyFalse,
            Builtin::Equals => Operator::Equals,
            Builtin::NotEquals => Operator::NotEquals,
            Builtin::Less => Operator::Less,
            Builtin::LessEquals => Operator::LessEquals,
            Builtin::Greater => Operator::Greater,
            Builtin::GreaterEquals => Operator::GreaterEquals,
            Builtin::Add => Operator::Add,
            Builtin::Subtract => Operator::Subtract,
            Builtin::Multiply => Operator::Multiply,
            Builtin::Divide => Operator::Divide,
            Builtin::Modulo => Operator::Modulo,
            Builtin::Negate => Operator::Negate,
            Builtin::Index => Operator::Index,
            Builtin::OptIndex => Operator::OptIndex,
            Builtin::OptSelect => Operator::OptSelect,
            Builtin::In => Operator::In,
            Builtin::Size => return "size",
            Builtin::Contains => return "contains",
            Builtin::StartsWith => return "startsWith",
            Builtin::EndsWith => return "endsWith",
            Builtin::Matches => return "matches",
            Builtin::Dyn => return "dyn",
            Builtin::Double => return "double",
            Builtin::Int => return "int",
            Builtin::UInt => return "uint",
            Builtin::String => return "string",
            Builtin::Bytes => return "bytes",
            Builtin::OptionalOf => return "optional.of",
            Builtin::OptionalNone => return "optional.none",
            Builtin::HasValue => return "hasValue",
            Builtin::Value => return "value",
            Builtin::OrValue => return "orValue",
        };
        op.symbol()
    }

    pub fn call(self, args: &[Value]) -> Result<Value, EvalError> {
        match self {
            Builtin::LogicalAnd => logical(self, args, false),
            Builtin::LogicalOr => logical(self, args, true),
            Builtin::LogicalNot => match args {
                [Value::Bool(b)] => Ok(Value::Bool(!b)),
                _ => Err(overload(self, args)),
            },
            Builtin::Conditional => match args {
                [Value::Bool(cond), then, otherwise] => {
                    Ok(if *cond { then } else { otherwise }.clone())
                }
                _ => Err(overload(self, args)),
            },
            Builtin::NotStrictlyFalse => match args {
                [value] => Ok(Value::Bool(!matches!(value, Value::Bool(false)))),
                _ => Err(overload(self, args)),
            },
            Builtin::Equals | Builtin::NotEquals => match args {
                [a, b] => {
                    let equal = values_equal(a, b).map_err(|_| overload(self, args))?;
                    Ok(Value::Bool(equal == (self == Builtin::Equals)))
                }
                _ => Err(overload(self, args)),
            },
            Builtin::Less => relation(self, args, |o| o == Ordering::Less),
            Builtin::LessEquals => relation(self, args, |o| o != Ordering::Greater),
            Builtin::Greater => relation(self, args, |o| o == Ordering::Greater),
            Builtin::GreaterEquals => relation(self, args, |o| o != Ordering::Less),
            Builtin::Add => add(args),
            Builtin::Subtract => subtract(args),
            Builtin::Multiply => multiply(args),
            Builtin::Divide => divide(args),
            Builtin::Modulo => modulo(args),
            Builtin::Negate => match args {
                [Value::Int(i)] => i.checked_neg().map(Value::Int).ok_or_else(EvalError::overflow),
                [Value::Double(d)] => Ok(Value::Double(-d)),
                _ => Err(overload(self, args)),
            },
            Builtin::Index => match args {
                [container, key] => index(container, key),
                _ => Err(overload(self, args)),
            },
            Builtin::OptIndex => match args {
                [container, key] => optional_index(container, key),
                _ => Err(overload(self, args)),
            },
            Builtin::OptSelect => match args {
                [operand, Value::String(field)] => optional_select(operand, field),
                _ => Err(overload(self, args)),
            },
            Builtin::In => match args {
                [element, container] => contained_in(element, container),
                _ => Err(overload(self, args)),
            },
            Builtin::Size => match args {
                [value] => size(value),
                _ => Err(overload(self, args)),
            },
            Builtin::Contains => string_test(self, args, |s, t| s.contains(t)),
            Builtin::StartsWith => string_test(self, args, |s, t| s.starts_with(t)),
            Builtin::EndsWith => string_test(self, args, |s, t| s.ends_with(t)),
            Builtin::Matches => match args {
                [Value::String(s), Value::String(pattern)] => {
                    let re = regex::Regex::new(pattern).map_err(|e| {
                        EvalError::invalid_argument(format!("invalid argument: {e}"))
                    })?;
                    Ok(Value::Bool(re.is_match(s)))
                }
                _ => Err(overload(self, args)),
            },
            Builtin::Dyn => match args {
                [value] => Ok(value.clone()),
                _ => Err(overload(self, args)),
            },
            Builtin::Double => to_double(args),
            Builtin::Int => to_int(args),
            Builtin::UInt => to_uint(args),
            Builtin::String => to_string(args),
            Builtin::Bytes => match args {
                [Value::String(s)] => Ok(Value::bytes(s.as_bytes())),
                [b @ Value::Bytes(_)] => Ok(b.clone()),
                _ => Err(overload(self, args)),
            },
            Builtin::OptionalOf => match args {
                [value] => Ok(Value::optional_some(value.clone())),
                _ => Err(overload(self, args)),
            },
            Builtin::OptionalNone => match args {
                [] => Ok(Value::optional_none()),
                _ => Err(overload(self, args)),
            },
            Builtin::HasValue => match args {
                [Value::Optional(opt)] => Ok(Value::Bool(opt.is_present())),
                _ => Err(overload(self, args)),
            },
            Builtin::Value => match args {
                [Value::Optional(OptionalValue::Some(v))] => Ok((**v).clone()),
                [Value::Optional(OptionalValue::None)] => Err(EvalError::invalid_argument(
                    "optional.none() dereference",
                )),
                _ => Err(overload(self, args)),
            },
            Builtin::OrValue => match args {
                [Value::Optional(opt), default] => {
                    Ok(opt.as_value().unwrap_or(default).clone())
                }
                _ => Err(overload(self, args)),
            },
        }
    }
}

/// An entry in the registry.
#[derive(Clone)]
pub enum Function {
    Builtin(Builtin),
    Custom(FunctionImpl),
}

impl Function {
    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        match self {
            Function::Builtin(builtin) => builtin.call(args),
            Function::Custom(f) => f(args),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Builtin(builtin) => write!(f, "Builtin({})", builtin.name()),
            Function::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Functions available to a program, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Function>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every [`Builtin`].
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for builtin in Builtin::ALL {
            registry.insert(builtin.name(), Function::Builtin(builtin));
        }
        registry
    }

    pub fn insert(&mut self, name: impl Into<String>, function: Function) {
        self.functions.insert(name.into(), function);
    }

    /// Registers a closure under `name`, replacing any existing entry.
    pub fn register<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.insert(name, Function::Custom(Arc::new(function)));
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

// ==================== Equality and ordering ====================

/// CEL equality.
///
/// Numbers compare across kinds by value, `null` equals only `null`, and
/// lists and maps compare element-wise (maps after sorting both sides by
/// key). Comparing a list or map with any other kind has no overload.
pub fn values_equal(a: &Value, b: &Value) -> Result<bool, EvalError> {
    match (a, b) {
        (Value::List(x), Value::List(y)) => {
            if x.len() != y.len() {
                return Ok(false);
            }
            for (l, r) in x.iter().zip(y.iter()) {
                if !values_equal(l, r)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Value::Map(x), Value::Map(y)) => {
            if x.len() != y.len() {
                return Ok(false);
            }
            for ((ka, va), (kb, vb)) in x.sorted().into_iter().zip(y.sorted()) {
                if ka != kb || !values_equal(va, vb)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Value::List(_) | Value::Map(_), _) | (_, Value::List(_) | Value::Map(_)) => Err(
            EvalError::no_such_overload(Operator::Equals.symbol(), &[a.kind_name(), b.kind_name()]),
        ),
        (Value::Null, Value::Null) => Ok(true),
        (Value::Null, _) | (_, Value::Null) => Ok(false),
        (Value::Optional(x), Value::Optional(y)) => match (x.as_value(), y.as_value()) {
            (None, None) => Ok(true),
            (Some(x), Some(y)) => values_equal(x, y),
            _ => Ok(false),
        },
        _ if is_number(a) && is_number(b) => Ok(numeric_cmp(a, b) == Some(Ordering::Equal)),
        _ => Ok(a == b),
    }
}

fn is_number(v: &Value) -> bool {
    matches!(v, Value::Int(_) | Value::UInt(_) | Value::Double(_))
}

/// Orders two numbers of any kinds. `None` for NaN or non-numbers.
fn numeric_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::UInt(x), Value::UInt(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::UInt(y)) => Some(i128::from(*x).cmp(&i128::from(*y))),
        (Value::UInt(x), Value::Int(y)) => Some(i128::from(*x).cmp(&i128::from(*y))),
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(y),
        (Value::Double(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Double(x), Value::UInt(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Int(x), Value::Double(y)) => (*x as f64).partial_cmp(y),
        (Value::UInt(x), Value::Double(y)) => (*x as f64).partial_cmp(y),
        _ => None,
    }
}

fn relation(
    builtin: Builtin,
    args: &[Value],
    test: fn(Ordering) -> bool,
) -> Result<Value, EvalError> {
    let ordering = match args {
        [a, b] if is_number(a) && is_number(b) => numeric_cmp(a, b),
        [Value::String(a), Value::String(b)] => Some(a.cmp(b)),
        [Value::Bytes(a), Value::Bytes(b)] => Some(a.cmp(b)),
        [Value::Bool(a), Value::Bool(b)] => Some(a.cmp(b)),
        _ => return Err(overload(builtin, args)),
    };
    Ok(Value::Bool(ordering.is_some_and(test)))
}

// ==================== Logic ====================

/// Strict form of `&&` (`absorbing == false`) and `||` (`absorbing == true`)
/// over two evaluated operands. The absorbing value wins over a non-bool.
fn logical(builtin: Builtin, args: &[Value], absorbing: bool) -> Result<Value, EvalError> {
    match args {
        [a, b] if a.as_bool() == Some(absorbing) || b.as_bool() == Some(absorbing) => {
            Ok(Value::Bool(absorbing))
        }
        [Value::Bool(_), Value::Bool(_)] => Ok(Value::Bool(!absorbing)),
        _ => Err(overload(builtin, args)),
    }
}

// ==================== Arithmetic ====================

fn add(args: &[Value]) -> Result<Value, EvalError> {
    Ok(match args {
        [Value::Int(a), Value::Int(b)] => Value::Int(a.checked_add(*b).ok_or_else(EvalError::overflow)?),
        [Value::UInt(a), Value::UInt(b)] => {
            Value::UInt(a.checked_add(*b).ok_or_else(EvalError::overflow)?)
        }
        [Value::Double(a), Value::Double(b)] => Value::Double(a + b),
        [Value::String(a), Value::String(b)] => Value::string(format!("{a}{b}")),
        [Value::Bytes(a), Value::Bytes(b)] => Value::bytes([&a[..], &b[..]].concat()),
        [Value::List(a), Value::List(b)] => {
            Value::list(a.iter().chain(b.iter()).cloned().collect::<Vec<_>>())
        }
        _ => return Err(overload(Builtin::Add, args)),
    })
}

fn subtract(args: &[Value]) -> Result<Value, EvalError> {
    Ok(match args {
        [Value::Int(a), Value::Int(b)] => Value::Int(a.checked_sub(*b).ok_or_else(EvalError::overflow)?),
        [Value::UInt(a), Value::UInt(b)] => {
            Value::UInt(a.checked_sub(*b).ok_or_else(EvalError::overflow)?)
        }
        [Value::Double(a), Value::Double(b)] => Value::Double(a - b),
        [Value::List(a), Value::List(b)] => {
            let mut kept = Vec::with_capacity(a.len());
            for element in a.iter() {
                if !list_contains(b, element)? {
                    kept.push(element.clone());
                }
            }
            Value::list(kept)
        }
        _ => return Err(overload(Builtin::Subtract, args)),
    })
}

fn multiply(args: &[Value]) -> Result<Value, EvalError> {
    Ok(match args {
        [Value::Int(a), Value::Int(b)] => Value::Int(a.checked_mul(*b).ok_or_else(EvalError::overflow)?),
        [Value::UInt(a), Value::UInt(b)] => {
            Value::UInt(a.checked_mul(*b).ok_or_else(EvalError::overflow)?)
        }
        [Value::Double(a), Value::Double(b)] => Value::Double(a * b),
        _ => return Err(overload(Builtin::Multiply, args)),
    })
}

fn divide(args: &[Value]) -> Result<Value, EvalError> {
    Ok(match args {
        [Value::Int(_), Value::Int(0)] | [Value::UInt(_), Value::UInt(0)] => {
            return Err(EvalError::divide_by_zero())
        }
        [Value::Int(a), Value::Int(b)] => Value::Int(a.checked_div(*b).ok_or_else(EvalError::overflow)?),
        [Value::UInt(a), Value::UInt(b)] => Value::UInt(a / b),
        [Value::Double(a), Value::Double(b)] => Value::Double(a / b),
        _ => return Err(overload(Builtin::Divide, args)),
    })
}

fn modulo(args: &[Value]) -> Result<Value, EvalError> {
    Ok(match args {
        [Value::Int(_), Value::Int(0)] | [Value::UInt(_), Value::UInt(0)] => {
            return Err(EvalError::modulus_by_zero())
        }
        [Value::Int(a), Value::Int(b)] => Value::Int(a.checked_rem(*b).ok_or_else(EvalError::overflow)?),
        [Value::UInt(a), Value::UInt(b)] => Value::UInt(a % b),
        _ => return Err(overload(Builtin::Modulo, args)),
    })
}

// ==================== Containers ====================

fn list_contains(list: &[Value], element: &Value) -> Result<bool, EvalError> {
    for candidate in list {
        if values_equal(candidate, element)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Resolves a list index. `Ok(None)` when it is out of range.
fn list_position(len: usize, key: &Value) -> Result<Option<usize>, EvalError> {
    let index = match key {
        Value::Int(i) => i128::from(*i),
        Value::UInt(u) => i128::from(*u),
        Value::Double(d) if d.fract() == 0.0 && d.is_finite() => *d as i128,
        _ => {
            return Err(EvalError::no_such_overload(
                Operator::Index.symbol(),
                &["list", key.kind_name()],
            ))
        }
    };
    Ok(usize::try_from(index).ok().filter(|&i| i < len))
}

fn index(container: &Value, key: &Value) -> Result<Value, EvalError> {
    match container {
        Value::List(list) => match list_position(list.len(), key)? {
            Some(i) => Ok(list[i].clone()),
            None => Err(EvalError::index_out_of_range(key)),
        },
        Value::Map(map) => MapKey::for_lookup(key)
            .and_then(|k| map.get(&k))
            .cloned()
            .ok_or_else(|| match MapKey::for_lookup(key) {
                Some(k) => EvalError::no_such_key(k),
                None => EvalError::no_such_key(key),
            }),
        _ => Err(overload(Builtin::Index, &[container.clone(), key.clone()])),
    }
}

fn optional_index(container: &Value, key: &Value) -> Result<Value, EvalError> {
    let found = match container {
        Value::Optional(OptionalValue::None) => return Ok(Value::optional_none()),
        Value::Optional(OptionalValue::Some(inner)) => return optional_index(inner, key),
        Value::List(list) => list_position(list.len(), key)?.map(|i| list[i].clone()),
        Value::Map(map) => MapKey::for_lookup(key).and_then(|k| map.get(&k).cloned()),
        _ => return Err(overload(Builtin::OptIndex, &[container.clone(), key.clone()])),
    };
    Ok(Value::Optional(match found {
        Some(v) => OptionalValue::some(v),
        None => OptionalValue::None,
    }))
}

fn optional_select(operand: &Value, field: &str) -> Result<Value, EvalError> {
    let found = match operand {
        Value::Optional(OptionalValue::None) => return Ok(Value::optional_none()),
        Value::Optional(OptionalValue::Some(inner)) => return optional_select(inner, field),
        Value::Map(map) => map.get(&MapKey::String(Arc::from(field))).cloned(),
        Value::Object(message) => {
            if message.is_set(field)? {
                Some(message.get(field)?)
            } else {
                None
            }
        }
        _ => {
            return Err(EvalError::no_such_overload(
                Operator::OptSelect.symbol(),
                &[operand.kind_name(), "string"],
            ))
        }
    };
    Ok(Value::Optional(match found {
        Some(v) => OptionalValue::some(v),
        None => OptionalValue::None,
    }))
}

fn contained_in(element: &Value, container: &Value) -> Result<Value, EvalError> {
    match container {
        Value::List(list) => list_contains(list, element).map(Value::Bool),
        Value::Map(map) => Ok(Value::Bool(
            MapKey::for_lookup(element).is_some_and(|k| map.contains_key(&k)),
        )),
        _ => Err(overload(Builtin::In, &[element.clone(), container.clone()])),
    }
}

fn size(value: &Value) -> Result<Value, EvalError> {
    let n = match value {
        Value::String(s) => s.chars().count(),
        Value::Bytes(b) => b.len(),
        Value::List(l) => l.len(),
        Value::Map(m) => m.len(),
        _ => return Err(overload(Builtin::Size, std::slice::from_ref(value))),
    };
    i64::try_from(n).map(Value::Int).map_err(|_| EvalError::overflow())
}

fn string_test(builtin: Builtin, args: &[Value], test: fn(&str, &str) -> bool) -> Result<Value, EvalError> {
    match args {
        [Value::String(s), Value::String(t)] => Ok(Value::Bool(test(s, t))),
        _ => Err(overload(builtin, args)),
    }
}

// ==================== Conversions ====================

const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

fn to_double(args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [Value::Double(d)] => Ok(Value::Double(*d)),
        [Value::Int(i)] => Ok(Value::Double(*i as f64)),
        [Value::UInt(u)] => Ok(Value::Double(*u as f64)),
        [Value::String(s)] => s
            .trim()
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| EvalError::invalid_argument(format!("cannot convert '{s}' to double"))),
        _ => Err(overload(Builtin::Double, args)),
    }
}

fn to_int(args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [Value::Int(i)] => Ok(Value::Int(*i)),
        [Value::UInt(u)] => i64::try_from(*u).map(Value::Int).map_err(|_| EvalError::overflow()),
        [Value::Double(d)] => {
            if d.is_finite() && *d >= -TWO_POW_63 && *d < TWO_POW_63 {
                Ok(Value::Int(d.trunc() as i64))
            } else {
                Err(EvalError::overflow())
            }
        }
        [Value::String(s)] => s
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| EvalError::invalid_argument(format!("cannot convert '{s}' to int"))),
        _ => Err(overload(Builtin::Int, args)),
    }
}

fn to_uint(args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [Value::UInt(u)] => Ok(Value::UInt(*u)),
        [Value::Int(i)] => u64::try_from(*i).map(Value::UInt).map_err(|_| EvalError::overflow()),
        [Value::Double(d)] => {
            if d.is_finite() && *d > -1.0 && *d < TWO_POW_64 {
                Ok(Value::UInt(d.trunc() as u64))
            } else {
                Err(EvalError::overflow())
            }
        }
        [Value::String(s)] => s
            .parse::<u64>()
            .map(Value::UInt)
            .map_err(|_| EvalError::invalid_argument(format!("cannot convert '{s}' to uint"))),
        _ => Err(overload(Builtin::UInt, args)),
    }
}

fn to_string(args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [s @ Value::String(_)] => Ok(s.clone()),
        [Value::Int(i)] => Ok(Value::string(i.to_string())),
        [Value::UInt(u)] => Ok(Value::string(u.to_string())),
        [Value::Double(d)] => Ok(Value::string(d.to_string())),
        [Value::Bool(b)] => Ok(Value::string(b.to_string())),
        [Value::Bytes(b)] => std::str::from_utf8(b)
            .map(Value::from)
            .map_err(|e| EvalError::invalid_argument(format!("invalid UTF-8 in bytes: {e}"))),
        _ => Err(overload(Builtin::String, args)),
    }
}

fn overload(builtin: Builtin, args: &[Value]) -> EvalError {
    let kinds: Vec<&str> = args.iter().map(Value::kind_name).collect();
    EvalError::no_such_overload(builtin.name(), &kinds)
}
