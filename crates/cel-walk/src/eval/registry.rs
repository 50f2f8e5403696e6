//! Message types known to the evaluator.
//!
//! A message literal such as `pkg.Point{x: 1}` is resolved through a
//! [`TypeRegistry`]. The protobuf wrapper types (`google.protobuf.Int64Value`
//! and friends) are registered by default and construct plain primitives
//! instead of objects.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use super::{EvalError, Value};

/// Looks up message types by fully qualified name.
pub trait TypeRegistry: Send + Sync {
    fn find_message(&self, name: &str) -> Option<Arc<MessageType>>;
}

/// The primitive a protobuf wrapper message stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperKind {
    Bool,
    Bytes,
    Double,
    Float,
    Int32,
    Int64,
    String,
    UInt32,
    UInt64,
}

impl WrapperKind {
    pub const ALL: [(&'static str, WrapperKind); 9] = [
        ("google.protobuf.BoolValue", WrapperKind::Bool),
        ("google.protobuf.BytesValue", WrapperKind::Bytes),
        ("google.protobuf.DoubleValue", WrapperKind::Double),
        ("google.protobuf.FloatValue", WrapperKind::Float),
        ("google.protobuf.Int32Value", WrapperKind::Int32),
        ("google.protobuf.Int64Value", WrapperKind::Int64),
        ("google.protobuf.StringValue", WrapperKind::String),
        ("google.protobuf.UInt32Value", WrapperKind::UInt32),
        ("google.protobuf.UInt64Value", WrapperKind::UInt64),
    ];

    /// The value of a wrapper constructed without its `value` field.
    pub fn default_value(self) -> Value {
        match self {
            WrapperKind::Bool => Value::Bool(false),
            WrapperKind::Bytes => Value::bytes(Vec::new()),
            WrapperKind::Double | WrapperKind::Float => Value::Double(0.0),
            WrapperKind::Int32 | WrapperKind::Int64 => Value::Int(0),
            WrapperKind::String => Value::string(""),
            WrapperKind::UInt32 | WrapperKind::UInt64 => Value::UInt(0),
        }
    }

    /// Checks `value` against the wrapped field type, narrowing 32-bit kinds.
    pub fn unwrap(self, type_name: &str, value: Value) -> Result<Value, EvalError> {
        match (self, value) {
            (WrapperKind::Bool, v @ Value::Bool(_))
            | (WrapperKind::Bytes, v @ Value::Bytes(_))
            | (WrapperKind::Double, v @ Value::Double(_))
            | (WrapperKind::Int64, v @ Value::Int(_))
            | (WrapperKind::String, v @ Value::String(_))
            | (WrapperKind::UInt64, v @ Value::UInt(_)) => Ok(v),
            (WrapperKind::Float, Value::Double(d)) => Ok(Value::Double(f64::from(d as f32))),
            (WrapperKind::Int32, Value::Int(i)) => i32::try_from(i)
                .map(|n| Value::Int(n.into()))
                .map_err(|_| EvalError::overflow()),
            (WrapperKind::UInt32, Value::UInt(u)) => u32::try_from(u)
                .map(|n| Value::UInt(n.into()))
                .map_err(|_| EvalError::overflow()),
            (_, other) => Err(EvalError::no_such_overload(
                type_name,
                &[other.kind_name()],
            )),
        }
    }
}

/// Descriptor of a message type: its name and field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageType {
    name: String,
    fields: Vec<String>,
    wrapper: Option<WrapperKind>,
}

impl MessageType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            wrapper: None,
        }
    }

    pub fn wrapper(name: impl Into<String>, kind: WrapperKind) -> Self {
        Self {
            wrapper: Some(kind),
            ..Self::new(name).with_field("value")
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn wrapper_kind(&self) -> Option<WrapperKind> {
        self.wrapper
    }
}

/// An instance of a registered message type. Unset fields are absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    descriptor: Arc<MessageType>,
    fields: BTreeMap<String, Value>,
}

impl Message {
    pub fn new(descriptor: Arc<MessageType>) -> Self {
        Self {
            descriptor,
            fields: BTreeMap::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn descriptor(&self) -> &MessageType {
        &self.descriptor
    }

    /// Sets a field declared on the message type.
    pub fn set(&mut self, field: &str, value: Value) -> Result<(), EvalError> {
        if !self.descriptor.has_field(field) {
            return Err(EvalError::unknown_field(field));
        }
        self.fields.insert(field.to_string(), value);
        Ok(())
    }

    /// Reads a field; unset fields read as `null`.
    pub fn get(&self, field: &str) -> Result<Value, EvalError> {
        if !self.descriptor.has_field(field) {
            return Err(EvalError::unknown_field(field));
        }
        Ok(self.fields.get(field).cloned().unwrap_or(Value::Null))
    }

    pub fn is_set(&self, field: &str) -> Result<bool, EvalError> {
        if !self.descriptor.has_field(field) {
            return Err(EvalError::unknown_field(field));
        }
        Ok(self.fields.contains_key(field))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.type_name())?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, "}}")
    }
}

/// A [`TypeRegistry`] held in memory.
#[derive(Debug, Clone)]
pub struct MemoryTypeRegistry {
    types: HashMap<String, Arc<MessageType>>,
}

impl MemoryTypeRegistry {
    /// A registry with no types at all, not even the wrappers.
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// A registry holding the protobuf wrapper types.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for (name, kind) in WrapperKind::ALL {
            registry.register(MessageType::wrapper(name, kind));
        }
        registry
    }

    pub fn register(&mut self, message_type: MessageType) {
        self.types
            .insert(message_type.name().to_string(), Arc::new(message_type));
    }

    pub fn with_message(mut self, message_type: MessageType) -> Self {
        self.register(message_type);
        self
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for MemoryTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry for MemoryTypeRegistry {
    fn find_message(&self, name: &str) -> Option<Arc<MessageType>> {
        self.types.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrappers_are_registered() {
        let registry = MemoryTypeRegistry::new();
        assert_eq!(registry.len(), 9);
        let int64 = registry.find_message("google.protobuf.Int64Value").unwrap();
        assert_eq!(int64.wrapper_kind(), Some(WrapperKind::Int64));
        assert!(int64.has_field("value"));
        assert!(MemoryTypeRegistry::empty().is_empty());
    }

    #[test]
    fn wrapper_unwrap_checks_kind_and_range() {
        assert_eq!(
            WrapperKind::Int32.unwrap("google.protobuf.Int32Value", Value::Int(7)),
            Ok(Value::Int(7))
        );
        assert_eq!(
            WrapperKind::Int32
                .unwrap("google.protobuf.Int32Value", Value::Int(1 << 40))
                .unwrap_err()
                .message,
            "return error for overflow"
        );
        assert!(WrapperKind::Bool
            .unwrap("google.protobuf.BoolValue", Value::Int(1))
            .is_err());
        assert_eq!(
            WrapperKind::Float.unwrap("google.protobuf.FloatValue", Value::Double(0.5)),
            Ok(Value::Double(0.5))
        );
    }

    #[test]
    fn message_fields() {
        let point = Arc::new(MessageType::new("geo.Point").with_field("x").with_field("y"));
        let mut msg = Message::new(point);
        msg.set("x", Value::Int(3)).unwrap();

        assert_eq!(msg.get("x"), Ok(Value::Int(3)));
        assert_eq!(msg.get("y"), Ok(Value::Null));
        assert_eq!(msg.is_set("y"), Ok(false));
        assert_eq!(msg.get("z").unwrap_err().message, "unknown field 'z'");
        assert_eq!(msg.to_string(), "geo.Point{x: 3}");
    }
}
