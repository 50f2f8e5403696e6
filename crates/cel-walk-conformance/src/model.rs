//! Serde model of the simple-test files in their proto3 JSON form.
//!
//! Only the parts of `cel.expr.conformance.test.SimpleTest` the runner
//! acts on are modeled. Unknown fields are ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A file of conformance tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimpleTestFile {
    pub name: String,
    pub description: String,
    pub section: Vec<SimpleTestSection>,
}

/// A named group of tests within a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimpleTestSection {
    pub name: String,
    pub description: String,
    pub test: Vec<SimpleTest>,
}

/// One expression and its expected outcome.
///
/// With none of `value`, `eval_error` or `any_eval_errors` set, the
/// expression is expected to evaluate to `true`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimpleTest {
    pub name: String,
    pub description: String,
    pub expr: String,
    pub disable_macros: bool,
    pub disable_check: bool,
    /// Parse with optional syntax (`a.?b`, `a[?k]`) enabled.
    pub enable_optional_syntax: bool,
    pub type_env: Vec<Decl>,
    pub container: String,
    pub bindings: BTreeMap<String, ExprValue>,
    pub value: Option<ProtoValue>,
    pub eval_error: Option<ErrorSetMatcher>,
    pub any_eval_errors: Option<AnyErrorsMatcher>,
}

/// What a test expects, resolved from the optional matcher fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expectation<'a> {
    Value(&'a ProtoValue),
    EvalError(&'a ErrorSetMatcher),
    AnyEvalErrors(&'a AnyErrorsMatcher),
}

impl SimpleTest {
    pub fn expectation(&self) -> Expectation<'_> {
        if let Some(value) = &self.value {
            Expectation::Value(value)
        } else if let Some(errors) = &self.eval_error {
            Expectation::EvalError(errors)
        } else if let Some(any) = &self.any_eval_errors {
            Expectation::AnyEvalErrors(any)
        } else {
            Expectation::Value(&TRUE)
        }
    }
}

static TRUE: ProtoValue = ProtoValue::BoolValue(true);

/// A declaration in the test's type environment. Only the name is used;
/// the declared type is carried through for the check pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Decl {
    pub name: String,
    pub ident: Option<serde_json::Value>,
    pub function: Option<serde_json::Value>,
}

/// A bound value, `{"value": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExprValue {
    pub value: ProtoValue,
}

/// `cel.expr.Value` in proto3 JSON: exactly one kind field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProtoValue {
    NullValue(Option<String>),
    BoolValue(bool),
    Int64Value(JsonNumber<i64>),
    Uint64Value(JsonNumber<u64>),
    DoubleValue(JsonDouble),
    StringValue(String),
    #[serde(with = "base64_bytes")]
    BytesValue(Vec<u8>),
    ListValue(ListValue),
    MapValue(MapValue),
}

/// Proto3 JSON writes `bytes` as a standard base64 string.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

/// 64-bit integers may be written as JSON numbers or decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonNumber<T> {
    Number(T),
    Text(String),
}

/// Doubles may be written as numbers or as `"NaN"`, `"Infinity"` and
/// `"-Infinity"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonDouble {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListValue {
    pub values: Vec<ProtoValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapValue {
    pub entries: Vec<MapEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: ProtoValue,
    pub value: ProtoValue,
}

/// Expected errors, matched by message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorSetMatcher {
    pub errors: Vec<ErrorMatcher>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorMatcher {
    pub message: String,
}

/// Any one of several error sets is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnyErrorsMatcher {
    pub errors: Vec<ErrorSetMatcher>,
}
