//! Evaluation error types.

use cel_walk_parser::{Code, Status};

/// An error raised while evaluating an expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub message: String,
    /// Extra context such as the function and argument kinds of a failed
    /// overload resolution.
    pub details: Vec<String>,
}

/// The kind of evaluation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalErrorKind {
    /// No implementation accepts the argument kinds.
    NoSuchOverload,
    InvalidArgument,
    /// Integer arithmetic or conversion out of the 64-bit range.
    Overflow,
    DivideByZero,
    ModulusByZero,
    IndexOutOfRange,
    /// Variable not bound in any scope.
    UnknownIdentifier,
    UnknownFunction,
    UnknownField,
    UnknownMessage,
    /// Map lookup of an absent key.
    KeyNotFound,
    /// Expression nested deeper than the evaluator will recurse.
    RecursionLimit,
    Internal,
}

impl EvalErrorKind {
    /// The status code reported for errors of this kind.
    pub fn code(self) -> Code {
        match self {
            EvalErrorKind::NoSuchOverload
            | EvalErrorKind::InvalidArgument
            | EvalErrorKind::DivideByZero
            | EvalErrorKind::ModulusByZero => Code::InvalidArgument,
            EvalErrorKind::Overflow | EvalErrorKind::IndexOutOfRange => Code::OutOfRange,
            EvalErrorKind::UnknownIdentifier
            | EvalErrorKind::UnknownFunction
            | EvalErrorKind::UnknownField
            | EvalErrorKind::UnknownMessage
            | EvalErrorKind::KeyNotFound => Code::NotFound,
            EvalErrorKind::RecursionLimit => Code::ResourceExhausted,
            EvalErrorKind::Internal => Code::Internal,
        }
    }
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }

    /// No overload of `function` accepts arguments of the given kinds.
    pub fn no_such_overload(function: &str, kinds: &[&str]) -> Self {
        Self::new(EvalErrorKind::NoSuchOverload, "no_such_overload")
            .with_detail(format!("{function}({})", kinds.join(", ")))
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::InvalidArgument, message)
    }

    pub fn overflow() -> Self {
        Self::new(EvalErrorKind::Overflow, "return error for overflow")
    }

    pub fn divide_by_zero() -> Self {
        Self::new(EvalErrorKind::DivideByZero, "divide by zero")
    }

    pub fn modulus_by_zero() -> Self {
        Self::new(EvalErrorKind::ModulusByZero, "modulus by zero")
    }

    pub fn index_out_of_range(index: impl std::fmt::Display) -> Self {
        Self::new(
            EvalErrorKind::IndexOutOfRange,
            format!("index out of range: {index}"),
        )
    }

    pub fn undeclared_reference(name: &str, container: &str) -> Self {
        Self::new(
            EvalErrorKind::UnknownIdentifier,
            format!("undeclared reference to '{name}' (in container '{container}')"),
        )
    }

    pub fn unbound_function(name: &str) -> Self {
        Self::new(EvalErrorKind::UnknownFunction, "unbound function")
            .with_detail(name.to_string())
    }

    pub fn unknown_field(field: &str) -> Self {
        Self::new(EvalErrorKind::UnknownField, format!("unknown field '{field}'"))
    }

    pub fn unknown_message(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UnknownMessage,
            format!("unknown message type '{name}'"),
        )
    }

    pub fn no_such_key(key: impl std::fmt::Display) -> Self {
        Self::new(EvalErrorKind::KeyNotFound, format!("no such key: {key}"))
    }

    pub fn recursion_limit(max_depth: usize) -> Self {
        Self::new(
            EvalErrorKind::RecursionLimit,
            format!("expression recursion limit exceeded: {max_depth}"),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Internal, message)
    }

    pub fn code(&self) -> Code {
        self.kind.code()
    }

    /// The status recorded in an evaluation's error set.
    pub fn to_status(&self) -> Status {
        self.details
            .iter()
            .fold(Status::new(self.code(), self.message.clone()), |status, detail| {
                status.with_detail(detail.clone())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overload_errors_carry_signature() {
        let err = EvalError::no_such_overload("_%_", &["string", "int"]);
        assert_eq!(err.to_string(), "no_such_overload");
        assert_eq!(err.details, vec!["_%_(string, int)".to_string()]);
        assert_eq!(err.code(), Code::InvalidArgument);
    }

    #[test]
    fn status_mapping() {
        let status = EvalError::overflow().to_status();
        assert_eq!(status.code, Code::OutOfRange);
        assert_eq!(status.message, "return error for overflow");
        assert!(status.span.is_none());

        assert_eq!(EvalError::unbound_function("f").code(), Code::NotFound);
        assert_eq!(EvalError::divide_by_zero().code(), Code::InvalidArgument);
        assert_eq!(EvalError::internal("x").code(), Code::Internal);
        assert_eq!(EvalError::recursion_limit(8).code(), Code::ResourceExhausted);
    }

    #[test]
    fn undeclared_reference_names_container() {
        let err = EvalError::undeclared_reference("x", "a.b");
        assert_eq!(err.message, "undeclared reference to 'x' (in container 'a.b')");
    }
}
