//! Status codes and error collections shared by parsing and evaluation.

use std::fmt;

use crate::lexer::Span;

/// gRPC-style status code attached to every reported problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl Code {
    /// The numeric value used on the wire.
    pub fn as_i32(self) -> i32 {
        match self {
            Code::Ok => 0,
            Code::Cancelled => 1,
            Code::Unknown => 2,
            Code::InvalidArgument => 3,
            Code::DeadlineExceeded => 4,
            Code::NotFound => 5,
            Code::AlreadyExists => 6,
            Code::PermissionDenied => 7,
            Code::ResourceExhausted => 8,
            Code::FailedPrecondition => 9,
            Code::Aborted => 10,
            Code::OutOfRange => 11,
            Code::Unimplemented => 12,
            Code::Internal => 13,
            Code::Unavailable => 14,
            Code::DataLoss => 15,
            Code::Unauthenticated => 16,
        }
    }
}

/// One reported problem: a code, a message and optional context.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub code: Code,
    pub message: String,
    /// Source location for parse problems.
    pub span: Option<Span>,
    pub details: Vec<String>,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            span: None,
            details: Vec::new(),
        }
    }

    /// An `InvalidArgument` status pointing at a source range.
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self {
            span: Some(span),
            ..Self::new(Code::InvalidArgument, message)
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(span) = &self.span {
            write!(f, " at {}..{}", span.start, span.end)?;
        }
        for detail in &self.details {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

/// An ordered list of statuses collected during one parse or evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorSet {
    statuses: Vec<Status>,
}

impl ErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, status: Status) {
        self.statuses.push(status);
    }

    pub fn extend(&mut self, other: ErrorSet) {
        self.statuses.extend(other.statuses);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Status> {
        self.statuses.iter()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn first(&self) -> Option<&Status> {
        self.statuses.first()
    }

    pub fn into_vec(self) -> Vec<Status> {
        self.statuses
    }
}

impl From<Status> for ErrorSet {
    fn from(status: Status) -> Self {
        Self {
            statuses: vec![status],
        }
    }
}

impl IntoIterator for ErrorSet {
    type Item = Status;
    type IntoIter = std::vec::IntoIter<Status>;

    fn into_iter(self) -> Self::IntoIter {
        self.statuses.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorSet {
    type Item = &'a Status;
    type IntoIter = std::slice::Iter<'a, Status>;

    fn into_iter(self) -> Self::IntoIter {
        self.statuses.iter()
    }
}

impl fmt::Display for ErrorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, status) in self.statuses.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{status}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorSet {}

/// A character sequence the lexer could not turn into a token.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

/// A grammar error raised while building the parse tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

impl From<LexError> for Status {
    fn from(err: LexError) -> Self {
        Status::syntax(err.message, err.span)
    }
}

impl From<SyntaxError> for Status {
    fn from(err: SyntaxError) -> Self {
        Status::syntax(err.message, err.span)
    }
}
