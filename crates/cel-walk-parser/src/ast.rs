//! CEL abstract syntax tree.
//!
//! The tree mirrors the canonical CEL expression model: every node is an
//! [`Expr`] with a numeric id and one [`ExprKind`]. Operators and macros
//! have already been lowered by the time a tree exists, so binary and
//! unary operators appear as [`ExprKind::Call`] nodes named after their
//! operator symbol (`_+_`, `!_`, ...) and macros appear as
//! [`ExprKind::Comprehension`] nodes.

use std::fmt;

/// Sentinel string substituted for subtrees that failed to build.
pub const ERROR_SENTINEL: &str = "<<error>>";

/// A node in the expression tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// Unique id within a single parse. Ids start at 1.
    pub id: u64,
    pub kind: ExprKind,
}

/// The shape of an expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Const(Constant),
    /// A variable reference. A leading-dot name keeps its dot (`.x`).
    Ident(String),
    /// Field selection `operand.field`, or a presence test when `test_only`
    /// is set (produced by the `has` macro).
    Select {
        operand: Box<Expr>,
        field: String,
        test_only: bool,
    },
    /// A function or operator application. Receiver-style calls carry
    /// their receiver in `target`.
    Call {
        function: String,
        target: Option<Box<Expr>>,
        args: Vec<Expr>,
    },
    CreateList(Vec<Expr>),
    /// A map literal when `message_name` is empty, a message literal otherwise.
    CreateStruct {
        message_name: String,
        entries: Vec<Entry>,
    },
    /// The general fold that every iterating macro lowers to.
    Comprehension {
        iter_var: String,
        iter_range: Box<Expr>,
        accu_var: String,
        accu_init: Box<Expr>,
        loop_condition: Box<Expr>,
        loop_step: Box<Expr>,
        result: Box<Expr>,
    },
}

/// A single entry of a [`ExprKind::CreateStruct`] node.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: u64,
    pub key: EntryKey,
    pub value: Expr,
}

/// Key of a struct entry: a field name for messages, an expression for maps.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryKey {
    Field(String),
    Map(Expr),
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl Expr {
    pub fn new(id: u64, kind: ExprKind) -> Self {
        Self { id, kind }
    }

    /// The placeholder node used where a subtree could not be built.
    pub fn error(id: u64) -> Self {
        Self::new(id, ExprKind::Const(Constant::String(ERROR_SENTINEL.to_string())))
    }

    /// Returns true if this node is the error placeholder.
    pub fn is_error(&self) -> bool {
        matches!(&self.kind, ExprKind::Const(Constant::String(s)) if s == ERROR_SENTINEL)
    }

    pub fn ident(id: u64, name: impl Into<String>) -> Self {
        Self::new(id, ExprKind::Ident(name.into()))
    }

    pub fn constant(id: u64, value: Constant) -> Self {
        Self::new(id, ExprKind::Const(value))
    }

    pub fn call(id: u64, function: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::new(
            id,
            ExprKind::Call {
                function: function.into(),
                target: None,
                args,
            },
        )
    }

    pub fn receiver_call(
        id: u64,
        function: impl Into<String>,
        target: Expr,
        args: Vec<Expr>,
    ) -> Self {
        Self::new(
            id,
            ExprKind::Call {
                function: function.into(),
                target: Some(Box::new(target)),
                args,
            },
        )
    }

    /// Returns the name if this is an identifier.
    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the function name if this is a call.
    pub fn call_function(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Call { function, .. } => Some(function),
            _ => None,
        }
    }

    /// Depth of the tree rooted at this node. A leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.children().map(Expr::depth).max().unwrap_or(0)
    }

    /// Iterates over the direct children in source order.
    pub fn children(&self) -> Box<dyn Iterator<Item = &Expr> + '_> {
        match &self.kind {
            ExprKind::Const(_) | ExprKind::Ident(_) => Box::new(std::iter::empty()),
            ExprKind::Select { operand, .. } => Box::new(std::iter::once(operand.as_ref())),
            ExprKind::Call { target, args, .. } => {
                Box::new(target.as_deref().into_iter().chain(args.iter()))
            }
            ExprKind::CreateList(elements) => Box::new(elements.iter()),
            ExprKind::CreateStruct { entries, .. } => {
                Box::new(entries.iter().flat_map(|entry| {
                    let key = match &entry.key {
                        EntryKey::Map(key) => Some(key),
                        EntryKey::Field(_) => None,
                    };
                    key.into_iter().chain(std::iter::once(&entry.value))
                }))
            }
            ExprKind::Comprehension {
                iter_range,
                accu_init,
                loop_condition,
                loop_step,
                result,
                ..
            } => Box::new(
                [iter_range, accu_init, loop_condition, loop_step, result]
                    .into_iter()
                    .map(|e| &**e),
            ),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Null => write!(f, "null"),
            Constant::Bool(b) => write!(f, "{b}"),
            Constant::Int(n) => write!(f, "{n}"),
            Constant::UInt(n) => write!(f, "{n}u"),
            Constant::Double(d) => write!(f, "{d:?}"),
            Constant::String(s) => write!(f, "{s:?}"),
            Constant::Bytes(b) => write!(f, "b{:?}", String::from_utf8_lossy(b)),
        }
    }
}

/// Hands out node ids for one parse.
///
/// The allocator is passed explicitly through the builder and macro
/// expander so that macro-generated nodes share the surrounding counter.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Allocates the next id.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// The id the next call to [`IdAllocator::next_id`] will return.
    pub fn peek(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        assert_eq!(ids.peek(), 3);
    }

    #[test]
    fn error_node_is_detected() {
        let e = Expr::error(4);
        assert!(e.is_error());
        assert_eq!(e.id, 4);
        assert!(!Expr::constant(1, Constant::String("x".into())).is_error());
    }

    #[test]
    fn depth_counts_levels() {
        let leaf = Expr::ident(1, "a");
        assert_eq!(leaf.depth(), 1);
        let call = Expr::call(3, "_+_", vec![leaf, Expr::ident(2, "b")]);
        assert_eq!(call.depth(), 2);
    }

    #[test]
    fn receiver_call_children_include_target() {
        let call = Expr::receiver_call(
            3,
            "size",
            Expr::ident(1, "xs"),
            vec![Expr::constant(2, Constant::Int(1))],
        );
        let ids: Vec<u64> = call.children().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
