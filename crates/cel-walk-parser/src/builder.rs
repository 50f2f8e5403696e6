//! Lowers the parse tree to the [`Expr`] AST.
//!
//! Ids are assigned post-order: every node receives its id after all of
//! its children. Operators become calls named by their symbol, `&&`/`||`
//! chains are balanced, and macro call shapes are expanded. Problems are
//! recorded as statuses and the offending subtree is replaced by the
//! error sentinel, so the walk always completes.
//!
//! The walk recurses once per AST level. Trees from the grammar never
//! exceed `max_recursion_depth`, and hand-built trees that do are cut off
//! with a status.

use crate::ast::{Constant, Entry, EntryKey, Expr, ExprKind, IdAllocator};
use crate::balancer::ExprBalancer;
use crate::error::{ErrorSet, Status};
use crate::grammar::{Literal, NodeKind, ParseNode};
use crate::lexer::Span;
use crate::macros::{MacroContext, MacroRegistry};
use crate::operators::{operator_for_text, Operator};
use crate::ParseOptions;

/// Words that cannot name identifiers, fields or functions.
pub const RESERVED_IDENTIFIERS: [&str; 17] = [
    "as", "break", "const", "continue", "else", "for", "function", "if", "import", "let",
    "loop", "package", "namespace", "return", "var", "void", "while",
];

const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 1024 * 1024;

pub struct Builder<'a> {
    ids: &'a mut IdAllocator,
    options: &'a ParseOptions,
    macros: &'a MacroRegistry,
    errors: ErrorSet,
    depth: usize,
}

/// Builds the AST for `tree`, drawing ids from `ids`.
pub fn build_expr(tree: &ParseNode, ids: &mut IdAllocator, options: &ParseOptions) -> (Expr, ErrorSet) {
    build_expr_with_macros(tree, ids, options, MacroRegistry::standard_ref())
}

/// Like [`build_expr`], expanding only the macros in `macros`.
pub fn build_expr_with_macros(
    tree: &ParseNode,
    ids: &mut IdAllocator,
    options: &ParseOptions,
    macros: &MacroRegistry,
) -> (Expr, ErrorSet) {
    let mut builder = Builder::new(ids, options).with_macros(macros);
    let expr = builder.build(tree);
    (expr, builder.errors)
}

impl<'a> Builder<'a> {
    pub fn new(ids: &'a mut IdAllocator, options: &'a ParseOptions) -> Self {
        Self {
            ids,
            options,
            macros: MacroRegistry::standard_ref(),
            errors: ErrorSet::new(),
            depth: 0,
        }
    }

    pub fn with_macros(mut self, macros: &'a MacroRegistry) -> Self {
        self.macros = macros;
        self
    }

    fn next_id(&mut self) -> u64 {
        self.ids.next_id()
    }

    /// Records a problem and returns the sentinel in place of the subtree.
    fn report(&mut self, message: impl Into<String>, span: &Span) -> Expr {
        self.errors.push(Status::syntax(message, span.clone()));
        Expr::error(self.next_id())
    }

    fn check_reserved(&mut self, name: &str, span: &Span) -> bool {
        if RESERVED_IDENTIFIERS.contains(&name) {
            self.errors
                .push(Status::syntax(format!("reserved identifier: {name}"), span.clone()));
            false
        } else {
            true
        }
    }

    pub fn build(&mut self, node: &ParseNode) -> Expr {
        let max_depth = self.options.max_recursion_depth;
        if self.depth >= max_depth {
            return self.report(
                format!("expression recursion limit exceeded: {max_depth}"),
                &node.span,
            );
        }
        self.depth += 1;
        let expr = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.build_node(node));
        self.depth -= 1;
        expr
    }

    fn build_node(&mut self, node: &ParseNode) -> Expr {
        let node = unwrap(node);
        let span = &node.span;
        match &node.kind {
            NodeKind::Expr {
                condition,
                branches,
            } => {
                let condition = self.build(condition);
                match branches {
                    Some((then, otherwise)) => {
                        let then = self.build(then);
                        let otherwise = self.build(otherwise);
                        Expr::call(
                            self.next_id(),
                            Operator::Conditional.symbol(),
                            vec![condition, then, otherwise],
                        )
                    }
                    None => condition,
                }
            }
            NodeKind::ConditionalOr(terms) => self.build_logical(Operator::LogicalOr, terms, span),
            NodeKind::ConditionalAnd(terms) => self.build_logical(Operator::LogicalAnd, terms, span),
            NodeKind::Relation { left, op, right } | NodeKind::Calc { left, op, right } => {
                self.build_binary(op, left, right, span)
            }
            NodeKind::Unary { ops, operand } => self.build_unary(ops, operand, span),
            NodeKind::Select {
                operand,
                field,
                optional,
            } => self.build_select(operand, field, *optional, span),
            NodeKind::MemberCall {
                operand,
                name,
                args,
            } => {
                if !self.check_reserved(name, span) {
                    return Expr::error(self.next_id());
                }
                let target = self.build(operand);
                let args = self.build_all(args);
                self.call_or_macro(name, Some(target), args, span)
            }
            NodeKind::Index {
                operand,
                index,
                optional,
            } => {
                if *optional && !self.options.enable_optional_syntax {
                    return self.report("unsupported syntax '[?'", span);
                }
                let operand = self.build(operand);
                let index = self.build(index);
                let op = if *optional {
                    Operator::OptIndex
                } else {
                    Operator::Index
                };
                Expr::call(self.next_id(), op.symbol(), vec![operand, index])
            }
            NodeKind::Ident { name, leading_dot } => {
                if !self.check_reserved(name, span) {
                    return Expr::error(self.next_id());
                }
                Expr::ident(self.next_id(), qualify(name, *leading_dot))
            }
            NodeKind::GlobalCall {
                name,
                leading_dot,
                args,
            } => {
                if !self.check_reserved(name, span) {
                    return Expr::error(self.next_id());
                }
                let args = self.build_all(args);
                if *leading_dot {
                    Expr::call(self.next_id(), qualify(name, true), args)
                } else {
                    self.call_or_macro(name, None, args, span)
                }
            }
            NodeKind::Nested(inner) => self.build(inner),
            NodeKind::CreateList(elements) => {
                let elements = self.build_all(elements);
                Expr::new(self.next_id(), ExprKind::CreateList(elements))
            }
            NodeKind::CreateMap(entries) => {
                let entries = entries
                    .iter()
                    .map(|entry| {
                        let key = self.build(&entry.key);
                        let value = self.build(&entry.value);
                        Entry {
                            id: self.next_id(),
                            key: EntryKey::Map(key),
                            value,
                        }
                    })
                    .collect();
                Expr::new(
                    self.next_id(),
                    ExprKind::CreateStruct {
                        message_name: String::new(),
                        entries,
                    },
                )
            }
            NodeKind::CreateMessage { name, fields } => {
                let entries = fields
                    .iter()
                    .map(|field| {
                        let value = self.build(&field.value);
                        Entry {
                            id: self.next_id(),
                            key: EntryKey::Field(field.name.clone()),
                            value,
                        }
                    })
                    .collect();
                Expr::new(
                    self.next_id(),
                    ExprKind::CreateStruct {
                        message_name: name.clone(),
                        entries,
                    },
                )
            }
            NodeKind::Literal(literal) => self.build_literal(literal, span),
            NodeKind::Error => Expr::error(self.next_id()),
        }
    }

    fn build_all(&mut self, nodes: &[ParseNode]) -> Vec<Expr> {
        nodes.iter().map(|n| self.build(n)).collect()
    }

    fn build_logical(&mut self, op: Operator, terms: &[ParseNode], span: &Span) -> Expr {
        let Some((first, rest)) = terms.split_first() else {
            return self.report("empty logical expression", span);
        };
        let first = self.build(first);
        let mut balancer = ExprBalancer::new(op.symbol(), first);
        for term in rest {
            let term = self.build(term);
            let op_id = self.next_id();
            balancer.add(op_id, term);
        }
        balancer.balance()
    }

    fn build_binary(&mut self, op: &str, left: &ParseNode, right: &ParseNode, span: &Span) -> Expr {
        let Some(operator) = operator_for_text(op) else {
            return self.report(format!("operator not found: {op}"), span);
        };
        let left = self.build(left);
        let right = self.build(right);
        Expr::call(self.next_id(), operator.symbol(), vec![left, right])
    }

    fn build_unary(&mut self, ops: &[&str], operand: &ParseNode, span: &Span) -> Expr {
        let operator = match ops.first() {
            Some(&"!") => Operator::LogicalNot,
            Some(&"-") => Operator::Negate,
            Some(other) => return self.report(format!("operator not found: {other}"), span),
            None => return self.build(operand),
        };
        let operand = self.build(operand);

        let applications = if self.options.retain_repeated_unary {
            ops.len()
        } else {
            ops.len() % 2
        };
        (0..applications).fold(operand, |inner, _| {
            Expr::call(self.next_id(), operator.symbol(), vec![inner])
        })
    }

    fn build_select(&mut self, operand: &ParseNode, field: &str, optional: bool, span: &Span) -> Expr {
        if optional {
            if !self.options.enable_optional_syntax {
                return self.report("unsupported syntax '.?'", span);
            }
            if !self.check_reserved(field, span) {
                return Expr::error(self.next_id());
            }
            let operand = self.build(operand);
            let field = Expr::constant(self.next_id(), Constant::String(field.to_string()));
            return Expr::call(self.next_id(), Operator::OptSelect.symbol(), vec![operand, field]);
        }
        if !self.check_reserved(field, span) {
            return Expr::error(self.next_id());
        }
        let operand = self.build(operand);
        Expr::new(
            self.next_id(),
            ExprKind::Select {
                operand: Box::new(operand),
                field: field.to_string(),
                test_only: false,
            },
        )
    }

    /// Expands `name` as a macro when one matches, otherwise builds a call.
    fn call_or_macro(&mut self, name: &str, target: Option<Expr>, args: Vec<Expr>, span: &Span) -> Expr {
        let macros = self.macros;
        let found = if self.options.disable_macros {
            None
        } else {
            macros.lookup(name, args.len(), target.is_some())
        };

        let Some(macro_def) = found else {
            let id = self.next_id();
            return match target {
                Some(target) => Expr::receiver_call(id, name, target, args),
                None => Expr::call(id, name, args),
            };
        };

        let mut ctx = MacroContext::new(&mut *self.ids);
        match macro_def.expand(&mut ctx, target, args) {
            Ok(expr) => expr,
            Err(err) => self.report(err.message, span),
        }
    }

    fn build_literal(&mut self, literal: &Literal, span: &Span) -> Expr {
        let constant = match literal {
            Literal::Null => Constant::Null,
            Literal::Bool(b) => Constant::Bool(*b),
            Literal::Int { digits, negative } => {
                let (radix, body) = split_radix(digits);
                let text = if *negative {
                    format!("-{body}")
                } else {
                    body.to_string()
                };
                match i64::from_str_radix(&text, radix) {
                    Ok(n) => Constant::Int(n),
                    Err(_) => return self.report(format!("invalid int literal: {text}"), span),
                }
            }
            Literal::UInt(digits) => {
                let (radix, body) = split_radix(digits);
                match u64::from_str_radix(body, radix) {
                    Ok(n) => Constant::UInt(n),
                    Err(_) => return self.report(format!("invalid uint literal: {digits}u"), span),
                }
            }
            Literal::Double(d) => Constant::Double(*d),
            Literal::String(s) => Constant::String(s.clone()),
            Literal::Bytes(b) => Constant::Bytes(b.clone()),
        };
        Expr::constant(self.next_id(), constant)
    }
}

/// Skips the pass-through productions: an `expr` without a ternary, single
/// operand `||`/`&&` chains and parentheses.
fn unwrap(mut node: &ParseNode) -> &ParseNode {
    loop {
        node = match &node.kind {
            NodeKind::Expr {
                condition,
                branches: None,
            } => condition,
            NodeKind::ConditionalOr(terms) | NodeKind::ConditionalAnd(terms) if terms.len() == 1 => {
                &terms[0]
            }
            NodeKind::Nested(inner) => inner,
            _ => return node,
        };
    }
}

fn split_radix(digits: &str) -> (u32, &str) {
    match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => (16, hex),
        None => (10, digits),
    }
}

fn qualify(name: &str, leading_dot: bool) -> String {
    if leading_dot {
        format!(".{name}")
    } else {
        name.to_string()
    }
}
