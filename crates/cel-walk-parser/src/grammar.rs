//! Recursive-descent grammar producing a concrete parse tree.
//!
//! The tree keeps the shape of the CEL grammar productions (`expr`,
//! `conditionalOr`, `conditionalAnd`, `relation`, `calc`, `unary`,
//! `member`, `primary`) rather than an AST, so that id assignment,
//! operator lowering, balancing and macro expansion all happen in one
//! place: [`crate::builder`].
//!
//! Syntax errors inside list elements, call arguments, parentheses and
//! map or message entries are recovered at the next `,` or closing
//! delimiter, so one pass can report several problems.
//!
//! Nesting is bounded two ways. Every `parse_expr` frame counts against the
//! limit on the way down, and every node records the height of the AST it
//! will lower to, so a long postfix or operator chain is cut off too. The
//! builder and evaluator recurse over that AST and rely on its height.

use crate::error::SyntaxError;
use crate::lexer::{Span, SpannedToken, Token};

/// A node of the concrete parse tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseNode {
    pub kind: NodeKind,
    pub span: Span,
    /// Height of the AST this subtree lowers to. Pass-through wrappers add
    /// nothing.
    pub height: usize,
}

impl ParseNode {
    fn error(span: Span) -> Self {
        Self {
            kind: NodeKind::Error,
            span,
            height: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// `condition ? then : else`, or just `condition`.
    Expr {
        condition: Box<ParseNode>,
        branches: Option<(Box<ParseNode>, Box<ParseNode>)>,
    },
    /// Operands of a `||` chain, in source order.
    ConditionalOr(Vec<ParseNode>),
    /// Operands of a `&&` chain, in source order.
    ConditionalAnd(Vec<ParseNode>),
    Relation {
        left: Box<ParseNode>,
        op: &'static str,
        right: Box<ParseNode>,
    },
    Calc {
        left: Box<ParseNode>,
        op: &'static str,
        right: Box<ParseNode>,
    },
    /// A run of prefix operators. Every entry is the same lexeme.
    Unary {
        ops: Vec<&'static str>,
        operand: Box<ParseNode>,
    },
    Select {
        operand: Box<ParseNode>,
        field: String,
        optional: bool,
    },
    MemberCall {
        operand: Box<ParseNode>,
        name: String,
        args: Vec<ParseNode>,
    },
    Index {
        operand: Box<ParseNode>,
        index: Box<ParseNode>,
        optional: bool,
    },
    Ident {
        name: String,
        leading_dot: bool,
    },
    GlobalCall {
        name: String,
        leading_dot: bool,
        args: Vec<ParseNode>,
    },
    Nested(Box<ParseNode>),
    CreateList(Vec<ParseNode>),
    CreateMap(Vec<MapEntry>),
    CreateMessage {
        name: String,
        fields: Vec<FieldInit>,
    },
    Literal(Literal),
    /// Placeholder for a subtree whose syntax error was already reported.
    Error,
}

impl NodeKind {
    fn height(&self) -> usize {
        match self {
            NodeKind::Expr {
                condition,
                branches: None,
            } => condition.height,
            NodeKind::Expr {
                condition,
                branches: Some((then, otherwise)),
            } => 1 + condition.height.max(then.height).max(otherwise.height),
            NodeKind::ConditionalOr(terms) | NodeKind::ConditionalAnd(terms) => {
                tallest(terms) + balanced_levels(terms.len())
            }
            NodeKind::Relation { left, right, .. } | NodeKind::Calc { left, right, .. } => {
                1 + left.height.max(right.height)
            }
            NodeKind::Unary { ops, operand } => ops.len() + operand.height,
            NodeKind::Select { operand, .. } => 1 + operand.height,
            NodeKind::MemberCall { operand, args, .. } => 1 + operand.height.max(tallest(args)),
            NodeKind::Index { operand, index, .. } => 1 + operand.height.max(index.height),
            NodeKind::GlobalCall { args, .. } | NodeKind::CreateList(args) => 1 + tallest(args),
            NodeKind::Nested(inner) => inner.height,
            NodeKind::CreateMap(entries) => {
                1 + entries
                    .iter()
                    .map(|e| e.key.height.max(e.value.height))
                    .max()
                    .unwrap_or(0)
            }
            NodeKind::CreateMessage { fields, .. } => {
                1 + fields.iter().map(|f| f.value.height).max().unwrap_or(0)
            }
            NodeKind::Ident { .. } | NodeKind::Literal(_) | NodeKind::Error => 1,
        }
    }
}

fn tallest(nodes: &[ParseNode]) -> usize {
    nodes.iter().map(|n| n.height).max().unwrap_or(0)
}

/// Levels a balanced tree over `terms` operands adds above them.
fn balanced_levels(terms: usize) -> usize {
    match terms {
        0 | 1 => 0,
        n => (usize::BITS - (n - 1).leading_zeros()) as usize,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: ParseNode,
    pub value: ParseNode,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInit {
    pub name: String,
    pub value: ParseNode,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    /// Unparsed digits; `negative` is set when a prefix minus was folded in.
    Int {
        digits: String,
        negative: bool,
    },
    UInt(String),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
}

type NodeResult = Result<ParseNode, SyntaxError>;

const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 1024 * 1024;

pub struct Grammar<'a> {
    tokens: &'a [SpannedToken],
    pos: usize,
    depth: usize,
    max_depth: usize,
    errors: Vec<SyntaxError>,
}

impl<'a> Grammar<'a> {
    pub fn new(tokens: &'a [SpannedToken], max_depth: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            max_depth,
            errors: Vec::new(),
        }
    }

    /// Parses the whole token stream. Always yields a tree; problems are
    /// returned alongside it.
    pub fn parse(mut self) -> (ParseNode, Vec<SyntaxError>) {
        let root = match self.parse_expr() {
            Ok(node) => {
                if !self.at_end() {
                    let span = self.peek_span();
                    self.errors.push(SyntaxError {
                        message: format!(
                            "unexpected tokens after expression: {}",
                            self.describe_current()
                        ),
                        span,
                    });
                }
                node
            }
            Err(err) => {
                let span = err.span.clone();
                self.errors.push(err);
                ParseNode::error(span)
            }
        };
        (root, self.errors)
    }

    // === Token helpers ===

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| s.clone())
            .unwrap_or_else(|| self.eof_span())
    }

    fn eof_span(&self) -> Span {
        let end = self.tokens.last().map(|(_, s)| s.end).unwrap_or(0);
        end..end
    }

    /// End offset of the most recently consumed token.
    fn prev_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|(_, s)| s.end)
            .unwrap_or(0)
    }

    fn advance(&mut self) -> Option<&SpannedToken> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<Span, SyntaxError> {
        if self.check(token) {
            let span = self.peek_span();
            self.advance();
            Ok(span)
        } else {
            Err(self.error(format!(
                "expected {token}, found {}",
                self.describe_current()
            )))
        }
    }

    /// Accepts identifiers and reserved words; the builder rejects the latter
    /// with a better message.
    fn expect_name(&mut self, what: &str) -> Result<String, SyntaxError> {
        match self.peek() {
            Some(Token::Ident(name) | Token::Reserved(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(format!(
                "expected {what}, found {}",
                self.describe_current()
            ))),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn describe_current(&self) -> String {
        match self.peek() {
            Some(token) => token.to_string(),
            None => "end of input".to_string(),
        }
    }

    fn error(&self, message: String) -> SyntaxError {
        SyntaxError {
            message,
            span: self.peek_span(),
        }
    }

    fn unexpected(&self) -> SyntaxError {
        match self.peek() {
            Some(token) => self.error(format!("unexpected token {token}")),
            None => self.error("unexpected end of input".to_string()),
        }
    }

    fn limit_error(&self) -> SyntaxError {
        self.error(format!(
            "expression recursion limit exceeded: {}",
            self.max_depth
        ))
    }

    fn node(&self, kind: NodeKind, start: usize) -> NodeResult {
        let height = kind.height();
        if height > self.max_depth {
            return Err(self.limit_error());
        }
        Ok(ParseNode {
            kind,
            span: start..self.prev_end().max(start),
            height,
        })
    }

    // === Recovery ===

    /// Parses one delimited element, recovering from a syntax error by
    /// skipping to the next `,` or `close` at the same nesting level.
    fn element(&mut self, close: &Token) -> NodeResult {
        match self.parse_expr() {
            Ok(node) => Ok(node),
            Err(err) if self.at_end() => Err(err),
            Err(err) => {
                let span = err.span.clone();
                self.errors.push(err);
                self.synchronize(close);
                Ok(ParseNode::error(span))
            }
        }
    }

    fn synchronize(&mut self, close: &Token) {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token {
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace if depth > 0 => depth -= 1,
                Token::Comma if depth == 0 => return,
                t if depth == 0 && t == close => return,
                _ => {}
            }
            self.advance();
        }
    }

    fn descend(&mut self, f: fn(&mut Self) -> NodeResult) -> NodeResult {
        if self.depth >= self.max_depth {
            return Err(self.limit_error());
        }
        self.depth += 1;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || f(self));
        self.depth -= 1;
        result
    }

    // === Productions ===

    pub fn parse_expr(&mut self) -> NodeResult {
        self.descend(Self::parse_conditional)
    }

    fn parse_conditional(&mut self) -> NodeResult {
        let start = self.peek_span().start;
        let condition = self.parse_or()?;
        let branches = if self.match_token(&Token::Question) {
            let then = self.parse_or()?;
            self.expect(&Token::Colon)?;
            let otherwise = self.parse_expr()?;
            Some((Box::new(then), Box::new(otherwise)))
        } else {
            None
        };
        self.node(
            NodeKind::Expr {
                condition: Box::new(condition),
                branches,
            },
            start,
        )
    }

    fn parse_or(&mut self) -> NodeResult {
        let start = self.peek_span().start;
        let mut terms = vec![self.parse_and()?];
        while self.match_token(&Token::Or) {
            terms.push(self.parse_and()?);
        }
        self.node(NodeKind::ConditionalOr(terms), start)
    }

    fn parse_and(&mut self) -> NodeResult {
        let start = self.peek_span().start;
        let mut terms = vec![self.parse_relation()?];
        while self.match_token(&Token::And) {
            terms.push(self.parse_relation()?);
        }
        self.node(NodeKind::ConditionalAnd(terms), start)
    }

    fn relation_op(&self) -> Option<&'static str> {
        let token = self.peek()?;
        match token {
            Token::EqEq | Token::Ne | Token::Lt | Token::Le | Token::Gt | Token::Ge | Token::In => {
                token.lexeme()
            }
            _ => None,
        }
    }

    fn parse_relation(&mut self) -> NodeResult {
        let start = self.peek_span().start;
        let mut left = self.parse_additive()?;
        while let Some(op) = self.relation_op() {
            self.advance();
            let right = self.parse_additive()?;
            left = self.node(
                NodeKind::Relation {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                start,
            )?;
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> NodeResult {
        let start = self.peek_span().start;
        let mut left = self.parse_multiplicative()?;
        while let Some(op @ ("+" | "-")) = self.peek().and_then(Token::lexeme) {
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.node(
                NodeKind::Calc {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                start,
            )?;
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> NodeResult {
        let start = self.peek_span().start;
        let mut left = self.parse_unary()?;
        while let Some(op @ ("*" | "/" | "%")) = self.peek().and_then(Token::lexeme) {
            self.advance();
            let right = self.parse_unary()?;
            left = self.node(
                NodeKind::Calc {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                start,
            )?;
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> NodeResult {
        let start = self.peek_span().start;
        let (token, op) = match self.peek() {
            Some(Token::Not) => (Token::Not, "!"),
            Some(Token::Minus) => (Token::Minus, "-"),
            _ => return self.parse_member(),
        };

        let mut ops = Vec::new();
        while self.match_token(&token) {
            ops.push(op);
        }

        // A lone minus directly before a number belongs to the literal.
        if ops == ["-"] {
            let literal = match self.peek() {
                Some(Token::Int(digits)) => Some(Literal::Int {
                    digits: digits.clone(),
                    negative: true,
                }),
                Some(Token::Double(value)) => Some(Literal::Double(-value)),
                _ => None,
            };
            if let Some(literal) = literal {
                self.advance();
                let node = self.node(NodeKind::Literal(literal), start)?;
                return self.parse_postfix(node);
            }
        }

        let operand = if matches!(self.peek(), Some(Token::Not | Token::Minus)) {
            self.descend(Self::parse_unary)?
        } else {
            self.parse_member()?
        };
        self.node(
            NodeKind::Unary {
                ops,
                operand: Box::new(operand),
            },
            start,
        )
    }

    fn parse_member(&mut self) -> NodeResult {
        let primary = self.parse_primary()?;
        self.parse_postfix(primary)
    }

    fn parse_postfix(&mut self, mut node: ParseNode) -> NodeResult {
        loop {
            let start = node.span.start;
            match self.peek() {
                Some(Token::Dot) => {
                    self.advance();
                    let optional = self.match_token(&Token::Question);
                    let name = self.expect_name("field name")?;
                    let kind = if !optional && self.check(&Token::LParen) {
                        let args = self.parse_args()?;
                        NodeKind::MemberCall {
                            operand: Box::new(node),
                            name,
                            args,
                        }
                    } else {
                        NodeKind::Select {
                            operand: Box::new(node),
                            field: name,
                            optional,
                        }
                    };
                    node = self.node(kind, start)?;
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let optional = self.match_token(&Token::Question);
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBracket)?;
                    node = self.node(
                        NodeKind::Index {
                            operand: Box::new(node),
                            index: Box::new(index),
                            optional,
                        },
                        start,
                    )?;
                }
                Some(Token::LBrace) => match qualified_name(&node) {
                    Some(name) => {
                        let fields = self.parse_field_inits()?;
                        node = self.node(NodeKind::CreateMessage { name, fields }, start)?;
                    }
                    None => break,
                },
                _ => break,
            }
        }
        Ok(node)
    }

    fn parse_primary(&mut self) -> NodeResult {
        let start = self.peek_span().start;
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected());
        };

        let literal = match token {
            Token::Int(digits) => Literal::Int {
                digits,
                negative: false,
            },
            Token::UInt(digits) => Literal::UInt(digits),
            Token::Double(value) => Literal::Double(value),
            Token::String(s) => Literal::String(s),
            Token::Bytes(b) => Literal::Bytes(b),
            Token::True => Literal::Bool(true),
            Token::False => Literal::Bool(false),
            Token::Null => Literal::Null,
            Token::Ident(name) | Token::Reserved(name) => {
                self.advance();
                return self.parse_ident_or_call(name, false, start);
            }
            Token::Dot => {
                self.advance();
                let name = self.expect_name("identifier")?;
                return self.parse_ident_or_call(name, true, start);
            }
            Token::LParen => {
                self.advance();
                let inner = self.element(&Token::RParen)?;
                self.expect(&Token::RParen)?;
                return self.node(NodeKind::Nested(Box::new(inner)), start);
            }
            Token::LBracket => return self.parse_list(),
            Token::LBrace => return self.parse_map(),
            _ => return Err(self.unexpected()),
        };

        self.advance();
        self.node(NodeKind::Literal(literal), start)
    }

    fn parse_ident_or_call(&mut self, name: String, leading_dot: bool, start: usize) -> NodeResult {
        let kind = if self.check(&Token::LParen) {
            NodeKind::GlobalCall {
                name,
                leading_dot,
                args: self.parse_args()?,
            }
        } else {
            NodeKind::Ident { name, leading_dot }
        };
        self.node(kind, start)
    }

    /// `( expr, expr, ... )` with no trailing comma.
    fn parse_args(&mut self) -> Result<Vec<ParseNode>, SyntaxError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if !self.check(&Token::RParen) {
            args.push(self.element(&Token::RParen)?);
            while self.match_token(&Token::Comma) {
                args.push(self.element(&Token::RParen)?);
            }
        }
        self.expect(&Token::RParen)?;
        Ok(args)
    }

    fn parse_list(&mut self) -> NodeResult {
        let start = self.peek_span().start;
        self.expect(&Token::LBracket)?;
        let mut elements = Vec::new();
        while !self.check(&Token::RBracket) {
            elements.push(self.element(&Token::RBracket)?);
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBracket)?;
        self.node(NodeKind::CreateList(elements), start)
    }

    fn parse_map(&mut self) -> NodeResult {
        let start = self.peek_span().start;
        self.expect(&Token::LBrace)?;
        let mut entries = Vec::new();
        while !self.check(&Token::RBrace) {
            let entry_start = self.peek_span().start;
            let key = self.element(&Token::RBrace)?;
            if key.kind != NodeKind::Error {
                self.expect(&Token::Colon)?;
                let value = self.element(&Token::RBrace)?;
                entries.push(MapEntry {
                    key,
                    value,
                    span: entry_start..self.prev_end(),
                });
            }
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBrace)?;
        self.node(NodeKind::CreateMap(entries), start)
    }

    fn parse_field_inits(&mut self) -> Result<Vec<FieldInit>, SyntaxError> {
        self.expect(&Token::LBrace)?;
        let mut fields = Vec::new();
        while !self.check(&Token::RBrace) {
            let field_start = self.peek_span().start;
            let name = self.expect_name("field name")?;
            self.expect(&Token::Colon)?;
            let value = self.element(&Token::RBrace)?;
            fields.push(FieldInit {
                name,
                value,
                span: field_start..self.prev_end(),
            });
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBrace)?;
        Ok(fields)
    }
}

/// The dotted name spelled by an identifier or a plain select chain, as
/// used in message construction (`a.b.Msg{...}`).
fn qualified_name(node: &ParseNode) -> Option<String> {
    match &node.kind {
        NodeKind::Ident { name, leading_dot } => Some(if *leading_dot {
            format!(".{name}")
        } else {
            name.clone()
        }),
        NodeKind::Select {
            operand,
            field,
            optional: false,
        } => qualified_name(operand).map(|prefix| format!("{prefix}.{field}")),
        _ => None,
    }
}

/// Builds the parse tree for a token stream.
pub fn parse_tokens(tokens: &[SpannedToken], max_depth: usize) -> (ParseNode, Vec<SyntaxError>) {
    Grammar::new(tokens, max_depth).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn tree(input: &str) -> ParseNode {
        let tokens = lex(input).unwrap();
        let (node, errors) = parse_tokens(&tokens, 250);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        node
    }

    fn errors(input: &str) -> Vec<SyntaxError> {
        let tokens = lex(input).unwrap();
        parse_tokens(&tokens, 250).1
    }

    /// Strips the pass-through wrappers every expression carries.
    fn core(node: &ParseNode) -> &ParseNode {
        match &node.kind {
            NodeKind::Expr {
                condition,
                branches: None,
            } => core(condition),
            NodeKind::ConditionalOr(terms) | NodeKind::ConditionalAnd(terms) if terms.len() == 1 => {
                core(&terms[0])
            }
            _ => node,
        }
    }

    #[test]
    fn logical_chains_are_flat() {
        let root = tree("a || b || c && d");
        let NodeKind::Expr { condition, .. } = &root.kind else {
            panic!("expected expr");
        };
        match &condition.kind {
            NodeKind::ConditionalOr(terms) => {
                assert_eq!(terms.len(), 3);
                assert!(matches!(&terms[2].kind, NodeKind::ConditionalAnd(t) if t.len() == 2));
            }
            other => panic!("expected or-chain, got {other:?}"),
        }
    }

    #[test]
    fn relations_fold_left() {
        let root = tree("a < b == c");
        match &core(&root).kind {
            NodeKind::Relation { left, op, .. } => {
                assert_eq!(*op, "==");
                assert!(matches!(left.kind, NodeKind::Relation { op: "<", .. }));
            }
            other => panic!("expected relation, got {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter() {
        let root = tree("1 + 2 * 3");
        match &core(&root).kind {
            NodeKind::Calc { op, right, .. } => {
                assert_eq!(*op, "+");
                assert!(matches!(right.kind, NodeKind::Calc { op: "*", .. }));
            }
            other => panic!("expected calc, got {other:?}"),
        }
    }

    #[test]
    fn lone_minus_folds_into_literal() {
        let root = tree("-1");
        assert_eq!(
            core(&root).kind,
            NodeKind::Literal(Literal::Int {
                digits: "1".into(),
                negative: true
            })
        );
        let root = tree("--1");
        assert!(matches!(&core(&root).kind, NodeKind::Unary { ops, .. } if ops.len() == 2));
    }

    #[test]
    fn unary_runs_are_collected() {
        let root = tree("!!!x");
        match &core(&root).kind {
            NodeKind::Unary { ops, operand } => {
                assert_eq!(ops, &vec!["!", "!", "!"]);
                assert!(matches!(operand.kind, NodeKind::Ident { .. }));
            }
            other => panic!("expected unary, got {other:?}"),
        }
    }

    #[test]
    fn member_forms() {
        assert!(matches!(core(&tree("a.b")).kind, NodeKind::Select { optional: false, .. }));
        assert!(matches!(core(&tree("a.?b")).kind, NodeKind::Select { optional: true, .. }));
        assert!(matches!(core(&tree("a.f(1)")).kind, NodeKind::MemberCall { .. }));
        assert!(matches!(core(&tree("a[?0]")).kind, NodeKind::Index { optional: true, .. }));
        assert!(matches!(
            core(&tree(".f(1, 2)")).kind,
            NodeKind::GlobalCall { leading_dot: true, ref args, .. } if args.len() == 2
        ));
    }

    #[test]
    fn message_literal_takes_dotted_name() {
        match &core(&tree("google.protobuf.Int64Value{value: 1}")).kind {
            NodeKind::CreateMessage { name, fields } => {
                assert_eq!(name, "google.protobuf.Int64Value");
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].name, "value");
            }
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn trailing_commas_in_literals() {
        assert!(matches!(core(&tree("[1, 2,]")).kind, NodeKind::CreateList(ref e) if e.len() == 2));
        assert!(matches!(core(&tree("{'a': 1,}")).kind, NodeKind::CreateMap(ref e) if e.len() == 1));
    }

    #[test]
    fn ternary_has_branches() {
        let root = tree("a ? b : c ? d : e");
        let NodeKind::Expr { branches: Some((_, otherwise)), .. } = &root.kind else {
            panic!("expected conditional");
        };
        assert!(matches!(otherwise.kind, NodeKind::Expr { branches: Some(_), .. }));
    }

    #[test]
    fn leftover_tokens_are_reported() {
        let errs = errors("1 2");
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("unexpected tokens after expression"));
    }

    #[test]
    fn errors_recover_at_commas() {
        let errs = errors("[1 +, 2 *]");
        assert_eq!(errs.len(), 2, "{errs:?}");
        assert_eq!(errs[0].span, 4..5);
    }

    fn limit_errors(input: &str, max_depth: usize) -> Vec<SyntaxError> {
        let tokens = lex(input).unwrap();
        parse_tokens(&tokens, max_depth).1
    }

    fn nested(open: &str, inner: &str, close: &str, levels: usize) -> String {
        format!("{}{inner}{}", open.repeat(levels), close.repeat(levels))
    }

    fn assert_at_limit(input: &str, max_depth: usize) {
        let errs = limit_errors(input, max_depth);
        assert!(errs.is_empty(), "unexpected errors: {errs:?}");
    }

    fn assert_past_limit(input: &str, max_depth: usize) {
        let errs = limit_errors(input, max_depth);
        assert_eq!(errs.len(), 1, "{errs:?}");
        assert_eq!(
            errs[0].message,
            format!("expression recursion limit exceeded: {max_depth}")
        );
    }

    #[test]
    fn paren_nesting_limit() {
        assert_at_limit(&nested("(", "1", ")", 31), 32);
        assert_past_limit(&nested("(", "1", ")", 32), 32);
    }

    #[test]
    fn list_nesting_limit() {
        assert_at_limit(&nested("[", "1", "]", 31), 32);
        assert_past_limit(&nested("[", "1", "]", 32), 32);
    }

    #[test]
    fn select_chain_limit() {
        assert_at_limit(&format!("a{}", ".b".repeat(31)), 32);
        assert_past_limit(&format!("a{}", ".b".repeat(32)), 32);
    }

    #[test]
    fn operator_chain_limit() {
        let terms = |n: usize| vec!["1"; n].join(" + ");
        assert_at_limit(&terms(32), 32);
        assert_past_limit(&terms(33), 32);
    }

    #[test]
    fn unary_runs_count_each_operator() {
        assert_at_limit(&format!("{}x", "!".repeat(31)), 32);
        assert_past_limit(&format!("{}x", "!".repeat(32)), 32);
        assert_past_limit(&format!("{}x", "-!".repeat(20)), 32);
    }

    #[test]
    fn logical_chains_count_balanced_height() {
        assert_eq!(balanced_levels(1), 0);
        assert_eq!(balanced_levels(2), 1);
        assert_eq!(balanced_levels(6), 3);
        assert_eq!(balanced_levels(8), 3);
        assert_eq!(balanced_levels(9), 4);
        let chain = vec!["a"; 1000].join(" && ");
        assert_at_limit(&chain, 11);
        assert_past_limit(&chain, 10);
    }

    #[test]
    fn deep_input_does_not_exhaust_the_stack() {
        assert_at_limit(&nested("(", "1", ")", 150), 250);
        assert_at_limit(&nested("[", "1", "]", 400), 500);
        assert_past_limit(&format!("a{}", ".b".repeat(5000)), 100);
        assert_past_limit(&vec!["1"; 3000].join(" + "), 100);
    }

    #[test]
    fn heights_skip_wrappers() {
        assert_eq!(tree("1").height, 1);
        assert_eq!(tree("((a))").height, 1);
        assert_eq!(tree("a.b[0]").height, 3);
        assert_eq!(tree("a ? b : c").height, 2);
        assert_eq!(tree("f(a.b, [1])").height, 3);
    }

    #[test]
    fn recursion_limit_is_an_error() {
        let input = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        let tokens = lex(&input).unwrap();
        let (_, errs) = parse_tokens(&tokens, 10);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("recursion limit"));
    }

    #[test]
    fn empty_input_is_an_error() {
        let errs = errors("");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].message, "unexpected end of input");
    }
}
