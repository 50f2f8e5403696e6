//! Parse-time macros.
//!
//! A macro is a call shape (`has(m.f)`, `xs.all(x, p)`, ...) that the
//! builder rewrites before any evaluation happens. `has` becomes a
//! presence-testing select; the iterating macros become
//! [`ExprKind::Comprehension`] folds over an accumulator named
//! [`ACCU_VAR`].
//!
//! Macros are keyed by `name:arg_count:is_receiver` (e.g. `"all:2:true"`),
//! so the two forms of `map` are separate entries. Lookup tries the exact
//! key first, then a var-arg key.
//!
//! Node ids inside an expansion are drawn from the same [`IdAllocator`]
//! as the surrounding parse: accumulator init, loop condition, loop step
//! and result in that order, and the comprehension itself last.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::ast::{Constant, Expr, ExprKind, IdAllocator};
use crate::operators::Operator;

/// Name of the accumulator variable introduced by folds.
pub const ACCU_VAR: &str = "__result__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroStyle {
    /// `name(args...)`
    Global,
    /// `receiver.name(args...)`
    Receiver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgCount {
    Exact(usize),
    /// At least this many arguments.
    VarArg(usize),
}

impl ArgCount {
    pub fn matches(&self, count: usize) -> bool {
        match self {
            ArgCount::Exact(n) => count == *n,
            ArgCount::VarArg(min) => count >= *min,
        }
    }

    pub fn count(&self) -> usize {
        match self {
            ArgCount::Exact(n) | ArgCount::VarArg(n) => *n,
        }
    }

    pub fn is_vararg(&self) -> bool {
        matches!(self, ArgCount::VarArg(_))
    }
}

/// A macro whose signature matched but whose arguments did not fit.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct MacroError {
    pub message: String,
}

impl MacroError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Node factory handed to expanders.
pub struct MacroContext<'a> {
    ids: &'a mut IdAllocator,
}

impl<'a> MacroContext<'a> {
    pub fn new(ids: &'a mut IdAllocator) -> Self {
        Self { ids }
    }

    pub fn next_id(&mut self) -> u64 {
        self.ids.next_id()
    }

    pub fn ident(&mut self, name: &str) -> Expr {
        Expr::ident(self.next_id(), name)
    }

    pub fn accu(&mut self) -> Expr {
        self.ident(ACCU_VAR)
    }

    pub fn literal(&mut self, value: Constant) -> Expr {
        Expr::constant(self.next_id(), value)
    }

    pub fn call(&mut self, op: Operator, args: Vec<Expr>) -> Expr {
        Expr::call(self.next_id(), op.symbol(), args)
    }

    pub fn list(&mut self, elements: Vec<Expr>) -> Expr {
        Expr::new(self.next_id(), ExprKind::CreateList(elements))
    }

    /// `accu + [element]`
    fn append(&mut self, element: Expr) -> Expr {
        let accu = self.accu();
        let list = self.list(vec![element]);
        self.call(Operator::Add, vec![accu, list])
    }

    /// `condition ? then : accu`
    fn keep_if(&mut self, condition: Expr, then: Expr) -> Expr {
        let accu = self.accu();
        self.call(Operator::Conditional, vec![condition, then, accu])
    }

    fn fold(
        &mut self,
        iter_var: String,
        iter_range: Expr,
        accu_init: Expr,
        loop_condition: Expr,
        loop_step: Expr,
        result: Expr,
    ) -> Expr {
        Expr::new(
            self.next_id(),
            ExprKind::Comprehension {
                iter_var,
                iter_range: Box::new(iter_range),
                accu_var: ACCU_VAR.to_string(),
                accu_init: Box::new(accu_init),
                loop_condition: Box::new(loop_condition),
                loop_step: Box::new(loop_step),
                result: Box::new(result),
            },
        )
    }
}

/// Expansion function: receives the receiver (for receiver-style macros)
/// and the already-built arguments.
pub type MacroExpander =
    fn(ctx: &mut MacroContext<'_>, target: Option<Expr>, args: Vec<Expr>) -> Result<Expr, MacroError>;

#[derive(Clone)]
pub struct Macro {
    pub name: &'static str,
    pub style: MacroStyle,
    pub arg_count: ArgCount,
    pub expander: MacroExpander,
}

impl Macro {
    pub const fn new(
        name: &'static str,
        style: MacroStyle,
        arg_count: ArgCount,
        expander: MacroExpander,
    ) -> Self {
        Self {
            name,
            style,
            arg_count,
            expander,
        }
    }

    pub fn key(&self) -> String {
        make_key(self.name, self.arg_count.count(), self.style == MacroStyle::Receiver)
    }

    pub fn expand(
        &self,
        ctx: &mut MacroContext<'_>,
        target: Option<Expr>,
        args: Vec<Expr>,
    ) -> Result<Expr, MacroError> {
        (self.expander)(ctx, target, args)
    }
}

impl std::fmt::Debug for Macro {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Macro")
            .field("name", &self.name)
            .field("style", &self.style)
            .field("arg_count", &self.arg_count)
            .finish_non_exhaustive()
    }
}

fn make_key(name: &str, arg_count: usize, is_receiver: bool) -> String {
    format!("{name}:{arg_count}:{is_receiver}")
}

#[derive(Debug, Clone, Default)]
pub struct MacroRegistry {
    macros: HashMap<String, Macro>,
    /// `name:is_receiver` to minimum arity, for var-arg fallback.
    vararg_keys: HashMap<String, usize>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `has`, `all`, `exists`, `exists_one`, `map` (both forms) and `filter`.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for macro_def in standard_macros() {
            registry.register(macro_def);
        }
        registry
    }

    /// The shared standard registry, built once.
    pub fn standard_ref() -> &'static MacroRegistry {
        static REGISTRY: OnceLock<MacroRegistry> = OnceLock::new();
        REGISTRY.get_or_init(MacroRegistry::standard)
    }

    pub fn register(&mut self, macro_def: Macro) {
        if macro_def.arg_count.is_vararg() {
            let vararg_key = format!("{}:{}", macro_def.name, macro_def.style == MacroStyle::Receiver);
            self.vararg_keys.insert(vararg_key, macro_def.arg_count.count());
        }
        self.macros.insert(macro_def.key(), macro_def);
    }

    pub fn lookup(&self, name: &str, arg_count: usize, is_receiver: bool) -> Option<&Macro> {
        if let Some(m) = self.macros.get(&make_key(name, arg_count, is_receiver)) {
            return Some(m);
        }
        let min_args = *self.vararg_keys.get(&format!("{name}:{is_receiver}"))?;
        if arg_count >= min_args {
            self.macros.get(&make_key(name, min_args, is_receiver))
        } else {
            None
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.values().any(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

fn standard_macros() -> [Macro; 7] {
    use ArgCount::Exact;
    use MacroStyle::{Global, Receiver};
    [
        Macro::new("has", Global, Exact(1), expand_has),
        Macro::new("all", Receiver, Exact(2), expand_all),
        Macro::new("exists", Receiver, Exact(2), expand_exists),
        Macro::new("exists_one", Receiver, Exact(2), expand_exists_one),
        Macro::new("map", Receiver, Exact(2), expand_map),
        // xs.map(x, filter, transform)
        Macro::new("map", Receiver, Exact(3), expand_filter_map),
        Macro::new("filter", Receiver, Exact(2), expand_filter),
    ]
}

/// Expands the standard macro `op` directly, bypassing registry lookup.
/// `Map` picks the filtering form when given three arguments.
pub fn expand_macro(
    ctx: &mut MacroContext<'_>,
    op: Operator,
    target: Option<Expr>,
    args: Vec<Expr>,
) -> Result<Expr, MacroError> {
    let expander: MacroExpander = match op {
        Operator::Has => expand_has,
        Operator::All => expand_all,
        Operator::Exists => expand_exists,
        Operator::ExistsOne => expand_exists_one,
        Operator::Map if args.len() == 3 => expand_filter_map,
        Operator::Map => expand_map,
        Operator::Filter => expand_filter,
        other => return Err(MacroError::new(format!("'{}' is not a macro", other.symbol()))),
    };
    expander(ctx, target, args)
}

// === Expanders ===

/// `has(m.f)` becomes a test-only select of `f` on `m`, keeping the id of
/// the select it replaces.
fn expand_has(
    _ctx: &mut MacroContext<'_>,
    _target: Option<Expr>,
    args: Vec<Expr>,
) -> Result<Expr, MacroError> {
    let [arg]: [Expr; 1] = args
        .try_into()
        .map_err(|_| MacroError::new("has() takes exactly one argument"))?;
    match arg.kind {
        ExprKind::Select {
            operand,
            field,
            test_only: false,
        } => Ok(Expr::new(
            arg.id,
            ExprKind::Select {
                operand,
                field,
                test_only: true,
            },
        )),
        _ => Err(MacroError::new("invalid argument to has() macro")),
    }
}

/// Splits the receiver and the `(var, body...)` arguments of an iterating
/// macro.
fn iteration<const N: usize>(
    name: &str,
    target: Option<Expr>,
    args: Vec<Expr>,
) -> Result<(Expr, String, [Expr; N]), MacroError> {
    let range = target.ok_or_else(|| MacroError::new(format!("{name}() requires a receiver")))?;
    let mut args = args.into_iter();
    let var = args
        .next()
        .ok_or_else(|| MacroError::new(format!("{name}() requires an iteration variable")))?;
    let iter_var = match var.kind {
        ExprKind::Ident(name) => name,
        _ => return Err(MacroError::new("argument must be a simple name")),
    };
    let body: [Expr; N] = args
        .collect::<Vec<_>>()
        .try_into()
        .map_err(|_| MacroError::new(format!("{name}() has the wrong number of arguments")))?;
    Ok((range, iter_var, body))
}

fn expand_all(
    ctx: &mut MacroContext<'_>,
    target: Option<Expr>,
    args: Vec<Expr>,
) -> Result<Expr, MacroError> {
    let (range, iter_var, [predicate]) = iteration::<1>("all", target, args)?;

    let init = ctx.literal(Constant::Bool(true));
    let accu = ctx.accu();
    let condition = ctx.call(Operator::NotStrictlyFalse, vec![accu]);
    let accu = ctx.accu();
    let step = ctx.call(Operator::LogicalAnd, vec![accu, predicate]);
    let result = ctx.accu();
    Ok(ctx.fold(iter_var, range, init, condition, step, result))
}

fn expand_exists(
    ctx: &mut MacroContext<'_>,
    target: Option<Expr>,
    args: Vec<Expr>,
) -> Result<Expr, MacroError> {
    let (range, iter_var, [predicate]) = iteration::<1>("exists", target, args)?;

    let init = ctx.literal(Constant::Bool(false));
    let accu = ctx.accu();
    let not_accu = ctx.call(Operator::LogicalNot, vec![accu]);
    let condition = ctx.call(Operator::NotStrictlyFalse, vec![not_accu]);
    let accu = ctx.accu();
    let step = ctx.call(Operator::LogicalOr, vec![accu, predicate]);
    let result = ctx.accu();
    Ok(ctx.fold(iter_var, range, init, condition, step, result))
}

fn expand_exists_one(
    ctx: &mut MacroContext<'_>,
    target: Option<Expr>,
    args: Vec<Expr>,
) -> Result<Expr, MacroError> {
    let (range, iter_var, [predicate]) = iteration::<1>("exists_one", target, args)?;

    let init = ctx.literal(Constant::Int(0));
    let condition = ctx.literal(Constant::Bool(true));
    let accu = ctx.accu();
    let one = ctx.literal(Constant::Int(1));
    let increment = ctx.call(Operator::Add, vec![accu, one]);
    let step = ctx.keep_if(predicate, increment);
    let accu = ctx.accu();
    let one = ctx.literal(Constant::Int(1));
    let result = ctx.call(Operator::Equals, vec![accu, one]);
    Ok(ctx.fold(iter_var, range, init, condition, step, result))
}

fn expand_map(
    ctx: &mut MacroContext<'_>,
    target: Option<Expr>,
    args: Vec<Expr>,
) -> Result<Expr, MacroError> {
    let (range, iter_var, [transform]) = iteration::<1>("map", target, args)?;

    let init = ctx.list(Vec::new());
    let condition = ctx.literal(Constant::Bool(true));
    let step = ctx.append(transform);
    let result = ctx.accu();
    Ok(ctx.fold(iter_var, range, init, condition, step, result))
}

/// `xs.map(x, filter, transform)`
fn expand_filter_map(
    ctx: &mut MacroContext<'_>,
    target: Option<Expr>,
    args: Vec<Expr>,
) -> Result<Expr, MacroError> {
    let (range, iter_var, [filter, transform]) = iteration::<2>("map", target, args)?;

    let init = ctx.list(Vec::new());
    let condition = ctx.literal(Constant::Bool(true));
    let appended = ctx.append(transform);
    let step = ctx.keep_if(filter, appended);
    let result = ctx.accu();
    Ok(ctx.fold(iter_var, range, init, condition, step, result))
}

fn expand_filter(
    ctx: &mut MacroContext<'_>,
    target: Option<Expr>,
    args: Vec<Expr>,
) -> Result<Expr, MacroError> {
    let (range, iter_var, [predicate]) = iteration::<1>("filter", target, args)?;

    let init = ctx.list(Vec::new());
    let condition = ctx.literal(Constant::Bool(true));
    let accu = ctx.accu();
    let element = ctx.ident(&iter_var);
    let list = ctx.list(vec![element]);
    let appended = ctx.call(Operator::Add, vec![accu, list]);
    let step = ctx.keep_if(predicate, appended);
    let result = ctx.accu();
    Ok(ctx.fold(iter_var, range, init, condition, step, result))
}
