//! Tree-walking evaluator for CEL expressions.
//!
//! The evaluator is a recursive match over [`ExprKind`]. Every node yields a
//! `Result<Value, EvalError>`; the first place an error arises records it in
//! the evaluation's [`ErrorSet`], and callers further up only forward it with
//! `?`. That keeps each root cause in the set exactly once, including errors
//! that `&&` and `||` later absorb.
//!
//! Operands of a call and the parts of a list, map or message literal are
//! all evaluated before the first failure is returned, so each failing
//! operand contributes its own status.
//!
//! `_&&_`, `_||_`, `_?_:_` and `@not_strictly_false` are evaluated here
//! rather than through the registry since they must see operand errors
//! instead of short-circuiting on them.

use std::sync::Arc;

use cel_walk_parser::{Constant, Entry, EntryKey, ErrorSet, Expr, ExprKind, Operator};
use tracing::{debug, trace};

use super::{
    Activation, Builtin, EvalError, FunctionRegistry, HierarchicalActivation, MapKey, Message,
    TypeRegistry, Value, ValueMap,
};

/// Nesting depth past which evaluation stops with an error.
///
/// Macro expansion makes an AST a few levels taller than its parse tree, so
/// this sits well above the parser's default limit.
pub const DEFAULT_MAX_EVAL_DEPTH: usize = 1000;

/// Remaining stack below which a deeper frame grows a new segment.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 2 * 1024 * 1024;

/// Evaluates one expression tree.
///
/// An evaluator is cheap to build and is meant for a single pass; the
/// errors it records are taken out with [`Evaluator::into_errors`].
pub struct Evaluator<'a> {
    functions: &'a FunctionRegistry,
    types: &'a dyn TypeRegistry,
    container: &'a str,
    errors: ErrorSet,
    depth: usize,
    max_depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(functions: &'a FunctionRegistry, types: &'a dyn TypeRegistry) -> Self {
        Self {
            functions,
            types,
            container: "",
            errors: ErrorSet::new(),
            depth: 0,
            max_depth: DEFAULT_MAX_EVAL_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the namespace used to qualify identifiers and message names.
    pub fn with_container(mut self, container: &'a str) -> Self {
        self.container = container;
        self
    }

    pub fn errors(&self) -> &ErrorSet {
        &self.errors
    }

    pub fn into_errors(self) -> ErrorSet {
        self.errors
    }

    /// Evaluates `expr` against `activation`.
    pub fn eval(&mut self, expr: &Expr, activation: &dyn Activation) -> Result<Value, EvalError> {
        if self.depth >= self.max_depth {
            return self.raise(EvalError::recursion_limit(self.max_depth));
        }
        self.depth += 1;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.eval_node(expr, activation)
        });
        self.depth -= 1;
        result
    }

    fn eval_node(&mut self, expr: &Expr, activation: &dyn Activation) -> Result<Value, EvalError> {
        match &expr.kind {
            ExprKind::Const(constant) => Ok(constant_value(constant)),
            ExprKind::Ident(name) => self.eval_ident(name, activation),
            ExprKind::Select {
                operand,
                field,
                test_only,
            } => self.eval_select(expr, operand, field, *test_only, activation),
            ExprKind::Call {
                function,
                target,
                args,
            } => self.eval_call(function, target.as_deref(), args, activation),
            ExprKind::CreateList(elements) => {
                let values = self.eval_all(elements, activation)?;
                Ok(Value::list(values))
            }
            ExprKind::CreateStruct {
                message_name,
                entries,
            } => {
                if message_name.is_empty() {
                    self.eval_map(entries, activation)
                } else {
                    self.eval_message(message_name, entries, activation)
                }
            }
            ExprKind::Comprehension {
                iter_var,
                iter_range,
                accu_var,
                accu_init,
                loop_condition,
                loop_step,
                result,
            } => self.eval_comprehension(
                Fold {
                    iter_var,
                    iter_range,
                    accu_var,
                    accu_init,
                    loop_condition,
                    loop_step,
                    result,
                },
                activation,
            ),
        }
    }

    /// Records `err` as a root cause and returns it.
    fn raise<T>(&mut self, err: EvalError) -> Result<T, EvalError> {
        debug!(error = %err, details = ?err.details, "evaluation error");
        self.errors.push(err.to_status());
        Err(err)
    }

    /// Evaluates every expression, even past a failure, and returns the
    /// first error once all have run.
    fn eval_all<'e>(
        &mut self,
        exprs: impl IntoIterator<Item = &'e Expr>,
        activation: &dyn Activation,
    ) -> Result<Vec<Value>, EvalError> {
        let mut values = Vec::new();
        let mut first_error = None;
        for expr in exprs {
            match self.eval(expr, activation) {
                Ok(value) => values.push(value),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(values),
        }
    }

    // ==================== Names ====================

    fn eval_ident(&mut self, name: &str, activation: &dyn Activation) -> Result<Value, EvalError> {
        for candidate in qualified_candidates(self.container, name) {
            if let Some(value) = activation.resolve(&candidate) {
                return Ok(value);
            }
        }
        let bare = name.strip_prefix('.').unwrap_or(name);
        self.raise(EvalError::undeclared_reference(bare, self.container))
    }

    /// Tries `a.b.c` as a single dotted variable before treating it as field
    /// selection on `a`.
    fn resolve_qualified(&self, expr: &Expr, activation: &dyn Activation) -> Option<Value> {
        let name = dotted_name(expr)?;
        qualified_candidates(self.container, &name)
            .into_iter()
            .find_map(|candidate| activation.resolve(&candidate))
    }

    fn eval_select(
        &mut self,
        expr: &Expr,
        operand: &Expr,
        field: &str,
        test_only: bool,
        activation: &dyn Activation,
    ) -> Result<Value, EvalError> {
        if !test_only {
            if let Some(value) = self.resolve_qualified(expr, activation) {
                return Ok(value);
            }
        }

        let value = self.eval(operand, activation)?;
        match &value {
            Value::Map(map) => {
                let key = MapKey::String(Arc::from(field));
                if test_only {
                    return Ok(Value::Bool(map.contains_key(&key)));
                }
                match map.get(&key) {
                    Some(found) => Ok(found.clone()),
                    None => self.raise(EvalError::no_such_key(field)),
                }
            }
            Value::Object(message) => {
                let result = if test_only {
                    message.is_set(field).map(Value::Bool)
                } else {
                    message.get(field)
                };
                result.or_else(|err| self.raise(err))
            }
            other => {
                let function = if test_only { Operator::Has.symbol() } else { "_._" };
                self.raise(EvalError::no_such_overload(function, &[other.kind_name()]))
            }
        }
    }

    // ==================== Calls ====================

    fn eval_call(
        &mut self,
        function: &str,
        target: Option<&Expr>,
        args: &[Expr],
        activation: &dyn Activation,
    ) -> Result<Value, EvalError> {
        if target.is_none() {
            match (Operator::from_symbol(function), args) {
                (Some(Operator::LogicalAnd), [left, right]) => {
                    return self.eval_logical(Builtin::LogicalAnd, left, right, false, activation)
                }
                (Some(Operator::LogicalOr), [left, right]) => {
                    return self.eval_logical(Builtin::LogicalOr, left, right, true, activation)
                }
                (Some(Operator::Conditional), [cond, then, otherwise]) => {
                    return self.eval_conditional(cond, then, otherwise, activation)
                }
                (Some(Operator::NotStrictlyFalse), [arg]) => {
                    let value = self.eval(arg, activation);
                    return Ok(Value::Bool(!matches!(value, Ok(Value::Bool(false)))));
                }
                _ => {}
            }
        }

        let mut name = function.to_string();
        let receiver = match target {
            Some(target) => match self.namespaced_function(target, function, activation) {
                Some(qualified) => {
                    name = qualified;
                    None
                }
                None => Some(target),
            },
            None => None,
        };
        let values = self.eval_all(receiver.into_iter().chain(args), activation)?;
        self.dispatch(&name, &values, activation)
    }

    /// `optional.of(x)` parses as a receiver call on the identifier
    /// `optional`. When that identifier is not a variable and the dotted
    /// name is a registered function, the call is global.
    fn namespaced_function(
        &self,
        target: &Expr,
        function: &str,
        activation: &dyn Activation,
    ) -> Option<String> {
        let namespace = dotted_name(target)?;
        if self.resolve_qualified(target, activation).is_some() {
            return None;
        }
        let qualified = format!("{namespace}.{function}");
        let known = activation.resolve_function(&qualified).is_some()
            || self.functions.contains(&qualified);
        known.then_some(qualified)
    }

    fn dispatch(
        &mut self,
        name: &str,
        args: &[Value],
        activation: &dyn Activation,
    ) -> Result<Value, EvalError> {
        let result = if let Some(function) = activation.resolve_function(name) {
            trace!(function = name, argc = args.len(), "dispatch to bound function");
            function(args)
        } else if let Some(function) = self.functions.get(name) {
            trace!(function = name, argc = args.len(), "dispatch to registry");
            function.call(args)
        } else {
            Err(EvalError::unbound_function(name))
        };
        result.or_else(|err| self.raise(err))
    }

    /// `&&` (`absorbing == false`) and `||` (`absorbing == true`).
    fn eval_logical(
        &mut self,
        builtin: Builtin,
        left: &Expr,
        right: &Expr,
        absorbing: bool,
        activation: &dyn Activation,
    ) -> Result<Value, EvalError> {
        let lhs = self.eval(left, activation);
        if matches!(lhs, Ok(Value::Bool(b)) if b == absorbing) {
            return lhs;
        }
        let rhs = self.eval(right, activation);
        match (lhs, rhs) {
            (_, Ok(Value::Bool(b))) if b == absorbing => Ok(Value::Bool(b)),
            (Err(err), _) | (_, Err(err)) => Err(err),
            (Ok(l), Ok(r)) => builtin.call(&[l, r]).or_else(|err| self.raise(err)),
        }
    }

    fn eval_conditional(
        &mut self,
        cond: &Expr,
        then: &Expr,
        otherwise: &Expr,
        activation: &dyn Activation,
    ) -> Result<Value, EvalError> {
        match self.eval(cond, activation)? {
            Value::Bool(true) => self.eval(then, activation),
            Value::Bool(false) => self.eval(otherwise, activation),
            other => self.raise(EvalError::no_such_overload(
                Operator::Conditional.symbol(),
                &[other.kind_name(), "_", "_"],
            )),
        }
    }

    // ==================== Constructors ====================

    fn eval_map(&mut self, entries: &[Entry], activation: &dyn Activation) -> Result<Value, EvalError> {
        let mut evaluated = Vec::with_capacity(entries.len());
        let mut first_error = None;
        for entry in entries {
            let key = match &entry.key {
                EntryKey::Map(key) => self.eval(key, activation),
                EntryKey::Field(field) => Ok(Value::string(field.as_str())),
            };
            let value = self.eval(&entry.value, activation);
            match (key, value) {
                (Ok(key), Ok(value)) => evaluated.push((key, value)),
                (Err(err), _) | (_, Err(err)) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        let mut map = ValueMap::new();
        for (key, value) in evaluated {
            let Some(map_key) = MapKey::from_value(&key) else {
                return self.raise(EvalError::invalid_argument(format!(
                    "unsupported key type: {}",
                    key.kind_name()
                )));
            };
            if map.contains_key(&map_key) {
                return self.raise(EvalError::invalid_argument(format!(
                    "Failed with repeated key: {map_key}"
                )));
            }
            map.insert(map_key, value);
        }
        Ok(Value::from(map))
    }

    fn eval_message(
        &mut self,
        message_name: &str,
        entries: &[Entry],
        activation: &dyn Activation,
    ) -> Result<Value, EvalError> {
        let descriptor = qualified_candidates(self.container, message_name)
            .into_iter()
            .find_map(|candidate| self.types.find_message(&candidate));
        let Some(descriptor) = descriptor else {
            let bare = message_name.strip_prefix('.').unwrap_or(message_name);
            return self.raise(EvalError::unknown_message(bare));
        };

        let mut fields = Vec::with_capacity(entries.len());
        for entry in entries {
            let EntryKey::Field(field) = &entry.key else {
                return self.raise(EvalError::internal("map key in message literal"));
            };
            fields.push(field);
        }
        let values = self.eval_all(entries.iter().map(|e| &e.value), activation)?;

        let mut message = Message::new(Arc::clone(&descriptor));
        for (field, value) in fields.into_iter().zip(values) {
            if let Err(err) = message.set(field, value) {
                return self.raise(err);
            }
        }

        match descriptor.wrapper_kind() {
            Some(kind) => match message.is_set("value") {
                Ok(true) => {
                    let value = message.get("value")?;
                    kind.unwrap(descriptor.name(), value)
                        .or_else(|err| self.raise(err))
                }
                _ => Ok(kind.default_value()),
            },
            None => Ok(Value::object(message)),
        }
    }

    // ==================== Comprehensions ====================

    fn eval_comprehension(
        &mut self,
        fold: Fold<'_>,
        activation: &dyn Activation,
    ) -> Result<Value, EvalError> {
        let range = self.eval(fold.iter_range, activation)?;
        let items: Vec<Value> = match &range {
            Value::List(list) => list.to_vec(),
            Value::Map(map) => map.keys().map(MapKey::to_value).collect(),
            _ => {
                return self.raise(EvalError::invalid_argument(
                    "iterRange is not a list or map",
                ))
            }
        };

        let mut accu = self.eval(fold.accu_init, activation)?;
        for item in items {
            let scope = HierarchicalActivation::new(activation)
                .with_binding(fold.iter_var, item)
                .with_binding(fold.accu_var, accu.clone());
            match self.eval(fold.loop_condition, &scope)? {
                Value::Bool(false) => break,
                _ => accu = self.eval(fold.loop_step, &scope)?,
            }
        }

        let scope = HierarchicalActivation::new(activation).with_binding(fold.accu_var, accu);
        self.eval(fold.result, &scope)
    }
}

/// Borrowed fields of a comprehension node.
struct Fold<'e> {
    iter_var: &'e str,
    iter_range: &'e Expr,
    accu_var: &'e str,
    accu_init: &'e Expr,
    loop_condition: &'e Expr,
    loop_step: &'e Expr,
    result: &'e Expr,
}

fn constant_value(constant: &Constant) -> Value {
    match constant {
        Constant::Null => Value::Null,
        Constant::Bool(b) => Value::Bool(*b),
        Constant::Int(i) => Value::Int(*i),
        Constant::UInt(u) => Value::UInt(*u),
        Constant::Double(d) => Value::Double(*d),
        Constant::String(s) => Value::string(s.as_str()),
        Constant::Bytes(b) => Value::bytes(b.as_slice()),
    }
}

/// `a.b.c` for a chain of plain selects rooted at an identifier.
fn dotted_name(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Ident(name) => Some(name.clone()),
        ExprKind::Select {
            operand,
            field,
            test_only: false,
        } => dotted_name(operand).map(|prefix| format!("{prefix}.{field}")),
        _ => None,
    }
}

/// Names to try for `name` inside `container`, most qualified first.
///
/// In container `a.b` the name `x` resolves as `a.b.x`, then `a.x`, then `x`.
/// A leading dot makes the name absolute.
pub(crate) fn qualified_candidates(container: &str, name: &str) -> Vec<String> {
    if let Some(absolute) = name.strip_prefix('.') {
        return vec![absolute.to_string()];
    }
    let mut candidates = Vec::new();
    let mut prefix = container;
    while !prefix.is_empty() {
        candidates.push(format!("{prefix}.{name}"));
        prefix = prefix.rsplit_once('.').map_or("", |(head, _)| head);
    }
    candidates.push(name.to_string());
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{EvalErrorKind, MapActivation, MemoryTypeRegistry, MessageType};
    use cel_walk_parser::{parse, Code};

    fn eval_with(source: &str, activation: &MapActivation) -> (Result<Value, EvalError>, ErrorSet) {
        let expr = parse(source).into_result().unwrap();
        let functions = FunctionRegistry::standard();
        let types = MemoryTypeRegistry::new()
            .with_message(MessageType::new("geo.Point").with_field("x").with_field("y"));
        let mut evaluator = Evaluator::new(&functions, &types).with_container("geo");
        let result = evaluator.eval(&expr, activation);
        (result, evaluator.into_errors())
    }

    fn eval(source: &str) -> Result<Value, EvalError> {
        eval_with(source, &MapActivation::new()).0
    }

    #[test]
    fn candidates_walk_up_the_container() {
        assert_eq!(
            qualified_candidates("a.b.c", "x"),
            vec!["a.b.c.x", "a.b.x", "a.x", "x"]
        );
        assert_eq!(qualified_candidates("", "x"), vec!["x"]);
        assert_eq!(qualified_candidates("a.b", ".x"), vec!["x"]);
    }

    #[test]
    fn identifiers_resolve_through_container() {
        let activation = MapActivation::new().with("geo.origin", 0).with("y", 1);
        assert_eq!(eval_with("origin + y", &activation).0, Ok(Value::Int(1)));

        let (result, errors) = eval_with("missing", &activation);
        assert_eq!(
            result.unwrap_err().message,
            "undeclared reference to 'missing' (in container 'geo')"
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn dotted_variables() {
        let activation = MapActivation::new().with("a.b", "dotted");
        assert_eq!(eval_with("a.b", &activation).0, Ok(Value::from("dotted")));
    }

    #[test]
    fn logical_operators_absorb_errors() {
        assert_eq!(eval("false && (1 / 0 == 1)"), Ok(Value::Bool(false)));
        assert_eq!(eval("(1 / 0 == 1) && false"), Ok(Value::Bool(false)));
        assert_eq!(eval("(1 / 0 == 1) || true"), Ok(Value::Bool(true)));
        assert_eq!(eval("true && (1 / 0 == 1)").unwrap_err().message, "divide by zero");
        assert_eq!(eval("1 && true").unwrap_err().message, "no_such_overload");
    }

    #[test]
    fn absorbed_errors_stay_recorded() {
        let (result, errors) = eval_with("(1 / 0 == 1) || true", &MapActivation::new());
        assert_eq!(result, Ok(Value::Bool(true)));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().unwrap().message, "divide by zero");
    }

    #[test]
    fn each_root_cause_is_recorded_once() {
        let (result, errors) = eval_with("[1, 2][5] + 1 == 3", &MapActivation::new());
        assert!(result.is_err());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().unwrap().code, Code::OutOfRange);
    }

    #[test]
    fn every_failing_operand_is_recorded() {
        let (result, errors) = eval_with("(1 / 0) + ('a' % 2)", &MapActivation::new());
        assert_eq!(result.unwrap_err().message, "divide by zero");
        let messages: Vec<_> = errors.iter().map(|s| s.message.as_str()).collect();
        assert_eq!(messages, vec!["divide by zero", "no_such_overload"]);

        let (_, errors) = eval_with("[1 / 0, 'a' % 2]", &MapActivation::new());
        assert_eq!(errors.len(), 2);

        let (_, errors) = eval_with("{'k': 1 / 0, 'j': missing}", &MapActivation::new());
        let messages: Vec<_> = errors.iter().map(|s| s.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["divide by zero", "undeclared reference to 'missing' (in container 'geo')"]
        );

        let (_, errors) = eval_with("Point{x: 1 / 0, y: 'a' % 2}", &MapActivation::new());
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn receiver_and_arguments_are_all_evaluated() {
        let (_, errors) = eval_with("missing.startsWith(1 / 0)", &MapActivation::new());
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn depth_limit_stops_evaluation() {
        let expr = parse("((1 + 1) + 1) + 1").into_result().unwrap();
        let functions = FunctionRegistry::standard();
        let types = MemoryTypeRegistry::new();

        let mut evaluator = Evaluator::new(&functions, &types).with_max_depth(4);
        assert_eq!(evaluator.eval(&expr, &MapActivation::new()), Ok(Value::Int(4)));

        let mut evaluator = Evaluator::new(&functions, &types).with_max_depth(3);
        let err = evaluator.eval(&expr, &MapActivation::new()).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::RecursionLimit);
        assert_eq!(err.message, "expression recursion limit exceeded: 3");
        assert_eq!(evaluator.errors().first().unwrap().code, Code::ResourceExhausted);
    }

    #[test]
    fn deep_hand_built_chains_do_not_overflow() {
        let mut expr = Expr::constant(1, Constant::Int(1));
        for id in 2..5000 {
            expr = Expr::call(id, "_+_", vec![expr, Expr::constant(0, Constant::Int(1))]);
        }
        let functions = FunctionRegistry::standard();
        let types = MemoryTypeRegistry::new();
        let mut evaluator = Evaluator::new(&functions, &types);
        let err = evaluator.eval(&expr, &MapActivation::new()).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::RecursionLimit);

        let mut evaluator = Evaluator::new(&functions, &types).with_max_depth(6000);
        assert_eq!(evaluator.eval(&expr, &MapActivation::new()), Ok(Value::Int(4999)));
        drop_deep(expr);
    }

    /// Takes a left-leaning `_+_` chain apart without recursing.
    fn drop_deep(mut expr: Expr) {
        while let ExprKind::Call { mut args, .. } = expr.kind {
            if args.is_empty() {
                break;
            }
            expr = args.swap_remove(0);
        }
    }

    #[test]
    fn conditional_requires_bool() {
        assert_eq!(eval("true ? 1 : 1 / 0"), Ok(Value::Int(1)));
        assert!(eval("1 ? 2 : 3").is_err());
    }

    #[test]
    fn select_on_maps_and_messages() {
        assert_eq!(eval("{'a': 1}.a"), Ok(Value::Int(1)));
        assert_eq!(eval("{'a': 1}.b").unwrap_err().message, "no such key: b");
        assert_eq!(eval("has({'a': 1}.a)"), Ok(Value::Bool(true)));
        assert_eq!(eval("Point{x: 1}.x"), Ok(Value::Int(1)));
        assert_eq!(eval("Point{x: 1}.y"), Ok(Value::Null));
        assert_eq!(eval("has(Point{x: 1}.y)"), Ok(Value::Bool(false)));
        assert_eq!(eval("Point{x: 1}.z").unwrap_err().message, "unknown field 'z'");
        assert!(eval("(1).a").is_err());
    }

    #[test]
    fn message_construction() {
        assert_eq!(
            eval("Line{}").unwrap_err().message,
            "unknown message type 'Line'"
        );
        assert_eq!(eval("google.protobuf.Int64Value{value: 5}"), Ok(Value::Int(5)));
        assert_eq!(eval("google.protobuf.StringValue{}"), Ok(Value::from("")));
        assert!(eval("google.protobuf.Int32Value{value: 9999999999}").is_err());
    }

    #[test]
    fn map_construction() {
        assert_eq!(
            eval("{1: 'a', 1u: 'b'}").unwrap_err().message,
            "Failed with repeated key: 1u"
        );
        assert!(eval("{[1]: 2}").is_err());
        assert_eq!(eval("{true: 1}[true]"), Ok(Value::Int(1)));
    }

    #[test]
    fn comprehension_scoping() {
        let activation = MapActivation::new().with("x", 100);
        let (result, _) = eval_with("[1, 2].map(x, x * 2) + [x]", &activation);
        assert_eq!(
            result,
            Ok(Value::list(vec![Value::Int(2), Value::Int(4), Value::Int(100)]))
        );
        assert_eq!(eval("[[1], [2, 3]].all(x, x.all(x, x > 0))"), Ok(Value::Bool(true)));
    }

    #[test]
    fn comprehension_over_map_keys() {
        assert_eq!(eval("{'a': 1, 'b': 2}.filter(k, k != 'a')"), Ok(Value::list(vec![Value::from("b")])));
        assert_eq!(
            eval("(1).all(x, true)").unwrap_err().message,
            "iterRange is not a list or map"
        );
    }

    #[test]
    fn erroring_step_propagates() {
        let (result, errors) = eval_with("[1, 'foo', 3].all(e, e % 2 == 1)", &MapActivation::new());
        assert_eq!(result.unwrap_err().message, "no_such_overload");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn bound_functions_shadow_builtins() {
        let mut activation = MapActivation::new();
        activation.insert_function("size", |_: &[Value]| Ok(Value::Int(99)));
        assert_eq!(eval_with("'abc'.size()", &activation).0, Ok(Value::Int(99)));
        assert_eq!(
            eval("nope(1)").unwrap_err().message,
            "unbound function"
        );
    }
}
