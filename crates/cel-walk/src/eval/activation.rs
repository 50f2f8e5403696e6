//! Variable and function bindings for CEL evaluation.
//!
//! An [`Activation`] resolves the names an expression refers to. Caller
//! bindings live in a [`MapActivation`]; comprehensions push a
//! [`HierarchicalActivation`] frame per iteration so loop variables shadow
//! outer names without mutating them.

use std::collections::HashMap;
use std::sync::Arc;

use super::{EvalError, FunctionImpl, Value};

/// Resolves variable and function names during evaluation.
pub trait Activation: Send + Sync {
    /// Returns `None` if the variable is not bound here.
    fn resolve(&self, name: &str) -> Option<Value>;

    /// Caller-supplied function bound under `name`. These shadow the
    /// builtins of the program's registry.
    fn resolve_function(&self, _name: &str) -> Option<FunctionImpl> {
        None
    }
}

/// Bindings backed by hash maps.
#[derive(Clone, Default)]
pub struct MapActivation {
    bindings: HashMap<String, Value>,
    functions: HashMap<String, FunctionImpl>,
}

impl MapActivation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Binds a function, replacing any builtin of the same name.
    pub fn insert_function<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.remove(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl std::fmt::Debug for MapActivation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapActivation")
            .field("bindings", &self.bindings)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for MapActivation {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut activation = Self::new();
        for (name, value) in iter {
            activation.insert(name, value);
        }
        activation
    }
}

impl Activation for MapActivation {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).cloned()
    }

    fn resolve_function(&self, name: &str) -> Option<FunctionImpl> {
        self.functions.get(name).cloned()
    }
}

/// A scope that falls back to its parent for names it does not bind.
pub struct HierarchicalActivation<'a> {
    parent: &'a dyn Activation,
    local: HashMap<String, Value>,
}

impl<'a> HierarchicalActivation<'a> {
    pub fn new(parent: &'a dyn Activation) -> Self {
        Self {
            parent,
            local: HashMap::new(),
        }
    }

    pub fn with_binding(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.local.insert(name.into(), value.into());
        self
    }
}

impl Activation for HierarchicalActivation<'_> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.local
            .get(name)
            .cloned()
            .or_else(|| self.parent.resolve(name))
    }

    fn resolve_function(&self, name: &str) -> Option<FunctionImpl> {
        self.parent.resolve_function(name)
    }
}

/// No bindings at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyActivation;

impl Activation for EmptyActivation {
    fn resolve(&self, _name: &str) -> Option<Value> {
        None
    }
}

impl<T: Activation + ?Sized> Activation for &T {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }

    fn resolve_function(&self, name: &str) -> Option<FunctionImpl> {
        (**self).resolve_function(name)
    }
}

impl<T: Activation + ?Sized> Activation for Arc<T> {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }

    fn resolve_function(&self, name: &str) -> Option<FunctionImpl> {
        (**self).resolve_function(name)
    }
}

impl<T: Activation + ?Sized> Activation for Box<T> {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }

    fn resolve_function(&self, name: &str) -> Option<FunctionImpl> {
        (**self).resolve_function(name)
    }
}
