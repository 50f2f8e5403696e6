//! Rebalancing of associative operator chains.
//!
//! `a || b || c || d` arrives from the grammar as a flat list of terms.
//! Folding it left would give a tree as deep as the chain is long; the
//! balancer instead splits the operator list at its midpoint recursively,
//! keeping operand order and the ids the caller allocated.

use crate::ast::Expr;

#[derive(Debug)]
pub struct ExprBalancer {
    function: String,
    terms: Vec<Expr>,
    ops: Vec<u64>,
}

impl ExprBalancer {
    pub fn new(function: impl Into<String>, first: Expr) -> Self {
        Self {
            function: function.into(),
            terms: vec![first],
            ops: Vec::new(),
        }
    }

    /// Appends `term` joined by an operator node with id `op_id`.
    pub fn add(&mut self, op_id: u64, term: Expr) {
        self.ops.push(op_id);
        self.terms.push(term);
    }

    pub fn balance(mut self) -> Expr {
        if self.ops.is_empty() {
            // `terms` always holds the first term.
            return self.terms.swap_remove(0);
        }
        let mut terms: Vec<Option<Expr>> = self.terms.into_iter().map(Some).collect();
        balanced_tree(&self.function, &self.ops, &mut terms, 0, self.ops.len() - 1)
    }
}

/// Builds the subtree over `ops[lo..=hi]` and the terms `lo..=hi+1`.
fn balanced_tree(
    function: &str,
    ops: &[u64],
    terms: &mut [Option<Expr>],
    lo: usize,
    hi: usize,
) -> Expr {
    let mid = (lo + hi + 1) / 2;

    let left = if mid == lo {
        take(terms, mid)
    } else {
        balanced_tree(function, ops, terms, lo, mid - 1)
    };
    let right = if mid == hi {
        take(terms, mid + 1)
    } else {
        balanced_tree(function, ops, terms, mid + 1, hi)
    };

    Expr::call(ops[mid], function, vec![left, right])
}

/// Each term is consumed exactly once by construction.
fn take(terms: &mut [Option<Expr>], index: usize) -> Expr {
    terms[index].take().unwrap_or_else(|| Expr::error(0))
}
