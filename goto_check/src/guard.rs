// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use goto_program::{Expr, ExprKind};

/// The path condition accumulated while walking an expression.
///
/// Conjuncts are only ever appended; a branch of the walk takes a
/// `savepoint` before extending the guard and restores it afterwards, so
/// conditions never leak across sibling branches.
#[derive(Clone, Debug, Default)]
pub struct Guard {
    conjuncts: Vec<Expr>,
}

/// A point in the guard to roll back to.
#[derive(Copy, Clone, Debug)]
pub struct Savepoint(usize);

impl Guard {
    pub fn new() -> Guard {
        Guard::default()
    }

    /// Conjoin `condition`. Trivially-true conjuncts are dropped and
    /// conjunctions are flattened.
    pub fn push(&mut self, condition: Expr) {
        assert!(condition.typ().is_bool());
        if condition.is_true() {
            return;
        }
        if let ExprKind::And = condition.kind() {
            for op in condition.operands() {
                self.push(op.clone());
            }
            return;
        }
        self.conjuncts.push(condition);
    }

    pub fn savepoint(&self) -> Savepoint {
        Savepoint(self.conjuncts.len())
    }

    pub fn restore(&mut self, savepoint: Savepoint) {
        assert!(savepoint.0 <= self.conjuncts.len());
        self.conjuncts.truncate(savepoint.0);
    }

    pub fn is_true(&self) -> bool {
        self.conjuncts.is_empty()
    }

    /// The conjunction of all conditions pushed so far.
    pub fn as_expr(&self) -> Expr {
        Expr::conjunction(self.conjuncts.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::Guard;
    use goto_program::{Expr, Type};

    #[test]
    fn savepoints_roll_back() {
        let a = Expr::symbol("a", Type::bool());
        let b = Expr::symbol("b", Type::bool());

        let mut guard = Guard::new();
        assert!(guard.is_true());
        assert!(guard.as_expr().is_true());

        guard.push(a.clone());
        let savepoint = guard.savepoint();
        guard.push(b.clone());
        assert_eq!(guard.as_expr(), a.clone().and(b));

        guard.restore(savepoint);
        assert_eq!(guard.as_expr(), a);
    }

    #[test]
    fn trivial_conjuncts_are_dropped() {
        let mut guard = Guard::new();
        guard.push(Expr::bool_true());
        assert!(guard.is_true());

        let a = Expr::symbol("a", Type::bool());
        let b = Expr::symbol("b", Type::bool());
        guard.push(a.clone().and(b.clone()));
        assert_eq!(guard.as_expr(), a.and(b));
    }
}
