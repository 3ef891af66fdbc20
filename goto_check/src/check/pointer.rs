// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Verification conditions for pointers: relations across objects, pointer
//! arithmetic overflow, and the validity of dereferences against the lifetime
//! classes the flow-flag oracle reports.

use super::{Condition, GotoCheck};
use crate::config::LanguageMode;
use crate::errors::CheckError;
use crate::guard::Guard;
use goto_program::{Expr, ExprKind, OverflowOp, Type};

impl GotoCheck<'_> {
    /// Ordered comparison of two pointers is only defined within one object.
    pub(super) fn pointer_rel_check(&mut self, expr: &Expr, guard: &Guard) {
        if !self.flags.pointer_check {
            return;
        }

        let [a, b] = expr.operands() else { unreachable!() };
        if a.typ().is_pointer() && b.typ().is_pointer() {
            let same_object = Expr::same_object(a.clone(), b.clone());

            self.add_guarded_property(
                same_object,
                "same object violation",
                "pointer",
                *expr.location(),
                expr,
                guard,
            );
        }
    }

    pub(super) fn pointer_overflow_check(&mut self, expr: &Expr, guard: &Guard) {
        if !self.flags.pointer_overflow_check {
            return;
        }

        let overflow_op = match expr.kind() {
            ExprKind::Plus => OverflowOp::Plus,
            ExprKind::Minus => OverflowOp::Minus,
            _ => return,
        };
        let [a, b] = expr.operands() else {
            unreachable!("pointer arithmetic must have exactly 2 operands: {expr:?}")
        };

        let overflow = Expr::overflow(overflow_op, a.clone(), b.clone());

        self.add_guarded_property(
            overflow.not(),
            &format!(
                "pointer arithmetic overflow on {}",
                expr.kind().operator_name()
            ),
            "overflow",
            *expr.location(),
            expr,
            guard,
        );
    }

    /// Generate the validity conditions for a dereference. `src_expr` is the
    /// expression as found in the program, prior to any rewriting, and is
    /// what the emitted comments show.
    pub(super) fn pointer_validity_check(
        &mut self,
        deref_expr: &Expr,
        src_expr: &Expr,
        guard: &Guard,
    ) {
        if !self.flags.pointer_check {
            return;
        }

        let [pointer] = deref_expr.operands() else { unreachable!() };
        let Some(size) = deref_expr.typ().size_of() else {
            // no compile-time size, nothing to bound against
            return;
        };
        let size = Expr::int_constant(size, Type::size_t());

        for c in self.address_check(pointer, &size) {
            self.add_guarded_property(
                c.assertion,
                &format!("dereference failure: {}", c.description),
                "pointer dereference",
                *src_expr.location(),
                src_expr,
                guard,
            );
        }
    }

    /// The conditions under which reading `size` bytes at `address` is safe,
    /// narrowed by what the flow-flag oracle knows about the pointer. Every
    /// condition is weakened by membership in an explicitly declared
    /// allocation.
    pub(crate) fn address_check(&self, address: &Expr, size: &Expr) -> Vec<Condition> {
        assert!(address.typ().is_pointer(), "address check on {address:?}");

        let flags = self.oracle.get(self.current_target, address);

        // For Java, only null-ness can go wrong.
        if self.mode == LanguageMode::Java {
            if flags.is_unknown() || flags.is_null() {
                let not_eq_null = address
                    .clone()
                    .neq(Expr::null_pointer(address.typ().clone()));
                return vec![Condition {
                    assertion: not_eq_null,
                    description: "reference is null",
                }];
            }
            return vec![];
        }

        let mut conditions = Vec::new();

        let mut alloc_disjuncts = Vec::new();
        for a in self.allocations.iter() {
            let int_ptr = address.clone().cast_to(a.base.typ().clone());
            let lb_check = a.base.clone().le(int_ptr.clone());
            let ub = int_ptr.plus(size.clone().conditional_cast(a.base.typ()));
            let ub_check = ub.le(a.base.clone().plus(a.size.clone()));
            alloc_disjuncts.push(lb_check.and(ub_check));
        }
        let in_bounds_of_some_explicit_allocation = Expr::disjunction(alloc_disjuncts);

        if flags.is_unknown() || flags.is_null() {
            conditions.push(Condition {
                assertion: in_bounds_of_some_explicit_allocation
                    .clone()
                    .or(Expr::is_null_pointer(address.clone()).not()),
                description: "pointer NULL",
            });
        }

        if flags.is_unknown() {
            conditions.push(Condition {
                assertion: Expr::is_invalid_pointer(address.clone()).not(),
                description: "pointer invalid",
            });
        }

        if flags.is_uninitialized() {
            conditions.push(Condition {
                assertion: in_bounds_of_some_explicit_allocation
                    .clone()
                    .or(Expr::is_invalid_pointer(address.clone()).not()),
                description: "pointer uninitialized",
            });
        }

        if flags.is_unknown() || flags.is_dynamic_heap() {
            conditions.push(Condition {
                assertion: in_bounds_of_some_explicit_allocation
                    .clone()
                    .or(Expr::deallocated(address.clone()).not()),
                description: "deallocated dynamic object",
            });
        }

        if flags.is_unknown() || flags.is_dynamic_local() {
            conditions.push(Condition {
                assertion: in_bounds_of_some_explicit_allocation
                    .clone()
                    .or(Expr::dead_object(address.clone()).not()),
                description: "dead object",
            });
        }

        if flags.is_unknown() || flags.is_dynamic_heap() {
            let dynamic_bounds_violation = lower_bound_violation(address).or(
                upper_bound_violation(address, size, Expr::dynamic_size()),
            );

            conditions.push(Condition {
                assertion: in_bounds_of_some_explicit_allocation.clone().or(
                    Expr::malloc_object(address.clone())
                        .implies(dynamic_bounds_violation.not()),
                ),
                description: "pointer outside dynamic object bounds",
            });
        }

        if flags.is_unknown() || flags.is_dynamic_local() || flags.is_static_lifetime() {
            let object_bounds_violation = lower_bound_violation(address).or(
                upper_bound_violation(address, size, Expr::object_size(address.clone())),
            );

            conditions.push(Condition {
                assertion: in_bounds_of_some_explicit_allocation.clone().or(
                    Expr::dynamic_object(address.clone())
                        .not()
                        .implies(object_bounds_violation.not()),
                ),
                description: "pointer outside object bounds",
            });
        }

        if flags.is_unknown() || flags.is_integer_address() {
            conditions.push(Condition {
                assertion: Expr::integer_address(address.clone())
                    .implies(in_bounds_of_some_explicit_allocation),
                description: "invalid integer address",
            });
        }

        conditions
    }

    /// Rewrite `s->member` into `*(char*)s + offset` before checking, so only
    /// the member's own footprint needs to be valid rather than the whole
    /// struct. Returns whether the member expression is fully handled.
    pub(super) fn check_rec_member(
        &mut self,
        member: &Expr,
        guard: &mut Guard,
    ) -> Result<bool, CheckError> {
        let ExprKind::Member { component } = member.kind() else { unreachable!() };
        let deref = &member.operands()[0];
        let pointer = &deref.operands()[0];

        self.check_rec(pointer, guard)?;

        // the rewritten dereference is only needed by the pointer checks
        if !self.flags.pointer_check {
            return Ok(true);
        }

        let Some(member_offset) = deref.typ().member_offset(*component) else {
            return Ok(false);
        };

        let new_pointer_type = member.typ().clone().to_pointer();
        let char_pointer = pointer
            .clone()
            .conditional_cast(&Type::c_char().to_pointer());
        let new_address = char_pointer
            .plus(Expr::int_constant(member_offset, Type::ssize_t()));
        let new_deref = new_address
            .conditional_cast(&new_pointer_type)
            .dereference()
            .with_location(*deref.location());

        self.pointer_validity_check(&new_deref, member, guard);
        Ok(true)
    }
}

fn lower_bound_violation(address: &Expr) -> Expr {
    Expr::pointer_offset(address.clone()).lt(Expr::zero(Type::ssize_t()))
}

fn upper_bound_violation(address: &Expr, size: &Expr, object_size: Expr) -> Expr {
    Expr::pointer_offset(address.clone())
        .plus(size.clone().conditional_cast(&Type::ssize_t()))
        .gt(object_size.conditional_cast(&Type::ssize_t()))
}
