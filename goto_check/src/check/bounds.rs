// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Array bounds verification conditions. The lower bound is checked on the
//! accumulated byte offset of the whole access path, the upper bound against
//! the compile-time size where one exists and against the run-time object
//! size where the array lives behind a pointer.

use super::GotoCheck;
use crate::errors::CheckError;
use crate::guard::Guard;
use goto_program::printer::array_name;
use goto_program::{Expr, ExprKind, ObjectDescriptor, Type};
use num::bigint::BigInt;

impl GotoCheck<'_> {
    pub(super) fn bounds_check(
        &mut self,
        expr: &Expr,
        guard: &Guard,
    ) -> Result<(), CheckError> {
        if !self.flags.bounds_check {
            return Ok(());
        }
        if expr.bounds_check_flag() == Some(false) {
            return Ok(());
        }

        let [array, index] = expr.operands() else { unreachable!() };
        let array_type = array.typ();

        if array_type.is_pointer() {
            return Err(CheckError::IndexOfPointer { expr: expr.to_string() });
        }
        if !array_type.is_array() && !array_type.is_vector() {
            return Err(CheckError::BoundsCheckBadType {
                typ: array_type.to_string(),
                expr: expr.to_string(),
            });
        }

        let name = array_name(array);
        let ode = ObjectDescriptor::build(expr);

        self.bounds_check_lower(expr, index, &ode, &name, guard);

        let mut type_matches_size = Expr::bool_true();

        if let ExprKind::Dereference = ode.root_object().kind() {
            type_matches_size =
                self.bounds_check_dynamic_upper(expr, &ode, &name, guard);
        }

        let size = array_type.array_size().unwrap();

        if size.is_nil() {
            // linking did not complete, we don't have a size
        } else if size.is_infinity() {
        } else if size.is_zero() && matches!(array.kind(), ExprKind::Member { .. }) {
            // a flexible array member: as large as the enclosing object
            // allows, so bound the byte offset by the object size instead
            let Some(type_size) = ode.root_object().typ().size_of() else {
                return Ok(());
            };
            let inequality = ode
                .offset()
                .clone()
                .lt(Expr::int_constant(type_size, Type::ssize_t()));

            self.add_guarded_property(
                type_matches_size.implies(inequality),
                &format!("{name} upper bound"),
                "array bounds",
                *expr.location(),
                expr,
                guard,
            );
        } else {
            let inequality = index
                .clone()
                .lt(size.clone().conditional_cast(index.typ()));

            self.add_guarded_property(
                type_matches_size.implies(inequality),
                &format!("{name} upper bound"),
                "array bounds",
                *expr.location(),
                expr,
                guard,
            );
        }
        Ok(())
    }

    /// The final byte offset of the access must not be negative. Skipped for
    /// indices that cannot be negative.
    fn bounds_check_lower(
        &mut self,
        expr: &Expr,
        index: &Expr,
        ode: &ObjectDescriptor,
        name: &str,
        guard: &Guard,
    ) {
        if index.typ().is_unsigned() {
            return;
        }
        // we undo typecasts from unsigned
        if matches!(index.kind(), ExprKind::Typecast)
            && index.operands()[0].typ().is_unsigned()
        {
            return;
        }
        if let Some(i) = index.int_constant_value() {
            if i >= BigInt::from(0) {
                return;
            }
        }

        let mut effective_offset = ode.offset().clone();
        if let ExprKind::Dereference = ode.root_object().kind() {
            let pointer = &ode.root_object().operands()[0];
            let p_offset = Expr::pointer_offset(pointer.clone());
            assert_eq!(p_offset.typ(), effective_offset.typ());
            effective_offset = p_offset.plus(effective_offset);
        }

        let zero = Expr::zero(effective_offset.typ().clone());

        self.add_guarded_property(
            effective_offset.ge(zero),
            &format!("{name} lower bound"),
            "array bounds",
            *expr.location(),
            expr,
            guard,
        );
    }

    /// Bound the access against the run-time size of the pointed-to object,
    /// and build the predicate reconciling compile-time and run-time sizes
    /// that the static upper-bound check is conditioned on.
    fn bounds_check_dynamic_upper(
        &mut self,
        expr: &Expr,
        ode: &ObjectDescriptor,
        name: &str,
        guard: &Guard,
    ) -> Expr {
        let pointer = &ode.root_object().operands()[0];

        let size = Expr::if_then_else(
            Expr::dynamic_object(pointer.clone()),
            Expr::dynamic_size(),
            Expr::object_size(pointer.clone()),
        );

        let effective_offset = ode
            .offset()
            .clone()
            .plus(Expr::pointer_offset(pointer.clone()));
        let size_casted = size.conditional_cast(effective_offset.typ());
        let inequality = effective_offset.lt(size_casted);

        let mut alloc_disjuncts = Vec::new();
        for a in self.allocations.iter() {
            let int_ptr = pointer.clone().cast_to(a.base.typ().clone());
            let lower_bound_check = a.base.clone().le(int_ptr.clone());
            let upper_bound =
                int_ptr.plus(ode.offset().clone().conditional_cast(a.base.typ()));
            let upper_bound_check =
                upper_bound.lt(a.base.clone().plus(a.size.clone()));
            alloc_disjuncts.push(lower_bound_check.and(upper_bound_check));
        }
        let in_bounds_of_some_explicit_allocation = Expr::disjunction(alloc_disjuncts);

        let precond = Expr::disjunction(vec![
            in_bounds_of_some_explicit_allocation,
            Expr::dynamic_object(pointer.clone())
                .and(Expr::malloc_object(pointer.clone()).not()),
            inequality,
        ]);

        self.add_guarded_property(
            precond,
            &format!("{name} dynamic object upper bound"),
            "array bounds",
            *expr.location(),
            expr,
            guard,
        );

        // sizeof agrees with the run-time size: for a heap object the
        // run-time size query is only meaningful underneath malloc_object
        match ode.root_object().typ().size_of() {
            Some(type_size) => {
                let type_size = Expr::int_constant(type_size, Type::size_t());
                Expr::if_then_else(
                    Expr::dynamic_object(pointer.clone()),
                    Expr::malloc_object(pointer.clone())
                        .and(Expr::dynamic_size().eq(type_size.clone())),
                    Expr::object_size(pointer.clone()).eq(type_size),
                )
            }
            None => Expr::bool_true(),
        }
    }
}
