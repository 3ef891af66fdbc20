// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Verification conditions for IEEE 754 arithmetic: overflow to infinity and
//! freshly produced NaNs. n-ary sums and products are left-associated into
//! binary chains before checking.

use super::GotoCheck;
use crate::guard::Guard;
use goto_program::{Expr, ExprKind};

impl GotoCheck<'_> {
    pub(super) fn float_overflow_check(&mut self, expr: &Expr, guard: &Guard) {
        if !self.flags.float_overflow_check || !expr.typ().is_float() {
            return;
        }

        match expr.kind() {
            ExprKind::Typecast => {
                let [op] = expr.operands() else { unreachable!() };
                // an already-infinite operand carries its infinity over; a
                // finite one must stay finite
                let overflow_check = if op.typ().is_float() {
                    Expr::isinf(op.clone()).or(Expr::isinf(expr.clone()).not())
                } else {
                    Expr::isinf(expr.clone()).not()
                };

                self.add_guarded_property(
                    overflow_check,
                    "arithmetic overflow on floating-point typecast",
                    "overflow",
                    *expr.location(),
                    expr,
                    guard,
                );
            }

            ExprKind::Div => {
                // can overflow when dividing by something small
                let [dividend, _] = expr.operands() else { unreachable!() };
                let overflow_check =
                    Expr::isinf(dividend.clone()).or(Expr::isinf(expr.clone()).not());

                self.add_guarded_property(
                    overflow_check,
                    "arithmetic overflow on floating-point division",
                    "overflow",
                    *expr.location(),
                    expr,
                    guard,
                );
            }

            // can't overflow
            ExprKind::Mod | ExprKind::UnaryMinus => {}

            ExprKind::Plus | ExprKind::Mult | ExprKind::Minus => {
                if expr.operands().len() >= 3 {
                    assert!(!matches!(expr.kind(), ExprKind::Minus));
                    self.float_overflow_check(&make_binary(expr), guard);
                    return;
                }

                let [a, b] = expr.operands() else { unreachable!() };
                let overflow_check = Expr::disjunction(vec![
                    Expr::isinf(a.clone()),
                    Expr::isinf(b.clone()),
                    Expr::isinf(expr.clone()).not(),
                ]);

                let kind = match expr.kind() {
                    ExprKind::Plus => "addition",
                    ExprKind::Minus => "subtraction",
                    ExprKind::Mult => "multiplication",
                    _ => unreachable!(),
                };

                self.add_guarded_property(
                    overflow_check,
                    &format!("arithmetic overflow on floating-point {kind}"),
                    "overflow",
                    *expr.location(),
                    expr,
                    guard,
                );
            }

            _ => {}
        }
    }

    pub(super) fn nan_check(&mut self, expr: &Expr, guard: &Guard) {
        if !self.flags.nan_check || !expr.typ().is_float() {
            return;
        }
        if !matches!(
            expr.kind(),
            ExprKind::Plus | ExprKind::Mult | ExprKind::Div | ExprKind::Minus
        ) {
            return;
        }
        if expr.operands().len() >= 3 {
            return self.nan_check(&make_binary(expr), guard);
        }

        let [a, b] = expr.operands() else { unreachable!() };
        let typ = expr.typ().clone();

        let isnan = match expr.kind() {
            ExprKind::Div => {
                // two ways to get a fresh NaN out of a division:
                // 0/0 and x/inf (note x/0 is +-inf for nonzero finite x)
                let zero_div_zero = a
                    .clone()
                    .ieee_float_equal(Expr::float_zero(typ.clone()))
                    .and(b.clone().ieee_float_equal(Expr::float_zero(typ)));
                let div_inf = Expr::isinf(b.clone());
                zero_div_zero.or(div_inf)
            }
            ExprKind::Mult => {
                // inf * 0 and 0 * inf
                let inf_times_zero = Expr::isinf(a.clone())
                    .and(b.clone().ieee_float_equal(Expr::float_zero(typ.clone())));
                let zero_times_inf = a
                    .clone()
                    .ieee_float_equal(Expr::float_zero(typ))
                    .and(Expr::isinf(b.clone()));
                inf_times_zero.or(zero_times_inf)
            }
            ExprKind::Plus => {
                // -inf + +inf and +inf + -inf, i.e. the signs differ
                let plus_inf = Expr::plus_infinity(typ.clone());
                let minus_inf = Expr::minus_infinity(typ);
                a.clone()
                    .eq(minus_inf.clone())
                    .and(b.clone().eq(plus_inf.clone()))
                    .or(a.clone().eq(plus_inf).and(b.clone().eq(minus_inf)))
            }
            ExprKind::Minus => {
                // +inf - +inf and -inf - -inf, i.e. the signs match
                let plus_inf = Expr::plus_infinity(typ.clone());
                let minus_inf = Expr::minus_infinity(typ);
                a.clone()
                    .eq(plus_inf.clone())
                    .and(b.clone().eq(plus_inf))
                    .or(a.clone().eq(minus_inf.clone()).and(b.clone().eq(minus_inf)))
            }
            _ => unreachable!(),
        };

        self.add_guarded_property(
            isnan.boolean_negate(),
            &format!("NaN on {}", expr.kind().operator_name()),
            "NaN",
            *expr.location(),
            expr,
            guard,
        );
    }
}

/// Left-associate an n-ary `+` or `*` into nested binary applications.
fn make_binary(expr: &Expr) -> Expr {
    let mut operands = expr.operands().iter();
    let first = operands.next().unwrap().clone();
    operands
        .fold(first, |acc, op| match expr.kind() {
            ExprKind::Plus => acc.plus(op.clone()),
            ExprKind::Mult => acc.mul(op.clone()),
            _ => unreachable!("only n-ary sums and products are re-associated"),
        })
        .with_location(*expr.location())
}
