// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Verification conditions for integer arithmetic: division and modulo by
//! zero, signed/unsigned overflow, lossy conversions, and undefined shifts.

use super::GotoCheck;
use crate::config::LanguageMode;
use crate::guard::Guard;
use goto_program::arith::{max_int, min_int};
use goto_program::{Expr, ExprKind, OverflowOp};
use goto_program::Type;
use num::bigint::BigInt;
use num_traits::ToPrimitive;

impl GotoCheck<'_> {
    pub(super) fn div_by_zero_check(&mut self, expr: &Expr, guard: &Guard) {
        if !self.flags.div_by_zero_check {
            return;
        }

        let [_, divisor] = expr.operands() else { unreachable!() };

        self.add_guarded_property(
            divisor_not_zero(divisor),
            "division by zero",
            "division-by-zero",
            *expr.location(),
            expr,
            guard,
        );
    }

    /// Java's `%` is total, so the check only applies to C and C++.
    pub(super) fn mod_by_zero_check(&mut self, expr: &Expr, guard: &Guard) {
        if !self.flags.div_by_zero_check || self.mode == LanguageMode::Java {
            return;
        }

        let [_, divisor] = expr.operands() else { unreachable!() };

        self.add_guarded_property(
            divisor_not_zero(divisor),
            "division by zero",
            "division-by-zero",
            *expr.location(),
            expr,
            guard,
        );
    }

    /// `INT_MIN % -1` is undefined by C11 and miscompiled nearly everywhere
    /// else.
    pub(super) fn mod_overflow_check(&mut self, expr: &Expr, guard: &Guard) {
        if !self.flags.signed_overflow_check || !expr.typ().is_signed() {
            return;
        }

        let [dividend, divisor] = expr.operands() else { unreachable!() };
        let int_min_neq =
            dividend.clone().neq(Expr::smallest_signed(dividend.typ().clone()));
        let minus_one_neq =
            divisor.clone().neq(Expr::int_constant(-1, divisor.typ().clone()));

        self.add_guarded_property(
            int_min_neq.or(minus_one_neq),
            "result of signed mod is not representable",
            "overflow",
            *expr.location(),
            expr,
            guard,
        );
    }

    pub(super) fn integer_overflow_check(&mut self, expr: &Expr, guard: &Guard) {
        if !self.flags.signed_overflow_check && !self.flags.unsigned_overflow_check {
            return;
        }

        let typ = expr.typ();
        if typ.is_signed() && !self.flags.signed_overflow_check {
            return;
        }
        if typ.is_unsigned() && !self.flags.unsigned_overflow_check {
            return;
        }

        match expr.kind() {
            ExprKind::Div => {
                // undefined for signed division INT_MIN / -1
                if typ.is_signed() {
                    let [dividend, divisor] = expr.operands() else { unreachable!() };
                    let int_min_eq =
                        dividend.clone().eq(Expr::smallest_signed(typ.clone()));
                    let minus_one_eq =
                        divisor.clone().eq(Expr::int_constant(-1, typ.clone()));

                    self.add_guarded_property(
                        int_min_eq.and(minus_one_eq).not(),
                        "arithmetic overflow on signed division",
                        "overflow",
                        *expr.location(),
                        expr,
                        guard,
                    );
                }
            }

            ExprKind::UnaryMinus => {
                // overflow on unary minus can only happen with the smallest
                // representable number 100....0
                if typ.is_signed() {
                    let [op] = expr.operands() else { unreachable!() };
                    let int_min_eq = op.clone().eq(Expr::smallest_signed(typ.clone()));

                    self.add_guarded_property(
                        int_min_eq.not(),
                        "arithmetic overflow on signed unary minus",
                        "overflow",
                        *expr.location(),
                        expr,
                        guard,
                    );
                }
            }

            ExprKind::Shl => {
                if typ.is_signed() {
                    self.signed_shl_overflow_check(expr, guard);
                }
            }

            _ => self.generic_overflow_check(expr, guard),
        }
    }

    /// The widened-shift encoding: shift the operand at twice its width and
    /// require the top bits to come out zero, unless one of the cases that is
    /// undefined (rather than overflowing) applies.
    fn signed_shl_overflow_check(&mut self, expr: &Expr, guard: &Guard) {
        let [op, distance] = expr.operands() else { unreachable!() };
        let op_width = op.typ().width().unwrap();
        let distance_type = distance.typ().clone();

        // a left shift of a negative value is undefined, not an overflow
        let neg_value_shift = if op.typ().is_unsigned() {
            Expr::bool_false()
        } else {
            op.clone().lt(Expr::zero(op.typ().clone()))
        };

        // a shift by a negative distance is undefined, not an overflow
        let neg_dist_shift = if distance_type.is_unsigned() {
            Expr::bool_false()
        } else {
            distance.clone().lt(Expr::zero(distance_type.clone()))
        };

        // shifting a non-zero value by more than its width is undefined,
        // not an overflow
        let dist_too_large = distance
            .clone()
            .gt(Expr::int_constant(op_width, distance_type));

        let op_zero = op.clone().eq(Expr::zero(op.typ().clone()));

        let double_width = 2 * op_width;
        let op_ext_shifted = op
            .clone()
            .cast_to(Type::signed_int(double_width))
            .shl(distance.clone());

        // Shifting a 1 into the sign bit is implementation-defined in C89
        // and C++98, but explicitly undefined from C99/C++11 on; the window
        // of top bits that must be zero grows by one accordingly.
        let number_of_top_bits =
            if self.language_standard.allows_shift_into_sign_bit(self.mode) {
                op_width
            } else {
                op_width + 1
            };

        let top_bits = op_ext_shifted
            .cast_to(Type::unsigned_int(double_width))
            .lshr(Expr::int_constant(
                double_width - number_of_top_bits,
                Type::unsigned_int(double_width),
            ))
            .cast_to(Type::unsigned_int(number_of_top_bits));
        let top_bits_zero =
            top_bits.clone().eq(Expr::zero(top_bits.typ().clone()));

        self.add_guarded_property(
            Expr::disjunction(vec![
                neg_value_shift,
                neg_dist_shift,
                dist_too_large,
                op_zero,
                top_bits_zero,
            ]),
            "arithmetic overflow on signed shl",
            "overflow",
            *expr.location(),
            expr,
            guard,
        );
    }

    /// Emit backend-interpreted overflow predicates; n-ary operands are
    /// broken up into one check per prefix.
    fn generic_overflow_check(&mut self, expr: &Expr, guard: &Guard) {
        let overflow_op = match expr.kind() {
            ExprKind::Plus => OverflowOp::Plus,
            ExprKind::Minus => OverflowOp::Minus,
            ExprKind::Mult => OverflowOp::Mult,
            _ => return,
        };
        let kind = if expr.typ().is_unsigned() { "unsigned" } else { "signed" };
        let comment = format!(
            "arithmetic overflow on {kind} {}",
            expr.kind().operator_name()
        );

        let operands = expr.operands();
        if operands.len() >= 3 {
            // the overflow predicates are binary, so break the operation up
            for i in 1..operands.len() {
                let prefix = if i == 1 {
                    operands[0].clone()
                } else {
                    Expr::multi_ary(
                        expr.kind().clone(),
                        operands[..i].to_vec(),
                        expr.typ().clone(),
                    )
                };
                let overflow =
                    Expr::overflow(overflow_op, prefix, operands[i].clone());

                self.add_guarded_property(
                    overflow.not(),
                    &comment,
                    "overflow",
                    *expr.location(),
                    expr,
                    guard,
                );
            }
        } else {
            let overflow =
                Expr::overflow(overflow_op, operands[0].clone(), operands[1].clone());

            self.add_guarded_property(
                overflow.not(),
                &comment,
                "overflow",
                *expr.location(),
                expr,
                guard,
            );
        }
    }

    /// Conversions to a narrower or differently-signed integer type may drop
    /// or misinterpret values; bound the operand accordingly.
    pub(super) fn conversion_check(&mut self, expr: &Expr, guard: &Guard) {
        if !self.flags.conversion_check {
            return;
        }

        let typ = expr.typ();
        if !typ.is_integer() {
            return;
        }
        let new_width = typ.width().unwrap();

        let [op] = expr.operands() else { unreachable!() };
        let old_type = op.typ().clone();
        let old_width = old_type.width();

        if typ.is_signed() {
            if old_type.is_signed() {
                let old_width = old_width.unwrap();
                if new_width >= old_width {
                    return; // always ok
                }
                let no_overflow_upper = op.clone().le(Expr::int_constant(
                    max_int(new_width, true),
                    old_type.clone(),
                ));
                let no_overflow_lower = op
                    .clone()
                    .ge(Expr::int_constant(min_int(new_width, true), old_type));

                self.add_guarded_property(
                    no_overflow_lower.and(no_overflow_upper),
                    "arithmetic overflow on signed type conversion",
                    "overflow",
                    *expr.location(),
                    expr,
                    guard,
                );
            } else if old_type.is_unsigned() {
                let old_width = old_width.unwrap();
                if new_width >= old_width + 1 {
                    return; // always ok
                }
                let no_overflow_upper = op
                    .clone()
                    .le(Expr::int_constant(max_int(new_width, true), old_type));

                self.add_guarded_property(
                    no_overflow_upper,
                    "arithmetic overflow on unsigned to signed type conversion",
                    "overflow",
                    *expr.location(),
                    expr,
                    guard,
                );
            } else if old_type.is_float() {
                // the fractional part is truncated, so the bounds are strict
                let upper = BigInt::from(1) << (new_width - 1);
                let lower = -(BigInt::from(1) << (new_width - 1)) - 1;
                let Some((upper, lower)) =
                    float_constant(&upper, &old_type).zip(float_constant(&lower, &old_type))
                else {
                    return;
                };
                let no_overflow_upper = op.clone().lt(upper);
                let no_overflow_lower = op.clone().gt(lower);

                self.add_guarded_property(
                    no_overflow_lower.and(no_overflow_upper),
                    "arithmetic overflow on float to signed integer type conversion",
                    "overflow",
                    *expr.location(),
                    expr,
                    guard,
                );
            }
        } else if typ.is_unsigned() {
            if old_type.is_signed() {
                let old_width = old_width.unwrap();
                let no_overflow_lower = op
                    .clone()
                    .ge(Expr::zero(old_type.clone()));
                if new_width >= old_width - 1 {
                    // only the lower bound can be violated
                    self.add_guarded_property(
                        no_overflow_lower,
                        "arithmetic overflow on signed to unsigned type conversion",
                        "overflow",
                        *expr.location(),
                        expr,
                        guard,
                    );
                } else {
                    let no_overflow_upper = op.clone().le(Expr::int_constant(
                        max_int(new_width, false),
                        old_type,
                    ));
                    self.add_guarded_property(
                        no_overflow_lower.and(no_overflow_upper),
                        "arithmetic overflow on signed to unsigned type conversion",
                        "overflow",
                        *expr.location(),
                        expr,
                        guard,
                    );
                }
            } else if old_type.is_unsigned() {
                let old_width = old_width.unwrap();
                if new_width >= old_width {
                    return; // always ok
                }
                let no_overflow_upper = op
                    .clone()
                    .le(Expr::int_constant(max_int(new_width, false), old_type));

                self.add_guarded_property(
                    no_overflow_upper,
                    "arithmetic overflow on unsigned to unsigned type conversion",
                    "overflow",
                    *expr.location(),
                    expr,
                    guard,
                );
            } else if old_type.is_float() {
                let upper = max_int(new_width, false);
                let lower = BigInt::from(-1);
                let Some((upper, lower)) =
                    float_constant(&upper, &old_type).zip(float_constant(&lower, &old_type))
                else {
                    return;
                };
                let no_overflow_upper = op.clone().lt(upper);
                let no_overflow_lower = op.clone().gt(lower);

                self.add_guarded_property(
                    no_overflow_lower.and(no_overflow_upper),
                    "arithmetic overflow on float to unsigned integer type conversion",
                    "overflow",
                    *expr.location(),
                    expr,
                    guard,
                );
            }
        }
    }

    /// Shifts are undefined for negative or too-large distances, and signed
    /// left shifts additionally for negative operands.
    pub(super) fn undefined_shift_check(&mut self, expr: &Expr, guard: &Guard) {
        if !self.flags.undefined_shift_check {
            return;
        }

        let [op, distance] = expr.operands() else { unreachable!() };
        let distance_type = distance.typ();

        if distance_type.is_signed() {
            let inequality =
                distance.clone().ge(Expr::zero(distance_type.clone()));

            self.add_guarded_property(
                inequality,
                "shift distance is negative",
                "undefined-shift",
                *expr.location(),
                expr,
                guard,
            );
        }

        if op.typ().is_integer() {
            let width_expr =
                Expr::int_constant(op.typ().width().unwrap(), distance_type.clone());

            self.add_guarded_property(
                distance.clone().lt(width_expr),
                "shift distance too large",
                "undefined-shift",
                *expr.location(),
                expr,
                guard,
            );

            if op.typ().is_signed() && matches!(expr.kind(), ExprKind::Shl) {
                let inequality = op.clone().ge(Expr::zero(op.typ().clone()));

                self.add_guarded_property(
                    inequality,
                    "shift operand is negative",
                    "undefined-shift",
                    *expr.location(),
                    expr,
                    guard,
                );
            }
        } else {
            self.add_guarded_property(
                Expr::bool_false(),
                "shift of non-integer type",
                "undefined-shift",
                *expr.location(),
                expr,
                guard,
            );
        }
    }
}

/// The divisor compares against zero at its own type: IEEE equality for
/// floats, bitvector inequality otherwise.
fn divisor_not_zero(divisor: &Expr) -> Expr {
    let typ = divisor.typ().clone();
    if typ.is_float() {
        divisor.clone().ieee_float_equal(Expr::float_zero(typ)).not()
    } else {
        divisor.clone().neq(Expr::zero(typ))
    }
}

/// A float constant holding `value`, rounded to nearest. Only the IEEE
/// single and double layouts are supported; other layouts skip the check.
fn float_constant(value: &BigInt, typ: &Type) -> Option<Expr> {
    let as_f64 = value.to_f64()?;
    let bits = match typ.width()? {
        32 => (as_f64 as f32).to_bits() as u64,
        64 => as_f64.to_bits(),
        _ => return None,
    };
    Some(Expr::float_constant_bits(bits, typ.clone()))
}
