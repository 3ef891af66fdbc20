// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A sound, best-effort expression simplifier.
//!
//! Only rewrites that are valid for every operand value are applied; when in
//! doubt (a fold that would wrap a signed value, a division by zero) the
//! expression is returned unchanged. Types are preserved throughout.

use crate::arith::{self, NumUtils};
use crate::expr::{Expr, ExprKind};
use num::bigint::BigInt;

/// Simplify `expr` recursively, bottom-up.
pub fn simplify(expr: &Expr) -> Expr {
    let operands: Vec<Expr> = expr.operands().iter().map(simplify).collect();
    fold(expr, operands)
}

fn fold(expr: &Expr, operands: Vec<Expr>) -> Expr {
    match expr.kind() {
        ExprKind::Not => match &operands[0] {
            e if e.is_true() => Expr::bool_false(),
            e if e.is_false() => Expr::bool_true(),
            e if matches!(e.kind(), ExprKind::Not) => e.operands()[0].clone(),
            _ => expr.with_new_operands(operands),
        },

        ExprKind::And => {
            if operands.iter().any(Expr::is_false) {
                return Expr::bool_false();
            }
            let kept: Vec<Expr> = operands.into_iter().filter(|o| !o.is_true()).collect();
            Expr::conjunction(kept)
        }

        ExprKind::Or => {
            if operands.iter().any(Expr::is_true) {
                return Expr::bool_true();
            }
            let kept: Vec<Expr> = operands.into_iter().filter(|o| !o.is_false()).collect();
            Expr::disjunction(kept)
        }

        ExprKind::Implies => {
            let mut operands = operands;
            let consequent = operands.pop().unwrap();
            let antecedent = operands.pop().unwrap();
            if antecedent.is_true() {
                consequent
            } else if antecedent.is_false() || consequent.is_true() {
                Expr::bool_true()
            } else if consequent.is_false() {
                antecedent.boolean_negate()
            } else {
                expr.with_new_operands(vec![antecedent, consequent])
            }
        }

        ExprKind::If => {
            if operands[0].is_true() {
                operands[1].clone()
            } else if operands[0].is_false() {
                operands[2].clone()
            } else {
                expr.with_new_operands(operands)
            }
        }

        ExprKind::Equal | ExprKind::NotEqual | ExprKind::Lt | ExprKind::Le | ExprKind::Gt
        | ExprKind::Ge => fold_relation(expr, operands),

        ExprKind::Plus | ExprKind::Mult | ExprKind::Minus | ExprKind::Div | ExprKind::Mod => {
            fold_arithmetic(expr, operands)
        }

        ExprKind::UnaryMinus => {
            if let Some(value) = operands[0].int_constant_value() {
                let negated = -value;
                if fits(&negated, expr) {
                    return Expr::int_constant(negated, expr.typ().clone());
                }
            }
            expr.with_new_operands(operands)
        }

        ExprKind::Typecast => fold_typecast(expr, operands),

        ExprKind::IsInf => match operands[0].kind() {
            ExprKind::FloatConstant { bits } => {
                Expr::bool_constant(arith::is_infinity_bits(*bits, operands[0].typ()))
            }
            _ => expr.with_new_operands(operands),
        },

        ExprKind::IsNan => match operands[0].kind() {
            ExprKind::FloatConstant { bits } => {
                Expr::bool_constant(arith::is_nan_bits(*bits, operands[0].typ()))
            }
            _ => expr.with_new_operands(operands),
        },

        ExprKind::IeeeFloatEqual => match (operands[0].kind(), operands[1].kind()) {
            (ExprKind::FloatConstant { bits: a }, ExprKind::FloatConstant { bits: b }) => {
                let typ = operands[0].typ();
                if arith::is_nan_bits(*a, typ) || arith::is_nan_bits(*b, typ) {
                    Expr::bool_false()
                } else if arith::is_zero_bits(*a, typ) && arith::is_zero_bits(*b, typ) {
                    Expr::bool_true()
                } else {
                    Expr::bool_constant(a == b)
                }
            }
            _ => expr.with_new_operands(operands),
        },

        _ => expr.with_new_operands(operands),
    }
}

fn fold_relation(expr: &Expr, operands: Vec<Expr>) -> Expr {
    // float constants compare bitwise under Equal/NotEqual
    if let (ExprKind::FloatConstant { bits: a }, ExprKind::FloatConstant { bits: b }) =
        (operands[0].kind(), operands[1].kind())
    {
        return match expr.kind() {
            ExprKind::Equal => Expr::bool_constant(a == b),
            ExprKind::NotEqual => Expr::bool_constant(a != b),
            _ => expr.with_new_operands(operands),
        };
    }

    let (Some(a), Some(b)) =
        (operands[0].int_constant_value(), operands[1].int_constant_value())
    else {
        return expr.with_new_operands(operands);
    };
    let truth = match expr.kind() {
        ExprKind::Equal => a == b,
        ExprKind::NotEqual => a != b,
        ExprKind::Lt => a < b,
        ExprKind::Le => a <= b,
        ExprKind::Gt => a > b,
        ExprKind::Ge => a >= b,
        _ => unreachable!(),
    };
    Expr::bool_constant(truth)
}

fn fold_arithmetic(expr: &Expr, operands: Vec<Expr>) -> Expr {
    if !expr.typ().is_integer() {
        return expr.with_new_operands(operands);
    }
    let values: Option<Vec<BigInt>> =
        operands.iter().map(Expr::int_constant_value).collect();
    let Some(values) = values else {
        return expr.with_new_operands(operands);
    };

    let result = match expr.kind() {
        ExprKind::Plus => values.into_iter().sum::<BigInt>(),
        ExprKind::Mult => values.into_iter().product::<BigInt>(),
        ExprKind::Minus => values[0].clone() - &values[1],
        ExprKind::Div => {
            if values[1] == BigInt::from(0) {
                return expr.with_new_operands(operands);
            }
            values[0].clone() / &values[1]
        }
        ExprKind::Mod => {
            if values[1] == BigInt::from(0) {
                return expr.with_new_operands(operands);
            }
            values[0].clone() % &values[1]
        }
        _ => unreachable!(),
    };

    if fits(&result, expr) {
        Expr::int_constant(result, expr.typ().clone())
    } else {
        expr.with_new_operands(operands)
    }
}

fn fold_typecast(expr: &Expr, mut operands: Vec<Expr>) -> Expr {
    let op = operands.pop().unwrap();
    if op.typ() == expr.typ() {
        return op;
    }
    if expr.typ().is_integer() {
        if let Some(value) = op.int_constant_value() {
            let wrapped = arith::wrap_to_width(
                &value,
                expr.typ().width().unwrap(),
                expr.typ().is_signed(),
            );
            return Expr::int_constant(wrapped, expr.typ().clone());
        }
    }
    expr.with_new_operands(vec![op])
}

fn fits(value: &BigInt, expr: &Expr) -> bool {
    match expr.typ().width() {
        Some(width) => value.fits_in_bits(width, expr.typ().is_signed()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::simplify;
    use crate::expr::Expr;
    use crate::typ::Type;
    use num::bigint::BigInt;

    fn int(i: i64) -> Expr {
        Expr::int_constant(i, Type::c_int())
    }

    #[test]
    fn folds_relations_on_constants() {
        assert!(simplify(&int(-1).ge(int(0))).is_false());
        assert!(simplify(&int(-1).lt(int(10))).is_true());
    }

    #[test]
    fn folds_boolean_structure() {
        let x = Expr::symbol("x", Type::bool());
        assert_eq!(simplify(&Expr::bool_true().and(x.clone())), x);
        assert!(simplify(&Expr::bool_false().implies(x.clone())).is_true());
        assert_eq!(simplify(&Expr::bool_true().implies(x.clone())), x);
        assert!(simplify(&x.clone().or(Expr::bool_true())).is_true());
    }

    #[test]
    fn arithmetic_folds_only_without_overflow() {
        assert_eq!(
            simplify(&int(2).mul(int(3))).int_constant_value(),
            Some(BigInt::from(6))
        );
        // i32::MAX + 1 does not fit: left alone
        let max = Expr::largest_signed(Type::c_int());
        let sum = max.plus(int(1));
        assert_eq!(simplify(&sum), sum);
        // division by zero is never folded
        let div = int(1).div(int(0));
        assert_eq!(simplify(&div), div);
    }

    #[test]
    fn typecast_folding_wraps() {
        let cast = int(300).cast_to(Type::unsigned_int(8));
        assert_eq!(simplify(&cast).int_constant_value(), Some(BigInt::from(44)));
        let narrowing = int(-1).cast_to(Type::unsigned_int(32));
        assert_eq!(
            simplify(&narrowing).int_constant_value(),
            Some(BigInt::from(u32::MAX))
        );
    }

    #[test]
    fn float_classification_folds() {
        let inf = Expr::plus_infinity(Type::double());
        assert!(simplify(&Expr::isinf(inf.clone())).is_true());
        assert!(simplify(&Expr::isnan(inf.clone())).is_false());
        let zero = Expr::float_zero(Type::double());
        assert!(simplify(&inf.clone().eq(zero.clone())).is_false());
        assert!(simplify(&zero.clone().ieee_float_equal(zero)).is_true());
    }
}
