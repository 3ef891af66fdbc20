// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural validation of counterexample traces.
//!
//! Consumers of traces assume that assignment steps have a narrow shape:
//! simple lvalues on the left, literal-like values on the right. The backend
//! occasionally produces something richer; failing fast here with the
//! offending expression beats a cryptic crash later in trace processing.

use crate::errors::TraceValidationError;
use goto_program::simplify::simplify;
use goto_program::{Expr, ExprKind, SymbolTable};
use tracing::info;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TraceStepKind {
    Assignment,
    Decl,
    Assume,
    Assert,
    Location,
}

/// One step of a counterexample trace.
#[derive(Clone, Debug)]
pub struct TraceStep {
    pub kind: TraceStepKind,
    /// The assigned lvalue, for assignment and declaration steps.
    pub full_lhs: Option<Expr>,
    /// The value it takes.
    pub full_lhs_value: Option<Expr>,
}

impl TraceStep {
    pub fn assignment(full_lhs: Expr, full_lhs_value: Expr) -> TraceStep {
        TraceStep {
            kind: TraceStepKind::Assignment,
            full_lhs: Some(full_lhs),
            full_lhs_value: Some(full_lhs_value),
        }
    }
}

#[derive(Debug, Default)]
pub struct Trace {
    pub steps: Vec<TraceStep>,
}

/// True iff the expression is a symbol with a non-empty identifier.
pub fn check_symbol_structure(expr: &Expr) -> bool {
    expr.symbol_identifier().map(|id| !id.is_empty()).unwrap_or(false)
}

/// True iff the expression is a symbol or an expression whose first operand
/// can contain a nested symbol.
fn may_be_lvalue(expr: &Expr) -> bool {
    matches!(
        expr.kind(),
        ExprKind::Member { .. }
            | ExprKind::Index
            | ExprKind::AddressOf
            | ExprKind::Typecast
            | ExprKind::Symbol { .. }
            | ExprKind::ByteExtractLE
    )
}

/// Follow first operands down to a symbol, if the chain stays within lvalue
/// shapes.
pub fn get_inner_symbol_expr(expr: &Expr) -> Option<&Expr> {
    let mut expr = expr;
    while !expr.operands().is_empty() {
        expr = &expr.operands()[0];
        if !may_be_lvalue(expr) {
            return None;
        }
    }
    if !check_symbol_structure(expr) {
        return None;
    }
    Some(expr)
}

pub fn check_member_structure(expr: &Expr) -> bool {
    matches!(expr.kind(), ExprKind::Member { .. })
        && !expr.operands().is_empty()
        && get_inner_symbol_expr(expr).is_some()
}

pub fn valid_lhs_expr_high_level(lhs: &Expr) -> bool {
    matches!(
        lhs.kind(),
        ExprKind::Member { .. }
            | ExprKind::Symbol { .. }
            | ExprKind::Index
            | ExprKind::ByteExtractLE
    )
}

pub fn valid_rhs_expr_high_level(rhs: &Expr) -> bool {
    rhs.is_constant()
        || matches!(
            rhs.kind(),
            ExprKind::Struct
                | ExprKind::Array
                | ExprKind::ArrayList
                | ExprKind::AddressOf
                | ExprKind::Symbol { .. }
                | ExprKind::ByteExtractLE
        )
}

pub fn can_evaluate_to_constant(expr: &Expr) -> bool {
    let head = expr.skip_typecast();
    head.is_constant()
        || matches!(head.kind(), ExprKind::Symbol { .. } | ExprKind::Plus)
}

/// An index (or byte extract) of a symbol at a constant-evaluable position.
pub fn check_index_structure(expr: &Expr) -> bool {
    matches!(expr.kind(), ExprKind::Index | ExprKind::ByteExtractLE)
        && expr.operands().len() == 2
        && check_symbol_structure(&expr.operands()[0])
        && can_evaluate_to_constant(&expr.operands()[1])
}

/// The first operand may be a base-class struct or a constant; everything
/// after it must be constant.
pub fn check_struct_structure(expr: &Expr) -> bool {
    let operands = expr.operands();
    let Some(first) = operands.first() else { return false };
    if !matches!(first.kind(), ExprKind::Struct) && !first.is_constant() {
        return false;
    }
    operands[1..].iter().all(Expr::is_constant)
}

pub fn check_address_structure(expr: &Expr) -> bool {
    get_inner_symbol_expr(expr).is_some()
}

pub fn check_constant_structure(expr: &Expr) -> bool {
    match expr.kind() {
        ExprKind::StringConstant { value } => !value.is_empty(),
        _ => expr.is_constant(),
    }
}

fn check_lhs_assumptions(lhs: &Expr) -> Result<(), TraceValidationError> {
    let fail = |reason: &'static str| {
        Err(TraceValidationError::Lhs { reason, expr: lhs.to_string() })
    };

    if !valid_lhs_expr_high_level(lhs) {
        return fail("Unsupported expression");
    }
    match lhs.kind() {
        ExprKind::Member { .. } => {
            if !check_member_structure(lhs) {
                return fail("Expecting a member with nested symbol operand");
            }
        }
        ExprKind::Symbol { .. } => {
            if !check_symbol_structure(lhs) {
                return fail("Expecting a symbol with non-empty identifier");
            }
        }
        ExprKind::Index => {
            if !check_index_structure(lhs) {
                return fail(
                    "Expecting an index expression with a symbol array and \
                     constant or symbol index value",
                );
            }
        }
        ExprKind::ByteExtractLE => {
            if !check_index_structure(lhs) {
                return fail(
                    "Expecting a byte extract expression with a symbol array and \
                     constant or symbol index value",
                );
            }
        }
        _ => unreachable!(),
    }
    Ok(())
}

fn check_rhs_assumptions(rhs: &Expr) -> Result<(), TraceValidationError> {
    let fail = |reason: &'static str| {
        Err(TraceValidationError::Rhs { reason, expr: rhs.to_string() })
    };

    if !valid_rhs_expr_high_level(rhs) {
        return fail("Unsupported expression");
    }
    match rhs.kind() {
        ExprKind::AddressOf => {
            if !check_address_structure(rhs) {
                return fail("Expecting an address of with nested symbol");
            }
        }
        ExprKind::Symbol { .. } => {
            if !check_symbol_structure(rhs) {
                return fail("Expecting a symbol with non-empty identifier");
            }
        }
        ExprKind::Struct => {
            if !check_struct_structure(rhs) {
                return fail("Expecting all non-base class operands to be constants");
            }
        }
        // no structure to check
        ExprKind::Array | ExprKind::ArrayList => {}
        ExprKind::ByteExtractLE => {
            if rhs.operands().len() != 2 {
                return fail("Expecting a byte extract with two operands");
            }
            if !simplify(&rhs.operands()[0]).is_constant() {
                return fail("Expecting a byte extract with constant value");
            }
            if !simplify(&rhs.operands()[1]).is_constant() {
                return fail("Expecting a byte extract with constant index");
            }
        }
        _ => {
            if !check_constant_structure(rhs) {
                return fail(
                    "Expecting a constant expression with a non-empty value",
                );
            }
        }
    }
    Ok(())
}

fn check_step_assumptions(step: &TraceStep) -> Result<(), TraceValidationError> {
    if step.kind != TraceStepKind::Assignment && step.kind != TraceStepKind::Decl {
        return Ok(());
    }
    let lhs = step.full_lhs.clone().unwrap_or_else(Expr::nil);
    let rhs = step.full_lhs_value.clone().unwrap_or_else(Expr::nil);
    check_lhs_assumptions(lhs.skip_typecast())?;
    check_rhs_assumptions(rhs.skip_typecast())?;
    Ok(())
}

/// Validate every assignment and declaration step of `trace`. The first
/// violation aborts with the offending expression.
pub fn check_trace_assumptions(
    trace: &Trace,
    _ns: &SymbolTable,
) -> Result<(), TraceValidationError> {
    for step in &trace.steps {
        check_step_assumptions(step)?;
    }
    info!("Trace validation successful");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use goto_program::Type;

    fn int_type() -> Type {
        Type::c_int()
    }

    fn valid_symbol() -> Expr {
        Expr::symbol("id", int_type())
    }

    fn invalid_symbol() -> Expr {
        Expr::symbol("", int_type())
    }

    fn int_array() -> Expr {
        Expr::symbol(
            "arr",
            int_type().array_of(Expr::int_constant(4, Type::ssize_t())),
        )
    }

    fn pair_type() -> Type {
        Type::struct_type("pair", vec![Type::component("first", int_type())])
    }

    #[test]
    fn symbol_structure() {
        assert!(check_symbol_structure(&valid_symbol()));
        assert!(!check_symbol_structure(&invalid_symbol()));
        assert!(!check_symbol_structure(&Expr::int_constant(0, int_type())));
    }

    #[test]
    fn inner_symbol() {
        let member = Expr::symbol("s", pair_type()).member("first");
        assert!(get_inner_symbol_expr(&member).is_some());
        let no_symbol = Expr::int_constant(1, int_type()).neg();
        assert!(get_inner_symbol_expr(&no_symbol).is_none());
    }

    #[test]
    fn member_structure() {
        let valid_member = Expr::symbol("s", pair_type()).member("first");
        assert!(check_member_structure(&valid_member));
        assert!(!check_member_structure(&valid_symbol()));
    }

    #[test]
    fn lhs_high_level_shapes() {
        assert!(valid_lhs_expr_high_level(&valid_symbol()));
        assert!(valid_lhs_expr_high_level(
            &int_array().index(Expr::int_constant(0, int_type()))
        ));
        assert!(!valid_lhs_expr_high_level(&valid_symbol().address_of()));
    }

    #[test]
    fn rhs_high_level_shapes() {
        assert!(valid_rhs_expr_high_level(&valid_symbol()));
        assert!(valid_rhs_expr_high_level(&valid_symbol().address_of()));
        assert!(valid_rhs_expr_high_level(&Expr::int_constant(0, int_type())));
        assert!(!valid_rhs_expr_high_level(
            &Expr::symbol("s", pair_type()).member("first")
        ));
    }

    #[test]
    fn index_structure() {
        let good = int_array().index(Expr::int_constant(1, int_type()));
        assert!(check_index_structure(&good));
        let symbolic = int_array().index(Expr::symbol("i", int_type()));
        assert!(check_index_structure(&symbolic));
        let nested =
            int_array().index(Expr::symbol("i", int_type()).mul(Expr::symbol("j", int_type())));
        assert!(!check_index_structure(&nested));
    }

    #[test]
    fn struct_structure() {
        let constant = Expr::int_constant(1, int_type());
        let good = Expr::struct_expr(vec![constant.clone()], pair_type());
        assert!(check_struct_structure(&good));
        let bad = Expr::struct_expr(vec![constant.neg()], pair_type());
        assert!(!check_struct_structure(&bad));
    }

    #[test]
    fn valid_step_passes() {
        let trace = Trace {
            steps: vec![TraceStep::assignment(
                valid_symbol(),
                Expr::int_constant(0, int_type()),
            )],
        };
        assert!(check_trace_assumptions(&trace, &SymbolTable::new()).is_ok());
    }

    #[test]
    fn empty_symbol_lhs_fails_on_lhs_side() {
        let trace = Trace {
            steps: vec![TraceStep::assignment(
                invalid_symbol(),
                Expr::int_constant(0, int_type()),
            )],
        };
        let err = check_trace_assumptions(&trace, &SymbolTable::new()).unwrap_err();
        assert!(matches!(err, TraceValidationError::Lhs { .. }));
        assert!(err.to_string().contains("LHS"));
    }

    #[test]
    fn typecasts_are_stripped_before_checking() {
        let cast_lhs = valid_symbol().cast_to(Type::signed_int(64));
        let trace = Trace {
            steps: vec![TraceStep::assignment(
                cast_lhs,
                Expr::int_constant(0, int_type()),
            )],
        };
        assert!(check_trace_assumptions(&trace, &SymbolTable::new()).is_ok());
    }

    #[test]
    fn byte_extract_rhs_errors_report_the_rhs_side() {
        let byte = Expr::byte_extract_le(
            Expr::symbol("x", int_type()),
            Expr::int_constant(0, int_type()),
            int_type(),
        );
        let trace = Trace {
            steps: vec![TraceStep::assignment(valid_symbol(), byte)],
        };
        let err = check_trace_assumptions(&trace, &SymbolTable::new()).unwrap_err();
        assert!(matches!(err, TraceValidationError::Rhs { .. }));
        assert!(err.to_string().contains("RHS"));
    }

    #[test]
    fn non_assignment_steps_are_ignored() {
        let step = TraceStep {
            kind: TraceStepKind::Location,
            full_lhs: None,
            full_lhs_value: None,
        };
        let trace = Trace { steps: vec![step] };
        assert!(check_trace_assumptions(&trace, &SymbolTable::new()).is_ok());
    }
}
