// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! C-ish rendering of expressions and types.
//!
//! This is not a code generator: its output feeds assertion comments
//! (`"<check> in <expr>"`) and diagnostics, so it favors readability over
//! faithful operator precedence. Composite operands are parenthesized
//! unconditionally.

use crate::expr::{Expr, ExprKind, OverflowOp};
use crate::typ::Type;
use std::fmt::{self, Display, Formatter};

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let ops = self.operands();
        match self.kind() {
            ExprKind::Symbol { identifier } => write!(f, "{identifier}"),
            ExprKind::IntConstant(i) => write!(f, "{i}"),
            ExprKind::BoolConstant(b) => write!(f, "{b}"),
            ExprKind::FloatConstant { bits } => match self.typ().width() {
                Some(32) => write!(f, "{:e}f", f32::from_bits(*bits as u32)),
                Some(64) => write!(f, "{:e}", f64::from_bits(*bits)),
                _ => write!(f, "float#{bits:#x}"),
            },
            ExprKind::StringConstant { value } => write!(f, "{:?}", value.to_string()),
            ExprKind::NullPointer => write!(f, "NULL"),
            ExprKind::Nondet => write!(f, "nondet()"),
            ExprKind::Nil => write!(f, "nil"),
            ExprKind::Infinity => write!(f, "infinity"),
            ExprKind::Struct => call(f, "struct", ops),
            ExprKind::Array | ExprKind::ArrayList => {
                write!(f, "{{")?;
                comma_separated(f, ops)?;
                write!(f, "}}")
            }
            ExprKind::ArrayOf => call(f, "array_of", ops),
            ExprKind::Lambda => write!(f, "lambda {} . {}", ops[0], paren(&ops[1])),
            ExprKind::With => {
                write!(f, "{} with [{} := {}]", paren(&ops[0]), ops[1], ops[2])
            }
            ExprKind::Index => write!(f, "{}[{}]", paren(&ops[0]), ops[1]),
            ExprKind::Member { component } => {
                if matches!(ops[0].kind(), ExprKind::Dereference) {
                    write!(f, "{}->{component}", paren(&ops[0].operands()[0]))
                } else {
                    write!(f, "{}.{component}", paren(&ops[0]))
                }
            }
            ExprKind::Dereference => write!(f, "*{}", paren(&ops[0])),
            ExprKind::AddressOf => write!(f, "&{}", paren(&ops[0])),
            ExprKind::ByteExtractLE => call(f, "byte_extract_le", ops),
            ExprKind::ByteExtractBE => call(f, "byte_extract_be", ops),
            ExprKind::If => {
                write!(f, "{} ? {} : {}", paren(&ops[0]), paren(&ops[1]), paren(&ops[2]))
            }
            ExprKind::And => infix_chain(f, "&&", ops),
            ExprKind::Or => infix_chain(f, "||", ops),
            ExprKind::Not => write!(f, "!{}", paren(&ops[0])),
            ExprKind::Implies => write!(f, "{} ==> {}", paren(&ops[0]), paren(&ops[1])),
            ExprKind::Forall => write!(f, "forall {} . {}", ops[0], paren(&ops[1])),
            ExprKind::Exists => write!(f, "exists {} . {}", ops[0], paren(&ops[1])),
            ExprKind::Equal => infix_chain(f, "==", ops),
            ExprKind::NotEqual => infix_chain(f, "!=", ops),
            ExprKind::Lt => infix_chain(f, "<", ops),
            ExprKind::Le => infix_chain(f, "<=", ops),
            ExprKind::Gt => infix_chain(f, ">", ops),
            ExprKind::Ge => infix_chain(f, ">=", ops),
            ExprKind::Plus => infix_chain(f, "+", ops),
            ExprKind::Minus => infix_chain(f, "-", ops),
            ExprKind::Mult => infix_chain(f, "*", ops),
            ExprKind::Div => infix_chain(f, "/", ops),
            ExprKind::Mod => infix_chain(f, "%", ops),
            ExprKind::UnaryMinus => write!(f, "-{}", paren(&ops[0])),
            ExprKind::Shl => infix_chain(f, "<<", ops),
            ExprKind::AShr | ExprKind::LShr => infix_chain(f, ">>", ops),
            ExprKind::Typecast => write!(f, "({}){}", self.typ(), paren(&ops[0])),
            ExprKind::ROk => call(f, "r_ok", ops),
            ExprKind::WOk => call(f, "w_ok", ops),
            ExprKind::Overflow { op } => {
                let name = match op {
                    OverflowOp::Plus => "overflow-+",
                    OverflowOp::Minus => "overflow--",
                    OverflowOp::Mult => "overflow-*",
                    OverflowOp::Shl => "overflow-shl",
                };
                call(f, name, ops)
            }
            ExprKind::IsInvalidPointer => call(f, "is_invalid_pointer", ops),
            ExprKind::IsNullPointer => call(f, "is_null_pointer", ops),
            ExprKind::SameObject => call(f, "same_object", ops),
            ExprKind::DynamicObject => call(f, "dynamic_object", ops),
            ExprKind::MallocObject => call(f, "malloc_object", ops),
            ExprKind::DeadObject => call(f, "dead_object", ops),
            ExprKind::Deallocated => call(f, "deallocated", ops),
            ExprKind::DynamicSize => call(f, "dynamic_size", ops),
            ExprKind::ObjectSize => call(f, "object_size", ops),
            ExprKind::PointerOffset => call(f, "pointer_offset", ops),
            ExprKind::IntegerAddress => call(f, "integer_address", ops),
            ExprKind::IsInf => call(f, "isinf", ops),
            ExprKind::IsNan => call(f, "isnan", ops),
            ExprKind::IeeeFloatEqual => call(f, "ieee_float_equal", ops),
        }
    }
}

/// Wrapper that parenthesizes composite operands.
struct Paren<'a>(&'a Expr);

fn paren(e: &Expr) -> Paren<'_> {
    Paren(e)
}

impl Display for Paren<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let atomic = self.0.operands().is_empty()
            || matches!(
                self.0.kind(),
                ExprKind::Index
                    | ExprKind::Member { .. }
                    | ExprKind::Array
                    | ExprKind::ArrayList
            )
            || is_call_form(self.0.kind());
        if atomic { write!(f, "{}", self.0) } else { write!(f, "({})", self.0) }
    }
}

fn is_call_form(kind: &ExprKind) -> bool {
    matches!(
        kind,
        ExprKind::ROk
            | ExprKind::WOk
            | ExprKind::Overflow { .. }
            | ExprKind::IsInvalidPointer
            | ExprKind::IsNullPointer
            | ExprKind::SameObject
            | ExprKind::DynamicObject
            | ExprKind::MallocObject
            | ExprKind::DeadObject
            | ExprKind::Deallocated
            | ExprKind::DynamicSize
            | ExprKind::ObjectSize
            | ExprKind::PointerOffset
            | ExprKind::IntegerAddress
            | ExprKind::IsInf
            | ExprKind::IsNan
            | ExprKind::IeeeFloatEqual
            | ExprKind::ByteExtractLE
            | ExprKind::ByteExtractBE
            | ExprKind::ArrayOf
            | ExprKind::Struct
    )
}

fn call(f: &mut Formatter<'_>, name: &str, operands: &[Expr]) -> fmt::Result {
    write!(f, "{name}(")?;
    comma_separated(f, operands)?;
    write!(f, ")")
}

fn comma_separated(f: &mut Formatter<'_>, operands: &[Expr]) -> fmt::Result {
    for (i, op) in operands.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{op}")?;
    }
    Ok(())
}

fn infix_chain(f: &mut Formatter<'_>, op: &str, operands: &[Expr]) -> fmt::Result {
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            write!(f, " {op} ")?;
        }
        write!(f, "{}", paren(operand))?;
    }
    Ok(())
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Empty => write!(f, "void"),
            Type::Signedbv { width } => write!(f, "int{width}_t"),
            Type::Unsignedbv { width } => write!(f, "uint{width}_t"),
            Type::Floatbv { width: 32, fraction: 23 } => write!(f, "float"),
            Type::Floatbv { width: 64, fraction: 52 } => write!(f, "double"),
            Type::Floatbv { width, fraction } => write!(f, "float{width}_{fraction}_t"),
            Type::Pointer { typ } => write!(f, "{typ}*"),
            Type::Array { typ, size } => write!(f, "{typ}[{size}]"),
            Type::Vector { typ, size } => write!(f, "{typ} __vector({size})"),
            Type::Struct { tag, .. } => write!(f, "struct {tag}"),
            Type::Code { .. } => write!(f, "code"),
        }
    }
}

/// A human readable name for the array appearing in a bounds-check comment.
pub fn array_name(expr: &Expr) -> String {
    match expr.kind() {
        ExprKind::Index => format!("{}[]", array_name(&expr.operands()[0])),
        ExprKind::Symbol { identifier } => format!("array `{identifier}'"),
        ExprKind::StringConstant { .. } => "string constant".to_string(),
        ExprKind::Member { component } => format!("member `{component}'"),
        _ => "array".to_string(),
    }
}
