// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The typed expression tree of a goto program.
//!
//! An `Expr` is a kind tag, a type, and a uniformly-typed operand list, plus
//! optional source-location metadata. Values are produced by the constructor
//! functions below, which enforce well-formedness, and may be freely shared.
//!
//! Structural equality and hashing ignore the source location, so two
//! occurrences of the same formula at different program points compare equal.

use crate::arith::{self, max_int, min_int};
use crate::intern::InternedString;
use crate::location::Location;
use crate::typ::Type;
use num::bigint::BigInt;
use std::hash::{Hash, Hasher};

///////////////////////////////////////////////////////////////////////////////////////////////
/// Datatypes
///////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Debug)]
pub struct Expr {
    kind: ExprKind,
    typ: Type,
    operands: Vec<Expr>,
    location: Location,
    /// When `Some(false)`, array bounds checks on this expression are
    /// suppressed.
    bounds_check: Option<bool>,
}

/// Binary operators for which the backend interprets a dedicated overflow
/// predicate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OverflowOp {
    Plus,
    Minus,
    Mult,
    Shl,
}

/// The kind tag of an expression. Payload-free operator kinds take their
/// arguments from the operand list.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExprKind {
    // leaves
    Symbol { identifier: InternedString },
    IntConstant(BigInt),
    BoolConstant(bool),
    /// IEEE bit pattern, interpreted at the expression's float type
    FloatConstant { bits: u64 },
    StringConstant { value: InternedString },
    NullPointer,
    /// Nondeterministic choice of a value of the expression's type
    Nondet,
    /// The absent expression (e.g. an array type with no size)
    Nil,
    Infinity,

    // aggregates
    Struct,
    Array,
    ArrayList,
    ArrayOf,
    Lambda,
    With,

    // lvalue forms
    Index,
    Member { component: InternedString },
    Dereference,
    AddressOf,
    ByteExtractLE,
    ByteExtractBE,

    // logic
    If,
    And,
    Or,
    Not,
    Implies,
    Forall,
    Exists,

    // relations
    Equal,
    NotEqual,
    Lt,
    Le,
    Gt,
    Ge,

    // arithmetic
    Plus,
    Minus,
    Mult,
    Div,
    Mod,
    UnaryMinus,
    Shl,
    AShr,
    LShr,
    Typecast,

    // pointer span predicates
    ROk,
    WOk,

    /// Backend-interpreted overflow predicate over two operands
    Overflow { op: OverflowOp },

    // backend-interpreted pointer and float predicates
    IsInvalidPointer,
    IsNullPointer,
    SameObject,
    DynamicObject,
    MallocObject,
    DeadObject,
    Deallocated,
    DynamicSize,
    ObjectSize,
    PointerOffset,
    IntegerAddress,
    IsInf,
    IsNan,
    IeeeFloatEqual,
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.typ == other.typ
            && self.operands == other.operands
            && self.bounds_check == other.bounds_check
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.typ.hash(state);
        self.operands.hash(state);
        self.bounds_check.hash(state);
    }
}

///////////////////////////////////////////////////////////////////////////////////////////////
/// Implementations
///////////////////////////////////////////////////////////////////////////////////////////////

/// Getters
impl Expr {
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    pub fn typ(&self) -> &Type {
        &self.typ
    }

    pub fn operands(&self) -> &[Expr] {
        &self.operands
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// `Some(false)` suppresses array bounds checks on this expression.
    pub fn bounds_check_flag(&self) -> Option<bool> {
        self.bounds_check
    }

    pub fn symbol_identifier(&self) -> Option<InternedString> {
        match self.kind {
            ExprKind::Symbol { identifier } => Some(identifier),
            _ => None,
        }
    }

    pub fn int_constant_value(&self) -> Option<BigInt> {
        match &self.kind {
            ExprKind::IntConstant(i) => Some(i.clone()),
            _ => None,
        }
    }
}

/// Fluent builders
impl Expr {
    pub fn with_location(mut self, loc: Location) -> Self {
        self.location = loc;
        self
    }

    pub fn with_bounds_check(mut self, enabled: bool) -> Self {
        self.bounds_check = Some(enabled);
        self
    }

    /// Rebuild this expression with a fresh operand list. Kind, type and
    /// location are preserved; the caller is responsible for keeping the
    /// operand types compatible.
    pub fn with_new_operands(&self, operands: Vec<Expr>) -> Self {
        assert_eq!(self.operands.len(), operands.len());
        Expr { kind: self.kind.clone(), typ: self.typ.clone(), operands, ..self.clone() }
    }
}

macro_rules! expr {
    ($kind:expr, $typ:expr) => {
        expr!($kind, $typ, vec![])
    };
    ($kind:expr, $typ:expr, $operands:expr) => {{
        Expr {
            kind: $kind,
            typ: $typ,
            operands: $operands,
            location: Location::None,
            bounds_check: None,
        }
    }};
}

/// Leaf constructors
impl Expr {
    pub fn symbol<T: Into<InternedString>>(identifier: T, typ: Type) -> Self {
        expr!(ExprKind::Symbol { identifier: identifier.into() }, typ)
    }

    pub fn int_constant<T: Into<BigInt>>(i: T, typ: Type) -> Self {
        assert!(typ.is_integer(), "integer constant of non-integer type {typ:?}");
        expr!(ExprKind::IntConstant(i.into()), typ)
    }

    pub fn zero(typ: Type) -> Self {
        Expr::int_constant(0, typ)
    }

    /// The most negative value of a signed type, `-2^(w-1)`.
    pub fn smallest_signed(typ: Type) -> Self {
        let width = typ.width().unwrap();
        assert!(typ.is_signed());
        Expr::int_constant(min_int(width, true), typ)
    }

    /// The largest value of a signed type, `2^(w-1)-1`.
    pub fn largest_signed(typ: Type) -> Self {
        let width = typ.width().unwrap();
        assert!(typ.is_signed());
        Expr::int_constant(max_int(width, true), typ)
    }

    /// The largest value of an unsigned type, `2^w-1`.
    pub fn largest_unsigned(typ: Type) -> Self {
        let width = typ.width().unwrap();
        assert!(typ.is_unsigned());
        Expr::int_constant(max_int(width, false), typ)
    }

    pub fn bool_constant(b: bool) -> Self {
        expr!(ExprKind::BoolConstant(b), Type::bool())
    }

    pub fn bool_true() -> Self {
        Expr::bool_constant(true)
    }

    pub fn bool_false() -> Self {
        Expr::bool_constant(false)
    }

    pub fn float_constant_bits(bits: u64, typ: Type) -> Self {
        assert!(typ.is_float());
        expr!(ExprKind::FloatConstant { bits }, typ)
    }

    pub fn plus_infinity(typ: Type) -> Self {
        let bits = arith::plus_infinity_bits(&typ);
        Expr::float_constant_bits(bits, typ)
    }

    pub fn minus_infinity(typ: Type) -> Self {
        let bits = arith::minus_infinity_bits(&typ);
        Expr::float_constant_bits(bits, typ)
    }

    pub fn float_zero(typ: Type) -> Self {
        Expr::float_constant_bits(0, typ)
    }

    pub fn string_constant<T: Into<InternedString>>(value: T) -> Self {
        let value = value.into();
        let size = Expr::int_constant(value.len() as u64 + 1, Type::ssize_t());
        expr!(ExprKind::StringConstant { value }, Type::c_char().array_of(size))
    }

    pub fn null_pointer(typ: Type) -> Self {
        assert!(typ.is_pointer());
        expr!(ExprKind::NullPointer, typ)
    }

    pub fn nondet(typ: Type) -> Self {
        expr!(ExprKind::Nondet, typ)
    }

    pub fn nil() -> Self {
        expr!(ExprKind::Nil, Type::empty())
    }

    pub fn infinity() -> Self {
        expr!(ExprKind::Infinity, Type::ssize_t())
    }
}

/// Aggregate constructors
impl Expr {
    pub fn struct_expr(values: Vec<Expr>, typ: Type) -> Self {
        assert!(typ.is_struct());
        expr!(ExprKind::Struct, typ, values)
    }

    pub fn array_expr(elements: Vec<Expr>, typ: Type) -> Self {
        assert!(typ.is_array());
        expr!(ExprKind::Array, typ, elements)
    }

    pub fn array_list_expr(elements: Vec<Expr>, typ: Type) -> Self {
        expr!(ExprKind::ArrayList, typ, elements)
    }

    pub fn array_of(element: Expr, typ: Type) -> Self {
        assert!(typ.is_array());
        expr!(ExprKind::ArrayOf, typ, vec![element])
    }

    pub fn lambda(binding: Expr, body: Expr, typ: Type) -> Self {
        assert!(binding.is_symbol());
        expr!(ExprKind::Lambda, typ, vec![binding, body])
    }

    pub fn with(self, key: Expr, value: Expr) -> Self {
        let typ = self.typ.clone();
        expr!(ExprKind::With, typ, vec![self, key, value])
    }
}

/// Lvalue-form constructors
impl Expr {
    /// `array[index]`
    pub fn index(self, index: Expr) -> Self {
        assert!(index.typ.is_integer(), "index must be an integer: {index:?}");
        let element = self
            .typ
            .base_type()
            .unwrap_or_else(|| panic!("index applied to non-array type {:?}", self.typ))
            .clone();
        expr!(ExprKind::Index, element, vec![self, index])
    }

    /// `compound.component`
    pub fn member<T: Into<InternedString>>(self, component: T) -> Self {
        let component = component.into();
        let typ = self
            .typ
            .lookup_component(component)
            .unwrap_or_else(|| panic!("no component {component} in {:?}", self.typ))
            .typ
            .clone();
        expr!(ExprKind::Member { component }, typ, vec![self])
    }

    /// `*self`
    pub fn dereference(self) -> Self {
        let typ = self
            .typ
            .base_type()
            .unwrap_or_else(|| panic!("dereference of non-pointer {:?}", self.typ))
            .clone();
        assert!(self.typ.is_pointer());
        expr!(ExprKind::Dereference, typ, vec![self])
    }

    /// `&self`
    pub fn address_of(self) -> Self {
        let typ = self.typ.clone().to_pointer();
        expr!(ExprKind::AddressOf, typ, vec![self])
    }

    pub fn byte_extract_le(op: Expr, offset: Expr, typ: Type) -> Self {
        expr!(ExprKind::ByteExtractLE, typ, vec![op, offset])
    }

    pub fn byte_extract_be(op: Expr, offset: Expr, typ: Type) -> Self {
        expr!(ExprKind::ByteExtractBE, typ, vec![op, offset])
    }
}

/// Logic constructors
impl Expr {
    pub fn if_then_else(cond: Expr, t: Expr, e: Expr) -> Self {
        assert!(cond.typ.is_bool());
        assert_eq!(t.typ, e.typ, "if branches must agree: {t:?} vs {e:?}");
        let typ = t.typ.clone();
        expr!(ExprKind::If, typ, vec![cond, t, e])
    }

    /// n-ary conjunction; the empty conjunction is `true`.
    pub fn conjunction(mut conjuncts: Vec<Expr>) -> Self {
        assert!(conjuncts.iter().all(|c| c.typ.is_bool()));
        match conjuncts.len() {
            0 => Expr::bool_true(),
            1 => conjuncts.pop().unwrap(),
            _ => expr!(ExprKind::And, Type::bool(), conjuncts),
        }
    }

    /// n-ary disjunction; the empty disjunction is `false`.
    pub fn disjunction(mut disjuncts: Vec<Expr>) -> Self {
        assert!(disjuncts.iter().all(|d| d.typ.is_bool()));
        match disjuncts.len() {
            0 => Expr::bool_false(),
            1 => disjuncts.pop().unwrap(),
            _ => expr!(ExprKind::Or, Type::bool(), disjuncts),
        }
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::conjunction(vec![self, other])
    }

    pub fn or(self, other: Expr) -> Self {
        Expr::disjunction(vec![self, other])
    }

    pub fn not(self) -> Self {
        assert!(self.typ.is_bool());
        expr!(ExprKind::Not, Type::bool(), vec![self])
    }

    /// Negate a Boolean, removing a double negation if one would arise.
    pub fn boolean_negate(self) -> Self {
        assert!(self.typ.is_bool());
        if let ExprKind::Not = self.kind {
            self.operands.into_iter().next().unwrap()
        } else {
            self.not()
        }
    }

    pub fn implies(self, consequent: Expr) -> Self {
        assert!(self.typ.is_bool() && consequent.typ.is_bool());
        expr!(ExprKind::Implies, Type::bool(), vec![self, consequent])
    }

    pub fn forall(binding: Expr, body: Expr) -> Self {
        assert!(binding.is_symbol() && body.typ.is_bool());
        expr!(ExprKind::Forall, Type::bool(), vec![binding, body])
    }

    pub fn exists(binding: Expr, body: Expr) -> Self {
        assert!(binding.is_symbol() && body.typ.is_bool());
        expr!(ExprKind::Exists, Type::bool(), vec![binding, body])
    }
}

macro_rules! relation {
    ($name:ident, $kind:expr) => {
        pub fn $name(self, other: Expr) -> Self {
            assert_eq!(
                self.typ, other.typ,
                "relation operands must have the same type: {self:?} vs {other:?}"
            );
            expr!($kind, Type::bool(), vec![self, other])
        }
    };
}

/// Relations
impl Expr {
    relation!(eq, ExprKind::Equal);
    relation!(neq, ExprKind::NotEqual);
    relation!(lt, ExprKind::Lt);
    relation!(le, ExprKind::Le);
    relation!(gt, ExprKind::Gt);
    relation!(ge, ExprKind::Ge);
}

macro_rules! binary_arith {
    ($name:ident, $kind:expr) => {
        pub fn $name(self, other: Expr) -> Self {
            let typ = self.typ.clone();
            expr!($kind, typ, vec![self, other])
        }
    };
}

/// Arithmetic
impl Expr {
    binary_arith!(plus, ExprKind::Plus);
    binary_arith!(sub, ExprKind::Minus);
    binary_arith!(mul, ExprKind::Mult);
    binary_arith!(div, ExprKind::Div);
    binary_arith!(rem, ExprKind::Mod);
    binary_arith!(shl, ExprKind::Shl);
    binary_arith!(ashr, ExprKind::AShr);
    binary_arith!(lshr, ExprKind::LShr);

    pub fn neg(self) -> Self {
        let typ = self.typ.clone();
        expr!(ExprKind::UnaryMinus, typ, vec![self])
    }

    /// n-ary `+` or `*`, as frontends produce them.
    pub fn multi_ary(kind: ExprKind, operands: Vec<Expr>, typ: Type) -> Self {
        assert!(matches!(kind, ExprKind::Plus | ExprKind::Mult));
        assert!(operands.len() >= 2);
        expr!(kind, typ, operands)
    }

    pub fn cast_to(self, typ: Type) -> Self {
        expr!(ExprKind::Typecast, typ, vec![self])
    }

    /// Cast only when the target type differs.
    pub fn conditional_cast(self, typ: &Type) -> Self {
        if &self.typ == typ { self } else { self.cast_to(typ.clone()) }
    }
}

/// Backend-interpreted predicates
impl Expr {
    pub fn overflow(op: OverflowOp, a: Expr, b: Expr) -> Self {
        expr!(ExprKind::Overflow { op }, Type::bool(), vec![a, b])
    }

    pub fn r_ok(pointer: Expr, size: Expr) -> Self {
        assert!(pointer.typ.is_pointer());
        expr!(ExprKind::ROk, Type::bool(), vec![pointer, size])
    }

    pub fn w_ok(pointer: Expr, size: Expr) -> Self {
        assert!(pointer.typ.is_pointer());
        expr!(ExprKind::WOk, Type::bool(), vec![pointer, size])
    }

    pub fn same_object(a: Expr, b: Expr) -> Self {
        assert!(a.typ.is_pointer() && b.typ.is_pointer());
        expr!(ExprKind::SameObject, Type::bool(), vec![a, b])
    }

    pub fn is_invalid_pointer(pointer: Expr) -> Self {
        expr!(ExprKind::IsInvalidPointer, Type::bool(), vec![pointer])
    }

    pub fn is_null_pointer(pointer: Expr) -> Self {
        expr!(ExprKind::IsNullPointer, Type::bool(), vec![pointer])
    }

    pub fn dynamic_object(pointer: Expr) -> Self {
        expr!(ExprKind::DynamicObject, Type::bool(), vec![pointer])
    }

    pub fn malloc_object(pointer: Expr) -> Self {
        expr!(ExprKind::MallocObject, Type::bool(), vec![pointer])
    }

    pub fn dead_object(pointer: Expr) -> Self {
        expr!(ExprKind::DeadObject, Type::bool(), vec![pointer])
    }

    pub fn deallocated(pointer: Expr) -> Self {
        expr!(ExprKind::Deallocated, Type::bool(), vec![pointer])
    }

    /// The run-time size of the most recently malloc'd object.
    pub fn dynamic_size() -> Self {
        expr!(ExprKind::DynamicSize, Type::size_t())
    }

    pub fn object_size(pointer: Expr) -> Self {
        expr!(ExprKind::ObjectSize, Type::size_t(), vec![pointer])
    }

    pub fn pointer_offset(pointer: Expr) -> Self {
        expr!(ExprKind::PointerOffset, Type::ssize_t(), vec![pointer])
    }

    pub fn integer_address(pointer: Expr) -> Self {
        expr!(ExprKind::IntegerAddress, Type::bool(), vec![pointer])
    }

    pub fn isinf(op: Expr) -> Self {
        assert!(op.typ.is_float());
        expr!(ExprKind::IsInf, Type::bool(), vec![op])
    }

    pub fn isnan(op: Expr) -> Self {
        assert!(op.typ.is_float());
        expr!(ExprKind::IsNan, Type::bool(), vec![op])
    }

    pub fn ieee_float_equal(self, other: Expr) -> Self {
        assert_eq!(self.typ, other.typ);
        expr!(ExprKind::IeeeFloatEqual, Type::bool(), vec![self, other])
    }
}

/// Predicates
impl Expr {
    pub fn is_symbol(&self) -> bool {
        matches!(self.kind, ExprKind::Symbol { .. })
    }

    pub fn is_boolean(&self) -> bool {
        self.typ.is_bool()
    }

    pub fn is_true(&self) -> bool {
        matches!(self.kind, ExprKind::BoolConstant(true))
    }

    pub fn is_false(&self) -> bool {
        matches!(self.kind, ExprKind::BoolConstant(false))
    }

    pub fn is_zero(&self) -> bool {
        match &self.kind {
            ExprKind::IntConstant(i) => i == &BigInt::from(0),
            ExprKind::FloatConstant { bits } => arith::is_zero_bits(*bits, &self.typ),
            _ => false,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self.kind, ExprKind::Nil)
    }

    pub fn is_infinity(&self) -> bool {
        matches!(self.kind, ExprKind::Infinity)
    }

    pub fn is_constant(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::IntConstant(_)
                | ExprKind::BoolConstant(_)
                | ExprKind::FloatConstant { .. }
                | ExprKind::StringConstant { .. }
                | ExprKind::NullPointer
        )
    }

    /// Recursively search for a sub-expression satisfying `pred`, including
    /// the expression itself.
    pub fn has_subexpr<F: Fn(&Expr) -> bool + Copy>(&self, pred: F) -> bool {
        pred(self) || self.operands.iter().any(|op| op.has_subexpr(pred))
    }

    pub fn mentions_symbol(&self, identifier: InternedString) -> bool {
        self.has_subexpr(|e| e.symbol_identifier() == Some(identifier))
    }

    pub fn mentions_dereference(&self) -> bool {
        self.has_subexpr(|e| matches!(e.kind, ExprKind::Dereference))
    }

    pub fn mentions_rw_ok(&self) -> bool {
        self.has_subexpr(|e| matches!(e.kind, ExprKind::ROk | ExprKind::WOk))
    }

    /// Strip any outer typecasts.
    pub fn skip_typecast(&self) -> &Expr {
        let mut e = self;
        while let ExprKind::Typecast = e.kind {
            e = &e.operands[0];
        }
        e
    }
}

/// Helpers for the operator spelling used in diagnostics and comments.
impl ExprKind {
    pub fn operator_name(&self) -> &'static str {
        match self {
            ExprKind::Plus => "+",
            ExprKind::Minus => "-",
            ExprKind::Mult => "*",
            ExprKind::Div => "/",
            ExprKind::Mod => "mod",
            ExprKind::UnaryMinus => "unary-",
            ExprKind::Shl => "shl",
            ExprKind::AShr => "ashr",
            ExprKind::LShr => "lshr",
            _ => "?",
        }
    }
}
