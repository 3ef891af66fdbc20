// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::expr::Expr;
use crate::intern::InternedString;
use num::bigint::BigInt;

/// The type of a goto-program expression.
///
/// Bitvector widths, float layouts and array sizes are carried verbatim; the
/// array size is an expression so that incomplete (`nil`) and infinite sizes
/// can be represented.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// `__CPROVER_bool`
    Bool,
    /// `void`
    Empty,
    /// `int<width>_t`
    Signedbv { width: u64 },
    /// `uint<width>_t`
    Unsignedbv { width: u64 },
    /// An IEEE 754 binary float: total `width` bits, `fraction` bits of
    /// significand (not counting the hidden bit).
    Floatbv { width: u64, fraction: u64 },
    /// `typ*`
    Pointer { typ: Box<Type> },
    /// `typ x[size]`
    Array { typ: Box<Type>, size: Box<Expr> },
    /// SIMD vector of `size` elements
    Vector { typ: Box<Type>, size: Box<Expr> },
    /// `struct tag { components }`
    Struct { tag: InternedString, components: Vec<DatatypeComponent> },
    /// Function type. `has_this` marks member functions whose first
    /// parameter is the receiver.
    Code { parameters: Vec<Parameter>, return_type: Box<Type>, has_this: bool },
}

/// A struct field
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DatatypeComponent {
    pub name: InternedString,
    pub typ: Type,
}

/// Function and procedure parameters
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Parameter {
    pub identifier: Option<InternedString>,
    pub typ: Type,
}

/// Constructors
impl Type {
    pub fn bool() -> Self {
        Type::Bool
    }

    pub fn empty() -> Self {
        Type::Empty
    }

    pub fn signed_int(width: u64) -> Self {
        assert!(width > 0);
        Type::Signedbv { width }
    }

    pub fn unsigned_int(width: u64) -> Self {
        assert!(width > 0);
        Type::Unsignedbv { width }
    }

    pub fn floatbv(width: u64, fraction: u64) -> Self {
        assert!(fraction + 1 < width);
        Type::Floatbv { width, fraction }
    }

    /// IEEE 754 single precision
    pub fn float() -> Self {
        Type::floatbv(32, 23)
    }

    /// IEEE 754 double precision
    pub fn double() -> Self {
        Type::floatbv(64, 52)
    }

    /// The type of object sizes, 64-bit machines assumed.
    pub fn size_t() -> Self {
        Type::unsigned_int(64)
    }

    /// The type of pointer offsets, 64-bit machines assumed.
    pub fn ssize_t() -> Self {
        Type::signed_int(64)
    }

    pub fn c_int() -> Self {
        Type::signed_int(32)
    }

    pub fn c_char() -> Self {
        Type::signed_int(8)
    }

    pub fn to_pointer(self) -> Self {
        Type::Pointer { typ: Box::new(self) }
    }

    pub fn array_of(self, size: Expr) -> Self {
        Type::Array { typ: Box::new(self), size: Box::new(size) }
    }

    pub fn vector_of(self, size: Expr) -> Self {
        Type::Vector { typ: Box::new(self), size: Box::new(size) }
    }

    pub fn struct_type<T: Into<InternedString>>(
        tag: T,
        components: Vec<DatatypeComponent>,
    ) -> Self {
        Type::Struct { tag: tag.into(), components }
    }

    pub fn code(parameters: Vec<Parameter>, return_type: Type) -> Self {
        Type::Code { parameters, return_type: Box::new(return_type), has_this: false }
    }

    pub fn code_with_this(parameters: Vec<Parameter>, return_type: Type) -> Self {
        assert!(!parameters.is_empty());
        Type::Code { parameters, return_type: Box::new(return_type), has_this: true }
    }

    pub fn component<T: Into<InternedString>>(name: T, typ: Type) -> DatatypeComponent {
        DatatypeComponent { name: name.into(), typ }
    }

    pub fn parameter(identifier: Option<InternedString>, typ: Type) -> Parameter {
        Parameter { identifier, typ }
    }
}

/// Predicates and getters
impl Type {
    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Bool)
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Type::Signedbv { .. })
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(self, Type::Unsignedbv { .. })
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::Floatbv { .. })
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Type::Vector { .. })
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Type::Struct { .. })
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Type::Code { .. })
    }

    /// Bitvector width for integer and float types.
    pub fn width(&self) -> Option<u64> {
        match self {
            Type::Signedbv { width } | Type::Unsignedbv { width } | Type::Floatbv { width, .. } => {
                Some(*width)
            }
            _ => None,
        }
    }

    /// The pointed-to type of a pointer, or the element type of an array or
    /// vector.
    pub fn base_type(&self) -> Option<&Type> {
        match self {
            Type::Pointer { typ } | Type::Array { typ, .. } | Type::Vector { typ, .. } => {
                Some(typ)
            }
            _ => None,
        }
    }

    pub fn array_size(&self) -> Option<&Expr> {
        match self {
            Type::Array { size, .. } | Type::Vector { size, .. } => Some(size),
            _ => None,
        }
    }

    pub fn components(&self) -> Option<&[DatatypeComponent]> {
        match self {
            Type::Struct { components, .. } => Some(components),
            _ => None,
        }
    }

    pub fn lookup_component<T: Into<InternedString>>(
        &self,
        name: T,
    ) -> Option<&DatatypeComponent> {
        let name = name.into();
        self.components()?.iter().find(|c| c.name == name)
    }

    pub fn return_type(&self) -> Option<&Type> {
        match self {
            Type::Code { return_type, .. } => Some(return_type),
            _ => None,
        }
    }

    pub fn parameters(&self) -> Option<&[Parameter]> {
        match self {
            Type::Code { parameters, .. } => Some(parameters),
            _ => None,
        }
    }

    pub fn has_this(&self) -> bool {
        matches!(self, Type::Code { has_this: true, .. })
    }
}

/// Size and layout queries. No padding model; fields are packed.
impl Type {
    /// The size of an object of this type in bytes, when known at compile
    /// time. `None` for incomplete arrays, code types and `void`.
    pub fn size_of(&self) -> Option<BigInt> {
        match self {
            Type::Bool => Some(BigInt::from(1)),
            Type::Empty | Type::Code { .. } => None,
            Type::Signedbv { width } | Type::Unsignedbv { width } | Type::Floatbv { width, .. } => {
                Some(BigInt::from(width.div_ceil(8)))
            }
            Type::Pointer { .. } => Some(BigInt::from(8)),
            Type::Array { typ, size } | Type::Vector { typ, size } => {
                let count = size.int_constant_value()?;
                Some(typ.size_of()? * count)
            }
            Type::Struct { components, .. } => {
                let mut total = BigInt::from(0);
                for c in components {
                    total += c.typ.size_of()?;
                }
                Some(total)
            }
        }
    }

    /// The byte offset of field `name` within this struct type.
    pub fn member_offset<T: Into<InternedString>>(&self, name: T) -> Option<BigInt> {
        let name = name.into();
        let components = self.components()?;
        let mut offset = BigInt::from(0);
        for c in components {
            if c.name == name {
                return Some(offset);
            }
            offset += c.typ.size_of()?;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::Type;
    use crate::expr::Expr;
    use num::bigint::BigInt;

    #[test]
    fn widths_and_sizes() {
        assert_eq!(Type::c_int().width(), Some(32));
        assert_eq!(Type::double().size_of(), Some(BigInt::from(8)));
        assert_eq!(Type::c_char().to_pointer().size_of(), Some(BigInt::from(8)));
        let arr = Type::c_int().array_of(Expr::int_constant(10, Type::ssize_t()));
        assert_eq!(arr.size_of(), Some(BigInt::from(40)));
        assert!(Type::c_int().array_of(Expr::nil()).size_of().is_none());
    }

    #[test]
    fn member_offsets_are_packed() {
        let st = Type::struct_type(
            "pair",
            vec![
                Type::component("first", Type::c_int()),
                Type::component("second", Type::double()),
            ],
        );
        assert_eq!(st.member_offset("first"), Some(BigInt::from(0)));
        assert_eq!(st.member_offset("second"), Some(BigInt::from(4)));
        assert_eq!(st.member_offset("third"), None);
    }
}
