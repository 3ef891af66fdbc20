// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::expr::{Expr, ExprKind};
use crate::typ::Type;

/// Decomposition of an lvalue expression into the object it lives in and a
/// byte offset relative to that object.
#[derive(Clone, Debug)]
pub struct ObjectDescriptor {
    root_object: Expr,
    offset: Expr,
}

impl ObjectDescriptor {
    /// Peel `Index` and `Member` layers off `expr`, accumulating a byte
    /// offset. An index or member whose element size is not known at compile
    /// time makes the expression its own root.
    pub fn build(expr: &Expr) -> ObjectDescriptor {
        match expr.kind() {
            ExprKind::Index => {
                let [array, index] = expr.operands() else { unreachable!() };
                if let Some(element_size) = expr.typ().size_of() {
                    let mut inner = ObjectDescriptor::build(array);
                    let scaled = index
                        .clone()
                        .conditional_cast(&Type::ssize_t())
                        .mul(Expr::int_constant(element_size, Type::ssize_t()));
                    inner.offset = inner.offset.plus(scaled);
                    return inner;
                }
                ObjectDescriptor::root(expr)
            }
            ExprKind::Member { component } => {
                let [compound] = expr.operands() else { unreachable!() };
                if let Some(byte_offset) = compound.typ().member_offset(*component) {
                    let mut inner = ObjectDescriptor::build(compound);
                    inner.offset = inner
                        .offset
                        .plus(Expr::int_constant(byte_offset, Type::ssize_t()));
                    return inner;
                }
                ObjectDescriptor::root(expr)
            }
            _ => ObjectDescriptor::root(expr),
        }
    }

    fn root(expr: &Expr) -> ObjectDescriptor {
        ObjectDescriptor {
            root_object: expr.clone(),
            offset: Expr::zero(Type::ssize_t()),
        }
    }

    pub fn root_object(&self) -> &Expr {
        &self.root_object
    }

    pub fn offset(&self) -> &Expr {
        &self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::ObjectDescriptor;
    use crate::expr::Expr;
    use crate::simplify::simplify;
    use crate::typ::Type;
    use num::bigint::BigInt;

    #[test]
    fn index_scales_by_element_size() {
        let arr_typ = Type::double().array_of(Expr::int_constant(8, Type::ssize_t()));
        let a = Expr::symbol("a", arr_typ);
        let e = a.clone().index(Expr::int_constant(3, Type::ssize_t()));
        let od = ObjectDescriptor::build(&e);
        assert_eq!(od.root_object(), &a);
        assert_eq!(
            simplify(od.offset()).int_constant_value(),
            Some(BigInt::from(24))
        );
    }

    #[test]
    fn member_of_index_accumulates() {
        let pair = Type::struct_type(
            "pair",
            vec![
                Type::component("first", Type::c_int()),
                Type::component("second", Type::c_int()),
            ],
        );
        let arr_typ = pair.array_of(Expr::int_constant(2, Type::ssize_t()));
        let a = Expr::symbol("a", arr_typ);
        let e = a
            .clone()
            .index(Expr::int_constant(1, Type::ssize_t()))
            .member("second");
        let od = ObjectDescriptor::build(&e);
        assert_eq!(od.root_object(), &a);
        assert_eq!(
            simplify(od.offset()).int_constant_value(),
            Some(BigInt::from(12))
        );
    }

    #[test]
    fn dereference_is_its_own_root() {
        let p = Expr::symbol("p", Type::c_int().to_pointer());
        let deref = p.dereference();
        let od = ObjectDescriptor::build(&deref);
        assert_eq!(od.root_object(), &deref);
        assert!(od.offset().is_zero());
    }
}
