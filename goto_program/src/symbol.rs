// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::expr::Expr;
use crate::intern::InternedString;
use crate::typ::Type;

/// A symbol-table entry: a named, typed program object.
///
/// `mode` names the language frontend the symbol came from (`"C"`, `"C++"`,
/// `"java"`); the check pass adapts some rules to the mode of the function it
/// instruments.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: InternedString,
    pub typ: Type,
    pub mode: InternedString,
    pub is_static_lifetime: bool,
}

impl Symbol {
    pub fn new<N: Into<InternedString>, M: Into<InternedString>>(
        name: N,
        typ: Type,
        mode: M,
    ) -> Symbol {
        Symbol { name: name.into(), typ, mode: mode.into(), is_static_lifetime: false }
    }

    pub fn with_static_lifetime(mut self) -> Symbol {
        self.is_static_lifetime = true;
        self
    }

    /// Produces an expression from a symbol.
    pub fn symbol_expr(&self) -> Expr {
        Expr::symbol(self.name, self.typ.clone())
    }
}
