// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::intern::InternedString;
use crate::symbol::Symbol;
use std::collections::BTreeMap;

/// The symbol table, which doubles as the namespace the pass resolves
/// identifiers against.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbol_table: BTreeMap<InternedString, Symbol>,
}

/// Constructors
impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable { symbol_table: BTreeMap::new() }
    }
}

/// Setters
impl SymbolTable {
    pub fn insert(&mut self, symbol: Symbol) {
        self.symbol_table.insert(symbol.name, symbol);
    }
}

/// Getters
impl SymbolTable {
    pub fn lookup<T: Into<InternedString>>(&self, name: T) -> Option<&Symbol> {
        self.symbol_table.get(&name.into())
    }

    pub fn contains<T: Into<InternedString>>(&self, name: T) -> bool {
        self.symbol_table.contains_key(&name.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&InternedString, &Symbol)> {
        self.symbol_table.iter()
    }
}
