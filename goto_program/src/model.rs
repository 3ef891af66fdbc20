// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::instruction::GotoProgram;
use crate::intern::InternedString;
use crate::symbol_table::SymbolTable;
use std::collections::BTreeMap;

/// The identifier of the synthetic program entry point.
pub const ENTRY_POINT: &str = "__CPROVER__start";

/// A whole program: a symbol table and one body per function.
#[derive(Debug, Default)]
pub struct GotoModel {
    pub symbol_table: SymbolTable,
    pub functions: BTreeMap<InternedString, GotoProgram>,
}

impl GotoModel {
    pub fn new(symbol_table: SymbolTable) -> GotoModel {
        GotoModel { symbol_table, functions: BTreeMap::new() }
    }

    pub fn insert_function<T: Into<InternedString>>(&mut self, name: T, body: GotoProgram) {
        self.functions.insert(name.into(), body);
    }
}
