// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed representations of goto programs: expressions, types, instructions,
//! symbol tables, and the supporting algebra (simplification, object
//! descriptors, printing) that analysis passes build on.

pub mod arith;
mod expr;
mod instruction;
mod intern;
mod location;
mod model;
mod object_descriptor;
pub mod printer;
pub mod simplify;
mod symbol;
mod symbol_table;
mod typ;

pub use expr::{Expr, ExprKind, OverflowOp};
pub use instruction::{GotoProgram, Instruction, InstructionBody, InstructionId, OtherCode};
pub use intern::{InternString, InternStringOption, InternedString};
pub use location::Location;
pub use model::{GotoModel, ENTRY_POINT};
pub use object_descriptor::ObjectDescriptor;
pub use symbol::Symbol;
pub use symbol_table::SymbolTable;
pub use typ::{DatatypeComponent, Parameter, Type};

/// Reserved prefix of the verification intrinsics a frontend may emit.
pub const CPROVER_PREFIX: &str = "__CPROVER_";
