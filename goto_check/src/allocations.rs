// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::config::Config;
use crate::errors::CheckError;
use goto_program::{Expr, GotoModel, InstructionBody, CPROVER_PREFIX};
use tracing::debug;

/// An explicitly declared memory region: base address and size.
#[derive(Clone, Debug)]
pub struct Allocation {
    pub base: Expr,
    pub size: Expr,
}

/// All `__CPROVER_allocated_memory(base, size)` regions of a program.
/// Collected once, immutable afterwards; pointer checks are conservatively
/// dischargeable against these regions.
#[derive(Debug, Default)]
pub struct AllocationCatalog {
    allocations: Vec<Allocation>,
}

impl AllocationCatalog {
    /// Scan every function for allocation declarations. Skipped entirely when
    /// neither pointer nor bounds checks are enabled. A declaration with the
    /// wrong arity or argument types is fatal.
    pub fn collect(model: &GotoModel, config: &Config) -> Result<AllocationCatalog, CheckError> {
        let mut catalog = AllocationCatalog::default();

        if !config.flags.pointer_check && !config.flags.bounds_check {
            return Ok(catalog);
        }

        let callee_name = format!("{CPROVER_PREFIX}allocated_memory");
        for body in model.functions.values() {
            for instruction in &body.instructions {
                let InstructionBody::FunctionCall { function, arguments, .. } =
                    instruction.body()
                else {
                    continue;
                };
                let Some(id) = function.symbol_identifier() else { continue };
                if id != callee_name {
                    continue;
                }

                let well_formed = arguments.len() == 2
                    && arguments[0].typ().is_unsigned()
                    && arguments[1].typ().is_unsigned()
                    && arguments[0].typ() == arguments[1].typ();
                if !well_formed {
                    return Err(CheckError::MalformedAllocationCall {
                        callee: callee_name,
                        arguments: arguments
                            .iter()
                            .map(Expr::to_string)
                            .collect::<Vec<_>>()
                            .join(", "),
                    });
                }

                catalog.allocations.push(Allocation {
                    base: arguments[0].clone(),
                    size: arguments[1].clone(),
                });
            }
        }

        debug!(count = catalog.allocations.len(), "collected allocation declarations");
        Ok(catalog)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Allocation> {
        self.allocations.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }
}
