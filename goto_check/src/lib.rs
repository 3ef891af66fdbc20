// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Safety check instrumentation for goto programs.
//!
//! [`check::check_model`] walks every function and inserts assertions
//! encoding the runtime-safety properties selected in [`config::Config`]:
//! array bounds, pointer validity, division by zero, integer and float
//! overflow, undefined shifts, NaN production, memory leaks and user error
//! labels. [`trace_validation`] is the companion structural check over the
//! counterexample traces the backend produces for those assertions.

mod allocations;
pub mod check;
pub mod config;
mod errors;
mod guard;
mod local_flags;
pub mod trace_validation;

pub use allocations::{Allocation, AllocationCatalog};
pub use check::{check_function, check_model};
pub use config::{CheckFlags, CheckName, Config, LanguageMode, LanguageStandard};
pub use errors::{CheckError, TraceValidationError};
pub use guard::Guard;
pub use local_flags::{FlowFlagOracle, LocalFlowAnalysis, PointerFlags, UnknownPointerOracle};
