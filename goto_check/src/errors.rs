// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use thiserror::Error;

/// Fatal structural problems that abort the pass. Anything recoverable (a
/// missing size, an unknown symbol) skips the single affected check instead.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("expected two unsigned arguments of equal width to {callee}, got ({arguments})")]
    MalformedAllocationCall { callee: String, arguments: String },

    #[error("index applied to pointer-typed operand: {expr}")]
    IndexOfPointer { expr: String },

    #[error("bounds check expected an array or vector, got {typ} in {expr}")]
    BoundsCheckBadType { typ: String, expr: String },
}

/// A counterexample trace step that violates the structural assumptions the
/// trace consumers rely on.
#[derive(Debug, Error)]
pub enum TraceValidationError {
    #[error("LHS trace check failed: {reason}: {expr}")]
    Lhs { reason: &'static str, expr: String },

    #[error("RHS trace check failed: {reason}: {expr}")]
    Rhs { reason: &'static str, expr: String },
}
