// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The check insertion pass.
//!
//! For every instruction, the relevant sub-expressions (condition, assigned
//! values, call operands, return value, throw operand) are walked post-order
//! while a path condition is accumulated across short-circuit operators and
//! conditionals. Each operator that can go wrong emits a guarded assertion
//! into a patch buffer, which is spliced in front of the instruction once it
//! has been processed; stable instruction ids keep jump targets intact.

mod arithmetic;
mod bounds;
mod float;
mod pointer;

use crate::allocations::AllocationCatalog;
use crate::config::{CheckFlags, CheckName, Config, LanguageMode, LanguageStandard};
use crate::errors::CheckError;
use crate::guard::Guard;
use crate::local_flags::{FlowFlagOracle, LocalFlowAnalysis};
use goto_program::simplify::simplify;
use goto_program::{
    Expr, ExprKind, GotoModel, GotoProgram, Instruction, InstructionBody, InstructionId,
    InternedString, Location, OtherCode, SymbolTable, Type, CPROVER_PREFIX, ENTRY_POINT,
};
use std::collections::HashSet;
use tracing::debug;

/// Instrument every function of `model` according to `config`.
pub fn check_model(model: &mut GotoModel, config: &Config) -> Result<(), CheckError> {
    let allocations = AllocationCatalog::collect(model, config)?;
    let GotoModel { symbol_table, functions } = model;
    for (name, body) in functions.iter_mut() {
        check_function(*name, body, symbol_table, config, &allocations)?;
    }
    Ok(())
}

/// Instrument a single function body.
pub fn check_function(
    function_identifier: InternedString,
    body: &mut GotoProgram,
    ns: &SymbolTable,
    config: &Config,
    allocations: &AllocationCatalog,
) -> Result<(), CheckError> {
    let mode = ns
        .lookup(function_identifier)
        .map(|symbol| LanguageMode::from_symbol_mode(symbol.mode))
        .unwrap_or(LanguageMode::C);

    let oracle = LocalFlowAnalysis::analyze(body, ns);

    let mut pass = GotoCheck {
        ns,
        allocations,
        oracle: &oracle,
        flags: config.flags,
        error_labels: config.error_labels.clone(),
        language_standard: config.language_standard,
        mode,
        current_target: InstructionId::fresh(),
        new_code: Vec::new(),
        assertions: HashSet::new(),
    };
    pass.run(function_identifier, body)
}

/// A guarded assertion together with the failure it describes.
pub(crate) struct Condition {
    pub(crate) assertion: Expr,
    pub(crate) description: &'static str,
}

pub(crate) struct GotoCheck<'a> {
    ns: &'a SymbolTable,
    allocations: &'a AllocationCatalog,
    oracle: &'a dyn FlowFlagOracle,
    /// The active toggles, possibly narrowed by the current instruction's
    /// pragmas.
    flags: CheckFlags,
    error_labels: Vec<InternedString>,
    language_standard: LanguageStandard,
    mode: LanguageMode,
    /// The instruction being checked, for flow-flag queries.
    current_target: InstructionId,
    /// Instructions to splice in before the current one.
    new_code: Vec<Instruction>,
    /// Already-emitted assertions of the current straight-line region.
    assertions: HashSet<Expr>,
}

impl GotoCheck<'_> {
    fn run(
        &mut self,
        function_identifier: InternedString,
        body: &mut GotoProgram,
    ) -> Result<(), CheckError> {
        debug!(function = %function_identifier, "check insertion");
        self.assertions.clear();
        body.update();

        let mut did_something = false;
        let mut idx = 0;
        while idx < body.instructions.len() {
            let saved_flags = self.flags;

            let source_location = {
                let i = &mut body.instructions[idx];
                self.current_target = i.id();

                for pragma in i.pragmas() {
                    if let Some(check) = CheckName::from_disable_pragma(*pragma) {
                        self.flags.disable(check);
                    }
                }

                // recorded assertions stay valid only along straight-line code
                if self.flags.retain_trivial || i.is_target() {
                    self.assertions.clear();
                }

                if let Some(cond) = i.condition().cloned() {
                    self.check(&cond)?;
                    if cond.mentions_rw_ok() {
                        i.set_condition(self.rw_ok_check(&cond));
                    }
                }

                let matched_labels: Vec<InternedString> = self
                    .error_labels
                    .iter()
                    .filter(|label| i.labels().contains(*label))
                    .copied()
                    .collect();
                for label in matched_labels {
                    let comment = format!("error label {label}");
                    let t = if self.flags.assert_to_assume {
                        Instruction::assume(
                            Expr::bool_false(),
                            i.source_location().with_property(comment.as_str(), "error label"),
                        )
                    } else {
                        Instruction::assert_false("error label", &comment, *i.source_location())
                            .with_user_provided()
                    };
                    self.new_code.push(t);
                }

                did_something |=
                    self.check_instruction(function_identifier, i)?;

                *i.source_location()
            };

            for t in &mut self.new_code {
                let loc = t.source_location().with_fallback(&source_location);
                t.set_source_location(loc);
            }

            // splice in front of the instruction; ids keep targets stable
            let patch: Vec<Instruction> = self.new_code.drain(..).collect();
            did_something |= !patch.is_empty();
            let inserted = patch.len();
            body.instructions.splice(idx..idx, patch);
            idx += inserted + 1;

            self.flags = saved_flags;
        }

        if did_something {
            body.remove_skip();
        }
        Ok(())
    }

    /// Kind-specific handling. Returns whether the instruction itself was
    /// rewritten.
    fn check_instruction(
        &mut self,
        function_identifier: InternedString,
        i: &mut Instruction,
    ) -> Result<bool, CheckError> {
        match i.body().clone() {
            InstructionBody::Other(OtherCode::Expression(code)) => {
                self.check(&code)?;
            }

            InstructionBody::Other(OtherCode::Printf { arguments }) => {
                for arg in &arguments {
                    self.check(arg)?;
                }
            }

            InstructionBody::Assign { lhs, rhs } => {
                self.check(&lhs)?;
                self.check(&rhs)?;

                // the assignment invalidates any assertion about the lhs
                self.invalidate(&lhs);

                if rhs.mentions_rw_ok() {
                    let rewritten = self.rw_ok_check(&rhs);
                    if let InstructionBody::Assign { rhs, .. } = i.body_mut() {
                        *rhs = rewritten;
                    }
                }
            }

            InstructionBody::FunctionCall { lhs, function, arguments } => {
                self.check_method_receiver(&function, &arguments, i.source_location());
                if let Some(lhs) = &lhs {
                    self.check(lhs)?;
                }
                self.check(&function)?;
                for arg in &arguments {
                    self.check(arg)?;
                }
                // the call may alias anything
                self.assertions.clear();
            }

            InstructionBody::Return { value: Some(value) } => {
                self.check(&value)?;
                self.invalidate(&value);

                if value.mentions_rw_ok() {
                    let rewritten = self.rw_ok_check(&value);
                    if let InstructionBody::Return { value: Some(v) } = i.body_mut() {
                        *v = rewritten;
                    }
                }
            }

            InstructionBody::Return { value: None } => {}

            InstructionBody::Throw { operand } => {
                if let [pointer] = operand.operands() {
                    if pointer.typ().is_pointer() {
                        let not_null = pointer
                            .clone()
                            .neq(Expr::null_pointer(pointer.typ().clone()));
                        self.add_guarded_property(
                            not_null,
                            "throwing null",
                            "pointer dereference",
                            *i.source_location(),
                            pointer,
                            &Guard::new(),
                        );
                    }
                }
                // this has no successor
                self.assertions.clear();
            }

            InstructionBody::Assert { user_provided, .. } => {
                let is_error_label = i
                    .source_location()
                    .property_class()
                    .map(|class| class == "error label")
                    .unwrap_or(false);
                if (user_provided && !self.flags.assertions && !is_error_label)
                    || (!user_provided && !self.flags.built_in_assertions)
                {
                    i.turn_into_skip();
                    return Ok(true);
                }
            }

            InstructionBody::Assume { .. } => {
                if !self.flags.assumptions {
                    i.turn_into_skip();
                    return Ok(true);
                }
            }

            InstructionBody::Dead { symbol } => {
                self.check_dead(&symbol, i.source_location());
            }

            InstructionBody::EndFunction => {
                if function_identifier == ENTRY_POINT && self.flags.memory_leak_check {
                    self.memory_leak_check(function_identifier);
                }
            }

            InstructionBody::Goto { .. } | InstructionBody::Skip => {}
        }
        Ok(false)
    }

    /// In Java mode, the receiver of a non-static method call must not be
    /// null.
    fn check_method_receiver(
        &mut self,
        function: &Expr,
        arguments: &[Expr],
        source_location: &Location,
    ) {
        if self.mode != LanguageMode::Java || !self.flags.pointer_check {
            return;
        }
        if arguments.is_empty() || !function.typ().is_code() || !function.typ().has_this() {
            return;
        }
        let receiver = &arguments[0];
        if !receiver.typ().is_pointer() {
            return;
        }

        let flags = self.oracle.get(self.current_target, receiver);
        if flags.is_unknown() || flags.is_null() {
            let not_null =
                receiver.clone().neq(Expr::null_pointer(receiver.typ().clone()));
            self.add_guarded_property(
                not_null,
                "this is null on method invocation",
                "pointer dereference",
                *source_location,
                receiver,
                &Guard::new(),
            );
        }
    }

    /// A dirty local going out of scope nondeterministically becomes the
    /// dead-object sentinel, so later dereferences can be caught.
    fn check_dead(&mut self, symbol: &Expr, source_location: &Location) {
        if !self.flags.pointer_check {
            return;
        }
        let identifier = symbol.symbol_identifier().unwrap();
        if !self.oracle.dirty(identifier) {
            return;
        }
        let Some(sentinel) = self.ns.lookup(format!("{CPROVER_PREFIX}dead_object")) else {
            return;
        };
        let lhs = sentinel.symbol_expr();
        let address_of = symbol.clone().address_of().conditional_cast(lhs.typ());
        let rhs = Expr::if_then_else(Expr::nondet(Type::bool()), address_of, lhs.clone());
        self.new_code.push(Instruction::assign(lhs, rhs, *source_location));
    }

    /// At the end of the entry point, the memory-leak sentinel must still be
    /// null.
    fn memory_leak_check(&mut self, function_identifier: InternedString) {
        let Some(leak) = self.ns.lookup(format!("{CPROVER_PREFIX}memory_leak")) else {
            return;
        };
        let leak_expr = leak.symbol_expr();
        if !leak_expr.typ().is_pointer() {
            return;
        }

        // add a self-assignment to get helpful counterexample output
        let source_location = Location::function_scope(function_identifier);
        self.new_code.push(Instruction::assign(
            leak_expr.clone(),
            leak_expr.clone(),
            source_location,
        ));

        let eq = leak_expr.clone().eq(Expr::null_pointer(leak_expr.typ().clone()));
        self.add_guarded_property(
            eq.clone(),
            "dynamically allocated memory never freed",
            "memory-leak",
            source_location,
            &eq,
            &Guard::new(),
        );
    }

    /// Include `asserted_expr`, conditioned by `guard`, in the patch buffer,
    /// unless an identical assertion is already recorded for this region.
    pub(crate) fn add_guarded_property(
        &mut self,
        asserted_expr: Expr,
        comment: &str,
        property_class: &str,
        source_location: Location,
        src_expr: &Expr,
        guard: &Guard,
    ) {
        // first try the simplifier on it
        let simplified =
            if self.flags.simplify { simplify(&asserted_expr) } else { asserted_expr };

        // throw away trivial properties?
        if !self.flags.retain_trivial && simplified.is_true() {
            return;
        }

        let guarded =
            if guard.is_true() { simplified } else { guard.as_expr().implies(simplified) };

        if self.assertions.insert(guarded.clone()) {
            let full_comment = format!("{comment} in {src_expr}");
            let instruction = if self.flags.assert_to_assume {
                Instruction::assume(
                    guarded,
                    source_location.with_property(full_comment.as_str(), property_class),
                )
            } else {
                Instruction::assert(guarded, property_class, &full_comment, source_location)
            };
            self.new_code.push(instruction);
        }
    }

    /// Remove all recorded assertions mentioning the assigned symbol, as well
    /// as all assertions containing a dereference.
    fn invalidate(&mut self, lhs: &Expr) {
        match lhs.kind() {
            ExprKind::Index | ExprKind::Member { .. } => {
                self.invalidate(&lhs.operands()[0])
            }
            ExprKind::Symbol { identifier } => {
                let identifier = *identifier;
                self.assertions.retain(|assertion| {
                    !assertion.mentions_symbol(identifier)
                        && !assertion.mentions_dereference()
                });
            }
            _ => {
                // give up, clear all
                self.assertions.clear();
            }
        }
    }

    /// Expand every `r_ok`/`w_ok` predicate into the conjunction of the
    /// conditions `address_check` would assert for it. Applying the rewrite
    /// twice is a no-op.
    pub(crate) fn rw_ok_check(&self, expr: &Expr) -> Expr {
        let operands: Vec<Expr> =
            expr.operands().iter().map(|op| self.rw_ok_check(op)).collect();
        match expr.kind() {
            ExprKind::ROk | ExprKind::WOk => {
                let conditions = self.address_check(&operands[0], &operands[1]);
                Expr::conjunction(conditions.into_iter().map(|c| c.assertion).collect())
            }
            _ => expr.with_new_operands(operands),
        }
    }

    /// Initiate the recursive analysis of `expr` with a true guard.
    fn check(&mut self, expr: &Expr) -> Result<(), CheckError> {
        let mut guard = Guard::new();
        self.check_rec(expr, &mut guard)
    }

    /// Recursively descend into `expr`, running the appropriate check for
    /// each sub-expression while collecting the path condition in `guard`.
    fn check_rec(&mut self, expr: &Expr, guard: &mut Guard) -> Result<(), CheckError> {
        match expr.kind() {
            // we don't look into quantifiers
            ExprKind::Forall | ExprKind::Exists => return Ok(()),
            ExprKind::AddressOf => {
                return self.check_rec_address(&expr.operands()[0], guard);
            }
            ExprKind::And | ExprKind::Or => {
                return self.check_rec_logical_op(expr, guard);
            }
            ExprKind::If => return self.check_rec_if(expr, guard),
            ExprKind::Member { .. }
                if matches!(expr.operands()[0].kind(), ExprKind::Dereference) =>
            {
                if self.check_rec_member(expr, guard)? {
                    return Ok(());
                }
            }
            _ => {}
        }

        for op in expr.operands() {
            self.check_rec(op, guard)?;
        }

        match expr.kind() {
            ExprKind::Index => self.bounds_check(expr, guard)?,
            ExprKind::Div => self.check_rec_div(expr, guard),
            ExprKind::Shl | ExprKind::AShr | ExprKind::LShr => {
                self.undefined_shift_check(expr, guard);
                if matches!(expr.kind(), ExprKind::Shl) && expr.typ().is_signed() {
                    self.integer_overflow_check(expr, guard);
                }
            }
            ExprKind::Mod => {
                self.mod_by_zero_check(expr, guard);
                self.mod_overflow_check(expr, guard);
            }
            ExprKind::Plus | ExprKind::Minus | ExprKind::Mult | ExprKind::UnaryMinus => {
                self.check_rec_arithmetic_op(expr, guard);
            }
            ExprKind::Typecast => {
                self.conversion_check(expr, guard);
                self.float_overflow_check(expr, guard);
            }
            ExprKind::Le | ExprKind::Lt | ExprKind::Ge | ExprKind::Gt => {
                self.pointer_rel_check(expr, guard);
            }
            ExprKind::Dereference => self.pointer_validity_check(expr, expr, guard),
            _ => {}
        }
        Ok(())
    }

    /// Check an address-of expression: a dereference checks its pointer, an
    /// index address-checks the array and value-checks the index; the
    /// addressed location itself is not checked.
    fn check_rec_address(&mut self, expr: &Expr, guard: &mut Guard) -> Result<(), CheckError> {
        match expr.kind() {
            ExprKind::Forall | ExprKind::Exists => Ok(()),
            ExprKind::Dereference => self.check_rec(&expr.operands()[0], guard),
            ExprKind::Index => {
                self.check_rec_address(&expr.operands()[0], guard)?;
                self.check_rec(&expr.operands()[1], guard)
            }
            _ => {
                for op in expr.operands() {
                    self.check_rec_address(op, guard)?;
                }
                Ok(())
            }
        }
    }

    /// Check the operands of a short-circuit operator, extending the guard
    /// left to right:
    ///   `a && b && c` checks a under G, b under G ∧ a, c under G ∧ a ∧ b;
    ///   `a || b || c` checks a under G, b under G ∧ ¬a, c under G ∧ ¬a ∧ ¬b.
    fn check_rec_logical_op(
        &mut self,
        expr: &Expr,
        guard: &mut Guard,
    ) -> Result<(), CheckError> {
        let negate = matches!(expr.kind(), ExprKind::Or);
        let savepoint = guard.savepoint();
        for op in expr.operands() {
            assert!(op.is_boolean(), "logical operand must be Boolean: {op:?}");
            self.check_rec(op, guard)?;
            guard.push(if negate { op.clone().boolean_negate() } else { op.clone() });
        }
        guard.restore(savepoint);
        Ok(())
    }

    /// Check the condition alone, then each branch under the condition or its
    /// negation.
    fn check_rec_if(&mut self, expr: &Expr, guard: &mut Guard) -> Result<(), CheckError> {
        let [cond, true_case, false_case] = expr.operands() else {
            unreachable!("malformed if expression: {expr:?}")
        };
        assert!(cond.is_boolean());

        self.check_rec(cond, guard)?;

        let savepoint = guard.savepoint();
        guard.push(cond.clone());
        self.check_rec(true_case, guard)?;
        guard.restore(savepoint);

        guard.push(cond.clone().boolean_negate());
        self.check_rec(false_case, guard)?;
        guard.restore(savepoint);
        Ok(())
    }

    fn check_rec_div(&mut self, expr: &Expr, guard: &Guard) {
        self.div_by_zero_check(expr, guard);

        if expr.typ().is_signed() {
            self.integer_overflow_check(expr, guard);
        } else if expr.typ().is_float() {
            self.nan_check(expr, guard);
            self.float_overflow_check(expr, guard);
        }
    }

    fn check_rec_arithmetic_op(&mut self, expr: &Expr, guard: &Guard) {
        if expr.typ().is_integer() {
            self.integer_overflow_check(expr, guard);
        } else if expr.typ().is_float() {
            self.nan_check(expr, guard);
            self.float_overflow_check(expr, guard);
        } else if expr.typ().is_pointer() {
            self.pointer_overflow_check(expr, guard);
        }
    }
}
