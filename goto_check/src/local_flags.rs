// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-function pointer flow facts.
//!
//! The checker only consumes the [`FlowFlagOracle`] interface; the
//! [`LocalFlowAnalysis`] below is a deliberately simple, flow-insensitive
//! classifier that unions the lifetime classes a pointer can take over all
//! assignments in the function body. Anything it cannot classify is
//! `unknown`, which makes the pointer checks emit every applicable
//! condition.

use goto_program::{
    Expr, ExprKind, GotoProgram, InstructionBody, InstructionId, InternedString, OtherCode,
    SymbolTable,
};
use std::collections::{HashMap, HashSet};

/// The lifetime classes a pointer value may fall into at a use site.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PointerFlags(u8);

const UNKNOWN: u8 = 1 << 0;
const UNINITIALIZED: u8 = 1 << 1;
const NULL: u8 = 1 << 2;
const STATIC_LIFETIME: u8 = 1 << 3;
const DYNAMIC_LOCAL: u8 = 1 << 4;
const DYNAMIC_HEAP: u8 = 1 << 5;
const INTEGER_ADDRESS: u8 = 1 << 6;
const INVALID: u8 = 1 << 7;

impl PointerFlags {
    pub fn unknown() -> PointerFlags {
        PointerFlags(UNKNOWN)
    }

    pub fn uninitialized() -> PointerFlags {
        PointerFlags(UNINITIALIZED)
    }

    pub fn null() -> PointerFlags {
        PointerFlags(NULL)
    }

    pub fn static_lifetime() -> PointerFlags {
        PointerFlags(STATIC_LIFETIME)
    }

    pub fn dynamic_local() -> PointerFlags {
        PointerFlags(DYNAMIC_LOCAL)
    }

    pub fn dynamic_heap() -> PointerFlags {
        PointerFlags(DYNAMIC_HEAP)
    }

    pub fn integer_address() -> PointerFlags {
        PointerFlags(INTEGER_ADDRESS)
    }

    pub fn invalid() -> PointerFlags {
        PointerFlags(INVALID)
    }

    pub fn merge(self, other: PointerFlags) -> PointerFlags {
        PointerFlags(self.0 | other.0)
    }

    pub fn is_unknown(&self) -> bool {
        self.0 & UNKNOWN != 0
    }

    pub fn is_uninitialized(&self) -> bool {
        self.0 & UNINITIALIZED != 0
    }

    pub fn is_null(&self) -> bool {
        self.0 & NULL != 0
    }

    pub fn is_static_lifetime(&self) -> bool {
        self.0 & STATIC_LIFETIME != 0
    }

    pub fn is_dynamic_local(&self) -> bool {
        self.0 & DYNAMIC_LOCAL != 0
    }

    pub fn is_dynamic_heap(&self) -> bool {
        self.0 & DYNAMIC_HEAP != 0
    }

    pub fn is_integer_address(&self) -> bool {
        self.0 & INTEGER_ADDRESS != 0
    }

    pub fn is_invalid(&self) -> bool {
        self.0 & INVALID != 0
    }
}

/// Pointer flow facts, queried per use site.
pub trait FlowFlagOracle {
    fn get(&self, at: InstructionId, pointer: &Expr) -> PointerFlags;

    /// Whether the address of `symbol` escapes, so its death must be
    /// recorded.
    fn dirty(&self, symbol: InternedString) -> bool;
}

/// The sound fallback: everything is unknown and every local is dirty.
#[derive(Debug, Default)]
pub struct UnknownPointerOracle;

impl FlowFlagOracle for UnknownPointerOracle {
    fn get(&self, _at: InstructionId, _pointer: &Expr) -> PointerFlags {
        PointerFlags::unknown()
    }

    fn dirty(&self, _symbol: InternedString) -> bool {
        true
    }
}

/// A one-pass classifier over a function body.
#[derive(Debug)]
pub struct LocalFlowAnalysis<'a> {
    ns: &'a SymbolTable,
    assigned: HashMap<InternedString, PointerFlags>,
    address_taken: HashSet<InternedString>,
}

impl<'a> LocalFlowAnalysis<'a> {
    pub fn analyze(body: &GotoProgram, ns: &'a SymbolTable) -> LocalFlowAnalysis<'a> {
        let mut analysis = LocalFlowAnalysis {
            ns,
            assigned: HashMap::new(),
            address_taken: HashSet::new(),
        };

        for instruction in &body.instructions {
            for expr in instruction_expressions(instruction.body()) {
                analysis.record_address_taken(expr);
            }

            match instruction.body() {
                InstructionBody::Assign { lhs, rhs } => {
                    if let Some(identifier) = lhs.symbol_identifier() {
                        if lhs.typ().is_pointer() {
                            let flags = analysis.classify_value(rhs);
                            analysis
                                .assigned
                                .entry(identifier)
                                .and_modify(|f| *f = f.merge(flags))
                                .or_insert(flags);
                        }
                    }
                }
                InstructionBody::FunctionCall { lhs: Some(lhs), .. } => {
                    if let Some(identifier) = lhs.symbol_identifier() {
                        if lhs.typ().is_pointer() {
                            // anything can come back from a call
                            analysis
                                .assigned
                                .insert(identifier, PointerFlags::unknown());
                        }
                    }
                }
                _ => {}
            }
        }

        analysis
    }

    fn record_address_taken(&mut self, expr: &Expr) {
        if let ExprKind::AddressOf = expr.kind() {
            if let Some(identifier) = root_symbol(&expr.operands()[0]) {
                self.address_taken.insert(identifier);
            }
        }
        for op in expr.operands() {
            self.record_address_taken(op);
        }
    }

    /// What lifetime class does assigning this value to a pointer produce?
    fn classify_value(&self, value: &Expr) -> PointerFlags {
        match value.kind() {
            ExprKind::NullPointer => PointerFlags::null(),
            ExprKind::AddressOf => match root_symbol(&value.operands()[0]) {
                Some(identifier) => {
                    let is_static = self
                        .ns
                        .lookup(identifier)
                        .map(|s| s.is_static_lifetime)
                        .unwrap_or(false);
                    if is_static {
                        PointerFlags::static_lifetime()
                    } else {
                        PointerFlags::dynamic_local()
                    }
                }
                None => PointerFlags::unknown(),
            },
            ExprKind::Typecast => {
                let inner = &value.operands()[0];
                if inner.typ().is_integer() {
                    PointerFlags::integer_address()
                } else {
                    self.classify_value(inner)
                }
            }
            ExprKind::Symbol { identifier } => self
                .assigned
                .get(identifier)
                .copied()
                .unwrap_or_else(PointerFlags::unknown),
            ExprKind::If => self
                .classify_value(&value.operands()[1])
                .merge(self.classify_value(&value.operands()[2])),
            _ => PointerFlags::unknown(),
        }
    }
}

impl FlowFlagOracle for LocalFlowAnalysis<'_> {
    fn get(&self, _at: InstructionId, pointer: &Expr) -> PointerFlags {
        let pointer = pointer.skip_typecast();
        match pointer.kind() {
            ExprKind::NullPointer => PointerFlags::null(),
            ExprKind::AddressOf => self.classify_value(pointer),
            ExprKind::Symbol { identifier } => self
                .assigned
                .get(identifier)
                .copied()
                .unwrap_or_else(PointerFlags::unknown),
            _ => PointerFlags::unknown(),
        }
    }

    fn dirty(&self, symbol: InternedString) -> bool {
        self.address_taken.contains(&symbol)
    }
}

fn root_symbol(expr: &Expr) -> Option<InternedString> {
    match expr.kind() {
        ExprKind::Symbol { identifier } => Some(*identifier),
        ExprKind::Index | ExprKind::Member { .. } => root_symbol(&expr.operands()[0]),
        _ => None,
    }
}

fn instruction_expressions(body: &InstructionBody) -> Vec<&Expr> {
    match body {
        InstructionBody::Assign { lhs, rhs } => vec![lhs, rhs],
        InstructionBody::FunctionCall { lhs, function, arguments } => {
            let mut exprs: Vec<&Expr> = lhs.iter().collect();
            exprs.push(function);
            exprs.extend(arguments.iter());
            exprs
        }
        InstructionBody::Return { value } => value.iter().collect(),
        InstructionBody::Throw { operand } => vec![operand],
        InstructionBody::Assert { cond, .. } | InstructionBody::Assume { cond } => vec![cond],
        InstructionBody::Goto { condition, .. } => condition.iter().collect(),
        InstructionBody::Other(OtherCode::Expression(e)) => vec![e],
        InstructionBody::Other(OtherCode::Printf { arguments }) => arguments.iter().collect(),
        InstructionBody::Dead { symbol } => vec![symbol],
        InstructionBody::EndFunction | InstructionBody::Skip => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::{FlowFlagOracle, LocalFlowAnalysis};
    use goto_program::{
        Expr, GotoProgram, Instruction, Location, Symbol, SymbolTable, Type,
    };

    fn pointer(name: &str) -> Expr {
        Expr::symbol(name, Type::c_int().to_pointer())
    }

    #[test]
    fn null_assignment_is_classified() {
        let p = pointer("p");
        let assign = Instruction::assign(
            p.clone(),
            Expr::null_pointer(p.typ().clone()),
            Location::none(),
        );
        let body = GotoProgram::new(vec![assign]);
        let ns = SymbolTable::new();
        let analysis = LocalFlowAnalysis::analyze(&body, &ns);

        let flags = analysis.get(body.instructions[0].id(), &p);
        assert!(flags.is_null());
        assert!(!flags.is_unknown());
    }

    #[test]
    fn address_of_local_and_static() {
        let mut ns = SymbolTable::new();
        ns.insert(Symbol::new("global", Type::c_int(), "C").with_static_lifetime());

        let p = pointer("p");
        let q = pointer("q");
        let local = Expr::symbol("x", Type::c_int());
        let global = Expr::symbol("global", Type::c_int());
        let body = GotoProgram::new(vec![
            Instruction::assign(p.clone(), local.address_of(), Location::none()),
            Instruction::assign(q.clone(), global.address_of(), Location::none()),
        ]);
        let analysis = LocalFlowAnalysis::analyze(&body, &ns);

        let at = body.instructions[1].id();
        assert!(analysis.get(at, &p).is_dynamic_local());
        assert!(analysis.get(at, &q).is_static_lifetime());
        assert!(analysis.dirty("x".into()));
        assert!(analysis.dirty("global".into()));
        assert!(!analysis.dirty("p".into()));
    }

    #[test]
    fn merges_over_multiple_assignments() {
        let p = pointer("p");
        let local = Expr::symbol("x", Type::c_int());
        let body = GotoProgram::new(vec![
            Instruction::assign(p.clone(), Expr::null_pointer(p.typ().clone()), Location::none()),
            Instruction::assign(p.clone(), local.address_of(), Location::none()),
        ]);
        let ns = SymbolTable::new();
        let analysis = LocalFlowAnalysis::analyze(&body, &ns);

        let flags = analysis.get(body.instructions[0].id(), &p);
        assert!(flags.is_null());
        assert!(flags.is_dynamic_local());
    }

    #[test]
    fn unassigned_pointers_are_unknown() {
        let body = GotoProgram::new(vec![]);
        let ns = SymbolTable::new();
        let analysis = LocalFlowAnalysis::analyze(&body, &ns);
        assert!(analysis
            .get(goto_program::InstructionId::fresh(), &pointer("arg"))
            .is_unknown());
    }

    #[test]
    fn integer_casts_are_integer_addresses() {
        let p = pointer("p");
        let addr = Expr::int_constant(0xdead_beefu32, Type::unsigned_int(64));
        let body = GotoProgram::new(vec![Instruction::assign(
            p.clone(),
            addr.cast_to(p.typ().clone()),
            Location::none(),
        )]);
        let ns = SymbolTable::new();
        let analysis = LocalFlowAnalysis::analyze(&body, &ns);
        assert!(analysis.get(body.instructions[0].id(), &p).is_integer_address());
    }
}
