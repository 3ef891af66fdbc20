// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use self::InstructionBody::*;
use crate::expr::Expr;
use crate::intern::InternedString;
use crate::location::Location;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

///////////////////////////////////////////////////////////////////////////////////////////////
/// Datatypes
///////////////////////////////////////////////////////////////////////////////////////////////

/// A stable identity for an instruction.
///
/// Jump targets refer to instructions by id rather than by position, so
/// passes may insert instructions without disturbing control flow. Ids are
/// drawn from a process-wide counter and never reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstructionId(u64);

static NEXT_INSTRUCTION_ID: AtomicU64 = AtomicU64::new(1);

impl InstructionId {
    pub fn fresh() -> InstructionId {
        InstructionId(NEXT_INSTRUCTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// One instruction of a goto program.
///
/// The fields are kept private; instructions are created through the
/// constructors, which ensure they are well formed, and mutated through the
/// narrow setters the rewriting passes need.
#[derive(Clone, Debug)]
pub struct Instruction {
    id: InstructionId,
    body: InstructionBody,
    source_location: Location,
    labels: Vec<InternedString>,
    /// Directives of the form `disable:<check-name>`, local to this
    /// instruction.
    pragmas: Vec<InternedString>,
    /// Whether some goto jumps here; maintained by `GotoProgram::update`.
    is_target: bool,
}

#[derive(Clone, Debug)]
pub enum InstructionBody {
    /// `lhs = rhs;`
    Assign {
        lhs: Expr,
        rhs: Expr,
    },
    /// `lhs = function(arguments);` or `function(arguments);`
    FunctionCall {
        lhs: Option<Expr>,
        function: Expr,
        arguments: Vec<Expr>,
    },
    /// `return value;` or `return;`
    Return {
        value: Option<Expr>,
    },
    /// `throw wrapper;` where the wrapper's single operand is the thrown
    /// reference
    Throw {
        operand: Expr,
    },
    /// `assert(cond);` with a property class and comment in the location
    Assert {
        cond: Expr,
        user_provided: bool,
    },
    /// `assume(cond);`
    Assume {
        cond: Expr,
    },
    /// `if (condition) goto target;` or `goto target;`
    Goto {
        target: InstructionId,
        condition: Option<Expr>,
    },
    /// An expression evaluated for effect, or a printf
    Other(OtherCode),
    /// End-of-life of a local variable
    Dead {
        symbol: Expr,
    },
    EndFunction,
    /// `;`
    Skip,
}

#[derive(Clone, Debug)]
pub enum OtherCode {
    Expression(Expr),
    Printf { arguments: Vec<Expr> },
}

///////////////////////////////////////////////////////////////////////////////////////////////
/// Implementations
///////////////////////////////////////////////////////////////////////////////////////////////

macro_rules! instruction {
    ($body:expr, $loc:expr) => {{
        Instruction {
            id: InstructionId::fresh(),
            body: $body,
            source_location: $loc,
            labels: Vec::new(),
            pragmas: Vec::new(),
            is_target: false,
        }
    }};
}

/// Constructors
impl Instruction {
    /// `lhs = rhs;`
    pub fn assign(lhs: Expr, rhs: Expr, loc: Location) -> Self {
        assert_eq!(
            lhs.typ(),
            rhs.typ(),
            "assignment with unequal types: lhs {:?} rhs {:?}",
            lhs.typ(),
            rhs.typ()
        );
        instruction!(Assign { lhs, rhs }, loc)
    }

    pub fn function_call(
        lhs: Option<Expr>,
        function: Expr,
        arguments: Vec<Expr>,
        loc: Location,
    ) -> Self {
        instruction!(FunctionCall { lhs, function, arguments }, loc)
    }

    pub fn ret(value: Option<Expr>, loc: Location) -> Self {
        instruction!(Return { value }, loc)
    }

    pub fn throw(operand: Expr, loc: Location) -> Self {
        instruction!(Throw { operand }, loc)
    }

    /// `assert(cond);` tagged with a property class and a comment.
    pub fn assert(cond: Expr, property_class: &str, message: &str, loc: Location) -> Self {
        assert!(cond.typ().is_bool());
        assert!(!property_class.is_empty() && !message.is_empty());
        let loc_with_property = loc.with_property(message, property_class);
        instruction!(Assert { cond, user_provided: false }, loc_with_property)
    }

    pub fn assert_false(property_class: &str, message: &str, loc: Location) -> Self {
        Instruction::assert(Expr::bool_false(), property_class, message, loc)
    }

    pub fn assume(cond: Expr, loc: Location) -> Self {
        assert!(cond.typ().is_bool(), "assume expected bool, got {cond:?}");
        instruction!(Assume { cond }, loc)
    }

    pub fn goto(target: InstructionId, loc: Location) -> Self {
        instruction!(Goto { target, condition: None }, loc)
    }

    pub fn goto_if(condition: Expr, target: InstructionId, loc: Location) -> Self {
        assert!(condition.typ().is_bool());
        instruction!(Goto { target, condition: Some(condition) }, loc)
    }

    /// `e;`
    pub fn expression(e: Expr, loc: Location) -> Self {
        instruction!(Other(OtherCode::Expression(e)), loc)
    }

    pub fn printf(arguments: Vec<Expr>, loc: Location) -> Self {
        instruction!(Other(OtherCode::Printf { arguments }), loc)
    }

    /// Local variable goes out of scope.
    pub fn dead(symbol: Expr, loc: Location) -> Self {
        assert!(symbol.is_symbol());
        instruction!(Dead { symbol }, loc)
    }

    pub fn end_function(loc: Location) -> Self {
        instruction!(EndFunction, loc)
    }

    /// `;`
    pub fn skip(loc: Location) -> Self {
        instruction!(Skip, loc)
    }
}

/// Fluent builders
impl Instruction {
    pub fn with_label<T: Into<InternedString>>(mut self, label: T) -> Self {
        let label = label.into();
        assert!(!label.is_empty());
        self.labels.push(label);
        self
    }

    /// Attach a `disable:<check-name>` directive.
    pub fn with_pragma<T: Into<InternedString>>(mut self, pragma: T) -> Self {
        self.pragmas.push(pragma.into());
        self
    }

    /// Mark an assertion as written by the user rather than by a tool.
    pub fn with_user_provided(mut self) -> Self {
        match &mut self.body {
            Assert { user_provided, .. } => *user_provided = true,
            _ => unreachable!("only assertions can be user provided"),
        }
        self
    }
}

/// Getters
impl Instruction {
    pub fn id(&self) -> InstructionId {
        self.id
    }

    pub fn body(&self) -> &InstructionBody {
        &self.body
    }

    pub fn source_location(&self) -> &Location {
        &self.source_location
    }

    pub fn labels(&self) -> &[InternedString] {
        &self.labels
    }

    pub fn pragmas(&self) -> &[InternedString] {
        &self.pragmas
    }

    pub fn is_target(&self) -> bool {
        self.is_target
    }

    /// The controlling condition of a goto, assert or assume.
    pub fn condition(&self) -> Option<&Expr> {
        match &self.body {
            Goto { condition, .. } => condition.as_ref(),
            Assert { cond, .. } | Assume { cond } => Some(cond),
            _ => None,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self.body, Skip)
    }
}

/// Setters
impl Instruction {
    /// Replace the controlling condition of a goto, assert or assume.
    pub fn set_condition(&mut self, new_condition: Expr) {
        assert!(new_condition.typ().is_bool());
        match &mut self.body {
            Goto { condition, .. } => *condition = Some(new_condition),
            Assert { cond, .. } | Assume { cond } => *cond = new_condition,
            _ => unreachable!("instruction has no condition: {self:?}"),
        }
    }

    pub fn body_mut(&mut self) -> &mut InstructionBody {
        &mut self.body
    }

    pub fn set_source_location(&mut self, loc: Location) {
        self.source_location = loc;
    }

    pub fn turn_into_skip(&mut self) {
        self.body = Skip;
    }
}

/// A function body: a list of instructions executed top to bottom except
/// where gotos say otherwise.
#[derive(Debug, Default)]
pub struct GotoProgram {
    pub instructions: Vec<Instruction>,
}

impl GotoProgram {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        let mut program = GotoProgram { instructions };
        program.update();
        program
    }

    pub fn add(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Recompute the `is_target` marker on every instruction.
    pub fn update(&mut self) {
        let mut targets = std::collections::HashSet::new();
        for i in &self.instructions {
            if let Goto { target, .. } = i.body() {
                targets.insert(*target);
            }
        }
        for i in &mut self.instructions {
            i.is_target = targets.contains(&i.id);
        }
    }

    /// Remove skip instructions, moving their labels and incoming jumps to
    /// the following instruction. A trailing skip with no successor is kept.
    pub fn remove_skip(&mut self) {
        // id of the first retained instruction after each removable skip
        let mut successor: HashMap<InstructionId, InstructionId> = HashMap::new();
        let mut next_kept: Option<InstructionId> = None;
        let mut moved_labels: HashMap<InstructionId, Vec<InternedString>> = HashMap::new();

        for i in self.instructions.iter().rev() {
            if i.is_skip() && next_kept.is_some() {
                successor.insert(i.id, next_kept.unwrap());
            } else {
                // non-skip, or a trailing skip with nothing to fall through to
                next_kept = Some(i.id);
            }
        }

        let mut kept = Vec::with_capacity(self.instructions.len());
        for mut i in std::mem::take(&mut self.instructions) {
            if i.is_skip() {
                if let Some(next) = successor.get(&i.id) {
                    if !i.labels.is_empty() {
                        moved_labels.entry(*next).or_default().append(&mut i.labels);
                    }
                    continue;
                }
            }
            kept.push(i);
        }

        for i in &mut kept {
            if let Some(mut labels) = moved_labels.remove(&i.id) {
                i.labels.append(&mut labels);
            }
            if let Goto { target, .. } = &mut i.body {
                if let Some(next) = successor.get(target) {
                    *target = *next;
                }
            }
        }

        self.instructions = kept;
        self.update();
    }
}
