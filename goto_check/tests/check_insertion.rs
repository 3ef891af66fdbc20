// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end tests of the check insertion pass: build a small goto program,
//! run the pass, and inspect the instructions it splices in.

use goto_check::{check_model, CheckFlags, Config, LanguageStandard};
use goto_program::{
    Expr, ExprKind, GotoModel, GotoProgram, Instruction, InstructionBody, InternedString,
    Location, Symbol, SymbolTable, Type, CPROVER_PREFIX, ENTRY_POINT,
};

fn loc() -> Location {
    Location::new("main.c", Some("main"), 1u64, None)
}

fn body_of<'m>(model: &'m GotoModel, name: &str) -> &'m GotoProgram {
    let name = InternedString::from(name);
    &model.functions[&name]
}

fn model_for(mode: &str, instructions: Vec<Instruction>) -> GotoModel {
    let mut symbol_table = SymbolTable::new();
    symbol_table.insert(Symbol::new("main", Type::code(vec![], Type::empty()), mode));
    let mut model = GotoModel::new(symbol_table);
    model.insert_function("main", GotoProgram::new(instructions));
    model
}

fn config_with(adjust: impl FnOnce(&mut CheckFlags)) -> Config {
    let mut config = Config::default();
    adjust(&mut config.flags);
    config
}

/// All assertions of a program: (property class, comment, condition).
fn emitted_assertions(body: &GotoProgram) -> Vec<(String, String, Expr)> {
    body.instructions
        .iter()
        .filter_map(|i| match i.body() {
            InstructionBody::Assert { cond, .. } => Some((
                i.source_location().property_class().unwrap().to_string(),
                i.source_location().comment().unwrap().to_string(),
                cond.clone(),
            )),
            _ => None,
        })
        .collect()
}

fn int_sym(name: &str) -> Expr {
    Expr::symbol(name, Type::c_int())
}

#[test]
fn division_emits_zero_and_overflow_checks() {
    let a = int_sym("a");
    let b = int_sym("b");
    let assign = Instruction::assign(int_sym("x"), a.clone().div(b.clone()), loc());
    let mut model = model_for("C", vec![assign]);

    let config = config_with(|f| {
        f.div_by_zero_check = true;
        f.signed_overflow_check = true;
    });
    check_model(&mut model, &config).unwrap();

    let body = body_of(&model, "main");
    let assertions = emitted_assertions(body);
    assert_eq!(assertions.len(), 2);

    let (class, comment, cond) = &assertions[0];
    assert_eq!(class, "division-by-zero");
    assert_eq!(comment, "division by zero in a / b");
    assert_eq!(cond, &b.clone().neq(Expr::zero(Type::c_int())));

    let (class, comment, cond) = &assertions[1];
    assert_eq!(class, "overflow");
    assert_eq!(comment, "arithmetic overflow on signed division in a / b");
    let expected = a
        .eq(Expr::smallest_signed(Type::c_int()))
        .and(b.eq(Expr::int_constant(-1, Type::c_int())))
        .not();
    assert_eq!(cond, &expected);
}

#[test]
fn negative_constant_index_fails_the_lower_bound() {
    let arr = Expr::symbol(
        "a",
        Type::c_int().array_of(Expr::int_constant(10, Type::ssize_t())),
    );
    let access = arr.index(Expr::int_constant(-1, Type::c_int()));
    let assign = Instruction::assign(int_sym("x"), access, loc());
    let mut model = model_for("C", vec![assign]);

    check_model(&mut model, &config_with(|f| f.bounds_check = true)).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    // the lower bound simplifies to false; the upper bound (-1 < 10)
    // simplifies to true and is dropped
    assert_eq!(assertions.len(), 1);
    let (class, comment, cond) = &assertions[0];
    assert_eq!(class, "array bounds");
    assert_eq!(comment, "array `a' lower bound in a[-1]");
    assert!(cond.is_false());
}

#[test]
fn bounds_checks_without_simplifier() {
    let arr = Expr::symbol(
        "a",
        Type::c_int().array_of(Expr::int_constant(10, Type::ssize_t())),
    );
    let access = arr.index(Expr::int_constant(-1, Type::c_int()));
    let assign = Instruction::assign(int_sym("x"), access, loc());
    let mut model = model_for("C", vec![assign]);

    let config = config_with(|f| {
        f.bounds_check = true;
        f.simplify = false;
    });
    check_model(&mut model, &config).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    assert_eq!(assertions.len(), 2);
    assert!(assertions[0].1.starts_with("array `a' lower bound"));
    assert!(assertions[1].1.starts_with("array `a' upper bound"));
}

#[test]
fn unsigned_index_skips_the_lower_bound() {
    let arr = Expr::symbol(
        "a",
        Type::c_int().array_of(Expr::int_constant(10, Type::ssize_t())),
    );
    let access = arr.index(Expr::symbol("i", Type::unsigned_int(32)));
    let assign = Instruction::assign(int_sym("x"), access, loc());
    let mut model = model_for("C", vec![assign]);

    check_model(&mut model, &config_with(|f| f.bounds_check = true)).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    assert_eq!(assertions.len(), 1);
    assert!(assertions[0].1.starts_with("array `a' upper bound"));
}

#[test]
fn signed_shift_emits_shift_and_overflow_checks() {
    let a = int_sym("a");
    let d = int_sym("d");
    let assign = Instruction::assign(int_sym("x"), a.clone().shl(d.clone()), loc());
    let mut model = model_for("C", vec![assign]);

    let config = config_with(|f| {
        f.undefined_shift_check = true;
        f.signed_overflow_check = true;
    });
    check_model(&mut model, &config).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    let comments: Vec<&str> = assertions.iter().map(|(_, c, _)| c.as_str()).collect();
    assert_eq!(
        comments,
        vec![
            "shift distance is negative in a << d",
            "shift distance too large in a << d",
            "shift operand is negative in a << d",
            "arithmetic overflow on signed shl in a << d",
        ]
    );

    assert_eq!(assertions[0].2, d.clone().ge(Expr::zero(Type::c_int())));
    assert_eq!(
        assertions[1].2,
        d.clone().lt(Expr::int_constant(32, Type::c_int()))
    );
    assert_eq!(assertions[2].2, a.clone().ge(Expr::zero(Type::c_int())));

    // the overflow disjunction has five cases; under C11 the top-bits slab
    // is one bit wider than the operand
    let ExprKind::Or = assertions[3].2.kind() else { panic!("expected a disjunction") };
    let disjuncts = assertions[3].2.operands();
    assert_eq!(disjuncts.len(), 5);
    let ExprKind::Equal = disjuncts[4].kind() else { panic!("expected top bits == 0") };
    assert_eq!(disjuncts[4].operands()[0].typ(), &Type::unsigned_int(33));
}

#[test]
fn c89_keeps_the_top_bits_window_at_the_operand_width() {
    let a = int_sym("a");
    let d = int_sym("d");
    let assign = Instruction::assign(int_sym("x"), a.shl(d), loc());
    let mut model = model_for("C", vec![assign]);

    let mut config = config_with(|f| f.signed_overflow_check = true);
    config.language_standard = LanguageStandard::C89;
    check_model(&mut model, &config).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    assert_eq!(assertions.len(), 1);
    let disjuncts = assertions[0].2.operands();
    assert_eq!(disjuncts[4].operands()[0].typ(), &Type::unsigned_int(32));
}

#[test]
fn float_addition_emits_nan_and_overflow_checks() {
    let x = Expr::symbol("x", Type::double());
    let y = Expr::symbol("y", Type::double());
    let assign = Instruction::assign(
        Expr::symbol("z", Type::double()),
        x.clone().plus(y.clone()),
        loc(),
    );
    let mut model = model_for("C", vec![assign]);

    let config = config_with(|f| {
        f.nan_check = true;
        f.float_overflow_check = true;
    });
    check_model(&mut model, &config).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    assert_eq!(assertions.len(), 2);

    let (class, comment, cond) = &assertions[0];
    assert_eq!(class, "NaN");
    assert_eq!(comment, "NaN on + in x + y");
    let plus_inf = Expr::plus_infinity(Type::double());
    let minus_inf = Expr::minus_infinity(Type::double());
    let expected = x
        .clone()
        .eq(minus_inf.clone())
        .and(y.clone().eq(plus_inf.clone()))
        .or(x.clone().eq(plus_inf).and(y.clone().eq(minus_inf)))
        .not();
    assert_eq!(cond, &expected);

    let (class, comment, cond) = &assertions[1];
    assert_eq!(class, "overflow");
    assert_eq!(comment, "arithmetic overflow on floating-point addition in x + y");
    let sum = x.clone().plus(y.clone());
    let expected = Expr::disjunction(vec![
        Expr::isinf(x),
        Expr::isinf(y),
        Expr::isinf(sum).not(),
    ]);
    assert_eq!(cond, &expected);
}

#[test]
fn float_division_checks_divisor_nan_and_overflow() {
    let a = Expr::symbol("a", Type::double());
    let b = Expr::symbol("b", Type::double());
    let assign = Instruction::assign(
        Expr::symbol("z", Type::double()),
        a.clone().div(b.clone()),
        loc(),
    );
    let mut model = model_for("C", vec![assign]);

    let config = config_with(|f| {
        f.div_by_zero_check = true;
        f.nan_check = true;
        f.float_overflow_check = true;
    });
    check_model(&mut model, &config).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    assert_eq!(assertions.len(), 3);

    let (class, comment, cond) = &assertions[0];
    assert_eq!(class, "division-by-zero");
    assert_eq!(comment, "division by zero in a / b");
    // the divisor compares against zero under IEEE equality, not bitwise
    let expected = b
        .clone()
        .ieee_float_equal(Expr::float_zero(Type::double()))
        .not();
    assert_eq!(cond, &expected);

    let (class, comment, cond) = &assertions[1];
    assert_eq!(class, "NaN");
    assert_eq!(comment, "NaN on / in a / b");
    let zero = Expr::float_zero(Type::double());
    let expected = a
        .clone()
        .ieee_float_equal(zero.clone())
        .and(b.clone().ieee_float_equal(zero))
        .or(Expr::isinf(b.clone()))
        .boolean_negate();
    assert_eq!(cond, &expected);

    let (class, comment, cond) = &assertions[2];
    assert_eq!(class, "overflow");
    assert_eq!(comment, "arithmetic overflow on floating-point division in a / b");
    let expected =
        Expr::isinf(a.clone()).or(Expr::isinf(a.clone().div(b.clone())).not());
    assert_eq!(cond, &expected);
}

#[test]
fn dereference_of_an_unknown_pointer_emits_every_applicable_condition() {
    let p = Expr::symbol("p", Type::c_int().to_pointer());
    let assign = Instruction::assign(int_sym("x"), p.dereference(), loc());
    let mut model = model_for("C", vec![assign]);

    check_model(&mut model, &config_with(|f| f.pointer_check = true)).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    let comments: Vec<&str> = assertions.iter().map(|(_, c, _)| c.as_str()).collect();
    assert_eq!(
        comments,
        vec![
            "dereference failure: pointer NULL in *p",
            "dereference failure: pointer invalid in *p",
            "dereference failure: deallocated dynamic object in *p",
            "dereference failure: dead object in *p",
            "dereference failure: pointer outside dynamic object bounds in *p",
            "dereference failure: pointer outside object bounds in *p",
            "dereference failure: invalid integer address in *p",
        ]
    );
    assert!(assertions.iter().all(|(class, _, _)| class == "pointer dereference"));
}

#[test]
fn null_pointers_only_get_the_null_condition() {
    let p = Expr::symbol("p", Type::c_int().to_pointer());
    let set_null = Instruction::assign(
        p.clone(),
        Expr::null_pointer(p.typ().clone()),
        loc(),
    );
    let deref = Instruction::assign(int_sym("x"), p.dereference(), loc());
    let mut model = model_for("C", vec![set_null, deref]);

    check_model(&mut model, &config_with(|f| f.pointer_check = true)).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    assert_eq!(assertions.len(), 1);
    assert!(assertions[0].1.starts_with("dereference failure: pointer NULL"));
}

#[test]
fn guards_from_short_circuit_operators_wrap_assertions() {
    let a = int_sym("a");
    let b = int_sym("b");
    let c = Expr::symbol("c", Type::bool());
    let div_is_zero = a.div(b.clone()).eq(Expr::zero(Type::c_int()));

    let target = Instruction::skip(loc());
    let target_id = target.id();
    let jump = Instruction::goto_if(c.clone().or(div_is_zero), target_id, loc());
    let mut model = model_for("C", vec![jump, target]);

    check_model(&mut model, &config_with(|f| f.div_by_zero_check = true)).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    assert_eq!(assertions.len(), 1);
    let expected = c.not().implies(b.neq(Expr::zero(Type::c_int())));
    assert_eq!(assertions[0].2, expected);
}

#[test]
fn straight_line_duplicates_are_cached() {
    let a = int_sym("a");
    let b = int_sym("b");
    let div = a.div(b.clone());
    let mut model = model_for(
        "C",
        vec![
            Instruction::assign(int_sym("x"), div.clone(), loc()),
            Instruction::assign(int_sym("y"), div.clone(), loc()),
            // assigning the divisor invalidates the recorded assertion
            Instruction::assign(b, Expr::int_constant(3, Type::c_int()), loc()),
            Instruction::assign(int_sym("z"), div, loc()),
        ],
    );

    check_model(&mut model, &config_with(|f| f.div_by_zero_check = true)).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    assert_eq!(assertions.len(), 2);
}

#[test]
fn branch_targets_clear_the_assertion_cache() {
    let a = int_sym("a");
    let b = int_sym("b");
    let div = a.div(b);
    let second = Instruction::assign(int_sym("y"), div.clone(), loc());
    let second_id = second.id();
    let mut model = model_for(
        "C",
        vec![
            Instruction::assign(int_sym("x"), div, loc()),
            Instruction::goto_if(Expr::symbol("c", Type::bool()), second_id, loc()),
            second,
        ],
    );

    check_model(&mut model, &config_with(|f| f.div_by_zero_check = true)).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    assert_eq!(assertions.len(), 2);
}

#[test]
fn disabling_a_flag_removes_only_its_property_class() {
    let a = int_sym("a");
    let b = int_sym("b");
    let rhs = a.div(b).shl(int_sym("d"));
    let assign = Instruction::assign(int_sym("x"), rhs, loc());
    let mut model = model_for("C", vec![assign]);

    let config = config_with(|f| {
        f.div_by_zero_check = false;
        f.undefined_shift_check = true;
        f.signed_overflow_check = true;
    });
    check_model(&mut model, &config).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    assert!(!assertions.iter().any(|(class, _, _)| class == "division-by-zero"));
    assert!(assertions.iter().any(|(_, c, _)| c.starts_with("shift distance")));
    // signed division overflow is owned by the overflow flag, not the
    // division flag
    assert!(assertions
        .iter()
        .any(|(_, c, _)| c.starts_with("arithmetic overflow on signed division")));
}

#[test]
fn pragmas_disable_checks_for_one_instruction_only() {
    let a = int_sym("a");
    let b = int_sym("b");
    let div = a.div(b);
    let silenced = Instruction::assign(int_sym("x"), div.clone(), loc())
        .with_pragma("disable:div-by-zero-check");
    let checked = Instruction::assign(int_sym("y"), div, loc());
    let mut model = model_for("C", vec![silenced, checked]);

    check_model(&mut model, &config_with(|f| f.div_by_zero_check = true)).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    assert_eq!(assertions.len(), 1);
}

#[test]
fn assert_to_assume_changes_only_the_instruction_kind() {
    let a = int_sym("a");
    let b = int_sym("b");
    let build = || {
        model_for(
            "C",
            vec![Instruction::assign(int_sym("x"), a.clone().div(b.clone()), loc())],
        )
    };

    let mut as_asserts = build();
    check_model(&mut as_asserts, &config_with(|f| f.div_by_zero_check = true)).unwrap();

    let mut as_assumes = build();
    let config = config_with(|f| {
        f.div_by_zero_check = true;
        f.assert_to_assume = true;
    });
    check_model(&mut as_assumes, &config).unwrap();

    let asserts = &body_of(&as_asserts, "main").instructions;
    let assumes = &body_of(&as_assumes, "main").instructions;
    assert_eq!(asserts.len(), assumes.len());
    for (a_instr, b_instr) in asserts.iter().zip(assumes.iter()) {
        match (a_instr.body(), b_instr.body()) {
            (
                InstructionBody::Assert { cond: a_cond, .. },
                InstructionBody::Assume { cond: b_cond },
            ) => assert_eq!(a_cond, b_cond),
            (InstructionBody::Assign { .. }, InstructionBody::Assign { .. }) => {}
            other => panic!("instruction kinds diverge: {other:?}"),
        }
    }
}

#[test]
fn error_labels_assert_false() {
    let labelled = Instruction::skip(loc()).with_label("ERROR");
    let mut model = model_for("C", vec![labelled, Instruction::end_function(loc())]);

    let mut config = Config::default();
    config.error_labels.push("ERROR".into());
    check_model(&mut model, &config).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    assert_eq!(assertions.len(), 1);
    let (class, comment, cond) = &assertions[0];
    assert_eq!(class, "error label");
    assert_eq!(comment, "error label ERROR");
    assert!(cond.is_false());
}

#[test]
fn disabled_user_assertions_are_removed() {
    let user_assert = Instruction::assert(
        Expr::symbol("c", Type::bool()),
        "assertion",
        "user assertion",
        loc(),
    )
    .with_user_provided();
    let mut model = model_for("C", vec![user_assert, Instruction::end_function(loc())]);

    check_model(&mut model, &config_with(|f| f.assertions = false)).unwrap();

    let body = body_of(&model, "main");
    assert!(emitted_assertions(body).is_empty());
    assert!(!body
        .instructions
        .iter()
        .any(|i| matches!(i.body(), InstructionBody::Assert { .. })));
}

#[test]
fn disabled_assumptions_are_removed() {
    let assume = Instruction::assume(Expr::symbol("c", Type::bool()), loc());
    let mut model = model_for("C", vec![assume, Instruction::end_function(loc())]);

    check_model(&mut model, &config_with(|f| f.assumptions = false)).unwrap();

    let body = body_of(&model, "main");
    assert!(!body
        .instructions
        .iter()
        .any(|i| matches!(i.body(), InstructionBody::Assume { .. })));
}

#[test]
fn conversion_checks_follow_the_width_table() {
    let wide = Expr::symbol("w", Type::signed_int(32));
    let same = Instruction::assign(
        Expr::symbol("x", Type::signed_int(32)),
        wide.clone().cast_to(Type::signed_int(32)),
        loc(),
    );
    let narrowing = Instruction::assign(
        Expr::symbol("y", Type::signed_int(16)),
        wide.clone().cast_to(Type::signed_int(16)),
        loc(),
    );
    let unsigned_to_signed = Instruction::assign(
        Expr::symbol("z", Type::signed_int(32)),
        Expr::symbol("u", Type::unsigned_int(32)).cast_to(Type::signed_int(32)),
        loc(),
    );
    let mut model = model_for("C", vec![same, narrowing, unsigned_to_signed]);

    check_model(&mut model, &config_with(|f| f.conversion_check = true)).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    assert_eq!(assertions.len(), 2);
    assert_eq!(
        assertions[0].1,
        "arithmetic overflow on signed type conversion in (int16_t)w"
    );
    assert_eq!(
        assertions[1].1,
        "arithmetic overflow on unsigned to signed type conversion in (int32_t)u"
    );
}

#[test]
fn java_mode_has_no_mod_by_zero_check() {
    let a = int_sym("a");
    let b = int_sym("b");
    let build = |mode: &str| {
        model_for(
            mode,
            vec![Instruction::assign(int_sym("x"), a.clone().rem(b.clone()), loc())],
        )
    };

    let mut java = build("java");
    check_model(&mut java, &config_with(|f| f.div_by_zero_check = true)).unwrap();
    assert!(emitted_assertions(body_of(&java, "main")).is_empty());

    let mut c = build("C");
    check_model(&mut c, &config_with(|f| f.div_by_zero_check = true)).unwrap();
    assert_eq!(emitted_assertions(body_of(&c, "main")).len(), 1);
}

#[test]
fn java_dereferences_only_check_for_null() {
    let p = Expr::symbol("p", Type::c_int().to_pointer());
    let assign = Instruction::assign(int_sym("x"), p.dereference(), loc());
    let mut model = model_for("java", vec![assign]);

    check_model(&mut model, &config_with(|f| f.pointer_check = true)).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    assert_eq!(assertions.len(), 1);
    assert!(assertions[0].1.starts_with("dereference failure: reference is null"));
}

#[test]
fn java_method_calls_check_the_receiver() {
    let receiver_type = Type::struct_type("Object", vec![]).to_pointer();
    let method = Expr::symbol(
        "Object.toString",
        Type::code_with_this(
            vec![Type::parameter(Some("this".into()), receiver_type.clone())],
            Type::empty(),
        ),
    );
    let this = Expr::symbol("obj", receiver_type);
    let call = Instruction::function_call(None, method, vec![this], loc());
    let mut model = model_for("java", vec![call]);

    check_model(&mut model, &config_with(|f| f.pointer_check = true)).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    assert_eq!(assertions.len(), 1);
    assert!(assertions[0].1.starts_with("this is null on method invocation"));
}

#[test]
fn memory_leak_check_at_the_entry_point() {
    let mut symbol_table = SymbolTable::new();
    symbol_table.insert(Symbol::new(
        ENTRY_POINT,
        Type::code(vec![], Type::empty()),
        "C",
    ));
    symbol_table.insert(Symbol::new(
        format!("{CPROVER_PREFIX}memory_leak"),
        Type::empty().to_pointer(),
        "C",
    ));
    let mut model = GotoModel::new(symbol_table);
    model.insert_function(
        ENTRY_POINT,
        GotoProgram::new(vec![Instruction::end_function(loc())]),
    );

    check_model(&mut model, &config_with(|f| f.memory_leak_check = true)).unwrap();

    let body = body_of(&model, ENTRY_POINT);
    assert!(matches!(
        body.instructions[0].body(),
        InstructionBody::Assign { .. }
    ));
    let assertions = emitted_assertions(body);
    assert_eq!(assertions.len(), 1);
    assert_eq!(assertions[0].0, "memory-leak");
    assert!(assertions[0]
        .1
        .starts_with("dynamically allocated memory never freed"));
}

#[test]
fn dead_dirty_locals_mark_the_dead_object_sentinel() {
    let mut symbol_table = SymbolTable::new();
    symbol_table.insert(Symbol::new("main", Type::code(vec![], Type::empty()), "C"));
    symbol_table.insert(Symbol::new(
        format!("{CPROVER_PREFIX}dead_object"),
        Type::empty().to_pointer(),
        "C",
    ));
    let x = int_sym("x");
    let p = Expr::symbol("p", Type::c_int().to_pointer());
    let take_address = Instruction::assign(p, x.clone().address_of(), loc());
    let dead = Instruction::dead(x, loc());
    let mut model = GotoModel::new(symbol_table);
    model.insert_function("main", GotoProgram::new(vec![take_address, dead]));

    check_model(&mut model, &config_with(|f| f.pointer_check = true)).unwrap();

    let body = body_of(&model, "main");
    let sentinel_assigns = body
        .instructions
        .iter()
        .filter(|i| match i.body() {
            InstructionBody::Assign { lhs, .. } => lhs
                .symbol_identifier()
                .map(|id| id.starts_with(CPROVER_PREFIX))
                .unwrap_or(false),
            _ => false,
        })
        .count();
    assert_eq!(sentinel_assigns, 1);
}

#[test]
fn rw_ok_predicates_are_expanded_and_stay_expanded() {
    let p = Expr::symbol("p", Type::c_int().to_pointer());
    let ok = Expr::symbol("ok", Type::bool());
    let size = Expr::int_constant(4u64, Type::size_t());
    let assign = Instruction::assign(ok.clone(), Expr::r_ok(p, size), loc());
    let mut model = model_for("C", vec![assign]);

    let config = config_with(|f| f.pointer_check = true);
    check_model(&mut model, &config).unwrap();

    let rhs_after_first = {
        let body = body_of(&model, "main");
        let InstructionBody::Assign { rhs, .. } = body
            .instructions
            .iter()
            .find_map(|i| match i.body() {
                InstructionBody::Assign { lhs, .. } if lhs == &ok => Some(i.body()),
                _ => None,
            })
            .unwrap()
        else {
            unreachable!()
        };
        assert!(!rhs.mentions_rw_ok());
        rhs.clone()
    };

    // a second pass leaves the expansion untouched
    check_model(&mut model, &config).unwrap();
    let body = body_of(&model, "main");
    let InstructionBody::Assign { rhs, .. } = body
        .instructions
        .iter()
        .find_map(|i| match i.body() {
            InstructionBody::Assign { lhs, .. } if lhs == &ok => Some(i.body()),
            _ => None,
        })
        .unwrap()
    else {
        unreachable!()
    };
    assert_eq!(rhs, &rhs_after_first);
}

#[test]
fn member_of_dereference_checks_the_member_footprint() {
    let pair = Type::struct_type(
        "pair",
        vec![
            Type::component("first", Type::c_int()),
            Type::component("second", Type::c_int()),
        ],
    );
    let s = Expr::symbol("s", pair.to_pointer());
    let access = s.dereference().member("second");
    let assign = Instruction::assign(int_sym("x"), access, loc());
    let mut model = model_for("C", vec![assign]);

    check_model(&mut model, &config_with(|f| f.pointer_check = true)).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    assert!(!assertions.is_empty());
    // comments show the source expression, not the rewritten pointer
    assert!(assertions.iter().all(|(_, c, _)| c.ends_with("in s->second")));
}

#[test]
fn allocated_regions_weaken_pointer_conditions() {
    let base = Expr::symbol("base", Type::unsigned_int(64));
    let size = Expr::symbol("size", Type::unsigned_int(64));
    let callee = Expr::symbol(
        format!("{CPROVER_PREFIX}allocated_memory"),
        Type::code(vec![], Type::empty()),
    );
    let declare = Instruction::function_call(None, callee, vec![base, size], loc());
    let p = Expr::symbol("p", Type::c_int().to_pointer());
    let deref = Instruction::assign(int_sym("x"), p.dereference(), loc());
    let mut model = model_for("C", vec![declare, deref]);

    check_model(&mut model, &config_with(|f| f.pointer_check = true)).unwrap();

    let assertions = emitted_assertions(body_of(&model, "main"));
    let (_, _, null_cond) = assertions
        .iter()
        .find(|(_, c, _)| c.starts_with("dereference failure: pointer NULL"))
        .unwrap();
    // the condition is weakened by the explicit allocation: it must be a
    // disjunction mentioning the region base, not a bare null test
    assert!(null_cond.mentions_symbol("base".into()));
}
