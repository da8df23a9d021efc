mod common;

use common::{lower, output};
use mythc::{
    frontend::ast::{
        BinaryOperatorKind::*,
        Statement,
        build::{
            AtLine, anonymous_function, assign_var, binary, call, declare, dec,
            expression_statement, for_loop, function, if_then, int, parameter, print, range,
            return_value, string, var, while_loop,
        },
    },
    middle::{
        lir::{BinaryOperator, Instruction, Module, pretty_print::pretty_print_module},
        lowering::runtime,
        ty::Type,
    },
};

fn binary_operators(module: &Module, function: &str) -> Vec<BinaryOperator> {
    module
        .function(function)
        .unwrap_or_else(|| panic!("no function {function}"))
        .blocks
        .iter()
        .flat_map(|b| &b.instructions)
        .filter_map(|i| match i {
            Instruction::BinaryOperation { operator, .. } => Some(*operator),
            _ => None,
        })
        .collect()
}

fn looping_program() -> Vec<Statement> {
    vec![
        function(
            "square",
            vec![parameter("n", Type::INT)],
            Type::INT,
            vec![return_value(binary(var("n", Type::INT), Multiply, var("n", Type::INT))).at(2)],
        )
        .at(1),
        for_loop(
            &["i"],
            range(int(0), int(4)),
            vec![
                if_then(
                    binary(var("i", Type::INT), GreaterThan, int(1)),
                    vec![print(call("square", Type::INT, vec![var("i", Type::INT)])).at(5)],
                )
                .at(4),
            ],
        )
        .at(3),
        declare("k", Type::INT, Some(int(3))).at(6),
        while_loop(
            binary(var("k", Type::INT), GreaterThan, int(0)),
            vec![assign_var("k", binary(var("k", Type::INT), Subtract, int(1))).at(8)],
        )
        .at(7),
        print(dec(0.5)).at(9),
        print(dec(1.5)).at(10),
    ]
}

#[test]
fn lowering_is_deterministic() {
    let first = lower(looping_program());
    let second = lower(looping_program());

    assert_eq!(first, second);
    assert_eq!(pretty_print_module(&first), pretty_print_module(&second));
}

#[test]
fn only_the_exit_block_returns() {
    let module = lower(looping_program());

    for function in &module.function_definitions {
        for block in function.blocks.iter() {
            assert!(
                block.is_terminated(),
                "{}: block {} is not terminated",
                function.symbol_name,
                block.label
            );
            assert_eq!(
                block.returns(),
                block.id == function.exit,
                "{}: block {}",
                function.symbol_name,
                block.label
            );
        }
    }
}

#[test]
fn predecessors_mirror_successors() {
    let module = lower(looping_program());

    for function in &module.function_definitions {
        for block in function.blocks.iter() {
            for successor in block.successors() {
                assert!(
                    function.blocks[successor].predecessors.contains(&block.id),
                    "{}: {} -> {}",
                    function.symbol_name,
                    block.label,
                    function.blocks[successor].label
                );
            }
        }
    }
}

#[test]
fn stack_slots_are_reserved_in_the_entry_block() {
    let module = lower(looping_program());

    for function in &module.function_definitions {
        for block in function.blocks.iter().skip(1) {
            assert!(
                !block
                    .instructions
                    .iter()
                    .any(|i| matches!(i, Instruction::AllocStack { .. })),
                "{}: stack slot reserved in {}",
                function.symbol_name,
                block.label
            );
        }
    }
}

#[test]
fn runtime_comes_first_and_the_entry_function_last() {
    let module = lower(looping_program());
    let names = module
        .function_definitions
        .iter()
        .map(|f| f.symbol_name.value())
        .collect::<Vec<_>>();

    assert_eq!(names.first(), Some(&runtime::DYN_ARRAY_INIT));
    assert_eq!(names.last(), Some(&"main"));
    assert_eq!(names[names.len() - 2], "square");

    for host in [runtime::PUTCHAR, runtime::PRINTF, runtime::MALLOC, runtime::EXIT] {
        assert!(module.host_declaration(host).is_some(), "{host}");
    }
}

#[test]
fn static_strings_are_shared() {
    let module = lower(looping_program());

    assert_eq!(module.static_strings.len(), 1);
    assert_eq!(module.static_strings.iter().next().map(|s| s.value()), Some("%g"));
}

#[test]
fn mixed_arithmetic_is_floating() {
    let module = lower(vec![
        declare("x", Type::DEC, Some(binary(int(1), Add, dec(2.0)))).at(1),
        declare("y", Type::DEC, Some(binary(int(3), Divide, int(2)))).at(2),
        declare("z", Type::INT, Some(binary(int(3), FloorDivide, int(2)))).at(3),
    ]);

    let operators = binary_operators(&module, "main");
    assert!(operators.contains(&BinaryOperator::FAdd));
    assert!(operators.contains(&BinaryOperator::FDiv));
    assert!(operators.contains(&BinaryOperator::SDiv));
    assert!(!operators.contains(&BinaryOperator::Add));
}

#[test]
fn constant_powers_unroll_into_multiplications() {
    let module = lower(vec![
        declare("x", Type::INT, Some(binary(int(3), Power, int(4)))).at(1),
    ]);

    let multiplications = binary_operators(&module, "main")
        .into_iter()
        .filter(|o| *o == BinaryOperator::Mul)
        .count();
    assert_eq!(multiplications, 4);
}

#[test]
fn user_functions_never_take_a_reserved_symbol() {
    let statements = vec![
        function("main", Vec::new(), Type::Void, vec![print(string("inner")).at(2)]).at(1),
        function("print_str", Vec::new(), Type::Void, vec![print(string("shadow")).at(4)]).at(3),
        expression_statement(call("main", Type::Void, Vec::new())).at(5),
        expression_statement(call("print_str", Type::Void, Vec::new())).at(6),
    ];

    let module = lower(statements.clone());
    assert!(module.function("main.1").is_some());
    assert!(module.function("print_str.1").is_some());

    assert_eq!(output(statements), "inner\nshadow\n");
}

#[test]
fn functions_sharing_a_name_get_distinct_symbols() {
    let body = |text: &str, line| vec![print(string(text)).at(line)];

    let statements = vec![
        function("f", Vec::new(), Type::Void, body("first", 2)).at(1),
        expression_statement(call("f", Type::Void, Vec::new())).at(3),
        function("f", Vec::new(), Type::Void, body("second", 5)).at(4),
        expression_statement(call("f", Type::Void, Vec::new())).at(6),
    ];

    let module = lower(statements.clone());
    assert!(module.function("f").is_some());
    assert!(module.function("f.1").is_some());

    assert_eq!(output(statements), "first\nsecond\n");
}

#[test]
fn anonymous_functions_are_numbered() {
    let module = lower(vec![
        declare(
            "one",
            Type::Function,
            Some(anonymous_function(Vec::new(), Type::INT, vec![return_value(int(1)).at(2)])),
        )
        .at(1),
        declare(
            "two",
            Type::Function,
            Some(anonymous_function(Vec::new(), Type::INT, vec![return_value(int(2)).at(4)])),
        )
        .at(3),
    ]);

    assert!(module.function("anon0").is_some());
    assert!(module.function("anon1").is_some());
}
