mod common;

use common::{lower_error, output, run};
use mythc::{
    CodegenErrorKind,
    frontend::ast::{
        AssignmentOperatorKind,
        BinaryOperatorKind::*,
        Expression, Statement, UnaryOperatorKind,
        build::{
            AtLine, binary, boolean, break_statement, call, case, collection, continue_statement,
            dec, declare, default_case, expression_statement, for_loop, function, if_chain,
            if_then, int, operator_assign, parameter, pass, print, range, string, switch, unary,
            var, while_loop,
        },
    },
    middle::ty::Type,
};

fn i() -> Expression {
    var("i", Type::INT)
}

fn pairs(items: Vec<Vec<i64>>) -> Expression {
    collection(
        Type::array(Type::INT),
        items
            .into_iter()
            .map(|inner| collection(Type::INT, inner.into_iter().map(int).collect()))
            .collect(),
    )
}

/// Prints `neg`, `zero` or `pos` for its argument
fn classify() -> Statement {
    let n = || var("n", Type::INT);

    function(
        "classify",
        vec![parameter("n", Type::INT)],
        Type::Void,
        vec![
            if_chain(vec![
                (Some(binary(n(), LessThan, int(0))), vec![print(string("neg")).at(3)]),
                (Some(binary(n(), Equals, int(0))), vec![print(string("zero")).at(5)]),
                (None, vec![print(string("pos")).at(7)]),
            ])
            .at(2),
        ],
    )
    .at(1)
}

#[test]
fn if_chains_take_the_first_true_branch() {
    let classify_call = |value: Expression, line| {
        expression_statement(call("classify", Type::Void, vec![value])).at(line)
    };

    let stdout = output(vec![
        classify(),
        classify_call(unary(UnaryOperatorKind::Negate, int(4)), 8),
        classify_call(int(0), 9),
        classify_call(int(12), 10),
    ]);

    assert_eq!(stdout, "neg\nzero\npos\n");
}

#[test]
fn if_without_a_matching_branch_does_nothing() {
    let stdout = output(vec![
        if_then(boolean(false), vec![print(string("never")).at(2)]).at(1),
        print(string("after")).at(3),
    ]);

    assert_eq!(stdout, "after\n");
}

#[test]
fn conditions_must_be_boolean() {
    assert_eq!(
        lower_error(vec![if_then(int(1), vec![pass().at(2)]).at(1)]),
        CodegenErrorKind::TypeMismatch {
            expected: Type::BOOL,
            found: Type::INT,
        }
    );

    assert_eq!(
        lower_error(vec![while_loop(dec(1.0), vec![pass().at(2)]).at(1)]),
        CodegenErrorKind::TypeMismatch {
            expected: Type::BOOL,
            found: Type::DEC,
        }
    );
}

#[test]
fn while_loops_run_until_the_condition_fails() {
    let stdout = output(vec![
        declare("i", Type::INT, Some(int(1))).at(1),
        declare("total", Type::INT, Some(int(0))).at(2),
        while_loop(
            binary(i(), LessThanOrEqualTo, int(10)),
            vec![
                operator_assign(var("total", Type::INT), AssignmentOperatorKind::Add, i()).at(4),
                operator_assign(i(), AssignmentOperatorKind::Add, int(1)).at(5),
            ],
        )
        .at(3),
        print(var("total", Type::INT)).at(6),
    ]);

    assert_eq!(stdout, "55\n");
}

#[test]
fn continue_skips_to_the_next_iteration() {
    let stdout = output(vec![
        for_loop(
            &["i"],
            range(int(0), int(6)),
            vec![
                if_then(
                    binary(binary(i(), Modulus, int(2)), Equals, int(0)),
                    vec![continue_statement().at(3)],
                )
                .at(2),
                print(i()).at(4),
            ],
        )
        .at(1),
    ]);

    assert_eq!(stdout, "1\n3\n5\n");
}

#[test]
fn break_leaves_the_innermost_loop() {
    let stdout = output(vec![
        for_loop(
            &["i"],
            range(int(0), int(3)),
            vec![
                declare("j", Type::INT, Some(int(0))).at(2),
                while_loop(
                    boolean(true),
                    vec![
                        if_then(
                            binary(var("j", Type::INT), Equals, i()),
                            vec![break_statement().at(5)],
                        )
                        .at(4),
                        operator_assign(var("j", Type::INT), AssignmentOperatorKind::Add, int(1))
                            .at(6),
                    ],
                )
                .at(3),
                print(var("j", Type::INT)).at(7),
            ],
        )
        .at(1),
    ]);

    assert_eq!(stdout, "0\n1\n2\n");
}

#[test]
fn loop_control_outside_a_loop_is_rejected() {
    assert_eq!(
        lower_error(vec![break_statement().at(1)]),
        CodegenErrorKind::BreakOutsideLoop
    );
    assert_eq!(
        lower_error(vec![continue_statement().at(1)]),
        CodegenErrorKind::ContinueOutsideLoop
    );
    assert_eq!(
        lower_error(vec![
            switch(int(1), vec![case(int(1), vec![continue_statement().at(3)])]).at(1),
        ]),
        CodegenErrorKind::ContinueOutsideLoop
    );
}

#[test]
fn loops_do_not_leak_into_nested_functions() {
    assert_eq!(
        lower_error(vec![
            while_loop(
                boolean(true),
                vec![function("f", Vec::new(), Type::Void, vec![break_statement().at(3)]).at(2)],
            )
            .at(1),
        ]),
        CodegenErrorKind::BreakOutsideLoop
    );
}

#[test]
fn switch_cases_fall_through_until_a_break() {
    let cases = || {
        vec![
            case(int(1), vec![print(string("one")).at(3)]),
            case(int(2), vec![print(string("two")).at(5), break_statement().at(6)]),
            case(int(3), vec![print(string("three")).at(8)]),
            default_case(vec![print(string("other")).at(10)]),
        ]
    };

    let stdout = output(vec![
        switch(int(1), cases()).at(1),
        switch(int(3), cases()).at(11),
        switch(int(9), cases()).at(12),
    ]);

    assert_eq!(stdout, "one\ntwo\nthree\nother\nother\n");
}

#[test]
fn switch_without_a_default_may_match_nothing() {
    let stdout = output(vec![
        switch(int(5), vec![case(int(1), vec![print(string("one")).at(3)])]).at(1),
        print(string("end")).at(4),
    ]);

    assert_eq!(stdout, "end\n");
}

#[test]
fn negative_case_values_match() {
    let stdout = output(vec![
        switch(
            unary(UnaryOperatorKind::Negate, int(2)),
            vec![
                case(
                    unary(UnaryOperatorKind::Negate, int(2)),
                    vec![print(string("minus two")).at(3), break_statement().at(4)],
                ),
                case(int(2), vec![print(string("two")).at(6)]),
            ],
        )
        .at(1),
    ]);

    assert_eq!(stdout, "minus two\n");
}

#[test]
fn break_in_a_switch_inside_a_loop_ends_only_the_switch() {
    let stdout = output(vec![
        for_loop(
            &["i"],
            range(int(0), int(3)),
            vec![
                switch(
                    i(),
                    vec![
                        case(int(1), vec![print(string("one")).at(4), break_statement().at(5)]),
                        default_case(vec![print(string("other")).at(7)]),
                    ],
                )
                .at(2),
            ],
        )
        .at(1),
        print(string("done")).at(8),
    ]);

    assert_eq!(stdout, "other\none\nother\ndone\n");
}

#[test]
fn break_in_a_loop_inside_a_case_ends_only_the_loop() {
    let stdout = output(vec![
        switch(
            int(0),
            vec![
                case(
                    int(0),
                    vec![
                        while_loop(boolean(true), vec![break_statement().at(4)]).at(3),
                        print(string("after loop")).at(5),
                    ],
                ),
                case(int(1), vec![print(string("fell through")).at(7)]),
            ],
        )
        .at(1),
    ]);

    assert_eq!(stdout, "after loop\nfell through\n");
}

#[test]
fn switch_values_must_be_integers() {
    assert_eq!(
        lower_error(vec![switch(string("a"), vec![default_case(Vec::new())]).at(1)]),
        CodegenErrorKind::TypeMismatch {
            expected: Type::INT,
            found: Type::Str,
        }
    );

    assert_eq!(
        lower_error(vec![
            declare("x", Type::INT, Some(int(1))).at(1),
            switch(int(1), vec![case(var("x", Type::INT), Vec::new())]).at(2),
        ]),
        CodegenErrorKind::NonConstantCase
    );
}

#[test]
fn for_loops_unpack_nested_elements() {
    let stdout = output(vec![
        for_loop(
            &["a", "b"],
            pairs(vec![vec![1, 2], vec![3, 4]]),
            vec![print(binary(var("a", Type::INT), Add, var("b", Type::INT))).at(2)],
        )
        .at(1),
    ]);

    assert_eq!(stdout, "3\n7\n");
}

#[test]
fn literal_unpack_arity_is_checked_while_lowering() {
    assert_eq!(
        lower_error(vec![
            for_loop(&["a", "b"], pairs(vec![vec![1, 2], vec![3, 4, 5]]), Vec::new()).at(1),
        ]),
        CodegenErrorKind::UnpackArity {
            expected: 2,
            found: 3,
        }
    );
}

#[test]
fn unpack_arity_of_variables_is_checked_at_run_time() {
    let nested = Type::array(Type::array(Type::INT));

    assert_eq!(
        run(vec![
            declare("rows", nested.clone(), Some(pairs(vec![vec![1, 2], vec![3, 4, 5]]))).at(1),
            for_loop(
                &["a", "b"],
                var("rows", nested),
                vec![print(binary(var("a", Type::INT), Add, var("b", Type::INT))).at(3)],
            )
            .at(2),
            print(string("unreachable")).at(4),
        ]),
        (1, "3\n".to_owned())
    );
}

#[test]
fn only_arrays_can_be_iterated_or_unpacked() {
    assert_eq!(
        lower_error(vec![
            declare("n", Type::INT, Some(int(3))).at(1),
            for_loop(&["x"], var("n", Type::INT), Vec::new()).at(2),
        ]),
        CodegenErrorKind::NotIterable(Type::INT)
    );

    assert_eq!(
        lower_error(vec![
            for_loop(&["a", "b"], collection(Type::INT, vec![int(1), int(2)]), Vec::new()).at(1),
        ]),
        CodegenErrorKind::NonIterableUnpack(Type::INT)
    );
}
