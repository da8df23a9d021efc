mod common;

use common::{lower_error, output};
use mythc::{
    CodegenErrorKind,
    frontend::{
        ast::{
            AssignmentOperatorKind,
            BinaryOperatorKind::*,
            Statement,
            build::{
                AtLine, anonymous_function, assign_var, binary, call, call_named, dec, declare,
                expression_statement, for_loop, function, function_with_varargs, if_then, int,
                operator_assign, parameter, parameter_with_default, print, return_value,
                return_void, string, var,
            },
        },
        intern::InternedSymbol,
    },
    middle::ty::Type,
};

fn symbol(name: &str) -> InternedSymbol {
    InternedSymbol::new(name)
}

/// `func scale(a: int, b: int = 5) -> int { return a * b }`
fn scale() -> Statement {
    function(
        "scale",
        vec![
            parameter("a", Type::INT),
            parameter_with_default("b", Type::INT, int(5)),
        ],
        Type::INT,
        vec![return_value(binary(var("a", Type::INT), Multiply, var("b", Type::INT))).at(2)],
    )
    .at(1)
}

#[test]
fn defaults_fill_missing_arguments() {
    let stdout = output(vec![
        scale(),
        print(call("scale", Type::INT, vec![int(3)])).at(3),
        print(call("scale", Type::INT, vec![int(3), int(2)])).at(4),
    ]);

    assert_eq!(stdout, "15\n6\n");
}

#[test]
fn named_arguments_bind_by_name() {
    let stdout = output(vec![
        scale(),
        print(call_named("scale", Type::INT, vec![int(3)], vec![("b", int(9))])).at(3),
        print(call_named("scale", Type::INT, Vec::new(), vec![("a", int(2))])).at(4),
        print(call_named(
            "scale",
            Type::INT,
            Vec::new(),
            vec![("b", int(4)), ("a", int(10))],
        ))
        .at(5),
    ]);

    assert_eq!(stdout, "27\n10\n40\n");
}

#[test]
fn surplus_positional_arguments_are_rejected() {
    assert_eq!(
        lower_error(vec![
            scale(),
            print(call("scale", Type::INT, vec![int(1), int(2), int(3)])).at(3),
        ]),
        CodegenErrorKind::UnexpectedArguments(symbol("scale"))
    );
}

#[test]
fn unknown_named_arguments_are_rejected() {
    assert_eq!(
        lower_error(vec![
            scale(),
            print(call_named("scale", Type::INT, vec![int(1)], vec![("c", int(3))])).at(3),
        ]),
        CodegenErrorKind::UnexpectedArguments(symbol("scale"))
    );
}

#[test]
fn named_arguments_count_towards_the_parameter_limit() {
    assert_eq!(
        lower_error(vec![
            scale(),
            print(call_named("scale", Type::INT, vec![int(1), int(2)], vec![("b", int(3))])).at(3),
        ]),
        CodegenErrorKind::UnexpectedArguments(symbol("scale"))
    );
}

#[test]
fn arguments_cannot_be_bound_twice() {
    assert_eq!(
        lower_error(vec![
            scale(),
            print(call_named("scale", Type::INT, vec![int(1)], vec![("a", int(2))])).at(3),
        ]),
        CodegenErrorKind::MultipleValues {
            function: symbol("scale"),
            argument: symbol("a"),
        }
    );

    assert_eq!(
        lower_error(vec![
            scale(),
            print(call_named(
                "scale",
                Type::INT,
                vec![int(1)],
                vec![("b", int(2)), ("b", int(3))],
            ))
            .at(3),
        ]),
        CodegenErrorKind::MultipleValues {
            function: symbol("scale"),
            argument: symbol("b"),
        }
    );
}

#[test]
fn required_arguments_must_be_given() {
    assert_eq!(
        lower_error(vec![scale(), print(call("scale", Type::INT, Vec::new())).at(3)]),
        CodegenErrorKind::MissingArgument {
            function: symbol("scale"),
            argument: symbol("a"),
        }
    );
}

#[test]
fn surplus_arguments_are_packed_into_varargs() {
    let stdout = output(vec![
        function_with_varargs(
            "count_above",
            vec![parameter("limit", Type::INT)],
            Some(("values", Type::INT)),
            Type::INT,
            vec![
                declare("count", Type::INT, Some(int(0))).at(2),
                for_loop(
                    &["v"],
                    var("values", Type::array(Type::INT)),
                    vec![
                        if_then(
                            binary(var("v", Type::INT), GreaterThan, var("limit", Type::INT)),
                            vec![
                                operator_assign(
                                    var("count", Type::INT),
                                    AssignmentOperatorKind::Add,
                                    int(1),
                                )
                                .at(5),
                            ],
                        )
                        .at(4),
                    ],
                )
                .at(3),
                return_value(var("count", Type::INT)).at(6),
            ],
        )
        .at(1),
        print(call("count_above", Type::INT, vec![int(2), int(1), int(5), int(3), int(2)])).at(7),
        print(call("count_above", Type::INT, vec![int(2)])).at(8),
    ]);

    assert_eq!(stdout, "2\n0\n");
}

#[test]
fn functions_may_call_themselves() {
    let n = || var("n", Type::INT);

    let stdout = output(vec![
        function(
            "factorial",
            vec![parameter("n", Type::INT)],
            Type::INT,
            vec![
                if_then(
                    binary(n(), LessThanOrEqualTo, int(1)),
                    vec![return_value(int(1)).at(3)],
                )
                .at(2),
                return_value(binary(
                    n(),
                    Multiply,
                    call("factorial", Type::INT, vec![binary(n(), Subtract, int(1))]),
                ))
                .at(4),
            ],
        )
        .at(1),
        print(call("factorial", Type::INT, vec![int(10)])).at(5),
    ]);

    assert_eq!(stdout, "3628800\n");
}

#[test]
fn functions_are_not_visible_before_their_declaration() {
    assert_eq!(
        lower_error(vec![
            expression_statement(call("later", Type::Void, Vec::new())).at(1),
            function("later", Vec::new(), Type::Void, vec![return_void().at(3)]).at(2),
        ]),
        CodegenErrorKind::UnresolvedName(symbol("later"))
    );
}

#[test]
fn functions_can_be_aliased() {
    let stdout = output(vec![
        scale(),
        declare("times", Type::Function, Some(var("scale", Type::Function))).at(3),
        print(call("times", Type::INT, vec![int(4)])).at(4),
        assign_var(
            "twice",
            anonymous_function(
                vec![parameter("x", Type::INT)],
                Type::INT,
                vec![return_value(binary(var("x", Type::INT), Multiply, int(2))).at(6)],
            ),
        )
        .at(5),
        print(call("twice", Type::INT, vec![int(21)])).at(7),
    ]);

    assert_eq!(stdout, "20\n42\n");
}

#[test]
fn nested_functions_are_scoped_to_their_parent() {
    let stdout = output(vec![
        function(
            "outer",
            vec![parameter("x", Type::INT)],
            Type::INT,
            vec![
                function(
                    "inner",
                    vec![parameter("y", Type::INT)],
                    Type::INT,
                    vec![return_value(binary(var("y", Type::INT), Add, int(1))).at(3)],
                )
                .at(2),
                return_value(call("inner", Type::INT, vec![var("x", Type::INT)])).at(4),
            ],
        )
        .at(1),
        print(call("outer", Type::INT, vec![int(1)])).at(5),
    ]);

    assert_eq!(stdout, "2\n");

    assert_eq!(
        lower_error(vec![
            function(
                "outer",
                Vec::new(),
                Type::Void,
                vec![function("inner", Vec::new(), Type::Void, Vec::new()).at(2)],
            )
            .at(1),
            expression_statement(call("inner", Type::Void, Vec::new())).at(3),
        ]),
        CodegenErrorKind::UnresolvedName(symbol("inner"))
    );
}

#[test]
fn enclosing_variables_cannot_be_captured() {
    assert_eq!(
        lower_error(vec![
            declare("limit", Type::INT, Some(int(3))).at(1),
            function(
                "f",
                Vec::new(),
                Type::INT,
                vec![return_value(var("limit", Type::INT)).at(3)],
            )
            .at(2),
        ]),
        CodegenErrorKind::CapturedVariable(symbol("limit"))
    );
}

#[test]
fn return_values_are_converted_to_the_declared_type() {
    let stdout = output(vec![
        function("half", Vec::new(), Type::DEC, vec![return_value(int(1)).at(2)]).at(1),
        print(binary(call("half", Type::DEC, Vec::new()), Divide, int(2))).at(3),
        function(
            "whole",
            vec![parameter("d", Type::DEC)],
            Type::INT,
            vec![return_value(var("d", Type::DEC)).at(5)],
        )
        .at(4),
        print(call("whole", Type::INT, vec![dec(7.9)])).at(6),
    ]);

    assert_eq!(stdout, "0.5\n7\n");
}

#[test]
fn code_after_a_return_is_not_run() {
    let stdout = output(vec![
        function(
            "early",
            Vec::new(),
            Type::Void,
            vec![
                print(string("before")).at(2),
                return_void().at(3),
                print(string("after")).at(4),
            ],
        )
        .at(1),
        expression_statement(call("early", Type::Void, Vec::new())).at(5),
    ]);

    assert_eq!(stdout, "before\n");
}

#[test]
fn void_functions_have_no_value() {
    assert_eq!(
        lower_error(vec![
            function("nothing", Vec::new(), Type::Void, vec![return_void().at(2)]).at(1),
            declare("x", Type::INT, Some(call("nothing", Type::INT, Vec::new()))).at(3),
        ]),
        CodegenErrorKind::VoidValue(symbol("nothing"))
    );

    assert_eq!(
        lower_error(vec![
            function("nothing", Vec::new(), Type::Void, vec![return_value(int(1)).at(2)]).at(1),
        ]),
        CodegenErrorKind::TypeMismatch {
            expected: Type::Void,
            found: Type::INT,
        }
    );
}

#[test]
fn only_functions_are_callable() {
    assert_eq!(
        lower_error(vec![
            declare("x", Type::INT, Some(int(1))).at(1),
            expression_statement(call("x", Type::Void, Vec::new())).at(2),
        ]),
        CodegenErrorKind::NotCallable(symbol("x"))
    );
}
