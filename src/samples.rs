//! Annotated programs bundled with the driver, so the backend can be
//! exercised without the rest of the toolchain.

use strum::{Display, EnumIter, EnumString};

use crate::{
    frontend::ast::{
        BinaryOperatorKind::*, Program, UnaryOperatorKind,
        build::{
            AtLine, assign_var, binary, boolean, call, call_named, case, collection, dec,
            declare, default_case, field, for_loop, function, function_with_varargs, if_chain,
            index, input, int, operator_assign, parameter, parameter_with_default, print,
            program, range, return_value, string, struct_declaration, struct_literal, switch,
            unary, var, while_loop, break_statement, expression_statement,
        },
        AssignmentOperatorKind,
    },
    middle::ty::Type,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, EnumIter, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Sample {
    /// Recursive fibonacci numbers
    Fibonacci,
    /// Arrays, ranges and indexing from the end
    Arrays,
    /// Numeric promotion and printing of every printable type
    Arithmetic,
    /// Switch fallthrough and breaking out of loops
    ControlFlow,
    /// Struct values and field updates
    Structs,
    /// Default, named and variadic arguments
    Calls,
    /// Reads two integers and prints their sum
    Sum,
}

impl Sample {
    pub fn program(self) -> Program {
        match self {
            Sample::Fibonacci => fibonacci(),
            Sample::Arrays => arrays(),
            Sample::Arithmetic => arithmetic(),
            Sample::ControlFlow => control_flow(),
            Sample::Structs => structs(),
            Sample::Calls => calls(),
            Sample::Sum => sum(),
        }
    }
}

fn fibonacci() -> Program {
    let n = || var("n", Type::INT);

    program(vec![
        function(
            "fib",
            vec![parameter("n", Type::INT)],
            Type::INT,
            vec![
                if_chain(vec![(
                    Some(binary(n(), LessThan, int(2))),
                    vec![return_value(n()).at(3)],
                )])
                .at(2),
                return_value(binary(
                    call("fib", Type::INT, vec![binary(n(), Subtract, int(1))]),
                    Add,
                    call("fib", Type::INT, vec![binary(n(), Subtract, int(2))]),
                ))
                .at(4),
            ],
        )
        .at(1),
        for_loop(
            &["i"],
            range(int(0), int(10)),
            vec![print(call("fib", Type::INT, vec![var("i", Type::INT)])).at(7)],
        )
        .at(6),
    ])
}

fn arrays() -> Program {
    let xs = || var("xs", Type::array(Type::INT));

    program(vec![
        declare("xs", Type::array(Type::INT), Some(range(int(0), int(150)))).at(1),
        print(index(xs(), int(149))).at(2),
        print(index(xs(), unary(UnaryOperatorKind::Negate, int(1)))).at(3),
        declare(
            "words",
            Type::array(Type::Str),
            Some(collection(Type::Str, vec![string("hello"), string("world")])),
        )
        .at(4),
        for_loop(
            &["w"],
            var("words", Type::array(Type::Str)),
            vec![print(var("w", Type::Str)).at(6)],
        )
        .at(5),
        print(index(xs(), int(150))).at(7),
    ])
}

fn arithmetic() -> Program {
    program(vec![
        print(binary(int(1), Add, dec(2.0))).at(1),
        print(binary(int(3), Divide, int(2))).at(2),
        print(binary(int(3), FloorDivide, int(2))).at(3),
        print(binary(int(2), Power, int(10))).at(4),
        print(binary(int(7), LessThan, int(3))).at(5),
        print(string("done")).at(6),
    ])
}

fn control_flow() -> Program {
    let i = || var("i", Type::INT);

    program(vec![
        switch(
            int(1),
            vec![
                case(int(0), vec![print(string("zero")).at(3)]),
                case(int(1), vec![print(string("one")).at(5)]),
                case(int(2), vec![print(string("two")).at(7), break_statement().at(8)]),
                default_case(vec![print(string("other")).at(10)]),
            ],
        )
        .at(1),
        declare("i", Type::INT, Some(int(0))).at(11),
        while_loop(
            boolean(true),
            vec![
                operator_assign(i(), AssignmentOperatorKind::Add, int(1)).at(13),
                if_chain(vec![(
                    Some(binary(i(), GreaterThanOrEqualTo, int(5))),
                    vec![break_statement().at(15)],
                )])
                .at(14),
            ],
        )
        .at(12),
        print(i()).at(16),
    ])
}

fn structs() -> Program {
    let point = Type::Struct("Point".into());
    let p = || var("p", Type::Struct("Point".into()));

    program(vec![
        struct_declaration("Point", vec![("x", Type::INT), ("y", Type::INT)]).at(1),
        declare(
            "p",
            point.clone(),
            Some(struct_literal("Point", vec![("x", int(1)), ("y", int(2))])),
        )
        .at(2),
        assign_var("q", p()).at(3),
        operator_assign(field(p(), "x", Type::INT), AssignmentOperatorKind::Add, int(10)).at(4),
        print(field(p(), "x", Type::INT)).at(5),
        print(field(var("q", point), "x", Type::INT)).at(6),
    ])
}

fn calls() -> Program {
    let total = || var("total", Type::INT);

    program(vec![
        function(
            "scale",
            vec![
                parameter("a", Type::INT),
                parameter_with_default("b", Type::INT, int(5)),
            ],
            Type::INT,
            vec![return_value(binary(var("a", Type::INT), Multiply, var("b", Type::INT))).at(2)],
        )
        .at(1),
        print(call("scale", Type::INT, vec![int(2)])).at(3),
        print(call_named("scale", Type::INT, vec![int(2)], vec![("b", int(9))])).at(4),
        function_with_varargs(
            "sum",
            Vec::new(),
            Some(("values", Type::INT)),
            Type::INT,
            vec![
                declare("total", Type::INT, Some(int(0))).at(6),
                for_loop(
                    &["v"],
                    var("values", Type::array(Type::INT)),
                    vec![
                        operator_assign(total(), AssignmentOperatorKind::Add, var("v", Type::INT))
                            .at(8),
                    ],
                )
                .at(7),
                return_value(total()).at(9),
            ],
        )
        .at(5),
        print(call("sum", Type::INT, vec![int(1), int(2), int(3), int(4)])).at(10),
        expression_statement(call("sum", Type::INT, Vec::new())).at(11),
    ])
}

fn sum() -> Program {
    program(vec![
        declare("a", Type::INT, Some(input(Some(string("a: "))))).at(1),
        declare("b", Type::INT, Some(input(Some(string("b: "))))).at(2),
        print(binary(var("a", Type::INT), Add, var("b", Type::INT))).at(3),
    ])
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::{
        backend::eval::{EvaluationOptions, evaluate},
        middle::lowering::{CodegenOptions, lower_program},
    };

    fn run(sample: Sample, stdin: &str) -> (i32, String) {
        let module = lower_program(&sample.program(), &CodegenOptions::default()).unwrap();
        let options = EvaluationOptions {
            stdin: stdin.as_bytes().to_vec(),
            ..Default::default()
        };
        let outcome = evaluate(&module, &options).unwrap();

        (outcome.exit_code, outcome.stdout_text())
    }

    #[test]
    fn every_sample_lowers() {
        for sample in Sample::iter() {
            assert!(
                lower_program(&sample.program(), &CodegenOptions::default()).is_ok(),
                "{sample} failed to lower"
            );
        }
    }

    #[test]
    fn sample_names_are_snake_case() {
        assert_eq!("control_flow".parse::<Sample>(), Ok(Sample::ControlFlow));
        assert_eq!(Sample::Fibonacci.to_string(), "fibonacci");
    }

    #[test]
    fn fibonacci_prints_the_sequence() {
        assert_eq!(
            run(Sample::Fibonacci, ""),
            (0, "0\n1\n1\n2\n3\n5\n8\n13\n21\n34\n".to_owned())
        );
    }

    #[test]
    fn arrays_fault_on_the_last_access() {
        assert_eq!(
            run(Sample::Arrays, ""),
            (1, "149\n149\nhello\nworld\n".to_owned())
        );
    }

    #[test]
    fn arithmetic_promotes() {
        assert_eq!(
            run(Sample::Arithmetic, ""),
            (0, "3\n1.5\n1\n1024\nfalse\ndone\n".to_owned())
        );
    }

    #[test]
    fn control_flow_falls_through_until_break() {
        assert_eq!(run(Sample::ControlFlow, ""), (0, "one\ntwo\n5\n".to_owned()));
    }

    #[test]
    fn structs_are_copied_on_assignment() {
        assert_eq!(run(Sample::Structs, ""), (0, "11\n1\n".to_owned()));
    }

    #[test]
    fn calls_bind_defaults_named_and_variadic_arguments() {
        assert_eq!(run(Sample::Calls, ""), (0, "10\n18\n10\n".to_owned()));
    }

    #[test]
    fn sum_reads_stdin() {
        assert_eq!(run(Sample::Sum, "4\n-9\n"), (0, "a: b: -5\n".to_owned()));
    }
}
