mod common;

use common::{lower_error, output, run};
use mythc::{
    CodegenErrorKind,
    frontend::{
        ast::{
            AssignmentOperatorKind,
            BinaryOperatorKind::*,
            Expression, Statement, UnaryOperatorKind,
            build::{
                AtLine, assign, binary, boolean, collection, dec, declare, for_loop, index, int,
                operator_assign, print, range, string, struct_declaration, unary, var,
            },
        },
        intern::InternedSymbol,
    },
    middle::ty::Type,
};

fn ints() -> Type {
    Type::array(Type::INT)
}

fn xs() -> Expression {
    var("xs", ints())
}

fn numbers_up_to(stop: i64) -> Statement {
    declare("xs", ints(), Some(range(int(0), int(stop)))).at(1)
}

fn negative(value: i64) -> Expression {
    unary(UnaryOperatorKind::Negate, int(value))
}

#[test]
fn arrays_grow_past_their_initial_capacity() {
    let stdout = output(vec![
        numbers_up_to(250),
        declare("total", Type::INT, Some(int(0))).at(2),
        for_loop(
            &["x"],
            xs(),
            vec![
                operator_assign(
                    var("total", Type::INT),
                    AssignmentOperatorKind::Add,
                    var("x", Type::INT),
                )
                .at(4),
            ],
        )
        .at(3),
        print(var("total", Type::INT)).at(5),
        print(index(xs(), int(249))).at(6),
    ]);

    assert_eq!(stdout, "31125\n249\n");
}

#[test]
fn negative_indices_count_from_the_end() {
    let stdout = output(vec![
        numbers_up_to(150),
        print(index(xs(), negative(1))).at(2),
        print(index(xs(), negative(150))).at(3),
    ]);

    assert_eq!(stdout, "149\n0\n");
}

#[test]
fn reading_past_the_end_exits_with_one() {
    assert_eq!(
        run(vec![
            numbers_up_to(150),
            print(index(xs(), int(0))).at(2),
            print(index(xs(), int(150))).at(3),
            print(string("unreachable")).at(4),
        ]),
        (1, "0\n".to_owned())
    );
}

#[test]
fn reading_before_the_start_exits_with_one() {
    assert_eq!(
        run(vec![numbers_up_to(150), print(index(xs(), negative(151))).at(2)]),
        (1, String::new())
    );
}

#[test]
fn indexing_an_empty_array_faults() {
    assert_eq!(
        run(vec![
            declare("xs", ints(), None).at(1),
            print(index(xs(), int(0))).at(2),
        ]),
        (1, String::new())
    );
}

#[test]
fn elements_can_be_replaced() {
    let stdout = output(vec![
        declare("xs", ints(), Some(collection(Type::INT, vec![int(1), int(2), int(3)]))).at(1),
        assign(index(xs(), int(0)), int(42)).at(2),
        assign(index(xs(), negative(1)), int(7)).at(3),
        operator_assign(index(xs(), int(1)), AssignmentOperatorKind::Multiply, int(10)).at(4),
        for_loop(&["x"], xs(), vec![print(var("x", Type::INT)).at(6)]).at(5),
    ]);

    assert_eq!(stdout, "42\n20\n7\n");
}

#[test]
fn writing_out_of_bounds_exits_with_one() {
    assert_eq!(
        run(vec![
            declare("xs", ints(), Some(collection(Type::INT, vec![int(1)]))).at(1),
            assign(index(xs(), int(1)), int(2)).at(2),
        ]),
        (1, String::new())
    );
}

#[test]
fn assigning_an_array_copies_its_elements() {
    let ys = || var("ys", ints());

    let stdout = output(vec![
        numbers_up_to(3),
        declare("ys", ints(), Some(xs())).at(2),
        assign(index(ys(), int(0)), int(99)).at(3),
        print(index(xs(), int(0))).at(4),
        print(index(ys(), int(0))).at(5),
    ]);

    assert_eq!(stdout, "0\n99\n");
}

#[test]
fn ranges_are_half_open() {
    let stdout = output(vec![
        for_loop(&["i"], range(int(3), int(6)), vec![print(var("i", Type::INT)).at(2)]).at(1),
        for_loop(&["i"], range(int(5), int(2)), vec![print(var("i", Type::INT)).at(4)]).at(3),
    ]);

    assert_eq!(stdout, "3\n4\n5\n");
}

#[test]
fn strings_are_arrays_of_byte_codes() {
    let stdout = output(vec![
        declare("s", Type::Str, Some(string("hi"))).at(1),
        for_loop(&["c"], var("s", Type::Str), vec![print(var("c", Type::INT)).at(3)]).at(2),
        assign(index(var("s", Type::Str), int(0)), int(72)).at(4),
        print(var("s", Type::Str)).at(5),
    ]);

    assert_eq!(stdout, "104\n105\nHi\n");
}

#[test]
fn nested_arrays_hold_references_to_inner_arrays() {
    let matrix = Type::array(ints());

    let stdout = output(vec![
        declare(
            "m",
            matrix.clone(),
            Some(collection(
                ints(),
                vec![
                    collection(Type::INT, vec![int(1), int(2)]),
                    collection(Type::INT, vec![int(3), int(4)]),
                ],
            )),
        )
        .at(1),
        print(index(index(var("m", matrix.clone()), int(1)), int(0))).at(2),
        print(index(index(var("m", matrix), negative(2)), negative(1))).at(3),
    ]);

    assert_eq!(stdout, "3\n2\n");
}

#[test]
fn floating_elements_keep_their_bits() {
    let decs = Type::array(Type::DEC);

    let stdout = output(vec![
        declare("ds", decs.clone(), Some(collection(Type::DEC, vec![dec(1.5), int(2)]))).at(1),
        print(binary(index(var("ds", decs.clone()), int(0)), Add, index(var("ds", decs), int(1))))
            .at(2),
    ]);

    assert_eq!(stdout, "3.5\n");
}

#[test]
fn boolean_elements_round_trip() {
    let flags = Type::array(Type::BOOL);

    let stdout = output(vec![
        declare(
            "flags",
            flags.clone(),
            Some(collection(
                Type::BOOL,
                vec![boolean(true), boolean(false)],
            )),
        )
        .at(1),
        for_loop(&["f"], var("flags", flags), vec![print(var("f", Type::BOOL)).at(3)]).at(2),
    ]);

    assert_eq!(stdout, "true\nfalse\n");
}

#[test]
fn structs_cannot_be_array_elements() {
    let point = Type::Struct(InternedSymbol::new("Point"));

    assert_eq!(
        lower_error(vec![
            struct_declaration("Point", vec![("x", Type::INT)]).at(1),
            declare("ps", Type::array(point.clone()), Some(collection(point.clone(), Vec::new())))
                .at(2),
        ]),
        CodegenErrorKind::UnsupportedElementType(point)
    );
}

#[test]
fn indices_must_be_integers() {
    assert_eq!(
        lower_error(vec![numbers_up_to(3), print(index(xs(), dec(1.0))).at(2)]),
        CodegenErrorKind::TypeMismatch {
            expected: Type::INT,
            found: Type::DEC,
        }
    );
}

#[test]
fn only_arrays_and_strings_are_indexable() {
    assert_eq!(
        lower_error(vec![
            declare("n", Type::INT, Some(int(5))).at(1),
            print(index(var("n", Type::INT), int(0))).at(2),
        ]),
        CodegenErrorKind::NotIndexable(Type::INT)
    );
}
