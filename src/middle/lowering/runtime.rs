//! The runtime library every program is linked against, expressed in LIR.
//!
//! A dynamic array is a heap allocated record `{ length, capacity, data }`
//! where `data` points to `capacity` 8 byte words. Element `i` lives in
//! `data[i]`. Records are created by [`DYN_ARRAY_INIT`], grown by doubling and
//! never shrunk or freed. Strings are dynamic arrays of byte codes, which is
//! what the printing and input helpers at the bottom of this module work on.

use log::debug;

use super::blocks::FunctionBuilder;
use crate::{
    frontend::intern::InternedSymbol,
    middle::lir::{self, ComparePredicate, IntegerWidth, Operand, RegisterId},
};

pub const DYN_ARRAY_INIT: &str = "dyn_array_init";
pub const DYN_ARRAY_DOUBLE_CAPACITY_IF_FULL: &str = "dyn_array_double_capacity_if_full";
pub const DYN_ARRAY_APPEND: &str = "dyn_array_append";
pub const DYN_ARRAY_GET: &str = "dyn_array_get";
pub const DYN_ARRAY_SET: &str = "dyn_array_set";
pub const DYN_ARRAY_LENGTH: &str = "dyn_array_length";
pub const DYN_ARRAY_COPY: &str = "dyn_array_copy";
pub const CREATE_RANGE: &str = "create_range";
pub const PRINT_STR: &str = "print_str";
pub const INT_TO_STR: &str = "int_to_str";
pub const BOOL_TO_STR: &str = "bool_to_str";
pub const READ_INT: &str = "read_int";

pub const PUTCHAR: &str = "putchar";
pub const PRINTF: &str = "printf";
pub const MALLOC: &str = "malloc";
pub const REALLOC: &str = "realloc";
pub const FREE: &str = "free";
pub const EXIT: &str = "exit";
pub const GETCHAR: &str = "getchar";

pub const INITIAL_CAPACITY: i64 = 100;
pub const ELEMENT_SIZE: i64 = 8;
pub const RECORD_SIZE: i64 = 24;

const LENGTH: usize = 0;
const CAPACITY: usize = 1;
const DATA: usize = 2;

/// Names no user function may be emitted under
pub const RESERVED_SYMBOLS: &[&str] = &[
    DYN_ARRAY_INIT,
    DYN_ARRAY_DOUBLE_CAPACITY_IF_FULL,
    DYN_ARRAY_APPEND,
    DYN_ARRAY_GET,
    DYN_ARRAY_SET,
    DYN_ARRAY_LENGTH,
    DYN_ARRAY_COPY,
    CREATE_RANGE,
    PRINT_STR,
    INT_TO_STR,
    BOOL_TO_STR,
    READ_INT,
    PUTCHAR,
    PRINTF,
    MALLOC,
    REALLOC,
    FREE,
    EXIT,
    GETCHAR,
];

pub fn host_declarations() -> Vec<lir::HostDeclaration> {
    let host = |name: &str, parameters: Vec<lir::Type>, return_type, variadic| {
        lir::HostDeclaration {
            symbol_name: InternedSymbol::new(name),
            parameters,
            return_type,
            variadic,
        }
    };

    vec![
        host(PUTCHAR, vec![lir::Type::I64], Some(lir::Type::I64), false),
        host(PRINTF, vec![lir::Type::Pointer], Some(lir::Type::I32), true),
        host(MALLOC, vec![lir::Type::I64], Some(lir::Type::Pointer), false),
        host(
            REALLOC,
            vec![lir::Type::Pointer, lir::Type::I64],
            Some(lir::Type::Pointer),
            false,
        ),
        host(FREE, vec![lir::Type::Pointer], None, false),
        host(EXIT, vec![lir::Type::I32], None, false),
        host(GETCHAR, vec![], Some(lir::Type::I32), false),
    ]
}

/// Emits every runtime function, callees before callers
pub fn emit_runtime_library() -> Vec<lir::FunctionDefinition> {
    debug!("emitting runtime library");

    vec![
        emit_init(),
        emit_double_capacity_if_full(),
        emit_append(),
        emit_get(),
        emit_set(),
        emit_length(),
        emit_copy(),
        emit_create_range(),
        emit_print_str(),
        emit_int_to_str(),
        emit_bool_to_str(),
        emit_read_int(),
    ]
}

/* Helpers shared with the lowering of user code */

/// `malloc` a fresh record and initialize it
pub fn new_array(builder: &mut FunctionBuilder) -> RegisterId {
    let record = call_value(
        builder,
        MALLOC,
        vec![Operand::i64(RECORD_SIZE)],
        lir::Type::Pointer,
    );
    builder.call(DYN_ARRAY_INIT, vec![record.into()], None);
    record
}

/// A fresh record with its own copy of the elements of `source`
pub fn copy_array(builder: &mut FunctionBuilder, source: Operand) -> RegisterId {
    let record = call_value(
        builder,
        MALLOC,
        vec![Operand::i64(RECORD_SIZE)],
        lir::Type::Pointer,
    );
    builder.call(DYN_ARRAY_COPY, vec![record.into(), source], None);
    record
}

pub fn append(builder: &mut FunctionBuilder, array: Operand, value: Operand) {
    builder.call(DYN_ARRAY_APPEND, vec![array, value], None);
}

pub fn length(builder: &mut FunctionBuilder, array: Operand) -> RegisterId {
    call_value(builder, DYN_ARRAY_LENGTH, vec![array], lir::Type::I64)
}

pub fn get(builder: &mut FunctionBuilder, array: Operand, index: Operand) -> RegisterId {
    call_value(builder, DYN_ARRAY_GET, vec![array, index], lir::Type::I64)
}

pub fn set(builder: &mut FunctionBuilder, array: Operand, index: Operand, value: Operand) {
    builder.call(DYN_ARRAY_SET, vec![array, index, value], None);
}

/// Terminates the process with exit code 1. The current block ends with a
/// jump to the exit block so that it stays the only returning block.
pub fn fatal_exit(builder: &mut FunctionBuilder) {
    builder.call(
        EXIT,
        vec![Operand::Immediate(lir::Immediate::Int(1, IntegerWidth::I32))],
        None,
    );
    let exit = builder.exit_block();
    builder.branch(exit);
}

fn call_value(
    builder: &mut FunctionBuilder,
    function: &str,
    arguments: Vec<Operand>,
    ty: lir::Type,
) -> RegisterId {
    let destination = builder.create_register(ty.clone());
    builder.push_instruction(lir::Instruction::FunctionCall {
        target: Operand::function(function),
        arguments,
        destination: Some(destination),
    });
    destination
}

fn field_pointer(builder: &mut FunctionBuilder, record: Operand, field: usize) -> RegisterId {
    builder.struct_element_pointer(record, &lir::Struct::dynamic_array(), field)
}

fn load_field(builder: &mut FunctionBuilder, record: Operand, field: usize) -> RegisterId {
    let ty = lir::Struct::dynamic_array().0[field].clone();
    let pointer = field_pointer(builder, record, field);
    builder.load(pointer.into(), ty)
}

fn store_field(builder: &mut FunctionBuilder, record: Operand, field: usize, value: Operand) {
    let pointer = field_pointer(builder, record, field);
    builder.store(pointer.into(), value);
}

fn add(builder: &mut FunctionBuilder, lhs: Operand, rhs: Operand) -> RegisterId {
    builder.binary(lir::BinaryOperator::Add, lhs, rhs, lir::Type::I64)
}

fn mul(builder: &mut FunctionBuilder, lhs: Operand, rhs: Operand) -> RegisterId {
    builder.binary(lir::BinaryOperator::Mul, lhs, rhs, lir::Type::I64)
}

fn counter(builder: &mut FunctionBuilder, initial: Operand) -> RegisterId {
    let slot = builder.alloc_stack(lir::Type::I64);
    builder.store(slot.into(), initial);
    slot
}

fn increment(builder: &mut FunctionBuilder, slot: RegisterId, by: i64) {
    let value = builder.load(slot.into(), lir::Type::I64);
    let next = add(builder, value.into(), Operand::i64(by));
    builder.store(slot.into(), next.into());
}

fn builder(name: &str, parameters: &[lir::Type], return_type: Option<lir::Type>) -> FunctionBuilder {
    FunctionBuilder::new(InternedSymbol::new(name), parameters, return_type)
}

/// Emits `for slot in start..stop { body }`, re-evaluating `stop` before
/// every iteration
fn emit_counted_loop(
    b: &mut FunctionBuilder,
    start: Operand,
    stop: impl Fn(&mut FunctionBuilder) -> Operand,
    body: impl FnOnce(&mut FunctionBuilder, Operand),
) {
    let slot = counter(b, start);
    let cond = b.new_block("loop.cond");
    let body_block = b.new_block("loop.body");
    let end = b.new_block("loop.end");

    b.branch(cond);
    b.position_at(cond);
    let position = b.load(slot.into(), lir::Type::I64);
    let stop = stop(b);
    let more = b.compare(ComparePredicate::Slt, position.into(), stop);
    b.conditional_branch(more.into(), body_block, end);

    b.position_at(body_block);
    let position = b.load(slot.into(), lir::Type::I64);
    body(b, position.into());
    increment(b, slot, 1);
    b.branch(cond);

    b.position_at(end);
}

/* Dynamic array */

fn emit_init() -> lir::FunctionDefinition {
    let mut b = builder(DYN_ARRAY_INIT, &[lir::Type::Pointer], None);
    let array: Operand = b.arguments()[0].into();

    store_field(&mut b, array, LENGTH, Operand::i64(0));
    store_field(&mut b, array, CAPACITY, Operand::i64(INITIAL_CAPACITY));
    let data = call_value(
        &mut b,
        MALLOC,
        vec![Operand::i64(INITIAL_CAPACITY * ELEMENT_SIZE)],
        lir::Type::Pointer,
    );
    store_field(&mut b, array, DATA, data.into());

    b.finish()
}

fn emit_double_capacity_if_full() -> lir::FunctionDefinition {
    let mut b = builder(DYN_ARRAY_DOUBLE_CAPACITY_IF_FULL, &[lir::Type::Pointer], None);
    let array: Operand = b.arguments()[0].into();

    let length = load_field(&mut b, array, LENGTH);
    let capacity = load_field(&mut b, array, CAPACITY);
    let full = b.compare(ComparePredicate::Sge, length.into(), capacity.into());

    let grow = b.new_block("grow");
    let exit = b.exit_block();
    b.conditional_branch(full.into(), grow, exit);

    b.position_at(grow);
    let capacity = mul(&mut b, capacity.into(), Operand::i64(2));
    store_field(&mut b, array, CAPACITY, capacity.into());
    let size = mul(&mut b, capacity.into(), Operand::i64(ELEMENT_SIZE));
    let data = load_field(&mut b, array, DATA);
    let data = call_value(
        &mut b,
        REALLOC,
        vec![data.into(), size.into()],
        lir::Type::Pointer,
    );
    store_field(&mut b, array, DATA, data.into());

    b.finish()
}

fn emit_append() -> lir::FunctionDefinition {
    let mut b = builder(DYN_ARRAY_APPEND, &[lir::Type::Pointer, lir::Type::I64], None);
    let array: Operand = b.arguments()[0].into();
    let value: Operand = b.arguments()[1].into();

    b.call(DYN_ARRAY_DOUBLE_CAPACITY_IF_FULL, vec![array], None);

    let length = load_field(&mut b, array, LENGTH);
    let data = load_field(&mut b, array, DATA);
    let element = b.element_pointer(data.into(), lir::Type::I64, length.into());
    b.store(element.into(), value);

    let length = add(&mut b, length.into(), Operand::i64(1));
    store_field(&mut b, array, LENGTH, length.into());

    b.finish()
}

/// Normalizes a possibly negative index and leaves a pointer to the element
/// in the returned register, terminating the process when the index is out of
/// bounds
fn emit_checked_element_pointer(b: &mut FunctionBuilder, array: Operand, index: Operand) -> RegisterId {
    let length = load_field(b, array, LENGTH);
    let slot = counter(b, index);

    let normalize = b.new_block("index.negative");
    let check = b.new_block("index.check");
    let out_of_bounds = b.new_block("index.out_of_bounds");
    let in_bounds = b.new_block("index.in_bounds");

    let negative = b.compare(ComparePredicate::Slt, index, Operand::i64(0));
    b.conditional_branch(negative.into(), normalize, check);

    b.position_at(normalize);
    let adjusted = add(b, index, length.into());
    b.store(slot.into(), adjusted.into());
    b.branch(check);

    // still negative indices wrap around to huge unsigned values
    b.position_at(check);
    let index = b.load(slot.into(), lir::Type::I64);
    let outside = b.compare(ComparePredicate::Uge, index.into(), length.into());
    b.conditional_branch(outside.into(), out_of_bounds, in_bounds);

    b.position_at(out_of_bounds);
    fatal_exit(b);

    b.position_at(in_bounds);
    let data = load_field(b, array, DATA);
    b.element_pointer(data.into(), lir::Type::I64, index.into())
}

fn emit_get() -> lir::FunctionDefinition {
    let mut b = builder(
        DYN_ARRAY_GET,
        &[lir::Type::Pointer, lir::Type::I64],
        Some(lir::Type::I64),
    );
    let array: Operand = b.arguments()[0].into();
    let index: Operand = b.arguments()[1].into();

    let element = emit_checked_element_pointer(&mut b, array, index);
    let value = b.load(element.into(), lir::Type::I64);

    if let Some(slot) = b.return_slot() {
        b.store(slot.into(), value.into());
    }

    b.finish()
}

fn emit_set() -> lir::FunctionDefinition {
    let mut b = builder(
        DYN_ARRAY_SET,
        &[lir::Type::Pointer, lir::Type::I64, lir::Type::I64],
        None,
    );
    let array: Operand = b.arguments()[0].into();
    let index: Operand = b.arguments()[1].into();
    let value: Operand = b.arguments()[2].into();

    let element = emit_checked_element_pointer(&mut b, array, index);
    b.store(element.into(), value);

    b.finish()
}

fn emit_length() -> lir::FunctionDefinition {
    let mut b = builder(DYN_ARRAY_LENGTH, &[lir::Type::Pointer], Some(lir::Type::I64));
    let array: Operand = b.arguments()[0].into();

    let length = load_field(&mut b, array, LENGTH);
    if let Some(slot) = b.return_slot() {
        b.store(slot.into(), length.into());
    }

    b.finish()
}

/// `dyn_array_copy(destination, source)` gives `destination` its own backing
/// store holding the elements of `source`
fn emit_copy() -> lir::FunctionDefinition {
    let mut b = builder(DYN_ARRAY_COPY, &[lir::Type::Pointer, lir::Type::Pointer], None);
    let destination: Operand = b.arguments()[0].into();
    let source: Operand = b.arguments()[1].into();

    let length = load_field(&mut b, source, LENGTH);
    let capacity = load_field(&mut b, source, CAPACITY);
    store_field(&mut b, destination, LENGTH, length.into());
    store_field(&mut b, destination, CAPACITY, capacity.into());

    let size = mul(&mut b, capacity.into(), Operand::i64(ELEMENT_SIZE));
    let data = call_value(&mut b, MALLOC, vec![size.into()], lir::Type::Pointer);
    store_field(&mut b, destination, DATA, data.into());
    let source_data = load_field(&mut b, source, DATA);

    emit_counted_loop(
        &mut b,
        Operand::i64(0),
        |_| length.into(),
        |b, position| {
            let from = b.element_pointer(source_data.into(), lir::Type::I64, position);
            let value = b.load(from.into(), lir::Type::I64);
            let to = b.element_pointer(data.into(), lir::Type::I64, position);
            b.store(to.into(), value.into());
        },
    );

    b.finish()
}

fn emit_create_range() -> lir::FunctionDefinition {
    let mut b = builder(
        CREATE_RANGE,
        &[lir::Type::Pointer, lir::Type::I64, lir::Type::I64],
        None,
    );
    let array: Operand = b.arguments()[0].into();
    let start: Operand = b.arguments()[1].into();
    let stop: Operand = b.arguments()[2].into();

    emit_counted_loop(&mut b, start, |_| stop, |b, value| append(b, array, value));

    b.finish()
}

/* Strings */

/// Writes every byte code of a string, without a trailing newline
fn emit_print_str() -> lir::FunctionDefinition {
    let mut b = builder(PRINT_STR, &[lir::Type::Pointer], None);
    let string: Operand = b.arguments()[0].into();

    emit_counted_loop(
        &mut b,
        Operand::i64(0),
        |b| length(b, string).into(),
        |b, position| {
            let character = get(b, string, position);
            b.call(PUTCHAR, vec![character.into()], Some(lir::Type::I64));
        },
    );

    b.finish()
}

/// Appends the decimal digits of an integer to a string
fn emit_int_to_str() -> lir::FunctionDefinition {
    let mut b = builder(INT_TO_STR, &[lir::Type::Pointer, lir::Type::I64], None);
    let string: Operand = b.arguments()[0].into();
    let value: Operand = b.arguments()[1].into();

    // digits are produced from a non-positive copy of the value so that the
    // most negative integer needs no special case
    let remaining = counter(&mut b, value);

    let sign = b.new_block("sign");
    let digits_init = b.new_block("digits.init");
    let digits = b.new_block("digits");

    let negative = b.compare(ComparePredicate::Slt, value, Operand::i64(0));
    b.conditional_branch(negative.into(), sign, digits_init);

    b.position_at(sign);
    append(&mut b, string, Operand::i64(b'-' as i64));
    b.branch(digits_init);

    b.position_at(digits_init);
    let positive = b.compare(ComparePredicate::Sgt, value, Operand::i64(0));
    let negate = b.new_block("digits.negate");
    let collect = b.new_block("digits.collect");
    b.conditional_branch(positive.into(), negate, collect);

    b.position_at(negate);
    let negated = b.unary(lir::UnaryOperator::Neg, value, lir::Type::I64);
    b.store(remaining.into(), negated.into());
    b.branch(collect);

    b.position_at(collect);
    let reversed = new_array(&mut b);
    b.branch(digits);

    b.position_at(digits);
    let current = b.load(remaining.into(), lir::Type::I64);
    let digit = b.binary(
        lir::BinaryOperator::SRem,
        current.into(),
        Operand::i64(10),
        lir::Type::I64,
    );
    let character = b.binary(
        lir::BinaryOperator::Sub,
        Operand::i64(b'0' as i64),
        digit.into(),
        lir::Type::I64,
    );
    append(&mut b, reversed.into(), character.into());
    let quotient = b.binary(
        lir::BinaryOperator::SDiv,
        current.into(),
        Operand::i64(10),
        lir::Type::I64,
    );
    b.store(remaining.into(), quotient.into());

    let more = b.compare(ComparePredicate::Ne, quotient.into(), Operand::i64(0));
    let reverse = b.new_block("reverse");
    b.conditional_branch(more.into(), digits, reverse);

    b.position_at(reverse);
    let count = length(&mut b, reversed.into());
    emit_counted_loop(
        &mut b,
        Operand::i64(0),
        |_| count.into(),
        |b, position| {
            let last = b.binary(
                lir::BinaryOperator::Sub,
                count.into(),
                Operand::i64(1),
                lir::Type::I64,
            );
            let index = b.binary(lir::BinaryOperator::Sub, last.into(), position, lir::Type::I64);
            let character = get(b, reversed.into(), index.into());
            append(b, string, character.into());
        },
    );

    b.finish()
}

/// Appends `true` or `false` to a string
fn emit_bool_to_str() -> lir::FunctionDefinition {
    let mut b = builder(BOOL_TO_STR, &[lir::Type::Pointer, lir::Type::BOOL], None);
    let string: Operand = b.arguments()[0].into();
    let value: Operand = b.arguments()[1].into();

    let when_true = b.new_block("true");
    let when_false = b.new_block("false");
    b.conditional_branch(value, when_true, when_false);

    for (block, text) in [(when_true, "true"), (when_false, "false")] {
        b.position_at(block);
        for character in text.bytes() {
            append(&mut b, string, Operand::i64(character as i64));
        }
        let exit = b.exit_block();
        b.branch(exit);
    }

    b.finish()
}

/// Reads an optionally negative decimal integer from standard input, skipping
/// leading whitespace. Reading stops at the first byte which is not a digit.
fn emit_read_int() -> lir::FunctionDefinition {
    let mut b = builder(READ_INT, &[], Some(lir::Type::I64));

    let sign = counter(&mut b, Operand::i64(1));
    let accumulator = counter(&mut b, Operand::i64(0));
    let character = counter(&mut b, Operand::i64(0));

    let read = |b: &mut FunctionBuilder| {
        let c = call_value(b, GETCHAR, vec![], lir::Type::I32);
        let c = b.cast(lir::CastKind::SExt, c.into(), lir::Type::I64);
        b.store(character.into(), c.into());
        c
    };

    let skip = b.new_block("skip_whitespace");
    let sign_check = b.new_block("sign");
    let minus = b.new_block("minus");
    let digits = b.new_block("digits");
    let accumulate = b.new_block("accumulate");
    let done = b.new_block("done");

    b.branch(skip);
    b.position_at(skip);
    let c = read(&mut b);
    let mut whitespace: Option<RegisterId> = None;
    for byte in [b' ', b'\n', b'\t', b'\r'] {
        let is = b.compare(ComparePredicate::Eq, c.into(), Operand::i64(byte as i64));
        whitespace = Some(match whitespace {
            Some(previous) => b.binary(
                lir::BinaryOperator::Or,
                previous.into(),
                is.into(),
                lir::Type::BOOL,
            ),
            None => is,
        });
    }
    let whitespace = whitespace.map_or(Operand::Immediate(lir::Immediate::bool(false)), Into::into);
    b.conditional_branch(whitespace, skip, sign_check);

    b.position_at(sign_check);
    let is_minus = b.compare(ComparePredicate::Eq, c.into(), Operand::i64(b'-' as i64));
    b.conditional_branch(is_minus.into(), minus, digits);

    b.position_at(minus);
    b.store(sign.into(), Operand::i64(-1));
    read(&mut b);
    b.branch(digits);

    b.position_at(digits);
    let c = b.load(character.into(), lir::Type::I64);
    let at_least_zero = b.compare(ComparePredicate::Sge, c.into(), Operand::i64(b'0' as i64));
    let at_most_nine = b.compare(ComparePredicate::Sle, c.into(), Operand::i64(b'9' as i64));
    let is_digit = b.binary(
        lir::BinaryOperator::And,
        at_least_zero.into(),
        at_most_nine.into(),
        lir::Type::BOOL,
    );
    b.conditional_branch(is_digit.into(), accumulate, done);

    b.position_at(accumulate);
    let total = b.load(accumulator.into(), lir::Type::I64);
    let total = mul(&mut b, total.into(), Operand::i64(10));
    let digit = b.binary(
        lir::BinaryOperator::Sub,
        c.into(),
        Operand::i64(b'0' as i64),
        lir::Type::I64,
    );
    let total = add(&mut b, total.into(), digit.into());
    b.store(accumulator.into(), total.into());
    read(&mut b);
    b.branch(digits);

    b.position_at(done);
    let total = b.load(accumulator.into(), lir::Type::I64);
    let sign = b.load(sign.into(), lir::Type::I64);
    let result = mul(&mut b, total.into(), sign.into());
    if let Some(slot) = b.return_slot() {
        b.store(slot.into(), result.into());
    }

    b.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_runtime_function_has_a_single_return() {
        for function in emit_runtime_library() {
            let returning = function.blocks.iter().filter(|b| b.returns()).count();

            assert_eq!(returning, 1, "{}", function.symbol_name);
            assert!(function.blocks[function.exit].returns());
            assert!(function.blocks.iter().all(|b| b.is_terminated()));
        }
    }

    #[test]
    fn no_reserved_name_is_emitted_twice() {
        let library = emit_runtime_library();
        let hosts = host_declarations();

        for name in RESERVED_SYMBOLS {
            let defined = library
                .iter()
                .filter(|f| f.symbol_name.value() == *name)
                .count()
                + hosts
                    .iter()
                    .filter(|h| h.symbol_name.value() == *name)
                    .count();

            assert_eq!(defined, 1, "{name}");
        }
    }

    #[test]
    fn out_of_bounds_paths_call_exit() {
        let library = emit_runtime_library();
        let get = library
            .iter()
            .find(|f| f.symbol_name.value() == DYN_ARRAY_GET)
            .unwrap();

        let calls_exit = get.blocks.iter().any(|b| {
            b.instructions.iter().any(|i| {
                matches!(
                    i,
                    lir::Instruction::FunctionCall {
                        target: Operand::Immediate(lir::Immediate::FunctionLabel(name)),
                        ..
                    } if name.value() == EXIT
                )
            })
        });

        assert!(calls_exit);
    }
}
