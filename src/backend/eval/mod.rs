//! A deterministic interpreter for LIR modules.
//!
//! Generated programs are run without a native toolchain: every function of
//! the module is interpreted block by block, and the C library primitives the
//! module declares are simulated (see [`host`]). Standard output is captured
//! and standard input is read from a buffer given up front.

use hashbrown::HashMap;
use log::{debug, trace};
use thiserror::Error;

use crate::{
    index::Index,
    middle::lir::{
        self, BinaryOperator, BlockId, CastKind, ComparePredicate, FloatWidth, Immediate,
        Instruction, IntegerWidth, Operand, RegisterId, UnaryOperator,
    },
};

use memory::{Memory, offset_address};
use value::Value;

mod host;
pub mod memory;
pub mod value;

pub use host::format_general;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationOptions {
    /// Bytes handed out by `getchar`
    pub stdin: Vec<u8>,
    /// Instructions executed before evaluation is abandoned
    pub step_limit: Option<u64>,
    pub entry_point: String,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            stdin: Vec::new(),
            step_limit: Some(50_000_000),
            entry_point: "main".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// 0 when the entry function returned, the argument of `exit` otherwise
    pub exit_code: i32,
    pub stdout: Vec<u8>,
}

impl ExecutionOutcome {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("Call to unknown function '{0}'")]
    UnknownFunction(String),
    #[error("Register {register} of {function} read before it was written")]
    UndefinedRegister {
        function: String,
        register: RegisterId,
    },
    #[error("Invalid memory access at {0:#x}")]
    InvalidMemoryAccess(u64),
    #[error("Expected {expected} value, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: Value,
    },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Step limit of {0} instructions exceeded")]
    StepLimitExceeded(u64),
    #[error("Block {block} of {function} has no terminator")]
    MissingTerminator { function: String, block: BlockId },
    #[error("Missing argument in call to a host primitive")]
    MissingArgument,
    #[error("Unsupported printf conversion '%{0}'")]
    UnsupportedFormat(char),
    #[error("Function '{0}' returned no value")]
    MissingReturnValue(String),
    #[error("Functions cannot be used as values")]
    FunctionValue,
    #[error("Struct has no field {0}")]
    InvalidFieldIndex(usize),
}

/// Why execution of the program stopped early
#[derive(Debug)]
enum Interrupt {
    Exit(i32),
    Error(EvaluationError),
}

impl From<EvaluationError> for Interrupt {
    fn from(value: EvaluationError) -> Self {
        Interrupt::Error(value)
    }
}

/// Runs the module's entry function to completion
pub fn evaluate(
    module: &lir::Module,
    options: &EvaluationOptions,
) -> Result<ExecutionOutcome, EvaluationError> {
    let Some(entry) = module.function(&options.entry_point) else {
        return Err(EvaluationError::UnknownFunction(options.entry_point.clone()));
    };

    debug!(
        "evaluating {} ({} functions)",
        options.entry_point,
        module.function_definitions.len()
    );

    let mut machine = Machine::new(module, options);

    let exit_code = match machine.call_function(entry, Vec::new()) {
        Ok(_) => 0,
        Err(Interrupt::Exit(code)) => code,
        Err(Interrupt::Error(error)) => return Err(error),
    };

    debug!("program finished with exit code {exit_code} after {} steps", machine.steps);

    Ok(ExecutionOutcome {
        exit_code,
        stdout: machine.stdout,
    })
}

struct Machine<'m> {
    functions: HashMap<&'static str, &'m lir::FunctionDefinition>,
    memory: Memory,
    static_strings: Vec<u64>,

    stdin: &'m [u8],
    stdin_position: usize,
    stdout: Vec<u8>,

    steps: u64,
    step_limit: Option<u64>,
}

struct Frame<'m> {
    function: &'m lir::FunctionDefinition,
    registers: Vec<Option<Value>>,
    /// Stack slots released when the frame returns
    slots: Vec<u64>,
}

enum Flow {
    Next,
    Jump(BlockId),
    Return(Option<Value>),
}

impl<'m> Machine<'m> {
    fn new(module: &'m lir::Module, options: &'m EvaluationOptions) -> Self {
        let mut memory = Memory::new();

        let static_strings = module
            .static_strings
            .iter()
            .map(|s| {
                let mut bytes = s.value().as_bytes().to_vec();
                bytes.push(0);
                memory.allocate_bytes(&bytes)
            })
            .collect();

        Self {
            functions: module
                .function_definitions
                .iter()
                .map(|f| (f.symbol_name.value(), f))
                .collect(),
            memory,
            static_strings,
            stdin: &options.stdin,
            stdin_position: 0,
            stdout: Vec::new(),
            steps: 0,
            step_limit: options.step_limit,
        }
    }

    fn call_function(
        &mut self,
        function: &'m lir::FunctionDefinition,
        arguments: Vec<Value>,
    ) -> Result<Option<Value>, Interrupt> {
        trace!("entering {}", function.symbol_name);

        let mut frame = Frame {
            function,
            registers: vec![None; function.registers.len()],
            slots: Vec::new(),
        };

        for (register, value) in function.arguments.iter().zip(arguments) {
            frame.registers[register.index()] = Some(value);
        }

        let result = self.run_frame(&mut frame);

        for slot in frame.slots {
            self.memory.free(slot)?;
        }

        result
    }

    fn run_frame(&mut self, frame: &mut Frame<'m>) -> Result<Option<Value>, Interrupt> {
        let function = frame.function;
        let mut block = function.entry();

        loop {
            let mut next = None;

            for instruction in &function.blocks[block].instructions {
                self.count_step()?;

                match self.execute(frame, instruction)? {
                    Flow::Next => {}
                    Flow::Jump(target) => {
                        next = Some(target);
                        break;
                    }
                    Flow::Return(value) => return Ok(value),
                }
            }

            block = next.ok_or_else(|| EvaluationError::MissingTerminator {
                function: function.symbol_name.to_string(),
                block,
            })?;
        }
    }

    fn count_step(&mut self) -> Result<(), EvaluationError> {
        self.steps += 1;

        match self.step_limit {
            Some(limit) if self.steps > limit => Err(EvaluationError::StepLimitExceeded(limit)),
            _ => Ok(()),
        }
    }

    fn execute(&mut self, frame: &mut Frame<'m>, instruction: &Instruction) -> Result<Flow, Interrupt> {
        let function = frame.function;

        match instruction {
            Instruction::AllocStack { destination, ty } => {
                let address = self.memory.allocate(ty.size().bytes());
                frame.slots.push(address);
                frame.set(*destination, Value::Pointer(address));
            }
            Instruction::LoadMem {
                destination,
                source,
            } => {
                let ty = function.register_type(*destination);
                let address = self.operand(frame, source)?.pointer()?;
                let bytes = self.memory.read(address, ty.size().bytes())?;

                frame.set(*destination, Value::decode(ty, bytes));
            }
            Instruction::StoreMem {
                destination,
                source,
            } => {
                let ty = operand_type(function, source);
                let address = self.operand(frame, destination)?.pointer()?;

                let mut bytes = Vec::with_capacity(ty.size().bytes());
                self.operand(frame, source)?.encode(&ty, &mut bytes)?;
                self.memory.write(address, &bytes)?;
            }
            Instruction::GetStructElementPointer {
                destination,
                source,
                ty,
                index,
            } => {
                let address = self.operand(frame, source)?.pointer()?;
                let offset = ty
                    .offset_of(*index)
                    .ok_or(EvaluationError::InvalidFieldIndex(*index))?;

                frame.set(
                    *destination,
                    Value::Pointer(offset_address(address, offset.bytes() as i64)),
                );
            }
            Instruction::GetElementPointer {
                destination,
                source,
                element,
                index,
            } => {
                let address = self.operand(frame, source)?.pointer()?;
                let index = self.operand(frame, index)?.int()?;
                let offset = index.wrapping_mul(element.size().bytes() as i64);

                frame.set(*destination, Value::Pointer(offset_address(address, offset)));
            }
            Instruction::Move {
                destination,
                source,
            } => {
                let value = self.operand(frame, source)?;
                frame.set(*destination, value);
            }
            Instruction::UnaryOperation {
                operator,
                destination,
                operand,
            } => {
                let operand = self.operand(frame, operand)?;
                let ty = function.register_type(*destination);

                let value = match (operator, ty) {
                    (UnaryOperator::FNeg, lir::Type::Float(width)) => {
                        Value::Float(round_to(-operand.float()?, *width))
                    }
                    (UnaryOperator::Neg, lir::Type::Integer(width)) => {
                        Value::Int(width.truncate(operand.int()?.wrapping_neg()))
                    }
                    (UnaryOperator::Not, lir::Type::Integer(width)) => {
                        Value::Int(width.truncate(!operand.int()?))
                    }
                    _ => {
                        return Err(EvaluationError::TypeMismatch {
                            expected: "operand matching the operator",
                            found: operand,
                        }
                        .into());
                    }
                };

                frame.set(*destination, value);
            }
            Instruction::BinaryOperation {
                operator,
                destination,
                lhs,
                rhs,
            } => {
                let lhs = self.operand(frame, lhs)?;
                let rhs = self.operand(frame, rhs)?;
                let ty = function.register_type(*destination);

                let value = match ty {
                    lir::Type::Float(width) if operator.is_floating() => Value::Float(round_to(
                        float_operation(*operator, lhs.float()?, rhs.float()?),
                        *width,
                    )),
                    lir::Type::Integer(width) if !operator.is_floating() => Value::Int(
                        width.truncate(integer_operation(*operator, lhs.int()?, rhs.int()?)?),
                    ),
                    _ => {
                        return Err(EvaluationError::TypeMismatch {
                            expected: "operands matching the operator",
                            found: lhs,
                        }
                        .into());
                    }
                };

                frame.set(*destination, value);
            }
            Instruction::Compare {
                predicate,
                destination,
                lhs,
                rhs,
            } => {
                let width = match operand_type(function, lhs) {
                    lir::Type::Integer(width) => width,
                    _ => IntegerWidth::I64,
                };
                let lhs = self.operand(frame, lhs)?;
                let rhs = self.operand(frame, rhs)?;

                let result = if predicate.is_floating() {
                    compare_floats(*predicate, lhs.float()?, rhs.float()?)
                } else {
                    compare_integers(*predicate, lhs.int()?, rhs.int()?, width)
                };

                frame.set(*destination, Value::Int(result as i64));
            }
            Instruction::Cast {
                kind,
                destination,
                operand,
            } => {
                let source_ty = operand_type(function, operand);
                let target_ty = function.register_type(*destination);
                let value = self.operand(frame, operand)?;

                frame.set(*destination, cast(*kind, value, &source_ty, target_ty)?);
            }
            Instruction::Branch {
                condition,
                positive,
                negative,
            } => {
                let condition = self.operand(frame, condition)?.int()?;

                return Ok(Flow::Jump(if condition != 0 { *positive } else { *negative }));
            }
            Instruction::Jump { destination } => return Ok(Flow::Jump(*destination)),
            Instruction::Switch {
                value,
                default,
                cases,
            } => {
                let value = self.operand(frame, value)?.int()?;
                let target = cases
                    .iter()
                    .find(|(case, _)| *case == value)
                    .map_or(*default, |(_, block)| *block);

                return Ok(Flow::Jump(target));
            }
            Instruction::Return { value } => {
                let value = match value {
                    Some(value) => Some(self.operand(frame, value)?),
                    None => None,
                };

                return Ok(Flow::Return(value));
            }
            Instruction::FunctionCall {
                target,
                arguments,
                destination,
            } => {
                let Operand::Immediate(Immediate::FunctionLabel(name)) = target else {
                    return Err(EvaluationError::FunctionValue.into());
                };

                let arguments = arguments
                    .iter()
                    .map(|a| self.operand(frame, a))
                    .collect::<Result<Vec<_>, _>>()?;

                let callee = self.functions.get(name.value()).copied();

                let result = match callee {
                    Some(callee) => self.call_function(callee, arguments)?,
                    None => match self.call_host(name.value(), &arguments) {
                        Some(result) => result?,
                        None => {
                            return Err(EvaluationError::UnknownFunction(name.to_string()).into());
                        }
                    },
                };

                if let Some(destination) = destination {
                    let value = result
                        .ok_or_else(|| EvaluationError::MissingReturnValue(name.to_string()))?;
                    frame.set(*destination, value);
                }
            }
        }

        Ok(Flow::Next)
    }

    fn operand(&self, frame: &Frame<'_>, operand: &Operand) -> Result<Value, EvaluationError> {
        match operand {
            Operand::Register(register) => frame.registers[register.index()]
                .clone()
                .ok_or_else(|| EvaluationError::UndefinedRegister {
                    function: frame.function.symbol_name.to_string(),
                    register: *register,
                }),
            Operand::Immediate(immediate) => match immediate {
                Immediate::Int(value, width) => Ok(Value::Int(width.truncate(*value))),
                Immediate::Float(value, width) => Ok(Value::Float(round_to(*value, *width))),
                Immediate::Null => Ok(Value::Pointer(0)),
                Immediate::StaticLabel(label) => Ok(Value::Pointer(self.static_strings[label.index()])),
                Immediate::FunctionLabel(_) => Err(EvaluationError::FunctionValue),
            },
        }
    }
}

impl Frame<'_> {
    fn set(&mut self, register: RegisterId, value: Value) {
        self.registers[register.index()] = Some(value);
    }
}

fn operand_type(function: &lir::FunctionDefinition, operand: &Operand) -> lir::Type {
    match operand {
        Operand::Register(register) => function.register_type(*register).clone(),
        Operand::Immediate(immediate) => immediate.ty(),
    }
}

fn round_to(value: f64, width: FloatWidth) -> f64 {
    match width {
        FloatWidth::F32 => value as f32 as f64,
        FloatWidth::F64 => value,
    }
}

fn integer_operation(operator: BinaryOperator, lhs: i64, rhs: i64) -> Result<i64, EvaluationError> {
    Ok(match operator {
        BinaryOperator::Add => lhs.wrapping_add(rhs),
        BinaryOperator::Sub => lhs.wrapping_sub(rhs),
        BinaryOperator::Mul => lhs.wrapping_mul(rhs),
        BinaryOperator::SDiv if rhs == 0 => return Err(EvaluationError::DivisionByZero),
        BinaryOperator::SDiv => lhs.wrapping_div(rhs),
        BinaryOperator::SRem if rhs == 0 => return Err(EvaluationError::DivisionByZero),
        BinaryOperator::SRem => lhs.wrapping_rem(rhs),
        BinaryOperator::And => lhs & rhs,
        BinaryOperator::Or => lhs | rhs,
        BinaryOperator::Xor => lhs ^ rhs,
        BinaryOperator::Shl => lhs.wrapping_shl(rhs as u32),
        BinaryOperator::AShr => lhs.wrapping_shr(rhs as u32),
        _ => {
            return Err(EvaluationError::TypeMismatch {
                expected: "floating operands",
                found: Value::Int(lhs),
            });
        }
    })
}

fn float_operation(operator: BinaryOperator, lhs: f64, rhs: f64) -> f64 {
    match operator {
        BinaryOperator::FAdd => lhs + rhs,
        BinaryOperator::FSub => lhs - rhs,
        BinaryOperator::FMul => lhs * rhs,
        BinaryOperator::FDiv => lhs / rhs,
        _ => lhs % rhs,
    }
}

fn compare_integers(predicate: ComparePredicate, lhs: i64, rhs: i64, width: IntegerWidth) -> bool {
    match predicate {
        ComparePredicate::Eq => lhs == rhs,
        ComparePredicate::Ne => lhs != rhs,
        ComparePredicate::Slt => lhs < rhs,
        ComparePredicate::Sle => lhs <= rhs,
        ComparePredicate::Sgt => lhs > rhs,
        ComparePredicate::Sge => lhs >= rhs,
        ComparePredicate::Uge => width.zero_extend(lhs) >= width.zero_extend(rhs),
        _ => false,
    }
}

/// Ordered comparisons are false whenever either side is NaN
fn compare_floats(predicate: ComparePredicate, lhs: f64, rhs: f64) -> bool {
    match predicate {
        ComparePredicate::Oeq => lhs == rhs,
        ComparePredicate::One => !lhs.is_nan() && !rhs.is_nan() && lhs != rhs,
        ComparePredicate::Olt => lhs < rhs,
        ComparePredicate::Ole => lhs <= rhs,
        ComparePredicate::Ogt => lhs > rhs,
        ComparePredicate::Oge => lhs >= rhs,
        _ => false,
    }
}

fn cast(
    kind: CastKind,
    value: Value,
    source: &lir::Type,
    target: &lir::Type,
) -> Result<Value, EvaluationError> {
    let mismatch = |found: Value| EvaluationError::TypeMismatch {
        expected: "operand matching the cast",
        found,
    };

    Ok(match (kind, source, target) {
        (CastKind::SIToFP, _, lir::Type::Float(width)) => {
            Value::Float(round_to(value.int()? as f64, *width))
        }
        (CastKind::FPToSI, _, lir::Type::Integer(width)) => {
            Value::Int(width.truncate(value.float()? as i64))
        }
        (CastKind::SExt, lir::Type::Integer(IntegerWidth::I1), _) => {
            Value::Int(-(value.int()? & 1))
        }
        (CastKind::SExt, _, _) => Value::Int(value.int()?),
        (CastKind::ZExt, lir::Type::Integer(width), _) => {
            Value::Int(width.zero_extend(value.int()?) as i64)
        }
        (CastKind::Trunc, _, lir::Type::Integer(width)) => Value::Int(width.truncate(value.int()?)),
        (CastKind::FPExt | CastKind::FPTrunc, _, lir::Type::Float(width)) => {
            Value::Float(round_to(value.float()?, *width))
        }
        (CastKind::BitCast, lir::Type::Integer(IntegerWidth::I64), lir::Type::Float(FloatWidth::F64)) => {
            Value::Float(f64::from_bits(value.int()? as u64))
        }
        (CastKind::BitCast, lir::Type::Float(FloatWidth::F64), lir::Type::Integer(IntegerWidth::I64)) => {
            Value::Int(value.float()?.to_bits() as i64)
        }
        (CastKind::BitCast, lir::Type::Integer(IntegerWidth::I32), lir::Type::Float(FloatWidth::F32)) => {
            Value::Float(f32::from_bits(value.int()? as u32) as f64)
        }
        (CastKind::BitCast, lir::Type::Float(FloatWidth::F32), lir::Type::Integer(IntegerWidth::I32)) => {
            Value::Int((value.float()? as f32).to_bits() as i32 as i64)
        }
        (CastKind::BitCast, source, target) if source == target => value,
        (CastKind::PtrToInt, _, lir::Type::Integer(_)) => Value::Int(value.pointer()? as i64),
        (CastKind::IntToPtr, _, lir::Type::Pointer) => Value::Pointer(value.int()? as u64),
        _ => return Err(mismatch(value)),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::{frontend::intern::InternedSymbol, index::IndexVec, middle::lir::Register};

    fn single_block_function(name: &str, instructions: Vec<Instruction>, registers: &[lir::Type]) -> lir::FunctionDefinition {
        let mut register_table = IndexVec::new();
        for (i, ty) in registers.iter().enumerate() {
            register_table.push(Register {
                id: RegisterId::new(i),
                ty: ty.clone(),
            });
        }

        let mut blocks = IndexVec::new();
        blocks.push(lir::Block {
            id: BlockId::ZERO,
            label: "entry",
            instructions,
            predecessors: BTreeSet::new(),
        });

        lir::FunctionDefinition {
            symbol_name: InternedSymbol::new(name),
            registers: register_table,
            arguments: Vec::new(),
            return_type: None,
            blocks,
            exit: BlockId::ZERO,
        }
    }

    fn module(functions: Vec<lir::FunctionDefinition>) -> lir::Module {
        lir::Module {
            host_declarations: crate::middle::lowering::runtime::host_declarations(),
            function_definitions: functions,
            static_strings: IndexVec::new(),
        }
    }

    #[test]
    fn exit_code_comes_from_the_exit_primitive() {
        let main = single_block_function(
            "main",
            vec![
                Instruction::FunctionCall {
                    target: Operand::function("exit"),
                    arguments: vec![Immediate::Int(3, IntegerWidth::I32).into()],
                    destination: None,
                },
                Instruction::Return { value: None },
            ],
            &[],
        );

        let outcome = evaluate(&module(vec![main]), &EvaluationOptions::default()).unwrap();

        assert_eq!(outcome.exit_code, 3);
    }

    #[test]
    fn putchar_writes_to_stdout() {
        let main = single_block_function(
            "main",
            vec![
                Instruction::FunctionCall {
                    target: Operand::function("putchar"),
                    arguments: vec![Operand::i64(b'x' as i64)],
                    destination: Some(RegisterId::new(0)),
                },
                Instruction::Return { value: None },
            ],
            &[lir::Type::I64],
        );

        let outcome = evaluate(&module(vec![main]), &EvaluationOptions::default()).unwrap();

        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout_text(), "x");
    }

    #[test]
    fn integer_arithmetic_wraps_to_the_register_width() {
        let sum = integer_operation(BinaryOperator::Add, 127, 1).unwrap();

        assert_eq!(IntegerWidth::I8.truncate(sum), -128);
        assert_eq!(
            integer_operation(BinaryOperator::SDiv, 1, 0),
            Err(EvaluationError::DivisionByZero)
        );
    }

    #[test]
    fn missing_terminators_are_reported() {
        let main = single_block_function("main", Vec::new(), &[]);

        assert!(matches!(
            evaluate(&module(vec![main]), &EvaluationOptions::default()),
            Err(EvaluationError::MissingTerminator { .. })
        ));
    }

    #[test]
    fn runaway_programs_hit_the_step_limit() {
        let main = single_block_function(
            "main",
            vec![Instruction::Jump {
                destination: BlockId::ZERO,
            }],
            &[],
        );
        let options = EvaluationOptions {
            step_limit: Some(100),
            ..Default::default()
        };

        assert_eq!(
            evaluate(&module(vec![main]), &options),
            Err(EvaluationError::StepLimitExceeded(100))
        );
    }

    #[test]
    fn uge_compares_unsigned() {
        assert!(compare_integers(ComparePredicate::Uge, -1, 5, IntegerWidth::I64));
        assert!(!compare_integers(ComparePredicate::Sge, -1, 5, IntegerWidth::I64));
    }
}
