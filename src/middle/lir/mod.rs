//! LIR (Low-level Intermediate Representation). In this form, loops and
//! conditionals are reduced to labelled basic blocks and jumps, expression
//! trees are flattened into ordered operations on virtual registers and all
//! variables live in stack slots accessed through explicit loads and stores.

use std::collections::BTreeSet;

use strum::Display;

use crate::{
    frontend::intern::InternedSymbol,
    index::{IndexVec, simple_index},
};

pub mod layout;
pub mod pretty_print;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    /// Primitives provided by the host environment
    pub host_declarations: Vec<HostDeclaration>,
    /// Function definitions in the order they were emitted
    pub function_definitions: Vec<FunctionDefinition>,
    /// NUL terminated strings placed in static memory
    pub static_strings: IndexVec<StaticLabelId, InternedSymbol>,
}

impl Module {
    pub fn function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.function_definitions
            .iter()
            .find(|f| f.symbol_name.value() == name)
    }

    pub fn host_declaration(&self, name: &str) -> Option<&HostDeclaration> {
        self.host_declarations
            .iter()
            .find(|h| h.symbol_name.value() == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostDeclaration {
    pub symbol_name: InternedSymbol,
    pub parameters: Vec<Type>,
    pub return_type: Option<Type>,
    /// Accepts arguments beyond the declared parameters
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub symbol_name: InternedSymbol,
    /// Allocated virtual registers used to store temporary data
    pub registers: IndexVec<RegisterId, Register>,
    pub arguments: Vec<RegisterId>,
    pub return_type: Option<Type>,
    pub blocks: IndexVec<BlockId, Block>,
    /// The only block allowed to contain a return instruction
    pub exit: BlockId,
}

impl FunctionDefinition {
    pub fn entry(&self) -> BlockId {
        BlockId::ZERO
    }

    pub fn register_type(&self, id: RegisterId) -> &Type {
        &self.registers[id].ty
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: BlockId,
    /// Human readable name used when printing, e.g. `while.cond`
    pub label: &'static str,
    pub instructions: Vec<Instruction>,
    pub predecessors: BTreeSet<BlockId>,
}

impl Block {
    pub fn returns(&self) -> bool {
        self.instructions
            .last()
            .is_some_and(|i| matches!(i, Instruction::Return { .. }))
    }

    pub fn is_terminated(&self) -> bool {
        self.instructions.last().is_some_and(Instruction::is_terminator)
    }

    /// Blocks this block may transfer control to
    pub fn successors(&self) -> Vec<BlockId> {
        match self.instructions.last() {
            Some(Instruction::Branch {
                positive, negative, ..
            }) => vec![*positive, *negative],
            Some(Instruction::Jump { destination }) => vec![*destination],
            Some(Instruction::Switch { default, cases, .. }) => std::iter::once(*default)
                .chain(cases.iter().map(|(_, b)| *b))
                .collect(),
            _ => Vec::new(),
        }
    }
}

simple_index! {
    /// Identifies an LIR block
    pub struct BlockId;
}

impl BlockId {
    pub const ZERO: Self = Self(0);
}

/// A temporary virtual register holding a value of a single LIR type
#[derive(Debug, Clone, PartialEq)]
pub struct Register {
    pub id: RegisterId,
    pub ty: Type,
}

simple_index! {
    /// Identifies a virtual LIR register which holds a temporary value
    pub struct RegisterId;
}

simple_index! {
    /// Identifies a string in the module's static memory
    pub struct StaticLabelId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntegerWidth {
    I1,
    I8,
    I16,
    I32,
    I64,
}

impl IntegerWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntegerWidth::I1 => 1,
            IntegerWidth::I8 => 8,
            IntegerWidth::I16 => 16,
            IntegerWidth::I32 => 32,
            IntegerWidth::I64 => 64,
        }
    }

    /// Sign extends the low bits of `value` to a full `i64`
    pub fn truncate(self, value: i64) -> i64 {
        match self {
            // booleans are kept as 0 or 1 rather than 0 or -1
            IntegerWidth::I1 => value & 1,
            IntegerWidth::I8 => value as i8 as i64,
            IntegerWidth::I16 => value as i16 as i64,
            IntegerWidth::I32 => value as i32 as i64,
            IntegerWidth::I64 => value,
        }
    }

    /// Reinterprets a truncated value as unsigned
    pub fn zero_extend(self, value: i64) -> u64 {
        match self {
            IntegerWidth::I64 => value as u64,
            width => (value as u64) & ((1u64 << width.bits()) - 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FloatWidth {
    F32,
    F64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Integer(IntegerWidth),
    Float(FloatWidth),
    Pointer,
    Struct(Struct),
}

impl Type {
    pub const BOOL: Type = Type::Integer(IntegerWidth::I1);
    pub const I32: Type = Type::Integer(IntegerWidth::I32);
    pub const I64: Type = Type::Integer(IntegerWidth::I64);
    pub const F64: Type = Type::Float(FloatWidth::F64);
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Struct(pub Vec<Type>);

impl Struct {
    /// `{ length: i64, capacity: i64, data: ptr }`
    pub fn dynamic_array() -> Self {
        Self(vec![Type::I64, Type::I64, Type::Pointer])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Reserves a stack slot in the current frame. Only emitted in the entry
    /// block.
    AllocStack {
        destination: RegisterId,
        ty: Type,
    },
    /// Loads a value of the destination register's type
    LoadMem {
        destination: RegisterId,
        source: Operand,
    },
    StoreMem {
        destination: Operand,
        source: Operand,
    },
    GetStructElementPointer {
        destination: RegisterId,
        source: Operand,
        ty: Struct,
        index: usize,
    },
    /// `source + index * size_of(element)`
    GetElementPointer {
        destination: RegisterId,
        source: Operand,
        element: Type,
        index: Operand,
    },
    Move {
        destination: RegisterId,
        source: Operand,
    },
    UnaryOperation {
        operator: UnaryOperator,
        destination: RegisterId,
        operand: Operand,
    },
    BinaryOperation {
        operator: BinaryOperator,
        destination: RegisterId,
        lhs: Operand,
        rhs: Operand,
    },
    Compare {
        predicate: ComparePredicate,
        destination: RegisterId,
        lhs: Operand,
        rhs: Operand,
    },
    /// Converts the operand to the destination register's type
    Cast {
        kind: CastKind,
        destination: RegisterId,
        operand: Operand,
    },
    Branch {
        condition: Operand,
        positive: BlockId,
        negative: BlockId,
    },
    Jump {
        destination: BlockId,
    },
    Switch {
        value: Operand,
        default: BlockId,
        cases: Vec<(i64, BlockId)>,
    },
    Return {
        value: Option<Operand>,
    },
    FunctionCall {
        target: Operand,
        arguments: Vec<Operand>,
        destination: Option<RegisterId>,
    },
}

impl Instruction {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Branch { .. }
                | Instruction::Jump { .. }
                | Instruction::Switch { .. }
                | Instruction::Return { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum UnaryOperator {
    Neg,
    FNeg,
    /// Flips every bit of the operand's width, logical not on `i1`
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
    And,
    Or,
    Xor,
    Shl,
    AShr,
}

impl BinaryOperator {
    pub fn is_floating(self) -> bool {
        matches!(
            self,
            BinaryOperator::FAdd
                | BinaryOperator::FSub
                | BinaryOperator::FMul
                | BinaryOperator::FDiv
                | BinaryOperator::FRem
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ComparePredicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    /// Unsigned, used by bounds checks so that a negative index is out of
    /// range as well
    Uge,
    Oeq,
    One,
    Olt,
    Ole,
    Ogt,
    Oge,
}

impl ComparePredicate {
    pub fn is_floating(self) -> bool {
        matches!(
            self,
            ComparePredicate::Oeq
                | ComparePredicate::One
                | ComparePredicate::Olt
                | ComparePredicate::Ole
                | ComparePredicate::Ogt
                | ComparePredicate::Oge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum CastKind {
    /// Signed integer to floating
    SIToFP,
    /// Floating to signed integer, rounding toward zero
    FPToSI,
    SExt,
    ZExt,
    Trunc,
    FPExt,
    FPTrunc,
    /// Reinterprets the bits of a value of the same width
    BitCast,
    PtrToInt,
    IntToPtr,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Immediate {
    Int(i64, IntegerWidth),
    Float(f64, FloatWidth),
    Null,
    StaticLabel(StaticLabelId),
    FunctionLabel(InternedSymbol),
}

impl Immediate {
    pub fn bool(value: bool) -> Self {
        Immediate::Int(value as i64, IntegerWidth::I1)
    }

    pub fn i64(value: i64) -> Self {
        Immediate::Int(value, IntegerWidth::I64)
    }

    pub fn ty(&self) -> Type {
        match self {
            Immediate::Int(_, width) => Type::Integer(*width),
            Immediate::Float(_, width) => Type::Float(*width),
            Immediate::Null | Immediate::StaticLabel(_) | Immediate::FunctionLabel(_) => {
                Type::Pointer
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Immediate(Immediate),
    Register(RegisterId),
}

impl Operand {
    pub fn i64(value: i64) -> Self {
        Operand::Immediate(Immediate::i64(value))
    }

    pub fn function(name: &str) -> Self {
        Operand::Immediate(Immediate::FunctionLabel(InternedSymbol::new(name)))
    }
}

impl From<RegisterId> for Operand {
    fn from(value: RegisterId) -> Self {
        Operand::Register(value)
    }
}

impl From<Immediate> for Operand {
    fn from(value: Immediate) -> Self {
        Operand::Immediate(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Index;

    #[test]
    fn integer_widths_truncate_with_sign() {
        assert_eq!(IntegerWidth::I8.truncate(255), -1);
        assert_eq!(IntegerWidth::I8.zero_extend(-1), 255);
        assert_eq!(IntegerWidth::I1.truncate(3), 1);
        assert_eq!(IntegerWidth::I32.truncate(1 << 32), 0);
    }

    #[test]
    fn terminators_end_blocks() {
        let mut block = Block {
            id: BlockId::ZERO,
            label: "entry",
            instructions: vec![Instruction::Move {
                destination: RegisterId::new(0),
                source: Operand::i64(1),
            }],
            predecessors: BTreeSet::new(),
        };
        assert!(!block.is_terminated());

        block.instructions.push(Instruction::Jump {
            destination: BlockId::new(1),
        });
        assert!(block.is_terminated());
        assert!(!block.returns());
        assert_eq!(block.successors(), vec![BlockId::new(1)]);
    }
}
