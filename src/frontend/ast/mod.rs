//! The annotated syntax tree handed to the backend.
//!
//! Trees are produced by the parser and annotated by the semantic checker:
//! every expression carries the [`Type`] that was resolved for it and every
//! node remembers the source line it came from so that diagnostics can point
//! back at the program.

use std::rc::Rc;

use strum::Display;

use super::intern::InternedSymbol;
use crate::middle::ty::Type;

pub mod build;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Top level statements, executed in order by the implicit entry function
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub line: usize,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// x: int = 5
    VariableDeclaration {
        name: InternedSymbol,
        ty: Type,
        initializer: Option<Box<Expression>>,
    },
    /// x = 5, a[0] = 5, p.x = 5
    Assignment {
        target: Box<Expression>,
        value: Box<Expression>,
    },
    /// x += 5
    OperatorAssignment {
        operator: AssignmentOperatorKind,
        target: Box<Expression>,
        value: Box<Expression>,
    },
    /// if / else if / else, one branch per arm in source order
    If { branches: Vec<ConditionalBranch> },
    While {
        condition: Box<Expression>,
        block: Block,
    },
    /// for x in xs, for a, b in pairs
    For {
        elements: Vec<InternedSymbol>,
        iterable: Box<Expression>,
        block: Block,
    },
    Switch {
        value: Box<Expression>,
        cases: Vec<SwitchCase>,
    },
    Break,
    Continue,
    Pass,
    FunctionDeclaration(Rc<FunctionDeclaration>),
    StructDeclaration(StructDeclaration),
    Return(Option<Box<Expression>>),
    /// print(x), or print() for a bare newline
    Print(Option<Box<Expression>>),
    Expression(Box<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalBranch {
    pub condition: Condition,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Expression(Box<Expression>),
    Else,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub line: usize,
    pub value: CaseValue,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseValue {
    Expression(Box<Expression>),
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    pub line: usize,
    /// `None` for anonymous functions
    pub name: Option<InternedSymbol>,
    pub parameters: Vec<FunctionParameter>,
    /// Collects surplus positional arguments. The type is the element type of
    /// the array the arguments are packed into.
    pub varargs: Option<(InternedSymbol, Type)>,
    pub return_type: Type,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionParameter {
    pub name: InternedSymbol,
    pub ty: Type,
    pub default: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDeclaration {
    pub name: InternedSymbol,
    pub fields: Vec<StructField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: InternedSymbol,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub line: usize,
    pub ty: Type,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Literal(Literal),
    Variable(InternedSymbol),
    Binary {
        lhs: Box<Expression>,
        operator: BinaryOperatorKind,
        rhs: Box<Expression>,
    },
    Unary {
        operator: UnaryOperatorKind,
        operand: Box<Expression>,
    },
    /// x :: dec
    Cast {
        expression: Box<Expression>,
        target: Type,
    },
    FunctionCall {
        name: InternedSymbol,
        arguments: Vec<Expression>,
        named_arguments: Vec<NamedArgument>,
    },
    AnonymousFunction(Rc<FunctionDeclaration>),
    /// [1, 2, 3]
    Collection(Vec<Expression>),
    /// xs[i]
    CollectionAccess {
        collection: Box<Expression>,
        index: Box<Expression>,
    },
    /// 0..10
    Range {
        start: Box<Expression>,
        stop: Box<Expression>,
    },
    StructLiteral {
        name: InternedSymbol,
        fields: Vec<FieldInitializer>,
    },
    /// p.x
    FieldAccess {
        object: Box<Expression>,
        field: InternedSymbol,
    },
    /// input("prompt")
    Input(Option<Box<Expression>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedArgument {
    pub name: InternedSymbol,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInitializer {
    pub name: InternedSymbol,
    pub value: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(InternedSymbol),
    Boolean(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BinaryOperatorKind {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "//")]
    FloorDivide,
    #[strum(serialize = "%")]
    Modulus,
    #[strum(serialize = "**")]
    Power,
    #[strum(serialize = "==")]
    Equals,
    #[strum(serialize = "!=")]
    NotEquals,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = "<=")]
    LessThanOrEqualTo,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = ">=")]
    GreaterThanOrEqualTo,
    #[strum(serialize = "and")]
    LogicalAnd,
    #[strum(serialize = "or")]
    LogicalOr,
    #[strum(serialize = "xor")]
    Xor,
    #[strum(serialize = "&")]
    BitwiseAnd,
    #[strum(serialize = "|")]
    BitwiseOr,
    #[strum(serialize = "<<")]
    ShiftLeft,
    #[strum(serialize = ">>")]
    ShiftRight,
}

impl BinaryOperatorKind {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Equals
                | Self::NotEquals
                | Self::LessThan
                | Self::LessThanOrEqualTo
                | Self::GreaterThan
                | Self::GreaterThanOrEqualTo
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum UnaryOperatorKind {
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Negate,
    #[strum(serialize = "not")]
    LogicalNot,
    #[strum(serialize = "~")]
    BitwiseNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AssignmentOperatorKind {
    #[strum(serialize = "+=")]
    Add,
    #[strum(serialize = "-=")]
    Subtract,
    #[strum(serialize = "*=")]
    Multiply,
    #[strum(serialize = "/=")]
    Divide,
    #[strum(serialize = "//=")]
    FloorDivide,
    #[strum(serialize = "%=")]
    Modulus,
    #[strum(serialize = "**=")]
    Power,
}

impl AssignmentOperatorKind {
    pub fn binary_operator(self) -> BinaryOperatorKind {
        match self {
            Self::Add => BinaryOperatorKind::Add,
            Self::Subtract => BinaryOperatorKind::Subtract,
            Self::Multiply => BinaryOperatorKind::Multiply,
            Self::Divide => BinaryOperatorKind::Divide,
            Self::FloorDivide => BinaryOperatorKind::FloorDivide,
            Self::Modulus => BinaryOperatorKind::Modulus,
            Self::Power => BinaryOperatorKind::Power,
        }
    }
}
