use std::rc::Rc;

use crate::{
    frontend::{ast::BinaryOperatorKind, intern::InternedSymbol},
    middle::primitive::PrimitiveKind,
};

/// A type as resolved by the semantic checker. Every expression in the tree
/// handed to the backend is annotated with one of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// The return type of functions which do not produce a value
    Void,
    /// int, dec, bool, etc.
    Primitive(PrimitiveKind),
    /// "hello"
    ///
    /// A dynamic array of byte codes
    Str,
    /// [1, 2, 3]
    ///
    /// A growable, heap allocated array of some element type
    Array(Rc<Type>),
    /// A user declared struct. The shape of the struct is found by looking up
    /// its name in the symbol environment.
    Struct(InternedSymbol),
    /// A named or anonymous function used as a value
    Function,
}

impl Type {
    pub const BOOL: Type = Type::Primitive(PrimitiveKind::Bool);
    pub const INT: Type = Type::Primitive(PrimitiveKind::Int);
    pub const DEC: Type = Type::Primitive(PrimitiveKind::Dec);
    pub const FLOAT: Type = Type::Primitive(PrimitiveKind::Float);

    pub fn array(element: Type) -> Self {
        Type::Array(Rc::new(element))
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self {
            Type::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_numeric(&self) -> bool {
        self.as_primitive().is_some_and(PrimitiveKind::is_numeric)
    }

    pub fn is_integer(&self) -> bool {
        self.as_primitive().is_some_and(PrimitiveKind::is_integer)
    }

    pub fn is_floating(&self) -> bool {
        self.as_primitive().is_some_and(PrimitiveKind::is_floating)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Primitive(PrimitiveKind::Bool))
    }

    /// Strings and arrays share the dynamic array runtime representation
    pub fn is_array_like(&self) -> bool {
        matches!(self, Type::Str | Type::Array(_))
    }

    pub fn element_type(&self) -> Option<Type> {
        match self {
            Type::Str => Some(Type::INT),
            Type::Array(element) => Some((**element).clone()),
            _ => None,
        }
    }
}

/// Computes the type of a binary operation the same way the backend lowers it:
/// comparisons are always boolean, true division always produces a floating
/// value and everything else follows numeric promotion.
pub fn binary_operation_type(operator: BinaryOperatorKind, lhs: &Type, rhs: &Type) -> Option<Type> {
    let (Some(l), Some(r)) = (lhs.as_primitive(), rhs.as_primitive()) else {
        return None;
    };

    let both_bool = l == PrimitiveKind::Bool && r == PrimitiveKind::Bool;
    let both_numeric = l.is_numeric() && r.is_numeric();
    let both_integer = l.is_integer() && r.is_integer();

    match operator {
        BinaryOperatorKind::Equals | BinaryOperatorKind::NotEquals => {
            (both_numeric || both_bool).then_some(Type::BOOL)
        }
        BinaryOperatorKind::LessThan
        | BinaryOperatorKind::LessThanOrEqualTo
        | BinaryOperatorKind::GreaterThan
        | BinaryOperatorKind::GreaterThanOrEqualTo => both_numeric.then_some(Type::BOOL),
        BinaryOperatorKind::Add
        | BinaryOperatorKind::Subtract
        | BinaryOperatorKind::Multiply
        | BinaryOperatorKind::Modulus
        | BinaryOperatorKind::Power => both_numeric.then(|| Type::Primitive(l.promote(r))),
        BinaryOperatorKind::Divide => both_numeric.then(|| {
            let promoted = l.promote(r);

            if promoted.is_floating() {
                Type::Primitive(promoted)
            } else {
                Type::DEC
            }
        }),
        BinaryOperatorKind::FloorDivide => both_numeric.then(|| {
            if both_integer {
                Type::Primitive(l.promote(r))
            } else {
                Type::INT
            }
        }),
        BinaryOperatorKind::LogicalAnd | BinaryOperatorKind::LogicalOr => {
            both_bool.then_some(Type::BOOL)
        }
        BinaryOperatorKind::Xor | BinaryOperatorKind::BitwiseAnd | BinaryOperatorKind::BitwiseOr => {
            if both_bool {
                Some(Type::BOOL)
            } else {
                both_integer.then(|| Type::Primitive(l.promote(r)))
            }
        }
        BinaryOperatorKind::ShiftLeft | BinaryOperatorKind::ShiftRight => {
            both_integer.then_some(Type::Primitive(l))
        }
    }
}

impl core::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Primitive(kind) => write!(f, "{kind}"),
            Type::Str => write!(f, "str"),
            Type::Array(element) => write!(f, "array<{element}>"),
            Type::Struct(name) => write!(f, "{name}"),
            Type::Function => write!(f, "func"),
        }
    }
}
