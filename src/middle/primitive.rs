use strum::{Display, EnumIter, EnumString};

use crate::middle::lir;

/// The primitive scalar kinds of the language, named the way they are spelled
/// in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PrimitiveKind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Dec,
    Float,
}

impl PrimitiveKind {
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Int
                | PrimitiveKind::Int8
                | PrimitiveKind::Int16
                | PrimitiveKind::Int32
                | PrimitiveKind::Int64
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveKind::Dec | PrimitiveKind::Float)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_floating()
    }

    /// Width in bits of the value once lowered
    pub fn bits(self) -> u32 {
        match self {
            PrimitiveKind::Bool => 1,
            PrimitiveKind::Int8 => 8,
            PrimitiveKind::Int16 => 16,
            PrimitiveKind::Int32 | PrimitiveKind::Float => 32,
            PrimitiveKind::Int | PrimitiveKind::Int64 | PrimitiveKind::Dec => 64,
        }
    }

    pub fn lower(self) -> lir::Type {
        match self {
            PrimitiveKind::Bool => lir::Type::Integer(lir::IntegerWidth::I1),
            PrimitiveKind::Int8 => lir::Type::Integer(lir::IntegerWidth::I8),
            PrimitiveKind::Int16 => lir::Type::Integer(lir::IntegerWidth::I16),
            PrimitiveKind::Int32 => lir::Type::Integer(lir::IntegerWidth::I32),
            PrimitiveKind::Int | PrimitiveKind::Int64 => lir::Type::Integer(lir::IntegerWidth::I64),
            PrimitiveKind::Float => lir::Type::Float(lir::FloatWidth::F32),
            PrimitiveKind::Dec => lir::Type::Float(lir::FloatWidth::F64),
        }
    }

    /// The kind both operands of a binary arithmetic operation are converted
    /// to before the operation is performed
    pub fn promote(self, other: Self) -> Self {
        match (self.is_floating(), other.is_floating()) {
            (true, true) => {
                if self.bits() >= other.bits() {
                    self
                } else {
                    other
                }
            }
            (true, false) => self,
            (false, true) => other,
            (false, false) => {
                if other == PrimitiveKind::Bool {
                    self
                } else if self == PrimitiveKind::Bool || other.bits() > self.bits() {
                    other
                } else {
                    self
                }
            }
        }
    }

    /// Only conversions between the numeric kinds are supported by `::`
    pub fn can_be_cast_to(self, target: Self) -> bool {
        self.is_numeric() && target.is_numeric()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_strum() {
        assert_eq!("dec".parse::<PrimitiveKind>(), Ok(PrimitiveKind::Dec));
        assert_eq!("int32".parse::<PrimitiveKind>(), Ok(PrimitiveKind::Int32));
        assert_eq!(PrimitiveKind::Int8.to_string(), "int8");
        assert!("str".parse::<PrimitiveKind>().is_err());
    }

    #[test]
    fn promotion_prefers_floating_kinds() {
        assert_eq!(PrimitiveKind::Int.promote(PrimitiveKind::Dec), PrimitiveKind::Dec);
        assert_eq!(PrimitiveKind::Float.promote(PrimitiveKind::Int), PrimitiveKind::Float);
        assert_eq!(PrimitiveKind::Float.promote(PrimitiveKind::Dec), PrimitiveKind::Dec);
        assert_eq!(PrimitiveKind::Int8.promote(PrimitiveKind::Int32), PrimitiveKind::Int32);
        assert_eq!(PrimitiveKind::Int64.promote(PrimitiveKind::Int), PrimitiveKind::Int64);
    }

    #[test]
    fn only_numeric_kinds_cast() {
        assert!(PrimitiveKind::Int.can_be_cast_to(PrimitiveKind::Dec));
        assert!(PrimitiveKind::Dec.can_be_cast_to(PrimitiveKind::Int8));
        assert!(!PrimitiveKind::Bool.can_be_cast_to(PrimitiveKind::Int));
        assert!(!PrimitiveKind::Int.can_be_cast_to(PrimitiveKind::Bool));
    }
}
