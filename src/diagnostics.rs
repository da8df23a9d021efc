use thiserror::Error;

use crate::{frontend::intern::InternedSymbol, middle::ty::Type};

/// A fatal fault found while lowering a program. No module is produced once
/// one of these has been raised.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("file={file} line={line}: {kind}")]
pub struct CodegenError {
    pub file: String,
    pub line: usize,
    pub kind: CodegenErrorKind,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenErrorKind {
    #[error("Cannot cast to type {target}")]
    UnsupportedCast { from: Type, target: Type },
    #[error("Exponent must be an integer constant")]
    NonConstantExponent,
    #[error("Exponent must not be negative, got {0}")]
    NegativeExponent(i64),
    #[error("Exponent {exponent} is larger than the supported maximum of {limit}")]
    ExponentTooLarge { exponent: i64, limit: i64 },
    #[error("Unexpected arguments passed to {0}()")]
    UnexpectedArguments(InternedSymbol),
    #[error("{function}() got multiple values for argument '{argument}'")]
    MultipleValues {
        function: InternedSymbol,
        argument: InternedSymbol,
    },
    #[error("{function}() missing required argument '{argument}'")]
    MissingArgument {
        function: InternedSymbol,
        argument: InternedSymbol,
    },
    #[error("'break' outside loop")]
    BreakOutsideLoop,
    #[error("'continue' not properly in loop")]
    ContinueOutsideLoop,
    #[error("Cannot access field '{field}' of non-struct type {ty}")]
    FieldAccessOnNonStruct { ty: Type, field: InternedSymbol },
    #[error("Struct {name} has no field '{field}'")]
    UnknownField {
        name: InternedSymbol,
        field: InternedSymbol,
    },
    #[error("Cannot unpack {found} values into {expected} names")]
    UnpackArity { expected: usize, found: usize },
    #[error("Cannot unpack elements of type {0}")]
    NonIterableUnpack(Type),
    #[error("Cannot iterate over value of type {0}")]
    NotIterable(Type),
    #[error("Cannot index into value of type {0}")]
    NotIndexable(Type),
    #[error("Unresolved name '{0}'")]
    UnresolvedName(InternedSymbol),
    #[error("Cannot capture variable '{0}' of an enclosing function")]
    CapturedVariable(InternedSymbol),
    #[error("'{0}' is not callable")]
    NotCallable(InternedSymbol),
    #[error("'{0}' is not a struct type")]
    NotAStruct(InternedSymbol),
    #[error("Unsupported operation {lhs} {operator} {rhs}")]
    UnsupportedBinaryOperation {
        operator: String,
        lhs: Type,
        rhs: Type,
    },
    #[error("Unsupported operation {operator}{operand}")]
    UnsupportedUnaryOperation { operator: String, operand: Type },
    #[error("Cannot assign value of type {found} to {expected}")]
    TypeMismatch { expected: Type, found: Type },
    #[error("Cannot print value of type {0}")]
    UnsupportedPrintOperand(Type),
    #[error("Values of type {0} cannot be stored")]
    UnsupportedValueType(Type),
    #[error("Arrays of {0} are not supported")]
    UnsupportedElementType(Type),
    #[error("Switch case values must be integer constants")]
    NonConstantCase,
    #[error("Invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("Function {0} does not return a value")]
    VoidValue(InternedSymbol),
}

impl CodegenErrorKind {
    pub fn at(self, file: &str, line: usize) -> CodegenError {
        CodegenError {
            file: file.to_owned(),
            line,
            kind: self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_name_their_location() {
        let error = CodegenErrorKind::UnsupportedCast {
            from: Type::Str,
            target: Type::INT,
        }
        .at("main.myth", 12);

        assert_eq!(
            error.to_string(),
            "file=main.myth line=12: Cannot cast to type int"
        );
    }

    #[test]
    fn binding_errors_name_the_function() {
        let error = CodegenErrorKind::MultipleValues {
            function: InternedSymbol::new("f"),
            argument: InternedSymbol::new("a"),
        };

        assert_eq!(error.to_string(), "f() got multiple values for argument 'a'");
    }
}
