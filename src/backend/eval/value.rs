use crate::middle::lir::{FloatWidth, IntegerWidth, Type};

use super::EvaluationError;

/// A value held in a register of the evaluated program
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Integers of every width, kept sign extended. Booleans are 0 or 1.
    Int(i64),
    Float(f64),
    Pointer(u64),
    Aggregate(Vec<Value>),
}

impl Value {
    pub fn int(&self) -> Result<i64, EvaluationError> {
        match self {
            Value::Int(value) => Ok(*value),
            other => Err(EvaluationError::TypeMismatch {
                expected: "integer",
                found: other.clone(),
            }),
        }
    }

    pub fn float(&self) -> Result<f64, EvaluationError> {
        match self {
            Value::Float(value) => Ok(*value),
            other => Err(EvaluationError::TypeMismatch {
                expected: "float",
                found: other.clone(),
            }),
        }
    }

    pub fn pointer(&self) -> Result<u64, EvaluationError> {
        match self {
            Value::Pointer(address) => Ok(*address),
            other => Err(EvaluationError::TypeMismatch {
                expected: "pointer",
                found: other.clone(),
            }),
        }
    }

    /// Serializes the value the way a store of type `ty` lays it out in
    /// memory
    pub fn encode(&self, ty: &Type, bytes: &mut Vec<u8>) -> Result<(), EvaluationError> {
        match ty {
            Type::Integer(_) => {
                let value = self.int()?.to_le_bytes();
                bytes.extend_from_slice(&value[..ty.size().bytes()]);
            }
            Type::Float(FloatWidth::F32) => {
                bytes.extend_from_slice(&(self.float()? as f32).to_le_bytes())
            }
            Type::Float(FloatWidth::F64) => bytes.extend_from_slice(&self.float()?.to_le_bytes()),
            Type::Pointer => bytes.extend_from_slice(&self.pointer()?.to_le_bytes()),
            Type::Struct(fields) => {
                let Value::Aggregate(values) = self else {
                    return Err(EvaluationError::TypeMismatch {
                        expected: "aggregate",
                        found: self.clone(),
                    });
                };

                let layout = fields.layout();
                let start = bytes.len();

                for ((field, value), offset) in fields.0.iter().zip(values).zip(&layout.offsets) {
                    bytes.resize(start + offset.bytes(), 0);
                    value.encode(field, bytes)?;
                }

                bytes.resize(start + layout.size.bytes(), 0);
            }
        }

        Ok(())
    }

    /// Reads back a value of type `ty` from its memory representation
    pub fn decode(ty: &Type, bytes: &[u8]) -> Value {
        match ty {
            Type::Integer(IntegerWidth::I1) => Value::Int((bytes[0] & 1) as i64),
            Type::Integer(width) => {
                let mut raw = [0u8; 8];
                raw[..bytes.len().min(8)].copy_from_slice(&bytes[..bytes.len().min(8)]);
                Value::Int(width.truncate(i64::from_le_bytes(raw)))
            }
            Type::Float(FloatWidth::F32) => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(&bytes[..4]);
                Value::Float(f32::from_le_bytes(raw) as f64)
            }
            Type::Float(FloatWidth::F64) => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&bytes[..8]);
                Value::Float(f64::from_le_bytes(raw))
            }
            Type::Pointer => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&bytes[..8]);
                Value::Pointer(u64::from_le_bytes(raw))
            }
            Type::Struct(fields) => {
                let layout = fields.layout();

                Value::Aggregate(
                    fields
                        .0
                        .iter()
                        .zip(&layout.offsets)
                        .map(|(field, offset)| Value::decode(field, &bytes[offset.bytes()..]))
                        .collect(),
                )
            }
        }
    }
}

impl core::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value:?}"),
            Value::Pointer(address) => write!(f, "{address:#x}"),
            Value::Aggregate(values) => {
                write!(f, "{{ {} }}", itertools::join(values, ", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middle::lir::Struct;

    fn round_trip(value: Value, ty: &Type) -> Value {
        let mut bytes = Vec::new();
        value.encode(ty, &mut bytes).unwrap();
        assert_eq!(bytes.len(), ty.size().bytes());

        Value::decode(ty, &bytes)
    }

    #[test]
    fn narrow_integers_keep_their_sign() {
        let ty = Type::Integer(IntegerWidth::I8);

        assert_eq!(round_trip(Value::Int(-3), &ty), Value::Int(-3));
    }

    #[test]
    fn structs_are_padded_between_fields() {
        let ty = Type::Struct(Struct(vec![Type::BOOL, Type::I64]));
        let value = Value::Aggregate(vec![Value::Int(1), Value::Int(-9)]);

        assert_eq!(ty.size().bytes(), 16);
        assert_eq!(round_trip(value.clone(), &ty), value);
    }
}
