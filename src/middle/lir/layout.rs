//! Memory layout of LIR types: sizes, alignments and struct field offsets.

use super::{FloatWidth, IntegerWidth, Struct, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bytes(pub usize);

impl Bytes {
    pub fn bytes(self) -> usize {
        self.0
    }

    pub fn bits(self) -> usize {
        self.bytes() * 8
    }

    /// Rounds up to the next multiple of `alignment`
    pub fn align_to(self, alignment: Bytes) -> Bytes {
        let a = alignment.bytes().max(1);
        Bytes(self.0.div_ceil(a) * a)
    }
}

impl Type {
    pub fn size(&self) -> Bytes {
        match self {
            Type::Integer(IntegerWidth::I1 | IntegerWidth::I8) => Bytes(1),
            Type::Integer(IntegerWidth::I16) => Bytes(2),
            Type::Integer(IntegerWidth::I32) => Bytes(4),
            Type::Integer(IntegerWidth::I64) => Bytes(8),
            Type::Float(FloatWidth::F32) => Bytes(4),
            Type::Float(FloatWidth::F64) => Bytes(8),
            Type::Pointer => Bytes(8),
            Type::Struct(s) => s.layout().size,
        }
    }

    pub fn alignment(&self) -> Bytes {
        match self {
            Type::Struct(s) => s.layout().alignment,
            scalar => scalar.size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    pub size: Bytes,
    pub alignment: Bytes,
    pub offsets: Vec<Bytes>,
}

impl Struct {
    /// C layout: each field placed at the next offset aligned for it, the
    /// total size padded to the largest field alignment
    pub fn layout(&self) -> StructLayout {
        let mut offset = Bytes(0);
        let mut alignment = Bytes(1);
        let mut offsets = Vec::with_capacity(self.0.len());

        for field in &self.0 {
            let field_alignment = field.alignment();
            offset = offset.align_to(field_alignment);
            offsets.push(offset);
            offset = Bytes(offset.bytes() + field.size().bytes());
            alignment = alignment.max(field_alignment);
        }

        StructLayout {
            size: offset.align_to(alignment),
            alignment,
            offsets,
        }
    }

    pub fn offset_of(&self, index: usize) -> Option<Bytes> {
        self.layout().offsets.get(index).copied()
    }
}
