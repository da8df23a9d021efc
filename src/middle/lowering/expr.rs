use std::rc::Rc;

use super::{LoweringContext, Result, runtime, scope::Binding, scope::StructDefinition};
use crate::{
    diagnostics::CodegenErrorKind,
    frontend::{
        ast::{
            BinaryOperatorKind, Expression, ExpressionKind, Literal, NamedArgument,
            UnaryOperatorKind,
        },
        intern::InternedSymbol,
    },
    middle::{
        lir::{self, CastKind, ComparePredicate, Immediate, Operand, RegisterId},
        primitive::PrimitiveKind,
        ty::{Type, binary_operation_type},
    },
};

/// Largest constant exponent `**` is unrolled for
const MAX_UNROLLED_EXPONENT: i64 = 256;

impl LoweringContext<'_> {
    /// Emits the instructions computing `expression` and returns the operand
    /// holding its value
    pub(super) fn lower_expression(&mut self, expression: &Expression) -> Result<Operand> {
        let line = expression.line;

        match &expression.kind {
            ExpressionKind::Literal(literal) => self.lower_literal(*literal, &expression.ty),
            ExpressionKind::Variable(name) => {
                let (slot, ty) = self.lookup_variable(*name, line)?;
                let ty = self.lir_type(&ty, line)?;

                Ok(self.function.load(slot.into(), ty).into())
            }
            ExpressionKind::Binary { lhs, operator, rhs } => {
                let lhs_value = self.lower_expression(lhs)?;
                let (value, ty) = self.emit_binary(*operator, lhs_value, &lhs.ty, rhs, line)?;

                self.coerce(value, &ty, &expression.ty, line)
            }
            ExpressionKind::Unary { operator, operand } => {
                self.lower_unary(*operator, operand, line)
            }
            ExpressionKind::Cast {
                expression: inner,
                target,
            } => {
                let unsupported = || CodegenErrorKind::UnsupportedCast {
                    from: inner.ty.clone(),
                    target: target.clone(),
                };

                let (Some(from), Some(to)) = (inner.ty.as_primitive(), target.as_primitive())
                else {
                    return Err(self.error(line, unsupported()));
                };

                if !from.can_be_cast_to(to) {
                    return Err(self.error(line, unsupported()));
                }

                let value = self.lower_expression(inner)?;
                Ok(self.convert(value, from, to))
            }
            ExpressionKind::FunctionCall {
                name,
                arguments,
                named_arguments,
            } => self
                .lower_call(*name, arguments, named_arguments, line)?
                .ok_or_else(|| self.error(line, CodegenErrorKind::VoidValue(*name))),
            ExpressionKind::AnonymousFunction(_) => Err(self.error(
                line,
                CodegenErrorKind::UnsupportedValueType(Type::Function),
            )),
            ExpressionKind::Collection(items) => {
                let element = expression.ty.element_type().unwrap_or(Type::INT);
                let array = self.new_array_of(items, &element, line)?;

                Ok(array.into())
            }
            ExpressionKind::CollectionAccess { collection, index } => {
                let Some(element) = collection.ty.element_type() else {
                    return Err(self.error(
                        line,
                        CodegenErrorKind::NotIndexable(collection.ty.clone()),
                    ));
                };

                let array = self.lower_expression(collection)?;
                let index = self.lower_index(index)?;
                let word = runtime::get(&mut self.function, array, index);

                self.decode_element(word.into(), &element, line)
            }
            ExpressionKind::Range { start, stop } => {
                let start = self.lower_index(start)?;
                let stop = self.lower_index(stop)?;

                let array = runtime::new_array(&mut self.function);
                self.function.call(
                    runtime::CREATE_RANGE,
                    vec![array.into(), start, stop],
                    None,
                );

                Ok(array.into())
            }
            ExpressionKind::StructLiteral { name, fields } => {
                let definition = self.struct_definition(*name, line)?;

                if let Some(unknown) = fields.iter().find(|f| definition.field(f.name).is_none()) {
                    return Err(self.error(
                        line,
                        CodegenErrorKind::UnknownField {
                            name: *name,
                            field: unknown.name,
                        },
                    ));
                }

                let slot = self
                    .function
                    .alloc_stack(lir::Type::Struct(definition.lir.clone()));

                for (index, (field_name, field_ty)) in definition.fields.iter().enumerate() {
                    let pointer =
                        self.function
                            .struct_element_pointer(slot.into(), &definition.lir, index);

                    match fields.iter().find(|f| f.name == *field_name) {
                        Some(initializer) => {
                            let value =
                                self.lower_stored_value(&initializer.value, field_ty, line)?;
                            self.function.store(pointer.into(), value);
                        }
                        None => self.store_default(pointer.into(), field_ty, line)?,
                    }
                }

                let value = self
                    .function
                    .load(slot.into(), lir::Type::Struct(definition.lir.clone()));

                Ok(value.into())
            }
            ExpressionKind::FieldAccess { object, field } => {
                let (pointer, ty) = self.field_address(object, *field, line)?;
                let ty = self.lir_type(&ty, line)?;

                Ok(self.function.load(pointer.into(), ty).into())
            }
            ExpressionKind::Input(prompt) => {
                if let Some(prompt) = prompt {
                    if !prompt.ty.is_array_like() {
                        return Err(self.error(
                            line,
                            CodegenErrorKind::UnsupportedPrintOperand(prompt.ty.clone()),
                        ));
                    }

                    let prompt = self.lower_expression(prompt)?;
                    self.function.call(runtime::PRINT_STR, vec![prompt], None);
                }

                let value = self.function.call(runtime::READ_INT, vec![], Some(lir::Type::I64));
                let value = value.map_or(Operand::i64(0), Operand::Register);

                self.coerce(value, &Type::INT, &expression.ty, line)
            }
        }
    }

    fn lower_literal(&mut self, literal: Literal, ty: &Type) -> Result<Operand> {
        let lowered = ty.as_primitive().map(PrimitiveKind::lower);

        let immediate = match (literal, lowered) {
            (Literal::Integer(value), Some(lir::Type::Integer(width))) => {
                Immediate::Int(width.truncate(value), width)
            }
            (Literal::Integer(value), Some(lir::Type::Float(width))) => {
                Immediate::Float(round_to(value as f64, width), width)
            }
            (Literal::Integer(value), _) => Immediate::i64(value),
            (Literal::Float(value), Some(lir::Type::Float(width))) => {
                Immediate::Float(round_to(value, width), width)
            }
            (Literal::Float(value), _) => Immediate::Float(value, lir::FloatWidth::F64),
            (Literal::Boolean(value), _) => Immediate::bool(value),
            (Literal::String(value), _) => {
                let array = runtime::new_array(&mut self.function);

                for byte in value.value().bytes() {
                    runtime::append(&mut self.function, array.into(), Operand::i64(byte as i64));
                }

                return Ok(array.into());
            }
        };

        Ok(Operand::Immediate(immediate))
    }

    /// Resolves a variable owned by the function currently being emitted
    pub(super) fn lookup_variable(
        &self,
        name: InternedSymbol,
        line: usize,
    ) -> Result<(RegisterId, Type)> {
        match self.scopes.lookup(name) {
            Some(Binding::Variable {
                slot,
                ty,
                function_depth,
            }) => {
                if *function_depth != self.function_depth {
                    return Err(self.error(line, CodegenErrorKind::CapturedVariable(name)));
                }

                Ok((*slot, ty.clone()))
            }
            Some(Binding::Function(_)) => Err(self.error(
                line,
                CodegenErrorKind::UnsupportedValueType(Type::Function),
            )),
            Some(Binding::StructType(_)) => Err(self.error(
                line,
                CodegenErrorKind::UnsupportedValueType(Type::Struct(name)),
            )),
            None => Err(self.error(line, CodegenErrorKind::UnresolvedName(name))),
        }
    }

    /// Lowers an integer valued expression and widens it to `int`
    pub(super) fn lower_index(&mut self, index: &Expression) -> Result<Operand> {
        if !index.ty.is_integer() {
            return Err(self.error(
                index.line,
                CodegenErrorKind::TypeMismatch {
                    expected: Type::INT,
                    found: index.ty.clone(),
                },
            ));
        }

        let value = self.lower_expression(index)?;
        self.coerce(value, &index.ty, &Type::INT, index.line)
    }

    /// Applies `operator` to an already computed left operand. The right
    /// operand is lowered here since exponentiation needs it unevaluated.
    pub(super) fn emit_binary(
        &mut self,
        operator: BinaryOperatorKind,
        lhs: Operand,
        lhs_ty: &Type,
        rhs: &Expression,
        line: usize,
    ) -> Result<(Operand, Type)> {
        if operator == BinaryOperatorKind::Power {
            return self.emit_power(lhs, lhs_ty, rhs, line);
        }

        let rhs_value = self.lower_expression(rhs)?;
        let rhs_ty = &rhs.ty;

        let unsupported = || CodegenErrorKind::UnsupportedBinaryOperation {
            operator: operator.to_string(),
            lhs: lhs_ty.clone(),
            rhs: rhs_ty.clone(),
        };

        let (Some(l), Some(r)) = (lhs_ty.as_primitive(), rhs_ty.as_primitive()) else {
            return Err(self.error(line, unsupported()));
        };
        let Some(result) = binary_operation_type(operator, lhs_ty, rhs_ty) else {
            return Err(self.error(line, unsupported()));
        };

        let operand_kind = match operator {
            BinaryOperatorKind::Divide => result.as_primitive().unwrap_or(PrimitiveKind::Dec),
            BinaryOperatorKind::FloorDivide if !(l.is_integer() && r.is_integer()) => {
                PrimitiveKind::Int
            }
            BinaryOperatorKind::ShiftLeft | BinaryOperatorKind::ShiftRight => l,
            _ => l.promote(r),
        };

        let lhs = self.convert(lhs, l, operand_kind);
        let rhs = self.convert(rhs_value, r, operand_kind);
        let floating = operand_kind.is_floating();

        if operator.is_comparison() {
            let predicate = comparison_predicate(operator, floating);
            let value = self.function.compare(predicate, lhs, rhs);

            return Ok((value.into(), Type::BOOL));
        }

        let lir_operator = match operator {
            BinaryOperatorKind::Add if floating => lir::BinaryOperator::FAdd,
            BinaryOperatorKind::Add => lir::BinaryOperator::Add,
            BinaryOperatorKind::Subtract if floating => lir::BinaryOperator::FSub,
            BinaryOperatorKind::Subtract => lir::BinaryOperator::Sub,
            BinaryOperatorKind::Multiply if floating => lir::BinaryOperator::FMul,
            BinaryOperatorKind::Multiply => lir::BinaryOperator::Mul,
            BinaryOperatorKind::Divide => lir::BinaryOperator::FDiv,
            BinaryOperatorKind::FloorDivide => lir::BinaryOperator::SDiv,
            BinaryOperatorKind::Modulus if floating => lir::BinaryOperator::FRem,
            BinaryOperatorKind::Modulus => lir::BinaryOperator::SRem,
            BinaryOperatorKind::LogicalAnd | BinaryOperatorKind::BitwiseAnd => {
                lir::BinaryOperator::And
            }
            BinaryOperatorKind::LogicalOr | BinaryOperatorKind::BitwiseOr => {
                lir::BinaryOperator::Or
            }
            BinaryOperatorKind::Xor => lir::BinaryOperator::Xor,
            BinaryOperatorKind::ShiftLeft => lir::BinaryOperator::Shl,
            BinaryOperatorKind::ShiftRight => lir::BinaryOperator::AShr,
            _ => return Err(self.error(line, unsupported())),
        };

        let value = self
            .function
            .binary(lir_operator, lhs, rhs, operand_kind.lower());

        Ok((value.into(), Type::Primitive(operand_kind)))
    }

    /// `x ** n` for a constant `n` becomes `n` multiplications of an
    /// accumulator starting at one
    fn emit_power(
        &mut self,
        base: Operand,
        base_ty: &Type,
        exponent: &Expression,
        line: usize,
    ) -> Result<(Operand, Type)> {
        let count = match &exponent.kind {
            ExpressionKind::Literal(Literal::Integer(n)) => *n,
            ExpressionKind::Unary {
                operator: UnaryOperatorKind::Negate,
                operand,
            } => match operand.kind {
                ExpressionKind::Literal(Literal::Integer(n)) => n.saturating_neg(),
                _ => return Err(self.error(line, CodegenErrorKind::NonConstantExponent)),
            },
            _ => return Err(self.error(line, CodegenErrorKind::NonConstantExponent)),
        };

        if count < 0 {
            return Err(self.error(line, CodegenErrorKind::NegativeExponent(count)));
        }
        if count > MAX_UNROLLED_EXPONENT {
            return Err(self.error(
                line,
                CodegenErrorKind::ExponentTooLarge {
                    exponent: count,
                    limit: MAX_UNROLLED_EXPONENT,
                },
            ));
        }

        let result = binary_operation_type(BinaryOperatorKind::Power, base_ty, &exponent.ty)
            .and_then(|ty| ty.as_primitive().map(|k| (ty, k)));
        let (Some(base_kind), Some((result_ty, kind))) = (base_ty.as_primitive(), result) else {
            return Err(self.error(
                line,
                CodegenErrorKind::UnsupportedBinaryOperation {
                    operator: BinaryOperatorKind::Power.to_string(),
                    lhs: base_ty.clone(),
                    rhs: exponent.ty.clone(),
                },
            ));
        };

        let base = self.convert(base, base_kind, kind);
        let ty = kind.lower();

        let (one, multiply) = match ty {
            lir::Type::Float(width) => (Immediate::Float(1.0, width), lir::BinaryOperator::FMul),
            lir::Type::Integer(width) => (Immediate::Int(1, width), lir::BinaryOperator::Mul),
            _ => (Immediate::i64(1), lir::BinaryOperator::Mul),
        };

        let accumulator = self.function.create_register(ty.clone());
        self.function.push_instruction(lir::Instruction::Move {
            destination: accumulator,
            source: one.into(),
        });

        let mut value = accumulator;
        for _ in 0..count {
            value = self
                .function
                .binary(multiply, value.into(), base, ty.clone());
        }

        Ok((value.into(), result_ty))
    }

    fn lower_unary(
        &mut self,
        operator: UnaryOperatorKind,
        operand: &Expression,
        line: usize,
    ) -> Result<Operand> {
        let ty = &operand.ty;

        let lir_operator = match operator {
            UnaryOperatorKind::Plus if ty.is_numeric() => None,
            UnaryOperatorKind::Negate if ty.is_integer() => Some(lir::UnaryOperator::Neg),
            UnaryOperatorKind::Negate if ty.is_floating() => Some(lir::UnaryOperator::FNeg),
            UnaryOperatorKind::LogicalNot if ty.is_bool() => Some(lir::UnaryOperator::Not),
            UnaryOperatorKind::BitwiseNot if ty.is_integer() => Some(lir::UnaryOperator::Not),
            _ => {
                return Err(self.error(
                    line,
                    CodegenErrorKind::UnsupportedUnaryOperation {
                        operator: operator.to_string(),
                        operand: ty.clone(),
                    },
                ));
            }
        };

        let value = self.lower_expression(operand)?;

        match lir_operator {
            Some(lir_operator) => {
                let ty = self.lir_type(ty, line)?;
                Ok(self.function.unary(lir_operator, value, ty).into())
            }
            None => Ok(value),
        }
    }

    /// Binds the arguments of a call to the callee's parameters: positional
    /// arguments first, then named arguments, then declared defaults which are
    /// evaluated at the call site. Returns `None` for void functions.
    pub(super) fn lower_call(
        &mut self,
        name: InternedSymbol,
        arguments: &[Expression],
        named_arguments: &[NamedArgument],
        line: usize,
    ) -> Result<Option<Operand>> {
        let signature = match self.scopes.lookup(name) {
            Some(Binding::Function(signature)) => signature.clone(),
            Some(_) => return Err(self.error(line, CodegenErrorKind::NotCallable(name))),
            None => return Err(self.error(line, CodegenErrorKind::UnresolvedName(name))),
        };

        let repeated = named_arguments
            .iter()
            .enumerate()
            .find(|(position, named)| {
                named_arguments[..*position]
                    .iter()
                    .any(|n| n.name == named.name)
            });

        if let Some((_, named)) = repeated {
            return Err(self.error(
                line,
                CodegenErrorKind::MultipleValues {
                    function: name,
                    argument: named.name,
                },
            ));
        }

        let parameter_count = signature.parameters.len();
        let supplied = match signature.varargs {
            Some(_) => named_arguments.len(),
            None => arguments.len() + named_arguments.len(),
        };
        if supplied > parameter_count {
            return Err(self.error(line, CodegenErrorKind::UnexpectedArguments(name)));
        }

        for named in named_arguments {
            let Some(index) = signature.parameter_index(named.name) else {
                return Err(self.error(line, CodegenErrorKind::UnexpectedArguments(name)));
            };

            if index < arguments.len() {
                return Err(self.error(
                    line,
                    CodegenErrorKind::MultipleValues {
                        function: name,
                        argument: named.name,
                    },
                ));
            }
        }

        let mut values = Vec::with_capacity(parameter_count + 1);

        for (index, (parameter, ty)) in signature.parameters.iter().enumerate() {
            let argument = match arguments.get(index) {
                Some(argument) => argument,
                None => match named_arguments.iter().find(|n| n.name == *parameter) {
                    Some(named) => &named.value,
                    None => match signature.defaults.get(parameter) {
                        Some(default) => default,
                        None => {
                            return Err(self.error(
                                line,
                                CodegenErrorKind::MissingArgument {
                                    function: name,
                                    argument: *parameter,
                                },
                            ));
                        }
                    },
                },
            };

            let value = self.lower_expression(argument)?;
            values.push(self.coerce(value, &argument.ty, ty, argument.line)?);
        }

        if let Some((_, element)) = &signature.varargs {
            let surplus = arguments.get(parameter_count..).unwrap_or_default();
            let packed = self.new_array_of(surplus, element, line)?;
            values.push(packed.into());
        }

        let return_type = self.return_lir_type(&signature.return_type, line)?;

        Ok(self
            .function
            .call(signature.symbol.value(), values, return_type)
            .map(Operand::Register))
    }

    /// Creates a dynamic array holding `items` converted to `element`
    pub(super) fn new_array_of(
        &mut self,
        items: &[Expression],
        element: &Type,
        line: usize,
    ) -> Result<RegisterId> {
        self.check_element_type(element, line)?;

        let array = runtime::new_array(&mut self.function);

        for item in items {
            let value = self.lower_expression(item)?;
            let value = self.coerce(value, &item.ty, element, item.line)?;
            let word = self.encode_element(value, element, item.line)?;
            runtime::append(&mut self.function, array.into(), word);
        }

        Ok(array)
    }

    fn check_element_type(&self, element: &Type, line: usize) -> Result<()> {
        match element {
            Type::Primitive(_) | Type::Str | Type::Array(_) => Ok(()),
            other => Err(self.error(
                line,
                CodegenErrorKind::UnsupportedElementType(other.clone()),
            )),
        }
    }

    /// Widens a value into the 8 byte word stored in a dynamic array
    pub(super) fn encode_element(
        &mut self,
        value: Operand,
        element: &Type,
        line: usize,
    ) -> Result<Operand> {
        self.check_element_type(element, line)?;

        let b = &mut self.function;
        let word = match element {
            Type::Primitive(PrimitiveKind::Int | PrimitiveKind::Int64) => return Ok(value),
            Type::Primitive(PrimitiveKind::Bool) => b.cast(CastKind::ZExt, value, lir::Type::I64),
            Type::Primitive(PrimitiveKind::Dec) => {
                b.cast(CastKind::BitCast, value, lir::Type::I64)
            }
            Type::Primitive(PrimitiveKind::Float) => {
                let wide = b.cast(CastKind::FPExt, value, lir::Type::F64);
                b.cast(CastKind::BitCast, wide.into(), lir::Type::I64)
            }
            Type::Primitive(_) => b.cast(CastKind::SExt, value, lir::Type::I64),
            _ => b.cast(CastKind::PtrToInt, value, lir::Type::I64),
        };

        Ok(word.into())
    }

    /// Narrows a word read from a dynamic array back into a value of
    /// `element`
    pub(super) fn decode_element(
        &mut self,
        word: Operand,
        element: &Type,
        line: usize,
    ) -> Result<Operand> {
        self.check_element_type(element, line)?;

        let b = &mut self.function;
        let value = match element {
            Type::Primitive(PrimitiveKind::Int | PrimitiveKind::Int64) => return Ok(word),
            Type::Primitive(PrimitiveKind::Dec) => {
                b.cast(CastKind::BitCast, word, lir::Type::F64)
            }
            Type::Primitive(PrimitiveKind::Float) => {
                let wide = b.cast(CastKind::BitCast, word, lir::Type::F64);
                b.cast(CastKind::FPTrunc, wide.into(), PrimitiveKind::Float.lower())
            }
            Type::Primitive(kind) => b.cast(CastKind::Trunc, word, kind.lower()),
            _ => b.cast(CastKind::IntToPtr, word, lir::Type::Pointer),
        };

        Ok(value.into())
    }

    /// Converts a value between numeric kinds
    pub(super) fn convert(&mut self, value: Operand, from: PrimitiveKind, to: PrimitiveKind) -> Operand {
        if from == to {
            return value;
        }

        let target = to.lower();
        let b = &mut self.function;

        let converted = match (from.is_floating(), to.is_floating()) {
            (false, false) if from == PrimitiveKind::Bool => b.cast(CastKind::ZExt, value, target),
            (false, false) if to.bits() > from.bits() => b.cast(CastKind::SExt, value, target),
            (false, false) if to.bits() < from.bits() => b.cast(CastKind::Trunc, value, target),
            (false, false) => return value,
            (false, true) if from == PrimitiveKind::Bool => {
                let wide = b.cast(CastKind::ZExt, value, lir::Type::I64);
                b.cast(CastKind::SIToFP, wide.into(), target)
            }
            (false, true) => b.cast(CastKind::SIToFP, value, target),
            (true, false) => b.cast(CastKind::FPToSI, value, target),
            (true, true) if to.bits() > from.bits() => b.cast(CastKind::FPExt, value, target),
            (true, true) => b.cast(CastKind::FPTrunc, value, target),
        };

        converted.into()
    }

    /// Implicit conversion of a value to the type of the place it flows into
    pub(super) fn coerce(
        &mut self,
        value: Operand,
        from: &Type,
        to: &Type,
        line: usize,
    ) -> Result<Operand> {
        if from == to {
            return Ok(value);
        }

        match (from, to) {
            (Type::Primitive(f), Type::Primitive(t)) if f.is_numeric() && t.is_numeric() => {
                Ok(self.convert(value, *f, *t))
            }
            (Type::Str, Type::Array(element)) | (Type::Array(element), Type::Str)
                if **element == Type::INT =>
            {
                Ok(value)
            }
            _ => Err(self.error(
                line,
                CodegenErrorKind::TypeMismatch {
                    expected: to.clone(),
                    found: from.clone(),
                },
            )),
        }
    }

    /// Address of a struct valued expression. Variables and fields are
    /// addressed in place, other values are spilled to a fresh stack slot.
    fn struct_address(
        &mut self,
        object: &Expression,
        name: InternedSymbol,
    ) -> Result<(Operand, Rc<StructDefinition>)> {
        let line = object.line;
        let definition = self.struct_definition(name, line)?;

        let address = match &object.kind {
            ExpressionKind::Variable(variable) => self.lookup_variable(*variable, line)?.0,
            ExpressionKind::FieldAccess {
                object: inner,
                field,
            } => self.field_address(inner, *field, line)?.0,
            _ => {
                let value = self.lower_expression(object)?;
                let slot = self
                    .function
                    .alloc_stack(lir::Type::Struct(definition.lir.clone()));
                self.function.store(slot.into(), value);
                slot
            }
        };

        Ok((address.into(), definition))
    }

    /// Pointer to `object.field` along with the field's type
    pub(super) fn field_address(
        &mut self,
        object: &Expression,
        field: InternedSymbol,
        line: usize,
    ) -> Result<(RegisterId, Type)> {
        let Type::Struct(name) = &object.ty else {
            return Err(self.error(
                line,
                CodegenErrorKind::FieldAccessOnNonStruct {
                    ty: object.ty.clone(),
                    field,
                },
            ));
        };

        let (address, definition) = self.struct_address(object, *name)?;
        let Some((index, ty)) = definition.field(field) else {
            return Err(self.error(
                line,
                CodegenErrorKind::UnknownField {
                    name: *name,
                    field,
                },
            ));
        };

        let pointer = self
            .function
            .struct_element_pointer(address, &definition.lir, index);

        Ok((pointer, ty.clone()))
    }

    /// Zero value of `ty` written to `pointer`. Arrays and strings start out
    /// as fresh empty records.
    pub(super) fn store_default(&mut self, pointer: Operand, ty: &Type, line: usize) -> Result<()> {
        match ty {
            Type::Primitive(kind) => {
                let zero = match kind.lower() {
                    lir::Type::Float(width) => Immediate::Float(0.0, width),
                    lir::Type::Integer(width) => Immediate::Int(0, width),
                    _ => Immediate::i64(0),
                };
                self.function.store(pointer, zero.into());
            }
            Type::Str | Type::Array(_) => {
                let array = runtime::new_array(&mut self.function);
                self.function.store(pointer, array.into());
            }
            Type::Struct(name) => {
                let definition = self.struct_definition(*name, line)?;

                for (index, (_, field_ty)) in definition.fields.iter().enumerate() {
                    let field = self
                        .function
                        .struct_element_pointer(pointer, &definition.lir, index);
                    self.store_default(field.into(), field_ty, line)?;
                }
            }
            Type::Void | Type::Function => {
                return Err(self.error(
                    line,
                    CodegenErrorKind::UnsupportedValueType(ty.clone()),
                ));
            }
        }

        Ok(())
    }
}

fn comparison_predicate(operator: BinaryOperatorKind, floating: bool) -> ComparePredicate {
    match (operator, floating) {
        (BinaryOperatorKind::Equals, false) => ComparePredicate::Eq,
        (BinaryOperatorKind::NotEquals, false) => ComparePredicate::Ne,
        (BinaryOperatorKind::LessThan, false) => ComparePredicate::Slt,
        (BinaryOperatorKind::LessThanOrEqualTo, false) => ComparePredicate::Sle,
        (BinaryOperatorKind::GreaterThan, false) => ComparePredicate::Sgt,
        (BinaryOperatorKind::GreaterThanOrEqualTo, false) => ComparePredicate::Sge,
        (BinaryOperatorKind::Equals, true) => ComparePredicate::Oeq,
        (BinaryOperatorKind::NotEquals, true) => ComparePredicate::One,
        (BinaryOperatorKind::LessThan, true) => ComparePredicate::Olt,
        (BinaryOperatorKind::LessThanOrEqualTo, true) => ComparePredicate::Ole,
        (BinaryOperatorKind::GreaterThan, true) => ComparePredicate::Ogt,
        (_, true) => ComparePredicate::Oge,
        (_, false) => ComparePredicate::Sge,
    }
}

fn round_to(value: f64, width: lir::FloatWidth) -> f64 {
    match width {
        lir::FloatWidth::F32 => value as f32 as f64,
        lir::FloatWidth::F64 => value,
    }
}
