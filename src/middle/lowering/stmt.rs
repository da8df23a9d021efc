use std::{mem, rc::Rc};

use log::trace;

use super::{
    LoweringContext, Result,
    blocks::FunctionBuilder,
    runtime,
    scope::{Binding, FunctionSignature, StructDefinition},
};
use crate::{
    diagnostics::CodegenErrorKind,
    frontend::{
        ast::{
            AssignmentOperatorKind, Block, CaseValue, Condition, ConditionalBranch, Expression,
            ExpressionKind, FunctionDeclaration, Literal, Statement, StatementKind,
            StructDeclaration, SwitchCase, UnaryOperatorKind,
        },
        intern::InternedSymbol,
    },
    middle::{
        lir::{self, ComparePredicate, Immediate, Operand, RegisterId},
        ty::Type,
    },
};

impl LoweringContext<'_> {
    /// Lowers the statements of a block in order. Statements following one
    /// which terminated the current block are unreachable and not emitted.
    pub(super) fn lower_block(&mut self, block: &Block) -> Result<()> {
        for statement in &block.statements {
            if self.function.is_terminated() {
                trace!("dropping unreachable statements from line {}", statement.line);
                break;
            }

            self.lower_statement(statement)?;
        }

        Ok(())
    }

    fn lower_statement(&mut self, statement: &Statement) -> Result<()> {
        let line = statement.line;

        match &statement.kind {
            StatementKind::VariableDeclaration {
                name,
                ty,
                initializer,
            } => self.lower_variable_declaration(*name, ty, initializer.as_deref(), line),
            StatementKind::Assignment { target, value } => {
                self.lower_assignment(target, value, line)
            }
            StatementKind::OperatorAssignment {
                operator,
                target,
                value,
            } => self.lower_operator_assignment(*operator, target, value, line),
            StatementKind::If { branches } => self.lower_if(branches),
            StatementKind::While { condition, block } => {
                let cond = self.function.new_block("while.cond");
                let body = self.function.new_block("while.body");
                let end = self.function.new_block("while.end");

                self.function.branch(cond);
                self.function.position_at(cond);
                let value = self.lower_condition(condition)?;
                self.function.conditional_branch(value, body, end);

                self.function.position_at(body);
                self.function.push_loop(cond, end);
                self.lower_block(block)?;
                self.function.pop_loop();
                self.function.branch(cond);

                self.function.position_at(end);
                Ok(())
            }
            StatementKind::For {
                elements,
                iterable,
                block,
            } => self.lower_for(elements, iterable, block, line),
            StatementKind::Switch { value, cases } => self.lower_switch(value, cases, line),
            StatementKind::Break => match self.function.current_break_target() {
                Some(target) => {
                    self.function.branch(target);
                    Ok(())
                }
                None => Err(self.error(line, CodegenErrorKind::BreakOutsideLoop)),
            },
            StatementKind::Continue => match self.function.current_continue_target() {
                Some(target) => {
                    self.function.branch(target);
                    Ok(())
                }
                None => Err(self.error(line, CodegenErrorKind::ContinueOutsideLoop)),
            },
            StatementKind::Pass => Ok(()),
            StatementKind::FunctionDeclaration(declaration) => {
                self.lower_function_declaration(declaration)?;
                Ok(())
            }
            StatementKind::StructDeclaration(declaration) => {
                self.lower_struct_declaration(declaration, line)
            }
            StatementKind::Return(value) => {
                if let Some(value) = value {
                    if self.return_type.is_void() {
                        return Err(self.error(
                            line,
                            CodegenErrorKind::TypeMismatch {
                                expected: Type::Void,
                                found: value.ty.clone(),
                            },
                        ));
                    }

                    let return_type = self.return_type.clone();
                    let result = self.lower_expression(value)?;
                    let result = self.coerce(result, &value.ty, &return_type, line)?;

                    if let Some(slot) = self.function.return_slot() {
                        self.function.store(slot.into(), result);
                    }
                }

                let exit = self.function.exit_block();
                self.function.branch(exit);
                Ok(())
            }
            StatementKind::Print(value) => self.lower_print(value.as_deref(), line),
            StatementKind::Expression(expression) => match &expression.kind {
                ExpressionKind::FunctionCall {
                    name,
                    arguments,
                    named_arguments,
                } => {
                    self.lower_call(*name, arguments, named_arguments, line)?;
                    Ok(())
                }
                ExpressionKind::AnonymousFunction(declaration) => {
                    self.lower_function_declaration(declaration)?;
                    Ok(())
                }
                _ => {
                    self.lower_expression(expression)?;
                    Ok(())
                }
            },
        }
    }

    fn lower_variable_declaration(
        &mut self,
        name: InternedSymbol,
        ty: &Type,
        initializer: Option<&Expression>,
        line: usize,
    ) -> Result<()> {
        if let Some(signature) = initializer.map(|i| self.function_alias(i)).transpose()?.flatten()
        {
            self.scopes.define(name, Binding::Function(signature), 0);
            return Ok(());
        }

        let lir_ty = self.lir_type(ty, line)?;
        let slot = self.function.alloc_stack(lir_ty);

        match initializer {
            Some(initializer) => {
                let value = self.lower_stored_value(initializer, ty, line)?;
                self.function.store(slot.into(), value);
            }
            None => self.store_default(slot.into(), ty, line)?,
        }

        self.define_variable(name, slot, ty.clone());
        Ok(())
    }

    fn define_variable(&mut self, name: InternedSymbol, slot: RegisterId, ty: Type) {
        let binding = Binding::Variable {
            slot,
            ty,
            function_depth: self.function_depth,
        };
        self.scopes.define(name, binding, 0);
    }

    /// The function a value names, for assignments that alias a function
    /// under another name instead of storing a value
    fn function_alias(&mut self, value: &Expression) -> Result<Option<Rc<FunctionSignature>>> {
        match &value.kind {
            ExpressionKind::AnonymousFunction(declaration) => {
                self.lower_function_declaration(declaration).map(Some)
            }
            ExpressionKind::Variable(name) => match self.scopes.lookup(*name) {
                Some(Binding::Function(signature)) => Ok(Some(signature.clone())),
                _ => Ok(None),
            },
            _ => Ok(None),
        }
    }

    /// Lowers a value about to be stored into a place of type `ty`. Arrays
    /// read out of another place are copied so the two never share elements,
    /// including arrays held in the fields of a struct.
    pub(super) fn lower_stored_value(&mut self, value: &Expression, ty: &Type, line: usize) -> Result<Operand> {
        let lowered = self.lower_expression(value)?;
        let lowered = self.coerce(lowered, &value.ty, ty, line)?;

        let reads_a_place = matches!(
            value.kind,
            ExpressionKind::Variable(_) | ExpressionKind::FieldAccess { .. }
        );

        if !reads_a_place || !self.holds_arrays(ty, line)? {
            return Ok(lowered);
        }

        if ty.is_array_like() {
            return Ok(runtime::copy_array(&mut self.function, lowered).into());
        }

        let lir_ty = self.lir_type(ty, line)?;
        let copy = self.function.alloc_stack(lir_ty.clone());
        self.function.store(copy.into(), lowered);
        self.copy_arrays_at(copy.into(), ty, line)?;

        Ok(self.function.load(copy.into(), lir_ty).into())
    }

    fn holds_arrays(&self, ty: &Type, line: usize) -> Result<bool> {
        match ty {
            _ if ty.is_array_like() => Ok(true),
            Type::Struct(name) => {
                let definition = self.struct_definition(*name, line)?;
                for (_, field_ty) in &definition.fields {
                    if self.holds_arrays(field_ty, line)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    /// Replaces every array reachable from the value at `place` with a copy
    fn copy_arrays_at(&mut self, place: Operand, ty: &Type, line: usize) -> Result<()> {
        match ty {
            _ if ty.is_array_like() => {
                let shared = self.function.load(place, lir::Type::Pointer);
                let owned = runtime::copy_array(&mut self.function, shared.into());
                self.function.store(place, owned.into());
            }
            Type::Struct(name) => {
                let definition = self.struct_definition(*name, line)?;
                for (index, (_, field_ty)) in definition.fields.iter().enumerate() {
                    if !self.holds_arrays(field_ty, line)? {
                        continue;
                    }

                    let field =
                        self.function
                            .struct_element_pointer(place, &definition.lir, index);
                    self.copy_arrays_at(field.into(), field_ty, line)?;
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn lower_assignment(&mut self, target: &Expression, value: &Expression, line: usize) -> Result<()> {
        match &target.kind {
            ExpressionKind::Variable(name) => {
                if let Some(signature) = self.function_alias(value)? {
                    self.scopes.define(*name, Binding::Function(signature), 0);
                    return Ok(());
                }

                let existing = match self.scopes.lookup(*name) {
                    Some(Binding::Variable {
                        slot,
                        ty,
                        function_depth,
                    }) if *function_depth == self.function_depth => Some((*slot, ty.clone())),
                    _ => None,
                };

                match existing {
                    Some((slot, ty)) => {
                        let value = self.lower_stored_value(value, &ty, line)?;
                        self.function.store(slot.into(), value);
                    }
                    None => {
                        let ty = value.ty.clone();
                        let lir_ty = self.lir_type(&ty, line)?;
                        let slot = self.function.alloc_stack(lir_ty);
                        let stored = self.lower_stored_value(value, &ty, line)?;
                        self.function.store(slot.into(), stored);
                        self.define_variable(*name, slot, ty);
                    }
                }

                Ok(())
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
                let value = self.lower_stored_value(value, &element, line)?;
                let word = self.encode_element(value, &element, line)?;

                runtime::set(&mut self.function, array, index, word);
                Ok(())
            }
            ExpressionKind::FieldAccess { object, field } => {
                let (pointer, ty) = self.field_address(object, *field, line)?;
                let value = self.lower_stored_value(value, &ty, line)?;

                self.function.store(pointer.into(), value);
                Ok(())
            }
            _ => Err(self.error(line, CodegenErrorKind::InvalidAssignmentTarget)),
        }
    }

    /// `target op= value`. The place named by the target is computed once.
    fn lower_operator_assignment(
        &mut self,
        operator: AssignmentOperatorKind,
        target: &Expression,
        value: &Expression,
        line: usize,
    ) -> Result<()> {
        let operator = operator.binary_operator();

        match &target.kind {
            ExpressionKind::Variable(name) => {
                let (slot, ty) = self.lookup_variable(*name, line)?;
                let lir_ty = self.lir_type(&ty, line)?;
                let current = self.function.load(slot.into(), lir_ty);

                let (result, result_ty) =
                    self.emit_binary(operator, current.into(), &ty, value, line)?;
                let result = self.coerce(result, &result_ty, &ty, line)?;

                self.function.store(slot.into(), result);
                Ok(())
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
                let current = self.decode_element(word.into(), &element, line)?;

                let (result, result_ty) = self.emit_binary(operator, current, &element, value, line)?;
                let result = self.coerce(result, &result_ty, &element, line)?;
                let word = self.encode_element(result, &element, line)?;

                runtime::set(&mut self.function, array, index, word);
                Ok(())
            }
            ExpressionKind::FieldAccess { object, field } => {
                let (pointer, ty) = self.field_address(object, *field, line)?;
                let lir_ty = self.lir_type(&ty, line)?;
                let current = self.function.load(pointer.into(), lir_ty);

                let (result, result_ty) =
                    self.emit_binary(operator, current.into(), &ty, value, line)?;
                let result = self.coerce(result, &result_ty, &ty, line)?;

                self.function.store(pointer.into(), result);
                Ok(())
            }
            _ => Err(self.error(line, CodegenErrorKind::InvalidAssignmentTarget)),
        }
    }

    fn lower_condition(&mut self, condition: &Expression) -> Result<Operand> {
        if !condition.ty.is_bool() {
            return Err(self.error(
                condition.line,
                CodegenErrorKind::TypeMismatch {
                    expected: Type::BOOL,
                    found: condition.ty.clone(),
                },
            ));
        }

        self.lower_expression(condition)
    }

    /// Conditions are tested in order from `if.start`. A branch whose
    /// condition fails moves on to the next test, `else` always succeeds.
    fn lower_if(&mut self, branches: &[ConditionalBranch]) -> Result<()> {
        let start = self.function.new_block("if.start");
        let end = self.function.new_block("if.end");

        self.function.branch(start);
        self.function.position_at(start);

        for branch in branches {
            let value = match &branch.condition {
                Condition::Expression(condition) => self.lower_condition(condition)?,
                Condition::Else => Immediate::bool(true).into(),
            };

            let then = self.function.new_block("if.then");
            let next = self.function.new_block("if.elif");
            self.function.conditional_branch(value, then, next);

            self.function.position_at(then);
            self.lower_block(&branch.block)?;
            self.function.branch(end);

            self.function.position_at(next);
        }

        self.function.branch(end);
        self.function.position_at(end);
        Ok(())
    }

    fn lower_for(
        &mut self,
        elements: &[InternedSymbol],
        iterable: &Expression,
        block: &Block,
        line: usize,
    ) -> Result<()> {
        let Some(element_ty) = iterable.ty.element_type() else {
            return Err(self.error(line, CodegenErrorKind::NotIterable(iterable.ty.clone())));
        };

        // With several names every element is unpacked into them
        let unpack = match elements {
            [_] => None,
            _ => {
                let Some(inner) = element_ty.element_type() else {
                    return Err(self.error(
                        line,
                        CodegenErrorKind::NonIterableUnpack(element_ty.clone()),
                    ));
                };

                Some((inner, self.unpack_checked_statically(elements.len(), iterable, line)?))
            }
        };

        let name_ty = match &unpack {
            Some((inner, _)) => inner.clone(),
            None => element_ty.clone(),
        };
        let name_lir_ty = self.lir_type(&name_ty, line)?;

        let array = self.lower_expression(iterable)?;
        let position = self.function.alloc_stack(lir::Type::I64);

        let slots = elements
            .iter()
            .map(|name| {
                let slot = self.function.alloc_stack(name_lir_ty.clone());
                self.define_variable(*name, slot, name_ty.clone());
                slot
            })
            .collect::<Vec<_>>();

        let init = self.function.new_block("for.init");
        let cond = self.function.new_block("for.cond");
        let body = self.function.new_block("for.body");
        let step = self.function.new_block("for.step");
        let end = self.function.new_block("for.end");

        self.function.branch(init);
        self.function.position_at(init);
        self.function.store(position.into(), Operand::i64(0));
        self.function.branch(cond);

        // The length is read again on every iteration
        self.function.position_at(cond);
        let index = self.function.load(position.into(), lir::Type::I64);
        let length = runtime::length(&mut self.function, array);
        let more = self
            .function
            .compare(ComparePredicate::Slt, index.into(), length.into());
        self.function.conditional_branch(more.into(), body, end);

        self.function.position_at(body);
        let index = self.function.load(position.into(), lir::Type::I64);
        let word = runtime::get(&mut self.function, array, index.into());
        let element = self.decode_element(word.into(), &element_ty, line)?;

        match &unpack {
            None => self.function.store(slots[0].into(), element),
            Some((inner, checked_statically)) => {
                if !checked_statically {
                    self.emit_unpack_arity_check(element, elements.len());
                }

                for (i, slot) in slots.iter().enumerate() {
                    let word = runtime::get(&mut self.function, element, Operand::i64(i as i64));
                    let value = self.decode_element(word.into(), inner, line)?;
                    self.function.store((*slot).into(), value);
                }
            }
        }

        self.function.push_loop(step, end);
        self.lower_block(block)?;
        self.function.pop_loop();
        self.function.branch(step);

        self.function.position_at(step);
        let index = self.function.load(position.into(), lir::Type::I64);
        let next = self.function.binary(
            lir::BinaryOperator::Add,
            index.into(),
            Operand::i64(1),
            lir::Type::I64,
        );
        self.function.store(position.into(), next.into());
        self.function.branch(cond);

        self.function.position_at(end);
        Ok(())
    }

    /// A literal made of literals has its arity checked here. Returns whether
    /// that was possible.
    fn unpack_checked_statically(
        &self,
        expected: usize,
        iterable: &Expression,
        line: usize,
    ) -> Result<bool> {
        let ExpressionKind::Collection(items) = &iterable.kind else {
            return Ok(false);
        };

        let mut arities = Vec::with_capacity(items.len());
        for item in items {
            match &item.kind {
                ExpressionKind::Collection(inner) => arities.push(inner.len()),
                _ => return Ok(false),
            }
        }

        match arities.into_iter().find(|found| *found != expected) {
            Some(found) => Err(self.error(
                line,
                CodegenErrorKind::UnpackArity { expected, found },
            )),
            None => Ok(true),
        }
    }

    fn emit_unpack_arity_check(&mut self, element: Operand, expected: usize) {
        let fault = self.function.new_block("for.unpack_fault");
        let unpack = self.function.new_block("for.unpack");

        let length = runtime::length(&mut self.function, element);
        let matches = self.function.compare(
            ComparePredicate::Eq,
            length.into(),
            Operand::i64(expected as i64),
        );
        self.function.conditional_branch(matches.into(), unpack, fault);

        self.function.position_at(fault);
        runtime::fatal_exit(&mut self.function);

        self.function.position_at(unpack);
    }

    fn lower_switch(&mut self, value: &Expression, cases: &[SwitchCase], line: usize) -> Result<()> {
        if !value.ty.is_integer() {
            return Err(self.error(
                line,
                CodegenErrorKind::TypeMismatch {
                    expected: Type::INT,
                    found: value.ty.clone(),
                },
            ));
        }

        let scrutinee = self.lower_expression(value)?;
        let scrutinee = self.coerce(scrutinee, &value.ty, &Type::INT, line)?;

        let end = self.function.new_block("switch.end");
        let mut blocks = Vec::with_capacity(cases.len());
        let mut targets = Vec::new();
        let mut default = end;

        for case in cases {
            match &case.value {
                CaseValue::Expression(expression) => {
                    let constant = self.case_constant(expression, case.line)?;
                    let block = self.function.new_block("switch.case");
                    targets.push((constant, block));
                    blocks.push(block);
                }
                CaseValue::Default => {
                    let block = self.function.new_block("switch.default");
                    default = block;
                    blocks.push(block);
                }
            }
        }

        self.function.switch(scrutinee, default, targets);

        // Without a break a case falls through into the one after it
        self.function.push_switch(end);
        for (i, case) in cases.iter().enumerate() {
            self.function.position_at(blocks[i]);
            self.lower_block(&case.block)?;
            self.function.branch(blocks.get(i + 1).copied().unwrap_or(end));
        }
        self.function.pop_switch();

        self.function.position_at(end);
        Ok(())
    }

    fn case_constant(&self, expression: &Expression, line: usize) -> Result<i64> {
        match &expression.kind {
            ExpressionKind::Literal(Literal::Integer(n)) => Ok(*n),
            ExpressionKind::Unary {
                operator: UnaryOperatorKind::Negate,
                operand,
            } => match operand.kind {
                ExpressionKind::Literal(Literal::Integer(n)) => Ok(n.wrapping_neg()),
                _ => Err(self.error(line, CodegenErrorKind::NonConstantCase)),
            },
            _ => Err(self.error(line, CodegenErrorKind::NonConstantCase)),
        }
    }

    /// Emits a named or anonymous function and returns its signature. A named
    /// function is bound in the enclosing scope before its body is lowered so
    /// the body may call it recursively.
    pub(super) fn lower_function_declaration(
        &mut self,
        declaration: &FunctionDeclaration,
    ) -> Result<Rc<FunctionSignature>> {
        let line = declaration.line;
        let name = match declaration.name {
            Some(name) => name.value().to_owned(),
            None => {
                let name = format!("anon{}", self.anonymous_functions);
                self.anonymous_functions += 1;
                name
            }
        };

        let mut parameter_types = declaration
            .parameters
            .iter()
            .map(|p| self.lir_type(&p.ty, line))
            .collect::<Result<Vec<_>>>()?;
        if declaration.varargs.is_some() {
            parameter_types.push(lir::Type::Pointer);
        }
        let return_type = self.return_lir_type(&declaration.return_type, line)?;

        let symbol = self.claim_symbol(&name);
        let signature = Rc::new(FunctionSignature::new(symbol, declaration));
        trace!("lowering function {name} as {symbol}");

        let builder = FunctionBuilder::new(symbol, &parameter_types, return_type);
        let enclosing = mem::replace(&mut self.function, builder);
        let enclosing_return = mem::replace(&mut self.return_type, declaration.return_type.clone());
        self.function_depth += 1;
        self.scopes.push_scope();

        if let Some(name) = declaration.name {
            self.scopes
                .define(name, Binding::Function(signature.clone()), 1);
        }

        let result = self.lower_function_body(declaration);

        self.scopes.pop_scope();
        self.function_depth -= 1;
        self.return_type = enclosing_return;
        let function = mem::replace(&mut self.function, enclosing);

        result?;
        self.finished.push(function.finish());

        Ok(signature)
    }

    fn lower_function_body(&mut self, declaration: &FunctionDeclaration) -> Result<()> {
        let arguments = self.function.arguments().to_vec();

        let parameters = declaration
            .parameters
            .iter()
            .map(|p| (p.name, p.ty.clone()))
            .chain(
                declaration
                    .varargs
                    .iter()
                    .map(|(name, element)| (*name, Type::array(element.clone()))),
            );

        for ((name, ty), argument) in parameters.zip(arguments) {
            let lir_ty = self.lir_type(&ty, declaration.line)?;
            let slot = self.function.alloc_stack(lir_ty);
            self.function.store(slot.into(), argument.into());
            self.define_variable(name, slot, ty);
        }

        self.lower_block(&declaration.body)
    }

    fn lower_struct_declaration(&mut self, declaration: &StructDeclaration, line: usize) -> Result<()> {
        let mut fields = Vec::with_capacity(declaration.fields.len());
        let mut field_types = Vec::with_capacity(declaration.fields.len());

        for field in &declaration.fields {
            field_types.push(self.lir_type(&field.ty, line)?);
            fields.push((field.name, field.ty.clone()));
        }

        let definition = StructDefinition {
            name: declaration.name,
            field_indices: fields
                .iter()
                .enumerate()
                .map(|(i, (name, _))| (*name, i))
                .collect(),
            fields,
            lir: lir::Struct(field_types),
        };

        self.scopes.define(
            declaration.name,
            Binding::StructType(Rc::new(definition)),
            0,
        );
        Ok(())
    }

    /// Every printed value is followed by a newline
    fn lower_print(&mut self, value: Option<&Expression>, line: usize) -> Result<()> {
        if let Some(value) = value {
            let lowered = self.lower_expression(value)?;

            match &value.ty {
                Type::Str => {
                    self.function.call(runtime::PRINT_STR, vec![lowered], None);
                }
                ty if ty.is_integer() => {
                    let number = self.coerce(lowered, ty, &Type::INT, line)?;
                    let text = runtime::new_array(&mut self.function);
                    self.function
                        .call(runtime::INT_TO_STR, vec![text.into(), number], None);
                    self.function.call(runtime::PRINT_STR, vec![text.into()], None);
                }
                ty if ty.is_bool() => {
                    let text = runtime::new_array(&mut self.function);
                    self.function
                        .call(runtime::BOOL_TO_STR, vec![text.into(), lowered], None);
                    self.function.call(runtime::PRINT_STR, vec![text.into()], None);
                }
                ty if ty.is_floating() => {
                    let number = self.coerce(lowered, ty, &Type::DEC, line)?;
                    let format = self.static_string("%g");
                    self.function.call(
                        runtime::PRINTF,
                        vec![Immediate::StaticLabel(format).into(), number],
                        Some(lir::Type::I32),
                    );
                }
                ty => {
                    return Err(self.error(
                        line,
                        CodegenErrorKind::UnsupportedPrintOperand(ty.clone()),
                    ));
                }
            }
        }

        self.function
            .call(runtime::PUTCHAR, vec![Operand::i64(10)], Some(lir::Type::I64));
        Ok(())
    }
}
