use std::collections::BTreeSet;

use crate::{
    frontend::intern::InternedSymbol,
    index::IndexVec,
    middle::lir::{self, BlockId, Operand, RegisterId},
};

#[derive(Debug, Clone, Copy)]
struct LoopTargets {
    continue_target: BlockId,
    break_target: BlockId,
}

#[derive(Debug, Clone, Copy)]
struct SwitchTargets {
    end: BlockId,
    /// Number of enclosing loops when the switch was entered
    loop_depth: usize,
}

/// Builds the blocks of a single function.
///
/// Block 0 is the entry block and block 1 the exit block, the only block
/// that returns. Stack slots are collected separately and placed at the top
/// of the entry block when the function is finished.
#[derive(Debug)]
pub struct FunctionBuilder {
    symbol_name: InternedSymbol,
    registers: IndexVec<RegisterId, lir::Register>,
    arguments: Vec<RegisterId>,
    return_type: Option<lir::Type>,
    return_slot: Option<RegisterId>,
    stack_slots: Vec<lir::Instruction>,

    blocks: IndexVec<BlockId, lir::Block>,
    current: BlockId,
    exit: BlockId,

    loops: Vec<LoopTargets>,
    switches: Vec<SwitchTargets>,
}

impl FunctionBuilder {
    pub fn new(
        symbol_name: InternedSymbol,
        parameters: &[lir::Type],
        return_type: Option<lir::Type>,
    ) -> Self {
        let mut builder = Self {
            symbol_name,
            registers: IndexVec::new(),
            arguments: Vec::new(),
            return_type: return_type.clone(),
            return_slot: None,
            stack_slots: Vec::new(),
            blocks: IndexVec::new(),
            current: BlockId::ZERO,
            exit: BlockId::ZERO,
            loops: Vec::new(),
            switches: Vec::new(),
        };

        builder.current = builder.new_block("entry");
        builder.exit = builder.new_block("exit");

        for ty in parameters {
            let register = builder.create_register(ty.clone());
            builder.arguments.push(register);
        }

        if let Some(ty) = return_type {
            builder.return_slot = Some(builder.alloc_stack(ty));
        }

        builder
    }

    pub fn arguments(&self) -> &[RegisterId] {
        &self.arguments
    }

    pub fn return_slot(&self) -> Option<RegisterId> {
        self.return_slot
    }

    pub fn exit_block(&self) -> BlockId {
        self.exit
    }

    pub fn create_register(&mut self, ty: lir::Type) -> RegisterId {
        let id = self.registers.next_index();
        self.registers.push(lir::Register { id, ty })
    }

    pub fn new_block(&mut self, label: &'static str) -> BlockId {
        let id = self.blocks.next_index();
        self.blocks.push(lir::Block {
            id,
            label,
            instructions: Vec::new(),
            predecessors: BTreeSet::new(),
        })
    }

    pub fn position_at(&mut self, block: BlockId) {
        self.current = block;
    }

    pub fn is_terminated(&self) -> bool {
        self.blocks[self.current].is_terminated()
    }

    pub fn push_instruction(&mut self, instruction: lir::Instruction) {
        self.blocks[self.current].instructions.push(instruction);
    }

    fn terminate(&mut self, instruction: lir::Instruction, successors: &[BlockId]) {
        if self.is_terminated() {
            return;
        }

        for successor in successors {
            self.blocks[*successor].predecessors.insert(self.current);
        }

        self.push_instruction(instruction);
    }

    pub fn branch(&mut self, destination: BlockId) {
        self.terminate(lir::Instruction::Jump { destination }, &[destination]);
    }

    pub fn conditional_branch(&mut self, condition: Operand, positive: BlockId, negative: BlockId) {
        self.terminate(
            lir::Instruction::Branch {
                condition,
                positive,
                negative,
            },
            &[positive, negative],
        );
    }

    pub fn switch(&mut self, value: Operand, default: BlockId, cases: Vec<(i64, BlockId)>) {
        let successors = std::iter::once(default)
            .chain(cases.iter().map(|(_, b)| *b))
            .collect::<Vec<_>>();

        self.terminate(
            lir::Instruction::Switch {
                value,
                default,
                cases,
            },
            &successors,
        );
    }

    /// Reserves a slot in the entry block and returns the register holding
    /// its address
    pub fn alloc_stack(&mut self, ty: lir::Type) -> RegisterId {
        let destination = self.create_register(lir::Type::Pointer);
        self.stack_slots
            .push(lir::Instruction::AllocStack { destination, ty });
        destination
    }

    pub fn load(&mut self, source: Operand, ty: lir::Type) -> RegisterId {
        let destination = self.create_register(ty);
        self.push_instruction(lir::Instruction::LoadMem {
            destination,
            source,
        });
        destination
    }

    pub fn store(&mut self, destination: Operand, source: Operand) {
        self.push_instruction(lir::Instruction::StoreMem {
            destination,
            source,
        });
    }

    pub fn struct_element_pointer(
        &mut self,
        source: Operand,
        ty: &lir::Struct,
        index: usize,
    ) -> RegisterId {
        let destination = self.create_register(lir::Type::Pointer);
        self.push_instruction(lir::Instruction::GetStructElementPointer {
            destination,
            source,
            ty: ty.clone(),
            index,
        });
        destination
    }

    pub fn element_pointer(
        &mut self,
        source: Operand,
        element: lir::Type,
        index: Operand,
    ) -> RegisterId {
        let destination = self.create_register(lir::Type::Pointer);
        self.push_instruction(lir::Instruction::GetElementPointer {
            destination,
            source,
            element,
            index,
        });
        destination
    }

    pub fn unary(
        &mut self,
        operator: lir::UnaryOperator,
        operand: Operand,
        ty: lir::Type,
    ) -> RegisterId {
        let destination = self.create_register(ty);
        self.push_instruction(lir::Instruction::UnaryOperation {
            operator,
            destination,
            operand,
        });
        destination
    }

    pub fn binary(
        &mut self,
        operator: lir::BinaryOperator,
        lhs: Operand,
        rhs: Operand,
        ty: lir::Type,
    ) -> RegisterId {
        let destination = self.create_register(ty);
        self.push_instruction(lir::Instruction::BinaryOperation {
            operator,
            destination,
            lhs,
            rhs,
        });
        destination
    }

    pub fn compare(
        &mut self,
        predicate: lir::ComparePredicate,
        lhs: Operand,
        rhs: Operand,
    ) -> RegisterId {
        let destination = self.create_register(lir::Type::BOOL);
        self.push_instruction(lir::Instruction::Compare {
            predicate,
            destination,
            lhs,
            rhs,
        });
        destination
    }

    pub fn cast(&mut self, kind: lir::CastKind, operand: Operand, ty: lir::Type) -> RegisterId {
        let destination = self.create_register(ty);
        self.push_instruction(lir::Instruction::Cast {
            kind,
            destination,
            operand,
        });
        destination
    }

    pub fn call(
        &mut self,
        function: &str,
        arguments: Vec<Operand>,
        return_type: Option<lir::Type>,
    ) -> Option<RegisterId> {
        let destination = return_type.map(|ty| self.create_register(ty));
        self.push_instruction(lir::Instruction::FunctionCall {
            target: Operand::function(function),
            arguments,
            destination,
        });
        destination
    }

    pub fn push_loop(&mut self, continue_target: BlockId, break_target: BlockId) {
        self.loops.push(LoopTargets {
            continue_target,
            break_target,
        });
    }

    pub fn pop_loop(&mut self) {
        self.loops.pop();
    }

    pub fn push_switch(&mut self, end: BlockId) {
        self.switches.push(SwitchTargets {
            end,
            loop_depth: self.loops.len(),
        });
    }

    pub fn pop_switch(&mut self) {
        self.switches.pop();
    }

    /// A `break` directly inside a switch case ends the switch, one inside a
    /// loop nested in the case ends that loop
    pub fn current_break_target(&self) -> Option<BlockId> {
        match self.switches.last() {
            Some(switch) if switch.loop_depth == self.loops.len() => Some(switch.end),
            _ => self.loops.last().map(|l| l.break_target),
        }
    }

    pub fn current_continue_target(&self) -> Option<BlockId> {
        self.loops.last().map(|l| l.continue_target)
    }

    /// Closes the function: every open block falls through to the exit block,
    /// which loads the return slot and returns it
    pub fn finish(mut self) -> lir::FunctionDefinition {
        for block in self.blocks.indices().collect::<Vec<_>>() {
            if block != self.exit {
                self.position_at(block);
                self.branch(self.exit);
            }
        }
        self.position_at(self.exit);

        let value = match (self.return_slot, self.return_type.clone()) {
            (Some(slot), Some(ty)) => Some(Operand::Register(self.load(slot.into(), ty))),
            _ => None,
        };
        self.push_instruction(lir::Instruction::Return { value });

        let entry = &mut self.blocks[BlockId::ZERO].instructions;
        let body = std::mem::take(entry);
        entry.extend(self.stack_slots);
        entry.extend(body);

        lir::FunctionDefinition {
            symbol_name: self.symbol_name,
            registers: self.registers,
            arguments: self.arguments,
            return_type: self.return_type,
            blocks: self.blocks,
            exit: self.exit,
        }
    }
}
