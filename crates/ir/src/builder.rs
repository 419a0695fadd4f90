//! A convenience builder for constructing functions directly in SSA form.
use crate::{
    dfg::Block,
    func_cursor::{CursorLocation, FuncCursor, InsnInserter},
    insn::{BranchDest, Insn, InsnData},
    Function, Ownership, Signature, Type, ValueId,
};

pub struct FunctionBuilder {
    pub func: Function,
    cursor: InsnInserter,
}

impl FunctionBuilder {
    pub fn new(sig: Signature) -> Self {
        Self {
            func: Function::new(sig),
            cursor: InsnInserter::at_location(CursorLocation::NoWhere),
        }
    }

    pub fn finish(self) -> Function {
        if cfg!(debug_assertions) {
            for block in self.func.layout.iter_block() {
                let terminated = self
                    .func
                    .layout
                    .last_insn_of(block)
                    .is_some_and(|insn| self.func.dfg.is_terminator(insn));
                debug_assert!(terminated, "all blocks must end in a terminator: `{block}`");
            }
        }

        self.func
    }

    pub fn append_block(&mut self) -> Block {
        let block = self.func.dfg.make_block();
        self.func.layout.append_block(block);
        block
    }

    pub fn append_block_param(&mut self, block: Block, ty: Type, ownership: Ownership) -> ValueId {
        self.func.dfg.append_block_param(block, ty, ownership)
    }

    pub fn switch_to_block(&mut self, block: Block) {
        self.cursor.set_location(CursorLocation::BlockBottom(block));
    }

    pub fn args(&self) -> &[ValueId] {
        &self.func.arg_values
    }

    pub fn set_lexical(&mut self, value: ValueId) {
        self.func.dfg.set_lexical(value);
    }

    fn insert(&mut self, data: InsnData) -> Insn {
        let insn = self.cursor.insert_insn_data(&mut self.func, data);
        self.cursor.set_location(CursorLocation::At(insn));
        insn
    }

    fn insert_with_result(&mut self, data: InsnData) -> ValueId {
        let insn = self.insert(data);
        let value = self
            .func
            .dfg
            .make_result(insn)
            .expect("instruction has no result");
        let value = self.func.dfg.make_value(value);
        self.func.dfg.attach_result(insn, value);
        value
    }

    /// Insert a call that produces a result; `ret_ty` must not be `Unit`.
    pub fn call(&mut self, name: &str, args: &[ValueId], ret_ty: Type) -> ValueId {
        debug_assert_ne!(ret_ty, Type::Unit);
        self.insert_with_result(InsnData::call(name, args, ret_ty))
    }

    /// Insert a call that produces no result.
    pub fn call_no_result(&mut self, name: &str, args: &[ValueId]) -> Insn {
        self.insert(InsnData::call(name, args, Type::Unit))
    }

    pub fn alloca(&mut self, ty: Type) -> ValueId {
        self.insert_with_result(InsnData::Alloca { ty })
    }

    pub fn load(&mut self, addr: ValueId, ty: Type) -> ValueId {
        self.insert_with_result(InsnData::Load { args: [addr], ty })
    }

    pub fn store(&mut self, value: ValueId, addr: ValueId) -> Insn {
        self.insert(InsnData::Store { args: [value, addr] })
    }

    pub fn aggregate(&mut self, args: &[ValueId]) -> ValueId {
        self.insert_with_result(InsnData::Aggregate { args: args.into() })
    }

    pub fn copy(&mut self, value: ValueId) -> ValueId {
        self.insert_with_result(InsnData::copy(value))
    }

    pub fn destroy(&mut self, value: ValueId) -> Insn {
        self.insert(InsnData::destroy(value))
    }

    pub fn debug_value(&mut self, value: ValueId) -> Insn {
        self.insert(InsnData::DebugValue { args: [value] })
    }

    pub fn borrow(&mut self, value: ValueId) -> ValueId {
        self.insert_with_result(InsnData::Borrow { args: [value] })
    }

    pub fn end_borrow(&mut self, borrow: ValueId) -> Insn {
        self.insert(InsnData::EndBorrow { args: [borrow] })
    }

    pub fn field_ptr(&mut self, value: ValueId, idx: usize) -> ValueId {
        self.insert_with_result(InsnData::FieldPtr { args: [value], idx })
    }

    pub fn ref_to_ptr(&mut self, value: ValueId) -> ValueId {
        self.insert_with_result(InsnData::RefToPtr { args: [value] })
    }

    pub fn ref_to_unowned(&mut self, value: ValueId) -> ValueId {
        self.insert_with_result(InsnData::RefToUnowned { args: [value] })
    }

    pub fn unowned_to_ref(&mut self, value: ValueId) -> ValueId {
        self.insert_with_result(InsnData::UnownedToRef { args: [value] })
    }

    pub fn ref_to_int(&mut self, value: ValueId) -> ValueId {
        self.insert_with_result(InsnData::RefToInt { args: [value] })
    }

    pub fn begin_access(&mut self, addr: ValueId) -> ValueId {
        self.insert_with_result(InsnData::BeginAccess { args: [addr] })
    }

    pub fn end_access(&mut self, token: ValueId) -> Insn {
        self.insert(InsnData::EndAccess { args: [token] })
    }

    pub fn end_unpaired_access(&mut self, addr: ValueId) -> Insn {
        self.insert(InsnData::EndUnpairedAccess { args: [addr] })
    }

    pub fn jump(&mut self, dest: Block, args: &[ValueId]) -> Insn {
        self.insert(InsnData::jump(dest, args))
    }

    pub fn br(&mut self, cond: ValueId, then_dest: Block, else_dest: Block) -> Insn {
        self.br_with_args(cond, (then_dest, &[]), (else_dest, &[]))
    }

    pub fn br_with_args(
        &mut self,
        cond: ValueId,
        then_dest: (Block, &[ValueId]),
        else_dest: (Block, &[ValueId]),
    ) -> Insn {
        self.insert(InsnData::br(
            cond,
            BranchDest::new(then_dest.0, then_dest.1),
            BranchDest::new(else_dest.0, else_dest.1),
        ))
    }

    pub fn ret(&mut self, value: Option<ValueId>) -> Insn {
        self.insert(InsnData::Return { args: value })
    }
}
