//! This module contains the OSSA IR data flow graph.
use std::collections::BTreeSet;

use cranelift_entity::{packed_option::PackedOption, PrimaryMap, SecondaryMap};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::{
    insn::{Insn, InsnData},
    Ownership, Type, Value, ValueId,
};

/// An opaque reference to [`BlockData`].
#[derive(Clone, PartialEq, Eq, Copy, Hash, PartialOrd, Ord)]
pub struct Block(pub u32);
cranelift_entity::entity_impl!(Block, "block");

/// A block data definition.
///
/// A block holds its parameter values; ordering of blocks and
/// instructions is managed by [`crate::Layout`].
#[derive(Debug, Clone, Default)]
pub struct BlockData {
    params: SmallVec<[ValueId; 4]>,
}

pub struct DataFlowGraph {
    #[doc(hidden)]
    pub blocks: PrimaryMap<Block, BlockData>,
    #[doc(hidden)]
    pub values: PrimaryMap<ValueId, Value>,
    insns: PrimaryMap<Insn, InsnData>,
    insn_results: SecondaryMap<Insn, PackedOption<ValueId>>,
    users: SecondaryMap<ValueId, BTreeSet<Insn>>,
    lexical: FxHashSet<ValueId>,
}

impl Default for DataFlowGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DataFlowGraph {
    pub fn new() -> Self {
        Self {
            blocks: PrimaryMap::default(),
            values: PrimaryMap::default(),
            insns: PrimaryMap::default(),
            insn_results: SecondaryMap::default(),
            users: SecondaryMap::default(),
            lexical: FxHashSet::default(),
        }
    }

    pub fn make_block(&mut self) -> Block {
        self.blocks.push(BlockData::default())
    }

    pub fn append_block_param(&mut self, block: Block, ty: Type, ownership: Ownership) -> ValueId {
        debug_assert!(ty.is_managed() || ownership == Ownership::None);

        let idx = self.blocks[block].params.len();
        let value = self.make_value(Value::Param {
            block,
            idx,
            ty,
            ownership,
        });
        self.blocks[block].params.push(value);
        value
    }

    pub fn block_params(&self, block: Block) -> &[ValueId] {
        &self.blocks[block].params
    }

    pub fn make_value(&mut self, value: Value) -> ValueId {
        self.values.push(value)
    }

    pub fn make_insn(&mut self, data: InsnData) -> Insn {
        let insn = self.insns.push(data);
        self.attach_user(insn);
        insn
    }

    pub fn insn(&self, insn: Insn) -> &InsnData {
        &self.insns[insn]
    }

    pub fn value(&self, value: ValueId) -> &Value {
        &self.values[value]
    }

    pub fn value_ty(&self, value: ValueId) -> Type {
        self.values[value].ty()
    }

    pub fn value_ownership(&self, value: ValueId) -> Ownership {
        self.values[value].ownership()
    }

    /// Returns the instruction that defines `value`, if any.
    pub fn value_insn(&self, value: ValueId) -> Option<Insn> {
        match self.values[value] {
            Value::Inst { insn, .. } => Some(insn),
            _ => None,
        }
    }

    pub fn attach_result(&mut self, insn: Insn, value: ValueId) {
        debug_assert!(self.insn_results[insn].is_none());
        self.insn_results[insn] = value.into();
    }

    pub fn insn_result(&self, insn: Insn) -> Option<ValueId> {
        self.insn_results[insn].expand()
    }

    /// Computes the result value data of `insn`, or `None` if the
    /// instruction produces nothing.
    pub fn make_result(&self, insn: Insn) -> Option<Value> {
        let (ty, ownership) = match &self.insns[insn] {
            InsnData::Call { ret_ty, .. } => {
                if *ret_ty == Type::Unit {
                    return None;
                }
                (*ret_ty, Self::plus_one(*ret_ty))
            }
            InsnData::Alloca { .. }
            | InsnData::FieldPtr { .. }
            | InsnData::RefToPtr { .. }
            | InsnData::BeginAccess { .. } => (Type::Ptr, Ownership::None),
            InsnData::Load { ty, .. } => (*ty, Self::plus_one(*ty)),
            InsnData::Aggregate { .. } | InsnData::UnownedToRef { .. } => {
                (Type::Ref, Ownership::Owned)
            }
            InsnData::Copy { args } => (self.value_ty(args[0]), Ownership::Owned),
            InsnData::Borrow { .. } => (Type::Ref, Ownership::Guaranteed),
            InsnData::RefToUnowned { .. } => (Type::Ref, Ownership::Unowned),
            InsnData::RefToInt { .. } => (Type::I64, Ownership::None),
            InsnData::Store { .. }
            | InsnData::Destroy { .. }
            | InsnData::DebugValue { .. }
            | InsnData::EndBorrow { .. }
            | InsnData::EndAccess { .. }
            | InsnData::EndUnpairedAccess { .. }
            | InsnData::Jump { .. }
            | InsnData::Br { .. }
            | InsnData::Return { .. } => return None,
        };

        Some(Value::Inst { insn, ty, ownership })
    }

    fn plus_one(ty: Type) -> Ownership {
        if ty.is_managed() {
            Ownership::Owned
        } else {
            Ownership::None
        }
    }

    pub fn attach_user(&mut self, insn: Insn) {
        let Self { insns, users, .. } = self;
        insns[insn].visit_values(&mut |value| {
            users[value].insert(insn);
        });
    }

    /// Drop `insn` from the user set of every value it references.
    pub fn untrack_insn(&mut self, insn: Insn) {
        let Self { insns, users, .. } = self;
        insns[insn].visit_values(&mut |value| {
            users[value].remove(&insn);
        });
    }

    /// Returns all instructions that use `value`.
    pub fn users(&self, value: ValueId) -> impl Iterator<Item = &Insn> {
        self.users[value].iter()
    }

    /// Returns the number of instructions that use `value`.
    pub fn users_num(&self, value: ValueId) -> usize {
        self.users[value].len()
    }

    /// Rewrite the operand at canonical position `pos` of `insn` to `new`,
    /// keeping user sets consistent.
    pub fn set_insn_arg(&mut self, insn: Insn, pos: usize, new: ValueId) {
        let mut old = None;
        {
            let data = &mut self.insns[insn];
            let mut idx = 0;
            data.visit_values_mut(&mut |v| {
                if idx == pos {
                    old = Some(*v);
                    *v = new;
                }
                idx += 1;
            });
        }
        let old = old.expect("operand position out of range");
        if old == new {
            return;
        }

        if !self.insns[insn].uses_value(old) {
            self.users[old].remove(&insn);
        }
        self.users[new].insert(insn);
    }

    /// Rewrite every use of `value` to `alias`.
    pub fn change_to_alias(&mut self, value: ValueId, alias: ValueId) {
        let mut users = std::mem::take(&mut self.users[value]);
        for &insn in &users {
            self.insns[insn].visit_values_mut(&mut |v| {
                if *v == value {
                    *v = alias;
                }
            });
        }
        self.users[alias].append(&mut users);
    }

    /// Follow `copy` chains back to the canonical producer of `value`.
    pub fn canonical_copied_def(&self, value: ValueId) -> ValueId {
        let mut current = value;
        while let Some(insn) = self.value_insn(current) {
            match self.insns[insn] {
                InsnData::Copy { args } => current = args[0],
                _ => break,
            }
        }
        current
    }

    pub fn branch_dests(&self, insn: Insn) -> &[crate::insn::BranchDest] {
        self.insns[insn].branch_dests()
    }

    pub fn is_terminator(&self, insn: Insn) -> bool {
        self.insns[insn].is_terminator()
    }

    /// Mark `value` as lexical; lexical defs keep their source-visible
    /// lifetime.
    pub fn set_lexical(&mut self, value: ValueId) {
        self.lexical.insert(value);
    }

    pub fn is_lexical(&self, value: ValueId) -> bool {
        self.lexical.contains(&value)
    }
}
