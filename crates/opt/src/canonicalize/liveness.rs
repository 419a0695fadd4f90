//! Step 1: pruned liveness of the extended lifetime.
//!
//! Liveness of the def and its transitive copies is computed while
//! ignoring pre-existing destroys; those are placed fresh in step 2.

use cranelift_entity::SecondaryMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use ossa_ir::{
    Block, ControlFlowGraph, Function, Insn, InsnData, OperandOwnership, Ownership, Value, ValueId,
};

use super::CanonicalizeOssaLifetime;

/// Per-block classification of the extended lifetime. States only
/// progress `Dead` -> `LiveWithin` -> `LiveOut`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockLiveness {
    #[default]
    Dead,
    LiveWithin,
    LiveOut,
}

/// Per-instruction classification. Labels only progress `NonUser` ->
/// `NonLifetimeEndingUse` -> `LifetimeEndingUse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterestingUser {
    NonUser,
    NonLifetimeEndingUse,
    LifetimeEndingUse,
}

#[derive(Default)]
pub struct PrunedLiveness {
    block_liveness: SecondaryMap<Block, BlockLiveness>,
    users: FxHashMap<Insn, bool>,
}

impl PrunedLiveness {
    pub fn clear(&mut self) {
        self.block_liveness.clear();
        self.users.clear();
    }

    pub fn initialize_def_block(&mut self, block: Block) {
        self.block_liveness[block] = BlockLiveness::LiveWithin;
    }

    pub fn block_liveness(&self, block: Block) -> BlockLiveness {
        self.block_liveness[block]
    }

    pub fn interesting_user(&self, insn: Insn) -> InterestingUser {
        match self.users.get(&insn).copied() {
            None => InterestingUser::NonUser,
            Some(false) => InterestingUser::NonLifetimeEndingUse,
            Some(true) => InterestingUser::LifetimeEndingUse,
        }
    }

    /// Record `user` as a use of the extended lifetime and propagate block
    /// liveness backward to the def.
    pub fn update_for_use(
        &mut self,
        func: &Function,
        cfg: &ControlFlowGraph,
        user: Insn,
        lifetime_ending: bool,
    ) {
        let block = func.layout.insn_block(user);
        if self.block_liveness[block] == BlockLiveness::Dead {
            self.compute_use_block_liveness(cfg, block);
        }

        let state = self.users.entry(user).or_insert(false);
        *state |= lifetime_ending;
    }

    /// Extend liveness over the borrow scope opened by `borrow`. Returns
    /// `false` if a scope-ending use cannot be resolved (the scope is
    /// carried across a branch).
    pub fn update_for_borrowing_operand(
        &mut self,
        func: &Function,
        cfg: &ControlFlowGraph,
        borrow: Insn,
    ) -> bool {
        self.update_for_use(func, cfg, borrow, false);

        let Some(borrowed) = func.dfg.insn_result(borrow) else {
            return false;
        };
        for &user in func.dfg.users(borrowed) {
            match func.dfg.insn(user) {
                InsnData::EndBorrow { .. } => self.update_for_use(func, cfg, user, false),
                data if data.is_branch() => return false,
                _ => {}
            }
        }
        true
    }

    fn compute_use_block_liveness(&mut self, cfg: &ControlFlowGraph, start: Block) {
        self.block_liveness[start] = BlockLiveness::LiveWithin;

        // Everything on a path from the def to the use block becomes
        // LiveOut. A LiveWithin predecessor already propagated to its own
        // predecessors when its use was recorded.
        let mut worklist = vec![start];
        while let Some(block) = worklist.pop() {
            for &pred in cfg.preds_of(block) {
                match self.block_liveness[pred] {
                    BlockLiveness::Dead => {
                        self.block_liveness[pred] = BlockLiveness::LiveOut;
                        worklist.push(pred);
                    }
                    BlockLiveness::LiveWithin => {
                        self.block_liveness[pred] = BlockLiveness::LiveOut;
                    }
                    BlockLiveness::LiveOut => {}
                }
            }
        }
    }
}

/// Guaranteed parameters of `block` whose incoming value on every edge is
/// a borrow of the corresponding incoming value of `owned_param`. Their
/// lifetimes are dependent on the owned phi.
fn adjacent_reborrow_params(
    func: &Function,
    cfg: &ControlFlowGraph,
    owned_param: ValueId,
    block: Block,
) -> SmallVec<[ValueId; 2]> {
    let Value::Param { idx: owned_idx, .. } = *func.dfg.value(owned_param) else {
        unreachable!("adjacent reborrows only exist for block parameters");
    };

    let mut reborrows = SmallVec::new();
    'params: for (param_idx, &param) in func.dfg.block_params(block).iter().enumerate() {
        if param == owned_param || func.dfg.value_ownership(param) != Ownership::Guaranteed {
            continue;
        }

        let mut any_edge = false;
        for &pred in cfg.preds_of(block) {
            let Some(branch) = func.layout.last_insn_of(pred) else {
                continue 'params;
            };
            for dest in func.dfg.branch_dests(branch) {
                if dest.block != block {
                    continue;
                }
                any_edge = true;
                let (Some(&owned_in), Some(&reborrow_in)) =
                    (dest.args.get(owned_idx), dest.args.get(param_idx))
                else {
                    continue 'params;
                };
                let is_borrow_of_owned = func.dfg.value_insn(reborrow_in).is_some_and(|insn| {
                    matches!(func.dfg.insn(insn), InsnData::Borrow { args } if args[0] == owned_in)
                });
                if !is_borrow_of_owned {
                    continue 'params;
                }
            }
        }
        if any_edge {
            reborrows.push(param);
        }
    }
    reborrows
}

/// The destination parameter a branch operand is bound to.
fn branch_param_for_operand(func: &Function, data: &InsnData, pos: usize) -> Option<ValueId> {
    let mut idx = match data {
        InsnData::Br { .. } => 1,
        _ => 0,
    };
    for dest in data.branch_dests() {
        for arg_idx in 0..dest.args.len() {
            if idx == pos {
                return func.dfg.block_params(dest.block).get(arg_idx).copied();
            }
            idx += 1;
        }
    }
    None
}

impl CanonicalizeOssaLifetime {
    /// Compute pruned liveness of the current def and its copies. Returns
    /// `false` to bail out of canonicalization; no IR has been mutated at
    /// that point.
    pub(super) fn compute_canonical_liveness(&mut self, func: &Function) -> bool {
        self.def_use_worklist.insert(self.current_def);
        while let Some(value) = self.def_use_worklist.pop() {
            if let Value::Param { block, .. } = *func.dfg.value(value) {
                if func.dfg.value_ownership(value) == Ownership::Owned {
                    for reborrow in adjacent_reborrow_params(func, &self.cfg, value, block) {
                        self.def_use_worklist.insert(reborrow);
                    }
                }
            }

            let users: Vec<Insn> = func.dfg.users(value).copied().collect();
            for user in users {
                let data = func.dfg.insn(user);

                // Recurse through copies.
                if matches!(data, InsnData::Copy { .. }) {
                    if let Some(copy) = func.dfg.insn_result(user) {
                        self.def_use_worklist.insert(copy);
                    }
                    continue;
                }
                // Handle debug_value instructions separately. Only
                // observers potentially outside the current pruned
                // liveness are interesting.
                if self.prune_debug_mode && matches!(data, InsnData::DebugValue { .. }) {
                    let block = func.layout.insn_block(user);
                    if self.liveness.block_liveness(block) != BlockLiveness::LiveOut {
                        self.debug_values.insert(user);
                    }
                    continue;
                }

                let ownership = func.dfg.value_ownership(value);
                for pos in data.operand_positions_of(value) {
                    match data.operand_ownership(pos, ownership) {
                        OperandOwnership::NonUse => {}
                        OperandOwnership::TrivialUse => {
                            unreachable!("the operand cannot handle ownership")
                        }
                        OperandOwnership::ForwardingUnowned | OperandOwnership::PointerEscape => {
                            return false;
                        }
                        OperandOwnership::InstantaneousUse
                        | OperandOwnership::UnownedInstantaneousUse
                        | OperandOwnership::BitwiseEscape => {
                            self.liveness.update_for_use(func, &self.cfg, user, false);
                        }
                        OperandOwnership::ForwardingConsume => {
                            self.record_consuming_use(func, user);
                            self.liveness.update_for_use(func, &self.cfg, user, true);
                        }
                        OperandOwnership::DestroyingConsume => {
                            if matches!(data, InsnData::Destroy { .. }) {
                                // A destroy does not force pruned liveness
                                // (but a store etc. does).
                                self.destroys.insert(user);
                            } else {
                                self.liveness.update_for_use(func, &self.cfg, user, true);
                            }
                            self.record_consuming_use(func, user);
                        }
                        OperandOwnership::Borrow => {
                            if !self
                                .liveness
                                .update_for_borrowing_operand(func, &self.cfg, user)
                            {
                                return false;
                            }
                        }
                        OperandOwnership::InteriorPointer
                        | OperandOwnership::ForwardingBorrow
                        | OperandOwnership::EndBorrow => {
                            self.liveness.update_for_use(func, &self.cfg, user, false);
                        }
                        OperandOwnership::Reborrow => {
                            if !data.is_branch() {
                                // Non-phi reborrows never end the lifetime
                                // of the owned value.
                                self.liveness.update_for_use(func, &self.cfg, user, false);
                                if let Some(forwarded) = func.dfg.insn_result(user) {
                                    self.def_use_worklist.insert(forwarded);
                                }
                            } else if data.uses_value(self.current_def) {
                                // An adjacent phi consumes the value being
                                // reborrowed. This use doesn't end the
                                // lifetime, but this user does.
                                self.liveness.update_for_use(func, &self.cfg, user, true);
                            } else {
                                self.liveness.update_for_use(func, &self.cfg, user, false);
                                // The branch reborrows a guaranteed phi
                                // whose lifetime depends on the current
                                // def; uses of that phi extend liveness.
                                if let Some(reborrow) = branch_param_for_operand(func, data, pos) {
                                    self.def_use_worklist.insert(reborrow);
                                }
                            }
                        }
                    }
                }
            }
        }
        true
    }
}
