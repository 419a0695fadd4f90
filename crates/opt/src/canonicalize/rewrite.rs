//! Step 3: rewrite copies and destroys.
//!
//! Revisits the def-use chain of the current def. Unneeded original
//! copies and destroys are deleted; uses that still require ownership of
//! their operand get a fresh copy. Use lists are snapshotted before
//! walking, since inserting a copy mutates the use chain.

use indexmap::IndexSet;
use tracing::trace;

use ossa_ir::{Function, Insn, InsnData, Ownership, Value, ValueId};

use super::{BlockLiveness, CanonicalizeOssaLifetime};

/// Snapshot of the uses of `value`: each user with the canonical operand
/// positions at which it uses the value.
fn operand_uses_of(func: &Function, value: ValueId) -> Vec<(Insn, usize)> {
    let mut uses = Vec::new();
    for &user in func.dfg.users(value) {
        for pos in func.dfg.insn(user).operand_positions_of(value) {
            uses.push((user, pos));
        }
    }
    uses
}

impl CanonicalizeOssaLifetime {
    /// The lifetime extends beyond this consuming use. Copy the value:
    /// materialize a copy right before `user` and retarget the operand.
    /// The caller's use snapshot stays valid.
    fn copy_live_use(&mut self, func: &mut Function, user: Insn, pos: usize, used: ValueId) {
        let copy = func.dfg.make_insn(InsnData::copy(used));
        func.layout.insert_insn_before(copy, user);
        let result = Value::Inst {
            insn: copy,
            ty: func.dfg.value_ty(used),
            ownership: Ownership::Owned,
        };
        let result = func.dfg.make_value(result);
        func.dfg.attach_result(copy, result);
        func.dfg.set_insn_arg(user, pos, result);

        self.created_new_insn(copy);
        self.stats.copies_generated += 1;
        trace!("copying at last use {used}");
    }

    /// Returns `true` if the use can keep the current definition, `false`
    /// if it requires a copy.
    fn visit_use(
        &mut self,
        func: &Function,
        insts_to_delete: &mut IndexSet<Insn>,
        user: Insn,
        pos: usize,
        used: ValueId,
    ) -> bool {
        let data = func.dfg.insn(user);

        // Recurse through copies.
        if matches!(data, InsnData::Copy { .. }) {
            if let Some(copy) = func.dfg.insn_result(user) {
                self.def_use_worklist.insert(copy);
            }
            return true;
        }
        if matches!(data, InsnData::Destroy { .. }) {
            // Keep the destroy iff it was claimed as a final consume.
            let block = func.layout.insn_block(user);
            if !self.consumes.claim_consume(block, user) {
                insts_to_delete.insert(user);
                self.stats.destroys_eliminated += 1;
                trace!("removing destroy of {used}");
            }
            return true;
        }

        // Non-consuming uses keep the current definition and cannot be
        // final consumes. End-borrow and reborrow uses never reach here:
        // the rewrite walks only owned values.
        let ownership = func.dfg.value_ownership(used);
        if !data.operand_ownership(pos, ownership).is_lifetime_ending() {
            return true;
        }

        let block = func.layout.insn_block(user);
        if !self.consumes.claim_consume(block, user) {
            self.maybe_notify_move_only_copy(user);
            return false;
        }

        // A final consuming use that isn't a destroy.
        self.maybe_notify_final_consuming_use(user);
        true
    }

    /// Rewrite the def's copies and destroys to realize the liveness
    /// determined in steps 1 and 2.
    pub(super) fn rewrite_copies(&mut self, func: &mut Function) {
        debug_assert_eq!(
            func.dfg.value_ownership(self.current_def),
            Ownership::Owned
        );

        let mut insts_to_delete: IndexSet<Insn> = IndexSet::new();
        self.def_use_worklist.clear();

        for (user, pos) in operand_uses_of(func, self.current_def) {
            if !self.visit_use(func, &mut insts_to_delete, user, pos, self.current_def) {
                self.copy_live_use(func, user, pos, self.current_def);
            }
        }
        while let Some(src_copy_value) = self.def_use_worklist.pop() {
            let src_copy = func
                .dfg
                .value_insn(src_copy_value)
                .expect("worklist holds copy results");
            let copy_operand = match func.dfg.insn(src_copy) {
                InsnData::Copy { args } => args[0],
                _ => unreachable!("worklist holds copy results"),
            };

            // Recurse through the copy's uses while replacing them. If
            // exactly one use in the copy's own block needs ownership, the
            // copy itself is reused for it instead of a fresh one.
            let mut reused_copy_use: Option<(Insn, usize)> = None;
            for (user, pos) in operand_uses_of(func, src_copy_value) {
                if !self.visit_use(func, &mut insts_to_delete, user, pos, src_copy_value) {
                    if reused_copy_use.is_none()
                        && func.layout.insn_block(src_copy) == func.layout.insn_block(user)
                    {
                        reused_copy_use = Some((user, pos));
                    } else {
                        self.copy_live_use(func, user, pos, src_copy_value);
                    }
                }
            }

            let use_count: usize = func
                .dfg
                .users(src_copy_value)
                .map(|&user| func.dfg.insn(user).operand_positions_of(src_copy_value).len())
                .sum();
            if !(reused_copy_use.is_some() && use_count == 1) {
                func.dfg.change_to_alias(src_copy_value, copy_operand);
                if let Some((user, pos)) = reused_copy_use {
                    func.dfg.set_insn_arg(user, pos, src_copy_value);
                } else if insts_to_delete.insert(src_copy) {
                    self.stats.copies_eliminated += 1;
                    trace!("removing {src_copy_value}");
                }
            }
        }
        assert!(
            !self.consumes.has_unclaimed_consumes(),
            "every final consume must be claimed by the rewrite"
        );

        // Debug values left in dead blocks are behind the final consume.
        for idx in 0..self.debug_values.len() {
            let dvi = self.debug_values[idx];
            let block = func.layout.insn_block(dvi);
            if self.liveness.block_liveness(block) == BlockLiveness::Dead {
                self.consumes.record_debug_after_consume(dvi);
            }
        }

        // Remove dead, non-recovered debug values, then the leftover
        // copies and destroys.
        let dead_debug: Vec<Insn> = self.consumes.debug_insns_after_consume().copied().collect();
        for dvi in dead_debug {
            trace!("removing dead debug_value");
            self.force_delete(func, dvi);
        }
        for insn in insts_to_delete {
            self.force_delete(func, insn);
        }
    }
}
