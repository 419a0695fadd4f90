//! Step 2: find the final destroy points of the current def based on the
//! pruned liveness computed in step 1.
//!
//! Every `LiveWithin` block gets exactly one final consume; every CFG edge
//! leaving liveness gets a destroy at the successor's entry. Pre-existing
//! destroys are reused where only ignored instructions intervene, to avoid
//! churning passes that use instruction identity as a stability hint.

use smallvec::SmallVec;
use tracing::trace;

use ossa_ir::{
    func_cursor::{CursorLocation, FuncCursor, InsnInserter},
    Block, Function, Insn, InsnData, Value, ValueId,
};

use super::{BlockLiveness, CanonicalizeOssaLifetime, InterestingUser};

/// Look past destroys and incidental uses to find a destroy of `def` at
/// the head of `edge_block`.
fn find_destroy_on_cfg_edge(func: &Function, edge_block: Block, def: ValueId) -> Option<Insn> {
    for insn in func.layout.iter_insn(edge_block) {
        let data = func.dfg.insn(insn);
        if data.is_incidental_use() {
            continue;
        }
        if let InsnData::Destroy { args } = data {
            if args[0] == def {
                return Some(insn);
            }
            continue;
        }
        break;
    }
    None
}

impl CanonicalizeOssaLifetime {
    /// The liveness boundary is the CFG edge `pred_block` -> `succ_block`:
    /// the def is live out of at least one other successor of
    /// `pred_block`. Claim a destroy at the beginning of `succ_block`,
    /// inserting one if the edge doesn't already hold one.
    ///
    /// Destroys that other canonicalizations already placed on this edge
    /// are reused rather than recreated, which matters when this runs
    /// inside an iterative worklist.
    fn find_or_insert_destroy_on_cfg_edge(
        &mut self,
        func: &mut Function,
        pred_block: Block,
        succ_block: Block,
    ) {
        debug_assert_eq!(
            self.cfg.pred_num_of(succ_block),
            1,
            "value is live-out on another predecessor successor: critical edge?"
        );
        debug_assert!(self.cfg.preds_of(succ_block).next() == Some(&pred_block));

        let destroy = match find_destroy_on_cfg_edge(func, succ_block, self.current_def) {
            Some(existing) => existing,
            None => {
                let mut cursor = InsnInserter::at_location(CursorLocation::BlockTop(succ_block));
                let destroy =
                    cursor.insert_insn_data(func, InsnData::destroy(self.current_def));
                self.created_new_insn(destroy);
                self.stats.destroys_generated += 1;
                trace!("destroy on edge {pred_block} -> {succ_block}");
                destroy
            }
        };
        self.consumes.record_final_consume(succ_block, destroy);
    }

    /// The liveness boundary is within a basic block, immediately after
    /// the position described by `loc`. Claim `existing_destroy` if it is
    /// separated from the boundary only by instructions already skipped,
    /// otherwise insert a fresh destroy.
    fn insert_destroy_at(
        &mut self,
        func: &mut Function,
        loc: CursorLocation,
        existing_destroy: Option<Insn>,
    ) {
        if let Some(existing) = existing_destroy {
            // Debug values between the boundary and the reused destroy
            // stay where they are.
            let mut insn_iter = match loc {
                CursorLocation::At(prev) => func.layout.next_insn_of(prev),
                CursorLocation::BlockTop(block) => func.layout.first_insn_of(block),
                _ => None,
            };
            while let Some(insn) = insn_iter {
                if insn == existing {
                    break;
                }
                if matches!(func.dfg.insn(insn), InsnData::DebugValue { .. }) {
                    self.consumes.pop_debug_after_consume(insn);
                }
                insn_iter = func.layout.next_insn_of(insn);
            }
            let block = func.layout.insn_block(existing);
            self.consumes.record_final_consume(block, existing);
            return;
        }

        let mut cursor = InsnInserter::at_location(loc);
        let destroy = cursor.insert_insn_data(func, InsnData::destroy(self.current_def));
        self.created_new_insn(destroy);
        self.stats.destroys_generated += 1;
        trace!("destroy at last use in {}", func.layout.insn_block(destroy));
        let block = func.layout.insn_block(destroy);
        self.consumes.record_final_consume(block, destroy);
    }

    /// The pruned liveness boundary is within `block`. Find the block's
    /// last interesting user scanning up from the terminator. A consuming
    /// last user becomes the final consume; otherwise a destroy is placed
    /// right after the last user (or after the def, for a dead range).
    fn find_or_insert_destroy_in_block(&mut self, func: &mut Function, block: Block) {
        let def_insn = func.dfg.value_insn(self.current_def);
        let mut existing_destroy: Option<Insn> = None;
        let mut insn = func.layout.last_insn_of(block).unwrap();
        loop {
            if self.prune_debug_mode && matches!(func.dfg.insn(insn), InsnData::DebugValue { .. })
            {
                if self.debug_values.shift_remove(&insn) {
                    self.consumes.record_debug_after_consume(insn);
                }
            }
            match self.liveness.interesting_user(insn) {
                InterestingUser::NonUser => {}
                InterestingUser::NonLifetimeEndingUse => {
                    // Insert a destroy after this non-consuming use.
                    if func.dfg.is_terminator(insn) {
                        let succs: SmallVec<[Block; 4]> =
                            self.cfg.succs_of(block).copied().collect();
                        for succ in succs {
                            self.find_or_insert_destroy_on_cfg_edge(func, block, succ);
                        }
                    } else {
                        self.insert_destroy_at(func, CursorLocation::At(insn), existing_destroy);
                    }
                    return;
                }
                InterestingUser::LifetimeEndingUse => {
                    // This use becomes the final consume.
                    self.consumes.record_final_consume(block, insn);
                    return;
                }
            }
            // Not a potential last user. Keep scanning, remembering the
            // latest pre-existing destroy of the def that is separated
            // from the boundary only by ignored instructions.
            if !Self::ignored_by_destroy_hoisting(func.dfg.insn(insn)) {
                existing_destroy = None;
            } else if existing_destroy.is_none() {
                if let InsnData::Destroy { args } = func.dfg.insn(insn) {
                    if func.dfg.canonical_copied_def(args[0]) == self.current_def {
                        existing_destroy = Some(insn);
                    }
                }
            }

            let Some(prev) = func.layout.prev_insn_of(insn) else {
                // Reached the block head: the def must be an argument of
                // this block, and the whole range is dead.
                debug_assert!(self.def_is_argument_of(func, block));
                self.insert_destroy_at(func, CursorLocation::BlockTop(block), existing_destroy);
                return;
            };
            if Some(prev) == def_insn {
                // The def itself is reached: a dead live range. Insert a
                // destroy immediately after the def.
                self.insert_destroy_at(func, CursorLocation::At(prev), existing_destroy);
                return;
            }
            insn = prev;
        }
    }

    fn def_is_argument_of(&self, func: &Function, block: Block) -> bool {
        match *func.dfg.value(self.current_def) {
            Value::Param { block: def_block, .. } => def_block == block,
            Value::Arg { .. } => func.layout.entry_block() == Some(block),
            Value::Inst { .. } => false,
        }
    }

    /// Populate the consume info with the final destroy points once copies
    /// are eliminated, walking backward from every original consuming
    /// block to the pruned liveness boundary.
    pub(super) fn find_or_insert_destroys(&mut self, func: &mut Function) {
        for idx in 0..self.consuming_blocks.len() {
            let block = self.consuming_blocks[idx];
            self.block_worklist.insert(block);
        }
        while let Some(block) = self.block_worklist.pop() {
            match self.liveness.block_liveness(block) {
                // A consuming block can end up LiveOut once liveness is
                // known; it is irrelevant for the boundary.
                BlockLiveness::LiveOut => {}
                BlockLiveness::LiveWithin => {
                    self.find_or_insert_destroy_in_block(func, block);
                }
                BlockLiveness::Dead => {
                    // Keep searching upward for the boundary.
                    let preds: SmallVec<[Block; 4]> =
                        self.cfg.preds_of(block).copied().collect();
                    for pred in preds {
                        if self.liveness.block_liveness(pred) == BlockLiveness::LiveOut {
                            self.find_or_insert_destroy_on_cfg_edge(func, pred, block);
                        } else {
                            self.block_worklist.insert(pred);
                        }
                    }
                }
            }
        }
    }
}
