//! Step 1b: extend pruned liveness over overlapping access scopes.
//!
//! A destroy must not be sunk into an exclusive-access scope that did not
//! originally contain the destruction; destructors may take conflicting
//! accesses. Any scope whose `end_access` partially overlaps the pruned
//! boundary therefore pushes the boundary out past it.
//!
//! Extension iterates: recording a new liveness use can expose another
//! overlapping scope, because unrelated accesses need not follow a strict
//! stack discipline.

use indexmap::IndexSet;

use ossa_ir::{Block, Function, Insn, InsnData};

use super::{BlockLiveness, CanonicalizeOssaLifetime, InterestingUser};

impl CanonicalizeOssaLifetime {
    /// Whether `insn` is an `end_access` whose scope overlaps the end of
    /// the pruned live range.
    ///
    /// Not overlapping (ignored):
    ///
    /// ```text
    /// %def
    /// use %def         // pruned liveness ends here
    /// begin_access
    /// end_access
    /// ```
    ///
    /// Overlapping (must extend pruned liveness):
    ///
    /// ```text
    /// %def
    /// begin_access
    /// use %def         // pruned liveness ends here
    /// end_access
    /// ```
    fn ends_access_overlapping_pruned_boundary(&self, func: &Function, insn: Insn) -> bool {
        let begin = match func.dfg.insn(insn) {
            InsnData::EndUnpairedAccess { .. } => return true,
            InsnData::EndAccess { args } => func.dfg.value_insn(args[0]),
            _ => return false,
        };
        let Some(begin) = begin else {
            // No statically known begin; treat like an unpaired end.
            return true;
        };

        let begin_block = func.layout.insn_block(begin);
        match self.liveness.block_liveness(begin_block) {
            // The begin is inside the lifetime and the end outside it.
            BlockLiveness::LiveOut => true,
            // Overlap iff an interesting user appears after the begin in
            // its block.
            BlockLiveness::LiveWithin => {
                let mut insn_iter = func.layout.next_insn_of(begin);
                while let Some(next) = insn_iter {
                    if self.liveness.interesting_user(next) != InterestingUser::NonUser {
                        return true;
                    }
                    insn_iter = func.layout.next_insn_of(next);
                }
                false
            }
            // The begin is outside the canonical live range. Its scope
            // overlaps only if some path from the begin reaches the def
            // without passing the end, which requires the begin's block to
            // properly dominate the def's block.
            BlockLiveness::Dead => self
                .domtree
                .strictly_dominates(begin_block, self.current_def_block(func)),
        }
    }

    /// Find all overlapping access scopes and extend pruned liveness to
    /// cover them.
    ///
    /// Only dead blocks backward-reachable from an original consume are
    /// searched, to minimize unnecessary lifetime extension.
    pub(super) fn extend_liveness_through_overlapping_access(&mut self, func: &Function) {
        let mut changed = true;
        while changed {
            changed = false;

            // The blocks in which liveness may have to extend over an
            // access scope: every consuming block, plus the transitive
            // predecessors of the dead ones. Populated up front so that
            // membership can be tested below.
            let mut blocks_to_visit: IndexSet<Block> = self.consuming_blocks.iter().copied().collect();
            let mut idx = 0;
            while idx < blocks_to_visit.len() {
                let block = blocks_to_visit[idx];
                idx += 1;
                if self.liveness.block_liveness(block) != BlockLiveness::Dead {
                    continue;
                }
                for &pred in self.cfg.preds_of(block) {
                    blocks_to_visit.insert(pred);
                }
            }

            'blocks: for &block in &blocks_to_visit {
                let block_liveness = self.liveness.block_liveness(block);
                // Blocks inside pruned liveness can't end it.
                if block_liveness == BlockLiveness::LiveOut {
                    continue;
                }
                if block_liveness == BlockLiveness::Dead
                    && !self.access_blocks.contains_non_local_end_access(block)
                {
                    continue;
                }
                let block_has_use = block_liveness == BlockLiveness::LiveWithin;

                // Skip past the last original destroy in a consuming
                // block, so that liveness is not extended over an
                // end_access that came after the original end of life.
                let mut find_last_consume = self.consuming_blocks.contains(&block)
                    && !self.cfg.succs_of(block).any(|&succ| {
                        blocks_to_visit.contains(&succ)
                            && self.liveness.block_liveness(succ) == BlockLiveness::Dead
                    });

                let mut insn_iter = func.layout.last_insn_of(block);
                while let Some(insn) = insn_iter {
                    if find_last_consume {
                        find_last_consume = !self.destroys.contains(&insn);
                        insn_iter = func.layout.prev_insn_of(insn);
                        continue;
                    }
                    // Stop at the latest use; an earlier end_access does
                    // not overlap.
                    if block_has_use
                        && self.liveness.interesting_user(insn) != InterestingUser::NonUser
                    {
                        break;
                    }
                    if self.ends_access_overlapping_pruned_boundary(func, insn) {
                        self.liveness.update_for_use(func, &self.cfg, insn, false);
                        changed = true;
                        break;
                    }
                    insn_iter = func.layout.prev_insn_of(insn);
                }
                // Liveness changed; restart the CFG traversal.
                if changed {
                    break 'blocks;
                }
            }
        }
    }
}
