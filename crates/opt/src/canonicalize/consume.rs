//! Bookkeeping for claimed final consumes.
use indexmap::IndexSet;
use rustc_hash::FxHashMap;

use ossa_ir::{Block, Insn};

/// The set of claimed final consumes: per block, the instruction after
/// which the extended lifetime ends. A claim is single-shot; the rewrite
/// phase claims each recorded consume exactly once, and anything left
/// unclaimed at the end is a bug.
///
/// Also tracks `debug_value` instructions that ended up after the final
/// consume of their block; debug-prune mode deletes those.
#[derive(Default)]
pub struct ConsumeInfo {
    final_block_consumes: FxHashMap<Block, Insn>,
    debug_after_consume: IndexSet<Insn>,
}

impl ConsumeInfo {
    pub fn record_final_consume(&mut self, block: Block, insn: Insn) {
        let prev = self.final_block_consumes.insert(block, insn);
        debug_assert!(
            prev.is_none() || prev == Some(insn),
            "one final consume per block"
        );
    }

    /// Returns `true` iff `insn` is the recorded final consume of `block`
    /// and has not been claimed yet.
    pub fn claim_consume(&mut self, block: Block, insn: Insn) -> bool {
        if self.final_block_consumes.get(&block) == Some(&insn) {
            self.final_block_consumes.remove(&block);
            true
        } else {
            false
        }
    }

    pub fn has_unclaimed_consumes(&self) -> bool {
        !self.final_block_consumes.is_empty()
    }

    pub fn record_debug_after_consume(&mut self, dvi: Insn) {
        self.debug_after_consume.insert(dvi);
    }

    pub fn pop_debug_after_consume(&mut self, dvi: Insn) {
        self.debug_after_consume.shift_remove(&dvi);
    }

    pub fn debug_insns_after_consume(&self) -> impl Iterator<Item = &Insn> {
        self.debug_after_consume.iter()
    }

    pub fn clear(&mut self) {
        self.final_block_consumes.clear();
        self.debug_after_consume.clear();
    }
}
