//! Canonicalize the extended lifetime of an owned value.
//!
//! [`CanonicalizeOssaLifetime::canonicalize_value_lifetime`] rewrites the
//! lifetime of a single owned `def` in three steps:
//!
//! 1. Compute pruned liveness of the def and its copies, ignoring
//!    original destroys, then extend it over any partially overlapping
//!    exclusive-access scope.
//! 2. Find the def's final destroy points based on pruned liveness and
//!    insert (or reuse) `destroy` instructions there.
//! 3. Rewrite the def's original copies and destroys: delete the ones no
//!    longer needed and insert fresh copies where a use still requires
//!    independent ownership.
//!
//! Canonicalization bails out if any transitive use of the def lets the
//! value escape through a pointer; the function is left untouched.

mod consume;
mod destroys;
mod extend;
mod liveness;
mod rewrite;

pub use consume::ConsumeInfo;
pub use liveness::{BlockLiveness, InterestingUser, PrunedLiveness};

use std::hash::Hash;

use indexmap::IndexSet;
use rustc_hash::FxHashSet;
use tracing::trace;

use ossa_ir::{Block, ControlFlowGraph, Function, Insn, InsnData, Ownership, Value, ValueId};

use crate::{access_scope::AccessBlocks, domtree::DomTree};

/// Rewrite counters, aggregated per pass instance. Hosts that canonicalize
/// functions in parallel own the cross-thread aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub copies_generated: u32,
    pub copies_eliminated: u32,
    pub destroys_generated: u32,
    pub destroys_eliminated: u32,
}

/// Host notification hooks. All default to no-op.
///
/// There is deliberately no will-be-deleted hook: copy rewriting detaches
/// operands before instructions are deleted, so such a callback could
/// observe half-rewritten instructions.
#[derive(Default)]
pub struct InstModCallbacks {
    /// Called for every instruction the canonicalizer materializes.
    pub created_new_insn: Option<Box<dyn FnMut(Insn)>>,
    /// Called when a consuming use forces a fresh copy.
    pub notify_move_only_copy: Option<Box<dyn FnMut(Insn)>>,
    /// Called when a non-destroy consuming use is kept as a final consume.
    pub notify_final_consuming_use: Option<Box<dyn FnMut(Insn)>>,
}

/// A deduplicating worklist. An item is scheduled at most once over the
/// worklist's lifetime, even after it has been popped.
struct Worklist<T> {
    stack: Vec<T>,
    seen: FxHashSet<T>,
}

impl<T> Default for Worklist<T> {
    fn default() -> Self {
        Self {
            stack: Vec::new(),
            seen: FxHashSet::default(),
        }
    }
}

impl<T: Copy + Eq + Hash> Worklist<T> {
    fn insert(&mut self, item: T) {
        if self.seen.insert(item) {
            self.stack.push(item);
        }
    }

    fn pop(&mut self) -> Option<T> {
        self.stack.pop()
    }

    fn clear(&mut self) {
        self.stack.clear();
        self.seen.clear();
    }
}

pub struct CanonicalizeOssaLifetime {
    /// Whether to track and rewrite `debug_value` instructions as part of
    /// destroy placement.
    pub prune_debug_mode: bool,
    pub callbacks: InstModCallbacks,

    cfg: ControlFlowGraph,
    domtree: DomTree,
    access_blocks: AccessBlocks,

    // Per-def state, reset between canonicalizations.
    current_def: ValueId,
    liveness: PrunedLiveness,
    def_use_worklist: Worklist<ValueId>,
    block_worklist: Worklist<Block>,
    consuming_blocks: IndexSet<Block>,
    destroys: FxHashSet<Insn>,
    debug_values: IndexSet<Insn>,
    consumes: ConsumeInfo,

    stats: Stats,
}

impl CanonicalizeOssaLifetime {
    pub fn new(prune_debug_mode: bool) -> Self {
        Self {
            prune_debug_mode,
            callbacks: InstModCallbacks::default(),
            cfg: ControlFlowGraph::default(),
            domtree: DomTree::default(),
            access_blocks: AccessBlocks::default(),
            current_def: ValueId(u32::MAX),
            liveness: PrunedLiveness::default(),
            def_use_worklist: Worklist::default(),
            block_worklist: Worklist::default(),
            consuming_blocks: IndexSet::default(),
            destroys: FxHashSet::default(),
            debug_values: IndexSet::default(),
            consumes: ConsumeInfo::default(),
            stats: Stats::default(),
        }
    }

    /// Compute the function-level analyses consumed by canonicalization.
    ///
    /// Must be called before the first `canonicalize_value_lifetime` call
    /// on a function. Canonicalization itself never changes the CFG, so a
    /// single `prepare` covers any number of defs of the same function.
    pub fn prepare(&mut self, func: &Function) {
        self.cfg.compute(func);
        self.domtree.compute(&self.cfg);
        self.access_blocks.compute(func);
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Canonicalize a single extended owned lifetime.
    ///
    /// Returns `true` if canonicalization ran to completion, `false` if
    /// the def was skipped (not owned, lexical) or bailed out. On `false`
    /// the function is unchanged.
    pub fn canonicalize_value_lifetime(&mut self, func: &mut Function, def: ValueId) -> bool {
        if func.dfg.value_ownership(def) != Ownership::Owned {
            return false;
        }
        if func.dfg.is_lexical(def) {
            return false;
        }

        trace!("canonicalizing {def}");

        self.init_def(func, def);
        // Step 1: compute liveness.
        if !self.compute_canonical_liveness(func) {
            trace!("{def} escapes; leaving it alone");
            self.clear_liveness();
            return false;
        }
        self.extend_liveness_through_overlapping_access(func);
        // Step 2: record final destroys.
        self.find_or_insert_destroys(func);
        // Step 3: rewrite copies and delete extra destroys.
        self.rewrite_copies(func);

        self.clear_liveness();
        self.consumes.clear();
        true
    }

    fn init_def(&mut self, func: &Function, def: ValueId) {
        self.current_def = def;
        let def_block = self.current_def_block(func);
        self.liveness.initialize_def_block(def_block);
    }

    fn clear_liveness(&mut self) {
        self.liveness.clear();
        self.def_use_worklist.clear();
        self.block_worklist.clear();
        self.consuming_blocks.clear();
        self.destroys.clear();
        self.debug_values.clear();
    }

    fn current_def_block(&self, func: &Function) -> Block {
        match *func.dfg.value(self.current_def) {
            Value::Param { block, .. } => block,
            Value::Inst { insn, .. } => func.layout.insn_block(insn),
            Value::Arg { .. } => func.layout.entry_block().unwrap(),
        }
    }

    fn record_consuming_use(&mut self, func: &Function, user: Insn) {
        self.consuming_blocks.insert(func.layout.insn_block(user));
    }

    fn force_delete(&mut self, func: &mut Function, insn: Insn) {
        func.dfg.untrack_insn(insn);
        func.layout.remove_insn(insn);
    }

    fn created_new_insn(&mut self, insn: Insn) {
        if let Some(callback) = &mut self.callbacks.created_new_insn {
            callback(insn);
        }
    }

    fn maybe_notify_move_only_copy(&mut self, user: Insn) {
        if let Some(callback) = &mut self.callbacks.notify_move_only_copy {
            callback(user);
        }
    }

    fn maybe_notify_final_consuming_use(&mut self, user: Insn) {
        if let Some(callback) = &mut self.callbacks.notify_final_consuming_use {
            callback(user);
        }
    }

    /// Instruction kinds transparent to destroy hoisting: scanning for an
    /// insertion point may pass over them without forfeiting reuse of a
    /// pre-existing destroy.
    fn ignored_by_destroy_hoisting(data: &InsnData) -> bool {
        matches!(
            data,
            InsnData::Copy { .. }
                | InsnData::Destroy { .. }
                | InsnData::DebugValue { .. }
                | InsnData::Borrow { .. }
                | InsnData::EndBorrow { .. }
        )
    }
}
