//! This module contains function layout information including block order
//! and instruction order.
use cranelift_entity::SecondaryMap;

use crate::{dfg::Block, insn::Insn};

#[derive(Debug, Clone, Default)]
pub struct Layout {
    blocks: SecondaryMap<Block, BlockNode>,
    insns: SecondaryMap<Insn, InsnNode>,
    entry_block: Option<Block>,
    last_block: Option<Block>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_block(&self) -> Option<Block> {
        self.entry_block
    }

    pub fn is_block_inserted(&self, block: Block) -> bool {
        Some(block) == self.entry_block || self.blocks[block] != BlockNode::default()
    }

    pub fn first_insn_of(&self, block: Block) -> Option<Insn> {
        debug_assert!(self.is_block_inserted(block));
        self.blocks[block].first_insn
    }

    pub fn last_insn_of(&self, block: Block) -> Option<Insn> {
        debug_assert!(self.is_block_inserted(block));
        self.blocks[block].last_insn
    }

    pub fn prev_insn_of(&self, insn: Insn) -> Option<Insn> {
        debug_assert!(self.is_insn_inserted(insn));
        self.insns[insn].prev
    }

    pub fn next_insn_of(&self, insn: Insn) -> Option<Insn> {
        debug_assert!(self.is_insn_inserted(insn));
        self.insns[insn].next
    }

    pub fn insn_block(&self, insn: Insn) -> Block {
        debug_assert!(self.is_insn_inserted(insn));
        self.insns[insn].block.unwrap()
    }

    pub fn is_insn_inserted(&self, insn: Insn) -> bool {
        self.insns[insn] != InsnNode::default()
    }

    pub fn iter_block(&self) -> impl Iterator<Item = Block> + '_ {
        BlockIter {
            next: self.entry_block,
            blocks: &self.blocks,
        }
    }

    pub fn iter_insn(&self, block: Block) -> impl Iterator<Item = Insn> + '_ {
        debug_assert!(self.is_block_inserted(block));
        InsnIter {
            next: self.blocks[block].first_insn,
            insns: &self.insns,
        }
    }

    pub fn append_block(&mut self, block: Block) {
        debug_assert!(!self.is_block_inserted(block));

        let mut block_node = BlockNode::default();

        if let Some(last_block) = self.last_block {
            self.blocks[last_block].next = Some(block);
            block_node.prev = Some(last_block);
        } else {
            self.entry_block = Some(block);
        }

        self.blocks[block] = block_node;
        self.last_block = Some(block);
    }

    pub fn append_insn(&mut self, insn: Insn, block: Block) {
        debug_assert!(self.is_block_inserted(block));
        debug_assert!(!self.is_insn_inserted(insn));

        let block_node = &mut self.blocks[block];
        let mut insn_node = InsnNode::with_block(block);

        if let Some(last_insn) = block_node.last_insn {
            insn_node.prev = Some(last_insn);
            self.insns[last_insn].next = Some(insn);
        } else {
            block_node.first_insn = Some(insn);
        }

        block_node.last_insn = Some(insn);
        self.insns[insn] = insn_node;
    }

    pub fn prepend_insn(&mut self, insn: Insn, block: Block) {
        debug_assert!(self.is_block_inserted(block));
        debug_assert!(!self.is_insn_inserted(insn));

        let block_node = &mut self.blocks[block];
        let mut insn_node = InsnNode::with_block(block);

        if let Some(first_insn) = block_node.first_insn {
            insn_node.next = Some(first_insn);
            self.insns[first_insn].prev = Some(insn);
        } else {
            block_node.last_insn = Some(insn);
        }

        block_node.first_insn = Some(insn);
        self.insns[insn] = insn_node;
    }

    pub fn insert_insn_before(&mut self, insn: Insn, before: Insn) {
        debug_assert!(self.is_insn_inserted(before));
        debug_assert!(!self.is_insn_inserted(insn));

        let before_node = &self.insns[before];
        let block = before_node.block.unwrap();
        let mut insn_node = InsnNode::with_block(block);

        match before_node.prev {
            Some(prev) => {
                insn_node.prev = Some(prev);
                self.insns[prev].next = Some(insn);
            }
            None => self.blocks[block].first_insn = Some(insn),
        }
        insn_node.next = Some(before);
        self.insns[before].prev = Some(insn);
        self.insns[insn] = insn_node;
    }

    pub fn insert_insn_after(&mut self, insn: Insn, after: Insn) {
        debug_assert!(self.is_insn_inserted(after));
        debug_assert!(!self.is_insn_inserted(insn));

        let after_node = &self.insns[after];
        let block = after_node.block.unwrap();
        let mut insn_node = InsnNode::with_block(block);

        match after_node.next {
            Some(next) => {
                insn_node.next = Some(next);
                self.insns[next].prev = Some(insn);
            }
            None => self.blocks[block].last_insn = Some(insn),
        }
        insn_node.prev = Some(after);
        self.insns[after].next = Some(insn);
        self.insns[insn] = insn_node;
    }

    /// Remove instruction from the layout.
    pub fn remove_insn(&mut self, insn: Insn) {
        debug_assert!(self.is_insn_inserted(insn));

        let insn_node = &self.insns[insn];
        let block_node = &mut self.blocks[insn_node.block.unwrap()];
        let prev_insn = insn_node.prev;
        let next_insn = insn_node.next;
        match (prev_insn, next_insn) {
            (Some(prev), Some(next)) => {
                self.insns[prev].next = Some(next);
                self.insns[next].prev = Some(prev);
            }
            (Some(prev), None) => {
                self.insns[prev].next = None;
                block_node.last_insn = Some(prev);
            }
            (None, Some(next)) => {
                self.insns[next].prev = None;
                block_node.first_insn = Some(next);
            }
            (None, None) => {
                block_node.first_insn = None;
                block_node.last_insn = None;
            }
        }

        self.insns[insn] = InsnNode::default();
    }
}

struct BlockIter<'a> {
    next: Option<Block>,
    blocks: &'a SecondaryMap<Block, BlockNode>,
}

impl Iterator for BlockIter<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        let next = self.next?;
        self.next = self.blocks[next].next;
        Some(next)
    }
}

struct InsnIter<'a> {
    next: Option<Insn>,
    insns: &'a SecondaryMap<Insn, InsnNode>,
}

impl Iterator for InsnIter<'_> {
    type Item = Insn;

    fn next(&mut self) -> Option<Insn> {
        let next = self.next?;
        self.next = self.insns[next].next;
        Some(next)
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
struct BlockNode {
    prev: Option<Block>,
    next: Option<Block>,
    first_insn: Option<Insn>,
    last_insn: Option<Insn>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
struct InsnNode {
    /// The block in which the insn exists.
    block: Option<Block>,
    /// A previous instruction.
    prev: Option<Insn>,
    /// A next instruction.
    next: Option<Insn>,
}

impl InsnNode {
    fn with_block(block: Block) -> Self {
        Self {
            block: Some(block),
            prev: None,
            next: None,
        }
    }
}
