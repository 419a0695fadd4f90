//! Block-level summary of exclusive-access scopes.
use cranelift_entity::SecondaryMap;

use ossa_ir::{Block, Function, InsnData};

/// For each block, whether it ends an access scope whose begin lives in a
/// different block. Destroy hoisting must not sink a destroy into such a
/// scope, so these blocks force the access-scope extension to look at
/// them even when they are outside pruned liveness.
#[derive(Default, Debug)]
pub struct AccessBlocks {
    non_local_end_access: SecondaryMap<Block, bool>,
}

impl AccessBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.non_local_end_access.clear();
    }

    pub fn compute(&mut self, func: &Function) {
        self.clear();

        for block in func.layout.iter_block() {
            for insn in func.layout.iter_insn(block) {
                match func.dfg.insn(insn) {
                    InsnData::EndUnpairedAccess { .. } => {
                        self.non_local_end_access[block] = true;
                    }
                    InsnData::EndAccess { args } => {
                        let begin = func.dfg.value_insn(args[0]);
                        let local = begin
                            .is_some_and(|begin| func.layout.insn_block(begin) == block);
                        if !local {
                            self.non_local_end_access[block] = true;
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    pub fn contains_non_local_end_access(&self, block: Block) -> bool {
        self.non_local_end_access[block]
    }
}
