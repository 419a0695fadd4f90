use crate::{dfg::Block, insn::Insn, Function, InsnData};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorLocation {
    At(Insn),
    BlockTop(Block),
    BlockBottom(Block),
    #[default]
    NoWhere,
}

pub trait FuncCursor {
    fn at_location(loc: CursorLocation) -> Self;
    fn set_location(&mut self, loc: CursorLocation);
    fn loc(&self) -> CursorLocation;

    /// Insert `insn` at the cursor: after `At(insn)`, at the top of
    /// `BlockTop(block)`, at the bottom of `BlockBottom(block)`.
    fn insert_insn(&mut self, func: &mut Function, insn: Insn) {
        match self.loc() {
            CursorLocation::At(at) => func.layout.insert_insn_after(insn, at),
            CursorLocation::BlockTop(block) => func.layout.prepend_insn(insn, block),
            CursorLocation::BlockBottom(block) => func.layout.append_insn(insn, block),
            CursorLocation::NoWhere => panic!("cursor loc points to `NoWhere`"),
        }
    }

    fn insert_insn_data(&mut self, func: &mut Function, data: InsnData) -> Insn {
        let insn = func.dfg.make_insn(data);
        self.insert_insn(func, insn);
        insn
    }
}

#[derive(Debug)]
pub struct InsnInserter {
    loc: CursorLocation,
}

impl FuncCursor for InsnInserter {
    fn at_location(loc: CursorLocation) -> Self {
        Self { loc }
    }

    fn set_location(&mut self, loc: CursorLocation) {
        self.loc = loc;
    }

    fn loc(&self) -> CursorLocation {
        self.loc
    }
}
