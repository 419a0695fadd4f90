pub mod builder;
pub mod cfg;
pub mod dfg;
pub mod func_cursor;
pub mod function;
pub mod insn;
pub mod ir_writer;
pub mod layout;
pub mod operand;
pub mod types;
pub mod value;

pub use builder::FunctionBuilder;
pub use cfg::ControlFlowGraph;
pub use dfg::{Block, BlockData, DataFlowGraph};
pub use function::{Function, Signature};
pub use insn::{BranchDest, Insn, InsnData};
pub use ir_writer::dump_func;
pub use layout::Layout;
pub use operand::OperandOwnership;
pub use types::Type;
pub use value::{Ownership, Value, ValueId};
