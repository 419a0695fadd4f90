use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::{DataFlowGraph, Layout, Ownership, Type, Value, ValueId};

pub struct Function {
    /// Signature of the function.
    pub sig: Signature,
    pub arg_values: SmallVec<[ValueId; 8]>,

    pub dfg: DataFlowGraph,
    pub layout: Layout,
}

impl Function {
    pub fn new(sig: Signature) -> Self {
        let mut dfg = DataFlowGraph::new();
        let arg_values = sig
            .args()
            .iter()
            .enumerate()
            .map(|(idx, &(ty, ownership))| {
                dfg.make_value(Value::Arg { idx, ty, ownership })
            })
            .collect();

        Self {
            sig,
            arg_values,
            dfg,
            layout: Layout::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Name of the function.
    name: SmolStr,

    args: SmallVec<[(Type, Ownership); 8]>,
    ret_ty: Type,
}

impl Signature {
    pub fn new(name: &str, args: &[(Type, Ownership)], ret_ty: Type) -> Self {
        debug_assert!(args
            .iter()
            .all(|&(ty, ownership)| ty.is_managed() || ownership == Ownership::None));

        Self {
            name: name.into(),
            args: args.into(),
            ret_ty,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[(Type, Ownership)] {
        &self.args
    }

    pub fn ret_ty(&self) -> Type {
        self.ret_ty
    }
}
