//! Textual form of functions, used by golden tests and debugging.
use std::fmt::Write;

use crate::{dfg::Block, insn::Insn, Function, InsnData};

/// Render `func` in its textual form.
pub fn dump_func(func: &Function) -> String {
    let mut w = String::new();

    write!(w, "func %{}(", func.sig.name()).unwrap();
    let mut first = true;
    for &arg in &func.arg_values {
        if !first {
            w.push_str(", ");
        }
        first = false;
        write!(w, "{arg}.{}", func.dfg.value_ty(arg)).unwrap();
    }
    writeln!(w, ") -> {} {{", func.sig.ret_ty()).unwrap();

    for block in func.layout.iter_block() {
        write_block_header(&mut w, func, block);
        for insn in func.layout.iter_insn(block) {
            w.push_str("        ");
            write_insn(&mut w, func, insn);
            w.push_str(";\n");
        }
        w.push('\n');
    }

    w.push_str("}\n");
    w
}

fn write_block_header(w: &mut String, func: &Function, block: Block) {
    write!(w, "    {block}").unwrap();
    let params = func.dfg.block_params(block);
    if !params.is_empty() {
        w.push('(');
        for (i, &param) in params.iter().enumerate() {
            if i != 0 {
                w.push_str(", ");
            }
            write!(w, "{param}.{}", func.dfg.value_ty(param)).unwrap();
        }
        w.push(')');
    }
    w.push_str(":\n");
}

fn write_insn(w: &mut String, func: &Function, insn: Insn) {
    if let Some(result) = func.dfg.insn_result(insn) {
        write!(w, "{result}.{} = ", func.dfg.value_ty(result)).unwrap();
    }

    let data = func.dfg.insn(insn);
    match data {
        InsnData::Call { name, args, .. } => {
            write!(w, "call %{name}").unwrap();
            for arg in args {
                write!(w, " {arg}").unwrap();
            }
        }
        InsnData::Alloca { ty } => write!(w, "alloca {ty}").unwrap(),
        InsnData::Load { args, .. } => write!(w, "load {}", args[0]).unwrap(),
        InsnData::Store { args } => write!(w, "store {} {}", args[0], args[1]).unwrap(),
        InsnData::Aggregate { args } => {
            w.push_str("aggregate");
            for arg in args {
                write!(w, " {arg}").unwrap();
            }
        }
        InsnData::Copy { args } => write!(w, "copy {}", args[0]).unwrap(),
        InsnData::Destroy { args } => write!(w, "destroy {}", args[0]).unwrap(),
        InsnData::DebugValue { args } => write!(w, "debug_value {}", args[0]).unwrap(),
        InsnData::Borrow { args } => write!(w, "borrow {}", args[0]).unwrap(),
        InsnData::EndBorrow { args } => write!(w, "end_borrow {}", args[0]).unwrap(),
        InsnData::FieldPtr { args, idx } => write!(w, "field_ptr {} {idx}", args[0]).unwrap(),
        InsnData::RefToPtr { args } => write!(w, "ref_to_ptr {}", args[0]).unwrap(),
        InsnData::RefToUnowned { args } => write!(w, "ref_to_unowned {}", args[0]).unwrap(),
        InsnData::UnownedToRef { args } => write!(w, "unowned_to_ref {}", args[0]).unwrap(),
        InsnData::RefToInt { args } => write!(w, "ref_to_int {}", args[0]).unwrap(),
        InsnData::BeginAccess { args } => write!(w, "begin_access {}", args[0]).unwrap(),
        InsnData::EndAccess { args } => write!(w, "end_access {}", args[0]).unwrap(),
        InsnData::EndUnpairedAccess { args } => {
            write!(w, "end_unpaired_access {}", args[0]).unwrap()
        }
        InsnData::Jump { dest } => {
            write!(w, "jump {}", dest.block).unwrap();
            write_dest_args(w, &dest.args);
        }
        InsnData::Br { args, dests } => {
            write!(w, "br {}", args[0]).unwrap();
            for dest in dests {
                write!(w, " {}", dest.block).unwrap();
                write_dest_args(w, &dest.args);
            }
        }
        InsnData::Return { args } => {
            w.push_str("return");
            if let Some(arg) = args {
                write!(w, " {arg}").unwrap();
            }
        }
    }
}

fn write_dest_args(w: &mut String, args: &[crate::ValueId]) {
    if args.is_empty() {
        return;
    }
    w.push_str(" (");
    for (i, arg) in args.iter().enumerate() {
        if i != 0 {
            w.push_str(", ");
        }
        write!(w, "{arg}").unwrap();
    }
    w.push(')');
}
