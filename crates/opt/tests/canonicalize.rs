use std::cell::Cell;
use std::rc::Rc;

use ossa_ir::{dump_func, Function, FunctionBuilder, Ownership, Signature, Type, ValueId};
use ossa_opt::canonicalize::Stats;
use ossa_opt::CanonicalizeOssaLifetime;

fn canonicalize(func: &mut Function, def: ValueId) -> (bool, Stats) {
    canonicalize_with_mode(func, def, false)
}

fn canonicalize_with_mode(func: &mut Function, def: ValueId, prune_debug: bool) -> (bool, Stats) {
    let mut canonicalizer = CanonicalizeOssaLifetime::new(prune_debug);
    canonicalizer.prepare(func);
    let completed = canonicalizer.canonicalize_value_lifetime(func, def);
    (completed, canonicalizer.stats())
}

fn test_builder() -> FunctionBuilder {
    FunctionBuilder::new(Signature::new("test", &[], Type::Unit))
}

#[test]
fn single_use_is_already_canonical() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let before = dump_func(&func);

    let (completed, stats) = canonicalize(&mut func, def);
    assert!(completed);
    assert_eq!(dump_func(&func), before);
    assert_eq!(stats, Stats::default());
}

#[test]
fn redundant_copy_is_eliminated() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let addr = builder.alloca(Type::Ref);
    let copy = builder.copy(def);
    builder.store(copy, addr);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let (completed, stats) = canonicalize(&mut func, def);
    assert!(completed);
    assert_eq!(
        dump_func(&func),
        "func %test() -> unit {
    block0:
        v0.ref = call %produce;
        v1.ptr = alloca ref;
        store v0 v1;
        return;

}
"
    );
    assert_eq!(stats.copies_eliminated, 1);
    assert_eq!(stats.destroys_eliminated, 1);
    assert_eq!(stats.copies_generated, 0);
    assert_eq!(stats.destroys_generated, 0);
}

#[test]
fn earlier_consume_gets_a_fresh_copy() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let addr1 = builder.alloca(Type::Ref);
    let addr2 = builder.alloca(Type::Ref);
    builder.store(def, addr1);
    builder.store(def, addr2);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let (completed, stats) = canonicalize(&mut func, def);
    assert!(completed);
    assert_eq!(
        dump_func(&func),
        "func %test() -> unit {
    block0:
        v0.ref = call %produce;
        v1.ptr = alloca ref;
        v2.ptr = alloca ref;
        v3.ref = copy v0;
        store v3 v1;
        store v0 v2;
        return;

}
"
    );
    assert_eq!(stats.copies_generated, 1);
    assert_eq!(stats.destroys_eliminated, 1);
}

#[test]
fn destroy_moves_to_the_branch_entry() {
    let mut builder = test_builder();
    let b0 = builder.append_block();
    let b1 = builder.append_block();
    let b2 = builder.append_block();
    let b3 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let addr = builder.alloca(Type::Ref);
    let cond = builder.call("cond", &[], Type::I1);
    builder.br(cond, b1, b2);

    builder.switch_to_block(b1);
    builder.store(def, addr);
    builder.ret(None);

    builder.switch_to_block(b2);
    builder.jump(b3, &[]);

    builder.switch_to_block(b3);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let (completed, stats) = canonicalize(&mut func, def);
    assert!(completed);
    assert_eq!(
        dump_func(&func),
        "func %test() -> unit {
    block0:
        v0.ref = call %produce;
        v1.ptr = alloca ref;
        v2.i1 = call %cond;
        br v2 block1 block2;

    block1:
        store v0 v1;
        return;

    block2:
        destroy v0;
        jump block3;

    block3:
        return;

}
"
    );
    assert_eq!(stats.destroys_generated, 1);
    assert_eq!(stats.destroys_eliminated, 1);
}

#[test]
fn destroy_stays_past_an_overlapping_access() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let addr = builder.alloca(Type::I64);
    let token = builder.begin_access(addr);
    builder.call_no_result("use", &[def]);
    builder.end_access(token);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let before = dump_func(&func);

    let (completed, stats) = canonicalize(&mut func, def);
    assert!(completed);
    // The destroy is reused in place, after the end_access.
    assert_eq!(dump_func(&func), before);
    assert_eq!(stats.destroys_generated, 0);
}

#[test]
fn pointer_escape_bails_out() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    builder.ref_to_ptr(def);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let before = dump_func(&func);

    let (completed, stats) = canonicalize(&mut func, def);
    assert!(!completed);
    assert_eq!(dump_func(&func), before);
    assert_eq!(stats, Stats::default());
}

#[test]
fn escape_through_a_copy_bails_out_without_mutation() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let copy = builder.copy(def);
    builder.ref_to_ptr(copy);
    builder.destroy(copy);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let before = dump_func(&func);

    let (completed, _) = canonicalize(&mut func, def);
    assert!(!completed);
    assert_eq!(dump_func(&func), before);
}

#[test]
fn unowned_forwarding_bails_out() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    builder.ref_to_unowned(def);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let before = dump_func(&func);

    let (completed, _) = canonicalize(&mut func, def);
    assert!(!completed);
    assert_eq!(dump_func(&func), before);
}

#[test]
fn guaranteed_defs_are_skipped() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let borrow = builder.borrow(def);
    builder.end_borrow(borrow);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let before = dump_func(&func);

    let (completed, _) = canonicalize(&mut func, borrow);
    assert!(!completed);
    assert_eq!(dump_func(&func), before);
}

#[test]
fn lexical_defs_are_skipped() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let copy = builder.copy(def);
    builder.destroy(copy);
    builder.destroy(def);
    builder.ret(None);
    builder.set_lexical(def);

    let mut func = builder.finish();
    let before = dump_func(&func);

    let (completed, _) = canonicalize(&mut func, def);
    assert!(!completed);
    assert_eq!(dump_func(&func), before);
}

#[test]
fn destroy_hoists_past_an_unrelated_access() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    builder.call_no_result("use", &[def]);
    let addr = builder.alloca(Type::I64);
    let token = builder.begin_access(addr);
    builder.end_access(token);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let (completed, stats) = canonicalize(&mut func, def);
    assert!(completed);
    // The scope begins after the last use, so the destroy hoists above it.
    assert_eq!(
        dump_func(&func),
        "func %test() -> unit {
    block0:
        v0.ref = call %produce;
        call %use v0;
        destroy v0;
        v1.ptr = alloca i64;
        v2.ptr = begin_access v1;
        end_access v2;
        return;

}
"
    );
    assert_eq!(stats.destroys_generated, 1);
    assert_eq!(stats.destroys_eliminated, 1);
}

#[test]
fn access_extension_through_a_dominating_dead_block() {
    let mut builder = test_builder();
    let b0 = builder.append_block();
    let b1 = builder.append_block();

    builder.switch_to_block(b0);
    let addr = builder.alloca(Type::I64);
    let token = builder.begin_access(addr);
    builder.jump(b1, &[]);

    builder.switch_to_block(b1);
    let def = builder.call("produce", &[], Type::Ref);
    builder.call_no_result("use", &[def]);
    builder.end_access(token);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let before = dump_func(&func);

    let (completed, stats) = canonicalize(&mut func, def);
    assert!(completed);
    // The begin_access block dominates the def, so the scope overlaps and
    // the destroy must stay after the end_access.
    assert_eq!(dump_func(&func), before);
    assert_eq!(stats.destroys_generated, 0);
}

#[test]
fn access_extension_with_two_consumes_in_one_block() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let copy = builder.copy(def);
    let addr = builder.alloca(Type::I64);
    let token = builder.begin_access(addr);
    builder.call_no_result("use", &[def]);
    builder.destroy(copy);
    builder.end_access(token);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let (completed, _) = canonicalize(&mut func, def);
    assert!(completed);
    // Only the run of destroys at the block bottom is skipped when
    // looking for overlap, so the scope still extends liveness and the
    // final destroy stays outside it.
    assert_eq!(
        dump_func(&func),
        "func %test() -> unit {
    block0:
        v0.ref = call %produce;
        v2.ptr = alloca i64;
        v3.ptr = begin_access v2;
        call %use v0;
        end_access v3;
        destroy v0;
        return;

}
"
    );
}

#[test]
fn copy_is_reused_for_a_single_consuming_use() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let addr1 = builder.alloca(Type::Ref);
    let addr2 = builder.alloca(Type::Ref);
    let copy = builder.copy(def);
    builder.store(copy, addr1);
    builder.store(copy, addr2);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let (completed, stats) = canonicalize(&mut func, def);
    assert!(completed);
    // The existing copy is retargeted to the one use that still needs
    // ownership; no fresh copy is materialized.
    assert_eq!(
        dump_func(&func),
        "func %test() -> unit {
    block0:
        v0.ref = call %produce;
        v1.ptr = alloca ref;
        v2.ptr = alloca ref;
        v3.ref = copy v0;
        store v3 v1;
        store v0 v2;
        return;

}
"
    );
    assert_eq!(stats.copies_generated, 0);
    assert_eq!(stats.copies_eliminated, 0);
    assert_eq!(stats.destroys_eliminated, 1);
}

#[test]
fn canonicalization_is_idempotent() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let addr1 = builder.alloca(Type::Ref);
    let addr2 = builder.alloca(Type::Ref);
    builder.store(def, addr1);
    builder.store(def, addr2);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let (completed, _) = canonicalize(&mut func, def);
    assert!(completed);
    let first = dump_func(&func);

    let (completed, stats) = canonicalize(&mut func, def);
    assert!(completed);
    assert_eq!(dump_func(&func), first);
    assert_eq!(stats, Stats::default());
}

#[test]
fn adjacent_reborrow_keeps_the_destroy_after_end_borrow() {
    let mut builder = test_builder();
    let b0 = builder.append_block();
    let b1 = builder.append_block();
    let owned_phi = builder.append_block_param(b1, Type::Ref, Ownership::Owned);
    let reborrow_phi = builder.append_block_param(b1, Type::Ref, Ownership::Guaranteed);

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let borrow = builder.borrow(def);
    builder.jump(b1, &[def, borrow]);

    builder.switch_to_block(b1);
    builder.end_borrow(reborrow_phi);
    builder.destroy(owned_phi);
    builder.ret(None);

    let mut func = builder.finish();
    let before = dump_func(&func);

    let (completed, stats) = canonicalize(&mut func, owned_phi);
    assert!(completed);
    // The reborrow's end_borrow holds the boundary down; without the
    // adjacency closure the destroy would move to the block top.
    assert_eq!(dump_func(&func), before);
    assert_eq!(stats.destroys_generated, 0);
}

#[test]
fn owned_phi_consumed_by_its_own_branch() {
    let mut builder = test_builder();
    let b0 = builder.append_block();
    let b1 = builder.append_block();
    let b2 = builder.append_block();
    let owned_phi = builder.append_block_param(b1, Type::Ref, Ownership::Owned);
    let reborrow_phi = builder.append_block_param(b1, Type::Ref, Ownership::Guaranteed);
    let owned_out = builder.append_block_param(b2, Type::Ref, Ownership::Owned);
    let reborrow_out = builder.append_block_param(b2, Type::Ref, Ownership::Guaranteed);

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let borrow = builder.borrow(def);
    builder.jump(b1, &[def, borrow]);

    builder.switch_to_block(b1);
    builder.jump(b2, &[owned_phi, reborrow_phi]);

    builder.switch_to_block(b2);
    builder.end_borrow(reborrow_out);
    builder.destroy(owned_out);
    builder.ret(None);

    let mut func = builder.finish();
    let before = dump_func(&func);

    let (completed, _) = canonicalize(&mut func, owned_phi);
    assert!(completed);
    // The branch forwarding the phi is its final consume.
    assert_eq!(dump_func(&func), before);
}

#[test]
fn reborrow_phi_chain_extends_liveness() {
    let mut builder = test_builder();
    let b0 = builder.append_block();
    let b1 = builder.append_block();
    let b2 = builder.append_block();
    let owned_phi = builder.append_block_param(b1, Type::Ref, Ownership::Owned);
    let reborrow_phi = builder.append_block_param(b1, Type::Ref, Ownership::Guaranteed);
    let reborrow_out = builder.append_block_param(b2, Type::Ref, Ownership::Guaranteed);

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let borrow = builder.borrow(def);
    builder.jump(b1, &[def, borrow]);

    builder.switch_to_block(b1);
    builder.jump(b2, &[reborrow_phi]);

    builder.switch_to_block(b2);
    builder.end_borrow(reborrow_out);
    builder.destroy(owned_phi);
    builder.ret(None);

    let mut func = builder.finish();
    let before = dump_func(&func);

    let (completed, stats) = canonicalize(&mut func, owned_phi);
    assert!(completed);
    // Liveness follows the forwarded reborrow into block2, so the destroy
    // stays after its end_borrow instead of moving onto the edge.
    assert_eq!(dump_func(&func), before);
    assert_eq!(stats.destroys_generated, 0);
}

#[test]
fn borrow_reborrowed_by_a_branch_bails_out() {
    let mut builder = test_builder();
    let b0 = builder.append_block();
    let b1 = builder.append_block();
    let reborrow_phi = builder.append_block_param(b1, Type::Ref, Ownership::Guaranteed);

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let borrow = builder.borrow(def);
    builder.jump(b1, &[borrow]);

    builder.switch_to_block(b1);
    builder.end_borrow(reborrow_phi);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let before = dump_func(&func);

    let (completed, _) = canonicalize(&mut func, def);
    assert!(!completed);
    assert_eq!(dump_func(&func), before);
}

#[test]
fn bitwise_and_interior_uses_do_not_consume() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let borrow = builder.borrow(def);
    builder.field_ptr(borrow, 0);
    builder.end_borrow(borrow);
    builder.ref_to_int(def);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let before = dump_func(&func);

    let (completed, stats) = canonicalize(&mut func, def);
    assert!(completed);
    // Both uses keep the value alive without consuming it, so the destroy
    // after the last of them is already canonical.
    assert_eq!(dump_func(&func), before);
    assert_eq!(stats, Stats::default());
}

#[test]
fn loaded_value_is_canonicalized() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let addr = builder.alloca(Type::Ref);
    let def = builder.load(addr, Type::Ref);
    let copy = builder.copy(def);
    builder.store(copy, addr);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let (completed, _) = canonicalize(&mut func, def);
    assert!(completed);
    assert_eq!(
        dump_func(&func),
        "func %test() -> unit {
    block0:
        v0.ptr = alloca ref;
        v1.ref = load v0;
        store v1 v0;
        return;

}
"
    );
}

#[test]
fn recovered_unowned_value_is_an_independent_def() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let unowned = builder.ref_to_unowned(def);
    let recovered = builder.unowned_to_ref(unowned);
    builder.destroy(recovered);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let before = dump_func(&func);

    let (completed, _) = canonicalize(&mut func, recovered);
    assert!(completed);
    assert_eq!(dump_func(&func), before);
}

#[test]
fn forwarding_consume_is_kept_as_the_final_consume() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let aggregate = builder.aggregate(&[def]);
    builder.destroy(aggregate);
    builder.ret(None);

    let mut func = builder.finish();
    let before = dump_func(&func);

    let (completed, _) = canonicalize(&mut func, def);
    assert!(completed);
    assert_eq!(dump_func(&func), before);
}

#[test]
fn dead_range_gets_a_destroy_at_the_block_top() {
    let mut builder = test_builder();
    let b0 = builder.append_block();
    let b1 = builder.append_block();
    let param = builder.append_block_param(b1, Type::Ref, Ownership::Owned);

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    builder.jump(b1, &[def]);

    builder.switch_to_block(b1);
    builder.call_no_result("noise", &[]);
    builder.destroy(param);
    builder.ret(None);

    let mut func = builder.finish();
    let (completed, stats) = canonicalize(&mut func, param);
    assert!(completed);
    assert_eq!(
        dump_func(&func),
        "func %test() -> unit {
    block0:
        v1.ref = call %produce;
        jump block1 (v1);

    block1(v0.ref):
        destroy v0;
        call %noise;
        return;

}
"
    );
    assert_eq!(stats.destroys_generated, 1);
    assert_eq!(stats.destroys_eliminated, 1);
}

#[test]
fn debug_value_after_the_consume_is_pruned() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let addr = builder.alloca(Type::Ref);
    let copy = builder.copy(def);
    builder.store(copy, addr);
    builder.debug_value(def);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let (completed, _) = canonicalize_with_mode(&mut func, def, true);
    assert!(completed);
    // The consume moves up to the store; the stranded observer is deleted.
    assert_eq!(
        dump_func(&func),
        "func %test() -> unit {
    block0:
        v0.ref = call %produce;
        v1.ptr = alloca ref;
        store v0 v1;
        return;

}
"
    );
}

#[test]
fn debug_value_pins_liveness_outside_prune_mode() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let addr = builder.alloca(Type::Ref);
    let copy = builder.copy(def);
    builder.store(copy, addr);
    builder.debug_value(def);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let before = dump_func(&func);

    let (completed, _) = canonicalize_with_mode(&mut func, def, false);
    assert!(completed);
    // Without debug pruning the observer is an ordinary use, so the copy
    // must stay to feed the store.
    assert_eq!(dump_func(&func), before);
}

#[test]
fn debug_value_before_a_reused_destroy_survives() {
    let mut builder = test_builder();
    let b0 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    builder.debug_value(def);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let before = dump_func(&func);

    let (completed, _) = canonicalize_with_mode(&mut func, def, true);
    assert!(completed);
    assert_eq!(dump_func(&func), before);
}

#[test]
fn destroy_already_on_the_edge_is_retained() {
    let mut builder = test_builder();
    let b0 = builder.append_block();
    let b1 = builder.append_block();
    let b2 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let addr = builder.alloca(Type::Ref);
    let cond = builder.call("cond", &[], Type::I1);
    builder.br(cond, b1, b2);

    builder.switch_to_block(b1);
    builder.store(def, addr);
    builder.ret(None);

    builder.switch_to_block(b2);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();
    let before = dump_func(&func);

    let (completed, stats) = canonicalize(&mut func, def);
    assert!(completed);
    assert_eq!(dump_func(&func), before);
    assert_eq!(stats, Stats::default());
}

#[test]
fn created_instructions_are_reported() {
    let mut builder = test_builder();
    let b0 = builder.append_block();
    let b1 = builder.append_block();
    let b2 = builder.append_block();

    builder.switch_to_block(b0);
    let def = builder.call("produce", &[], Type::Ref);
    let addr = builder.alloca(Type::Ref);
    let cond = builder.call("cond", &[], Type::I1);
    builder.br(cond, b1, b2);

    builder.switch_to_block(b1);
    builder.store(def, addr);
    builder.ret(None);

    builder.switch_to_block(b2);
    builder.call_no_result("noise", &[]);
    builder.destroy(def);
    builder.ret(None);

    let mut func = builder.finish();

    let created = Rc::new(Cell::new(0u32));
    let sink = Rc::clone(&created);

    let mut canonicalizer = CanonicalizeOssaLifetime::new(false);
    canonicalizer.callbacks.created_new_insn = Some(Box::new(move |_| {
        sink.set(sink.get() + 1);
    }));
    canonicalizer.prepare(&func);
    assert!(canonicalizer.canonicalize_value_lifetime(&mut func, def));

    // The original destroy sits behind another instruction, so a fresh
    // destroy lands at the block entry and is reported.
    assert_eq!(created.get(), 1);
    assert_eq!(canonicalizer.stats().destroys_generated, 1);
    assert_eq!(canonicalizer.stats().destroys_eliminated, 1);
}
