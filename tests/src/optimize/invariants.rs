use super::{push, push_call, push_movi};
use tcg_core::{CallFlags, Cond, Context, Op, Opcode, TempIdx, Type};
use tcg_optimize::optimize;

fn dump(ctx: &Context) -> Vec<(Opcode, Vec<TempIdx>, u64)> {
    ctx.ops()
        .iter()
        .map(|op| (op.opc, op.args[..op.nargs as usize].to_vec(), op.imm))
        .collect()
}

#[test]
fn op_count_never_changes() {
    let mut ctx = Context::new();
    let t1 = ctx.new_temp(Type::I32);
    let t2 = ctx.new_temp(Type::I32);
    let t3 = ctx.new_temp(Type::I32);

    push_movi(&mut ctx, t2, Type::I32, 3);
    push_movi(&mut ctx, t3, Type::I32, 4);
    push(&mut ctx, Opcode::Add, Type::I32, &[t1, t2, t3]);
    push(&mut ctx, Opcode::Mov, Type::I32, &[t1, t2]);

    let before = ctx.num_ops();
    optimize(&mut ctx);
    assert_eq!(ctx.num_ops(), before);
}

#[test]
fn running_twice_is_a_fixed_point() {
    let mut ctx = Context::new();
    let t1 = ctx.new_temp(Type::I32);
    let t2 = ctx.new_temp(Type::I32);
    let t3 = ctx.new_temp(Type::I32);
    let t4 = ctx.new_temp(Type::I32);

    push_movi(&mut ctx, t2, Type::I32, 3);
    push(&mut ctx, Opcode::Add, Type::I32, &[t1, t2, t3]);
    push(&mut ctx, Opcode::Mov, Type::I32, &[t4, t1]);

    optimize(&mut ctx);
    let once = dump(&ctx);
    optimize(&mut ctx);
    let twice = dump(&ctx);

    assert_eq!(once, twice);
}

#[test]
fn canonical_form_puts_constant_second() {
    let mut ctx = Context::new();
    let t1 = ctx.new_temp(Type::I32);
    let t2 = ctx.new_temp(Type::I32);
    let t3 = ctx.new_temp(Type::I32);

    push_movi(&mut ctx, t3, Type::I32, 9);
    push(&mut ctx, Opcode::Mul, Type::I32, &[t1, t3, t2]);

    optimize(&mut ctx);

    let op = ctx.op(tcg_core::OpIdx(1));
    // t2 is not const so the op can't fold; the constant must now sit
    // in the second input slot.
    assert_eq!(op.iargs()[0], t2);
    assert_eq!(op.iargs()[1], t3);
}

#[test]
fn call_without_no_write_globals_resets_globals_but_not_locals() {
    let mut ctx = Context::new();
    let g0 = ctx.new_global(Type::I64, "g0").unwrap();
    let local = ctx.new_temp(Type::I64);
    let use_site = ctx.new_temp(Type::I64);

    push_movi(&mut ctx, g0, Type::I64, 42);
    push_movi(&mut ctx, local, Type::I64, 7);
    push_call(&mut ctx, vec![], vec![], CallFlags::NONE);
    // A later mov of the global should NOT fold (state was reset);
    // a later mov of the never-invalidated local SHOULD fold.
    push(&mut ctx, Opcode::Mov, Type::I64, &[use_site, g0]);
    push(&mut ctx, Opcode::Mov, Type::I64, &[use_site, local]);

    optimize(&mut ctx);

    let g_use = ctx.op(tcg_core::OpIdx(3));
    assert_eq!(g_use.opc, Opcode::Mov, "global's constant state must not survive the call");

    let l_use = ctx.op(tcg_core::OpIdx(4));
    assert_eq!(l_use.opc, Opcode::Movi, "local's constant state survives a call with no global writes");
    assert_eq!(l_use.imm, 7);
}

#[test]
fn call_with_no_write_globals_preserves_global_constant_state() {
    let mut ctx = Context::new();
    let g0 = ctx.new_global(Type::I64, "g0").unwrap();
    let use_site = ctx.new_temp(Type::I64);

    push_movi(&mut ctx, g0, Type::I64, 42);
    push_call(&mut ctx, vec![], vec![], CallFlags::NO_WRITE_GLOBALS);
    push(&mut ctx, Opcode::Mov, Type::I64, &[use_site, g0]);

    optimize(&mut ctx);

    let g_use = ctx.op(tcg_core::OpIdx(2));
    assert_eq!(g_use.opc, Opcode::Movi);
    assert_eq!(g_use.imm, 42);
}

#[test]
fn bb_end_resets_everything() {
    let mut ctx = Context::new();
    let t1 = ctx.new_temp(Type::I32);
    let t2 = ctx.new_temp(Type::I32);
    let label = ctx.new_label();

    push_movi(&mut ctx, t1, Type::I32, 1);
    ctx.emit(Op::with_args(Opcode::Br, Type::I32, &[TempIdx::carg(label)])).unwrap();
    push(&mut ctx, Opcode::Mov, Type::I32, &[t2, t1]);

    optimize(&mut ctx);

    let mov_after_br = ctx.op(tcg_core::OpIdx(2));
    assert_eq!(
        mov_after_br.opc,
        Opcode::Mov,
        "t1's known-constant state must not survive the unconditional branch"
    );
}

#[test]
fn unresolved_brcond_is_also_a_block_terminator() {
    let mut ctx = Context::new();
    let t1 = ctx.new_temp(Type::I32);
    let t2 = ctx.new_temp(Type::I32);
    let t3 = ctx.new_temp(Type::I32);
    let label = ctx.new_label();

    push_movi(&mut ctx, t1, Type::I32, 1);
    // t2/t3 are not known constants or known copies, so this brcond
    // can't be resolved at fold time — the branch may or may not be
    // taken, but it still ends the block either way.
    ctx.emit(Op::with_args(
        Opcode::BrCond,
        Type::I32,
        &[t2, t3, TempIdx::carg(Cond::Eq as u32), TempIdx::carg(label)],
    ))
    .unwrap();
    push(&mut ctx, Opcode::Mov, Type::I32, &[t2, t1]);

    optimize(&mut ctx);

    let brcond = ctx.op(tcg_core::OpIdx(1));
    assert_eq!(brcond.opc, Opcode::BrCond, "an unresolved brcond is left in place");

    let mov_after_brcond = ctx.op(tcg_core::OpIdx(2));
    assert_eq!(
        mov_after_brcond.opc,
        Opcode::Mov,
        "t1's known-constant state must not survive an unresolved brcond, \
         which is itself a block terminator"
    );
}

#[test]
fn copy_class_closure_lets_any_member_prove_equal_to_any_other() {
    // t2, t3, and t4 each join the same copy class via a chain of movs
    // from t1, but t3 and t4 are never mov'd from each other directly.
    let mut ctx = Context::new();
    let t1 = ctx.new_temp(Type::I32);
    let t2 = ctx.new_temp(Type::I32);
    let t3 = ctx.new_temp(Type::I32);
    let t4 = ctx.new_temp(Type::I32);
    let t5 = ctx.new_temp(Type::I32);

    push(&mut ctx, Opcode::Mov, Type::I32, &[t2, t1]);
    push(&mut ctx, Opcode::Mov, Type::I32, &[t3, t2]);
    push(&mut ctx, Opcode::Mov, Type::I32, &[t4, t1]);
    push(&mut ctx, Opcode::Sub, Type::I32, &[t5, t3, t4]);

    optimize(&mut ctx);

    // "op r, a, a => movi r, 0" only fires if t3 and t4 are recognized
    // as copies, which requires walking the shared class's circular
    // list all the way around, not just a direct link between them.
    let sub = ctx.op(tcg_core::OpIdx(3));
    assert_eq!(
        sub.opc,
        Opcode::Movi,
        "t3 and t4 are transitively members of the same copy class through t1"
    );
    assert_eq!(sub.imm, 0);
}
