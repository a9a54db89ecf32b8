mod invariants;

use tcg_core::{CallFlags, Context, Op, Opcode, TempIdx, Type};

/// Push an op built from a fixed args array, panicking on the
/// (unexpected, in these tests) context-validation error.
pub(crate) fn push(ctx: &mut Context, opc: Opcode, ty: Type, args: &[TempIdx]) {
    ctx.emit(Op::with_args(opc, ty, args)).unwrap();
}

pub(crate) fn push_movi(ctx: &mut Context, dst: TempIdx, ty: Type, val: u64) {
    ctx.emit(Op::movi(dst, ty, val)).unwrap();
}

pub(crate) fn push_call(ctx: &mut Context, outs: Vec<TempIdx>, ins: Vec<TempIdx>, flags: CallFlags) {
    ctx.emit(Op::call(outs, ins, flags, Type::I64)).unwrap();
}
