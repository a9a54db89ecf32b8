use tcg_core::{Cond, Op, Opcode, TempIdx, Type};

#[test]
fn op_new_defaults() {
    let op = Op::new(Opcode::Add, Type::I64);
    assert_eq!(op.opc, Opcode::Add);
    assert_eq!(op.op_type, Type::I64);
    assert_eq!(op.nargs, 0);
    assert_eq!(op.imm, 0);
    assert!(op.call.is_none());
}

#[test]
fn op_arg_slices() {
    // Add: 1 oarg, 2 iargs, 0 cargs
    let args = [TempIdx(10), TempIdx(20), TempIdx(30)];
    let op = Op::with_args(Opcode::Add, Type::I64, &args);

    assert_eq!(op.oargs(), &[TempIdx(10)]);
    assert_eq!(op.iargs(), &[TempIdx(20), TempIdx(30)]);
    assert!(op.cargs().is_empty());
}

#[test]
fn op_arg_slices_with_cargs() {
    // BrCond: 0 oargs, 2 iargs, 2 cargs
    let args = [TempIdx(1), TempIdx(2), TempIdx(3), TempIdx(4)];
    let op = Op::with_args(Opcode::BrCond, Type::I64, &args);

    assert!(op.oargs().is_empty());
    assert_eq!(op.iargs(), &[TempIdx(1), TempIdx(2)]);
    assert_eq!(op.cargs(), &[TempIdx(3), TempIdx(4)]);
}

#[test]
fn op_movi_carries_imm() {
    let op = Op::movi(TempIdx(0), Type::I32, 0xdead_beef);
    assert_eq!(op.opc, Opcode::Movi);
    assert_eq!(op.imm, 0xdead_beef);
    assert_eq!(op.oargs(), &[TempIdx(0)]);
}

#[test]
fn op_cond_round_trips_through_carg() {
    let mut op = Op::with_args(Opcode::BrCond, Type::I32, &[TempIdx(1), TempIdx(2), TempIdx(0), TempIdx(0)]);
    op.set_cond_at(0, Cond::Ltu);
    assert_eq!(op.cond_at(0), Cond::Ltu);
    op.set_cond_at(0, Cond::Ge);
    assert_eq!(op.cond_at(0), Cond::Ge);
}

#[test]
fn op_call_carries_variadic_lists() {
    use tcg_core::CallFlags;
    let op = Op::call(
        vec![TempIdx(0), TempIdx(1)],
        vec![TempIdx(2), TempIdx(3), TempIdx(4)],
        CallFlags::NO_WRITE_GLOBALS,
        Type::I64,
    );
    let call = op.call.as_ref().unwrap();
    assert_eq!(call.outs, vec![TempIdx(0), TempIdx(1)]);
    assert_eq!(call.ins, vec![TempIdx(2), TempIdx(3), TempIdx(4)]);
    assert!(call.flags.contains(CallFlags::NO_WRITE_GLOBALS));
    assert!(!call.flags.contains(CallFlags::NO_READ_GLOBALS));
}
