use tcg_core::{ContextError, Context, Op, Opcode, TempIdx, Type};

#[test]
fn globals_must_precede_locals() {
    let mut ctx = Context::new();
    ctx.new_temp(Type::I64);
    let err = ctx.new_global(Type::I64, "pc").unwrap_err();
    assert_eq!(err, ContextError::GlobalAfterLocal);
}

#[test]
fn new_global_then_locals_ok() {
    let mut ctx = Context::new();
    let pc = ctx.new_global(Type::I64, "pc").unwrap();
    let sp = ctx.new_global(Type::I64, "sp").unwrap();
    let t0 = ctx.new_temp(Type::I64);

    assert_eq!(ctx.nb_globals(), 2);
    assert_eq!(pc, TempIdx(0));
    assert_eq!(sp, TempIdx(1));
    assert_eq!(t0, TempIdx(2));
    assert_eq!(ctx.nb_temps(), 3);
}

#[test]
fn emit_rejects_unknown_temp() {
    let mut ctx = Context::new();
    let dst = ctx.new_temp(Type::I64);
    let bogus = TempIdx(99);
    let op = Op::with_args(Opcode::Mov, Type::I64, &[dst, bogus]);
    let err = ctx.emit(op).unwrap_err();
    assert_eq!(err, ContextError::UnknownTemp(bogus));
}

#[test]
fn emit_accepts_known_temps_and_returns_index() {
    let mut ctx = Context::new();
    let a = ctx.new_temp(Type::I64);
    let b = ctx.new_temp(Type::I64);
    let idx = ctx
        .emit(Op::with_args(Opcode::Add, Type::I64, &[a, b, b]))
        .unwrap();
    assert_eq!(idx.0, 0);
    assert_eq!(ctx.num_ops(), 1);
}

#[test]
fn unknown_label_is_an_error() {
    let ctx = Context::new();
    assert_eq!(ctx.label(0).unwrap_err(), ContextError::UnknownLabel(0));
}

#[test]
fn new_label_is_retrievable() {
    let mut ctx = Context::new();
    let id = ctx.new_label();
    assert_eq!(ctx.label(id).unwrap().id, id);
}
