use crate::opcode::Opcode;
use crate::temp::TempIdx;
use crate::types::{Cond, Type};

/// Maximum number of (temp/const) argument slots in `Op::args`.
/// Sized for the widest non-call op, `movcond` (1 oarg + 4 iargs + 1 carg).
pub const MAX_OP_ARGS: usize = 6;

/// Index into the Context's op list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpIdx(pub u32);

/// Call-flag bits controlling how the optimizer treats a call's effect
/// on global temp state.
///
/// Maps to QEMU's `TCG_CALL_NO_READ_GLOBALS` / `TCG_CALL_NO_WRITE_GLOBALS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallFlags(u8);

impl CallFlags {
    pub const NONE: CallFlags = CallFlags(0);
    pub const NO_READ_GLOBALS: CallFlags = CallFlags(0x1);
    pub const NO_WRITE_GLOBALS: CallFlags = CallFlags(0x2);

    pub const fn contains(self, other: CallFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: CallFlags) -> Self {
        Self(self.0 | other.0)
    }
}

/// Variadic call data: output temps, input temps, and the callee-effect
/// flag word. Kept as its own struct rather than packed into `Op::args`
/// (QEMU packs `(n_outs << 16) | n_ins` into a header arg slot) because
/// this IR's `args` is a small fixed array, not a flat growable stream.
#[derive(Debug, Clone)]
pub struct CallData {
    pub outs: Vec<TempIdx>,
    pub ins: Vec<TempIdx>,
    pub flags: CallFlags,
}

/// A single IR operation.
///
/// Maps to QEMU's `TCGOp`. Each op has an opcode, a type (for
/// type-polymorphic ops), and up to `MAX_OP_ARGS` operand slots, plus
/// two side channels the fixed array can't carry: `imm` for a `Movi`'s
/// 64-bit constant, and `call` for `Call`'s variadic argument lists.
#[derive(Debug, Clone)]
pub struct Op {
    pub opc: Opcode,
    /// Operand type for type-polymorphic ops (I32 or I64).
    pub op_type: Type,
    /// Temp operands and small encoded constants (condition tags,
    /// label ids, deposit offset/length).
    pub args: [TempIdx; MAX_OP_ARGS],
    pub nargs: u8,
    /// `Movi`'s constant value. Zero and unused for every other opcode.
    pub imm: u64,
    /// `Call`'s variadic data. `None` for every opcode but `Call`.
    pub call: Option<CallData>,
}

impl Op {
    pub fn new(opc: Opcode, op_type: Type) -> Self {
        Self {
            opc,
            op_type,
            args: [TempIdx(0); MAX_OP_ARGS],
            nargs: 0,
            imm: 0,
            call: None,
        }
    }

    pub fn with_args(opc: Opcode, op_type: Type, args: &[TempIdx]) -> Self {
        let mut op = Self::new(opc, op_type);
        let n = args.len().min(MAX_OP_ARGS);
        op.args[..n].copy_from_slice(&args[..n]);
        op.nargs = n as u8;
        op
    }

    pub fn movi(dst: TempIdx, op_type: Type, val: u64) -> Self {
        let mut op = Self::with_args(Opcode::Movi, op_type, &[dst]);
        op.imm = val;
        op
    }

    pub fn call(outs: Vec<TempIdx>, ins: Vec<TempIdx>, flags: CallFlags, op_type: Type) -> Self {
        let mut op = Self::new(Opcode::Call, op_type);
        op.call = Some(CallData { outs, ins, flags });
        op
    }

    /// Output arguments slice (per the opcode's static definition).
    pub fn oargs(&self) -> &[TempIdx] {
        let n = self.opc.def().nb_oargs as usize;
        &self.args[..n]
    }

    pub fn oargs_mut(&mut self) -> &mut [TempIdx] {
        let n = self.opc.def().nb_oargs as usize;
        &mut self.args[..n]
    }

    /// Input arguments slice.
    pub fn iargs(&self) -> &[TempIdx] {
        let def = self.opc.def();
        let start = def.nb_oargs as usize;
        let end = start + def.nb_iargs as usize;
        &self.args[start..end]
    }

    pub fn iargs_mut(&mut self) -> &mut [TempIdx] {
        let def = self.opc.def();
        let start = def.nb_oargs as usize;
        let end = start + def.nb_iargs as usize;
        &mut self.args[start..end]
    }

    /// Encoded-constant arguments slice.
    pub fn cargs(&self) -> &[TempIdx] {
        let def = self.opc.def();
        let start = (def.nb_oargs + def.nb_iargs) as usize;
        let end = start + def.nb_cargs as usize;
        &self.args[start..end]
    }

    pub fn cargs_mut(&mut self) -> &mut [TempIdx] {
        let def = self.opc.def();
        let start = (def.nb_oargs + def.nb_iargs) as usize;
        let end = start + def.nb_cargs as usize;
        &mut self.args[start..end]
    }

    /// Read a `Cond` out of a carg slot.
    pub fn cond_at(&self, slot: usize) -> Cond {
        cond_from_raw(self.cargs()[slot].0)
    }

    pub fn set_cond_at(&mut self, slot: usize, cond: Cond) {
        self.cargs_mut()[slot] = TempIdx::carg(cond as u32);
    }

    /// Label id carried in a carg slot.
    pub fn label_at(&self, slot: usize) -> u32 {
        self.cargs()[slot].0
    }
}

pub fn cond_from_raw(v: u32) -> Cond {
    match v {
        0 => Cond::Never,
        1 => Cond::Always,
        8 => Cond::Eq,
        9 => Cond::Ne,
        10 => Cond::Lt,
        11 => Cond::Ge,
        12 => Cond::Le,
        13 => Cond::Gt,
        14 => Cond::Ltu,
        15 => Cond::Geu,
        16 => Cond::Leu,
        17 => Cond::Gtu,
        _ => panic!("invalid encoded condition {v}"),
    }
}
