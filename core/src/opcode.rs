use crate::types::Type;

/// IR opcodes this optimizer understands.
///
/// Maps to QEMU's `TCGOpcode`, trimmed to the subset
/// `tcg/optimize.c`'s constant-folding kernel and driver actually
/// reason about: vector ops, guest/host memory access, byteswap,
/// bit-counting, widening multiply and carry arithmetic never appear
/// in `do_constant_folding_2` or the driver's rewrite switches, so
/// they have no place in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // -- Data movement --
    Mov = 0,
    Movi,

    // -- Arithmetic --
    Add,
    Sub,
    Mul,
    Neg,

    // -- Logic --
    And,
    Or,
    Xor,
    Not,
    AndC, // a & ~b
    OrC,  // a | ~b
    Eqv,  // ~(a ^ b)
    Nand,
    Nor,

    // -- Shift/rotate --
    Shl,
    Shr,
    Sar,
    RotL,
    RotR,

    // -- Narrowing/widening conversions --
    Ext8s,
    Ext8u,
    Ext16s,
    Ext16u,
    Ext32s,
    Ext32u,

    // -- Bit field --
    Deposit,

    // -- Conditionals --
    SetCond,
    BrCond,
    MovCond,

    // -- 32-bit host: 64-bit ops on paired regs --
    Add2,
    Sub2,
    Mulu2,
    BrCond2,
    SetCond2,

    // -- Call --
    Call,

    // -- Control flow --
    Br,
    SetLabel,
    ExitTb,
    GotoTb,
    GotoPtr,

    // -- Misc --
    Nop,
    Discard,
    InsnStart,

    // Sentinel — must be last
    Count,
}

/// Flags describing properties of an opcode relevant to this pass.
///
/// Maps to QEMU's `TCG_OPF_*` flags, trimmed to the ones the driver
/// actually branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpFlags(u16);

impl OpFlags {
    pub const NONE: OpFlags = OpFlags(0);
    /// Ends a basic block: all temp state must be wiped after this op.
    pub const BB_END: OpFlags = OpFlags(0x01);
    /// Clobbers caller-saved registers (like a function call).
    pub const CALL_CLOBBER: OpFlags = OpFlags(0x02);
    /// Has side effects — cannot be eliminated.
    pub const SIDE_EFFECTS: OpFlags = OpFlags(0x04);

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: OpFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: OpFlags) -> Self {
        Self(self.0 | other.0)
    }
}

/// Static definition of an opcode — argument counts and flags.
///
/// Maps to QEMU's `TCGOpDef`. `nb_cargs` counts encoded-constant slots
/// stored in the op's `args` array (conditions, label ids, deposit
/// offset/length); `Movi`'s immediate and `Call`'s variadic argument
/// lists live outside `args` entirely (see `Op`).
#[derive(Debug, Clone, Copy)]
pub struct OpDef {
    pub name: &'static str,
    pub nb_oargs: u8,
    pub nb_iargs: u8,
    pub nb_cargs: u8,
    pub flags: OpFlags,
}

impl OpDef {
    pub const fn nb_args(&self) -> u8 {
        self.nb_oargs + self.nb_iargs + self.nb_cargs
    }
}

const fn f(a: OpFlags, b: OpFlags) -> OpFlags {
    OpFlags(a.0 | b.0)
}

const SE: OpFlags = OpFlags::SIDE_EFFECTS;
const CC: OpFlags = OpFlags::CALL_CLOBBER;
const BE: OpFlags = OpFlags::BB_END;
const N: OpFlags = OpFlags::NONE;

/// Static opcode definition table, indexed by `Opcode as usize`.
pub static OPCODE_DEFS: [OpDef; Opcode::Count as usize] = [
    OpDef { name: "mov", nb_oargs: 1, nb_iargs: 1, nb_cargs: 0, flags: N },
    OpDef { name: "movi", nb_oargs: 1, nb_iargs: 0, nb_cargs: 0, flags: N },
    OpDef { name: "add", nb_oargs: 1, nb_iargs: 2, nb_cargs: 0, flags: N },
    OpDef { name: "sub", nb_oargs: 1, nb_iargs: 2, nb_cargs: 0, flags: N },
    OpDef { name: "mul", nb_oargs: 1, nb_iargs: 2, nb_cargs: 0, flags: N },
    OpDef { name: "neg", nb_oargs: 1, nb_iargs: 1, nb_cargs: 0, flags: N },
    OpDef { name: "and", nb_oargs: 1, nb_iargs: 2, nb_cargs: 0, flags: N },
    OpDef { name: "or", nb_oargs: 1, nb_iargs: 2, nb_cargs: 0, flags: N },
    OpDef { name: "xor", nb_oargs: 1, nb_iargs: 2, nb_cargs: 0, flags: N },
    OpDef { name: "not", nb_oargs: 1, nb_iargs: 1, nb_cargs: 0, flags: N },
    OpDef { name: "andc", nb_oargs: 1, nb_iargs: 2, nb_cargs: 0, flags: N },
    OpDef { name: "orc", nb_oargs: 1, nb_iargs: 2, nb_cargs: 0, flags: N },
    OpDef { name: "eqv", nb_oargs: 1, nb_iargs: 2, nb_cargs: 0, flags: N },
    OpDef { name: "nand", nb_oargs: 1, nb_iargs: 2, nb_cargs: 0, flags: N },
    OpDef { name: "nor", nb_oargs: 1, nb_iargs: 2, nb_cargs: 0, flags: N },
    OpDef { name: "shl", nb_oargs: 1, nb_iargs: 2, nb_cargs: 0, flags: N },
    OpDef { name: "shr", nb_oargs: 1, nb_iargs: 2, nb_cargs: 0, flags: N },
    OpDef { name: "sar", nb_oargs: 1, nb_iargs: 2, nb_cargs: 0, flags: N },
    OpDef { name: "rotl", nb_oargs: 1, nb_iargs: 2, nb_cargs: 0, flags: N },
    OpDef { name: "rotr", nb_oargs: 1, nb_iargs: 2, nb_cargs: 0, flags: N },
    OpDef { name: "ext8s", nb_oargs: 1, nb_iargs: 1, nb_cargs: 0, flags: N },
    OpDef { name: "ext8u", nb_oargs: 1, nb_iargs: 1, nb_cargs: 0, flags: N },
    OpDef { name: "ext16s", nb_oargs: 1, nb_iargs: 1, nb_cargs: 0, flags: N },
    OpDef { name: "ext16u", nb_oargs: 1, nb_iargs: 1, nb_cargs: 0, flags: N },
    OpDef { name: "ext32s", nb_oargs: 1, nb_iargs: 1, nb_cargs: 0, flags: N },
    OpDef { name: "ext32u", nb_oargs: 1, nb_iargs: 1, nb_cargs: 0, flags: N },
    OpDef { name: "deposit", nb_oargs: 1, nb_iargs: 2, nb_cargs: 2, flags: N },
    OpDef { name: "setcond", nb_oargs: 1, nb_iargs: 2, nb_cargs: 1, flags: N },
    OpDef { name: "brcond", nb_oargs: 0, nb_iargs: 2, nb_cargs: 2, flags: BE },
    OpDef { name: "movcond", nb_oargs: 1, nb_iargs: 4, nb_cargs: 1, flags: N },
    OpDef { name: "add2", nb_oargs: 2, nb_iargs: 4, nb_cargs: 0, flags: N },
    OpDef { name: "sub2", nb_oargs: 2, nb_iargs: 4, nb_cargs: 0, flags: N },
    OpDef { name: "mulu2", nb_oargs: 2, nb_iargs: 2, nb_cargs: 0, flags: N },
    OpDef { name: "brcond2", nb_oargs: 0, nb_iargs: 4, nb_cargs: 2, flags: BE },
    OpDef { name: "setcond2", nb_oargs: 1, nb_iargs: 4, nb_cargs: 1, flags: N },
    OpDef { name: "call", nb_oargs: 0, nb_iargs: 0, nb_cargs: 0, flags: f(SE, CC) },
    OpDef { name: "br", nb_oargs: 0, nb_iargs: 0, nb_cargs: 1, flags: f(BE, SE) },
    OpDef { name: "set_label", nb_oargs: 0, nb_iargs: 0, nb_cargs: 1, flags: f(BE, SE) },
    OpDef { name: "exit_tb", nb_oargs: 0, nb_iargs: 0, nb_cargs: 1, flags: f(BE, SE) },
    OpDef { name: "goto_tb", nb_oargs: 0, nb_iargs: 0, nb_cargs: 1, flags: f(BE, SE) },
    OpDef { name: "goto_ptr", nb_oargs: 0, nb_iargs: 1, nb_cargs: 0, flags: f(BE, SE) },
    OpDef { name: "nop", nb_oargs: 0, nb_iargs: 0, nb_cargs: 0, flags: N },
    OpDef { name: "discard", nb_oargs: 1, nb_iargs: 0, nb_cargs: 0, flags: SE },
    OpDef { name: "insn_start", nb_oargs: 0, nb_iargs: 0, nb_cargs: 2, flags: SE },
];

impl Opcode {
    /// Look up the static definition for this opcode.
    pub fn def(self) -> &'static OpDef {
        &OPCODE_DEFS[self as usize]
    }

    /// Return the fixed IR type this opcode operates on for the
    /// 32-bit-host pair ops, which are always `I32`-limbed regardless
    /// of `Op::op_type`.
    pub fn fixed_type(self) -> Option<Type> {
        match self {
            Opcode::Add2 | Opcode::Sub2 | Opcode::Mulu2 | Opcode::BrCond2 | Opcode::SetCond2 => {
                Some(Type::I32)
            }
            _ => None,
        }
    }
}
