use crate::types::Type;

/// Index into the Context's temp pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TempIdx(pub u32);

impl TempIdx {
    /// Reinterpret a raw integer as a `TempIdx` slot. Used for op
    /// operands that carry an encoded constant (a condition, a label
    /// id, a deposit offset/length) rather than a temp reference —
    /// the same convention the teacher crate's `carg()` helper uses.
    pub const fn carg(val: u32) -> TempIdx {
        TempIdx(val)
    }
}

/// A TCG temporary variable.
///
/// Maps to QEMU's `TCGTemp`, trimmed to the IR-level properties this
/// optimizer cares about: register allocator state (`TCGTempVal`,
/// assigned register, spill slot) is out of scope here.
#[derive(Debug, Clone)]
pub struct Temp {
    pub ty: Type,
    /// Whether this temp is TB-scoped (`temp_local` in QEMU) rather
    /// than EBB-scoped. Anonymous (EBB) temps are preferred least by
    /// `find_better`; locals next; globals most.
    pub is_local: bool,
    /// Debug name (e.g. "pc", "sp") for globals.
    pub name: Option<&'static str>,
}

impl Temp {
    pub fn new(ty: Type) -> Self {
        Self {
            ty,
            is_local: false,
            name: None,
        }
    }

    pub fn new_local(ty: Type) -> Self {
        Self {
            ty,
            is_local: true,
            name: None,
        }
    }

    pub fn new_global(ty: Type, name: &'static str) -> Self {
        Self {
            ty,
            is_local: false,
            name: Some(name),
        }
    }
}
