use crate::error::ContextError;
use crate::label::Label;
use crate::op::{Op, OpIdx};
use crate::opcode::Opcode;
use crate::temp::{Temp, TempIdx};
use crate::types::Type;

/// Holds all state for one stream of IR ops: the temp pool, the op
/// list, and labels.
///
/// Maps to QEMU's `TCGContext`, trimmed to what `optimize()` and its
/// callers need — register allocation, code buffers, and translation
/// block bookkeeping are out of scope here.
pub struct Context {
    temps: Vec<Temp>,
    ops: Vec<Op>,
    labels: Vec<Label>,
    nb_globals: u32,
}

impl Context {
    pub fn new() -> Self {
        Self {
            temps: Vec::with_capacity(32),
            ops: Vec::with_capacity(256),
            labels: Vec::with_capacity(8),
            nb_globals: 0,
        }
    }

    // -- Temp allocation --

    pub fn nb_globals(&self) -> u32 {
        self.nb_globals
    }

    pub fn nb_temps(&self) -> u32 {
        self.temps.len() as u32
    }

    /// Register a global temp. Must be called before any `new_temp`/
    /// `new_temp_local` call.
    pub fn new_global(&mut self, ty: Type, name: &'static str) -> Result<TempIdx, ContextError> {
        if self.temps.len() as u32 != self.nb_globals {
            return Err(ContextError::GlobalAfterLocal);
        }
        let idx = TempIdx(self.temps.len() as u32);
        self.temps.push(Temp::new_global(ty, name));
        self.nb_globals += 1;
        Ok(idx)
    }

    /// Allocate a new anonymous (EBB-scoped) temp.
    pub fn new_temp(&mut self, ty: Type) -> TempIdx {
        let idx = TempIdx(self.temps.len() as u32);
        self.temps.push(Temp::new(ty));
        idx
    }

    /// Allocate a new local (TB-scoped) temp.
    pub fn new_temp_local(&mut self, ty: Type) -> TempIdx {
        let idx = TempIdx(self.temps.len() as u32);
        self.temps.push(Temp::new_local(ty));
        idx
    }

    pub fn temp(&self, idx: TempIdx) -> &Temp {
        &self.temps[idx.0 as usize]
    }

    pub fn temps(&self) -> &[Temp] {
        &self.temps
    }

    pub fn globals(&self) -> &[Temp] {
        &self.temps[..self.nb_globals as usize]
    }

    fn check_temp(&self, idx: TempIdx) -> Result<(), ContextError> {
        if (idx.0 as usize) < self.temps.len() {
            Ok(())
        } else {
            Err(ContextError::UnknownTemp(idx))
        }
    }

    // -- Op emission --

    /// Append an op, validating that every temp operand it references
    /// (output, input, and for `Call`, the variadic lists) was
    /// registered first.
    pub fn emit(&mut self, op: Op) -> Result<OpIdx, ContextError> {
        if let Some(call) = &op.call {
            for &t in call.outs.iter().chain(&call.ins) {
                self.check_temp(t)?;
            }
        } else {
            for &t in op.oargs().iter().chain(op.iargs()) {
                self.check_temp(t)?;
            }
        }
        let idx = OpIdx(self.ops.len() as u32);
        self.ops.push(op);
        Ok(idx)
    }

    pub fn op(&self, idx: OpIdx) -> &Op {
        &self.ops[idx.0 as usize]
    }

    pub fn op_mut(&mut self, idx: OpIdx) -> &mut Op {
        &mut self.ops[idx.0 as usize]
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }

    /// Opcode at `idx`, or `None` past the end of the stream — used by
    /// the pair-op folding rules to peek at a trailing `nop` slot.
    pub fn opc_at(&self, idx: usize) -> Option<Opcode> {
        self.ops.get(idx).map(|op| op.opc)
    }

    // -- Labels --

    pub fn new_label(&mut self) -> u32 {
        let id = self.labels.len() as u32;
        self.labels.push(Label::new(id));
        id
    }

    pub fn label(&self, id: u32) -> Result<&Label, ContextError> {
        self.labels.get(id as usize).ok_or(ContextError::UnknownLabel(id))
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
