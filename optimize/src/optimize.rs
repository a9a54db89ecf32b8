//! Peephole optimizer for the IR: constant folding, copy propagation,
//! algebraic identity simplification, comparison folding. Single
//! linear pass, no growth, every rewrite happens in place.
//!
//! Reference: `tcg/optimize.c` (QEMU's TCG constant-folding pass).

use tcg_core::{CallFlags, Cond, Context, OpFlags, Opcode, TempIdx, Type};
use tracing::trace;

/// Per-temp state tracked during the pass.
///
/// Maps to `tcg_temp_state` in `tcg/optimize.c`. A temp is either
/// `Undef` (nothing known), `Const` (known value), or `Copy` (known to
/// hold the same value as other temps in its copy class).
#[derive(Clone, Copy, PartialEq, Eq)]
enum TempState {
    Undef,
    Const(u64),
    Copy,
}

/// One node of a temp's doubly-linked circular copy-class list. A
/// temp not currently in a multi-member class has `prev == next ==`
/// its own index (the class is not materialized separately).
#[derive(Clone, Copy)]
struct TempInfo {
    state: TempState,
    prev: TempIdx,
    next: TempIdx,
}

impl TempInfo {
    fn singleton(t: TempIdx) -> Self {
        Self {
            state: TempState::Undef,
            prev: t,
            next: t,
        }
    }
}

/// Tracks constant/copy state for every temp in the stream being
/// optimized.
struct OptState {
    info: Vec<TempInfo>,
}

impl OptState {
    fn new(n_temps: usize) -> Self {
        let info = (0..n_temps).map(|i| TempInfo::singleton(TempIdx(i as u32))).collect();
        Self { info }
    }

    fn is_const(&self, t: TempIdx) -> Option<u64> {
        match self.info[t.0 as usize].state {
            TempState::Const(v) => Some(v),
            _ => None,
        }
    }

    /// Reset `t` to `Undef`. If it was the sole non-trivial member of
    /// its copy class, unlink it without disturbing the others.
    ///
    /// Maps to `reset_temp`.
    fn reset(&mut self, t: TempIdx) {
        let i = t.0 as usize;
        if self.info[i].state == TempState::Copy {
            let prev = self.info[i].prev;
            let next = self.info[i].next;
            if prev == next {
                self.info[next.0 as usize].state = TempState::Undef;
            } else {
                self.info[next.0 as usize].prev = prev;
                self.info[prev.0 as usize].next = next;
            }
        }
        self.info[i] = TempInfo::singleton(t);
    }

    /// Reset every temp to `Undef` — called at basic-block boundaries.
    fn reset_all(&mut self) {
        trace!(n_temps = self.info.len(), "basic-block boundary: resetting all temp state");
        for i in 0..self.info.len() {
            self.info[i] = TempInfo::singleton(TempIdx(i as u32));
        }
    }

    /// Record that `dst` now holds the known constant `val`.
    ///
    /// Maps to `tcg_opt_gen_movi`.
    fn mark_const(&mut self, dst: TempIdx, val: u64) {
        self.reset(dst);
        self.info[dst.0 as usize].state = TempState::Const(val);
    }

    /// Record that `dst` now holds the same (unknown) value as `src`,
    /// joining `src`'s copy class.
    ///
    /// Maps to `tcg_opt_gen_mov`. `src` must not be a known constant —
    /// callers fold to `mark_const` instead when it is.
    fn mark_copy(&mut self, dst: TempIdx, src: TempIdx) {
        self.reset(dst);
        debug_assert!(!matches!(self.info[src.0 as usize].state, TempState::Const(_)));
        if self.info[src.0 as usize].state != TempState::Copy {
            self.info[src.0 as usize] = TempInfo {
                state: TempState::Copy,
                prev: src,
                next: src,
            };
        }
        let src_next = self.info[src.0 as usize].next;
        self.info[dst.0 as usize] = TempInfo {
            state: TempState::Copy,
            prev: src,
            next: src_next,
        };
        self.info[src_next.0 as usize].prev = dst;
        self.info[src.0 as usize].next = dst;
    }

    /// Whether `a` and `b` are known to hold the same value, either by
    /// identity or by sharing a copy class.
    ///
    /// Maps to `temps_are_copies`.
    fn are_copies(&self, a: TempIdx, b: TempIdx) -> bool {
        if a == b {
            return true;
        }
        if self.info[a.0 as usize].state != TempState::Copy
            || self.info[b.0 as usize].state != TempState::Copy
        {
            return false;
        }
        let mut i = self.info[a.0 as usize].next;
        while i != a {
            if i == b {
                return true;
            }
            i = self.info[i.0 as usize].next;
        }
        false
    }

    /// Pick the best representative of `t`'s copy class for a use
    /// site: prefer a global, then a local, else `t` unchanged.
    ///
    /// Maps to `find_better_copy`.
    fn find_better(&self, ctx: &Context, t: TempIdx) -> TempIdx {
        if t.0 < ctx.nb_globals() {
            return t;
        }
        let mut i = self.info[t.0 as usize].next;
        while i != t {
            if i.0 < ctx.nb_globals() {
                return i;
            }
            i = self.info[i.0 as usize].next;
        }
        if !ctx.temp(t).is_local {
            let mut i = self.info[t.0 as usize].next;
            while i != t {
                if ctx.temp(i).is_local {
                    return i;
                }
                i = self.info[i.0 as usize].next;
            }
        }
        t
    }
}

fn sign_extend(v: u64, ty: Type) -> i64 {
    match ty {
        Type::I32 => v as u32 as i32 as i64,
        Type::I64 => v as i64,
    }
}

/// Evaluate a two-operand arithmetic/logic op on known constants,
/// truncating the result to the operand width.
///
/// Maps to `do_constant_folding_2` + `do_constant_folding`'s 32-bit mask.
fn eval_binary(opc: Opcode, a: u64, b: u64, ty: Type) -> u64 {
    let bits = ty.size_bits();
    let raw = match opc {
        Opcode::Add => a.wrapping_add(b),
        Opcode::Sub => a.wrapping_sub(b),
        Opcode::Mul => a.wrapping_mul(b),
        Opcode::And => a & b,
        Opcode::Or => a | b,
        Opcode::Xor => a ^ b,
        Opcode::AndC => a & !b,
        Opcode::OrC => a | !b,
        Opcode::Eqv => !(a ^ b),
        Opcode::Nand => !(a & b),
        Opcode::Nor => !(a | b),
        Opcode::Shl if ty == Type::I32 => ((a as u32) << (b as u32 % bits)) as u64,
        Opcode::Shl => a << (b % bits as u64),
        Opcode::Shr if ty == Type::I32 => ((a as u32) >> (b as u32 % bits)) as u64,
        Opcode::Shr => a >> (b % bits as u64),
        Opcode::Sar if ty == Type::I32 => {
            (((a as u32 as i32) >> (b as u32 % bits)) as u32) as u64
        }
        Opcode::Sar => ((a as i64) >> (b % bits as u64)) as u64,
        // Rotation count is masked modulo the operand width before
        // rotating (the original C trusts its caller never to emit an
        // out-of-range count; a total function here shouldn't).
        Opcode::RotL if ty == Type::I32 => (a as u32).rotate_left(b as u32 % bits) as u64,
        Opcode::RotL => a.rotate_left((b % bits as u64) as u32),
        Opcode::RotR if ty == Type::I32 => (a as u32).rotate_right(b as u32 % bits) as u64,
        Opcode::RotR => a.rotate_right((b % bits as u64) as u32),
        _ => unreachable!("eval_binary called with opcode {opc:?}"),
    };
    raw & ty.mask()
}

/// Evaluate a one-operand op on a known constant.
///
/// Maps to `do_constant_folding_2`'s unary cases.
fn eval_unary(opc: Opcode, a: u64, ty: Type) -> u64 {
    let raw = match opc {
        Opcode::Not => !a,
        Opcode::Neg => 0u64.wrapping_sub(a),
        Opcode::Ext8s => (a as u8 as i8) as i64 as u64,
        Opcode::Ext8u => a & 0xff,
        Opcode::Ext16s => (a as u16 as i16) as i64 as u64,
        Opcode::Ext16u => a & 0xffff,
        Opcode::Ext32s => (a as u32 as i32) as i64 as u64,
        Opcode::Ext32u => a & 0xffff_ffff,
        _ => unreachable!("eval_unary called with opcode {opc:?}"),
    };
    raw & ty.mask()
}

fn eval_cond(a: u64, b: u64, cond: Cond, ty: Type) -> bool {
    let mask = ty.mask();
    let (a, b) = (a & mask, b & mask);
    match cond {
        Cond::Never => false,
        Cond::Always => true,
        Cond::Eq => a == b,
        Cond::Ne => a != b,
        Cond::Lt => sign_extend(a, ty) < sign_extend(b, ty),
        Cond::Ge => sign_extend(a, ty) >= sign_extend(b, ty),
        Cond::Le => sign_extend(a, ty) <= sign_extend(b, ty),
        Cond::Gt => sign_extend(a, ty) > sign_extend(b, ty),
        Cond::Ltu => a < b,
        Cond::Geu => a >= b,
        Cond::Leu => a <= b,
        Cond::Gtu => a > b,
    }
}

/// The result of `cond` when both its operands are known to be equal.
///
/// Maps to `do_constant_folding_cond_eq`.
fn cond_eq_result(cond: Cond) -> bool {
    match cond {
        Cond::Gt | Cond::Ltu | Cond::Lt | Cond::Gtu | Cond::Ne => false,
        Cond::Ge | Cond::Geu | Cond::Le | Cond::Leu | Cond::Eq => true,
        Cond::Never => false,
        Cond::Always => true,
    }
}

/// Try to resolve `a cond b`. `None` means it can't be resolved yet.
///
/// Maps to `do_constant_folding_cond` (the sentinel sum value `2`
/// becomes `None` here).
fn fold_cond(st: &OptState, a: TempIdx, b: TempIdx, cond: Cond, ty: Type) -> Option<bool> {
    if let (Some(av), Some(bv)) = (st.is_const(a), st.is_const(b)) {
        return Some(eval_cond(av, bv, cond, ty));
    }
    if st.are_copies(a, b) {
        return Some(cond_eq_result(cond));
    }
    if st.is_const(b) == Some(0) {
        return match cond {
            Cond::Ltu => Some(false),
            Cond::Geu => Some(true),
            _ => None,
        };
    }
    None
}

/// Try to resolve a 2-word (lo/hi pair) comparison `(al:ah) cond (bl:bh)`.
///
/// Maps to `do_constant_folding_cond2`.
fn fold_cond2(
    st: &OptState,
    al: TempIdx,
    ah: TempIdx,
    bl: TempIdx,
    bh: TempIdx,
    cond: Cond,
) -> Option<bool> {
    if let (Some(blv), Some(bhv)) = (st.is_const(bl), st.is_const(bh)) {
        let b = ((bhv as u64) << 32) | (blv & 0xffff_ffff);
        if let (Some(alv), Some(ahv)) = (st.is_const(al), st.is_const(ah)) {
            let a = ((ahv as u64) << 32) | (alv & 0xffff_ffff);
            return Some(eval_cond(a, b, cond, Type::I64));
        }
        if b == 0 {
            match cond {
                Cond::Ltu => return Some(false),
                Cond::Geu => return Some(true),
                _ => {}
            }
        }
    }
    if st.are_copies(al, bl) && st.are_copies(ah, bh) {
        return Some(cond_eq_result(cond));
    }
    None
}

/// Prefer a constant in the second operand slot, and otherwise prefer
/// the form `op dst, dst, b` (cheaper to match on two-operand hosts).
///
/// Maps to `swap_commutative`. Returns whether a swap happened.
fn swap_commutative(st: &OptState, dst: Option<TempIdx>, a: &mut TempIdx, b: &mut TempIdx) -> bool {
    let a_const = st.is_const(*a).is_some();
    let b_const = st.is_const(*b).is_some();
    let sum = a_const as i32 - b_const as i32;
    if sum > 0 || (sum == 0 && dst == Some(*b)) {
        std::mem::swap(a, b);
        true
    } else {
        false
    }
}

/// 2-word sibling of `swap_commutative`: swaps the lo/hi pair as a unit.
///
/// Maps to `swap_commutative2`.
fn swap_commutative2(st: &OptState, a: &mut [TempIdx; 2], b: &mut [TempIdx; 2]) -> bool {
    let sum = st.is_const(a[0]).is_some() as i32
        + st.is_const(a[1]).is_some() as i32
        - st.is_const(b[0]).is_some() as i32
        - st.is_const(b[1]).is_some() as i32;
    if sum > 0 {
        std::mem::swap(&mut a[0], &mut b[0]);
        std::mem::swap(&mut a[1], &mut b[1]);
        true
    } else {
        false
    }
}

/// Run the peephole optimizer over every op in `ctx`, in place.
///
/// Maps to `tcg_optimize`/`tcg_constant_folding`.
pub fn optimize(ctx: &mut Context) {
    let mut st = OptState::new(ctx.nb_temps() as usize);
    let num_ops = ctx.num_ops();

    let mut i = 0;
    while i < num_ops {
        let opc = ctx.op(op_idx(i)).opc;

        if opc == Opcode::Call {
            fold_call(ctx, &mut st, i);
            i += 1;
            continue;
        }

        // brcond/brcond2 carry BB_END too (an unresolved conditional
        // branch is still a block terminator) but, unlike the other
        // BB_END ops, they fold: whether this op ends up a no-op state
        // change isn't known until after the fold switch below, so they
        // don't take this early exit.
        if opc.def().flags.contains(OpFlags::BB_END)
            && !matches!(opc, Opcode::BrCond | Opcode::BrCond2)
        {
            // Copy propagate inputs (e.g. goto_ptr's target reg) before
            // wiping state, then conservatively forget everything: we
            // don't know what state holds on the other side of a block
            // boundary or label join point.
            propagate_inputs(ctx, &mut st, i);
            st.reset_all();
            i += 1;
            continue;
        }

        propagate_inputs(ctx, &mut st, i);
        canonicalize(ctx, &st, i);

        if simplify_identities(ctx, &mut st, i) {
            i += 1;
            continue;
        }

        match opc {
            Opcode::Mov => fold_mov(ctx, &mut st, i),
            Opcode::Movi => {
                let dst = ctx.op(op_idx(i)).oargs()[0];
                let val = ctx.op(op_idx(i)).imm;
                st.mark_const(dst, val);
            }
            Opcode::Not
            | Opcode::Neg
            | Opcode::Ext8s
            | Opcode::Ext8u
            | Opcode::Ext16s
            | Opcode::Ext16u
            | Opcode::Ext32s
            | Opcode::Ext32u => fold_unary(ctx, &mut st, i),
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Or
            | Opcode::And
            | Opcode::Xor
            | Opcode::Shl
            | Opcode::Shr
            | Opcode::Sar
            | Opcode::RotL
            | Opcode::RotR
            | Opcode::AndC
            | Opcode::OrC
            | Opcode::Eqv
            | Opcode::Nand
            | Opcode::Nor => fold_binary(ctx, &mut st, i),
            Opcode::Deposit => fold_deposit(ctx, &mut st, i),
            Opcode::SetCond => fold_setcond(ctx, &mut st, i),
            Opcode::BrCond => fold_brcond(ctx, &mut st, i),
            Opcode::MovCond => fold_movcond(ctx, &mut st, i),
            Opcode::Add2 | Opcode::Sub2 => fold_add2_sub2(ctx, &mut st, i),
            Opcode::Mulu2 => fold_mulu2(ctx, &mut st, i),
            Opcode::BrCond2 => fold_brcond2(ctx, &mut st, i),
            Opcode::SetCond2 => fold_setcond2(ctx, &mut st, i),
            _ => invalidate_outputs(ctx, &mut st, i),
        }

        // Folding above may have rewritten this op's opcode (e.g.
        // brcond -> br/nop, brcond2 -> brcond). Re-check BB_END against
        // the *final* opcode: an unresolved conditional branch is still
        // a block terminator and must invalidate every temp, not just
        // its own outputs.
        if ctx.op(op_idx(i)).opc.def().flags.contains(OpFlags::BB_END) {
            st.reset_all();
        }

        i += 1;
    }
}

fn op_idx(i: usize) -> tcg_core::OpIdx {
    tcg_core::OpIdx(i as u32)
}

/// Copy-propagate every input operand of op `i` to the best
/// representative of its copy class.
///
/// Maps to the driver's `find_better_copy` loop over `def->nb_iargs`.
fn propagate_inputs(ctx: &mut Context, st: &mut OptState, i: usize) {
    let idx = op_idx(i);
    let n = ctx.op(idx).iargs().len();
    for slot in 0..n {
        let cur = ctx.op(idx).iargs()[slot];
        if matches!(
            st.info.get(cur.0 as usize).map(|ti| ti.state),
            Some(TempState::Copy)
        ) {
            let better = st.find_better(ctx, cur);
            ctx.op_mut(idx).iargs_mut()[slot] = better;
        }
    }
}

/// Turn out-of-scope outputs back to `Undef` without wiping the whole
/// temp table. Used for ops this pass doesn't fold further (a default
/// case) and for basic-block-ending ops that aren't fully reset.
///
/// Maps to the driver's default-case `reset_temp` loop.
fn invalidate_outputs(ctx: &mut Context, st: &mut OptState, i: usize) {
    let idx = op_idx(i);
    let n = ctx.op(idx).oargs().len();
    for slot in 0..n {
        let t = ctx.op(idx).oargs()[slot];
        st.reset(t);
    }
}

/// Canonicalize commutative operand order and the matching
/// comparator swap/invert dance for conditional ops.
///
/// Maps to the driver's "make constant second argument" switch.
fn canonicalize(ctx: &mut Context, st: &OptState, i: usize) {
    let idx = op_idx(i);
    let opc = ctx.op(idx).opc;
    match opc {
        Opcode::Add | Opcode::Mul | Opcode::And | Opcode::Or | Opcode::Xor | Opcode::Eqv
        | Opcode::Nand | Opcode::Nor => {
            let op = ctx.op_mut(idx);
            let dst = op.oargs()[0];
            let mut a = op.iargs()[0];
            let mut b = op.iargs()[1];
            swap_commutative(st, Some(dst), &mut a, &mut b);
            let iargs = op.iargs_mut();
            iargs[0] = a;
            iargs[1] = b;
        }
        Opcode::BrCond => {
            let op = ctx.op_mut(idx);
            let mut a = op.iargs()[0];
            let mut b = op.iargs()[1];
            if swap_commutative(st, None, &mut a, &mut b) {
                let cond = op.cond_at(0).swap();
                let iargs = op.iargs_mut();
                iargs[0] = a;
                iargs[1] = b;
                op.set_cond_at(0, cond);
            }
        }
        Opcode::SetCond => {
            let op = ctx.op_mut(idx);
            let dst = op.oargs()[0];
            let mut a = op.iargs()[0];
            let mut b = op.iargs()[1];
            if swap_commutative(st, Some(dst), &mut a, &mut b) {
                let cond = op.cond_at(0).swap();
                let iargs = op.iargs_mut();
                iargs[0] = a;
                iargs[1] = b;
                op.set_cond_at(0, cond);
            }
        }
        Opcode::MovCond => {
            let op = ctx.op_mut(idx);
            let mut c1 = op.iargs()[0];
            let mut c2 = op.iargs()[1];
            if swap_commutative(st, None, &mut c1, &mut c2) {
                let cond = op.cond_at(0).swap();
                let iargs = op.iargs_mut();
                iargs[0] = c1;
                iargs[1] = c2;
                op.set_cond_at(0, cond);
            }
            // Canonicalize the "false" input to match dst, so a
            // downstream backend can implement "move if true".
            let op = ctx.op_mut(idx);
            let dst = op.oargs()[0];
            let mut v_false = op.iargs()[3];
            let mut v_true = op.iargs()[2];
            if swap_commutative(st, Some(dst), &mut v_false, &mut v_true) {
                let cond = op.cond_at(0).invert();
                let iargs = op.iargs_mut();
                iargs[3] = v_false;
                iargs[2] = v_true;
                op.set_cond_at(0, cond);
            }
        }
        Opcode::Add2 => {
            let op = ctx.op_mut(idx);
            let dl = op.oargs()[0];
            let dh = op.oargs()[1];
            let mut al = op.iargs()[0];
            let mut ah = op.iargs()[1];
            let mut bl = op.iargs()[2];
            let mut bh = op.iargs()[3];
            swap_commutative(st, Some(dl), &mut al, &mut bl);
            swap_commutative(st, Some(dh), &mut ah, &mut bh);
            let iargs = op.iargs_mut();
            iargs[0] = al;
            iargs[1] = ah;
            iargs[2] = bl;
            iargs[3] = bh;
        }
        Opcode::Mulu2 => {
            let op = ctx.op_mut(idx);
            let dl = op.oargs()[0];
            let mut a = op.iargs()[0];
            let mut b = op.iargs()[1];
            swap_commutative(st, Some(dl), &mut a, &mut b);
            let iargs = op.iargs_mut();
            iargs[0] = a;
            iargs[1] = b;
        }
        Opcode::BrCond2 => {
            let op = ctx.op_mut(idx);
            let mut a = [op.iargs()[0], op.iargs()[1]];
            let mut b = [op.iargs()[2], op.iargs()[3]];
            if swap_commutative2(st, &mut a, &mut b) {
                let cond = op.cond_at(0).swap();
                let iargs = op.iargs_mut();
                iargs[0] = a[0];
                iargs[1] = a[1];
                iargs[2] = b[0];
                iargs[3] = b[1];
                op.set_cond_at(0, cond);
            }
        }
        Opcode::SetCond2 => {
            let op = ctx.op_mut(idx);
            let mut a = [op.iargs()[0], op.iargs()[1]];
            let mut b = [op.iargs()[2], op.iargs()[3]];
            if swap_commutative2(st, &mut a, &mut b) {
                let cond = op.cond_at(0).swap();
                let iargs = op.iargs_mut();
                iargs[0] = a[0];
                iargs[1] = a[1];
                iargs[2] = b[0];
                iargs[3] = b[1];
                op.set_cond_at(0, cond);
            }
        }
        _ => {}
    }
}

/// Replace op `i` with `movi dst, val`.
fn rewrite_to_movi(ctx: &mut Context, st: &mut OptState, i: usize, dst: TempIdx, val: u64, ty: Type) {
    let val = val & ty.mask();
    trace!(op = i, dst = dst.0, val, "folded to movi");
    let idx = op_idx(i);
    let op = ctx.op_mut(idx);
    op.opc = Opcode::Movi;
    op.op_type = ty;
    op.args[0] = dst;
    op.nargs = 1;
    op.imm = val;
    st.mark_const(dst, val);
}

/// Replace op `i` with `mov dst, src`, or `nop` if `dst` is already
/// known to be a copy of `src`.
fn rewrite_to_mov(ctx: &mut Context, st: &mut OptState, i: usize, dst: TempIdx, src: TempIdx, ty: Type) {
    if st.are_copies(dst, src) {
        rewrite_to_nop(ctx, i);
        return;
    }
    trace!(op = i, dst = dst.0, src = src.0, "folded to mov");
    let idx = op_idx(i);
    let op = ctx.op_mut(idx);
    op.opc = Opcode::Mov;
    op.op_type = ty;
    op.args[0] = dst;
    op.args[1] = src;
    op.nargs = 2;
    if let Some(v) = st.is_const(src) {
        st.mark_const(dst, v);
    } else {
        st.mark_copy(dst, src);
    }
}

fn rewrite_to_nop(ctx: &mut Context, i: usize) {
    trace!(op = i, "folded to nop");
    let idx = op_idx(i);
    let op = ctx.op_mut(idx);
    op.opc = Opcode::Nop;
    op.nargs = 0;
}

/// The four "simplify expression" rule groups the driver runs before
/// the main constant-folding switch, all of which short-circuit the
/// rest of that op's processing when they fire.
///
/// Maps to the four `/* Simplify expression ... */` blocks in
/// `tcg_constant_folding`.
fn simplify_identities(ctx: &mut Context, st: &mut OptState, i: usize) -> bool {
    let idx = op_idx(i);
    let opc = ctx.op(idx).opc;
    let ty = ctx.op(idx).op_type;

    // "shift/rot r, 0, a => movi r, 0": fires when the value being
    // shifted (the *first* input, at iargs[0]) is the known constant
    // zero — distinct from the "op r, a, 0" rule below, which inspects
    // the *second* input.
    if matches!(
        opc,
        Opcode::Shl | Opcode::Shr | Opcode::Sar | Opcode::RotL | Opcode::RotR
    ) {
        let a = ctx.op(idx).iargs()[0];
        if st.is_const(a) == Some(0) {
            let dst = ctx.op(idx).oargs()[0];
            rewrite_to_movi(ctx, st, i, dst, 0, ty);
            return true;
        }
    }

    // "op r, a, 0 => mov r, a"
    if matches!(
        opc,
        Opcode::Add
            | Opcode::Sub
            | Opcode::Shl
            | Opcode::Shr
            | Opcode::Sar
            | Opcode::RotL
            | Opcode::RotR
            | Opcode::Or
            | Opcode::Xor
    ) {
        let a = ctx.op(idx).iargs()[0];
        // If `a` is already const, fall through to constant folding.
        if st.is_const(a).is_none() {
            let b = ctx.op(idx).iargs()[1];
            if st.is_const(b) == Some(0) {
                let dst = ctx.op(idx).oargs()[0];
                rewrite_to_mov(ctx, st, i, dst, a, ty);
                return true;
            }
        }
    }

    // "op r, a, 0 => movi r, 0"
    if matches!(opc, Opcode::And | Opcode::Mul) {
        let b = ctx.op(idx).iargs()[1];
        if st.is_const(b) == Some(0) {
            let dst = ctx.op(idx).oargs()[0];
            rewrite_to_movi(ctx, st, i, dst, 0, ty);
            return true;
        }
    }

    // "op r, a, a => mov r, a"
    if matches!(opc, Opcode::Or | Opcode::And) {
        let a = ctx.op(idx).iargs()[0];
        let b = ctx.op(idx).iargs()[1];
        if st.are_copies(a, b) {
            let dst = ctx.op(idx).oargs()[0];
            rewrite_to_mov(ctx, st, i, dst, a, ty);
            return true;
        }
    }

    // "op r, a, a => movi r, 0"
    if matches!(opc, Opcode::Sub | Opcode::Xor) {
        let a = ctx.op(idx).iargs()[0];
        let b = ctx.op(idx).iargs()[1];
        if st.are_copies(a, b) {
            let dst = ctx.op(idx).oargs()[0];
            rewrite_to_movi(ctx, st, i, dst, 0, ty);
            return true;
        }
    }

    false
}

fn fold_mov(ctx: &mut Context, st: &mut OptState, i: usize) {
    let idx = op_idx(i);
    let op = ctx.op(idx);
    let dst = op.oargs()[0];
    let src = op.iargs()[0];
    let ty = op.op_type;
    if st.are_copies(dst, src) {
        rewrite_to_nop(ctx, i);
        return;
    }
    if let Some(v) = st.is_const(src) {
        rewrite_to_movi(ctx, st, i, dst, v, ty);
        return;
    }
    st.mark_copy(dst, src);
}

fn fold_unary(ctx: &mut Context, st: &mut OptState, i: usize) {
    let idx = op_idx(i);
    let op = ctx.op(idx);
    let opc = op.opc;
    let dst = op.oargs()[0];
    let src = op.iargs()[0];
    let ty = op.op_type;
    if let Some(v) = st.is_const(src) {
        let out_ty = ty;
        let val = eval_unary(opc, v, out_ty);
        rewrite_to_movi(ctx, st, i, dst, val, out_ty);
    } else {
        invalidate_outputs(ctx, st, i);
    }
}

fn fold_binary(ctx: &mut Context, st: &mut OptState, i: usize) {
    let idx = op_idx(i);
    let op = ctx.op(idx);
    let opc = op.opc;
    let dst = op.oargs()[0];
    let a = op.iargs()[0];
    let b = op.iargs()[1];
    let ty = op.op_type;
    if let (Some(av), Some(bv)) = (st.is_const(a), st.is_const(b)) {
        let val = eval_binary(opc, av, bv, ty);
        rewrite_to_movi(ctx, st, i, dst, val, ty);
    } else {
        invalidate_outputs(ctx, st, i);
    }
}

fn fold_deposit(ctx: &mut Context, st: &mut OptState, i: usize) {
    let idx = op_idx(i);
    let op = ctx.op(idx);
    let dst = op.oargs()[0];
    let a = op.iargs()[0];
    let b = op.iargs()[1];
    let pos = op.cargs()[0].0 as u64;
    let len = op.cargs()[1].0 as u64;
    let ty = op.op_type;
    if let (Some(av), Some(bv)) = (st.is_const(a), st.is_const(b)) {
        let field_mask = (1u64 << len) - 1;
        let val = (av & !(field_mask << pos)) | ((bv & field_mask) << pos);
        rewrite_to_movi(ctx, st, i, dst, val, ty);
    } else {
        invalidate_outputs(ctx, st, i);
    }
}

fn fold_setcond(ctx: &mut Context, st: &mut OptState, i: usize) {
    let idx = op_idx(i);
    let op = ctx.op(idx);
    let dst = op.oargs()[0];
    let a = op.iargs()[0];
    let b = op.iargs()[1];
    let cond = op.cond_at(0);
    let ty = op.op_type;
    match fold_cond(st, a, b, cond, ty) {
        Some(result) => rewrite_to_movi(ctx, st, i, dst, result as u64, ty),
        None => invalidate_outputs(ctx, st, i),
    }
}

fn fold_brcond(ctx: &mut Context, st: &mut OptState, i: usize) {
    let idx = op_idx(i);
    let op = ctx.op(idx);
    let a = op.iargs()[0];
    let b = op.iargs()[1];
    let cond = op.cond_at(0);
    let label = op.label_at(1);
    let ty = op.op_type;
    match fold_cond(st, a, b, cond, ty) {
        Some(true) => {
            // Taken unconditionally: rewritten to `br`, whose BB_END
            // flag makes the driver forget everything after this call
            // returns, same as any other basic-block boundary.
            let op = ctx.op_mut(idx);
            op.opc = Opcode::Br;
            op.args[0] = TempIdx::carg(label);
            op.nargs = 1;
        }
        Some(false) => rewrite_to_nop(ctx, i),
        // Unresolved: still a `brcond`, so the driver's BB_END check
        // on the (unchanged) final opcode invalidates all temp state.
        None => {}
    }
}

fn fold_movcond(ctx: &mut Context, st: &mut OptState, i: usize) {
    let idx = op_idx(i);
    let op = ctx.op(idx);
    let dst = op.oargs()[0];
    let c1 = op.iargs()[0];
    let c2 = op.iargs()[1];
    let v_true = op.iargs()[2];
    let v_false = op.iargs()[3];
    let cond = op.cond_at(0);
    let ty = op.op_type;
    match fold_cond(st, c1, c2, cond, ty) {
        Some(true) => rewrite_to_mov(ctx, st, i, dst, v_true, ty),
        Some(false) => rewrite_to_mov(ctx, st, i, dst, v_false, ty),
        None => invalidate_outputs(ctx, st, i),
    }
}

/// Both `add2` and `sub2` require a trailing `nop` slot reserved by
/// their emitter: folding one to a constant pair rewrites it *and*
/// the following op in place, so the op count never changes.
///
/// Maps to the `add2_i32`/`sub2_i32` driver case, including the
/// `assert(gen_opc_buf[op_index + 1] == INDEX_op_nop)` check.
fn fold_add2_sub2(ctx: &mut Context, st: &mut OptState, i: usize) {
    let idx = op_idx(i);
    let op = ctx.op(idx);
    let opc = op.opc;
    let rl = op.oargs()[0];
    let rh = op.oargs()[1];
    let al = op.iargs()[0];
    let ah = op.iargs()[1];
    let bl = op.iargs()[2];
    let bh = op.iargs()[3];

    let consts = (
        st.is_const(al),
        st.is_const(ah),
        st.is_const(bl),
        st.is_const(bh),
    );
    let (Some(alv), Some(ahv), Some(blv), Some(bhv)) = consts else {
        invalidate_outputs(ctx, st, i);
        return;
    };

    assert_eq!(
        ctx.opc_at(i + 1),
        Some(Opcode::Nop),
        "add2/sub2 folding requires a reserved trailing nop slot"
    );

    let a = ((ahv & 0xffff_ffff) << 32) | (alv & 0xffff_ffff);
    let b = ((bhv & 0xffff_ffff) << 32) | (blv & 0xffff_ffff);
    let r = if opc == Opcode::Add2 {
        a.wrapping_add(b)
    } else {
        a.wrapping_sub(b)
    };

    rewrite_to_movi(ctx, st, i, rl, r & 0xffff_ffff, Type::I32);
    rewrite_to_movi(ctx, st, i + 1, rh, (r >> 32) & 0xffff_ffff, Type::I32);
}

fn fold_mulu2(ctx: &mut Context, st: &mut OptState, i: usize) {
    let idx = op_idx(i);
    let op = ctx.op(idx);
    let rl = op.oargs()[0];
    let rh = op.oargs()[1];
    let a = op.iargs()[0];
    let b = op.iargs()[1];

    let (Some(av), Some(bv)) = (st.is_const(a), st.is_const(b)) else {
        invalidate_outputs(ctx, st, i);
        return;
    };

    assert_eq!(
        ctx.opc_at(i + 1),
        Some(Opcode::Nop),
        "mulu2 folding requires a reserved trailing nop slot"
    );

    let r = (av & 0xffff_ffff).wrapping_mul(bv & 0xffff_ffff);
    rewrite_to_movi(ctx, st, i, rl, r & 0xffff_ffff, Type::I32);
    rewrite_to_movi(ctx, st, i + 1, rh, (r >> 32) & 0xffff_ffff, Type::I32);
}

fn fold_brcond2(ctx: &mut Context, st: &mut OptState, i: usize) {
    let idx = op_idx(i);
    let op = ctx.op(idx);
    let al = op.iargs()[0];
    let ah = op.iargs()[1];
    let bl = op.iargs()[2];
    let bh = op.iargs()[3];
    let cond = op.cond_at(0);
    let label = op.label_at(1);

    match fold_cond2(st, al, ah, bl, bh, cond) {
        Some(true) => {
            // Rewritten to `br`; the driver's post-fold BB_END check
            // resets everything once this call returns.
            let op = ctx.op_mut(idx);
            op.opc = Opcode::Br;
            op.args[0] = TempIdx::carg(label);
            op.nargs = 1;
            return;
        }
        Some(false) => {
            rewrite_to_nop(ctx, i);
            return;
        }
        // Unresolved: still a `brcond2`, so the driver's BB_END check
        // on the (unchanged) final opcode invalidates all temp state.
        None => {}
    }

    // LT/GE against a known-zero constant collapses to a single
    // 32-bit compare against the high word. The result is still a
    // `brcond` (also BB_END-flagged), so the driver's post-fold check
    // resets state for this case too.
    if matches!(cond, Cond::Lt | Cond::Ge) && st.is_const(bl) == Some(0) && st.is_const(bh) == Some(0)
    {
        let op = ctx.op_mut(idx);
        op.opc = Opcode::BrCond;
        op.op_type = Type::I32;
        op.args[0] = ah;
        op.args[1] = bh;
        op.args[2] = TempIdx::carg(cond as u32);
        op.args[3] = TempIdx::carg(label);
        op.nargs = 4;
        return;
    }

    invalidate_outputs(ctx, st, i);
}

fn fold_setcond2(ctx: &mut Context, st: &mut OptState, i: usize) {
    let idx = op_idx(i);
    let op = ctx.op(idx);
    let dst = op.oargs()[0];
    let al = op.iargs()[0];
    let ah = op.iargs()[1];
    let bl = op.iargs()[2];
    let bh = op.iargs()[3];
    let cond = op.cond_at(0);

    if let Some(result) = fold_cond2(st, al, ah, bl, bh, cond) {
        rewrite_to_movi(ctx, st, i, dst, result as u64, Type::I32);
        return;
    }

    if matches!(cond, Cond::Lt | Cond::Ge) && st.is_const(bl) == Some(0) && st.is_const(bh) == Some(0)
    {
        let op = ctx.op_mut(idx);
        op.opc = Opcode::SetCond;
        op.op_type = Type::I32;
        op.args[0] = dst;
        op.args[1] = ah;
        op.args[2] = bh;
        op.args[3] = TempIdx::carg(cond as u32);
        op.nargs = 4;
        st.reset(dst);
        return;
    }

    invalidate_outputs(ctx, st, i);
}

/// Maps to the driver's `INDEX_op_call` case: copy-propagate inputs,
/// reset globals unless the call promises not to write them, reset
/// every output, and leave the call's argument lists otherwise
/// untouched (opaque to this pass).
fn fold_call(ctx: &mut Context, st: &mut OptState, i: usize) {
    let idx = op_idx(i);

    let (ins_len, flags) = {
        let call = ctx.op(idx).call.as_ref().expect("call op missing CallData");
        (call.ins.len(), call.flags)
    };
    for slot in 0..ins_len {
        let cur = ctx.op(idx).call.as_ref().unwrap().ins[slot];
        if matches!(
            st.info.get(cur.0 as usize).map(|ti| ti.state),
            Some(TempState::Copy)
        ) {
            let better = st.find_better(ctx, cur);
            ctx.op_mut(idx).call.as_mut().unwrap().ins[slot] = better;
        }
    }

    if !flags.contains(CallFlags::NO_WRITE_GLOBALS) {
        trace!(op = i, "call without NO_WRITE_GLOBALS: resetting all globals");
        for g in 0..ctx.nb_globals() {
            st.reset(TempIdx(g));
        }
    }

    let outs = ctx.op(idx).call.as_ref().unwrap().outs.clone();
    for t in outs {
        st.reset(t);
    }
}
