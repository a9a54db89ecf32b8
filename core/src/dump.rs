//! IR dump — human-readable text output for op streams.
//!
//! Mirrors QEMU's `tcg_dump_ops()` in `tcg/tcg.c`.

use std::io::Write;

use crate::context::Context;
use crate::op::{cond_from_raw, Op};
use crate::opcode::Opcode;
use crate::temp::TempIdx;

fn cond_name(c: u32) -> &'static str {
    match cond_from_raw(c) {
        crate::types::Cond::Never => "never",
        crate::types::Cond::Always => "always",
        crate::types::Cond::Eq => "eq",
        crate::types::Cond::Ne => "ne",
        crate::types::Cond::Lt => "lt",
        crate::types::Cond::Ge => "ge",
        crate::types::Cond::Le => "le",
        crate::types::Cond::Gt => "gt",
        crate::types::Cond::Ltu => "ltu",
        crate::types::Cond::Geu => "geu",
        crate::types::Cond::Leu => "leu",
        crate::types::Cond::Gtu => "gtu",
    }
}

fn fmt_temp(ctx: &Context, idx: TempIdx, buf: &mut String) {
    use std::fmt::Write as FmtWrite;
    let i = idx.0 as usize;
    if i >= ctx.nb_temps() as usize {
        write!(buf, "${}", idx.0).unwrap();
        return;
    }
    let t = ctx.temp(idx);
    if let Some(name) = t.name {
        buf.push_str(name);
    } else if i < ctx.nb_globals() as usize {
        write!(buf, "g{i}").unwrap();
    } else {
        write!(buf, "tmp{i}").unwrap();
    }
}

fn op_name(op: &Op) -> &'static str {
    op.opc.def().name
}

/// Dump all ops in `ctx` to the given writer.
pub fn dump_ops(ctx: &Context, w: &mut impl Write) -> std::io::Result<()> {
    let mut buf = String::with_capacity(128);

    for op in ctx.ops() {
        buf.clear();
        match op.opc {
            Opcode::InsnStart => {
                let cargs = op.cargs();
                let lo = cargs[0].0 as u64;
                let hi = cargs[1].0 as u64;
                let pc = (hi << 32) | lo;
                writeln!(w, " insn_start $0x{pc:x}")?;
                continue;
            }
            Opcode::SetLabel => {
                let label_id = op.cargs()[0].0;
                writeln!(w, " L{label_id}:")?;
                continue;
            }
            Opcode::Movi => {
                write!(w, " movi")?;
                buf.clear();
                fmt_temp(ctx, op.oargs()[0], &mut buf);
                writeln!(w, " {buf}, $0x{:x}", op.imm)?;
                continue;
            }
            Opcode::Call => {
                let call = op.call.as_ref().expect("call op missing CallData");
                write!(w, " call")?;
                for (i, &o) in call.outs.iter().enumerate() {
                    buf.clear();
                    fmt_temp(ctx, o, &mut buf);
                    write!(w, "{}{}", if i == 0 { " " } else { ", " }, buf)?;
                }
                for (i, &a) in call.ins.iter().enumerate() {
                    buf.clear();
                    fmt_temp(ctx, a, &mut buf);
                    let sep = if i == 0 && call.outs.is_empty() { " " } else { ", " };
                    write!(w, "{sep}{buf}")?;
                }
                writeln!(w)?;
                continue;
            }
            _ => {}
        }

        let name = op_name(op);
        write!(w, " {name}")?;

        let oargs = op.oargs();
        for (i, &a) in oargs.iter().enumerate() {
            write!(w, "{}", if i == 0 { " " } else { ", " })?;
            buf.clear();
            fmt_temp(ctx, a, &mut buf);
            write!(w, "{buf}")?;
        }

        let iargs = op.iargs();
        let has_oargs = !oargs.is_empty();
        for (i, &a) in iargs.iter().enumerate() {
            write!(w, "{}", if !has_oargs && i == 0 { " " } else { ", " })?;
            buf.clear();
            fmt_temp(ctx, a, &mut buf);
            write!(w, "{buf}")?;
        }

        let cargs = op.cargs();
        let has_prev = !oargs.is_empty() || !iargs.is_empty();
        match op.opc {
            Opcode::BrCond | Opcode::BrCond2 => {
                let cond = cond_name(cargs[0].0);
                let label = cargs[1].0;
                write!(w, ", {cond}, L{label}")?;
            }
            Opcode::SetCond | Opcode::SetCond2 | Opcode::MovCond => {
                let cond = cond_name(cargs[0].0);
                write!(w, ", {cond}")?;
            }
            Opcode::Br => {
                let label = cargs[0].0;
                write!(w, "{}L{label}", if has_prev { ", " } else { " " })?;
            }
            _ => {
                for (i, &c) in cargs.iter().enumerate() {
                    write!(w, "{}", if !has_prev && i == 0 { " " } else { ", " })?;
                    write!(w, "${}", c.0)?;
                }
            }
        }

        writeln!(w)?;
    }
    Ok(())
}
