//! Peephole optimizer.
//!
//! Fuses adjacent instruction pairs into superinstructions. Windows are formed
//! from live instructions only: removed slots are skipped and a label marker
//! ends the window, so a label always keeps the instruction it points at.
//!
//! After a rewrite the scan steps back to the previous live instruction, so
//! every window touched by the rewrite is checked again. When the scan ends no
//! rule matches anywhere, which makes a second run a no-op.

use scasm_bytecode::{Instruction, InstructionSet, Opcode, Operands, decode, encode};

use crate::Error;
use crate::buffer::{CodeBuffer, InstructionRef};

/// A live instruction at a logical position.
struct Live {
    position: usize,
    at: InstructionRef,
    instruction: Instruction,
}

/// What a rule does to the window `(first, second)`.
enum Rewrite {
    /// Replace `first`, remove `second`.
    Fuse(Instruction),
    /// Replace `second`, remove `first`.
    FuseIntoSecond(Instruction),
    /// Drop `second`.
    DropSecond,
    /// Replace both.
    Split(Instruction, Instruction),
}

/// Run all rules to a fixpoint. Returns the number of rewrites applied.
pub fn optimize(buffer: &mut CodeBuffer, isa: &dyn InstructionSet) -> Result<usize, Error> {
    let mut rewrites = 0;
    let mut position = 0;

    while position < buffer.len() {
        let Some(first) = live_at(buffer, isa, position) else {
            position += 1;
            continue;
        };
        let Some(second) = next_live(buffer, isa, position) else {
            position += 1;
            continue;
        };
        let Some(rewrite) = match_rules(isa, &first.instruction, &second.instruction) else {
            position += 1;
            continue;
        };

        log::trace!(
            "peephole at {}: {}; {}",
            first.position,
            first.instruction,
            second.instruction
        );
        apply(buffer, isa, &first, &second, rewrite)?;
        rewrites += 1;
        position = previous_live(buffer, first.position).unwrap_or(first.position);
    }

    if rewrites > 0 {
        log::debug!("peephole: {rewrites} rewrites");
    }
    Ok(rewrites)
}

fn live_at(buffer: &CodeBuffer, isa: &dyn InstructionSet, position: usize) -> Option<Live> {
    let at = buffer.get(position)?;
    let bytes = buffer.get_bytes(at);
    if bytes.is_empty() {
        return None;
    }
    let (instruction, size) = decode(isa, bytes).ok()?;
    // Raw bytes holding more than one instruction are left alone.
    (size == bytes.len()).then_some(Live {
        position,
        at,
        instruction,
    })
}

fn next_live(buffer: &CodeBuffer, isa: &dyn InstructionSet, position: usize) -> Option<Live> {
    for p in position + 1..buffer.len() {
        let at = buffer.get(p)?;
        if buffer.is_removed(at) {
            continue;
        }
        if buffer.is_marker(at) {
            return None;
        }
        return live_at(buffer, isa, p);
    }
    None
}

fn previous_live(buffer: &CodeBuffer, position: usize) -> Option<usize> {
    (0..position)
        .rev()
        .find(|&p| buffer.get(p).is_some_and(|at| !buffer.is_removed(at)))
}

fn apply(
    buffer: &mut CodeBuffer,
    isa: &dyn InstructionSet,
    first: &Live,
    second: &Live,
    rewrite: Rewrite,
) -> Result<(), Error> {
    let bytes = |instruction: &Instruction| {
        encode(isa, instruction)
            .map_err(|e| Error::Internal(format!("peephole produced `{instruction}`: {e}")))
    };
    match rewrite {
        Rewrite::Fuse(fused) => {
            buffer.update(first.at, &bytes(&fused)?);
            buffer.remove(second.at);
        }
        Rewrite::FuseIntoSecond(fused) => {
            buffer.update(second.at, &bytes(&fused)?);
            buffer.remove(first.at);
        }
        Rewrite::DropSecond => buffer.remove(second.at),
        Rewrite::Split(a, b) => {
            buffer.update(first.at, &bytes(&a)?);
            buffer.update(second.at, &bytes(&b)?);
        }
    }
    Ok(())
}

fn match_rules(
    isa: &dyn InstructionSet,
    first: &Instruction,
    second: &Instruction,
) -> Option<Rewrite> {
    drop_zero_offset(first, second)
        .or_else(|| fuse_load_store(isa, first, second))
        .or_else(|| fuse_s16_arithmetic(first, second))
        .or_else(|| fuse_u8_arithmetic(first, second))
        .or_else(|| fuse_u8_pushes(first, second))
        .or_else(|| fuse_compare_jump(first, second))
}

fn is_address_op(opcode: Opcode) -> bool {
    matches!(
        opcode,
        Opcode::LocalU8
            | Opcode::LocalU16
            | Opcode::StaticU8
            | Opcode::StaticU16
            | Opcode::GlobalU16
            | Opcode::GlobalU24
            | Opcode::ArrayU8
            | Opcode::ArrayU16
    )
}

/// `X; IOFFSET_U8 0` -> `X`
fn drop_zero_offset(first: &Instruction, second: &Instruction) -> Option<Rewrite> {
    (is_address_op(first.opcode)
        && second.opcode == Opcode::IOffsetU8
        && second.operands == Operands::U8(0))
    .then_some(Rewrite::DropSecond)
}

/// `X; LOAD` -> `X_LOAD`, `X; STORE` -> `X_STORE`
fn fuse_load_store(
    isa: &dyn InstructionSet,
    first: &Instruction,
    second: &Instruction,
) -> Option<Rewrite> {
    let (load, store) = first.opcode.load_store_forms()?;
    let fused = match second.opcode {
        Opcode::Load => load,
        Opcode::Store => store,
        _ => return None,
    };
    isa.opcode(fused)?;
    Some(Rewrite::Fuse(Instruction::new(fused, first.operands.clone())))
}

/// `PUSH_CONST_S16 v; IADD|IMUL` -> `IADD_S16 v|IMUL_S16 v`
fn fuse_s16_arithmetic(first: &Instruction, second: &Instruction) -> Option<Rewrite> {
    let Operands::S16(value) = first.operands else {
        return None;
    };
    if first.opcode != Opcode::PushConstS16 {
        return None;
    }
    let fused = match second.opcode {
        Opcode::IAdd => Opcode::IAddS16,
        Opcode::IMul => Opcode::IMulS16,
        _ => return None,
    };
    Some(Rewrite::Fuse(Instruction::new(fused, Operands::S16(value))))
}

/// Small constant pushes followed by `IADD`/`IMUL` become `IADD_U8`/`IMUL_U8`.
fn fuse_u8_arithmetic(first: &Instruction, second: &Instruction) -> Option<Rewrite> {
    let fused = match second.opcode {
        Opcode::IAdd => Opcode::IAddU8,
        Opcode::IMul => Opcode::IMulU8,
        _ => return None,
    };
    match (first.opcode, &first.operands) {
        (Opcode::PushConstU8, &Operands::U8(v)) => {
            Some(Rewrite::Fuse(Instruction::new(fused, Operands::U8(v))))
        }
        (Opcode::PushConstU8U8, &Operands::U8x2(a, b)) => Some(Rewrite::Split(
            Instruction::new(Opcode::PushConstU8, Operands::U8(a)),
            Instruction::new(fused, Operands::U8(b)),
        )),
        (Opcode::PushConstU8U8U8, &Operands::U8x3(a, b, c)) => Some(Rewrite::Split(
            Instruction::new(Opcode::PushConstU8U8, Operands::U8x2(a, b)),
            Instruction::new(fused, Operands::U8(c)),
        )),
        (op, _) => {
            let v = op.int_shorthand_value().filter(|v| *v >= 0)?;
            Some(Rewrite::Fuse(Instruction::new(fused, Operands::U8(v as u8))))
        }
    }
}

/// `PUSH_CONST_U8 a; PUSH_CONST_U8 b` -> `PUSH_CONST_U8_U8 a b`, and one more into `_U8_U8_U8`.
fn fuse_u8_pushes(first: &Instruction, second: &Instruction) -> Option<Rewrite> {
    let Operands::U8(c) = second.operands else {
        return None;
    };
    if second.opcode != Opcode::PushConstU8 {
        return None;
    }
    let fused = match (first.opcode, &first.operands) {
        (Opcode::PushConstU8, &Operands::U8(a)) => {
            Instruction::new(Opcode::PushConstU8U8, Operands::U8x2(a, c))
        }
        (Opcode::PushConstU8U8, &Operands::U8x2(a, b)) => {
            Instruction::new(Opcode::PushConstU8U8U8, Operands::U8x3(a, b, c))
        }
        _ => return None,
    };
    Some(Rewrite::Fuse(fused))
}

/// `IEQ..ILE; JZ L` -> `IEQ_JZ L..ILE_JZ L`, keeping the jump's slot and label use.
fn fuse_compare_jump(first: &Instruction, second: &Instruction) -> Option<Rewrite> {
    let fused = first.opcode.compare_and_jump()?;
    if second.opcode != Opcode::Jz {
        return None;
    }
    Some(Rewrite::FuseIntoSecond(Instruction::new(
        fused,
        second.operands.clone(),
    )))
}
