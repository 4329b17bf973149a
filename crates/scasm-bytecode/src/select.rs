//! Narrowest-variant selection.
//!
//! Picks the smallest opcode that represents a value exactly: one-byte
//! shorthands first, then `U8`, `S16`, `U24` and finally the 4-byte forms.

use crate::dialect::InstructionSet;
use crate::encode::EncodeError;
use crate::instruction::{Instruction, Operands};
use crate::opcode::Opcode;

/// Push an integer constant using the narrowest encoding.
pub fn push_int(value: i32) -> Instruction {
    if let Some(op) = Opcode::int_shorthand(value) {
        return Instruction::bare(op);
    }
    match value {
        0..=0xFF => Instruction::new(Opcode::PushConstU8, Operands::U8(value as u8)),
        -0x8000..=0x7FFF => Instruction::new(Opcode::PushConstS16, Operands::S16(value as i16)),
        0..=0xFF_FFFF => Instruction::new(Opcode::PushConstU24, Operands::U24(value as u32)),
        _ => Instruction::new(Opcode::PushConstU32, Operands::U32(value as u32)),
    }
}

/// Push a float constant; shorthands are matched bit-exactly so `-0.0` keeps its sign.
pub fn push_float(value: f32) -> Instruction {
    match Opcode::float_shorthand(value) {
        Some(op) => Instruction::bare(op),
        None => Instruction::new(Opcode::PushConstF, Operands::F32(value)),
    }
}

fn immediate_op(value: i32, u8_op: Opcode, s16_op: Opcode, plain: Opcode) -> Vec<Instruction> {
    match value {
        0..=0xFF => vec![Instruction::new(u8_op, Operands::U8(value as u8))],
        -0x8000..=0x7FFF => vec![Instruction::new(s16_op, Operands::S16(value as i16))],
        _ => vec![push_int(value), Instruction::bare(plain)],
    }
}

/// Add a constant to the top of the stack.
pub fn iadd(value: i32) -> Vec<Instruction> {
    immediate_op(value, Opcode::IAddU8, Opcode::IAddS16, Opcode::IAdd)
}

/// Multiply the top of the stack by a constant.
pub fn imul(value: i32) -> Vec<Instruction> {
    immediate_op(value, Opcode::IMulU8, Opcode::IMulS16, Opcode::IMul)
}

/// Offset the address on top of the stack by a constant number of slots.
pub fn ioffset(value: i32) -> Vec<Instruction> {
    immediate_op(value, Opcode::IOffsetU8, Opcode::IOffsetS16, Opcode::IOffset)
}

/// Variable storage addressed by index.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Family {
    Local,
    Static,
    Global,
    /// Array element; the index is the element size.
    Array,
}

impl Family {
    fn name(self) -> &'static str {
        match self {
            Family::Local => "LOCAL",
            Family::Static => "STATIC",
            Family::Global => "GLOBAL",
            Family::Array => "ARRAY",
        }
    }

    /// Address opcodes by width, narrowest first.
    fn variants(self) -> &'static [(u32, Opcode)] {
        match self {
            Family::Local => &[(0xFF, Opcode::LocalU8), (0xFFFF, Opcode::LocalU16)],
            Family::Static => &[
                (0xFF, Opcode::StaticU8),
                (0xFFFF, Opcode::StaticU16),
                (0xFF_FFFF, Opcode::StaticU24),
            ],
            Family::Global => &[(0xFFFF, Opcode::GlobalU16), (0xFF_FFFF, Opcode::GlobalU24)],
            Family::Array => &[(0xFF, Opcode::ArrayU8), (0xFFFF, Opcode::ArrayU16)],
        }
    }
}

/// What to do with the computed address.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Access {
    /// Leave the address on the stack.
    Address,
    Load,
    Store,
}

/// Narrowest opcode for `family`/`access` at `index` that the dialect supports.
pub fn address(
    isa: &dyn InstructionSet,
    family: Family,
    access: Access,
    index: u32,
) -> Result<Instruction, EncodeError> {
    let opcode = family
        .variants()
        .iter()
        .filter(|&&(max, op)| index <= max && isa.opcode(op).is_some())
        .map(|&(_, op)| op)
        .next()
        .ok_or(EncodeError::IndexTooLarge {
            family: family.name(),
            index,
            dialect: isa.name(),
        })?;

    let opcode = match (access, opcode.load_store_forms()) {
        (Access::Address, _) | (_, None) => opcode,
        (Access::Load, Some((load, _))) => load,
        (Access::Store, Some((_, store))) => store,
    };

    let operands = match opcode.shape().constant_size() {
        2 => Operands::U8(index as u8),
        3 => Operands::U16(index as u16),
        _ => Operands::U24(index),
    };
    Ok(Instruction::new(opcode, operands))
}
