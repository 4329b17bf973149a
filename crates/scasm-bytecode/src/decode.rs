//! Operand decoders and the byte-stream instruction walker.

use crate::dialect::InstructionSet;
use crate::instruction::{Instruction, Operands, SwitchCase};
use crate::opcode::Shape;

/// Error while decoding bytecode.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown opcode 0x{0:02X}")]
    UnknownOpcode(u8),

    #[error("truncated instruction: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("function name is not valid UTF-8")]
    InvalidName,

    #[error("inline string is not valid UTF-8")]
    InvalidString,
}

fn field(bytes: &[u8], offset: usize, width: usize) -> Result<&[u8], DecodeError> {
    bytes
        .get(offset..offset + width)
        .ok_or(DecodeError::Truncated {
            needed: offset + width,
            available: bytes.len(),
        })
}

pub fn read_u8(bytes: &[u8], offset: usize) -> Result<u8, DecodeError> {
    Ok(field(bytes, offset, 1)?[0])
}

pub fn read_u16(bytes: &[u8], offset: usize) -> Result<u16, DecodeError> {
    let b = field(bytes, offset, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

pub fn read_s16(bytes: &[u8], offset: usize) -> Result<i16, DecodeError> {
    let b = field(bytes, offset, 2)?;
    Ok(i16::from_le_bytes([b[0], b[1]]))
}

pub fn read_u24(bytes: &[u8], offset: usize) -> Result<u32, DecodeError> {
    let b = field(bytes, offset, 3)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], 0]))
}

pub fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, DecodeError> {
    let b = field(bytes, offset, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

pub fn read_f32(bytes: &[u8], offset: usize) -> Result<f32, DecodeError> {
    read_u32(bytes, offset).map(f32::from_bits)
}

/// Arg count, return count and native index of a `NATIVE` instruction.
pub fn read_native(bytes: &[u8]) -> Result<(u8, u8, u16), DecodeError> {
    let packed = read_u8(bytes, 1)?;
    let b = field(bytes, 2, 2)?;
    Ok((packed >> 2, packed & 0x3, u16::from_be_bytes([b[0], b[1]])))
}

/// Function name embedded in an `ENTER` instruction; `None` when the length byte is 0.
pub fn read_enter_name(bytes: &[u8]) -> Result<Option<&str>, DecodeError> {
    let len = read_u8(bytes, 4)? as usize;
    if len == 0 {
        return Ok(None);
    }
    // Length includes the terminating NUL.
    let raw = field(bytes, 5, len)?;
    std::str::from_utf8(&raw[..len - 1])
        .map(Some)
        .map_err(|_| DecodeError::InvalidName)
}

/// Literal carried by an inline `STRING` instruction.
pub fn read_inline_string(bytes: &[u8]) -> Result<&str, DecodeError> {
    let len = read_u32(bytes, 1)? as usize;
    std::str::from_utf8(field(bytes, 5, len)?).map_err(|_| DecodeError::InvalidString)
}

/// Case table of a `SWITCH` instruction.
pub fn read_switch_cases(bytes: &[u8]) -> Result<Vec<SwitchCase>, DecodeError> {
    let count = read_u8(bytes, 1)? as usize;
    (0..count)
        .map(|i| {
            let at = switch_case_offset(i);
            Ok(SwitchCase::new(read_u32(bytes, at)?, read_s16(bytes, at + 4)?))
        })
        .collect()
}

/// Byte offset of case `index` inside a `SWITCH` instruction.
pub fn switch_case_offset(index: usize) -> usize {
    2 + index * 6
}

/// Decode the single instruction at the start of `bytes`.
///
/// Returns the instruction and its byte length.
pub fn decode(isa: &dyn InstructionSet, bytes: &[u8]) -> Result<(Instruction, usize), DecodeError> {
    let size = isa.byte_size(bytes)?;
    let bytes = field(bytes, 0, size)?;
    let opcode = isa
        .decode_opcode(bytes[0])
        .ok_or(DecodeError::UnknownOpcode(bytes[0]))?;

    let operands = match isa.shape(opcode) {
        Shape::None => Operands::None,
        Shape::U8 => Operands::U8(read_u8(bytes, 1)?),
        Shape::U8x2 => Operands::U8x2(read_u8(bytes, 1)?, read_u8(bytes, 2)?),
        Shape::U8x3 => Operands::U8x3(read_u8(bytes, 1)?, read_u8(bytes, 2)?, read_u8(bytes, 3)?),
        Shape::U16 => Operands::U16(read_u16(bytes, 1)?),
        Shape::S16 => Operands::S16(read_s16(bytes, 1)?),
        Shape::U24 => Operands::U24(read_u24(bytes, 1)?),
        Shape::U32 => Operands::U32(read_u32(bytes, 1)?),
        Shape::F32 => Operands::F32(read_f32(bytes, 1)?),
        Shape::Relative => Operands::Relative(read_s16(bytes, 1)?),
        Shape::Address => Operands::Address(read_u24(bytes, 1)?),
        Shape::Native => {
            let (argc, retc, index) = read_native(bytes)?;
            Operands::Native { argc, retc, index }
        }
        Shape::Enter => Operands::Enter {
            argc: read_u8(bytes, 1)?,
            frame_size: read_u16(bytes, 2)?,
            name: read_enter_name(bytes)?.map(str::to_owned),
        },
        Shape::Leave => Operands::Leave {
            argc: read_u8(bytes, 1)?,
            retc: read_u8(bytes, 2)?,
        },
        Shape::Switch => Operands::Switch(read_switch_cases(bytes)?),
        Shape::InlineString => Operands::InlineString(read_inline_string(bytes)?.to_owned()),
    };

    Ok((Instruction::new(opcode, operands), size))
}

/// Walks a byte stream instruction by instruction.
///
/// Yields `(offset, instruction)`; stops after the first error.
pub struct Instructions<'a> {
    isa: &'a dyn InstructionSet,
    bytes: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Instructions<'a> {
    pub fn new(isa: &'a dyn InstructionSet, bytes: &'a [u8]) -> Self {
        Self {
            isa,
            bytes,
            offset: 0,
            failed: false,
        }
    }
}

impl Iterator for Instructions<'_> {
    type Item = Result<(usize, Instruction), DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.bytes.len() {
            return None;
        }
        match decode(self.isa, &self.bytes[self.offset..]) {
            Ok((instruction, size)) => {
                let at = self.offset;
                self.offset += size;
                Some(Ok((at, instruction)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
