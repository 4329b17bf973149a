//! Instruction encoder.
//!
//! Turns an [`Instruction`] into the exact byte sequence for one dialect.
//! Operands arrive already sized; the width checks used when narrowing
//! literal values live here too (`fit_unsigned`, `fit_signed`).

use crate::constants::{
    MAX_CODE_ADDRESS, MAX_ENTER_NAME_LEN, MAX_INLINE_STRING_LEN, MAX_NATIVE_ARGS,
    MAX_NATIVE_RETURNS, MAX_SWITCH_CASES,
};
use crate::dialect::InstructionSet;
use crate::instruction::{Instruction, Operands};
use crate::opcode::{Opcode, Shape};

/// Error while encoding a single instruction.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EncodeError {
    #[error("`{opcode}` is not available in dialect {dialect}")]
    UnsupportedOpcode { opcode: Opcode, dialect: &'static str },

    #[error("`{opcode}` takes {expected}, got {found}")]
    ShapeMismatch {
        opcode: Opcode,
        expected: Shape,
        found: Shape,
    },

    #[error("switch has {0} cases (max 255)")]
    TooManySwitchCases(usize),

    #[error("function name is {0} bytes long (max 254)")]
    NameTooLong(usize),

    #[error("function name contains a NUL byte")]
    NameContainsNul,

    #[error("inline string is {0} bytes long (max 16378)")]
    StringTooLong(usize),

    #[error("native call takes {0} arguments (max 63)")]
    TooManyNativeArgs(u8),

    #[error("native call returns {0} values (max 3)")]
    TooManyNativeReturns(u8),

    #[error("value {value} does not fit in {bits} bits")]
    OutOfRange { value: u32, bits: u32 },

    #[error("found negative integer {0}, expected unsigned integer")]
    NegativeUnsigned(i64),

    #[error("{index} does not fit any {family} variant in dialect {dialect}")]
    IndexTooLarge {
        family: &'static str,
        index: u32,
        dialect: &'static str,
    },
}

/// Encode one instruction.
pub fn encode(isa: &dyn InstructionSet, instruction: &Instruction) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::with_capacity(isa.shape(instruction.opcode).constant_size().max(1));
    encode_into(isa, instruction, &mut out)?;
    Ok(out)
}

/// Encode one instruction, appending to `out`.
///
/// On error `out` is left unchanged.
pub fn encode_into(
    isa: &dyn InstructionSet,
    instruction: &Instruction,
    out: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let opcode = instruction.opcode;
    let expected = isa.shape(opcode);
    let found = instruction.operands.shape();
    if expected != found {
        return Err(EncodeError::ShapeMismatch {
            opcode,
            expected,
            found,
        });
    }

    let byte = isa.opcode(opcode).ok_or(EncodeError::UnsupportedOpcode {
        opcode,
        dialect: isa.name(),
    })?;

    validate(&instruction.operands)?;

    out.push(byte);
    match &instruction.operands {
        Operands::None => {}
        Operands::U8(a) => out.push(*a),
        Operands::U8x2(a, b) => out.extend_from_slice(&[*a, *b]),
        Operands::U8x3(a, b, c) => out.extend_from_slice(&[*a, *b, *c]),
        Operands::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
        Operands::S16(v) | Operands::Relative(v) => out.extend_from_slice(&v.to_le_bytes()),
        Operands::U24(v) | Operands::Address(v) => write_u24(out, *v),
        Operands::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
        Operands::F32(v) => out.extend_from_slice(&v.to_le_bytes()),
        Operands::Native { argc, retc, index } => {
            out.push(((argc & MAX_NATIVE_ARGS) << 2) | (retc & MAX_NATIVE_RETURNS));
            out.extend_from_slice(&index.to_be_bytes());
        }
        Operands::Enter {
            argc,
            frame_size,
            name,
        } => {
            out.push(*argc);
            out.extend_from_slice(&frame_size.to_le_bytes());
            match name {
                Some(name) => {
                    out.push(name.len() as u8 + 1);
                    out.extend_from_slice(name.as_bytes());
                    out.push(0);
                }
                None => out.push(0),
            }
        }
        Operands::Leave { argc, retc } => out.extend_from_slice(&[*argc, *retc]),
        Operands::InlineString(text) => {
            out.extend_from_slice(&(text.len() as u32).to_le_bytes());
            out.extend_from_slice(text.as_bytes());
        }
        Operands::Switch(cases) => {
            out.push(cases.len() as u8);
            for case in cases {
                out.extend_from_slice(&case.value.to_le_bytes());
                out.extend_from_slice(&case.offset.to_le_bytes());
            }
        }
    }
    Ok(())
}

fn validate(operands: &Operands) -> Result<(), EncodeError> {
    match operands {
        Operands::U24(v) | Operands::Address(v) if *v > MAX_CODE_ADDRESS => {
            Err(EncodeError::OutOfRange { value: *v, bits: 24 })
        }
        Operands::Native { argc, .. } if *argc > MAX_NATIVE_ARGS => {
            Err(EncodeError::TooManyNativeArgs(*argc))
        }
        Operands::Native { retc, .. } if *retc > MAX_NATIVE_RETURNS => {
            Err(EncodeError::TooManyNativeReturns(*retc))
        }
        Operands::Enter {
            name: Some(name), ..
        } => {
            if name.len() > MAX_ENTER_NAME_LEN {
                Err(EncodeError::NameTooLong(name.len()))
            } else if name.as_bytes().contains(&0) {
                Err(EncodeError::NameContainsNul)
            } else {
                Ok(())
            }
        }
        Operands::InlineString(text) if text.len() > MAX_INLINE_STRING_LEN => {
            Err(EncodeError::StringTooLong(text.len()))
        }
        Operands::Switch(cases) if cases.len() > MAX_SWITCH_CASES => {
            Err(EncodeError::TooManySwitchCases(cases.len()))
        }
        _ => Ok(()),
    }
}

fn write_u24(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes()[..3]);
}

/// Result of narrowing a literal to a fixed-width field.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Fit<T> {
    /// The value is representable.
    Exact(T),
    /// The value was wrapped to the field width.
    Truncated(T),
}

impl<T: Copy> Fit<T> {
    pub fn value(self) -> T {
        match self {
            Fit::Exact(v) | Fit::Truncated(v) => v,
        }
    }

    pub fn is_truncated(self) -> bool {
        matches!(self, Fit::Truncated(_))
    }
}

/// Narrow `value` to an unsigned `bits`-wide field (`bits` ≤ 32).
///
/// Negative values are an error; values above the range wrap with a
/// truncation marker.
pub fn fit_unsigned(value: i64, bits: u32) -> Result<Fit<u32>, EncodeError> {
    if value < 0 {
        return Err(EncodeError::NegativeUnsigned(value));
    }
    let max = unsigned_max(bits);
    let wrapped = (value as u64 & max) as u32;
    Ok(if value as u64 > max {
        Fit::Truncated(wrapped)
    } else {
        Fit::Exact(wrapped)
    })
}

/// Narrow `value` to a signed `bits`-wide field (`bits` ≤ 32).
pub fn fit_signed(value: i64, bits: u32) -> Fit<i32> {
    let (min, max) = signed_range(bits);
    let shift = 64 - bits;
    let wrapped = ((value << shift) >> shift) as i32;
    if value < min || value > max {
        Fit::Truncated(wrapped)
    } else {
        Fit::Exact(wrapped)
    }
}

/// Largest value of an unsigned `bits`-wide field.
pub fn unsigned_max(bits: u32) -> u64 {
    (1u64 << bits) - 1
}

/// Inclusive range of a signed `bits`-wide field.
pub fn signed_range(bits: u32) -> (i64, i64) {
    let max = (1i64 << (bits - 1)) - 1;
    (-max - 1, max)
}
