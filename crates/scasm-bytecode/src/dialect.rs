//! Instruction-set descriptors for the supported opcode numbering tables.
//!
//! The three numbering tables share operand layouts and differ only in which
//! opcodes exist and which byte each one is assigned:
//! - `V9`: `V10` numbering, but `STRING` carries its literal inline
//! - `V10`: 127 opcodes, `NOP = 0x00` through `PUSH_CONST_F7 = 0x7E`
//! - `V11`: `V10` plus `IBITTEST = 0x7F`
//! - `V12`: `V11` with `STATIC_U24`, `STATIC_U24_LOAD`, `STATIC_U24_STORE`
//!   inserted at `0x5E..=0x60`, shifting every later opcode up by 3

use std::fmt;

use crate::decode::{DecodeError, read_u32};
use crate::instruction::{Instruction, Operands};
use crate::opcode::{Opcode, Shape};

/// Per-dialect opcode numbering and size rules.
///
/// One instance is selected per assembly session; every component that needs
/// to turn an `Opcode` into a byte (or walk raw bytes) goes through it.
pub trait InstructionSet: fmt::Debug + Send + Sync {
    /// Display name of the dialect.
    fn name(&self) -> &'static str;

    /// Number of opcodes in the numbering table.
    fn opcode_count(&self) -> usize;

    /// Byte assigned to `opcode`, or `None` if the dialect lacks it.
    fn opcode(&self, opcode: Opcode) -> Option<u8>;

    /// Opcode assigned to `byte`, or `None` if the byte is unassigned.
    fn decode_opcode(&self, byte: u8) -> Option<Opcode>;

    /// Operand layout of `opcode` in this dialect.
    fn shape(&self, opcode: Opcode) -> Shape {
        opcode.shape()
    }

    /// A placeholder for `opcode` with zeroed operands of this dialect's shape.
    fn zeroed(&self, opcode: Opcode) -> Instruction {
        Instruction::new(opcode, Operands::zeroed(self.shape(opcode)))
    }

    /// Fixed instruction size for an opcode byte; 0 for variable-length or unknown opcodes.
    fn constant_byte_size(&self, byte: u8) -> usize {
        self.decode_opcode(byte)
            .map_or(0, |op| self.shape(op).constant_size())
    }

    /// Size of the variable-length instruction at the start of `bytes`,
    /// computed from its header bytes alone.
    fn variable_size(&self, bytes: &[u8]) -> Result<usize, DecodeError> {
        let byte = *bytes.first().ok_or(DecodeError::Truncated {
            needed: 1,
            available: 0,
        })?;
        let opcode = self
            .decode_opcode(byte)
            .ok_or(DecodeError::UnknownOpcode(byte))?;
        let header = |needed: usize| {
            if bytes.len() < needed {
                Err(DecodeError::Truncated {
                    needed,
                    available: bytes.len(),
                })
            } else {
                Ok(())
            }
        };
        match self.shape(opcode) {
            Shape::Enter => {
                header(5)?;
                Ok(bytes[4] as usize + 5)
            }
            Shape::Switch => {
                header(2)?;
                Ok(bytes[1] as usize * 6 + 2)
            }
            Shape::InlineString => Ok(read_u32(bytes, 1)? as usize + 5),
            shape => Ok(shape.constant_size()),
        }
    }

    /// Size of the instruction at the start of `bytes`, fixed or variable.
    fn byte_size(&self, bytes: &[u8]) -> Result<usize, DecodeError> {
        let byte = *bytes.first().ok_or(DecodeError::Truncated {
            needed: 1,
            available: 0,
        })?;
        match self.constant_byte_size(byte) {
            0 => self.variable_size(bytes),
            n => Ok(n),
        }
    }

    /// Whether the interpreter checks for a page switch at this opcode byte.
    fn is_control_flow(&self, byte: u8) -> bool {
        self.decode_opcode(byte)
            .is_some_and(Opcode::is_control_flow)
    }

    /// Whether `byte` is the dialect's `NOP`.
    fn is_nop(&self, byte: u8) -> bool {
        self.decode_opcode(byte) == Some(Opcode::Nop)
    }
}

/// `V10` numbering with inline string literals.
#[derive(Clone, Copy, Debug, Default)]
pub struct V9;

/// Original numbering table.
#[derive(Clone, Copy, Debug, Default)]
pub struct V10;

/// Adds `IBITTEST`.
#[derive(Clone, Copy, Debug, Default)]
pub struct V11;

/// Adds the `STATIC_U24` family in the middle of the table.
#[derive(Clone, Copy, Debug, Default)]
pub struct V12;

const V10_COUNT: usize = Opcode::IBitTest as usize;
const V11_COUNT: usize = V10_COUNT + 1;
const V12_COUNT: usize = V11_COUNT + 3;

/// Where V12 starts shifting opcodes up.
const V12_INSERT_AT: u8 = Opcode::GlobalU24 as u8;
const V12_SHIFT: u8 = 3;

impl InstructionSet for V9 {
    fn name(&self) -> &'static str {
        "V9"
    }

    fn opcode_count(&self) -> usize {
        V10.opcode_count()
    }

    fn opcode(&self, opcode: Opcode) -> Option<u8> {
        V10.opcode(opcode)
    }

    fn decode_opcode(&self, byte: u8) -> Option<Opcode> {
        V10.decode_opcode(byte)
    }

    fn shape(&self, opcode: Opcode) -> Shape {
        match opcode {
            Opcode::String => Shape::InlineString,
            other => other.shape(),
        }
    }
}

impl InstructionSet for V10 {
    fn name(&self) -> &'static str {
        "V10"
    }

    fn opcode_count(&self) -> usize {
        V10_COUNT
    }

    fn opcode(&self, opcode: Opcode) -> Option<u8> {
        let byte = opcode as u8;
        ((byte as usize) < V10_COUNT).then_some(byte)
    }

    fn decode_opcode(&self, byte: u8) -> Option<Opcode> {
        ((byte as usize) < V10_COUNT).then(|| Opcode::ALL[byte as usize])
    }
}

impl InstructionSet for V11 {
    fn name(&self) -> &'static str {
        "V11"
    }

    fn opcode_count(&self) -> usize {
        V11_COUNT
    }

    fn opcode(&self, opcode: Opcode) -> Option<u8> {
        let byte = opcode as u8;
        ((byte as usize) < V11_COUNT).then_some(byte)
    }

    fn decode_opcode(&self, byte: u8) -> Option<Opcode> {
        ((byte as usize) < V11_COUNT).then(|| Opcode::ALL[byte as usize])
    }
}

impl InstructionSet for V12 {
    fn name(&self) -> &'static str {
        "V12"
    }

    fn opcode_count(&self) -> usize {
        V12_COUNT
    }

    fn opcode(&self, opcode: Opcode) -> Option<u8> {
        let neutral = opcode as u8;
        let byte = match opcode {
            Opcode::StaticU24 | Opcode::StaticU24Load | Opcode::StaticU24Store => {
                V12_INSERT_AT + (neutral - Opcode::StaticU24 as u8)
            }
            _ if neutral >= V12_INSERT_AT => neutral + V12_SHIFT,
            _ => neutral,
        };
        Some(byte)
    }

    fn decode_opcode(&self, byte: u8) -> Option<Opcode> {
        let neutral = match byte {
            b if b < V12_INSERT_AT => b,
            b if b < V12_INSERT_AT + V12_SHIFT => Opcode::StaticU24 as u8 + (b - V12_INSERT_AT),
            b if (b as usize) < V12_COUNT => b - V12_SHIFT,
            _ => return None,
        };
        Some(Opcode::ALL[neutral as usize])
    }
}

/// Selects one of the numbering tables.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    V9,
    #[default]
    V10,
    V11,
    V12,
}

impl Dialect {
    pub fn instruction_set(self) -> &'static dyn InstructionSet {
        match self {
            Dialect::V9 => &V9,
            Dialect::V10 => &V10,
            Dialect::V11 => &V11,
            Dialect::V12 => &V12,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.instruction_set().name())
    }
}
