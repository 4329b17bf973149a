//! Abstract instructions: an opcode plus already-sized operands.

use std::fmt;

use crate::opcode::{Opcode, Shape};

/// One `SWITCH` case: compare value and branch offset.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct SwitchCase {
    pub value: u32,
    /// Relative to the end of this case's offset field.
    pub offset: i16,
}

impl SwitchCase {
    pub fn new(value: u32, offset: i16) -> Self {
        Self { value, offset }
    }
}

/// Operand values, one variant per [`Shape`].
#[derive(Clone, PartialEq, Debug)]
pub enum Operands {
    None,
    U8(u8),
    U8x2(u8, u8),
    U8x3(u8, u8, u8),
    U16(u16),
    S16(i16),
    U24(u32),
    U32(u32),
    F32(f32),
    Relative(i16),
    Address(u32),
    Native { argc: u8, retc: u8, index: u16 },
    Enter { argc: u8, frame_size: u16, name: Option<String> },
    Leave { argc: u8, retc: u8 },
    Switch(Vec<SwitchCase>),
    InlineString(String),
}

impl Operands {
    pub fn shape(&self) -> Shape {
        match self {
            Operands::None => Shape::None,
            Operands::U8(_) => Shape::U8,
            Operands::U8x2(..) => Shape::U8x2,
            Operands::U8x3(..) => Shape::U8x3,
            Operands::U16(_) => Shape::U16,
            Operands::S16(_) => Shape::S16,
            Operands::U24(_) => Shape::U24,
            Operands::U32(_) => Shape::U32,
            Operands::F32(_) => Shape::F32,
            Operands::Relative(_) => Shape::Relative,
            Operands::Address(_) => Shape::Address,
            Operands::Native { .. } => Shape::Native,
            Operands::Enter { .. } => Shape::Enter,
            Operands::Leave { .. } => Shape::Leave,
            Operands::Switch(_) => Shape::Switch,
            Operands::InlineString(_) => Shape::InlineString,
        }
    }

    /// Zero-valued operands of the given shape, used as placeholders.
    pub fn zeroed(shape: Shape) -> Self {
        match shape {
            Shape::None => Operands::None,
            Shape::U8 => Operands::U8(0),
            Shape::U8x2 => Operands::U8x2(0, 0),
            Shape::U8x3 => Operands::U8x3(0, 0, 0),
            Shape::U16 => Operands::U16(0),
            Shape::S16 => Operands::S16(0),
            Shape::U24 => Operands::U24(0),
            Shape::U32 => Operands::U32(0),
            Shape::F32 => Operands::F32(0.0),
            Shape::Relative => Operands::Relative(0),
            Shape::Address => Operands::Address(0),
            Shape::Native => Operands::Native {
                argc: 0,
                retc: 0,
                index: 0,
            },
            Shape::Enter => Operands::Enter {
                argc: 0,
                frame_size: 0,
                name: None,
            },
            Shape::Leave => Operands::Leave { argc: 0, retc: 0 },
            Shape::Switch => Operands::Switch(Vec::new()),
            Shape::InlineString => Operands::InlineString(String::new()),
        }
    }
}

/// An opcode with its operands.
#[derive(Clone, PartialEq, Debug)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Operands,
}

impl Instruction {
    pub fn new(opcode: Opcode, operands: Operands) -> Self {
        Self { opcode, operands }
    }

    /// An instruction without operands.
    pub fn bare(opcode: Opcode) -> Self {
        Self::new(opcode, Operands::None)
    }

    /// A placeholder with zeroed operands of the opcode's shape.
    pub fn zeroed(opcode: Opcode) -> Self {
        Self::new(opcode, Operands::zeroed(opcode.shape()))
    }

    pub fn enter(argc: u8, frame_size: u16, name: Option<&str>) -> Self {
        Self::new(
            Opcode::Enter,
            Operands::Enter {
                argc,
                frame_size,
                name: name.map(str::to_owned),
            },
        )
    }

    pub fn leave(argc: u8, retc: u8) -> Self {
        Self::new(Opcode::Leave, Operands::Leave { argc, retc })
    }

    pub fn native(argc: u8, retc: u8, index: u16) -> Self {
        Self::new(Opcode::Native, Operands::Native { argc, retc, index })
    }

    pub fn switch(cases: Vec<SwitchCase>) -> Self {
        Self::new(Opcode::Switch, Operands::Switch(cases))
    }

    /// `STRING` carrying its literal, for dialects with inline strings.
    pub fn inline_string(text: &str) -> Self {
        Self::new(Opcode::String, Operands::InlineString(text.to_owned()))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        match &self.operands {
            Operands::None => Ok(()),
            Operands::U8(a) => write!(f, " {a}"),
            Operands::U8x2(a, b) => write!(f, " {a}, {b}"),
            Operands::U8x3(a, b, c) => write!(f, " {a}, {b}, {c}"),
            Operands::U16(v) => write!(f, " {v}"),
            Operands::S16(v) => write!(f, " {v}"),
            Operands::U24(v) | Operands::U32(v) => write!(f, " {v}"),
            Operands::F32(v) => write!(f, " {v:?}"),
            Operands::Relative(rel) => write!(f, " {rel:+}"),
            Operands::Address(addr) => write!(f, " 0x{addr:06X}"),
            Operands::Native { argc, retc, index } => write!(f, " {argc}, {retc}, {index}"),
            Operands::Enter {
                argc,
                frame_size,
                name,
            } => {
                write!(f, " {argc}, {frame_size}")?;
                match name {
                    Some(name) => write!(f, ", {name:?}"),
                    None => Ok(()),
                }
            }
            Operands::Leave { argc, retc } => write!(f, " {argc}, {retc}"),
            Operands::Switch(cases) => {
                for (i, case) in cases.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{sep}{}:{:+}", case.value, case.offset)?;
                }
                Ok(())
            }
            Operands::InlineString(text) => write!(f, " {text:?}"),
        }
    }
}
