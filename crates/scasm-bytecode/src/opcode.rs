//! Dialect-neutral opcode enumeration.
//!
//! `Opcode` names every instruction any supported dialect knows about. The
//! discriminants follow the V11 numbering; the V12-only `STATIC_U24` family is
//! appended after `IBITTEST`. Byte values for a concrete dialect come from
//! [`InstructionSet`](crate::InstructionSet), never from `as u8`.

use std::fmt;

/// Operand layout that follows the opcode byte.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Shape {
    None,
    U8,
    U8x2,
    U8x3,
    U16,
    S16,
    U24,
    U32,
    F32,
    /// Signed 16-bit offset relative to the end of the operand.
    Relative,
    /// Unsigned 24-bit absolute code address.
    Address,
    /// Packed arg/return counts, big-endian native index.
    Native,
    /// Arg count, frame size, length-prefixed NUL-terminated name.
    Enter,
    /// Arg count, return count.
    Leave,
    /// Case count, then `(u32 value, s16 offset)` pairs.
    Switch,
    /// u32 length, then that many raw bytes with no terminator.
    InlineString,
}

impl Shape {
    /// Total instruction size including the opcode byte, or 0 if variable.
    pub fn constant_size(self) -> usize {
        match self {
            Shape::None => 1,
            Shape::U8 => 2,
            Shape::U8x2 | Shape::U16 | Shape::S16 | Shape::Relative | Shape::Leave => 3,
            Shape::U8x3 | Shape::U24 | Shape::Address | Shape::Native => 4,
            Shape::U32 | Shape::F32 => 5,
            Shape::Enter | Shape::Switch | Shape::InlineString => 0,
        }
    }

    pub fn is_variable(self) -> bool {
        self.constant_size() == 0
    }

    /// Number of operands a listing supplies for this shape.
    ///
    /// `None` means any number (switch cases). ENTER accepts an optional
    /// third name operand on top of the two counted here.
    pub fn operand_count(self) -> Option<usize> {
        match self {
            Shape::None => Some(0),
            Shape::U8
            | Shape::U16
            | Shape::S16
            | Shape::U24
            | Shape::U32
            | Shape::F32
            | Shape::Relative
            | Shape::Address
            | Shape::InlineString => Some(1),
            Shape::U8x2 | Shape::Leave | Shape::Enter => Some(2),
            Shape::U8x3 | Shape::Native => Some(3),
            Shape::Switch => None,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Shape::None => "no operands",
            Shape::U8 => "u8",
            Shape::U8x2 => "u8, u8",
            Shape::U8x3 => "u8, u8, u8",
            Shape::U16 => "u16",
            Shape::S16 => "s16",
            Shape::U24 => "u24",
            Shape::U32 => "u32",
            Shape::F32 => "f32",
            Shape::Relative => "relative offset",
            Shape::Address => "code address",
            Shape::Native => "native call",
            Shape::Enter => "function prologue",
            Shape::Leave => "function epilogue",
            Shape::Switch => "switch table",
            Shape::InlineString => "inline string",
        };
        f.write_str(s)
    }
}

macro_rules! opcodes {
    ($($variant:ident = $value:literal, $mnemonic:literal, $shape:ident;)*) => {
        /// Instruction opcodes across all dialects.
        #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum Opcode {
            $($variant = $value,)*
        }

        impl Opcode {
            /// Every opcode, indexed by discriminant.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)*];

            /// Assembly mnemonic, e.g. `PUSH_CONST_U8`.
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $mnemonic,)*
                }
            }

            /// Operand layout following the opcode byte.
            pub fn shape(self) -> Shape {
                match self {
                    $(Opcode::$variant => Shape::$shape,)*
                }
            }
        }
    };
}

opcodes! {
    Nop = 0x00, "NOP", None;
    IAdd = 0x01, "IADD", None;
    ISub = 0x02, "ISUB", None;
    IMul = 0x03, "IMUL", None;
    IDiv = 0x04, "IDIV", None;
    IMod = 0x05, "IMOD", None;
    INot = 0x06, "INOT", None;
    INeg = 0x07, "INEG", None;
    IEq = 0x08, "IEQ", None;
    INe = 0x09, "INE", None;
    IGt = 0x0A, "IGT", None;
    IGe = 0x0B, "IGE", None;
    ILt = 0x0C, "ILT", None;
    ILe = 0x0D, "ILE", None;
    FAdd = 0x0E, "FADD", None;
    FSub = 0x0F, "FSUB", None;
    FMul = 0x10, "FMUL", None;
    FDiv = 0x11, "FDIV", None;
    FMod = 0x12, "FMOD", None;
    FNeg = 0x13, "FNEG", None;
    FEq = 0x14, "FEQ", None;
    FNe = 0x15, "FNE", None;
    FGt = 0x16, "FGT", None;
    FGe = 0x17, "FGE", None;
    FLt = 0x18, "FLT", None;
    FLe = 0x19, "FLE", None;
    VAdd = 0x1A, "VADD", None;
    VSub = 0x1B, "VSUB", None;
    VMul = 0x1C, "VMUL", None;
    VDiv = 0x1D, "VDIV", None;
    VNeg = 0x1E, "VNEG", None;
    IAnd = 0x1F, "IAND", None;
    IOr = 0x20, "IOR", None;
    IXor = 0x21, "IXOR", None;
    I2F = 0x22, "I2F", None;
    F2I = 0x23, "F2I", None;
    F2V = 0x24, "F2V", None;
    PushConstU8 = 0x25, "PUSH_CONST_U8", U8;
    PushConstU8U8 = 0x26, "PUSH_CONST_U8_U8", U8x2;
    PushConstU8U8U8 = 0x27, "PUSH_CONST_U8_U8_U8", U8x3;
    PushConstU32 = 0x28, "PUSH_CONST_U32", U32;
    PushConstF = 0x29, "PUSH_CONST_F", F32;
    Dup = 0x2A, "DUP", None;
    Drop = 0x2B, "DROP", None;
    Native = 0x2C, "NATIVE", Native;
    Enter = 0x2D, "ENTER", Enter;
    Leave = 0x2E, "LEAVE", Leave;
    Load = 0x2F, "LOAD", None;
    Store = 0x30, "STORE", None;
    StoreRev = 0x31, "STORE_REV", None;
    LoadN = 0x32, "LOAD_N", None;
    StoreN = 0x33, "STORE_N", None;
    ArrayU8 = 0x34, "ARRAY_U8", U8;
    ArrayU8Load = 0x35, "ARRAY_U8_LOAD", U8;
    ArrayU8Store = 0x36, "ARRAY_U8_STORE", U8;
    LocalU8 = 0x37, "LOCAL_U8", U8;
    LocalU8Load = 0x38, "LOCAL_U8_LOAD", U8;
    LocalU8Store = 0x39, "LOCAL_U8_STORE", U8;
    StaticU8 = 0x3A, "STATIC_U8", U8;
    StaticU8Load = 0x3B, "STATIC_U8_LOAD", U8;
    StaticU8Store = 0x3C, "STATIC_U8_STORE", U8;
    IAddU8 = 0x3D, "IADD_U8", U8;
    IMulU8 = 0x3E, "IMUL_U8", U8;
    IOffset = 0x3F, "IOFFSET", None;
    IOffsetU8 = 0x40, "IOFFSET_U8", U8;
    IOffsetU8Load = 0x41, "IOFFSET_U8_LOAD", U8;
    IOffsetU8Store = 0x42, "IOFFSET_U8_STORE", U8;
    PushConstS16 = 0x43, "PUSH_CONST_S16", S16;
    IAddS16 = 0x44, "IADD_S16", S16;
    IMulS16 = 0x45, "IMUL_S16", S16;
    IOffsetS16 = 0x46, "IOFFSET_S16", S16;
    IOffsetS16Load = 0x47, "IOFFSET_S16_LOAD", S16;
    IOffsetS16Store = 0x48, "IOFFSET_S16_STORE", S16;
    ArrayU16 = 0x49, "ARRAY_U16", U16;
    ArrayU16Load = 0x4A, "ARRAY_U16_LOAD", U16;
    ArrayU16Store = 0x4B, "ARRAY_U16_STORE", U16;
    LocalU16 = 0x4C, "LOCAL_U16", U16;
    LocalU16Load = 0x4D, "LOCAL_U16_LOAD", U16;
    LocalU16Store = 0x4E, "LOCAL_U16_STORE", U16;
    StaticU16 = 0x4F, "STATIC_U16", U16;
    StaticU16Load = 0x50, "STATIC_U16_LOAD", U16;
    StaticU16Store = 0x51, "STATIC_U16_STORE", U16;
    GlobalU16 = 0x52, "GLOBAL_U16", U16;
    GlobalU16Load = 0x53, "GLOBAL_U16_LOAD", U16;
    GlobalU16Store = 0x54, "GLOBAL_U16_STORE", U16;
    J = 0x55, "J", Relative;
    Jz = 0x56, "JZ", Relative;
    IEqJz = 0x57, "IEQ_JZ", Relative;
    INeJz = 0x58, "INE_JZ", Relative;
    IGtJz = 0x59, "IGT_JZ", Relative;
    IGeJz = 0x5A, "IGE_JZ", Relative;
    ILtJz = 0x5B, "ILT_JZ", Relative;
    ILeJz = 0x5C, "ILE_JZ", Relative;
    Call = 0x5D, "CALL", Address;
    GlobalU24 = 0x5E, "GLOBAL_U24", U24;
    GlobalU24Load = 0x5F, "GLOBAL_U24_LOAD", U24;
    GlobalU24Store = 0x60, "GLOBAL_U24_STORE", U24;
    PushConstU24 = 0x61, "PUSH_CONST_U24", U24;
    Switch = 0x62, "SWITCH", Switch;
    String = 0x63, "STRING", None;
    StringHash = 0x64, "STRINGHASH", None;
    TextLabelAssignString = 0x65, "TEXT_LABEL_ASSIGN_STRING", U8;
    TextLabelAssignInt = 0x66, "TEXT_LABEL_ASSIGN_INT", U8;
    TextLabelAppendString = 0x67, "TEXT_LABEL_APPEND_STRING", U8;
    TextLabelAppendInt = 0x68, "TEXT_LABEL_APPEND_INT", U8;
    TextLabelCopy = 0x69, "TEXT_LABEL_COPY", None;
    Catch = 0x6A, "CATCH", None;
    Throw = 0x6B, "THROW", None;
    CallIndirect = 0x6C, "CALLINDIRECT", None;
    PushConstM1 = 0x6D, "PUSH_CONST_M1", None;
    PushConst0 = 0x6E, "PUSH_CONST_0", None;
    PushConst1 = 0x6F, "PUSH_CONST_1", None;
    PushConst2 = 0x70, "PUSH_CONST_2", None;
    PushConst3 = 0x71, "PUSH_CONST_3", None;
    PushConst4 = 0x72, "PUSH_CONST_4", None;
    PushConst5 = 0x73, "PUSH_CONST_5", None;
    PushConst6 = 0x74, "PUSH_CONST_6", None;
    PushConst7 = 0x75, "PUSH_CONST_7", None;
    PushConstFm1 = 0x76, "PUSH_CONST_FM1", None;
    PushConstF0 = 0x77, "PUSH_CONST_F0", None;
    PushConstF1 = 0x78, "PUSH_CONST_F1", None;
    PushConstF2 = 0x79, "PUSH_CONST_F2", None;
    PushConstF3 = 0x7A, "PUSH_CONST_F3", None;
    PushConstF4 = 0x7B, "PUSH_CONST_F4", None;
    PushConstF5 = 0x7C, "PUSH_CONST_F5", None;
    PushConstF6 = 0x7D, "PUSH_CONST_F6", None;
    PushConstF7 = 0x7E, "PUSH_CONST_F7", None;
    IBitTest = 0x7F, "IBITTEST", None;
    StaticU24 = 0x80, "STATIC_U24", U24;
    StaticU24Load = 0x81, "STATIC_U24_LOAD", U24;
    StaticU24Store = 0x82, "STATIC_U24_STORE", U24;
}

impl Opcode {
    /// Look up an opcode by mnemonic, ignoring ASCII case.
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(name))
    }

    /// Conditional and unconditional relative jumps.
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Self::J
                | Self::Jz
                | Self::IEqJz
                | Self::INeJz
                | Self::IGtJz
                | Self::IGeJz
                | Self::ILtJz
                | Self::ILeJz
        )
    }

    /// Opcodes at which the interpreter re-checks the current page.
    ///
    /// Together with `NOP`, these are the only instructions allowed to end
    /// exactly at a page boundary.
    pub fn is_control_flow(self) -> bool {
        self.is_jump()
            || matches!(
                self,
                Self::Leave | Self::Call | Self::Switch | Self::Throw | Self::CallIndirect
            )
    }

    /// Constant pushed by a one-byte integer shorthand (`PUSH_CONST_M1..7`).
    pub fn int_shorthand_value(self) -> Option<i32> {
        match self {
            Self::PushConstM1 => Some(-1),
            op if (Self::PushConst0..=Self::PushConst7).contains(&op) => {
                Some(op as i32 - Self::PushConst0 as i32)
            }
            _ => None,
        }
    }

    /// Constant pushed by a one-byte float shorthand (`PUSH_CONST_FM1..F7`).
    pub fn float_shorthand_value(self) -> Option<f32> {
        match self {
            Self::PushConstFm1 => Some(-1.0),
            op if (Self::PushConstF0..=Self::PushConstF7).contains(&op) => {
                Some((op as i32 - Self::PushConstF0 as i32) as f32)
            }
            _ => None,
        }
    }

    /// The one-byte shorthand pushing `value`, if there is one.
    pub fn int_shorthand(value: i32) -> Option<Self> {
        match value {
            -1 => Some(Self::PushConstM1),
            0..=7 => Some(Self::ALL[(Self::PushConst0 as i32 + value) as usize]),
            _ => None,
        }
    }

    /// The one-byte shorthand pushing exactly `value` (bitwise), if there is one.
    pub fn float_shorthand(value: f32) -> Option<Self> {
        if value.to_bits() == (-1.0f32).to_bits() {
            return Some(Self::PushConstFm1);
        }
        (0..=7u8)
            .find(|&n| value.to_bits() == (n as f32).to_bits())
            .map(|n| Self::ALL[Self::PushConstF0 as usize + n as usize])
    }

    /// The fused compare-and-branch for an integer comparison (`IEQ` -> `IEQ_JZ`).
    pub fn compare_and_jump(self) -> Option<Self> {
        match self {
            Self::IEq => Some(Self::IEqJz),
            Self::INe => Some(Self::INeJz),
            Self::IGt => Some(Self::IGtJz),
            Self::IGe => Some(Self::IGeJz),
            Self::ILt => Some(Self::ILtJz),
            Self::ILe => Some(Self::ILeJz),
            _ => None,
        }
    }

    /// The `_LOAD` and `_STORE` forms of an address-producing opcode.
    pub fn load_store_forms(self) -> Option<(Self, Self)> {
        match self {
            Self::ArrayU8 => Some((Self::ArrayU8Load, Self::ArrayU8Store)),
            Self::ArrayU16 => Some((Self::ArrayU16Load, Self::ArrayU16Store)),
            Self::LocalU8 => Some((Self::LocalU8Load, Self::LocalU8Store)),
            Self::LocalU16 => Some((Self::LocalU16Load, Self::LocalU16Store)),
            Self::StaticU8 => Some((Self::StaticU8Load, Self::StaticU8Store)),
            Self::StaticU16 => Some((Self::StaticU16Load, Self::StaticU16Store)),
            Self::StaticU24 => Some((Self::StaticU24Load, Self::StaticU24Store)),
            Self::GlobalU16 => Some((Self::GlobalU16Load, Self::GlobalU16Store)),
            Self::GlobalU24 => Some((Self::GlobalU24Load, Self::GlobalU24Store)),
            Self::IOffsetU8 => Some((Self::IOffsetU8Load, Self::IOffsetU8Store)),
            Self::IOffsetS16 => Some((Self::IOffsetS16Load, Self::IOffsetS16Store)),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
