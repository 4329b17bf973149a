//! Instruction set and encoding for the paged script VM.
//!
//! This crate contains:
//! - Dialect-neutral opcodes and the per-dialect numbering tables
//! - The instruction encoder and operand decoders
//! - Narrowest-variant selection for constants and variable access

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod constants;
mod decode;
mod dialect;
mod encode;
mod instruction;
mod opcode;
mod select;

#[cfg(test)]
mod decode_tests;
#[cfg(test)]
mod encode_tests;

pub use constants::{
    GUARD_JUMP_SIZE, MAX_CODE_ADDRESS, MAX_ENTER_NAME_LEN, MAX_INLINE_STRING_LEN, MAX_NATIVE_ARGS,
    MAX_NATIVE_RETURNS, MAX_SWITCH_CASES, PAGE_MASK, PAGE_SHIFT, PAGE_SIZE, page_of, page_offset,
};
pub use decode::{
    DecodeError, Instructions, decode, read_enter_name, read_f32, read_inline_string, read_native,
    read_s16, read_switch_cases, read_u8, read_u16, read_u24, read_u32, switch_case_offset,
};
pub use dialect::{Dialect, InstructionSet, V9, V10, V11, V12};
pub use encode::{
    EncodeError, Fit, encode, encode_into, fit_signed, fit_unsigned, signed_range, unsigned_max,
};
pub use instruction::{Instruction, Operands, SwitchCase};
pub use opcode::{Opcode, Shape};
pub use select::{Access, Family, address, iadd, imul, ioffset, push_float, push_int};
