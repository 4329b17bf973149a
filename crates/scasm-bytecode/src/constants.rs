//! Bytecode addressing constants.

/// Size of one code page in bytes.
pub const PAGE_SIZE: usize = 0x4000;

/// `address >> PAGE_SHIFT` is the page index.
pub const PAGE_SHIFT: u32 = 14;

/// `address & PAGE_MASK` is the offset inside the page.
pub const PAGE_MASK: u32 = (PAGE_SIZE as u32) - 1;

/// Largest address an absolute (24-bit) operand can hold.
pub const MAX_CODE_ADDRESS: u32 = 0x00FF_FFFF;

/// Case count is stored in a single byte.
pub const MAX_SWITCH_CASES: usize = u8::MAX as usize;

/// Name length byte includes the terminating NUL.
pub const MAX_ENTER_NAME_LEN: usize = u8::MAX as usize - 1;

/// Longest literal an inline `STRING` can carry: opcode, u32 length and the
/// bytes must fit in one page with the guard byte reserved.
pub const MAX_INLINE_STRING_LEN: usize = PAGE_SIZE - 6;

/// Argument count occupies the upper 6 bits of the packed NATIVE byte.
pub const MAX_NATIVE_ARGS: u8 = 0x3F;

/// Return count occupies the lower 2 bits of the packed NATIVE byte.
pub const MAX_NATIVE_RETURNS: u8 = 0x03;

/// Byte size of the unconditional jump inserted before a page boundary.
pub const GUARD_JUMP_SIZE: usize = 3;

/// Page index of a code address.
#[inline]
pub fn page_of(address: u32) -> u32 {
    address >> PAGE_SHIFT
}

/// Offset of a code address inside its page.
#[inline]
pub fn page_offset(address: u32) -> u32 {
    address & PAGE_MASK
}
