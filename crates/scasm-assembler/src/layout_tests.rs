use scasm_bytecode::{Instructions, InstructionSet, Opcode, PAGE_SIZE, V10, V12, page_offset};

use crate::buffer::{CodeBuffer, InstructionRef};
use crate::layout::finalize;

const IADD: u8 = 0x01;
const NOP: u8 = 0x00;
const J: u8 = 0x55;

/// One raw slot of `len` bytes that must not end on a page boundary.
fn filler(buffer: &mut CodeBuffer, len: usize) -> InstructionRef {
    buffer.append(&vec![IADD; len])
}

#[test]
fn empty_buffer() {
    let layout = finalize(&CodeBuffer::new(), &V10).unwrap();
    assert!(layout.code().is_empty());
    assert!(layout.finalized().is_empty());
    assert_eq!(layout.guard_count(), 0);
}

#[test]
fn contiguous_without_page_break() {
    let mut buffer = CodeBuffer::new();
    let a = buffer.append(&[0x25, 7]);
    let marker = buffer.append_marker();
    let b = buffer.append(&[IADD]);

    let layout = finalize(&buffer, &V10).unwrap();
    assert_eq!(layout.code(), [0x25, 7, IADD]);
    assert_eq!(layout.get(a).unwrap().offset, 0);
    assert_eq!(layout.get(marker).unwrap().offset, 2);
    assert_eq!(layout.get(marker).unwrap().len, 0);
    assert_eq!(layout.get(b).unwrap().offset, 2);
    assert_eq!(layout.get(b).unwrap().end(), 3);
}

#[test]
fn guard_jump_and_nop_fill() {
    let mut buffer = CodeBuffer::new();
    filler(&mut buffer, 16380);
    let push = buffer.append(&[0x28, 1, 2, 3, 4]);

    let layout = finalize(&buffer, &V10).unwrap();
    let code = layout.code();
    assert_eq!(code.len(), PAGE_SIZE + 5);
    // J +1 skips the single NOP and lands on the next page.
    assert_eq!(code[16380..PAGE_SIZE], [J, 0x01, 0x00, NOP]);
    assert_eq!(layout.get(push).unwrap().offset, 0x4000);
    assert_eq!(code[PAGE_SIZE..], [0x28, 1, 2, 3, 4]);
    assert_eq!(layout.guard_count(), 1);
}

#[test]
fn short_tail_is_nop_only() {
    let mut buffer = CodeBuffer::new();
    filler(&mut buffer, 16381);
    let push = buffer.append(&[0x43, 0x34, 0x12]);

    let layout = finalize(&buffer, &V10).unwrap();
    assert_eq!(layout.code()[16381..PAGE_SIZE], [NOP, NOP, NOP]);
    assert_eq!(layout.get(push).unwrap().offset, 0x4000);
}

#[test]
fn fits_one_byte_before_boundary() {
    let mut buffer = CodeBuffer::new();
    filler(&mut buffer, 16380);
    let push = buffer.append(&[0x43, 0, 0]);

    let layout = finalize(&buffer, &V10).unwrap();
    assert_eq!(layout.get(push).unwrap().offset, 16380);
    assert_eq!(layout.guard_count(), 0);
}

#[test]
fn control_flow_may_end_at_boundary() {
    let mut buffer = CodeBuffer::new();
    filler(&mut buffer, 16381);
    let jump = buffer.append(&[J, 0, 0]);
    let next = buffer.append(&[IADD]);

    let layout = finalize(&buffer, &V10).unwrap();
    assert_eq!(layout.get(jump).unwrap().end(), PAGE_SIZE as u32);
    assert_eq!(layout.get(next).unwrap().offset, PAGE_SIZE as u32);
    assert_eq!(layout.guard_count(), 0);
}

#[test]
fn nop_may_end_at_boundary() {
    let mut buffer = CodeBuffer::new();
    filler(&mut buffer, 16383);
    let nop = buffer.append(&[NOP]);

    let layout = finalize(&buffer, &V10).unwrap();
    assert_eq!(layout.get(nop).unwrap().offset, 16383);
    assert_eq!(layout.code().len(), PAGE_SIZE);
}

#[test]
fn marker_before_break_points_at_guard() {
    let mut buffer = CodeBuffer::new();
    filler(&mut buffer, 16382);
    let marker = buffer.append_marker();
    let push = buffer.append(&[0x43, 0, 0]);

    let layout = finalize(&buffer, &V10).unwrap();
    assert_eq!(layout.get(marker).unwrap().offset, 16382);
    assert_eq!(layout.get(push).unwrap().offset, 0x4000);
}

#[test]
fn removed_slots_take_no_space() {
    let mut buffer = CodeBuffer::new();
    let a = buffer.append(&[0x25, 1]);
    let b = buffer.append(&[IADD]);
    let c = buffer.append(&[0x25, 2]);
    buffer.remove(b);

    let layout = finalize(&buffer, &V10).unwrap();
    assert_eq!(layout.code(), [0x25, 1, 0x25, 2]);
    assert_eq!(layout.finalized().len(), 3);
    assert_eq!(layout.get(a).unwrap().offset, 0);
    assert_eq!(layout.get(b).unwrap().len, 0);
    assert_eq!(layout.get(c).unwrap().offset, 2);
}

#[test]
fn guard_uses_dialect_bytes() {
    let mut buffer = CodeBuffer::new();
    filler(&mut buffer, 16380);
    buffer.append(&[0x28, 0, 0, 0, 0]);

    let layout = finalize(&buffer, &V12).unwrap();
    assert_eq!(layout.code()[16380], V12.opcode(Opcode::J).unwrap());
    assert_eq!(layout.code()[16383], V12.opcode(Opcode::Nop).unwrap());
}

#[test]
fn oversized_instruction_is_internal_error() {
    let mut buffer = CodeBuffer::new();
    filler(&mut buffer, PAGE_SIZE);

    let err = finalize(&buffer, &V10).unwrap_err();
    insta::assert_snapshot!(err, @"internal error: instruction of 16384 bytes cannot fit in a page");
}

#[test]
fn no_instruction_straddles_a_page() {
    let mut buffer = CodeBuffer::new();
    let pattern: [&[u8]; 5] = [
        &[0x28, 1, 2, 3, 4],
        &[0x43, 5, 6],
        &[IADD],
        &[J, 0, 0],
        &[0x61, 1, 2, 3],
    ];
    for i in 0..12000 {
        buffer.append(pattern[i % pattern.len()]);
    }

    let layout = finalize(&buffer, &V10).unwrap();
    assert!(layout.code().len() > 2 * PAGE_SIZE);
    assert!(layout.guard_count() > 0);

    for (at, placed) in buffer.iter().map(|at| (at, layout.get(at).unwrap())) {
        let start = page_offset(placed.offset) as usize;
        let control = V10.is_control_flow(buffer.get_bytes(at)[0]);
        let limit = if control { PAGE_SIZE } else { PAGE_SIZE - 1 };
        assert!(start + placed.len as usize <= limit, "{at:?} at {placed:?}");
    }

    // Guards and fill decode like ordinary code.
    let walked: Result<Vec<_>, _> = Instructions::new(&V10, layout.code()).collect();
    assert!(walked.is_ok());
}
