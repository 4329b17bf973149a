use indoc::indoc;

use crate::decode::{DecodeError, Instructions, decode, read_switch_cases, switch_case_offset};
use crate::dialect::{V9, V10, V12};
use crate::encode::encode;
use crate::instruction::{Instruction, Operands, SwitchCase};
use crate::opcode::Opcode;

fn listing(bytes: &[u8], isa: &dyn crate::InstructionSet) -> String {
    Instructions::new(isa, bytes)
        .map(|item| match item {
            Ok((at, instruction)) => format!("{at:04X}  {instruction}"),
            Err(e) => format!("error: {e}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn walk_mixed_stream() {
    let program = [
        Instruction::enter(0, 2, Some("main")),
        Instruction::new(Opcode::PushConstU8, Operands::U8(5)),
        Instruction::new(Opcode::IAddU8, Operands::U8(3)),
        Instruction::new(Opcode::Jz, Operands::Relative(-6)),
        Instruction::switch(vec![SwitchCase::new(1, 4)]),
        Instruction::native(2, 1, 0x0102),
        Instruction::leave(0, 1),
    ];
    let bytes: Vec<u8> = program
        .iter()
        .flat_map(|i| encode(&V12, i).unwrap())
        .collect();

    insta::assert_snapshot!(listing(&bytes, &V12), @r#"
    0000  ENTER 0, 2, "main"
    000A  PUSH_CONST_U8 5
    000C  IADD_U8 3
    000E  JZ -6
    0011  SWITCH 1:+4
    0019  NATIVE 2, 1, 258
    001D  LEAVE 0, 1
    "#);
}

#[test]
fn decode_returns_size() {
    let bytes = [0x5D, 0x10, 0x00, 0x01, 0xFF];
    let (instruction, size) = decode(&V10, &bytes).unwrap();
    assert_eq!(size, 4);
    assert_eq!(instruction, Instruction::new(Opcode::Call, Operands::Address(0x010010)));
}

#[test]
fn unknown_opcode_stops_walk() {
    let bytes = [0x00, 0x7F, 0x00];
    let text = listing(&bytes, &V10);
    assert_eq!(
        text,
        indoc! {"
            0000  NOP
            error: unknown opcode 0x7F"}
    );
}

#[test]
fn truncated_operand() {
    assert_eq!(
        decode(&V10, &[0x43, 0x01]),
        Err(DecodeError::Truncated {
            needed: 3,
            available: 2
        })
    );
}

#[test]
fn switch_case_positions() {
    assert_eq!(switch_case_offset(0), 2);
    assert_eq!(switch_case_offset(3), 20);
    let bytes = encode(&V10, &Instruction::switch(vec![SwitchCase::new(9, -3); 2])).unwrap();
    assert_eq!(read_switch_cases(&bytes), Ok(vec![SwitchCase::new(9, -3); 2]));
}

#[test]
fn walk_inline_strings() {
    let bytes: Vec<u8> = [
        Instruction::inline_string("hello"),
        Instruction::bare(Opcode::IAdd),
        Instruction::inline_string(""),
    ]
    .iter()
    .flat_map(|i| encode(&V9, i).unwrap())
    .collect();

    insta::assert_snapshot!(listing(&bytes, &V9), @r#"
    0000  STRING "hello"
    000A  IADD
    000B  STRING ""
    "#);
}

#[test]
fn inline_string_errors() {
    assert_eq!(
        decode(&V9, &[0x63, 4, 0, 0, 0, b'a']),
        Err(DecodeError::Truncated {
            needed: 9,
            available: 6
        })
    );
    assert_eq!(decode(&V9, &[0x63, 1, 0, 0, 0, 0xFF]), Err(DecodeError::InvalidString));
}
