use crate::constants::{MAX_INLINE_STRING_LEN, PAGE_SIZE};
use crate::dialect::{V9, V10, V12};
use crate::encode::{EncodeError, Fit, encode, encode_into, fit_signed, fit_unsigned};
use crate::instruction::{Instruction, Operands, SwitchCase};
use crate::opcode::{Opcode, Shape};

#[test]
fn bare_opcode() {
    assert_eq!(encode(&V10, &Instruction::bare(Opcode::IAdd)), Ok(vec![0x01]));
}

#[test]
fn little_endian_operands() {
    let push = Instruction::new(Opcode::PushConstS16, Operands::S16(-2));
    assert_eq!(encode(&V10, &push), Ok(vec![0x43, 0xFE, 0xFF]));

    let global = Instruction::new(Opcode::GlobalU24, Operands::U24(0x123456));
    assert_eq!(encode(&V10, &global), Ok(vec![0x5E, 0x56, 0x34, 0x12]));
    assert_eq!(encode(&V12, &global), Ok(vec![0x61, 0x56, 0x34, 0x12]));

    let float = Instruction::new(Opcode::PushConstF, Operands::F32(1.5));
    assert_eq!(encode(&V10, &float), Ok(vec![0x29, 0x00, 0x00, 0xC0, 0x3F]));
}

#[test]
fn enter_with_name() {
    let bytes = encode(&V10, &Instruction::enter(1, 2, Some("main"))).unwrap();
    assert_eq!(bytes, vec![0x2D, 1, 2, 0, 5, b'm', b'a', b'i', b'n', 0]);
}

#[test]
fn enter_without_name() {
    let bytes = encode(&V10, &Instruction::enter(0, 300, None)).unwrap();
    assert_eq!(bytes, vec![0x2D, 0, 0x2C, 0x01, 0]);
}

#[test]
fn enter_name_limits() {
    let long = "x".repeat(255);
    assert_eq!(
        encode(&V10, &Instruction::enter(0, 0, Some(&long))),
        Err(EncodeError::NameTooLong(255))
    );
    let max = "x".repeat(254);
    assert_eq!(encode(&V10, &Instruction::enter(0, 0, Some(&max))).unwrap().len(), 260);
    assert_eq!(
        encode(&V10, &Instruction::enter(0, 0, Some("a\0b"))),
        Err(EncodeError::NameContainsNul)
    );
}

#[test]
fn native_packing() {
    let bytes = encode(&V10, &Instruction::native(3, 1, 0x1234)).unwrap();
    assert_eq!(bytes, vec![0x2C, 0x0D, 0x12, 0x34]);

    assert_eq!(
        encode(&V10, &Instruction::native(64, 0, 0)),
        Err(EncodeError::TooManyNativeArgs(64))
    );
    assert_eq!(
        encode(&V10, &Instruction::native(0, 4, 0)),
        Err(EncodeError::TooManyNativeReturns(4))
    );
}

#[test]
fn switch_table() {
    let cases = vec![SwitchCase::new(7, 0x10), SwitchCase::new(0xAABBCCDD, -1)];
    let bytes = encode(&V10, &Instruction::switch(cases)).unwrap();
    assert_eq!(
        bytes,
        vec![
            0x62, 2, //
            7, 0, 0, 0, 0x10, 0, //
            0xDD, 0xCC, 0xBB, 0xAA, 0xFF, 0xFF,
        ]
    );
}

#[test]
fn switch_rejects_256_cases() {
    let cases = vec![SwitchCase::default(); 256];
    assert_eq!(
        encode(&V10, &Instruction::switch(cases)),
        Err(EncodeError::TooManySwitchCases(256))
    );
    let cases = vec![SwitchCase::default(); 255];
    assert_eq!(encode(&V10, &Instruction::switch(cases)).unwrap().len(), 2 + 255 * 6);
}

#[test]
fn inline_string_layout() {
    let bytes = encode(&V9, &Instruction::inline_string("hi")).unwrap();
    assert_eq!(bytes, vec![0x63, 2, 0, 0, 0, b'h', b'i']);
    assert_eq!(encode(&V9, &Instruction::inline_string("")), Ok(vec![0x63, 0, 0, 0, 0]));
}

#[test]
fn string_shape_follows_dialect() {
    assert_eq!(encode(&V10, &Instruction::bare(Opcode::String)), Ok(vec![0x63]));
    assert_eq!(
        encode(&V10, &Instruction::inline_string("hi")),
        Err(EncodeError::ShapeMismatch {
            opcode: Opcode::String,
            expected: Shape::None,
            found: Shape::InlineString,
        })
    );
    assert_eq!(
        encode(&V9, &Instruction::bare(Opcode::String)),
        Err(EncodeError::ShapeMismatch {
            opcode: Opcode::String,
            expected: Shape::InlineString,
            found: Shape::None,
        })
    );
}

#[test]
fn inline_string_must_fit_a_page() {
    let max = "x".repeat(MAX_INLINE_STRING_LEN);
    let bytes = encode(&V9, &Instruction::inline_string(&max)).unwrap();
    assert_eq!(bytes.len(), PAGE_SIZE - 1);

    let long = "x".repeat(MAX_INLINE_STRING_LEN + 1);
    let err = encode(&V9, &Instruction::inline_string(&long)).unwrap_err();
    assert_eq!(err, EncodeError::StringTooLong(16379));
    insta::assert_snapshot!(err, @"inline string is 16379 bytes long (max 16378)");
}

#[test]
fn unsupported_in_dialect() {
    let err = encode(&V10, &Instruction::zeroed(Opcode::StaticU24)).unwrap_err();
    insta::assert_snapshot!(err, @"`STATIC_U24` is not available in dialect V10");
    assert_eq!(encode(&V12, &Instruction::zeroed(Opcode::StaticU24)), Ok(vec![0x5E, 0, 0, 0]));
}

#[test]
fn shape_mismatch() {
    let wrong = Instruction::new(Opcode::J, Operands::U8(1));
    assert_eq!(
        encode(&V10, &wrong),
        Err(EncodeError::ShapeMismatch {
            opcode: Opcode::J,
            expected: Shape::Relative,
            found: Shape::U8,
        })
    );
}

#[test]
fn address_out_of_range() {
    let call = Instruction::new(Opcode::Call, Operands::Address(0x0100_0000));
    assert_eq!(
        encode(&V10, &call),
        Err(EncodeError::OutOfRange {
            value: 0x0100_0000,
            bits: 24
        })
    );
}

#[test]
fn encode_into_leaves_buffer_on_error() {
    let mut out = vec![0xAA];
    let bad = Instruction::switch(vec![SwitchCase::default(); 300]);
    assert!(encode_into(&V10, &bad, &mut out).is_err());
    assert_eq!(out, vec![0xAA]);
}

#[test]
fn fit_unsigned_ranges() {
    assert_eq!(fit_unsigned(255, 8), Ok(Fit::Exact(255)));
    assert_eq!(fit_unsigned(256, 8), Ok(Fit::Truncated(0)));
    assert_eq!(fit_unsigned(0x1_0001, 16), Ok(Fit::Truncated(1)));
    assert_eq!(fit_unsigned(-1, 8), Err(EncodeError::NegativeUnsigned(-1)));
    assert!(!fit_unsigned(0xFF_FFFF, 24).unwrap().is_truncated());
}

#[test]
fn fit_signed_ranges() {
    assert_eq!(fit_signed(-32768, 16), Fit::Exact(-32768));
    assert_eq!(fit_signed(32767, 16), Fit::Exact(32767));
    assert_eq!(fit_signed(32768, 16), Fit::Truncated(-32768));
    assert_eq!(fit_signed(-1, 32).value(), -1);
}
