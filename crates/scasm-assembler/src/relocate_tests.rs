use rowan::TextRange;
use scasm_bytecode::{Dialect, V10};
use scasm_core::LabelCase;

use crate::Error;
use crate::buffer::CodeBuffer;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::image::Image;
use crate::labels::{LabelTable, ReferenceKind};
use crate::layout::finalize;
use crate::relocate::backpatch;
use crate::test_utils::range;

const IADD: u8 = 0x01;
const J: u8 = 0x55;
const CALL: u8 = 0x5D;

struct Session {
    buffer: CodeBuffer,
    labels: LabelTable,
    diagnostics: Diagnostics,
}

impl Session {
    fn new() -> Self {
        Self {
            buffer: CodeBuffer::new(),
            labels: LabelTable::new(LabelCase::Insensitive),
            diagnostics: Diagnostics::new(),
        }
    }

    fn label(&mut self, name: &str) {
        let marker = self.buffer.append_marker();
        self.labels
            .define(name, marker, TextRange::default(), &mut self.diagnostics);
    }

    fn jump(&mut self, name: &str, span: TextRange) {
        let at = self.buffer.append(&[J, 0, 0]);
        self.labels
            .reference(name, at, 1, ReferenceKind::Relative16, span);
    }

    fn call(&mut self, name: &str) {
        let at = self.buffer.append(&[CALL, 0, 0, 0]);
        self.labels
            .reference(name, at, 1, ReferenceKind::Absolute24, TextRange::default());
    }

    fn run(mut self) -> (Result<Image, Error>, Diagnostics) {
        let layout = finalize(&self.buffer, &V10).unwrap();
        let image = backpatch(layout, self.labels, Dialect::V10, &mut self.diagnostics);
        (image, self.diagnostics)
    }
}

#[test]
fn backward_relative_jump() {
    let mut s = Session::new();
    s.label("top");
    s.buffer.append(&[IADD]);
    s.jump("top", TextRange::default());

    let (image, diagnostics) = s.run();
    let image = image.unwrap();
    assert!(diagnostics.is_empty());
    // 0 - (1 + 1 + 2) = -4
    assert_eq!(image.code(), [IADD, J, 0xFC, 0xFF]);
    assert_eq!(image.label("TOP"), Some(0));
}

#[test]
fn forward_relative_jump() {
    let mut s = Session::new();
    s.jump("end", TextRange::default());
    s.buffer.append(&[IADD]);
    s.label("end");
    s.buffer.append(&[IADD]);

    let image = s.run().0.unwrap();
    assert_eq!(image.code(), [J, 0x01, 0x00, IADD, IADD]);
    assert_eq!(image.label("end"), Some(4));
}

#[test]
fn absolute_forward_and_backward_agree() {
    let mut s = Session::new();
    s.call("f");
    s.label("f");
    s.buffer.append(&[IADD]);
    s.call("f");

    let image = s.run().0.unwrap();
    assert_eq!(image.code(), [CALL, 4, 0, 0, IADD, CALL, 4, 0, 0]);
}

#[test]
fn label_before_page_break_resolves_to_guard() {
    let mut s = Session::new();
    s.call("far");
    s.buffer.append(&vec![IADD; 16376]);
    s.label("far");
    s.buffer.append(&[0x28, 0, 0, 0, 0]);

    let image = s.run().0.unwrap();
    // The guard jump at 0x3FFC carries execution on to 0x4000.
    assert_eq!(image.label("far"), Some(0x3FFC));
    assert_eq!(image.code()[1..4], [0xFC, 0x3F, 0x00]);
    assert_eq!(image.code()[0x3FFC..0x4000], [J, 0x01, 0x00, 0x00]);
    assert_eq!(image.code()[0x4000], 0x28);
}

#[test]
fn undefined_label_reported_once() {
    let mut s = Session::new();
    s.jump("nowhere", range(0, 9));
    s.jump("nowhere", range(10, 19));

    let (image, diagnostics) = s.run();
    let image = image.unwrap();
    assert_eq!(image.code(), [J, 0, 0, J, 0, 0]);
    assert_eq!(image.label("nowhere"), None);
    insta::assert_snapshot!(
        diagnostics.printer().render(),
        @"error at 0..9: label `nowhere` is not defined"
    );
}

#[test]
fn relative_target_too_far() {
    let mut s = Session::new();
    s.jump("far", range(0, 6));
    for _ in 0..3 {
        s.buffer.append(&vec![IADD; 10000]);
    }
    s.label("far");

    let (image, diagnostics) = s.run();
    assert!(image.is_ok());
    assert_eq!(diagnostics.kinds(), [DiagnosticKind::TargetTooFar]);
    insta::assert_snapshot!(
        diagnostics.printer().render(),
        @"error at 0..6: jump target `far` is out of 16-bit range"
    );
}

#[test]
fn reference_outside_instruction_is_internal() {
    let mut s = Session::new();
    let at = s.buffer.append(&[J, 0, 0]);
    s.labels
        .reference("x", at, 2, ReferenceKind::Absolute24, TextRange::default());
    s.label("x");

    let err = s.run().0.unwrap_err();
    insta::assert_snapshot!(err, @"internal error: use of `x` at +2 overruns a 3-byte instruction");
}

#[test]
fn absolute_16_bit_fields_hold_label_address() {
    let mut s = Session::new();
    s.buffer.append(&[IADD, IADD]);
    s.label("top");
    let push = s.buffer.append(&[0x43, 0, 0]);
    s.labels
        .reference("top", push, 1, ReferenceKind::AbsoluteS16, range(0, 3));
    let local = s.buffer.append(&[0x4C, 0, 0]);
    s.labels
        .reference("top", local, 1, ReferenceKind::AbsoluteU16, range(4, 7));

    let (image, diagnostics) = s.run();
    assert!(diagnostics.is_empty());
    assert_eq!(image.unwrap().code(), [IADD, IADD, 0x43, 2, 0, 0x4C, 2, 0]);
}

#[test]
fn signed_16_bit_field_wraps_high_address() {
    let mut s = Session::new();
    let push = s.buffer.append(&[0x43, 0, 0]);
    s.labels
        .reference("far", push, 1, ReferenceKind::AbsoluteS16, range(0, 3));
    let local = s.buffer.append(&[0x4C, 0, 0]);
    s.labels
        .reference("far", local, 1, ReferenceKind::AbsoluteU16, range(4, 7));
    for _ in 0..4 {
        s.buffer.append(&vec![IADD; 10000]);
    }
    s.label("far");

    let (image, diagnostics) = s.run();
    let image = image.unwrap();
    let far = image.label("far").unwrap();
    assert!(far > 0x7FFF && far <= 0xFFFF);

    // Only the signed field overflows; both keep the low 16 bits.
    assert_eq!(diagnostics.kinds(), [DiagnosticKind::ValueTruncated]);
    assert!(!diagnostics.has_errors());
    let expected = (far as u16).to_le_bytes();
    assert_eq!(image.code()[1..3], expected);
    assert_eq!(image.code()[4..6], expected);
    assert_eq!(
        diagnostics.printer().render(),
        format!(
            "warning at 0..3: possible loss of data, value converted to 16-bit signed integer (value was {far}, range is from -32768 to 32767)"
        )
    );
}
