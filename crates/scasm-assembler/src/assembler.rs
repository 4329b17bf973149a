//! Line-driven assembler.
//!
//! Turns parsed listing lines into emitter calls. Operand problems are
//! reported per line and assembly carries on with a zeroed placeholder, so a
//! single run reports everything wrong with a listing.

use rowan::TextRange;
use scasm_bytecode::{Fit, Instruction, Opcode, Operands, Shape, fit_signed, fit_unsigned};

use crate::PassResult;
use crate::diagnostics::DiagnosticKind;
use crate::emitter::Emitter;
use crate::image::Image;
use crate::labels::ReferenceKind;
use crate::options::AssemblyOptions;
use crate::syntax::{Ident, Line, LineKind, Operand, OperandKind};

/// The only directive handled here; everything else belongs to the container layer.
const CODE_DIRECTIVE: &str = "code";

/// Assemble `lines` in one session.
pub fn assemble(lines: &[Line], options: AssemblyOptions) -> PassResult<Image> {
    Assembler::new(options).assemble(lines)
}

pub struct Assembler {
    emitter: Emitter,
}

/// Layout of one integer operand field.
#[derive(Clone, Copy)]
struct Field {
    bits: u32,
    signed: bool,
    /// Byte offset inside the instruction, if the field may hold a label.
    offset: Option<usize>,
    /// Branch displacement rather than a plain value.
    relative: bool,
}

impl Field {
    fn unsigned(bits: u32) -> Self {
        Self {
            bits,
            signed: false,
            offset: None,
            relative: false,
        }
    }

    fn signed(bits: u32) -> Self {
        Self {
            bits,
            signed: true,
            offset: None,
            relative: false,
        }
    }

    fn at(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    fn relative(mut self) -> Self {
        self.relative = true;
        self
    }

    /// How a label is written into this field, if it fits one.
    fn reference_kind(self) -> Result<ReferenceKind, DiagnosticKind> {
        match (self.bits, self.signed, self.relative) {
            (16, _, true) => Ok(ReferenceKind::Relative16),
            (16, false, false) => Ok(ReferenceKind::AbsoluteU16),
            (16, true, false) => Ok(ReferenceKind::AbsoluteS16),
            (24, ..) => Ok(ReferenceKind::Absolute24),
            (bits, ..) if bits < 16 => Err(DiagnosticKind::LabelFieldTooNarrow),
            _ => Err(DiagnosticKind::LabelFieldTooWide),
        }
    }
}

/// A label operand waiting for its instruction to be emitted.
struct PendingReference {
    label: String,
    offset: usize,
    kind: ReferenceKind,
    span: TextRange,
}

impl Assembler {
    pub fn new(options: AssemblyOptions) -> Self {
        Self {
            emitter: Emitter::new(options),
        }
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Assemble every line, then optimize, lay out and relocate.
    pub fn assemble(mut self, lines: &[Line]) -> PassResult<Image> {
        for line in lines {
            self.line(line);
        }
        log::debug!(
            "assembled {} lines into {} slots",
            lines.len(),
            self.emitter.buffer().len()
        );
        self.emitter.finish()
    }

    fn line(&mut self, line: &Line) {
        if let Some(label) = &line.label {
            self.emitter.define_label(&label.name, label.span);
        }
        match &line.kind {
            LineKind::Empty => {}
            LineKind::Directive { name, .. } => self.directive(name),
            LineKind::Instruction { mnemonic, operands } => {
                self.instruction(mnemonic, operands, line.span)
            }
        }
    }

    fn directive(&mut self, name: &Ident) {
        if name.name.eq_ignore_ascii_case(CODE_DIRECTIVE) {
            return;
        }
        self.emitter
            .diagnostics_mut()
            .report(DiagnosticKind::UnsupportedDirective, name.span)
            .message(format!(".{}", name.name))
            .emit();
    }

    fn instruction(&mut self, mnemonic: &Ident, operands: &[Operand], span: TextRange) {
        let Some(opcode) = Opcode::from_mnemonic(&mnemonic.name) else {
            self.emitter
                .diagnostics_mut()
                .report(DiagnosticKind::UnknownOpcode, mnemonic.span)
                .message(&mnemonic.name)
                .emit();
            return;
        };

        let shape = self.emitter.instruction_set().shape(opcode);
        if !self.check_operand_count(opcode, shape, operands, span) {
            let placeholder = self.emitter.instruction_set().zeroed(opcode);
            self.emitter.emit(&placeholder, span);
            return;
        }

        if opcode == Opcode::Switch {
            self.switch(operands, span);
            return;
        }

        let mut pending = Vec::new();
        let operands = self.operands(shape, operands, &mut pending);
        let at = self.emitter.emit(&Instruction::new(opcode, operands), span);

        let len = self.emitter.buffer().byte_len(at);
        for reference in pending {
            // The placeholder of an unencodable opcode may be empty.
            if reference.offset + reference.kind.width() <= len {
                self.emitter.reference(
                    &reference.label,
                    at,
                    reference.offset,
                    reference.kind,
                    reference.span,
                );
            }
        }
    }

    fn check_operand_count(
        &mut self,
        opcode: Opcode,
        shape: Shape,
        operands: &[Operand],
        span: TextRange,
    ) -> bool {
        let Some(expected) = shape.operand_count() else {
            return true;
        };
        let found = operands.len();
        let ok = match shape {
            Shape::Enter => found == expected || found == expected + 1,
            _ => found == expected,
        };
        if !ok {
            let expected = match shape {
                Shape::Enter => format!("{expected} or {}", expected + 1),
                _ => expected.to_string(),
            };
            self.emitter
                .diagnostics_mut()
                .report(DiagnosticKind::OperandCount, span)
                .message(format!("`{opcode}` expects {expected}, found {found}"))
                .emit();
        }
        ok
    }

    fn operands(
        &mut self,
        shape: Shape,
        ops: &[Operand],
        pending: &mut Vec<PendingReference>,
    ) -> Operands {
        let u8_at = |offset| Field::unsigned(8).at(offset);
        match shape {
            Shape::None => Operands::None,
            Shape::U8 => Operands::U8(self.integer(&ops[0], u8_at(1), pending) as u8),
            Shape::U8x2 => Operands::U8x2(
                self.integer(&ops[0], u8_at(1), pending) as u8,
                self.integer(&ops[1], u8_at(2), pending) as u8,
            ),
            Shape::U8x3 => Operands::U8x3(
                self.integer(&ops[0], u8_at(1), pending) as u8,
                self.integer(&ops[1], u8_at(2), pending) as u8,
                self.integer(&ops[2], u8_at(3), pending) as u8,
            ),
            Shape::U16 => {
                Operands::U16(self.integer(&ops[0], Field::unsigned(16).at(1), pending) as u16)
            }
            Shape::S16 => {
                Operands::S16(self.integer(&ops[0], Field::signed(16).at(1), pending) as i16)
            }
            Shape::U24 => {
                Operands::U24(self.integer(&ops[0], Field::unsigned(24).at(1), pending) as u32)
            }
            Shape::U32 => {
                Operands::U32(self.integer(&ops[0], Field::unsigned(32).at(1), pending) as u32)
            }
            Shape::F32 => Operands::F32(self.float(&ops[0])),
            Shape::Relative => Operands::Relative(
                self.integer(&ops[0], Field::signed(16).at(1).relative(), pending) as i16,
            ),
            Shape::Address => Operands::Address(
                self.integer(&ops[0], Field::unsigned(24).at(1), pending) as u32,
            ),
            Shape::Native => Operands::Native {
                argc: self.integer(&ops[0], Field::unsigned(8), pending) as u8,
                retc: self.integer(&ops[1], Field::unsigned(8), pending) as u8,
                index: self.integer(&ops[2], Field::unsigned(16), pending) as u16,
            },
            Shape::Enter => Operands::Enter {
                argc: self.integer(&ops[0], Field::unsigned(8), pending) as u8,
                frame_size: self.integer(&ops[1], Field::unsigned(16), pending) as u16,
                name: self.function_name(ops.get(2)),
            },
            Shape::Leave => Operands::Leave {
                argc: self.integer(&ops[0], Field::unsigned(8), pending) as u8,
                retc: self.integer(&ops[1], Field::unsigned(8), pending) as u8,
            },
            Shape::Switch => Operands::Switch(Vec::new()),
            Shape::InlineString => Operands::InlineString(self.string(&ops[0])),
        }
    }

    /// Integer value of `operand` narrowed to `field`.
    ///
    /// A label operand is queued in `pending` when the field can hold one and
    /// reads as zero.
    fn integer(
        &mut self,
        operand: &Operand,
        field: Field,
        pending: &mut Vec<PendingReference>,
    ) -> i64 {
        match &operand.kind {
            OperandKind::Integer(value) => self.narrow(*value, field, operand.span),
            OperandKind::Float(value) => {
                let truncated = value.trunc() as i64;
                self.emitter
                    .diagnostics_mut()
                    .report(DiagnosticKind::FloatTruncated, operand.span)
                    .message(format!("{value} becomes {truncated}"))
                    .emit();
                self.narrow(truncated, field, operand.span)
            }
            OperandKind::Identifier(label) => {
                self.label_field(label, field, operand.span, pending);
                0
            }
            OperandKind::String(_) | OperandKind::SwitchCase { .. } => {
                self.invalid_operand(operand, "integer");
                0
            }
        }
    }

    fn narrow(&mut self, value: i64, field: Field, span: TextRange) -> i64 {
        let bits = field.bits;
        if field.signed {
            let fit = fit_signed(value, bits);
            if fit.is_truncated() {
                self.emitter
                    .diagnostics_mut()
                    .value_truncated(value, bits, true, span);
            }
            return i64::from(fit.value());
        }
        match fit_unsigned(value, bits) {
            Ok(Fit::Exact(v)) => i64::from(v),
            Ok(Fit::Truncated(v)) => {
                self.emitter
                    .diagnostics_mut()
                    .value_truncated(value, bits, false, span);
                i64::from(v)
            }
            Err(_) => {
                self.emitter
                    .diagnostics_mut()
                    .report(DiagnosticKind::NegativeUnsigned, span)
                    .message(value.to_string())
                    .emit();
                0
            }
        }
    }

    fn label_field(
        &mut self,
        label: &str,
        field: Field,
        span: TextRange,
        pending: &mut Vec<PendingReference>,
    ) {
        let Some(offset) = field.offset else {
            self.emitter
                .diagnostics_mut()
                .report(DiagnosticKind::LabelNotAllowed, span)
                .emit();
            return;
        };
        match field.reference_kind() {
            Ok(kind) => pending.push(PendingReference {
                label: label.to_owned(),
                offset,
                kind,
                span,
            }),
            Err(kind) => self.emitter.diagnostics_mut().report(kind, span).emit(),
        }
    }

    fn float(&mut self, operand: &Operand) -> f32 {
        match &operand.kind {
            OperandKind::Float(value) => *value,
            OperandKind::Integer(value) => *value as f32,
            OperandKind::Identifier(_) => {
                self.emitter
                    .diagnostics_mut()
                    .report(DiagnosticKind::LabelNotAllowed, operand.span)
                    .emit();
                0.0
            }
            OperandKind::String(_) | OperandKind::SwitchCase { .. } => {
                self.invalid_operand(operand, "float");
                0.0
            }
        }
    }

    fn string(&mut self, operand: &Operand) -> String {
        match &operand.kind {
            OperandKind::String(text) => text.clone(),
            _ => {
                self.invalid_operand(operand, "string");
                String::new()
            }
        }
    }

    /// `ENTER` name: an explicit string wins, then the preceding label if enabled.
    fn function_name(&mut self, operand: Option<&Operand>) -> Option<String> {
        match operand {
            Some(Operand {
                kind: OperandKind::String(name),
                ..
            }) => Some(name.clone()),
            Some(other) => {
                self.invalid_operand(other, "string");
                None
            }
            None if self.emitter.options().include_function_names => {
                self.emitter.preceding_label().map(str::to_owned)
            }
            None => None,
        }
    }

    fn switch(&mut self, operands: &[Operand], span: TextRange) {
        let mut cases = Vec::with_capacity(operands.len());
        for operand in operands {
            let OperandKind::SwitchCase { value, target } = &operand.kind else {
                self.invalid_operand(operand, "switch case");
                continue;
            };
            let value = self.narrow(*value, Field::unsigned(32), operand.span) as u32;
            cases.push((value, target.as_str()));
        }
        self.emitter.switch(&cases, span);
    }

    fn invalid_operand(&mut self, operand: &Operand, expected: &str) {
        self.emitter
            .diagnostics_mut()
            .report(DiagnosticKind::InvalidOperand, operand.span)
            .message(format!("expected {expected}, found {}", operand.describe()))
            .emit();
    }
}
