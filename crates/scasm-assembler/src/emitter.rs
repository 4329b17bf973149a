//! Emission session.
//!
//! One [`Emitter`] assembles one script: instructions are encoded and appended
//! to the code buffer, label definitions and uses go to the label table, and
//! [`Emitter::finish`] runs the remaining passes in their fixed order
//! (optimize, lay out, backpatch).

use std::borrow::Cow;

use rowan::TextRange;
use scasm_bytecode::{
    Access, Dialect, EncodeError, Family, Instruction, InstructionSet, MAX_CODE_ADDRESS, Opcode,
    Operands, Shape, SwitchCase, encode, switch_case_offset,
};

use crate::buffer::{CodeBuffer, InstructionRef};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::image::Image;
use crate::labels::{LabelTable, ReferenceKind};
use crate::layout::finalize;
use crate::options::AssemblyOptions;
use crate::relocate::backpatch;
use crate::{Error, PassResult};

pub struct Emitter {
    isa: &'static dyn InstructionSet,
    options: AssemblyOptions,
    buffer: CodeBuffer,
    labels: LabelTable,
    diagnostics: Diagnostics,
    /// Most recent label marker and its name.
    last_label: Option<(InstructionRef, String)>,
}

impl Emitter {
    pub fn new(options: AssemblyOptions) -> Self {
        Self {
            isa: options.dialect.instruction_set(),
            options,
            buffer: CodeBuffer::new(),
            labels: LabelTable::new(options.label_case),
            diagnostics: Diagnostics::new(),
            last_label: None,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.options.dialect
    }

    pub fn instruction_set(&self) -> &'static dyn InstructionSet {
        self.isa
    }

    pub fn options(&self) -> &AssemblyOptions {
        &self.options
    }

    pub fn buffer(&self) -> &CodeBuffer {
        &self.buffer
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Encode and append one instruction.
    ///
    /// A 24-bit operand above `0xFFFFFF` keeps its low 24 bits and is reported
    /// as a warning. An encoding error is reported at `span` and a zeroed
    /// placeholder of the same opcode is appended instead, so later uses and
    /// diagnostics still line up.
    pub fn emit(&mut self, instruction: &Instruction, span: TextRange) -> InstructionRef {
        let instruction = match instruction.operands {
            Operands::U24(v) | Operands::Address(v) if v > MAX_CODE_ADDRESS => {
                self.diagnostics.value_truncated(i64::from(v), 24, false, span);
                let operands = match instruction.operands {
                    Operands::U24(_) => Operands::U24(v & MAX_CODE_ADDRESS),
                    _ => Operands::Address(v & MAX_CODE_ADDRESS),
                };
                Cow::Owned(Instruction::new(instruction.opcode, operands))
            }
            _ => Cow::Borrowed(instruction),
        };
        match encode(self.isa, &instruction) {
            Ok(bytes) => self.buffer.append(&bytes),
            Err(err) => {
                self.report_encode_error(&err, span);
                let placeholder =
                    encode(self.isa, &self.isa.zeroed(instruction.opcode)).unwrap_or_default();
                self.buffer.append(&placeholder)
            }
        }
    }

    /// Append raw, already-encoded bytes.
    pub fn emit_bytes(&mut self, bytes: &[u8]) -> InstructionRef {
        self.buffer.append(bytes)
    }

    pub(crate) fn report_encode_error(&mut self, err: &EncodeError, span: TextRange) {
        let kind = match err {
            EncodeError::NegativeUnsigned(_) => DiagnosticKind::NegativeUnsigned,
            _ => DiagnosticKind::EncodingFailed,
        };
        let detail = match err {
            EncodeError::NegativeUnsigned(v) => v.to_string(),
            other => other.to_string(),
        };
        self.diagnostics.report(kind, span).message(detail).emit();
    }

    fn emit_all(&mut self, instructions: &[Instruction]) -> InstructionRef {
        let mut last = None;
        for instruction in instructions {
            last = Some(self.emit(instruction, TextRange::default()));
        }
        last.unwrap_or_else(|| self.buffer.append(&[]))
    }

    /// Push an integer constant with the narrowest opcode.
    pub fn push_int(&mut self, value: i32) -> InstructionRef {
        self.emit(&scasm_bytecode::push_int(value), TextRange::default())
    }

    /// Push a float constant with the narrowest opcode.
    pub fn push_float(&mut self, value: f32) -> InstructionRef {
        self.emit(&scasm_bytecode::push_float(value), TextRange::default())
    }

    pub fn iadd(&mut self, value: i32) -> InstructionRef {
        self.emit_all(&scasm_bytecode::iadd(value))
    }

    pub fn imul(&mut self, value: i32) -> InstructionRef {
        self.emit_all(&scasm_bytecode::imul(value))
    }

    pub fn ioffset(&mut self, value: i32) -> InstructionRef {
        self.emit_all(&scasm_bytecode::ioffset(value))
    }

    /// Variable access with the narrowest index width the dialect has.
    pub fn address(
        &mut self,
        family: Family,
        access: Access,
        index: u32,
        span: TextRange,
    ) -> InstructionRef {
        match scasm_bytecode::address(self.isa, family, access, index) {
            Ok(instruction) => self.emit(&instruction, span),
            Err(err) => {
                self.report_encode_error(&err, span);
                self.buffer.append(&[])
            }
        }
    }

    /// Define `name` at the current position.
    pub fn define_label(&mut self, name: &str, span: TextRange) -> InstructionRef {
        let marker = self.buffer.append_marker();
        self.labels
            .define(name, marker, span, &mut self.diagnostics);
        self.last_label = Some((marker, name.to_owned()));
        marker
    }

    /// Name of the label defined immediately before the next instruction, if any.
    pub fn preceding_label(&self) -> Option<&str> {
        let (marker, name) = self.last_label.as_ref()?;
        let last = self.buffer.get(self.buffer.len().checked_sub(1)?)?;
        (last == *marker).then_some(name.as_str())
    }

    /// Record that the field at `offset` of `at` holds the address of `label`.
    pub fn reference(
        &mut self,
        label: &str,
        at: InstructionRef,
        offset: usize,
        kind: ReferenceKind,
        span: TextRange,
    ) {
        self.labels.reference(label, at, offset, kind, span);
    }

    /// Emit a relative jump (`J`, `JZ` or a fused compare-and-branch) to `label`.
    pub fn jump(&mut self, opcode: Opcode, label: &str, span: TextRange) -> InstructionRef {
        let placeholder = self.isa.zeroed(opcode);
        let at = self.emit(&placeholder, span);
        if self.isa.shape(opcode) == Shape::Relative {
            self.reference(label, at, 1, ReferenceKind::Relative16, span);
        } else {
            self.diagnostics
                .report(DiagnosticKind::InvalidOperand, span)
                .message(format!("`{opcode}` does not take a jump target"))
                .emit();
        }
        at
    }

    pub fn call(&mut self, label: &str, span: TextRange) -> InstructionRef {
        let at = self.emit(&Instruction::zeroed(Opcode::Call), span);
        self.reference(label, at, 1, ReferenceKind::Absolute24, span);
        at
    }

    /// Push the absolute address of `label`, for `CALLINDIRECT`.
    pub fn push_function_address(&mut self, label: &str, span: TextRange) -> InstructionRef {
        let at = self.emit(&Instruction::zeroed(Opcode::PushConstU24), span);
        self.reference(label, at, 1, ReferenceKind::Absolute24, span);
        at
    }

    /// Emit a `SWITCH` whose cases branch to labels.
    pub fn switch(&mut self, cases: &[(u32, &str)], span: TextRange) -> InstructionRef {
        let table = cases
            .iter()
            .map(|&(value, _)| SwitchCase::new(value, 0))
            .collect();
        let at = self.emit(&Instruction::switch(table), span);
        if cases.len() <= scasm_bytecode::MAX_SWITCH_CASES {
            for (i, &(_, label)) in cases.iter().enumerate() {
                let offset = switch_case_offset(i) + 4;
                self.reference(label, at, offset, ReferenceKind::Relative16, span);
            }
        }
        at
    }

    /// Emit a function prologue whose frame size is filled in later.
    pub fn enter_placeholder(
        &mut self,
        argc: u8,
        name: Option<&str>,
        span: TextRange,
    ) -> InstructionRef {
        self.emit(&Instruction::enter(argc, 0, name), span)
    }

    /// Fill in the frame size of a prologue emitted by [`Self::enter_placeholder`].
    pub fn set_frame_size(&mut self, enter: InstructionRef, frame_size: u16) -> Result<(), Error> {
        let mut bytes = self.buffer.get_bytes(enter).to_vec();
        if bytes.len() < 5 || self.isa.decode_opcode(bytes[0]) != Some(Opcode::Enter) {
            return Err(Error::Internal(format!(
                "{enter:?} is not a function prologue"
            )));
        }
        bytes[2..4].copy_from_slice(&frame_size.to_le_bytes());
        self.buffer.update(enter, &bytes);
        Ok(())
    }

    pub fn leave(&mut self, argc: u8, retc: u8) -> InstructionRef {
        self.emit(&Instruction::leave(argc, retc), TextRange::default())
    }

    pub fn native(&mut self, argc: u8, retc: u8, index: u16, span: TextRange) -> InstructionRef {
        self.emit(&Instruction::native(argc, retc, index), span)
    }

    /// Run the peephole optimizer over everything emitted so far.
    pub fn optimize(&mut self) -> Result<usize, Error> {
        crate::optimize::optimize(&mut self.buffer, self.isa)
    }

    /// Lay out and relocate.
    ///
    /// Returns the image with any warnings, or every collected error.
    pub fn finish(mut self) -> PassResult<Image> {
        if self.options.optimize && !self.diagnostics.has_errors() {
            self.optimize()?;
        }
        let layout = finalize(&self.buffer, self.isa)?;
        log::debug!(
            "laid out {} instructions in {} bytes with {} page guards",
            self.buffer.len(),
            layout.code().len(),
            layout.guard_count()
        );
        let image = backpatch(
            layout,
            self.labels,
            self.options.dialect,
            &mut self.diagnostics,
        )?;
        if self.diagnostics.has_errors() {
            return Err(Error::AssemblyFailed(self.diagnostics));
        }
        Ok((image, self.diagnostics))
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new(AssemblyOptions::default())
    }
}

