//! Page layout.
//!
//! Copies the logical instruction sequence into one contiguous physical stream
//! so that no instruction straddles a 16384-byte page boundary. The VM only
//! checks for a page switch at control-flow opcodes and `NOP`; every other
//! instruction must end at least one byte before the page end. When an
//! instruction does not fit, the rest of the page is skipped with a `J` to the
//! next page followed by `NOP` fill, or with `NOP`s alone if fewer than four
//! bytes remain.

use scasm_bytecode::{GUARD_JUMP_SIZE, InstructionSet, Opcode, PAGE_SIZE};

use crate::Error;
use crate::buffer::{CodeBuffer, InstructionRef};

/// Physical placement of one logical instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct FinalizedInstruction {
    /// Absolute offset in the code stream. For zero-length slots, where the
    /// next instruction would start.
    pub offset: u32,
    pub len: u32,
}

impl FinalizedInstruction {
    pub fn end(self) -> u32 {
        self.offset + self.len
    }
}

/// Finalizer output: the only place physical offsets exist.
#[derive(Clone, Debug, Default)]
pub struct Layout {
    pub(crate) code: Vec<u8>,
    /// Logical order.
    pub(crate) finalized: Vec<FinalizedInstruction>,
    /// Handle -> index into `finalized`.
    pub(crate) slots: Vec<usize>,
    pub(crate) guards: usize,
}

impl Layout {
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn finalized(&self) -> &[FinalizedInstruction] {
        &self.finalized
    }

    /// Placement of an instruction by reference.
    pub fn get(&self, at: InstructionRef) -> Option<FinalizedInstruction> {
        self.slots
            .get(at.as_u32() as usize)
            .and_then(|&i| self.finalized.get(i))
            .copied()
    }

    /// Number of page breaks that needed padding.
    pub fn guard_count(&self) -> usize {
        self.guards
    }
}

struct PageWriter {
    code: Vec<u8>,
    jump: u8,
    nop: u8,
    guards: usize,
}

impl PageWriter {
    fn offset(&self) -> usize {
        self.code.len() % PAGE_SIZE
    }

    /// Skip to the start of the next page.
    fn break_page(&mut self) {
        let offset = self.offset();
        let remaining = PAGE_SIZE - offset;
        let fill = if remaining > GUARD_JUMP_SIZE {
            let rel = (PAGE_SIZE - (offset + GUARD_JUMP_SIZE)) as i16;
            self.code.push(self.jump);
            self.code.extend_from_slice(&rel.to_le_bytes());
            log::debug!(
                "page guard at 0x{:06X}: J +{rel}, {} NOPs",
                self.code.len() - GUARD_JUMP_SIZE,
                remaining - GUARD_JUMP_SIZE
            );
            remaining - GUARD_JUMP_SIZE
        } else {
            log::debug!(
                "page guard at 0x{:06X}: {remaining} NOPs",
                self.code.len()
            );
            remaining
        };
        self.code.resize(self.code.len() + fill, self.nop);
        self.guards += 1;
    }
}

/// Lay out `buffer` for `isa`.
pub fn finalize(buffer: &CodeBuffer, isa: &dyn InstructionSet) -> Result<Layout, Error> {
    let dialect_byte = |op: Opcode| {
        isa.opcode(op)
            .ok_or_else(|| Error::Internal(format!("dialect {} has no {op}", isa.name())))
    };
    let mut writer = PageWriter {
        code: Vec::with_capacity(buffer.code_len()),
        jump: dialect_byte(Opcode::J)?,
        nop: dialect_byte(Opcode::Nop)?,
        guards: 0,
    };
    let mut finalized = Vec::with_capacity(buffer.len());
    let mut slots = vec![0; buffer.len()];

    for (index, at) in buffer.iter().enumerate() {
        slots[at.as_u32() as usize] = index;
        let bytes = buffer.get_bytes(at);
        let len = bytes.len();

        if len > 0 {
            let needs_guard = !isa.is_control_flow(bytes[0]) && !isa.is_nop(bytes[0]);
            let limit = PAGE_SIZE - usize::from(needs_guard);
            if len > limit {
                return Err(Error::Internal(format!(
                    "instruction of {len} bytes cannot fit in a page"
                )));
            }
            if writer.offset() + len > limit {
                writer.break_page();
            }
        }

        finalized.push(FinalizedInstruction {
            offset: writer.code.len() as u32,
            len: len as u32,
        });
        writer.code.extend_from_slice(bytes);
    }

    Ok(Layout {
        code: writer.code,
        finalized,
        slots,
        guards: writer.guards,
    })
}
