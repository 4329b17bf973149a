//! Finished bytecode image.

use indexmap::IndexMap;
use scasm_bytecode::{Dialect, Instructions, PAGE_SIZE};
use scasm_core::LabelCase;
use serde::{Deserialize, Serialize};

use crate::layout::FinalizedInstruction;

/// Paged code plus the final offset of every logical instruction and label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub(crate) dialect: Dialect,
    pub(crate) code: Vec<u8>,
    pub(crate) instructions: Vec<FinalizedInstruction>,
    /// Keyed by the name folded under `label_case`.
    pub(crate) labels: IndexMap<String, ImageLabel>,
    pub(crate) label_case: LabelCase,
}

/// A resolved label: its first spelling and final address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ImageLabel {
    pub(crate) name: String,
    pub(crate) address: u32,
}

impl Image {
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Contiguous code stream; page `n` is `code[n * 0x4000..]`.
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Code split into pages.
    ///
    /// Every page but the last is full; the last holds `len % 0x4000` bytes,
    /// so it is empty when the code length is a multiple of the page size.
    pub fn pages(&self) -> Vec<&[u8]> {
        let full = self.code.len() / PAGE_SIZE;
        let mut pages: Vec<&[u8]> = self.code.chunks_exact(PAGE_SIZE).collect();
        pages.push(&self.code[full * PAGE_SIZE..]);
        pages
    }

    pub fn page_count(&self) -> usize {
        self.code.len() / PAGE_SIZE + 1
    }

    /// Final placement of each logical instruction, in emission order.
    pub fn instructions(&self) -> &[FinalizedInstruction] {
        &self.instructions
    }

    /// Final address of a label.
    pub fn label(&self, name: &str) -> Option<u32> {
        let key = self.label_case.fold(name);
        self.labels.get(key.as_ref()).map(|label| label.address)
    }

    /// Labels with their addresses, in first-mention order.
    pub fn labels(&self) -> impl Iterator<Item = (&str, u32)> {
        self.labels
            .values()
            .map(|label| (label.name.as_str(), label.address))
    }

    /// Walk the physical stream, guard jumps and fill included.
    pub fn decode(&self) -> Instructions<'_> {
        Instructions::new(self.dialect.instruction_set(), &self.code)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}
