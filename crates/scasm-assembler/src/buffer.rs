//! Ordered, mutable instruction storage with stable references.
//!
//! Instruction bytes live in one append-only backing vector. Each logical
//! instruction is a slot pointing into it; an [`InstructionRef`] names a slot,
//! not a position, so it keeps pointing at the same instruction across any
//! number of insertions elsewhere in the sequence.

/// Stable handle to one logical instruction in a [`CodeBuffer`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct InstructionRef(u32);

impl InstructionRef {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Slot {
    /// Real bytes at `storage[start..start + len]`.
    Code { start: usize, len: usize },
    /// Zero-length label target.
    Marker,
    /// Zero-length after `remove`.
    Removed,
}

impl Slot {
    fn len(self) -> usize {
        match self {
            Slot::Code { len, .. } => len,
            Slot::Marker | Slot::Removed => 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CodeBuffer {
    storage: Vec<u8>,
    /// Indexed by handle.
    slots: Vec<Slot>,
    /// Handle -> current logical position.
    positions: Vec<usize>,
    /// Logical order.
    order: Vec<InstructionRef>,
    dead: usize,
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of logical instructions, markers and removed slots included.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn append(&mut self, bytes: &[u8]) -> InstructionRef {
        let slot = self.store(bytes);
        self.insert_at(self.order.len(), slot)
    }

    /// Append a zero-length label marker.
    pub fn append_marker(&mut self) -> InstructionRef {
        self.insert_at(self.order.len(), Slot::Marker)
    }

    pub fn insert_before(&mut self, at: InstructionRef, bytes: &[u8]) -> InstructionRef {
        let slot = self.store(bytes);
        self.insert_at(self.position(at), slot)
    }

    pub fn insert_after(&mut self, at: InstructionRef, bytes: &[u8]) -> InstructionRef {
        let slot = self.store(bytes);
        self.insert_at(self.position(at) + 1, slot)
    }

    /// Replace an instruction's bytes.
    ///
    /// Bytes no longer than the current ones are written in place; longer bytes
    /// go to the end of the backing storage and the old bytes become dead.
    pub fn update(&mut self, at: InstructionRef, bytes: &[u8]) {
        let slot = &mut self.slots[at.index()];
        match *slot {
            Slot::Code { start, len } if bytes.len() <= len => {
                self.storage[start..start + bytes.len()].copy_from_slice(bytes);
                *slot = Slot::Code {
                    start,
                    len: bytes.len(),
                };
                self.dead += len - bytes.len();
            }
            old => {
                self.dead += old.len();
                let start = self.storage.len();
                self.storage.extend_from_slice(bytes);
                self.slots[at.index()] = Slot::Code {
                    start,
                    len: bytes.len(),
                };
            }
        }
    }

    /// Make an instruction zero-length. The slot stays in the sequence.
    pub fn remove(&mut self, at: InstructionRef) {
        let slot = &mut self.slots[at.index()];
        self.dead += slot.len();
        *slot = Slot::Removed;
    }

    /// Current logical position of an instruction.
    pub fn position(&self, at: InstructionRef) -> usize {
        self.positions[at.index()]
    }

    /// Instruction at a logical position.
    pub fn get(&self, position: usize) -> Option<InstructionRef> {
        self.order.get(position).copied()
    }

    /// Instructions in logical order.
    pub fn iter(&self) -> impl Iterator<Item = InstructionRef> + '_ {
        self.order.iter().copied()
    }

    pub fn get_bytes(&self, at: InstructionRef) -> &[u8] {
        match self.slots[at.index()] {
            Slot::Code { start, len } => &self.storage[start..start + len],
            Slot::Marker | Slot::Removed => &[],
        }
    }

    /// First byte of the instruction, `None` for zero-length slots.
    pub fn get_opcode(&self, at: InstructionRef) -> Option<u8> {
        self.get_bytes(at).first().copied()
    }

    pub fn byte_len(&self, at: InstructionRef) -> usize {
        self.slots[at.index()].len()
    }

    pub fn byte(&self, at: InstructionRef, offset: usize) -> Option<u8> {
        self.get_bytes(at).get(offset).copied()
    }

    pub fn is_marker(&self, at: InstructionRef) -> bool {
        self.slots[at.index()] == Slot::Marker
    }

    pub fn is_removed(&self, at: InstructionRef) -> bool {
        self.slots[at.index()] == Slot::Removed
    }

    /// Bytes orphaned by growing updates, shrinking updates and removals.
    pub fn dead_bytes(&self) -> usize {
        self.dead
    }

    /// Total live bytes across all instructions.
    pub fn code_len(&self) -> usize {
        self.slots.iter().map(|s| s.len()).sum()
    }

    fn store(&mut self, bytes: &[u8]) -> Slot {
        let start = self.storage.len();
        self.storage.extend_from_slice(bytes);
        Slot::Code {
            start,
            len: bytes.len(),
        }
    }

    fn insert_at(&mut self, position: usize, slot: Slot) -> InstructionRef {
        let handle = InstructionRef(self.slots.len() as u32);
        self.slots.push(slot);
        self.positions.push(position);
        self.order.insert(position, handle);
        for moved in &self.order[position + 1..] {
            self.positions[moved.index()] += 1;
        }
        handle
    }
}
