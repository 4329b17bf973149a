//! Label table.
//!
//! Labels are created on first definition or first use, whichever comes first.
//! Uses are only recorded here; the addresses are written by the relocation
//! pass once the page layout has fixed every instruction's physical offset.

use indexmap::IndexMap;
use rowan::TextRange;
use scasm_core::{Interner, LabelCase, Symbol};

use crate::buffer::InstructionRef;
use crate::diagnostics::{DiagnosticKind, Diagnostics};

/// How a label address is written into an operand field.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReferenceKind {
    /// Signed 16-bit offset from the end of the field.
    Relative16,
    /// Absolute address in an unsigned 16-bit field, wrapped with a warning.
    AbsoluteU16,
    /// Absolute address in a signed 16-bit field, wrapped with a warning.
    AbsoluteS16,
    /// Unsigned 24-bit absolute address.
    Absolute24,
}

impl ReferenceKind {
    /// Field width in bytes.
    pub fn width(self) -> usize {
        match self {
            ReferenceKind::Relative16 | ReferenceKind::AbsoluteU16 | ReferenceKind::AbsoluteS16 => 2,
            ReferenceKind::Absolute24 => 3,
        }
    }
}

/// A label use awaiting its address.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct UnresolvedReference {
    pub instruction: InstructionRef,
    /// Byte offset of the field inside the instruction.
    pub offset: usize,
    pub kind: ReferenceKind,
    pub span: TextRange,
}

#[derive(Clone, Debug)]
pub struct Label {
    pub(crate) symbol: Symbol,
    pub(crate) target: Option<InstructionRef>,
    pub(crate) definition: Option<TextRange>,
    pub(crate) uses: Vec<UnresolvedReference>,
}

impl Label {
    fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            target: None,
            definition: None,
            uses: Vec::new(),
        }
    }

    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    /// Marker the label resolves to, once defined.
    pub fn target(&self) -> Option<InstructionRef> {
        self.target
    }

    pub fn definition(&self) -> Option<TextRange> {
        self.definition
    }

    pub fn uses(&self) -> &[UnresolvedReference] {
        &self.uses
    }

    pub fn is_defined(&self) -> bool {
        self.target.is_some()
    }
}

#[derive(Clone, Debug, Default)]
pub struct LabelTable {
    names: Interner,
    /// First-mention order.
    labels: IndexMap<Symbol, Label>,
}

impl LabelTable {
    pub fn new(case: LabelCase) -> Self {
        Self {
            names: Interner::with_case(case),
            labels: IndexMap::new(),
        }
    }

    fn entry(&mut self, name: &str) -> &mut Label {
        let symbol = self.names.intern(name);
        self.labels
            .entry(symbol)
            .or_insert_with(|| Label::new(symbol))
    }

    /// Bind `name` to `target`.
    ///
    /// A second definition is reported and ignored; the first one stays.
    pub fn define(
        &mut self,
        name: &str,
        target: InstructionRef,
        span: TextRange,
        diagnostics: &mut Diagnostics,
    ) -> Symbol {
        let label = self.entry(name);
        let symbol = label.symbol;
        match label.definition {
            Some(first) => {
                diagnostics
                    .report(DiagnosticKind::DuplicateLabel, span)
                    .message(name)
                    .related_to("first defined here", first)
                    .emit();
            }
            None => {
                label.target = Some(target);
                label.definition = Some(span);
            }
        }
        symbol
    }

    /// Record a use of `name` in the field at `offset` of `instruction`.
    pub fn reference(
        &mut self,
        name: &str,
        instruction: InstructionRef,
        offset: usize,
        kind: ReferenceKind,
        span: TextRange,
    ) -> Symbol {
        log::trace!("label use `{name}` at {instruction:?}+{offset} ({kind:?})");
        let label = self.entry(name);
        label.uses.push(UnresolvedReference {
            instruction,
            offset,
            kind,
            span,
        });
        label.symbol
    }

    pub fn get(&self, name: &str) -> Option<&Label> {
        self.names.get(name).and_then(|s| self.labels.get(&s))
    }

    pub fn resolve(&self, symbol: Symbol) -> &str {
        self.names.resolve(symbol)
    }

    pub fn case(&self) -> LabelCase {
        self.names.case()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels with their first spelling, in first-mention order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Label)> {
        self.labels
            .values()
            .map(|label| (self.names.resolve(label.symbol), label))
    }

    /// Labels used but never defined.
    pub fn undefined(&self) -> impl Iterator<Item = (&str, &Label)> {
        self.iter().filter(|(_, label)| !label.is_defined())
    }

    /// Total outstanding uses across all labels.
    pub fn pending_uses(&self) -> usize {
        self.labels.values().map(|l| l.uses.len()).sum()
    }

    pub(crate) fn into_parts(self) -> (Interner, IndexMap<Symbol, Label>) {
        (self.names, self.labels)
    }
}
