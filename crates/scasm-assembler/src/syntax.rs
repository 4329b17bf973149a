//! Parsed listing lines, as handed over by the front end.
//!
//! Every element carries the span of its source text so diagnostics can point
//! back into the listing.

use rowan::TextRange;

/// A name with its span: a label definition or a mnemonic.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Ident {
    pub name: String,
    pub span: TextRange,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: TextRange) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum OperandKind {
    Integer(i64),
    Float(f32),
    String(String),
    /// A label reference.
    Identifier(String),
    /// `value:label` entry of a `SWITCH`.
    SwitchCase { value: i64, target: String },
}

#[derive(Clone, PartialEq, Debug)]
pub struct Operand {
    pub kind: OperandKind,
    pub span: TextRange,
}

impl Operand {
    pub fn new(kind: OperandKind, span: TextRange) -> Self {
        Self { kind, span }
    }

    /// Short description used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self.kind {
            OperandKind::Integer(_) => "integer",
            OperandKind::Float(_) => "float",
            OperandKind::String(_) => "string",
            OperandKind::Identifier(_) => "label",
            OperandKind::SwitchCase { .. } => "switch case",
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum LineKind {
    /// Nothing but an optional label.
    Empty,
    /// `.name operands...`; the name has no leading dot.
    Directive {
        name: Ident,
        operands: Vec<Operand>,
    },
    Instruction {
        mnemonic: Ident,
        operands: Vec<Operand>,
    },
}

#[derive(Clone, PartialEq, Debug)]
pub struct Line {
    pub label: Option<Ident>,
    pub kind: LineKind,
    pub span: TextRange,
}

impl Line {
    pub fn new(label: Option<Ident>, kind: LineKind, span: TextRange) -> Self {
        Self { label, kind, span }
    }
}
