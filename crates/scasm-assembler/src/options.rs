//! Per-session assembly options.

use scasm_bytecode::Dialect;
use scasm_core::LabelCase;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyOptions {
    /// Opcode numbering table to emit.
    pub dialect: Dialect,
    /// Run the peephole optimizer before layout.
    pub optimize: bool,
    /// Embed the preceding label as the `ENTER` name when none is given.
    pub include_function_names: bool,
    pub label_case: LabelCase,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            optimize: true,
            include_function_names: false,
            label_case: LabelCase::default(),
        }
    }
}

impl AssemblyOptions {
    /// Parse options from their JSON form. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn with_function_names(mut self, include: bool) -> Self {
        self.include_function_names = include;
        self
    }

    pub fn with_label_case(mut self, case: LabelCase) -> Self {
        self.label_case = case;
        self
    }
}
