//! Bytecode emission for the paged script VM.
//!
//! Instructions are emitted into a code buffer through an [`Emitter`] (or
//! assembled from parsed listing [`Line`](syntax::Line)s), peephole-optimized,
//! laid out so that no instruction straddles a page boundary, and finally
//! relocated into an [`Image`].
//!
//! # Example
//!
//! ```
//! use scasm_assembler::{AssemblyOptions, Emitter};
//! use scasm_bytecode::Opcode;
//! use rowan::TextRange;
//!
//! let mut emitter = Emitter::new(AssemblyOptions::default());
//! emitter.define_label("top", TextRange::default());
//! emitter.push_int(5);
//! emitter.iadd(1);
//! emitter.jump(Opcode::J, "top", TextRange::default());
//!
//! let (image, warnings) = emitter.finish().expect("no errors");
//! assert!(warnings.is_empty());
//! assert_eq!(image.label("TOP"), Some(0));
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod assembler;
pub mod buffer;
pub mod diagnostics;
pub mod emitter;
pub mod image;
pub mod labels;
pub mod layout;
pub mod optimize;
pub mod options;
pub mod relocate;
pub mod syntax;

#[cfg(test)]
mod buffer_tests;
#[cfg(test)]
mod layout_tests;
#[cfg(test)]
mod relocate_tests;
#[cfg(test)]
mod test_utils;

pub use assembler::{Assembler, assemble};
pub use buffer::{CodeBuffer, InstructionRef};
pub use diagnostics::{DiagnosticKind, Diagnostics, DiagnosticsPrinter, Severity};
pub use emitter::Emitter;
pub use image::Image;
pub use labels::{LabelTable, ReferenceKind};
pub use layout::{FinalizedInstruction, Layout};
pub use options::AssemblyOptions;

/// Result type for passes that produce both output and diagnostics.
///
/// Warnings travel with the output; if any error was reported the outer
/// `Result` carries every collected diagnostic instead.
pub type PassResult<T> = std::result::Result<(T, Diagnostics), Error>;

/// Errors that stop an assembly session.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("assembly failed with {} errors", .0.error_count())]
    AssemblyFailed(Diagnostics),

    /// A broken invariant in the emitter itself, never caused by input.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for assembly operations.
pub type Result<T> = std::result::Result<T, Error>;
