#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures shared by the scasm crates.
//!
//! Currently this is the symbol interner used for label names. Label identity
//! follows a [`LabelCase`] policy so that `Loop` and `LOOP` can name the same
//! label in listings that treat identifiers case-insensitively.

mod interner;


pub use interner::{Interner, LabelCase, Symbol};
