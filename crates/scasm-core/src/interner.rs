//! Label-name interning.
//!
//! Converts label names into cheap integer handles (`Symbol`). Two names map
//! to the same symbol when they are equal under the interner's [`LabelCase`]
//! policy; the first spelling seen is the one reported back by `resolve`.

use std::borrow::Cow;
use std::collections::HashMap;

/// How label names are compared.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelCase {
    /// `Loop` and `loop` are distinct labels.
    Sensitive,
    /// ASCII case is ignored: `Loop` and `LOOP` are the same label.
    #[default]
    Insensitive,
}

impl LabelCase {
    /// Lookup key for `name`: two spellings fold to the same key exactly when
    /// they name the same label.
    pub fn fold(self, name: &str) -> Cow<'_, str> {
        match self {
            LabelCase::Insensitive if name.bytes().any(|b| b.is_ascii_uppercase()) => {
                Cow::Owned(name.to_ascii_lowercase())
            }
            _ => Cow::Borrowed(name),
        }
    }

    /// Whether two spellings name the same label under this policy.
    pub fn matches(self, a: &str, b: &str) -> bool {
        match self {
            LabelCase::Sensitive => a == b,
            LabelCase::Insensitive => a.eq_ignore_ascii_case(b),
        }
    }
}

/// A lightweight handle to an interned name.
///
/// Symbols are ordered by insertion order, not lexicographically.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Symbol(u32);

impl Symbol {
    /// Raw index for serialization/debugging.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Create a Symbol from a raw index. Use only for deserialization.
    #[inline]
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }
}

/// Name interner. Deduplicates names under a case policy.
#[derive(Debug, Clone, Default)]
pub struct Interner {
    case: LabelCase,
    /// Folded name -> symbol.
    map: HashMap<String, Symbol>,
    /// First spelling of each name, indexed by Symbol.
    names: Vec<String>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_case(case: LabelCase) -> Self {
        Self {
            case,
            ..Self::default()
        }
    }

    pub fn case(&self) -> LabelCase {
        self.case
    }

    /// Intern a name, returning its Symbol.
    /// If an equal name was already interned, returns the existing Symbol.
    pub fn intern(&mut self, name: &str) -> Symbol {
        let key = self.case.fold(name);
        if let Some(&sym) = self.map.get(key.as_ref()) {
            return sym;
        }

        let sym = Symbol(self.names.len() as u32);
        self.map.insert(key.into_owned(), sym);
        self.names.push(name.to_owned());
        sym
    }

    /// Look a name up without interning it.
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.map.get(self.case.fold(name).as_ref()).copied()
    }

    /// Resolve a Symbol back to the first spelling of its name.
    ///
    /// # Panics
    /// Panics if the symbol was not created by this interner.
    #[inline]
    pub fn resolve(&self, sym: Symbol) -> &str {
        &self.names[sym.0 as usize]
    }

    /// Try to resolve a Symbol, returning None if invalid.
    #[inline]
    pub fn try_resolve(&self, sym: Symbol) -> Option<&str> {
        self.names.get(sym.0 as usize).map(|s| s.as_str())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over all interned names with their symbols, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, s)| (Symbol(i as u32), s.as_str()))
    }
}
