//! Interned identifiers.
//!
//! The source AST represents identifiers as raw byte spans (see
//! [`crate::ast::Id`]); every other component keys its tables on an
//! [`Symbol`] instead, a small `Copy` handle produced by an [`Interner`].
//! Unlike a process-global interner, an `Interner` here is owned by the
//! [`crate::context::SemaContext`] for a single compilation, so two unrelated
//! compilations never share (or race on) interned state.

use hashbrown::HashMap;

/// An interned identifier. Two symbols are equal iff they were interned from
/// byte-equal strings by the *same* [`Interner`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl std::fmt::Debug for Symbol {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Symbol({})", self.0)
  }
}

/// Owns the backing storage for every [`Symbol`] produced from it.
///
/// This replaces the teacher's `LazyLock<...>` process-global maps
/// (`init_dense_symbol_map`, the `SYMBOL_MAP`/`INTERNED` statics in
/// `types/entity.rs`) with an explicit, per-compilation table, per the
/// "cross-component global statics" redesign note.
#[derive(Default)]
pub struct Interner {
  strings: Vec<Box<str>>,
  lookup: HashMap<Box<str>, Symbol>,
}

impl Interner {
  /// Create an empty interner.
  #[must_use] pub fn new() -> Self { Self::default() }

  /// Intern `s`, returning the existing symbol if `s` was already interned.
  pub fn intern(&mut self, s: &str) -> Symbol {
    if let Some(&sym) = self.lookup.get(s) {
      return sym;
    }
    let sym = Symbol(u32::try_from(self.strings.len()).expect("too many interned symbols"));
    self.strings.push(s.into());
    self.lookup.insert(s.into(), sym);
    sym
  }

  /// Resolve a symbol back to its string. Panics if `sym` was not produced by
  /// this interner.
  #[must_use] pub fn resolve(&self, sym: Symbol) -> &str {
    &self.strings[sym.0 as usize]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn same_string_interns_to_same_symbol() {
    let mut i = Interner::new();
    let a = i.intern("foo");
    let b = i.intern("foo");
    assert_eq!(a, b);
    assert_ne!(a, i.intern("bar"));
  }

  #[test]
  fn resolve_round_trips() {
    let mut i = Interner::new();
    let s = i.intern("module_path");
    assert_eq!(i.resolve(s), "module_path");
  }
}
