//! Two-level symbol table (§4.1), grounded in
//! `original_source/src/sema/scope.h`.
//!
//! The original buckets both tables with a djb2-style hash
//! (`SEMA_BUCKET_COUNT = 4096`) over a manually-chained linked list; this is
//! exactly what `hashbrown::HashMap` gives for free, keyed on the interned
//! [`Symbol`] rather than a raw byte span.

use hashbrown::HashMap;

use crate::ids::DeclId;
use crate::symbol::Symbol;
use crate::typecheck::Ty;

#[derive(Clone, Debug)]
pub struct Binding {
  pub ty: Ty,
  pub decl: Option<DeclId>,
  pub is_global: bool,
  pub is_mutable: bool,
}

/// Locals shadow globals; `sema_lookup` in `scope.h` checks
/// `sema_locals` before `sema_globals` and this does the same.
#[derive(Default)]
pub struct SymbolTable {
  globals: HashMap<Symbol, Binding>,
  locals: HashMap<Symbol, Binding>,
}

impl SymbolTable {
  #[must_use] pub fn new() -> Self { Self::default() }

  /// `sema_insert_global`: idempotent when the same declaration is
  /// reinserted under this name; `Err` with the conflicting declaration when
  /// a *different* one already claims it (§4.1).
  pub fn insert_global(&mut self, name: Symbol, binding: Binding) -> Result<(), Option<DeclId>> {
    if let Some(existing) = self.globals.get(&name) {
      if existing.decl == binding.decl { return Ok(()) }
      return Err(existing.decl);
    }
    self.globals.insert(name, binding);
    Ok(())
  }

  pub fn insert_local(&mut self, name: Symbol, binding: Binding) -> bool {
    self.locals.insert(name, binding).is_none()
  }

  #[must_use] pub fn lookup(&self, name: Symbol) -> Option<&Binding> {
    self.locals.get(&name).or_else(|| self.globals.get(&name))
  }

  #[must_use] pub fn lookup_global(&self, name: Symbol) -> Option<&Binding> {
    self.globals.get(&name)
  }

  #[must_use] pub fn is_local(&self, name: Symbol) -> bool {
    self.locals.contains_key(&name)
  }

  pub fn clear_locals(&mut self) { self.locals.clear(); }
  pub fn clear_globals(&mut self) { self.globals.clear(); }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::symbol::Interner;
  use crate::typecheck::Ty as RTy;

  fn binding() -> Binding {
    Binding { ty: RTy::Int, decl: None, is_global: false, is_mutable: true }
  }

  #[test]
  fn locals_shadow_globals() {
    let mut interner = Interner::new();
    let mut table = SymbolTable::new();
    let name = interner.intern("x");
    table.insert_global(name, Binding { is_global: true, ..binding() });
    table.insert_local(name, Binding { is_global: false, ..binding() });
    assert!(!table.lookup(name).unwrap().is_global);
    table.clear_locals();
    assert!(table.lookup(name).unwrap().is_global);
  }
}
