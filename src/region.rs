//! Region tree and borrow table (§3.5, §4.7 support), grounded in
//! `original_source/src/sema/region.h`.
//!
//! Borrows are tracked per (owner variable, borrow region) pair; the
//! invariant is that a borrow's region may never outlive its owner's
//! region, and all borrows are cleared after each top-level statement
//! (an NLL-like rule — `borrow_clear_all`, called from
//! `sema_check_function_linearity` in `original_source/src/sema.h` after
//! every statement).

use hashbrown::HashMap;

use crate::ast::Mode;
use crate::diag::SemaError;
use crate::symbol::Symbol;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegionId(u32);

/// A lexical scope. `depth`/`parent` let [`RegionTree::contains`] walk
/// upward the way `region_contains` does in `region.h`.
#[derive(Clone, Copy, Debug)]
pub struct Region {
  pub depth: u32,
  pub parent: Option<RegionId>,
}

#[derive(Default)]
pub struct RegionTree {
  regions: Vec<Region>,
}

impl RegionTree {
  #[must_use] pub fn new() -> Self {
    // Region 0 is the function's top-level region, with no parent.
    Self { regions: vec![Region { depth: 0, parent: None }] }
  }

  #[must_use] pub fn root(&self) -> RegionId { RegionId(0) }

  pub fn child_of(&mut self, parent: RegionId) -> RegionId {
    let depth = self.regions[parent.0 as usize].depth + 1;
    let id = RegionId(u32::try_from(self.regions.len()).expect("too many regions"));
    self.regions.push(Region { depth, parent: Some(parent) });
    id
  }

  /// Does `outer` contain (is an ancestor of, or equal to) `inner`?
  /// Mirrors `region_contains` in `region.h`.
  #[must_use] pub fn contains(&self, outer: RegionId, inner: RegionId) -> bool {
    let mut cur = Some(inner);
    while let Some(r) = cur {
      if r == outer { return true }
      cur = self.regions[r.0 as usize].parent;
    }
    false
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorrowMode {
  Shared,
  Mutable,
}

impl From<Mode> for BorrowMode {
  fn from(m: Mode) -> Self {
    match m {
      Mode::Mutable => BorrowMode::Mutable,
      _ => BorrowMode::Shared,
    }
  }
}

#[derive(Clone, Debug)]
struct BorrowEntry {
  owner_var: Option<Symbol>,
  /// The name this borrow was bound to at the declaration site (`var r mut
  /// x = ...`), if any — a call-argument borrow (`p(mut x)`) is anonymous
  /// and never outlives the call, so it carries `None`. Mirrors
  /// `borrow_register(var, owner)` taking both names in `region.h:171`.
  reference_var: Option<Symbol>,
  mode: BorrowMode,
  borrow_region: RegionId,
  owner_region: RegionId,
}

/// `BorrowTable` in `region.h`: a flat list of active borrows plus the
/// current region cursor.
#[derive(Default)]
pub struct BorrowTable {
  entries: HashMap<Symbol, Vec<BorrowEntry>>,
  /// The region each variable was declared (`var`-bound) in, used to
  /// recover the owner's true region at borrow time instead of trusting
  /// whatever region the borrow happens to execute in.
  declared_region: HashMap<Symbol, RegionId>,
  regions: RegionTree,
  current_region: Option<RegionId>,
}

impl BorrowTable {
  #[must_use] pub fn new() -> Self {
    let mut regions = RegionTree::new();
    let root = regions.root();
    Self { entries: HashMap::new(), declared_region: HashMap::new(), regions, current_region: Some(root) }
  }

  /// Record that `var` was declared in the current region (`sema`'s
  /// per-`var`-statement bookkeeping that `borrow_register` leans on to
  /// find the owner's real region instead of the borrow site's).
  pub fn declare(&mut self, var: Symbol) {
    self.declared_region.insert(var, self.current_region());
  }

  #[must_use] pub fn current_region(&self) -> RegionId {
    self.current_region.unwrap_or_else(|| self.regions.root())
  }

  pub fn enter_scope(&mut self) -> RegionId {
    let child = self.regions.child_of(self.current_region());
    self.current_region = Some(child);
    child
  }

  pub fn exit_scope(&mut self, parent: RegionId) { self.current_region = Some(parent); }

  /// `borrow_check_conflict`: a new mutable borrow conflicts with *any*
  /// existing borrow of the same owner; a new shared borrow conflicts only
  /// with an existing mutable one.
  #[must_use] pub fn check_conflict(&self, owner: Symbol, new_mode: BorrowMode, name: &str) -> Option<SemaError> {
    let Some(existing) = self.entries.get(&owner) else { return None };
    for e in existing {
      let conflicts = match new_mode {
        BorrowMode::Mutable => true,
        BorrowMode::Shared => matches!(e.mode, BorrowMode::Mutable),
      };
      if conflicts {
        return Some(match new_mode {
          BorrowMode::Mutable =>
            SemaError::AlreadyBorrowedMutable { name: name.to_string(), span: None },
          BorrowMode::Shared =>
            SemaError::AlreadyBorrowedMutableConflictsShared { name: name.to_string(), span: None },
        });
      }
    }
    None
  }

  /// `borrow_register`: check conflicts, then check the owner's region
  /// outlives the new borrow's region, then record it. `reference` is the
  /// name this borrow is bound to at its declaration site, if any
  /// (`None` for an anonymous call-argument borrow).
  pub fn register(
    &mut self, owner: Symbol, mode: BorrowMode, name: &str, reference: Option<Symbol>,
  ) -> Result<(), SemaError> {
    if let Some(err) = self.check_conflict(owner, mode, name) { return Err(err) }
    let owner_region = self.declared_region.get(&owner).copied().unwrap_or_else(|| self.current_region());
    if !self.regions.contains(owner_region, self.current_region()) {
      return Err(SemaError::ReferenceOutlivesOwner { name: name.to_string(), span: None });
    }
    self.entries.entry(owner).or_default().push(BorrowEntry {
      owner_var: Some(owner),
      reference_var: reference,
      mode,
      borrow_region: self.current_region(),
      owner_region,
    });
    Ok(())
  }

  #[must_use] pub fn is_borrowed(&self, owner: Symbol) -> bool {
    self.entries.get(&owner).is_some_and(|v| !v.is_empty())
  }

  /// `borrow_invalidate_owner`: called when `owner` is moved — any
  /// outstanding borrow of it becomes dangling, which
  /// `borrow_check_use_after_move` then reports.
  pub fn invalidate_owner(&mut self, owner: Symbol) {
    if let Some(entries) = self.entries.get_mut(&owner) {
      for e in entries.iter_mut() { e.owner_var = None; }
    }
  }

  /// `borrow_check_use_after_move(t, var)`: `reference` is the *reference*
  /// variable's own name (not the owner's) — the original looks this up by
  /// the name actually used at the reference site, since that's what a
  /// dangling-use diagnostic is reported against.
  #[must_use] pub fn check_use_after_move(&self, reference: Symbol, name: &str) -> Option<SemaError> {
    self.entries.values().flatten().find(|e| e.reference_var == Some(reference) && e.owner_var.is_none()).map(|_| {
      SemaError::UseAfterOwnerMoved { name: name.to_string(), span: None }
    })
  }

  /// `borrow_clear_all`: the NLL-like rule — every borrow's extent ends at
  /// the statement boundary.
  pub fn clear_all(&mut self) {
    self.entries.clear();
    self.declared_region.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::symbol::Interner;

  #[test]
  fn second_mutable_borrow_conflicts() {
    let mut interner = Interner::new();
    let mut table = BorrowTable::new();
    let x = interner.intern("x");
    table.register(x, BorrowMode::Mutable, "x", None).unwrap();
    let err = table.register(x, BorrowMode::Mutable, "x", None);
    assert!(err.is_err());
  }

  #[test]
  fn shared_borrows_do_not_conflict() {
    let mut interner = Interner::new();
    let mut table = BorrowTable::new();
    let x = interner.intern("x");
    table.register(x, BorrowMode::Shared, "x", None).unwrap();
    assert!(table.register(x, BorrowMode::Shared, "x", None).is_ok());
  }

  #[test]
  fn clear_all_releases_borrows() {
    let mut interner = Interner::new();
    let mut table = BorrowTable::new();
    let x = interner.intern("x");
    table.register(x, BorrowMode::Mutable, "x", None).unwrap();
    table.clear_all();
    assert!(!table.is_borrowed(x));
  }

  #[test]
  fn reference_outliving_owner_is_rejected() {
    let mut interner = Interner::new();
    let mut table = BorrowTable::new();
    let x = interner.intern("x");
    let root = table.current_region();
    table.enter_scope();
    table.declare(x);
    table.exit_scope(root);
    assert!(table.register(x, BorrowMode::Shared, "x", None).is_err());
  }

  #[test]
  fn use_after_owner_moved_is_detected() {
    let mut interner = Interner::new();
    let mut table = BorrowTable::new();
    let x = interner.intern("x");
    let r = interner.intern("r");
    table.register(x, BorrowMode::Mutable, "x", Some(r)).unwrap();
    assert!(table.check_use_after_move(r, "r").is_none());
    table.invalidate_owner(x);
    assert!(table.check_use_after_move(r, "r").is_some());
  }
}
