//! Static range/interval analysis with a relational constraint store (§4.5),
//! grounded in `original_source/src/sema/ranges.h` and the usage of
//! `sema_ranges->constraints` / `sema_apply_constraint` /
//! `sema_apply_negated_constraint` / `constraint_add` /
//! `sema_check_post_condition` seen in `original_source/src/sema.h`.
//!
//! `ranges.h` as retrieved defines only the interval half (`Range`,
//! `RangeTable{head}`); `sema.h` clearly drives a fuller `RangeTable` that
//! also carries a `constraints` list and is snapshotted/restored around
//! `if`/`else` branches. Since the constraint-store functions' bodies were
//! never directly observed, this module designs them from their call sites
//! plus §3.4/§4.5's description of "a relational constraint store" used for
//! branch refinement and post-condition proving (recorded as a supplemented
//! feature in SPEC_FULL.md §B.1).
//!
//! Snapshot/restore around `if`/`for`/`match` branches uses `im::HashMap`
//! for O(1) structural-sharing clones instead of the original's
//! `ltable_clone`-style deep copy (SPEC_FULL.md §A.3).

use im::HashMap as ImHashMap;

use crate::ast::{BinOp, ExprId, ExprKind};
use crate::symbol::Symbol;

/// A closed 64-bit signed interval, or "unknown" (the lattice top).
/// Mirrors `Range{min,max,known}` in `ranges.h`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
  pub min: i64,
  pub max: i64,
  pub known: bool,
}

impl Range {
  #[must_use] pub fn unknown() -> Self { Self { min: i64::MIN, max: i64::MAX, known: false } }
  #[must_use] pub fn constant(v: i64) -> Self { Self { min: v, max: v, known: true } }
  #[must_use] pub fn make(min: i64, max: i64) -> Self { Self { min, max, known: true } }

  #[must_use] pub fn add(self, other: Self) -> Self {
    if !self.known || !other.known { return Self::unknown(); }
    match (self.min.checked_add(other.min), self.max.checked_add(other.max)) {
      (Some(min), Some(max)) => Self::make(min, max),
      _ => Self::unknown(),
    }
  }

  #[must_use] pub fn sub(self, other: Self) -> Self {
    if !self.known || !other.known { return Self::unknown(); }
    match (self.min.checked_sub(other.max), self.max.checked_sub(other.min)) {
      (Some(min), Some(max)) => Self::make(min, max),
      _ => Self::unknown(),
    }
  }

  /// Is this interval definitely entirely `< 0`?
  #[must_use] pub fn definitely_negative(self) -> bool { self.known && self.max < 0 }
}

/// A relational constraint `x - y <= c`, the shape `constraint_add` builds
/// from recognized assignment forms (`x = y + c`, `x = y`, …) in
/// `sema.h`'s walk over `STMT_ASSIGN`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Constraint {
  pub x: Symbol,
  pub y: Symbol,
  pub c: i64,
}

/// The range table: per-variable intervals plus the relational constraint
/// store, both snapshotted together around branches (`sema.h`'s `IF`
/// handling saves/restores `sema_ranges->head` *and*
/// `sema_ranges->constraints` as one unit).
#[derive(Clone, Default)]
pub struct RangeTable {
  vars: ImHashMap<Symbol, Range>,
  constraints: im::Vector<Constraint>,
}

impl RangeTable {
  #[must_use] pub fn new() -> Self { Self::default() }

  pub fn set(&mut self, var: Symbol, range: Range) { self.vars.insert(var, range); }

  #[must_use] pub fn get(&self, var: Symbol) -> Range {
    self.vars.get(&var).copied().unwrap_or_else(Range::unknown)
  }

  /// Record `x - y <= c` and, when the assignment is invertible (every form
  /// `constraint_add` is called on in `sema.h` is: `x = y + c`, `x = y - c`,
  /// or `x = y`), the symmetric `y - x <= -c`.
  pub fn add_constraint_pair(&mut self, x: Symbol, y: Symbol, c: i64) {
    self.constraints.push_back(Constraint { x, y, c });
    self.constraints.push_back(Constraint { x: y, y: x, c: -c });
  }

  /// O(1) structural-sharing snapshot, replacing `ltable_clone`'s deep copy.
  #[must_use] pub fn snapshot(&self) -> Self { self.clone() }

  pub fn restore(&mut self, snapshot: Self) { *self = snapshot; }

  /// `sema_apply_constraint`: refine ranges for the `then`-branch of
  /// `if cond`. Only the comparison forms that appear in the original's
  /// condition-to-constraint examples are handled; anything else is a
  /// no-op refinement (sound, just not sharper).
  pub fn apply_condition(&mut self, ast: &crate::ast::Ast, cond: ExprId) {
    self.apply_comparison(ast, cond, false);
  }

  /// `sema_apply_negated_constraint`: refine ranges for the `else`-branch,
  /// i.e. as though `!cond` held.
  pub fn apply_negated_condition(&mut self, ast: &crate::ast::Ast, cond: ExprId) {
    self.apply_comparison(ast, cond, true);
  }

  /// The bound on `target` implied by the relational constraint store alone
  /// (`x - y <= c` entries involving `target`, combined with whatever
  /// interval is currently known for the other side). `sema_check_post_condition`
  /// (`sema.h:333`) consults `sema_ranges` for exactly this reason — a
  /// constraint can sharpen a bound the interval lattice alone cannot
  /// express.
  fn constraint_bound(&self, target: Symbol) -> Range {
    let mut lo = i64::MIN;
    let mut hi = i64::MAX;
    let mut known = false;
    for c in &self.constraints {
      if c.x == target {
        let y = self.get(c.y);
        if y.known {
          if let Some(v) = y.max.checked_add(c.c) { hi = hi.min(v); known = true; }
        }
      }
      if c.y == target {
        let x = self.get(c.x);
        if x.known {
          if let Some(v) = x.min.checked_sub(c.c) { lo = lo.max(v); known = true; }
        }
      }
    }
    if known { Range::make(lo, hi) } else { Range::unknown() }
  }

  fn apply_comparison(&mut self, ast: &crate::ast::Ast, cond: ExprId, negate: bool) {
    let ExprKind::Binary { op, lhs, rhs } = ast.expr(cond).kind else { return };
    let op = if negate { negate_cmp(op) } else { op };
    let Some(lhs_sym) = as_identifier(ast, lhs) else { return };
    let rhs_range = self.eval(ast, rhs);
    if !rhs_range.known { return }
    let cur = intersect(self.get(lhs_sym), self.constraint_bound(lhs_sym));
    let refined = match op {
      BinOp::Lt => Range::make(cur_min(cur), (rhs_range.max - 1).min(cur_max(cur))),
      BinOp::Le => Range::make(cur_min(cur), rhs_range.max.min(cur_max(cur))),
      BinOp::Gt => Range::make((rhs_range.min + 1).max(cur_min(cur)), cur_max(cur)),
      BinOp::Ge => Range::make(rhs_range.min.max(cur_min(cur)), cur_max(cur)),
      BinOp::Eq => rhs_range,
      _ => return,
    };
    if refined.min <= refined.max {
      self.set(lhs_sym, Range::make(refined.min, refined.max));
    }
  }

  /// `sema_eval_range`: literal -> const, identifier -> lookup, `+`/`-` ->
  /// interval arithmetic, everything else -> unknown.
  #[must_use] pub fn eval(&self, ast: &crate::ast::Ast, id: ExprId) -> Range {
    match &ast.expr(id).kind {
      ExprKind::Literal(v) => Range::constant(*v),
      ExprKind::Identifier(sym) => self.get(*sym),
      ExprKind::Binary { op: BinOp::Add, lhs, rhs } => self.eval(ast, *lhs).add(self.eval(ast, *rhs)),
      ExprKind::Binary { op: BinOp::Sub, lhs, rhs } => self.eval(ast, *lhs).sub(self.eval(ast, *rhs)),
      _ => Range::unknown(),
    }
  }

  /// `sema_check_post_condition`: does `ret` provably satisfy `post_expr`?
  /// Returns `Some(true)` only when the post-condition is a comparison
  /// against `result` that the interval `ret` provably satisfies;
  /// `Some(false)` when it is provably violated (fatal); `None` ("unknown")
  /// is accepted, matching the original's `result == -1` pass-through.
  #[must_use] pub fn check_post_condition(
    &self, ast: &crate::ast::Ast, post_expr: ExprId, result_sym: Symbol, ret: Range,
  ) -> Option<bool> {
    let ret = intersect(ret, self.constraint_bound(result_sym));
    let ExprKind::Binary { op, lhs, rhs } = ast.expr(post_expr).kind else { return None };
    let lhs_is_result = as_identifier(ast, lhs) == Some(result_sym);
    let bound = if lhs_is_result {
      self.eval(ast, rhs)
    } else if as_identifier(ast, rhs) == Some(result_sym) {
      self.eval(ast, lhs)
    } else {
      return None;
    };
    if !bound.known || !ret.known { return None }
    let satisfied = match (op, lhs_is_result) {
      (BinOp::Lt, true) => ret.max < bound.min,
      (BinOp::Le, true) => ret.max <= bound.min,
      (BinOp::Gt, true) => ret.min > bound.max,
      (BinOp::Ge, true) => ret.min >= bound.max,
      (BinOp::Lt, false) => ret.min > bound.max,
      (BinOp::Le, false) => ret.min >= bound.max,
      (BinOp::Gt, false) => ret.max < bound.min,
      (BinOp::Ge, false) => ret.max <= bound.min,
      (BinOp::Eq, _) => ret.min == ret.max && ret.min == bound.min && bound.min == bound.max,
      _ => return None,
    };
    if satisfied { return Some(true) }
    let violated = match (op, lhs_is_result) {
      (BinOp::Lt, true) => ret.min >= bound.max,
      (BinOp::Le, true) => ret.min > bound.max,
      (BinOp::Gt, true) => ret.max <= bound.min,
      (BinOp::Ge, true) => ret.max < bound.min,
      (BinOp::Lt, false) => ret.max <= bound.min,
      (BinOp::Le, false) => ret.max < bound.min,
      (BinOp::Gt, false) => ret.min >= bound.max,
      (BinOp::Ge, false) => ret.min > bound.max,
      (BinOp::Eq, _) => bound.known && ret.known && (ret.min > bound.max || ret.max < bound.min),
      _ => false,
    };
    if violated { Some(false) } else { None }
  }
}

fn cur_min(r: Range) -> i64 { if r.known { r.min } else { i64::MIN } }
fn cur_max(r: Range) -> i64 { if r.known { r.max } else { i64::MAX } }

/// Narrow `a` by `b`, keeping `a` unchanged if the two disagree (a
/// contradiction means one of the inputs is stale, not that the variable's
/// range is provably empty).
fn intersect(a: Range, b: Range) -> Range {
  if !b.known { return a }
  if !a.known { return b }
  let min = a.min.max(b.min);
  let max = a.max.min(b.max);
  if min <= max { Range::make(min, max) } else { a }
}

fn negate_cmp(op: BinOp) -> BinOp {
  match op {
    BinOp::Lt => BinOp::Ge,
    BinOp::Le => BinOp::Gt,
    BinOp::Gt => BinOp::Le,
    BinOp::Ge => BinOp::Lt,
    BinOp::Eq => BinOp::Ne,
    BinOp::Ne => BinOp::Eq,
    other => other,
  }
}

fn as_identifier(ast: &crate::ast::Ast, id: ExprId) -> Option<Symbol> {
  match ast.expr(id).kind {
    ExprKind::Identifier(sym) => Some(sym),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::Ast;
  use crate::symbol::Interner;

  #[test]
  fn interval_add_absorbs_unknown() {
    let a = Range::constant(3);
    let b = Range::unknown();
    assert!(!a.add(b).known);
  }

  #[test]
  fn branch_refinement_narrows_lt() {
    let mut interner = Interner::new();
    let mut ast = Ast::new();
    let x = interner.intern("x");
    let mut table = RangeTable::new();
    table.set(x, Range::make(0, 100));
    let x_expr = ast.alloc_expr(ExprKind::Identifier(x), None);
    let ten = ast.alloc_expr(ExprKind::Literal(10), None);
    let cond = ast.alloc_expr(ExprKind::Binary { op: BinOp::Lt, lhs: x_expr, rhs: ten }, None);
    table.apply_condition(&ast, cond);
    let refined = table.get(x);
    assert_eq!(refined, Range::make(0, 9));
  }
}
