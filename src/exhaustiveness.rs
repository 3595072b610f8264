//! Match-exhaustiveness checking (§4.4), grounded in
//! `original_source/src/sema/exhaustiveness.h`.
//!
//! Variant coverage is tracked with a `bit-set` bitmap indexed by variant
//! position (SPEC_FULL.md §A.3) instead of the original's per-variant
//! linear scan, which is the natural Rust translation of "is every variant
//! covered" once variants have a stable index.

use bit_set::BitSet;

use crate::ast::{Ast, DeclKind, ExprId, ExprKind, MatchCase};
use crate::context::SemaContext;
use crate::diag::SemaError;
use crate::typecheck::Ty;

#[must_use] fn match_has_else_case(cases: &[MatchCase]) -> bool {
  cases.iter().any(|c| c.is_else)
}

/// `pattern_matches_variant`: exact name match, or a mangled `_Variant`
/// suffix match with an underscore boundary.
fn pattern_matches_variant(ctx: &SemaContext, pattern_name: &str, variant_raw: &str) -> bool {
  let _ = ctx;
  if pattern_name == variant_raw { return true }
  pattern_name
    .strip_suffix(variant_raw)
    .is_some_and(|prefix| prefix.ends_with('_'))
}

fn pattern_identifier_text(ctx: &SemaContext, ast: &Ast, pattern: ExprId) -> Option<String> {
  match ast.expr(pattern).kind {
    ExprKind::Identifier(sym) => Some(ctx.interner.resolve(sym).to_string()),
    ExprKind::Call { callee, .. } => match ast.expr(callee).kind {
      ExprKind::Identifier(sym) => Some(ctx.interner.resolve(sym).to_string()),
      ExprKind::Member { field, .. } => Some(ctx.interner.resolve(field).to_string()),
      _ => None,
    },
    _ => None,
  }
}

fn check_enum_exhaustiveness(
  ctx: &SemaContext, ast: &Ast, enum_decl: crate::ids::DeclId, cases: &[MatchCase],
) -> bool {
  let DeclKind::Enum { variants, .. } = &ast.decl(enum_decl).kind else { return false };
  let mut covered = BitSet::with_capacity(variants.len());
  for case in cases {
    let Some(pattern) = case.pattern else { continue };
    let Some(pattern_text) = pattern_identifier_text(ctx, ast, pattern) else { continue };
    for (i, v) in variants.iter().enumerate() {
      let variant_text = ctx.interner.resolve(v.name);
      if pattern_matches_variant(ctx, &pattern_text, variant_text) {
        covered.insert(i);
      }
    }
  }
  covered.len() == variants.len()
}

fn check_bool_exhaustiveness(ast: &Ast, cases: &[MatchCase]) -> bool {
  let mut has_true = false;
  let mut has_false = false;
  for case in cases {
    let Some(pattern) = case.pattern else { continue };
    if let ExprKind::Literal(v) = ast.expr(pattern).kind {
      if v != 0 { has_true = true } else { has_false = true }
    }
  }
  has_true && has_false
}

/// `sema_check_match_exhaustive`.
#[must_use] pub fn is_exhaustive(ctx: &SemaContext, ast: &Ast, value_ty: &Ty, cases: &[MatchCase]) -> bool {
  if cases.is_empty() { return false }
  if match_has_else_case(cases) { return true }
  match value_ty.unwrap() {
    Ty::Bool => check_bool_exhaustiveness(ast, cases),
    Ty::Enum(_, decl_id) => check_enum_exhaustiveness(ctx, ast, *decl_id, cases),
    _ => false,
  }
}

/// Runs the check against a `match`'s already-inferred scrutinee type and
/// turns a non-exhaustive result into the fatal `SemaError` the original
/// reports via `sema_report_nonexhaustive_match` + `exit(1)`.
pub fn check_match_exhaustive(
  ctx: &SemaContext, ast: &Ast, value: ExprId, cases: &[MatchCase],
) -> Result<(), SemaError> {
  let value_ty = ctx.side.expr_ty.get(&value).cloned().unwrap_or(Ty::Unknown);
  if is_exhaustive(ctx, ast, &value_ty, cases) {
    Ok(())
  } else {
    Err(SemaError::NonExhaustiveMatch { span: None })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::{Ast, DeclKind, ExprKind, VariantDecl};
  use crate::context::{SemaConfig, SemaContext};
  use smallvec::smallvec;

  #[test]
  fn else_case_always_exhaustive() {
    let ctx = SemaContext::new(SemaConfig::default());
    let ast = Ast::new();
    let cases = vec![MatchCase { pattern: None, is_else: true, body: smallvec![] }];
    assert!(is_exhaustive(&ctx, &ast, &Ty::Int, &cases));
  }

  #[test]
  fn enum_missing_variant_is_not_exhaustive() {
    let mut ctx = SemaContext::new(SemaConfig::default());
    let mut ast = Ast::new();
    let red = ctx.intern("Red");
    let blue = ctx.intern("Blue");
    let enum_name = ctx.intern("Color");
    let decl_id = ast.alloc_decl(
      DeclKind::Enum {
        name: enum_name,
        variants: smallvec![
          VariantDecl { name: red, fields: smallvec![] },
          VariantDecl { name: blue, fields: smallvec![] },
        ],
      },
      None,
    );
    let pattern = ast.alloc_expr(ExprKind::Identifier(red), None);
    let cases = vec![MatchCase { pattern: Some(pattern), is_else: false, body: smallvec![] }];
    let ty = Ty::Enum(enum_name, decl_id);
    assert!(!is_exhaustive(&ctx, &ast, &ty, &cases));
  }
}
