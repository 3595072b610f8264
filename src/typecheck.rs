//! Type inferencer (§4.3), grounded in
//! `original_source/src/sema/typecheck.h`.
//!
//! `Ty` here is the *resolved* value type produced by inference — distinct
//! from [`crate::ast::Ty`], which is the unresolved syntax the AST carries
//! (a named type that hasn't yet been looked up against struct/enum
//! declarations). Resolving one to the other is exactly what
//! [`resolve_ast_ty`] does.

use std::rc::Rc;

use crate::ast::{self, Ast, BinOp, DeclKind, ExprId, ExprKind, UnOp};
use crate::context::SemaContext;
use crate::diag::SemaError;
use crate::ids::DeclId;
use crate::symbol::Symbol;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ty {
  Int,
  Bool,
  U8,
  Struct(Symbol, DeclId),
  Enum(Symbol, DeclId),
  Array(Rc<Ty>, i64),
  /// A slice, carrying its sentinel length when statically known (mirrors
  /// `Array`'s `len`; negative means unknown/dynamic).
  Slice(Rc<Ty>, i64),
  Pointer(Rc<Ty>),
  Move(Rc<Ty>),
  Mut(Rc<Ty>),
  /// A type that failed to resolve; inference keeps going to surface as
  /// many diagnostics as possible rather than aborting (the original's
  /// `exit(1)` fatal pattern is replaced by `Result`, but within a single
  /// expression we still want a usable placeholder for cascading checks).
  Unknown,
}

impl Ty {
  #[must_use] pub fn unwrap(&self) -> &Ty {
    match self {
      Ty::Mut(inner) | Ty::Move(inner) | Ty::Pointer(inner) => inner.unwrap(),
      other => other,
    }
  }

  #[must_use] pub fn mode(&self) -> ast::Mode {
    match self {
      Ty::Mut(_) => ast::Mode::Mutable,
      Ty::Move(_) => ast::Mode::Owned,
      _ => ast::Mode::Shared,
    }
  }

  #[must_use] pub fn is_linear(&self) -> bool { matches!(self, Ty::Move(_)) }

  #[must_use] pub fn array_len(&self) -> Option<i64> {
    match self.unwrap() {
      Ty::Array(_, len) if *len >= 0 => Some(*len),
      _ => None,
    }
  }

  /// The slice's sentinel length, if statically known (§4.6's "fixed-size
  /// slice -> singleton = sentinel length").
  #[must_use] pub fn slice_len(&self) -> Option<i64> {
    match self.unwrap() {
      Ty::Slice(_, len) if *len >= 0 => Some(*len),
      _ => None,
    }
  }
}

/// Resolve an unresolved [`ast::Ty`] syntax node to a [`Ty`] value, looking
/// up `Simple` names against struct/enum declarations registered in the
/// symbol table's globals.
pub fn resolve_ast_ty(ctx: &SemaContext, ast: &Ast, ast_ty: &ast::Ty) -> Ty {
  match ast_ty {
    ast::Ty::Simple(name) => resolve_simple(ctx, ast, *name),
    ast::Ty::Array(elem, len) => Ty::Array(Rc::new(resolve_ast_ty(ctx, ast, elem)), *len),
    ast::Ty::Slice(elem, sentinel) => Ty::Slice(Rc::new(resolve_ast_ty(ctx, ast, elem)), sentinel.len),
    ast::Ty::Pointer(inner) => Ty::Pointer(Rc::new(resolve_ast_ty(ctx, ast, inner))),
    ast::Ty::Move(inner) => Ty::Move(Rc::new(resolve_ast_ty(ctx, ast, inner))),
    ast::Ty::Mut(inner) => Ty::Mut(Rc::new(resolve_ast_ty(ctx, ast, inner))),
    ast::Ty::Comptime(inner) => resolve_ast_ty(ctx, ast, inner),
  }
}

fn resolve_simple(ctx: &SemaContext, ast: &Ast, name: Symbol) -> Ty {
  match ctx.interner.resolve(name) {
    "int" | "i64" => return Ty::Int,
    "bool" => return Ty::Bool,
    "u8" => return Ty::U8,
    _ => {}
  }
  let Some(binding) = ctx.symtab.lookup_global(name) else { return Ty::Unknown };
  let Some(decl_id) = binding.decl else { return Ty::Unknown };
  match &ast.decl(decl_id).kind {
    DeclKind::Struct { .. } => Ty::Struct(name, decl_id),
    DeclKind::Enum { .. } => Ty::Enum(name, decl_id),
    _ => Ty::Unknown,
  }
}

/// Look up a struct declaration's field type. Fatal ("struct undefined" /
/// "field absent") in the original (`sema/typecheck.h`'s
/// `lookup_struct_field_type`); here a `SemaError`.
pub fn lookup_struct_field_type(
  ctx: &SemaContext, ast: &Ast, struct_name: Symbol, field: Symbol,
) -> Result<Ty, SemaError> {
  let not_found = || SemaError::UnknownStruct { name: ctx.interner.resolve(struct_name).to_string(), span: None };
  let binding = ctx.symtab.lookup_global(struct_name).ok_or_else(not_found)?;
  let decl_id = binding.decl.ok_or_else(not_found)?;
  let DeclKind::Struct { fields, .. } = &ast.decl(decl_id).kind else { return Err(not_found()) };
  fields
    .iter()
    .find(|f| f.name == field)
    .map(|f| resolve_ast_ty(ctx, ast, &f.ty))
    .ok_or_else(|| SemaError::UnknownField {
      struct_name: ctx.interner.resolve(struct_name).to_string(),
      field: ctx.interner.resolve(field).to_string(),
      span: None,
    })
}

/// Walks an expression, inferring and recording its type in
/// [`crate::context::SideTable::expr_ty`]. Identifier expressions are
/// assumed already resolved (name resolution runs first, §4.2 -> §4.3
/// ordering, mirroring `sema_resolve_module`'s single combined walk in
/// `sema.h`) and their type is whatever resolution already stored in the
/// side table.
pub fn infer_expr(ctx: &mut SemaContext, ast: &Ast, id: ExprId) -> Result<Ty, SemaError> {
  let ty = infer_expr_inner(ctx, ast, id)?;
  ctx.side.expr_ty.insert(id, ty.clone());
  Ok(ty)
}

fn infer_expr_inner(ctx: &mut SemaContext, ast: &Ast, id: ExprId) -> Result<Ty, SemaError> {
  match ast.expr(id).kind.clone() {
    ExprKind::Literal(_) => Ok(Ty::Int),
    ExprKind::CharLit(_) => Ok(Ty::U8),
    ExprKind::StringLit(bytes) => Ok(Ty::Slice(Rc::new(Ty::U8), i64::try_from(bytes.len()).unwrap_or(-1))),
    ExprKind::Identifier(_) => Ok(ctx.side.expr_ty.get(&id).cloned().unwrap_or(Ty::Unknown)),
    ExprKind::Member { target, field } => {
      let target_ty = infer_expr(ctx, ast, target)?;
      match target_ty.unwrap().clone() {
        Ty::Array(elem, _) | Ty::Slice(elem, _) => match ctx.interner.resolve(field) {
          "len" => Ok(Ty::Int),
          "data" => Ok(Ty::Pointer(elem)),
          _ => Err(SemaError::MemberOnNonStruct { span: None }),
        },
        Ty::Struct(name, _) => lookup_struct_field_type(ctx, ast, name, field),
        _ => Err(SemaError::MemberOnNonStruct { span: None }),
      }
    }
    ExprKind::Index { target, index } => {
      let target_ty = infer_expr(ctx, ast, target)?;
      infer_expr(ctx, ast, index)?;
      let elem = match target_ty.unwrap().clone() {
        Ty::Array(elem, _) | Ty::Slice(elem, _) => elem,
        _ => return Err(SemaError::NonIndexableTarget { span: None }),
      };
      let is_range = matches!(ast.expr(index).kind, ExprKind::Range { .. });
      if !is_range {
        if let Err(err) = crate::bounds::check_bounds(ctx, ast, index, &target_ty) {
          if !ctx.should_suppress(&err) { return Err(err) }
        }
      }
      if is_range {
        Ok(Ty::Array(elem, -1))
      } else {
        Ok((*elem).clone())
      }
    }
    ExprKind::Call { callee, args } => {
      for a in &args { infer_expr(ctx, ast, *a)?; }
      infer_expr(ctx, ast, callee)
    }
    ExprKind::Binary { lhs, rhs, op } => {
      infer_expr(ctx, ast, lhs)?;
      infer_expr(ctx, ast, rhs)?;
      Ok(match op {
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::And | BinOp::Or =>
          Ty::Bool,
        _ => Ty::Int,
      })
    }
    ExprKind::Unary { operand, op } => {
      let inner = infer_expr(ctx, ast, operand)?;
      Ok(match op {
        UnOp::Not => Ty::Bool,
        UnOp::Neg => inner,
      })
    }
    ExprKind::Range { lo, hi } => {
      infer_expr(ctx, ast, lo)?;
      infer_expr(ctx, ast, hi)?;
      Ok(Ty::Unknown)
    }
    ExprKind::Borrow { kind, operand } => {
      let inner = infer_expr(ctx, ast, operand)?;
      Ok(match kind {
        ast::BorrowKind::Move => Ty::Move(Rc::new(inner)),
        ast::BorrowKind::Mut => Ty::Mut(Rc::new(inner)),
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::{Ast, ExprKind};
  use crate::context::{SemaConfig, SemaContext};

  #[test]
  fn literal_infers_int() {
    let mut ctx = SemaContext::new(SemaConfig::default());
    let mut ast = Ast::new();
    let lit = ast.alloc_expr(ExprKind::Literal(5), None);
    assert_eq!(infer_expr(&mut ctx, &ast, lit).unwrap(), Ty::Int);
  }

  #[test]
  fn comparison_infers_bool() {
    let mut ctx = SemaContext::new(SemaConfig::default());
    let mut ast = Ast::new();
    let a = ast.alloc_expr(ExprKind::Literal(1), None);
    let b = ast.alloc_expr(ExprKind::Literal(2), None);
    let cmp = ast.alloc_expr(ExprKind::Binary { op: BinOp::Lt, lhs: a, rhs: b }, None);
    assert_eq!(infer_expr(&mut ctx, &ast, cmp).unwrap(), Ty::Bool);
  }
}
