//! Name resolution (§4.2), grounded in `original_source/src/sema/resolve.h`.
//!
//! The original overwrites an identifier's `Id` in place once resolved
//! (`sema_resolve_expr`'s `IDENTIFIER` case). Here resolution results go
//! into [`crate::context::SideTable`] instead (Design Notes: "Shared-mutable
//! AST nodes" redesign) — nothing is mutated on the `Ast` itself.

use crate::ast::{Ast, DeclKind, ExprId, ExprKind, ParamOrDestruct, StmtId, StmtKind};
use crate::context::SemaContext;
use crate::diag::SemaError;
use crate::symbol::Symbol;
use crate::symtab::Binding;
use crate::typecheck::{self, Ty};

/// `sema_build_scope`: clear globals, then register every top-level
/// declaration under its mangled name (`<module>_<raw>`), except
/// extern functions, which keep their raw (unmangled) name.
///
/// §4.1: a name already claimed by a *different* declaration is a fatal
/// `DuplicateDeclaration` (two top-level decls mangling to the same global
/// name); reinserting the same declaration is a no-op.
pub fn build_scope(ctx: &mut SemaContext, ast: &Ast, module_path: &str) -> Result<(), SemaError> {
  ctx.symtab.clear_globals();
  let sanitized = module_path.replace('.', "_");
  for idx in 0..ast.decl_count() {
    let decl_id = crate::ids::Idx::from_usize(idx);
    let kind = ast.decl(decl_id).kind.clone();
    match kind {
      DeclKind::Variable { name, ty, is_mutable } => {
        let mangled = mangle(ctx, &sanitized, name);
        let resolved_ty = typecheck::resolve_ast_ty(ctx, ast, &ty);
        insert_global_checked(ctx, mangled, Binding { ty: resolved_ty, decl: Some(decl_id), is_global: true, is_mutable })?;
      }
      DeclKind::ExternFunction(f) => {
        let resolved_ty = typecheck::resolve_ast_ty(ctx, ast, &f.return_type);
        insert_global_checked(ctx, f.name, Binding { ty: resolved_ty, decl: Some(decl_id), is_global: true, is_mutable: false })?;
      }
      DeclKind::Function(f) => {
        let mangled = mangle(ctx, &sanitized, f.name);
        let resolved_ty = typecheck::resolve_ast_ty(ctx, ast, &f.return_type);
        insert_global_checked(ctx, mangled, Binding { ty: resolved_ty, decl: Some(decl_id), is_global: true, is_mutable: false })?;
      }
      DeclKind::Struct { name, .. } => {
        let mangled = mangle(ctx, &sanitized, name);
        insert_global_checked(ctx, mangled, Binding { ty: Ty::Struct(mangled, decl_id), decl: Some(decl_id), is_global: true, is_mutable: false })?;
      }
      DeclKind::Enum { name, .. } => {
        // Only the enum type name is registered here; individual variants
        // are resolved by `resolve_identifier`'s enum-scan fallback.
        let mangled = mangle(ctx, &sanitized, name);
        insert_global_checked(ctx, mangled, Binding { ty: Ty::Enum(mangled, decl_id), decl: Some(decl_id), is_global: true, is_mutable: false })?;
      }
      DeclKind::Import { .. } => {}
    }
  }
  Ok(())
}

fn insert_global_checked(ctx: &mut SemaContext, mangled: Symbol, binding: Binding) -> Result<(), SemaError> {
  let name = ctx.interner.resolve(mangled).to_string();
  ctx.symtab.insert_global(mangled, binding).map_err(|_| SemaError::DuplicateDeclaration { name, span: None })
}

fn mangle(ctx: &mut SemaContext, module_sanitized: &str, raw: Symbol) -> Symbol {
  let raw_text = ctx.interner.resolve(raw).to_string();
  ctx.intern(&format!("{module_sanitized}_{raw_text}"))
}

/// `sema_resolve_expr`'s `IDENTIFIER` case: locals-then-globals lookup; on
/// miss, scan enum declarations for a variant with this raw name and
/// synthesize `<module>_<Enum>_<Variant>`.
pub fn resolve_expr(ctx: &mut SemaContext, ast: &Ast, id: ExprId) -> Result<(), SemaError> {
  match ast.expr(id).kind.clone() {
    ExprKind::Identifier(sym) => resolve_identifier(ctx, ast, id, sym),
    ExprKind::Member { target, .. } => resolve_expr(ctx, ast, target),
    ExprKind::Index { target, index } => {
      resolve_expr(ctx, ast, target)?;
      resolve_expr(ctx, ast, index)
    }
    ExprKind::Range { lo, hi } => {
      resolve_expr(ctx, ast, lo)?;
      resolve_expr(ctx, ast, hi)
    }
    ExprKind::Binary { lhs, rhs, .. } => {
      resolve_expr(ctx, ast, lhs)?;
      resolve_expr(ctx, ast, rhs)
    }
    ExprKind::Unary { operand, .. } | ExprKind::Borrow { operand, .. } => resolve_expr(ctx, ast, operand),
    ExprKind::Call { callee, args } => {
      check_purity_of_call(ctx, ast, callee)?;
      resolve_expr(ctx, ast, callee)?;
      for a in &args { resolve_expr(ctx, ast, *a)?; }
      Ok(())
    }
    ExprKind::Literal(_) | ExprKind::StringLit(_) | ExprKind::CharLit(_) => Ok(()),
  }
}

fn resolve_identifier(ctx: &mut SemaContext, ast: &Ast, id: ExprId, sym: Symbol) -> Result<(), SemaError> {
  if let Some(binding) = ctx.symtab.lookup(sym) {
    let mangled = sym;
    let is_global = binding.is_global;
    let ty = binding.ty.clone();
    let decl = binding.decl;
    ctx.side.expr_ty.insert(id, ty);
    ctx.side.expr_is_global.insert(id, is_global);
    ctx.side.expr_mangled.insert(id, mangled);
    if let Some(d) = decl { ctx.side.expr_decl.insert(id, d); }
    return Ok(());
  }
  // Enum-variant fallback scan.
  if let Some((mangled, decl_id)) = find_enum_variant(ctx, ast, sym) {
    ctx.side.expr_ty.insert(id, Ty::Int);
    ctx.side.expr_is_global.insert(id, true);
    ctx.side.expr_mangled.insert(id, mangled);
    ctx.side.expr_decl.insert(id, decl_id);
    return Ok(());
  }
  Err(SemaError::UndefinedIdentifier { name: ctx.interner.resolve(sym).to_string(), span: None })
}

fn find_enum_variant(ctx: &mut SemaContext, ast: &Ast, variant_raw: Symbol) -> Option<(Symbol, crate::ids::DeclId)> {
  let variant_text = ctx.interner.resolve(variant_raw).to_string();
  let sanitized = ctx.current_module_path.map(|m| ctx.interner.resolve(m).replace('.', "_"));
  for idx in 0..ast.decl_count() {
    let decl_id = crate::ids::Idx::from_usize(idx);
    if let DeclKind::Enum { name, variants } = &ast.decl(decl_id).kind {
      for v in variants {
        if ctx.interner.resolve(v.name) == variant_text {
          let enum_name = ctx.interner.resolve(*name).to_string();
          let mangled = match &sanitized {
            Some(module) => ctx.intern(&format!("{module}_{enum_name}_{variant_text}")),
            None => ctx.intern(&format!("{enum_name}_{variant_text}")),
          };
          return Some((mangled, decl_id));
        }
      }
    }
  }
  None
}

fn check_purity_of_call(ctx: &SemaContext, ast: &Ast, callee: ExprId) -> Result<(), SemaError> {
  let Some(current) = ctx.current_function else { return Ok(()) };
  let DeclKind::Function(caller) = &ast.decl(current).kind else { return Ok(()) };
  if !caller.is_pure { return Ok(()) }
  let ExprKind::Identifier(sym) = ast.expr(callee).kind else { return Ok(()) };
  let Some(binding) = ctx.symtab.lookup(sym) else { return Ok(()) };
  let Some(decl_id) = binding.decl else { return Ok(()) };
  let is_procedure = matches!(&ast.decl(decl_id).kind, DeclKind::Function(f) if !f.is_pure)
    || matches!(&ast.decl(decl_id).kind, DeclKind::ExternFunction(f) if !f.is_pure);
  if is_procedure {
    let err = SemaError::PurityViolationCall {
      function: ctx.interner.resolve(caller.name).to_string(),
      span: None,
    };
    if !ctx.should_suppress(&err) { return Err(err) }
  }
  Ok(())
}

/// `sema_resolve_stmt`.
pub fn resolve_stmt(ctx: &mut SemaContext, ast: &Ast, id: StmtId) -> Result<(), SemaError> {
  match ast.stmt(id).kind.clone() {
    StmtKind::Use { target, alias } => {
      resolve_expr(ctx, ast, target)?;
      let ty = ctx.side.expr_ty.get(&target).cloned().unwrap_or(Ty::Unknown);
      if let Some(alias_name) = alias {
        ctx.symtab.insert_local(alias_name, Binding { ty, decl: None, is_global: false, is_mutable: false });
      }
      Ok(())
    }
    StmtKind::Var { name, init, ty } => {
      resolve_expr(ctx, ast, init)?;
      let resolved = ty.as_ref().map_or_else(
        || ctx.side.expr_ty.get(&init).cloned().unwrap_or(Ty::Unknown),
        |t| typecheck::resolve_ast_ty(ctx, ast, t),
      );
      ctx.side.var_ty.insert(id, resolved.clone());
      ctx.symtab.insert_local(name, Binding { ty: resolved, decl: None, is_global: false, is_mutable: true });
      Ok(())
    }
    StmtKind::If { cond, then_branch, else_branch } => {
      resolve_expr(ctx, ast, cond)?;
      for &s in &then_branch { resolve_stmt(ctx, ast, s)?; }
      if let Some(else_stmts) = &else_branch {
        for &s in else_stmts { resolve_stmt(ctx, ast, s)?; }
      }
      Ok(())
    }
    StmtKind::For { index_name, value_name, iterable, body } => {
      resolve_expr(ctx, ast, iterable)?;
      ctx.symtab.insert_local(value_name, Binding { ty: Ty::Unknown, decl: None, is_global: false, is_mutable: true });
      if let Some(idx) = index_name {
        ctx.symtab.insert_local(idx, Binding { ty: Ty::Int, decl: None, is_global: false, is_mutable: true });
      }
      for &s in &body { resolve_stmt(ctx, ast, s)?; }
      Ok(())
    }
    StmtKind::While { cond, body } => {
      resolve_expr(ctx, ast, cond)?;
      for &s in &body { resolve_stmt(ctx, ast, s)?; }
      Ok(())
    }
    StmtKind::Assign { target, value } => {
      // An assignment to a never-before-seen identifier implicitly declares
      // it as a new immutable local (`resolve.h`'s early-return branch).
      if let ExprKind::Identifier(sym) = ast.expr(target).kind {
        if ctx.symtab.lookup(sym).is_none() {
          resolve_expr(ctx, ast, value)?;
          let ty = ctx.side.expr_ty.get(&value).cloned().unwrap_or(Ty::Unknown);
          ctx.symtab.insert_local(sym, Binding { ty, decl: None, is_global: false, is_mutable: false });
          ctx.side.expr_is_global.insert(target, false);
          return Ok(());
        }
        if let Some(binding) = ctx.symtab.lookup(sym) {
          if !binding.is_mutable {
            return Err(SemaError::AssignToImmutable {
              name: ctx.interner.resolve(sym).to_string(),
              span: None,
            });
          }
        }
        if let Some(current) = ctx.current_function {
          if let DeclKind::Function(f) = &ast.decl(current).kind {
            if f.is_pure && ctx.symtab.lookup(sym).is_some_and(|b| b.is_global) {
              let err = SemaError::PurityViolationAssign {
                function: ctx.interner.resolve(f.name).to_string(),
                span: None,
              };
              if !ctx.should_suppress(&err) { return Err(err) }
            }
          }
        }
      }
      resolve_expr(ctx, ast, target)?;
      resolve_expr(ctx, ast, value)
    }
    StmtKind::Expr(e) => resolve_expr(ctx, ast, e),
    StmtKind::Return(value) => value.map_or(Ok(()), |v| resolve_expr(ctx, ast, v)),
    StmtKind::Match { value, cases } => {
      resolve_expr(ctx, ast, value)?;
      for case in &cases {
        if let Some(pattern) = case.pattern { resolve_expr(ctx, ast, pattern)?; }
        for &s in &case.body { resolve_stmt(ctx, ast, s)?; }
      }
      crate::exhaustiveness::check_match_exhaustive(ctx, ast, value, &cases)
    }
    StmtKind::Unsafe(body) => {
      let was_unsafe = ctx.in_unsafe_block;
      ctx.in_unsafe_block = true;
      for &s in &body { resolve_stmt(ctx, ast, s)?; }
      ctx.in_unsafe_block = was_unsafe;
      Ok(())
    }
    StmtKind::Continue | StmtKind::Break => Ok(()),
  }
}

/// Insert a function's parameters as locals, including destructuring
/// parameters (`DeclDestruct` in the original, `DestructParam` here) and
/// `in_field` index-range parameters (SPEC_FULL.md §B.3/§B.6).
pub fn bind_params(ctx: &mut SemaContext, ast: &Ast, params: &[ParamOrDestruct]) -> Result<(), SemaError> {
  for p in params {
    match p {
      ParamOrDestruct::Param(param) => {
        let ty = typecheck::resolve_ast_ty(ctx, ast, &param.ty);
        if let Some(array_param) = param.in_field {
          let len = ctx.symtab.lookup(array_param).and_then(|b| b.ty.array_len());
          let range = len.map_or(crate::ranges::Range::make(0, i64::MAX), |l| crate::ranges::Range::make(0, l - 1));
          ctx.ranges.set(param.name, range);
        }
        ctx.symtab.insert_local(param.name, Binding { ty, decl: None, is_global: false, is_mutable: true });
      }
      ParamOrDestruct::Destruct(d) => {
        let decl_id = ctx.symtab.lookup_global(d.struct_name).and_then(|b| b.decl);
        let Some(decl_id) = decl_id else {
          return Err(SemaError::UnknownStruct {
            name: ctx.interner.resolve(d.struct_name).to_string(),
            span: None,
          });
        };
        let DeclKind::Struct { fields, .. } = ast.decl(decl_id).kind.clone() else {
          return Err(SemaError::UnknownStruct {
            name: ctx.interner.resolve(d.struct_name).to_string(),
            span: None,
          });
        };
        for &field_name in &d.names {
          let field_ty = fields
            .iter()
            .find(|f| f.name == field_name)
            .map(|f| typecheck::resolve_ast_ty(ctx, ast, &f.ty))
            .ok_or_else(|| SemaError::UnknownField {
              struct_name: ctx.interner.resolve(d.struct_name).to_string(),
              field: ctx.interner.resolve(field_name).to_string(),
              span: None,
            })?;
          ctx.symtab.insert_local(field_name, Binding { ty: field_ty, decl: None, is_global: false, is_mutable: true });
        }
      }
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::ExprKind;
  use crate::context::{SemaConfig, SemaContext};

  #[test]
  fn undefined_identifier_is_an_error() {
    let mut ctx = SemaContext::new(SemaConfig::default());
    let mut ast = Ast::new();
    let sym = ctx.intern("nope");
    let id = ast.alloc_expr(ExprKind::Identifier(sym), None);
    assert!(resolve_expr(&mut ctx, &ast, id).is_err());
  }

  #[test]
  fn local_shadows_then_resolves() {
    let mut ctx = SemaContext::new(SemaConfig::default());
    let mut ast = Ast::new();
    let sym = ctx.intern("x");
    ctx.symtab.insert_local(sym, Binding { ty: Ty::Int, decl: None, is_global: false, is_mutable: true });
    let id = ast.alloc_expr(ExprKind::Identifier(sym), None);
    assert!(resolve_expr(&mut ctx, &ast, id).is_ok());
  }
}
