//! The module driver (§4.8), grounded in `original_source/src/sema.h`'s
//! `sema_resolve_module` — the single entry point that runs every pass, in
//! order, for every function in a module.
//!
//! Per function the original does: clear locals -> bind params (including
//! `in_field` ranges and declared constraints) -> set
//! `current_return_type`/`current_function_decl` -> apply `pre_contracts`
//! -> inject a `result` local if there are `post_contracts` -> resolve the
//! body (`sema_resolve_stmt`) -> a combined type-inference + range-
//! propagation walk over the body -> clear current-function state ->
//! `sema_check_function_linearity` (run *after* the combined walk, while
//! locals are still live, per an explicit comment in `sema.h`) -> clear
//! locals. [`analyze_module`] reproduces that order exactly, just without
//! the global statics.

use crate::ast::{Ast, BinOp, DeclKind, ExprId, ParamOrDestruct, StmtId, StmtKind};
use crate::context::SemaContext;
use crate::diag::SemaError;
use crate::ranges::Range;
use crate::symtab::Binding;
use crate::typecheck::{self, Ty};

/// Analyze every function declaration in a module, collecting every
/// diagnostic raised rather than stopping at the first (the original's
/// `exit(1)` is one-shot; this lets a single `cargo test` run see every
/// scenario's error in one pass if desired, while [`analyze_function`]
/// itself still short-circuits within a function on the first error, matching
/// the per-statement fatal style of the original).
pub fn analyze_module(ctx: &mut SemaContext, ast: &Ast, module_path: &str) {
  ctx.reset_module_state();
  ctx.current_module_path = Some(ctx.intern(module_path));
  if let Err(e) = crate::resolve::build_scope(ctx, ast, module_path) {
    ctx.diags.push(e);
    return;
  }

  for idx in 0..ast.decl_count() {
    let decl_id = crate::ids::Idx::from_usize(idx);
    if let DeclKind::Function(_) = &ast.decl(decl_id).kind {
      if let Err(e) = analyze_function(ctx, ast, decl_id) {
        ctx.diags.push(e);
      }
    }
  }
}

fn analyze_function(ctx: &mut SemaContext, ast: &Ast, decl_id: crate::ids::DeclId) -> Result<(), SemaError> {
  ctx.symtab.clear_locals();
  let DeclKind::Function(f) = ast.decl(decl_id).kind.clone() else { return Ok(()) };

  crate::resolve::bind_params(ctx, ast, &f.params)?;
  for p in &f.params {
    if let ParamOrDestruct::Param(param) = p {
      if param.ty.is_linear() {
        ctx.linear.add(param.name, 0);
      }
    }
  }

  ctx.current_function = Some(decl_id);
  ctx.current_return_type = Some(typecheck::resolve_ast_ty(ctx, ast, &f.return_type));

  for p in &f.params {
    if let ParamOrDestruct::Param(param) = p {
      for &c in &param.constraints {
        crate::resolve::resolve_expr(ctx, ast, c)?;
        typecheck::infer_expr(ctx, ast, c)?;
        ctx.ranges.apply_condition(ast, c);
      }
    }
  }

  for &c in &f.pre_contracts {
    crate::resolve::resolve_expr(ctx, ast, c)?;
    typecheck::infer_expr(ctx, ast, c)?;
    ctx.ranges.apply_condition(ast, c);
  }

  let result_sym = if !f.post_contracts.is_empty() {
    let sym = ctx.intern("result");
    let ret_ty = ctx.current_return_type.clone().unwrap_or(Ty::Unknown);
    ctx.symtab.insert_local(sym, Binding { ty: ret_ty, decl: None, is_global: false, is_mutable: false });
    Some(sym)
  } else {
    None
  };
  for &c in &f.post_contracts {
    crate::resolve::resolve_expr(ctx, ast, c)?;
    typecheck::infer_expr(ctx, ast, c)?;
  }

  for &s in &f.body {
    crate::resolve::resolve_stmt(ctx, ast, s)?;
  }
  for &s in &f.body {
    propagate_stmt(ctx, ast, s, result_sym, &f.post_contracts, &f.return_constraints)?;
  }

  ctx.current_return_type = None;

  check_function_linearity(ctx, ast, &f)?;

  ctx.current_function = None;
  ctx.symtab.clear_locals();
  Ok(())
}

fn check_function_linearity(
  ctx: &mut SemaContext, ast: &Ast, f: &crate::ast::FunctionDecl,
) -> Result<(), SemaError> {
  for &s in &f.body {
    crate::linearity::check_stmt_linearity(ctx, ast, s, 0)?;
    ctx.borrows.clear_all();
  }
  ctx.linear.ensure_all_consumed(|s| ctx.interner.resolve(s).to_string())
}

/// The combined type-inference + range-propagation walk (the nested
/// `walk_stmt` closure in `sema_resolve_module`).
fn propagate_stmt(
  ctx: &mut SemaContext, ast: &Ast, id: StmtId, result_sym: Option<crate::symbol::Symbol>,
  post_contracts: &[ExprId], return_constraints: &[ExprId],
) -> Result<(), SemaError> {
  match ast.stmt(id).kind.clone() {
    StmtKind::Var { name, init, .. } => {
      typecheck::infer_expr(ctx, ast, init)?;
      let r = ctx.ranges.eval(ast, init);
      ctx.ranges.set(name, r);
      Ok(())
    }
    StmtKind::If { cond, then_branch, else_branch } => {
      typecheck::infer_expr(ctx, ast, cond)?;
      let saved = ctx.ranges.snapshot();
      ctx.ranges.apply_condition(ast, cond);
      for &s in &then_branch { propagate_stmt(ctx, ast, s, result_sym, post_contracts, return_constraints)?; }
      ctx.ranges.restore(saved.clone());
      ctx.ranges.apply_negated_condition(ast, cond);
      if let Some(else_stmts) = &else_branch {
        for &s in else_stmts { propagate_stmt(ctx, ast, s, result_sym, post_contracts, return_constraints)?; }
      }
      ctx.ranges.restore(saved);
      Ok(())
    }
    StmtKind::For { value_name, iterable, body, .. } => {
      typecheck::infer_expr(ctx, ast, iterable)?;
      let iter_range = ctx.ranges.eval(ast, iterable);
      if iter_range.known {
        ctx.ranges.set(value_name, Range::make(iter_range.min, iter_range.max.saturating_sub(1)));
      }
      widen_loop(ctx, &body, ast);
      for &s in &body { propagate_stmt(ctx, ast, s, result_sym, post_contracts, return_constraints)?; }
      widen_loop(ctx, &body, ast);
      Ok(())
    }
    StmtKind::While { cond, body } => {
      typecheck::infer_expr(ctx, ast, cond)?;
      widen_loop(ctx, &body, ast);
      for &s in &body { propagate_stmt(ctx, ast, s, result_sym, post_contracts, return_constraints)?; }
      widen_loop(ctx, &body, ast);
      Ok(())
    }
    StmtKind::Assign { target, value } => {
      typecheck::infer_expr(ctx, ast, value)?;
      if let crate::ast::ExprKind::Identifier(lhs) = ast.expr(target).kind {
        let r = ctx.ranges.eval(ast, value);
        ctx.ranges.set(lhs, r);
        record_linear_constraint(ctx, ast, lhs, value);
      }
      Ok(())
    }
    StmtKind::Expr(e) => { typecheck::infer_expr(ctx, ast, e)?; Ok(()) }
    StmtKind::Return(value) => {
      let ret_range = value.map_or(Range::unknown(), |v| {
        let _ = typecheck::infer_expr(ctx, ast, v);
        ctx.ranges.eval(ast, v)
      });
      if let Some(result) = result_sym {
        for &post in post_contracts {
          if ctx.ranges.check_post_condition(ast, post, result, ret_range) == Some(false) {
            return Err(SemaError::PostConditionViolation { span: None });
          }
        }
      }
      for &rc in return_constraints {
        if let Some(result) = result_sym {
          if ctx.ranges.check_post_condition(ast, rc, result, ret_range) == Some(false) {
            return Err(SemaError::ReturnConstraintViolation { span: None });
          }
        }
      }
      Ok(())
    }
    StmtKind::Match { value, cases } => {
      typecheck::infer_expr(ctx, ast, value)?;
      for case in &cases {
        for &s in &case.body { propagate_stmt(ctx, ast, s, result_sym, post_contracts, return_constraints)?; }
      }
      Ok(())
    }
    StmtKind::Unsafe(body) => {
      let was = ctx.in_unsafe_block;
      ctx.in_unsafe_block = true;
      for &s in &body { propagate_stmt(ctx, ast, s, result_sym, post_contracts, return_constraints)?; }
      ctx.in_unsafe_block = was;
      Ok(())
    }
    StmtKind::Use { .. } | StmtKind::Continue | StmtKind::Break => Ok(()),
  }
}

/// `constraint_add`'s call sites in `sema.h`: recognize `x = y + c`,
/// `x = c + y`, `x = y - c`, and `x = y`, recording the relational
/// constraint symmetrically in both directions. `x - y <= c`, so
/// `x = y + c` records `c` directly and `x = y - c` records `-c`
/// (`sema.h:297`/`:310`).
fn record_linear_constraint(ctx: &mut SemaContext, ast: &Ast, lhs: crate::symbol::Symbol, value: ExprId) {
  use crate::ast::ExprKind;
  match ast.expr(value).kind {
    ExprKind::Identifier(rhs) => ctx.ranges.add_constraint_pair(lhs, rhs, 0),
    ExprKind::Binary { op: BinOp::Add, lhs: l, rhs: r } => {
      match (&ast.expr(l).kind, &ast.expr(r).kind) {
        (ExprKind::Identifier(y), ExprKind::Literal(c)) | (ExprKind::Literal(c), ExprKind::Identifier(y)) =>
          ctx.ranges.add_constraint_pair(lhs, *y, *c),
        _ => {}
      }
    }
    ExprKind::Binary { op: BinOp::Sub, lhs: l, rhs: r } => {
      if let (ExprKind::Identifier(y), ExprKind::Literal(c)) = (&ast.expr(l).kind, &ast.expr(r).kind) {
        ctx.ranges.add_constraint_pair(lhs, *y, -*c);
      }
    }
    _ => {}
  }
}

/// `sema_widen_loop`: recursively widen every `STMT_ASSIGN` target inside
/// `if`/`for`/`match` bodies to unknown, run once before and once after the
/// loop body is walked (an explicit two-pass design per
/// SPEC_FULL.md's Open Question resolution: the original calls it both
/// before and after deliberately, to account for a loop that runs zero
/// times as well as one that runs more than once).
fn widen_loop(ctx: &mut SemaContext, body: &[StmtId], ast: &Ast) {
  for &id in body {
    match ast.stmt(id).kind.clone() {
      StmtKind::Assign { target, .. } => {
        if let crate::ast::ExprKind::Identifier(sym) = ast.expr(target).kind {
          ctx.ranges.set(sym, Range::unknown());
        }
      }
      StmtKind::If { then_branch, else_branch, .. } => {
        widen_loop(ctx, &then_branch, ast);
        if let Some(e) = &else_branch { widen_loop(ctx, e, ast); }
      }
      StmtKind::For { body, .. } | StmtKind::While { body, .. } => widen_loop(ctx, &body, ast),
      StmtKind::Match { cases, .. } => {
        for case in &cases { widen_loop(ctx, &case.body, ast); }
      }
      StmtKind::Unsafe(inner) => widen_loop(ctx, &inner, ast),
      _ => {}
    }
  }
}
