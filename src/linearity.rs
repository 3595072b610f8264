//! Linearity and borrow checking (§4.7), grounded in
//! `original_source/src/sema/linearity.h`.
//!
//! Branch handling (`if`/`match`) snapshots the table, walks each branch
//! against its own clone, checks the branches left every linear variable in
//! a consistent state, then merges the chosen branch back — using
//! `im::HashMap`'s structural sharing instead of the original's
//! `ltable_clone`/`ltable_free` arena churn (SPEC_FULL.md §A.3).

use im::HashMap as ImHashMap;

use crate::ast::{self, Ast, ExprId, ExprKind, MatchCase, ParamOrDestruct, StmtId, StmtKind};
use crate::context::SemaContext;
use crate::diag::SemaError;
use crate::region::BorrowMode;
use crate::symbol::Symbol;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LState {
  Unconsumed,
  Consumed,
}

#[derive(Clone, Copy, Debug)]
pub struct LEntry {
  pub defined_loop_depth: u32,
  pub state: LState,
}

/// `LTable` in `linearity.h`, minus the embedded borrow table (that is
/// [`crate::region::BorrowTable`] here, threaded alongside rather than
/// nested inside, so [`crate::context::SemaContext`] owns exactly one of
/// each).
#[derive(Clone, Default)]
pub struct LinearityTable {
  entries: ImHashMap<Symbol, LEntry>,
}

impl LinearityTable {
  #[must_use] pub fn new() -> Self { Self::default() }

  pub fn add(&mut self, var: Symbol, loop_depth: u32) {
    self.entries.insert(var, LEntry { defined_loop_depth: loop_depth, state: LState::Unconsumed });
  }

  #[must_use] pub fn find(&self, var: Symbol) -> Option<LEntry> { self.entries.get(&var).copied() }

  /// `ltable_consume`: fatal if already consumed, fatal if consuming from a
  /// deeper loop nest than where the variable was defined.
  pub fn consume(&mut self, var: Symbol, name: &str, current_loop_depth: u32) -> Result<(), SemaError> {
    let Some(entry) = self.entries.get(&var).copied() else { return Ok(()) };
    if entry.state == LState::Consumed {
      return Err(SemaError::UseAfterConsume { name: name.to_string(), span: None });
    }
    if current_loop_depth > entry.defined_loop_depth {
      return Err(SemaError::ConsumeAcrossLoopBoundary { name: name.to_string(), span: None });
    }
    self.entries.insert(var, LEntry { state: LState::Consumed, ..entry });
    Ok(())
  }

  /// `ltable_ensure_all_consumed`: used both at function-end and after a
  /// `return` statement.
  pub fn ensure_all_consumed(&self, resolve: impl Fn(Symbol) -> String) -> Result<(), SemaError> {
    for (&var, entry) in &self.entries {
      if entry.state == LState::Unconsumed {
        return Err(SemaError::UnconsumedOnReturn { name: resolve(var), span: None });
      }
    }
    Ok(())
  }

  #[must_use] pub fn snapshot(&self) -> Self { self.clone() }

  /// `ltable_check_branch_consistency`: every linear variable present in
  /// both snapshots must have the same consumed/unconsumed state.
  #[must_use] pub fn check_consistency(&self, other: &Self) -> Vec<Symbol> {
    let mut mismatched = Vec::new();
    for (&var, entry) in &self.entries {
      if let Some(other_entry) = other.entries.get(&var) {
        if other_entry.state != entry.state {
          mismatched.push(var);
        }
      }
    }
    mismatched
  }

  /// `ltable_merge_from_branch`: adopt the `from` table's states wholesale
  /// (used once branches have already been checked consistent, or for the
  /// unconditional `then`-with-no-`else` case per the original).
  pub fn merge_from(&mut self, from: &Self) { self.entries = from.entries.clone(); }
}

/// Walks an expression checking linearity rules, mirroring
/// `sema_check_expr_linearity` in `linearity.h`: identifiers whose type is
/// move-typed get consumed on use; call arguments are aligned against the
/// callee's declared parameter modes.
pub fn check_expr_linearity(
  ctx: &mut SemaContext, ast: &Ast, id: ExprId, loop_depth: u32,
) -> Result<(), SemaError> {
  match ast.expr(id).kind.clone() {
    // A bare identifier reference never consumes on its own — only an
    // explicit `mov` expression, or a call argument aligned to an
    // owned-mode parameter, does (`linearity.h`'s `EXPR_MOVE` /
    // `CALL`+`MODE_OWNED` handling). It can still be a dangling reference,
    // though, if it names a `var r mut owner = ...` binding whose owner was
    // since moved (`borrow_check_use_after_move`, `region.h:228`).
    ExprKind::Identifier(sym) => {
      let name = ctx.interner.resolve(sym).to_string();
      if let Some(err) = ctx.borrows.check_use_after_move(sym, &name) {
        if !ctx.should_suppress(&err) { return Err(err) }
      }
      Ok(())
    }
    ExprKind::Member { target, .. } | ExprKind::Index { target, .. } =>
      check_expr_linearity(ctx, ast, target, loop_depth),
    ExprKind::Unary { operand, .. } => check_expr_linearity(ctx, ast, operand, loop_depth),
    ExprKind::Binary { lhs, rhs, .. } => {
      check_expr_linearity(ctx, ast, lhs, loop_depth)?;
      check_expr_linearity(ctx, ast, rhs, loop_depth)
    }
    ExprKind::Range { lo, hi } => {
      check_expr_linearity(ctx, ast, lo, loop_depth)?;
      check_expr_linearity(ctx, ast, hi, loop_depth)
    }
    ExprKind::Borrow { kind: ast::BorrowKind::Move, operand } => {
      if let ExprKind::Identifier(sym) = ast.expr(operand).kind {
        let name = ctx.interner.resolve(sym).to_string();
        if ctx.borrows.is_borrowed(sym) {
          let err = SemaError::MoveWhileBorrowed { name, span: None };
          if !ctx.should_suppress(&err) { return Err(err) }
        }
        ctx.linear.consume(sym, &ctx.interner.resolve(sym).to_string(), loop_depth)?;
        ctx.borrows.invalidate_owner(sym);
      }
      check_expr_linearity(ctx, ast, operand, loop_depth)
    }
    ExprKind::Borrow { kind: ast::BorrowKind::Mut, operand } => check_expr_linearity(ctx, ast, operand, loop_depth),
    ExprKind::Call { callee, args } => check_call(ctx, ast, callee, &args, loop_depth),
    ExprKind::Literal(_) | ExprKind::StringLit(_) | ExprKind::CharLit(_) => Ok(()),
  }
}

/// Peel away `mov`/`mut` use-site wrappers to find the identifier a call
/// argument ultimately names, if any.
fn strip_borrow(ast: &Ast, id: ExprId) -> ExprId {
  match ast.expr(id).kind {
    ExprKind::Borrow { operand, .. } => strip_borrow(ast, operand),
    _ => id,
  }
}

fn check_call(
  ctx: &mut SemaContext, ast: &Ast, callee: ExprId, args: &[ExprId], loop_depth: u32,
) -> Result<(), SemaError> {
  let param_modes = callee_param_modes(ctx, ast, callee);
  for (i, &arg) in args.iter().enumerate() {
    let inner = strip_borrow(ast, arg);
    let ident = match ast.expr(inner).kind {
      ExprKind::Identifier(sym) => Some(sym),
      _ => None,
    };
    match (param_modes.get(i).copied(), ident) {
      (Some(ast::Mode::Owned), Some(sym)) => {
        let name = ctx.interner.resolve(sym).to_string();
        if ctx.borrows.is_borrowed(sym) {
          let err = SemaError::MoveWhileBorrowed { name: name.clone(), span: None };
          if !ctx.should_suppress(&err) { return Err(err) }
        }
        ctx.linear.consume(sym, &name, loop_depth)?;
        ctx.borrows.invalidate_owner(sym);
      }
      (Some(mode @ (ast::Mode::Mutable | ast::Mode::Shared)), Some(sym)) => {
        let name = ctx.interner.resolve(sym).to_string();
        let bmode = BorrowMode::from(mode);
        if let Err(err) = ctx.borrows.register(sym, bmode, &name, None) {
          if !ctx.should_suppress(&err) { return Err(err) }
        }
      }
      (None, Some(sym)) => {
        // Callee declaration unresolved: fall back to consuming any
        // move-typed argument, per `linearity.h`'s fallback branch.
        if ctx.side.expr_ty.get(&arg).is_some_and(crate::typecheck::Ty::is_linear) {
          let name = ctx.interner.resolve(sym).to_string();
          ctx.linear.consume(sym, &name, loop_depth)?;
        }
      }
      (_, None) => check_expr_linearity(ctx, ast, arg, loop_depth)?,
    }
  }
  Ok(())
}

fn callee_param_modes(ctx: &SemaContext, ast: &Ast, callee: ExprId) -> Vec<ast::Mode> {
  let ExprKind::Identifier(sym) = ast.expr(callee).kind else { return Vec::new() };
  let Some(binding) = ctx.symtab.lookup_global(sym) else { return Vec::new() };
  let Some(decl_id) = binding.decl else { return Vec::new() };
  let ast::DeclKind::Function(f) = &ast.decl(decl_id).kind else { return Vec::new() };
  f.params
    .iter()
    .map(|p| match p {
      ParamOrDestruct::Param(param) => param_mode(param),
      ParamOrDestruct::Destruct(_) => ast::Mode::Owned,
    })
    .collect()
}

fn param_mode(param: &ast::Param) -> ast::Mode {
  match param.qualifier {
    Some(ast::BorrowKind::Move) => ast::Mode::Owned,
    Some(ast::BorrowKind::Mut) => ast::Mode::Mutable,
    None => param.ty.mode(),
  }
}

/// Walks a statement checking linearity, mirroring
/// `sema_check_stmt_linearity_with_table` in `linearity.h`.
pub fn check_stmt_linearity(
  ctx: &mut SemaContext, ast: &Ast, id: StmtId, loop_depth: u32,
) -> Result<(), SemaError> {
  match ast.stmt(id).kind.clone() {
    StmtKind::Var { name, init, .. } => {
      check_expr_linearity(ctx, ast, init, loop_depth)?;
      ctx.borrows.declare(name);
      if let ExprKind::Borrow { kind: ast::BorrowKind::Mut, operand } = ast.expr(init).kind {
        if let ExprKind::Identifier(owner) = ast.expr(operand).kind {
          let owner_name = ctx.interner.resolve(owner).to_string();
          if let Err(err) = ctx.borrows.register(owner, BorrowMode::Mutable, &owner_name, Some(name)) {
            if !ctx.should_suppress(&err) { return Err(err) }
          }
        }
      }
      let is_linear = ctx.side.var_ty.get(&id).is_some_and(crate::typecheck::Ty::is_linear);
      if is_linear {
        ctx.linear.add(name, loop_depth);
      }
      Ok(())
    }
    StmtKind::Assign { target, value } => {
      check_expr_linearity(ctx, ast, value, loop_depth)?;
      check_expr_linearity(ctx, ast, target, loop_depth)?;
      if let ExprKind::Identifier(name) = ast.expr(target).kind {
        if ctx.side.expr_ty.get(&value).is_some_and(crate::typecheck::Ty::is_linear)
          && ctx.linear.find(name).is_none()
        {
          ctx.linear.add(name, loop_depth);
        }
      }
      Ok(())
    }
    StmtKind::Expr(expr) => {
      if ctx.side.expr_ty.get(&expr).is_some_and(crate::typecheck::Ty::is_linear) {
        return Err(SemaError::DiscardedLinearValue { span: None });
      }
      check_expr_linearity(ctx, ast, expr, loop_depth)
    }
    StmtKind::If { cond, then_branch, else_branch } => {
      check_expr_linearity(ctx, ast, cond, loop_depth)?;
      let before = ctx.linear.snapshot();
      let parent = ctx.borrows.current_region();
      ctx.borrows.enter_scope();
      for &s in &then_branch { check_stmt_linearity(ctx, ast, s, loop_depth)?; }
      ctx.borrows.exit_scope(parent);
      let after_then = ctx.linear.snapshot();
      ctx.linear = before.clone();
      if let Some(else_stmts) = &else_branch {
        ctx.borrows.enter_scope();
        for &s in else_stmts { check_stmt_linearity(ctx, ast, s, loop_depth)?; }
        ctx.borrows.exit_scope(parent);
      }
      let after_else = ctx.linear.snapshot();
      let mismatched = after_then.check_consistency(&after_else);
      if let Some(&var) = mismatched.first() {
        let name = ctx.interner.resolve(var).to_string();
        return Err(SemaError::BranchInconsistency { name, construct: "if/else".to_string(), span: None });
      }
      ctx.linear.merge_from(&after_then);
      Ok(())
    }
    StmtKind::For { value_name, index_name, iterable, body } => {
      check_expr_linearity(ctx, ast, iterable, loop_depth)?;
      ctx.linear.add(value_name, loop_depth + 1);
      if let Some(idx) = index_name { ctx.linear.add(idx, loop_depth + 1); }
      let parent = ctx.borrows.current_region();
      ctx.borrows.enter_scope();
      for &s in &body { check_stmt_linearity(ctx, ast, s, loop_depth + 1)?; }
      ctx.borrows.exit_scope(parent);
      Ok(())
    }
    StmtKind::While { cond, body } => {
      check_expr_linearity(ctx, ast, cond, loop_depth)?;
      let parent = ctx.borrows.current_region();
      ctx.borrows.enter_scope();
      for &s in &body { check_stmt_linearity(ctx, ast, s, loop_depth + 1)?; }
      ctx.borrows.exit_scope(parent);
      Ok(())
    }
    StmtKind::Return(value) => {
      if let Some(v) = value { check_expr_linearity(ctx, ast, v, loop_depth)?; }
      ctx.linear.ensure_all_consumed(|s| ctx.interner.resolve(s).to_string())
    }
    StmtKind::Match { value, cases } => check_match_linearity(ctx, ast, value, &cases, loop_depth),
    StmtKind::Use { target, .. } => check_expr_linearity(ctx, ast, target, loop_depth),
    StmtKind::Unsafe(body) => {
      let was_unsafe = ctx.in_unsafe_block;
      ctx.in_unsafe_block = true;
      let parent = ctx.borrows.current_region();
      ctx.borrows.enter_scope();
      for &s in &body { check_stmt_linearity(ctx, ast, s, loop_depth)?; }
      ctx.borrows.exit_scope(parent);
      ctx.in_unsafe_block = was_unsafe;
      Ok(())
    }
    StmtKind::Continue | StmtKind::Break => Ok(()),
  }
}

fn check_match_linearity(
  ctx: &mut SemaContext, ast: &Ast, value: ExprId, cases: &[MatchCase], loop_depth: u32,
) -> Result<(), SemaError> {
  check_expr_linearity(ctx, ast, value, loop_depth)?;
  let before = ctx.linear.snapshot();
  let parent = ctx.borrows.current_region();
  let mut first_case: Option<LinearityTable> = None;
  for case in cases {
    ctx.linear = before.clone();
    ctx.borrows.enter_scope();
    for &s in &case.body { check_stmt_linearity(ctx, ast, s, loop_depth)?; }
    ctx.borrows.exit_scope(parent);
    let after = ctx.linear.snapshot();
    match &first_case {
      None => first_case = Some(after),
      Some(first) => {
        let mismatched = first.check_consistency(&after);
        if let Some(&var) = mismatched.first() {
          let name = ctx.interner.resolve(var).to_string();
          return Err(SemaError::BranchInconsistency { name, construct: "match".to_string(), span: None });
        }
      }
    }
  }
  if let Some(first) = first_case { ctx.linear.merge_from(&first); }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::context::{SemaConfig, SemaContext};

  #[test]
  fn consume_twice_is_an_error() {
    let mut ctx = SemaContext::new(SemaConfig::default());
    let x = ctx.intern("buf");
    ctx.linear.add(x, 0);
    ctx.linear.consume(x, "buf", 0).unwrap();
    assert!(ctx.linear.consume(x, "buf", 0).is_err());
  }

  #[test]
  fn consume_from_deeper_loop_is_an_error() {
    let mut ctx = SemaContext::new(SemaConfig::default());
    let x = ctx.intern("buf");
    ctx.linear.add(x, 0);
    assert!(ctx.linear.consume(x, "buf", 1).is_err());
  }

  #[test]
  fn branch_consistency_detects_mismatch() {
    let mut a = LinearityTable::new();
    let mut interner = crate::symbol::Interner::new();
    let x = interner.intern("x");
    a.add(x, 0);
    let mut b = a.clone();
    a.consume(x, "x", 0).unwrap();
    let mismatched = a.check_consistency(&b);
    assert_eq!(mismatched, vec![x]);
    b.consume(x, "x", 0).unwrap();
    assert!(a.check_consistency(&b).is_empty());
  }
}
