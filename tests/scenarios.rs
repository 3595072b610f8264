//! Integration tests exercising full-pipeline scenarios end to end through
//! [`birchc::driver::analyze_module`].
//!
//! No parser exists in this crate (see `DESIGN.md`), so every tree here is
//! built by hand against the public `ast`/`context` API, the same way a
//! future front end would. One convention worth spelling out: a reference to
//! a module-level declaration (a struct/enum name used as a type, or a
//! same-module function called by name) is written already in its mangled
//! form (`"{module}_{raw}"`, see `resolve::mangle`), since by the time an AST
//! reaches this crate name resolution hasn't run yet but mangling is a
//! property of the tree itself, not of the resolver. `extern` declarations
//! are the exception — they keep their raw name (`resolve::build_scope`
//! never mangles them), which is why every callee below that doesn't need
//! mangling is declared `extern`.

use birchc::ast::{
  Ast, BorrowKind, DeclKind, ExprKind, ExternFunctionDecl, FunctionDecl, MatchCase, Param,
  ParamOrDestruct, StmtKind, Ty, VariantDecl,
};
use birchc::context::{SemaConfig, SemaContext};
use birchc::diag::SemaError;
use smallvec::smallvec;

const MODULE: &str = "main";

#[test]
fn scenario_linear_move_not_consumed() {
  let mut ctx = SemaContext::new(SemaConfig::default());
  let mut ast = Ast::new();

  let make = ctx.intern("make");
  ast.alloc_decl(
    DeclKind::ExternFunction(ExternFunctionDecl {
      name: make,
      params: smallvec![],
      return_type: Ty::Move(std::rc::Rc::new(Ty::Simple(ctx.intern("int")))),
      is_pure: false,
    }),
    None,
  );

  let s = ctx.intern("s");
  let call_make = ast.alloc_expr(ExprKind::Identifier(make), None);
  let call = ast.alloc_expr(ExprKind::Call { callee: call_make, args: smallvec![] }, None);
  let var_stmt = ast.alloc_stmt(
    StmtKind::Var { name: s, ty: Some(Ty::Move(std::rc::Rc::new(Ty::Simple(ctx.intern("int"))))), init: call },
    None,
  );
  let zero = ast.alloc_expr(ExprKind::Literal(0), None);
  let ret = ast.alloc_stmt(StmtKind::Return(Some(zero)), None);

  ast.alloc_decl(
    DeclKind::Function(FunctionDecl {
      name: ctx.intern("g"),
      params: smallvec![],
      return_type: Ty::Simple(ctx.intern("int")),
      body: smallvec![var_stmt, ret],
      is_pure: false,
      pre_contracts: smallvec![],
      post_contracts: smallvec![],
      return_constraints: smallvec![],
    }),
    None,
  );

  birchc::driver::analyze_module(&mut ctx, &ast, MODULE);

  assert_eq!(ctx.diags.errors().len(), 1);
  let err = &ctx.diags.errors()[0];
  assert!(matches!(err, SemaError::UnconsumedOnReturn { .. }));
  assert!(err.to_string().contains("linear variable 's' was not consumed before return."));
}

#[test]
fn scenario_aliasing_violation() {
  let mut ctx = SemaContext::new(SemaConfig::default());
  let mut ast = Ast::new();

  let make = ctx.intern("make");
  ast.alloc_decl(
    DeclKind::ExternFunction(ExternFunctionDecl {
      name: make,
      params: smallvec![],
      return_type: Ty::Move(std::rc::Rc::new(Ty::Simple(ctx.intern("int")))),
      is_pure: false,
    }),
    None,
  );

  let a_name = ctx.intern("a");
  let b_name = ctx.intern("b");
  let p_zero = ast.alloc_expr(ExprKind::Literal(0), None);
  let p_ret = ast.alloc_stmt(StmtKind::Return(Some(p_zero)), None);
  ast.alloc_decl(
    DeclKind::Function(FunctionDecl {
      name: ctx.intern("p"),
      params: smallvec![
        ParamOrDestruct::Param(Param {
          name: a_name,
          ty: Ty::Simple(ctx.intern("int")),
          qualifier: Some(BorrowKind::Mut),
          in_field: None,
          constraints: smallvec![],
        }),
        ParamOrDestruct::Param(Param {
          name: b_name,
          ty: Ty::Simple(ctx.intern("int")),
          qualifier: Some(BorrowKind::Mut),
          in_field: None,
          constraints: smallvec![],
        }),
      ],
      return_type: Ty::Simple(ctx.intern("int")),
      body: smallvec![p_ret],
      is_pure: false,
      pre_contracts: smallvec![],
      post_contracts: smallvec![],
      return_constraints: smallvec![],
    }),
    None,
  );

  // A same-module call resolves against the mangled global the declaration
  // above was registered under.
  let p_mangled = ctx.intern("main_p");

  let x = ctx.intern("x");
  let call_make = ast.alloc_expr(ExprKind::Identifier(make), None);
  let init = ast.alloc_expr(ExprKind::Call { callee: call_make, args: smallvec![] }, None);
  let var_stmt = ast.alloc_stmt(
    StmtKind::Var { name: x, ty: Some(Ty::Move(std::rc::Rc::new(Ty::Simple(ctx.intern("int"))))), init },
    None,
  );

  let x_ref1 = ast.alloc_expr(ExprKind::Identifier(x), None);
  let mut_x1 = ast.alloc_expr(ExprKind::Borrow { kind: BorrowKind::Mut, operand: x_ref1 }, None);
  let x_ref2 = ast.alloc_expr(ExprKind::Identifier(x), None);
  let mut_x2 = ast.alloc_expr(ExprKind::Borrow { kind: BorrowKind::Mut, operand: x_ref2 }, None);
  let callee = ast.alloc_expr(ExprKind::Identifier(p_mangled), None);
  let call_p = ast.alloc_expr(ExprKind::Call { callee, args: smallvec![mut_x1, mut_x2] }, None);
  let call_stmt = ast.alloc_stmt(StmtKind::Expr(call_p), None);

  let zero = ast.alloc_expr(ExprKind::Literal(0), None);
  let ret = ast.alloc_stmt(StmtKind::Return(Some(zero)), None);

  ast.alloc_decl(
    DeclKind::Function(FunctionDecl {
      name: ctx.intern("g"),
      params: smallvec![],
      return_type: Ty::Simple(ctx.intern("int")),
      body: smallvec![var_stmt, call_stmt, ret],
      is_pure: false,
      pre_contracts: smallvec![],
      post_contracts: smallvec![],
      return_constraints: smallvec![],
    }),
    None,
  );

  birchc::driver::analyze_module(&mut ctx, &ast, MODULE);

  assert_eq!(ctx.diags.errors().len(), 1);
  let err = &ctx.diags.errors()[0];
  assert!(matches!(err, SemaError::AlreadyBorrowedMutable { .. }));
  assert!(err.to_string().contains("cannot borrow 'x' as mutable because it is already borrowed"));
}

#[test]
fn scenario_non_exhaustive_enum_match() {
  let mut ctx = SemaContext::new(SemaConfig::default());
  let mut ast = Ast::new();

  let red = ctx.intern("Red");
  let green = ctx.intern("Green");
  let blue = ctx.intern("Blue");
  ast.alloc_decl(
    DeclKind::Enum {
      name: ctx.intern("Color"),
      variants: smallvec![
        VariantDecl { name: red, fields: smallvec![] },
        VariantDecl { name: green, fields: smallvec![] },
        VariantDecl { name: blue, fields: smallvec![] },
      ],
    },
    None,
  );
  let color_mangled = ctx.intern("main_Color");

  let make_color = ctx.intern("make_color");
  ast.alloc_decl(
    DeclKind::ExternFunction(ExternFunctionDecl {
      name: make_color,
      params: smallvec![],
      return_type: Ty::Simple(color_mangled),
      is_pure: false,
    }),
    None,
  );

  let c = ctx.intern("c");
  let call_make = ast.alloc_expr(ExprKind::Identifier(make_color), None);
  let init = ast.alloc_expr(ExprKind::Call { callee: call_make, args: smallvec![] }, None);
  let var_stmt = ast.alloc_stmt(StmtKind::Var { name: c, ty: Some(Ty::Simple(color_mangled)), init }, None);

  let scrutinee = ast.alloc_expr(ExprKind::Identifier(c), None);
  let red_pattern = ast.alloc_expr(ExprKind::Identifier(red), None);
  let green_pattern = ast.alloc_expr(ExprKind::Identifier(green), None);
  let one = ast.alloc_expr(ExprKind::Literal(1), None);
  let two = ast.alloc_expr(ExprKind::Literal(2), None);
  let red_case = MatchCase {
    pattern: Some(red_pattern),
    is_else: false,
    body: smallvec![ast.alloc_stmt(StmtKind::Return(Some(one)), None)],
  };
  let green_case = MatchCase {
    pattern: Some(green_pattern),
    is_else: false,
    body: smallvec![ast.alloc_stmt(StmtKind::Return(Some(two)), None)],
  };
  let match_stmt = ast.alloc_stmt(
    StmtKind::Match { value: scrutinee, cases: smallvec![red_case, green_case] },
    None,
  );

  ast.alloc_decl(
    DeclKind::Function(FunctionDecl {
      name: ctx.intern("h"),
      params: smallvec![],
      return_type: Ty::Simple(ctx.intern("int")),
      body: smallvec![var_stmt, match_stmt],
      is_pure: false,
      pre_contracts: smallvec![],
      post_contracts: smallvec![],
      return_constraints: smallvec![],
    }),
    None,
  );

  birchc::driver::analyze_module(&mut ctx, &ast, MODULE);

  assert_eq!(ctx.diags.errors().len(), 1);
  let err = &ctx.diags.errors()[0];
  assert!(matches!(err, SemaError::NonExhaustiveMatch { .. }));
  assert!(err.to_string().contains("non-exhaustive match"));
}

fn bounds_check_function(ctx: &mut SemaContext, ast: &mut Ast, index: i64) {
  let a_name = ctx.intern("a");
  let array_ty = Ty::Array(std::rc::Rc::new(Ty::Simple(ctx.intern("u8"))), 4);
  let a_ref = ast.alloc_expr(ExprKind::Identifier(a_name), None);
  let idx = ast.alloc_expr(ExprKind::Literal(index), None);
  let index_expr = ast.alloc_expr(ExprKind::Index { target: a_ref, index: idx }, None);
  let index_stmt = ast.alloc_stmt(StmtKind::Expr(index_expr), None);
  let zero = ast.alloc_expr(ExprKind::Literal(0), None);
  let ret = ast.alloc_stmt(StmtKind::Return(Some(zero)), None);

  ast.alloc_decl(
    DeclKind::Function(FunctionDecl {
      name: ctx.intern("k"),
      params: smallvec![ParamOrDestruct::Param(Param {
        name: a_name,
        ty: array_ty,
        qualifier: None,
        in_field: None,
        constraints: smallvec![],
      })],
      return_type: Ty::Simple(ctx.intern("int")),
      body: smallvec![index_stmt, ret],
      is_pure: false,
      pre_contracts: smallvec![],
      post_contracts: smallvec![],
      return_constraints: smallvec![],
    }),
    None,
  );
}

#[test]
fn scenario_static_bounds_success() {
  let mut ctx = SemaContext::new(SemaConfig::default());
  let mut ast = Ast::new();
  bounds_check_function(&mut ctx, &mut ast, 3);

  birchc::driver::analyze_module(&mut ctx, &ast, MODULE);

  assert!(ctx.diags.is_empty(), "expected no diagnostics, got {:?}", ctx.diags.errors());
}

#[test]
fn scenario_static_bounds_failure() {
  let mut ctx = SemaContext::new(SemaConfig::default());
  let mut ast = Ast::new();
  bounds_check_function(&mut ctx, &mut ast, 4);

  birchc::driver::analyze_module(&mut ctx, &ast, MODULE);

  assert_eq!(ctx.diags.errors().len(), 1);
  let err = &ctx.diags.errors()[0];
  assert!(matches!(err, SemaError::IndexOutOfBounds { index: 4, length: 4, .. }));
  assert!(err.to_string().contains("index 4 out of bounds for length 4"));
}

#[test]
fn scenario_contract_violation() {
  let mut ctx = SemaContext::new(SemaConfig::default());
  let mut ast = Ast::new();

  let result = ctx.intern("result");
  let result_ref = ast.alloc_expr(ExprKind::Identifier(result), None);
  let zero = ast.alloc_expr(ExprKind::Literal(0), None);
  let post = ast.alloc_expr(
    ExprKind::Binary { op: birchc::ast::BinOp::Gt, lhs: result_ref, rhs: zero },
    None,
  );

  let neg_one = ast.alloc_expr(ExprKind::Literal(-1), None);
  let ret = ast.alloc_stmt(StmtKind::Return(Some(neg_one)), None);

  ast.alloc_decl(
    DeclKind::Function(FunctionDecl {
      name: ctx.intern("f"),
      params: smallvec![],
      return_type: Ty::Simple(ctx.intern("int")),
      body: smallvec![ret],
      is_pure: false,
      pre_contracts: smallvec![],
      post_contracts: smallvec![post],
      return_constraints: smallvec![],
    }),
    None,
  );

  birchc::driver::analyze_module(&mut ctx, &ast, MODULE);

  assert_eq!(ctx.diags.errors().len(), 1);
  let err = &ctx.diags.errors()[0];
  assert!(matches!(err, SemaError::PostConditionViolation { .. }));
  assert!(err.to_string().to_lowercase().contains("post-condition violation"));
}
