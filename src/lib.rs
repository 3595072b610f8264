//! A semantic-analysis core for a small systems language that compiles to C.
//!
//! This crate takes an externally-built AST (see [`ast::Ast`] — no parser is
//! implemented here, see the crate's `DESIGN.md` for why) and runs name
//! resolution, type inference, exhaustiveness checking, static bounds
//! checking, linearity/move checking and region-based borrow checking over
//! it, in the fixed per-function order [`driver::analyze_module`] documents.
//!
//! Every pass reports through [`diag::SemaError`]/[`diag::Diagnostics`]
//! rather than aborting the process, and every piece of mutable analysis
//! state lives on an explicit [`context::SemaContext`] rather than behind a
//! process-global — see `DESIGN.md` for the grounding of both choices.
//!
//! ```
//! use birchc::context::{SemaConfig, SemaContext};
//! use birchc::ast::{Ast, DeclKind, ExprKind, FunctionDecl, StmtKind, Ty};
//! use smallvec::smallvec;
//!
//! let mut ctx = SemaContext::new(SemaConfig::default());
//! let mut ast = Ast::new();
//! let name = ctx.intern("main");
//! let lit = ast.alloc_expr(ExprKind::Literal(0), None);
//! let ret = ast.alloc_stmt(StmtKind::Return(Some(lit)), None);
//! ast.alloc_decl(
//!   DeclKind::Function(FunctionDecl {
//!     name,
//!     params: smallvec![],
//!     return_type: Ty::Simple(ctx.intern("int")),
//!     body: smallvec![ret],
//!     is_pure: false,
//!     pre_contracts: smallvec![],
//!     post_contracts: smallvec![],
//!     return_constraints: smallvec![],
//!   }),
//!   None,
//! );
//! birchc::driver::analyze_module(&mut ctx, &ast, "main");
//! assert!(ctx.diags.is_empty());
//! ```

pub mod ast;
pub mod bounds;
pub mod context;
pub mod diag;
pub mod driver;
pub mod exhaustiveness;
pub mod ids;
pub mod linearity;
pub mod ranges;
pub mod region;
pub mod resolve;
pub mod services;
pub mod symbol;
pub mod symtab;
pub mod typecheck;

pub use context::{SemaConfig, SemaContext};
pub use diag::{Diagnostics, SemaError, SemaResult};
