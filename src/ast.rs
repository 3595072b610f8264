//! The AST data contract (§6.1).
//!
//! No parser lives in this crate — building one is explicitly out of scope
//! (see SPEC_FULL.md §C, Purpose & Scope). Callers construct an [`Ast`] (or
//! generate one from their own front end) and hand it to [`crate::driver`].
//!
//! Two departures from the original C tree, both required by the Design
//! Notes redesign:
//!
//! - Identifiers are interned [`Symbol`](crate::symbol::Symbol)s, never raw
//!   byte spans, so there is nothing for a resolver to overwrite in place.
//! - Every [`ExprNode`]/[`StmtNode`]/[`DeclNode`] lives in an arena ([`Ast`])
//!   and is referred to by [`ExprId`]/[`StmtId`]/[`DeclId`]. Resolution
//!   results (resolved type, declaration, globalness, …) are recorded in a
//!   side table keyed by these ids (see [`crate::context::SideTable`])
//!   instead of being written back onto the node, so the AST itself stays
//!   immutable once built.

use smallvec::SmallVec;
use std::rc::Rc;

use crate::ids::{DeclId, ExprId, StmtId};
use crate::symbol::Symbol;

/// A small inline vector, used for parameter/argument/field lists that are
/// almost always short. Mirrors the teacher's own `smallvec` usage for
/// small, hot collections (`Cargo.toml`'s `smallvec` dependency).
pub type SmallList<T> = SmallVec<[T; 4]>;

/// The fixed-point ownership mode every [`Ty`] resolves to for borrow- and
/// linearity-checking purposes (§3.1, §4.7).
///
/// The original C (`original_source/src/sema/region.h`,
/// `src/sema/linearity.h`) reads a `Type.mode` field pervasively but the
/// retrieved AST snapshot (`original_source/src/ast.h`) never shows where it
/// is assigned, and `parser/type.h`'s `parse_type` has no `mut` keyword
/// handling at all — `mut` surfaces only as a parameter qualifier, not a
/// type constructor. This crate resolves the open question by computing the
/// mode structurally from the `Ty` itself rather than storing it as a raw
/// field (see DESIGN.md, "Ownership mode derivation"):
///
/// - `Ty::Mut(_)` is always `Mutable`.
/// - `Ty::Move(_)` is always `Owned` (a moved value is a singular owned
///   value in transit).
/// - every other shape (`Simple`, `Array`, `Slice`, `Pointer`, `Comptime`)
///   defaults to `Shared` — matching §4.7's "Parameter mode = Shared:
///   register a shared borrow" as the implicit convention for a parameter
///   that carries no `mov`/`mut` qualifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
  Owned,
  Shared,
  Mutable,
}

/// A sentinel-terminated slice's extra metadata (`T[:0]`-style types).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sentinel {
  pub bytes: Option<Rc<[u8]>>,
  pub len: i64,
  pub is_string: bool,
}

/// A type expression (§3.1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ty {
  /// A named type: a primitive (`int`, `u8`, `bool`, …) or a struct/enum
  /// name, resolved later against module declarations.
  Simple(Symbol),
  /// `T[N]`, a fixed-length array. `len < 0` marks a dynamic-length array
  /// produced by indexing with a range (§4.3).
  Array(Rc<Ty>, i64),
  /// `T[:sentinel]` / `T[]`, a slice.
  Slice(Rc<Ty>, Sentinel),
  /// `*T`, a raw pointer.
  Pointer(Rc<Ty>),
  /// `mov T`, the linear-ownership wrapper (§3.1, §4.7): a value of this
  /// type must be consumed exactly once.
  Move(Rc<Ty>),
  /// `mut T`, the exclusive-borrow wrapper.
  Mut(Rc<Ty>),
  /// A comptime-evaluated type (inherits its base's shape).
  Comptime(Rc<Ty>),
}

impl Ty {
  #[must_use] pub fn simple(name: Symbol) -> Self { Ty::Simple(name) }

  /// The ownership mode this type resolves to (§3.1). See [`Mode`].
  #[must_use] pub fn mode(&self) -> Mode {
    match self {
      Ty::Mut(_) => Mode::Mutable,
      Ty::Move(_) => Mode::Owned,
      _ => Mode::Shared,
    }
  }

  /// Is this (transitively) a `mov`-wrapped, linear type?
  #[must_use] pub fn is_linear(&self) -> bool {
    matches!(self, Ty::Move(_))
  }

  /// Strip `Mut`/`Move`/`Pointer`/`Comptime` wrappers down to the
  /// structural type underneath, the way `sema_unwrap_type` does in
  /// `original_source/src/sema/typecheck.h`.
  #[must_use] pub fn unwrap(&self) -> &Ty {
    match self {
      Ty::Mut(inner) | Ty::Move(inner) | Ty::Pointer(inner) | Ty::Comptime(inner) => inner.unwrap(),
      other => other,
    }
  }

  /// The fixed array length, if statically known and this (after
  /// unwrapping) is an array type (used by the bounds checker, §4.6).
  #[must_use] pub fn array_len(&self) -> Option<i64> {
    match self.unwrap() {
      Ty::Array(_, len) if *len >= 0 => Some(*len),
      _ => None,
    }
  }

  #[must_use] pub fn slice_sentinel_len(&self) -> Option<i64> {
    match self.unwrap() {
      Ty::Slice(_, sentinel) => Some(sentinel.len),
      _ => None,
    }
  }
}

/// A struct/enum member qualifier attached to a call argument or parameter:
/// whether the caller wrote `mov`/`mut` at the *use* site (`p(mut x)`),
/// independent of the callee's declared parameter type. Mirrors the
/// original's `EXPR_MOVE`/`EXPR_MUT` expression kinds (`ast.h`'s
/// `ExprKind`), which the retrieved snapshot does list even though it omits
/// `Type.mode`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorrowKind {
  Move,
  Mut,
}

/// A binary operator (§6.1's "binary" expression kind covers arithmetic,
/// comparison, and logical operators uniformly).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
  Add, Sub, Mul, Div, Mod,
  Eq, Ne, Lt, Le, Gt, Ge,
  And, Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
  Neg,
  Not,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprKind {
  Literal(i64),
  StringLit(Rc<[u8]>),
  CharLit(u8),
  Identifier(Symbol),
  Member { target: ExprId, field: Symbol },
  Call { callee: ExprId, args: SmallList<ExprId> },
  Index { target: ExprId, index: ExprId },
  /// `lo..hi`.
  Range { lo: ExprId, hi: ExprId },
  Binary { op: BinOp, lhs: ExprId, rhs: ExprId },
  Unary { op: UnOp, operand: ExprId },
  /// `mov expr` / `mut expr` at a use site (e.g. a call argument).
  Borrow { kind: BorrowKind, operand: ExprId },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExprNode {
  pub kind: ExprKind,
  pub span: Option<crate::diag::FileSpan>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DestructBind {
  /// The whole-value alias recorded for a destructuring parameter, plus one
  /// entry per field name bound out of it.
  Field(Symbol),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
  pub name: Symbol,
  pub ty: Ty,
  /// Explicit `mut`/`mov` qualifier written at the declaration site, if
  /// any. `None` defaults to `Mode::Shared` per [`Ty::mode`].
  pub qualifier: Option<BorrowKind>,
  /// `in <array-param-name>`: this parameter's range is an index range
  /// into the named sibling array/slice parameter (§B.3, in_field).
  pub in_field: Option<Symbol>,
  /// Declared relational constraints on this parameter (§B.1), e.g.
  /// `x < y`, applied at function entry the way `pre_contracts` are.
  pub constraints: SmallList<ExprId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DestructParam {
  pub struct_name: Symbol,
  pub names: SmallList<Symbol>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StmtKind {
  Var { name: Symbol, ty: Option<Ty>, init: ExprId },
  Assign { target: ExprId, value: ExprId },
  Expr(ExprId),
  If { cond: ExprId, then_branch: SmallList<StmtId>, else_branch: Option<SmallList<StmtId>> },
  For { index_name: Option<Symbol>, value_name: Symbol, iterable: ExprId, body: SmallList<StmtId> },
  While { cond: ExprId, body: SmallList<StmtId> },
  Continue,
  Break,
  Return(Option<ExprId>),
  Match { value: ExprId, cases: SmallList<MatchCase> },
  Use { target: ExprId, alias: Option<Symbol> },
  /// A block whose category-5/6 (borrow/bounds) diagnostics are suppressed
  /// (§7).
  Unsafe(SmallList<StmtId>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchCase {
  pub pattern: Option<ExprId>,
  pub is_else: bool,
  pub body: SmallList<StmtId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StmtNode {
  pub kind: StmtKind,
  pub span: Option<crate::diag::FileSpan>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDecl {
  pub name: Symbol,
  pub ty: Ty,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantDecl {
  pub name: Symbol,
  pub fields: SmallList<FieldDecl>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamOrDestruct {
  Param(Param),
  Destruct(DestructParam),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionDecl {
  pub name: Symbol,
  pub params: SmallList<ParamOrDestruct>,
  pub return_type: Ty,
  pub body: SmallList<StmtId>,
  /// `true` for `func` (pure), `false` for `proc` (effectful), per §3.3/§4.2
  /// purity rules.
  pub is_pure: bool,
  pub pre_contracts: SmallList<ExprId>,
  pub post_contracts: SmallList<ExprId>,
  pub return_constraints: SmallList<ExprId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternFunctionDecl {
  pub name: Symbol,
  pub params: SmallList<Param>,
  pub return_type: Ty,
  pub is_pure: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeclKind {
  Variable { name: Symbol, ty: Ty, is_mutable: bool },
  Function(FunctionDecl),
  ExternFunction(ExternFunctionDecl),
  Struct { name: Symbol, fields: SmallList<FieldDecl> },
  Enum { name: Symbol, variants: SmallList<VariantDecl> },
  Import { module_name: Symbol },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeclNode {
  pub kind: DeclKind,
  pub span: Option<crate::diag::FileSpan>,
}

/// The arena a module's AST lives in. Built once by the caller (or a future
/// front end) and never mutated by the passes in this crate — resolution
/// results go into a [`crate::context::SideTable`] keyed by the ids handed
/// out here.
#[derive(Default)]
pub struct Ast {
  exprs: crate::ids::IdxVec<ExprId, ExprNode>,
  stmts: crate::ids::IdxVec<StmtId, StmtNode>,
  decls: crate::ids::IdxVec<DeclId, DeclNode>,
}

impl Ast {
  #[must_use] pub fn new() -> Self { Self::default() }

  pub fn alloc_expr(&mut self, kind: ExprKind, span: Option<crate::diag::FileSpan>) -> ExprId {
    self.exprs.push(ExprNode { kind, span })
  }

  pub fn alloc_stmt(&mut self, kind: StmtKind, span: Option<crate::diag::FileSpan>) -> StmtId {
    self.stmts.push(StmtNode { kind, span })
  }

  pub fn alloc_decl(&mut self, kind: DeclKind, span: Option<crate::diag::FileSpan>) -> DeclId {
    self.decls.push(DeclNode { kind, span })
  }

  #[must_use] pub fn expr(&self, id: ExprId) -> &ExprNode { &self.exprs[id] }
  #[must_use] pub fn stmt(&self, id: StmtId) -> &StmtNode { &self.stmts[id] }
  #[must_use] pub fn decl(&self, id: DeclId) -> &DeclNode { &self.decls[id] }

  #[must_use] pub fn decl_count(&self) -> usize { self.decls.len() }
}
