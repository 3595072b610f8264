//! Small index newtypes used to key the AST arenas (see [`crate::ast`]).
//!
//! The teacher threads an `Idx` trait (`mm0_util::Idx`, used throughout
//! `types/entity.rs` and `build_mir.rs` as `VarId`, `BlockId`, `ProcId`, …)
//! through its arena-indexed IR. This crate is not able to depend on
//! `mm0_util` (it is a path dependency internal to the mm0 workspace), so the
//! trait is reproduced locally at the scale this crate actually needs.

/// A trait for `Copy` newtype indices backed by a `u32`.
pub trait Idx: Copy + Eq + std::hash::Hash {
  fn from_usize(n: usize) -> Self;
  fn into_usize(self) -> usize;
}

macro_rules! mk_idx {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct $name(u32);

    impl std::fmt::Debug for $name {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, concat!(stringify!($name), "({})"), self.0)
      }
    }

    impl crate::ids::Idx for $name {
      fn from_usize(n: usize) -> Self { $name(u32::try_from(n).expect("index overflow")) }
      fn into_usize(self) -> usize { self.0 as usize }
    }
  };
}

mk_idx!(
  /// Index of an [`crate::ast::ExprNode`] within an [`crate::ast::Ast`].
  ExprId
);
mk_idx!(
  /// Index of a [`crate::ast::StmtNode`] within an [`crate::ast::Ast`].
  StmtId
);
mk_idx!(
  /// Index of a [`crate::ast::DeclNode`] within an [`crate::ast::Ast`] or module.
  DeclId
);

/// A dense, append-only store of `T` indexed by `I: Idx`. This is the Rust
/// analogue of the teacher's arena-backed `Idx`-indexed vectors.
#[derive(Debug, Clone)]
pub struct IdxVec<I, T> {
  raw: Vec<T>,
  _marker: std::marker::PhantomData<fn(I)>,
}

impl<I: Idx, T> Default for IdxVec<I, T> {
  fn default() -> Self { Self { raw: Vec::new(), _marker: std::marker::PhantomData } }
}

impl<I: Idx, T> IdxVec<I, T> {
  #[must_use] pub fn new() -> Self { Self::default() }

  pub fn push(&mut self, val: T) -> I {
    let idx = I::from_usize(self.raw.len());
    self.raw.push(val);
    idx
  }

  #[must_use] pub fn len(&self) -> usize { self.raw.len() }
  #[must_use] pub fn is_empty(&self) -> bool { self.raw.is_empty() }
}

impl<I: Idx, T> std::ops::Index<I> for IdxVec<I, T> {
  type Output = T;
  fn index(&self, idx: I) -> &T { &self.raw[idx.into_usize()] }
}

impl<I: Idx, T> std::ops::IndexMut<I> for IdxVec<I, T> {
  fn index_mut(&mut self, idx: I) -> &mut T { &mut self.raw[idx.into_usize()] }
}
