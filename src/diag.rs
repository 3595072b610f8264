//! Diagnostics: the error taxonomy of §7 and the result-returning sink that
//! replaces the original's `fprintf` + `exit(1)` (Design Notes).

use bitflags::bitflags;
use thiserror::Error;

/// A location in the source the AST was built from. The semantic core never
/// constructs one of these itself (lexing/parsing is out of scope); it only
/// threads spans it is handed through to diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FileSpan {
  pub start: u32,
  pub end: u32,
}

/// Which [`SemaError`] categories an enclosing `unsafe` block suppresses.
///
/// Per §7: `unsafe` suppresses category 5 (borrow/alias) and 6 (bounds), and
/// lifts the purity restriction that would otherwise reject an aliasing
/// mutable-borrow-of-the-same-owner pattern. It never suppresses category 4
/// (linearity) or 7 (contracts).
bitflags! {
  #[derive(Clone, Copy, Debug, PartialEq, Eq)]
  pub struct DiagCategories: u32 {
    const RESOLUTION      = 1 << 0;
    const TYPE            = 1 << 1;
    const EXHAUSTIVENESS  = 1 << 2;
    const LINEARITY       = 1 << 3;
    const BORROW          = 1 << 4;
    const BOUNDS          = 1 << 5;
    const CONTRACT        = 1 << 6;
  }
}

impl DiagCategories {
  /// The categories `unsafe` blocks are permitted to suppress (§7).
  #[must_use] pub fn unsafe_suppressible() -> Self {
    Self::BORROW | Self::BOUNDS
  }
}

/// The full error taxonomy of §7. Every variant renders as the one-line,
/// category-prefixed message format required by §6.3, so scenario tests can
/// assert on `to_string()` directly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SemaError {
  // ---- 1. Resolution ----
  #[error("sema error: undefined identifier '{name}'")]
  UndefinedIdentifier { name: String, span: Option<FileSpan> },

  #[error("Error: Pure function '{function}' cannot call procedure")]
  PurityViolationCall { function: String, span: Option<FileSpan> },

  #[error("Error: Pure function '{function}' cannot modify global variable")]
  PurityViolationAssign { function: String, span: Option<FileSpan> },

  #[error("Error: Cannot assign to immutable variable '{name}'")]
  AssignToImmutable { name: String, span: Option<FileSpan> },

  #[error("sema error: '{name}' is already declared in this scope")]
  DuplicateDeclaration { name: String, span: Option<FileSpan> },

  // ---- 2. Type ----
  #[error("sema error: cannot access member on non-struct type")]
  MemberOnNonStruct { span: Option<FileSpan> },

  #[error("sema error: struct '{struct_name}' has no field '{field}'")]
  UnknownField { struct_name: String, field: String, span: Option<FileSpan> },

  #[error("sema error: cannot index expression of non-array/slice type")]
  NonIndexableTarget { span: Option<FileSpan> },

  #[error("sema error: unknown struct '{name}'")]
  UnknownStruct { name: String, span: Option<FileSpan> },

  // ---- 3. Exhaustiveness ----
  #[error("sema error: non-exhaustive match - add an 'else:' case or cover all variants")]
  NonExhaustiveMatch { span: Option<FileSpan> },

  // ---- 4. Linearity ----
  #[error("sema error: linear variable '{name}' was already used/consumed.")]
  UseAfterConsume { name: String, span: Option<FileSpan> },

  #[error("sema error: linear variable '{name}' was not consumed before return.")]
  UnconsumedOnReturn { name: String, span: Option<FileSpan> },

  #[error(
    "sema error: attempting to consume linear variable '{name}' defined outside a loop from inside a loop."
  )]
  ConsumeAcrossLoopBoundary { name: String, span: Option<FileSpan> },

  #[error("sema error: linear variable '{name}' is used inconsistently in the branches of {construct}")]
  BranchInconsistency { name: String, construct: String, span: Option<FileSpan> },

  #[error("sema error: discarding value of linear type (move) is not allowed.")]
  DiscardedLinearValue { span: Option<FileSpan> },

  // ---- 5. Borrow ----
  #[error("borrow error: cannot borrow '{name}' as mutable because it is already borrowed")]
  AlreadyBorrowedMutable { name: String, span: Option<FileSpan> },

  #[error("borrow error: cannot borrow '{name}' as shared because it is borrowed as mutable")]
  AlreadyBorrowedMutableConflictsShared { name: String, span: Option<FileSpan> },

  #[error("borrow error: reference '{name}' would outlive its owner")]
  ReferenceOutlivesOwner { name: String, span: Option<FileSpan> },

  #[error("borrow error: use of reference '{name}' after owner was moved")]
  UseAfterOwnerMoved { name: String, span: Option<FileSpan> },

  #[error("borrow error: cannot move '{name}' because it is currently borrowed")]
  MoveWhileBorrowed { name: String, span: Option<FileSpan> },

  // ---- 6. Bounds ----
  #[error("bounds error: index may be negative. Range: [{min}, {max}]")]
  IndexMayBeNegative { min: i64, max: i64, span: Option<FileSpan> },

  #[error("bounds error: index {index} out of bounds for length {length}")]
  IndexOutOfBounds { index: i64, length: i64, span: Option<FileSpan> },

  // ---- 7. Contract ----
  #[error("Error: Post-condition violation. Return value cannot satisfy contract.")]
  PostConditionViolation { span: Option<FileSpan> },

  #[error("Error: Return constraint violation. Return value does not satisfy type constraint.")]
  ReturnConstraintViolation { span: Option<FileSpan> },
}

impl SemaError {
  /// The §7 taxonomy category this error belongs to.
  #[must_use] pub fn category(&self) -> DiagCategories {
    use SemaError::{
      AlreadyBorrowedMutable, AlreadyBorrowedMutableConflictsShared, AssignToImmutable,
      BranchInconsistency, ConsumeAcrossLoopBoundary, DiscardedLinearValue,
      DuplicateDeclaration, IndexMayBeNegative, IndexOutOfBounds, MemberOnNonStruct,
      MoveWhileBorrowed, NonExhaustiveMatch, NonIndexableTarget, PostConditionViolation,
      PurityViolationAssign, PurityViolationCall, ReferenceOutlivesOwner,
      ReturnConstraintViolation, UnconsumedOnReturn, UndefinedIdentifier, UnknownField,
      UnknownStruct, UseAfterConsume, UseAfterOwnerMoved,
    };
    match self {
      UndefinedIdentifier { .. }
      | PurityViolationCall { .. }
      | PurityViolationAssign { .. }
      | AssignToImmutable { .. }
      | DuplicateDeclaration { .. } => DiagCategories::RESOLUTION,
      MemberOnNonStruct { .. } | UnknownField { .. } | NonIndexableTarget { .. } | UnknownStruct { .. } =>
        DiagCategories::TYPE,
      NonExhaustiveMatch { .. } => DiagCategories::EXHAUSTIVENESS,
      UseAfterConsume { .. }
      | UnconsumedOnReturn { .. }
      | ConsumeAcrossLoopBoundary { .. }
      | BranchInconsistency { .. }
      | DiscardedLinearValue { .. } => DiagCategories::LINEARITY,
      AlreadyBorrowedMutable { .. }
      | AlreadyBorrowedMutableConflictsShared { .. }
      | ReferenceOutlivesOwner { .. }
      | UseAfterOwnerMoved { .. }
      | MoveWhileBorrowed { .. } => DiagCategories::BORROW,
      IndexMayBeNegative { .. } | IndexOutOfBounds { .. } => DiagCategories::BOUNDS,
      PostConditionViolation { .. } | ReturnConstraintViolation { .. } => DiagCategories::CONTRACT,
    }
  }

  /// Whether `unsafe` suppresses this particular error (§7). Category 5
  /// (alias) and 6 (bounds) are suppressed wholesale; purity violations are
  /// also allowed inside `unsafe` even though they are filed under category
  /// 1 (resolution) for reporting purposes — §7's "allow operations that
  /// would otherwise fail purity or aliasing checks" names purity
  /// specifically, not the whole resolution category.
  #[must_use] pub fn is_suppressible_by_unsafe(&self) -> bool {
    matches!(self, SemaError::PurityViolationCall { .. } | SemaError::PurityViolationAssign { .. })
      || DiagCategories::unsafe_suppressible().contains(self.category())
  }
}

/// A result-returning diagnostic sink (Design Notes: replace `exit(1)` with
/// something tests can assert on). Most passes short-circuit on the first
/// fatal error via `Result`; the sink exists for the handful of spots (e.g.
/// the module driver finishing one function and moving to the next) where it
/// is useful to keep going and report everything found.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
  errors: Vec<SemaError>,
}

impl Diagnostics {
  #[must_use] pub fn new() -> Self { Self::default() }

  pub fn push(&mut self, err: SemaError) {
    log::debug!("diagnostic recorded: {err}");
    self.errors.push(err);
  }

  #[must_use] pub fn is_empty(&self) -> bool { self.errors.is_empty() }

  #[must_use] pub fn errors(&self) -> &[SemaError] { &self.errors }

  /// Turn the sink into a `Result`: `Ok(())` if nothing was recorded,
  /// otherwise `Err` of the first diagnostic (callers that want every
  /// diagnostic should inspect [`Diagnostics::errors`] directly).
  pub fn into_result(self) -> Result<(), SemaError> {
    match self.errors.into_iter().next() {
      Some(e) => Err(e),
      None => Ok(()),
    }
  }
}

pub type SemaResult<T> = Result<T, SemaError>;
