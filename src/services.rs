//! Collaborator interfaces (§6.2): the seams this crate talks to but does
//! not implement — a module loader (resolves `use` imports across files), an
//! arena/allocator, and a code emitter. All three are out of scope for this
//! crate's own implementation (no parser, no codegen), but the traits
//! themselves are part of the data contract a driving front end implements
//! against, so they are defined here with a minimal in-memory default for
//! tests.

use hashbrown::HashMap;

use crate::ast::Ast;
use crate::symbol::Symbol;

/// Resolves a module path (`use foo.bar`) to the [`Ast`] that defines it.
/// A real front end backs this with its own file-system/package resolution;
/// this crate only needs the result to register `use` aliases (§4.2).
pub trait ModuleLoader {
  fn load(&self, module_path: &str) -> Option<&Ast>;
}

/// An in-memory loader sufficient for tests and single-module callers.
#[derive(Default)]
pub struct InMemoryModuleLoader {
  modules: HashMap<String, Ast>,
}

impl InMemoryModuleLoader {
  #[must_use] pub fn new() -> Self { Self::default() }

  pub fn insert(&mut self, module_path: impl Into<String>, ast: Ast) {
    self.modules.insert(module_path.into(), ast);
  }
}

impl ModuleLoader for InMemoryModuleLoader {
  fn load(&self, module_path: &str) -> Option<&Ast> { self.modules.get(module_path) }
}

/// Bump-allocation seam (§6.2): callers that build large ASTs want the
/// checker's own scratch allocations (mangled names, temporary lists) to
/// live in the same arena as the AST. Default implementations may just use
/// [`bumpalo::Bump::new`].
pub trait ArenaProvider {
  fn arena(&mut self) -> &bumpalo::Bump;
}

/// The emission seam (§6.2, explicitly out of scope for this crate beyond
/// the interface: no code generation is implemented here). A real backend
/// consumes a successfully-checked module and produces output; this trait
/// exists purely so the driver's success path has somewhere well-typed to
/// hand off to.
pub trait Emitter {
  type Output;
  type Error;

  fn emit(&mut self, module_path: Symbol, ast: &Ast) -> Result<Self::Output, Self::Error>;
}

/// An emitter that does nothing, useful for running the checker standalone
/// (e.g. a `--check-only` CLI mode, or tests that only care about
/// diagnostics).
#[derive(Default)]
pub struct NullEmitter;

impl Emitter for NullEmitter {
  type Output = ();
  type Error = std::convert::Infallible;

  fn emit(&mut self, _module_path: Symbol, _ast: &Ast) -> Result<(), std::convert::Infallible> { Ok(()) }
}
