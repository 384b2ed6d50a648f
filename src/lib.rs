//! # rope-rs
//!
//! A refactoring engine for dynamically-typed, indentation-scoped source
//! trees. It layers a resource tree, a source buffer, an AST/scope model,
//! occurrence-based name resolution, reversible changes, and undo/redo
//! history underneath a set of refactoring orchestrators (rename, extract,
//! inline, move, change-signature, introduce-factory, encapsulate-field,
//! convert-local-to-field, introduce-parameter, module-to-package).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use rope_rs::prelude::*;
//!
//! let project = Project::new("./my-project")?;
//! let mut undo = UndoManager::new();
//!
//! let text = project.get_file("mod.py")?.read()?;
//! let offset = text.find("old_name").unwrap();
//! Rename::new("mod.py", offset, "new_name").execute(&project, &mut undo)?;
//! # Ok::<(), rope_rs::error::EngineError>(())
//! ```

pub mod ast;
pub mod buffer;
pub mod change;
pub mod diff;
pub mod error;
pub mod occurrence;
pub mod persistence;
pub mod refactor;
pub mod resolver;
pub mod resource;
pub mod scope;
pub mod undo;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::ast::{classify, Ast, NodeKind};
    pub use crate::buffer::SourceBuffer;
    pub use crate::change::Change;
    pub use crate::error::{EngineError, Result};
    pub use crate::occurrence::{Occurrence, OccurrenceKind};
    pub use crate::persistence::{FileInfo, ObjectDb, ScopeInfo};
    pub use crate::refactor::{
        ChangeSignature, ConvertLocalToField, EncapsulateField, ExtractMethod, ExtractVariable,
        InlineLocal, InlineMethod, IntroduceFactory, IntroduceParameter, ModuleToPackage,
        MoveGlobal, MoveModule, ParameterSpec, RefactoringOperation, Rename, ValidationResult,
    };
    pub use crate::resolver::Resolver;
    pub use crate::resource::{Project, Resource, ResourceKind, ResourcePath};
    pub use crate::scope::{Binding, BindingKind, Scope, ScopeId, ScopeKind, ScopeTree};
    pub use crate::undo::UndoManager;
}

pub use prelude::*;
