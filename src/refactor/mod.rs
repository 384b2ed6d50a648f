//! Refactoring orchestrators (§4.G): one module per operation kind, each
//! following the same Validate → Plan → emit-`Change` protocol. An
//! orchestrator never writes to disk itself; `plan` returns a `Change`
//! that the caller applies through an `UndoManager` so every refactoring
//! is uniformly undoable.

mod encapsulate;
mod extract;
mod factory;
mod inline;
mod local_to_field;
mod module_to_package;
mod move_ops;
mod rename;
mod signature;

pub use encapsulate::EncapsulateField;
pub use extract::{ExtractMethod, ExtractVariable};
pub use factory::IntroduceFactory;
pub use inline::{InlineLocal, InlineMethod};
pub use local_to_field::ConvertLocalToField;
pub use module_to_package::ModuleToPackage;
pub use move_ops::{MoveGlobal, MoveModule};
pub use rename::Rename;
pub use signature::{ChangeSignature, IntroduceParameter, ParameterSpec};

use crate::change::Change;
use crate::error::Result;
use crate::resource::Project;

/// The outcome of validating a refactoring before it is planned.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
            warnings: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Common shape of every refactoring orchestrator.
pub trait RefactoringOperation {
    fn name(&self) -> &'static str;

    /// Checks preconditions (§4.G invariants) without touching disk.
    fn validate(&self, project: &Project) -> Result<ValidationResult>;

    /// Builds the `Change` this operation would apply. Callers should
    /// check `validate` first; `plan` does not re-validate.
    fn plan(&self, project: &Project) -> Result<Change>;

    /// Validates, plans, and applies through `undo`, in one step.
    fn execute(&self, project: &Project, undo: &mut crate::undo::UndoManager) -> Result<()> {
        let validation = self.validate(project)?;
        if !validation.is_valid() {
            return Err(crate::error::EngineError::refactoring(
                validation.errors.join("; "),
            ));
        }
        let change = self.plan(project)?;
        undo.apply(project, change)
    }
}
