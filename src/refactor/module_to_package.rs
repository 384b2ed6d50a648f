//! Module-to-package (§4.G): turns a single-file module `name.py` into a
//! package `name/__init__.py` with the same content. The module's dotted
//! name is unchanged (`to_module_name` elides the `__init__` segment), so
//! no importer needs rewriting.

use super::{RefactoringOperation, ValidationResult};
use crate::change::Change;
use crate::error::{EngineError, Result};
use crate::resource::{Project, ResourcePath};

pub struct ModuleToPackage {
    pub module: ResourcePath,
}

impl RefactoringOperation for ModuleToPackage {
    fn name(&self) -> &'static str {
        "module-to-package"
    }

    fn validate(&self, project: &Project) -> Result<ValidationResult> {
        let resource = project.get_file(self.module.clone())?;
        if resource.name() == "__init__.py" {
            return Ok(ValidationResult::error("module is already a package"));
        }
        if !resource.name().ends_with(".py") {
            return Ok(ValidationResult::error("not a module file"));
        }
        Ok(ValidationResult::ok())
    }

    fn plan(&self, project: &Project) -> Result<Change> {
        let resource = project.get_file(self.module.clone())?;
        let content = resource.read()?;
        let stem = resource
            .name()
            .strip_suffix(".py")
            .ok_or_else(|| EngineError::refactoring("not a module file"))?
            .to_string();
        let parent = self
            .module
            .parent()
            .ok_or_else(|| EngineError::refactoring("cannot convert the project root"))?;
        let package_path = parent.child(&stem);
        let init_path = package_path.child("__init__.py");

        Ok(Change::set(
            format!("convert {} to a package", self.module),
            vec![
                Change::CreateFolder { path: package_path },
                Change::CreateFile {
                    path: init_path,
                    content,
                },
                Change::Remove {
                    path: self.module.clone(),
                    content: None,
                    children: Vec::new(),
                },
            ],
        ))
    }
}
