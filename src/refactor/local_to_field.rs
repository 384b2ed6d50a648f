//! Convert-local-to-field (§4.G): turns a method-local variable into an
//! attribute of `self` (or the method's first parameter, whatever it's
//! actually spelled).

use super::{RefactoringOperation, ValidationResult};
use crate::ast::Ast;
use crate::error::{EngineError, Result};
use crate::change::Change;
use crate::resolver::Resolver;
use crate::resource::{Project, ResourcePath};
use crate::scope::{ScopeKind, ScopeTree};

pub struct ConvertLocalToField {
    pub module: ResourcePath,
    pub offset: usize,
}

impl RefactoringOperation for ConvertLocalToField {
    fn name(&self) -> &'static str {
        "convert-local-to-field"
    }

    fn validate(&self, project: &Project) -> Result<ValidationResult> {
        let file = project.get_file(self.module.clone())?;
        let text = file.read()?;
        let ast = Ast::parse(&text, file.real_path().as_path())?;
        let scopes = ScopeTree::build(&ast);
        let scope = scopes.scope_at_offset(self.offset);
        let s = scopes.get(scope);
        if s.kind != ScopeKind::Function || !s.is_method() {
            return Ok(ValidationResult::error(
                "offset is not inside a method body",
            ));
        }
        Ok(ValidationResult::ok())
    }

    fn plan(&self, project: &Project) -> Result<Change> {
        let file = project.get_file(self.module.clone())?;
        let old_text = file.read()?;
        let ast = Ast::parse(&old_text, file.real_path().as_path())?;
        let scopes = ScopeTree::build(&ast);
        let scope = scopes.scope_at_offset(self.offset);
        let s = scopes.get(scope);
        let self_param = s
            .self_param
            .clone()
            .ok_or_else(|| EngineError::refactoring("enclosing function is not a method"))?;

        let resolver = Resolver::new(project);
        let mut occurrences = resolver.occurrences_of(&self.module, self.offset)?;
        occurrences.sort_by(|a, b| b.start_offset.cmp(&a.start_offset));
        if occurrences.is_empty() {
            return Err(EngineError::refactoring("no resolvable local at the given offset"));
        }
        let name = occurrences[0].text(&old_text).to_string();

        let mut new_text = old_text.clone();
        for occ in &occurrences {
            new_text.replace_range(occ.start_offset..occ.end_offset, &format!("{self_param}.{name}"));
        }

        Ok(Change::Content {
            path: self.module.clone(),
            old_text,
            new_text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn converts_local_to_field_with_renamed_self() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        let file = root.create_file("mod.py").unwrap();
        file.write(
            "class AClass(object):\n    def a_func(myself):\n        var = 1\n        print(var)\n",
        )
        .unwrap();

        let text = file.read().unwrap();
        let offset = text.rfind("var").unwrap();
        let op = ConvertLocalToField {
            module: file.path().clone(),
            offset,
        };
        assert!(op.validate(&project).unwrap().is_valid());
        let change = op.plan(&project).unwrap();
        change.apply(&project).unwrap();
        let updated = file.read().unwrap();
        assert!(updated.contains("myself.var = 1"));
        assert!(updated.contains("print(myself.var)"));
    }
}
