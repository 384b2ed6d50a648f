//! Encapsulate-field (§4.G): replaces direct access to a class attribute
//! with `get_<field>`/`set_<field>` accessor calls project-wide, expanding
//! augmented assignment (`obj.attr <<= x`) into the corresponding
//! get-then-set form.

use super::{RefactoringOperation, ValidationResult};
use crate::ast::Ast;
use crate::change::Change;
use crate::error::{EngineError, Result};
use crate::resource::{Project, ResourcePath};
use regex::Regex;

const AUG_OPS: &[&str] = &["**", "//", "<<", ">>", "+", "-", "*", "/", "%", "&", "|", "^"];

pub struct EncapsulateField {
    pub module: ResourcePath,
    pub class_offset: usize,
    pub field_name: String,
}

impl RefactoringOperation for EncapsulateField {
    fn name(&self) -> &'static str {
        "encapsulate-field"
    }

    fn validate(&self, project: &Project) -> Result<ValidationResult> {
        let file = project.get_file(self.module.clone())?;
        let text = file.read()?;
        let ast = Ast::parse(&text, file.real_path().as_path())?;
        let Some(node) = ast.node_at_offset(self.class_offset) else {
            return Ok(ValidationResult::error("offset out of range"));
        };
        if find_class_def(node).is_none() {
            return Ok(ValidationResult::error("offset is not inside a class definition"));
        }
        Ok(ValidationResult::ok())
    }

    fn plan(&self, project: &Project) -> Result<Change> {
        let file = project.get_file(self.module.clone())?;
        let old_text = file.read()?;
        let ast = Ast::parse(&old_text, file.real_path().as_path())?;
        let node = ast
            .node_at_offset(self.class_offset)
            .ok_or_else(|| EngineError::refactoring("offset out of range"))?;
        let class_def = find_class_def(node)
            .ok_or_else(|| EngineError::refactoring("offset is not inside a class definition"))?;

        let field = regex::escape(&self.field_name);
        let op_alt = AUG_OPS.iter().map(|o| regex::escape(o)).collect::<Vec<_>>().join("|");

        let aug_re = Regex::new(&format!(
            r"(?P<obj>\w+)\.{field}\s*(?P<op>{op_alt})=\s*(?P<rhs>[^\n]+)"
        ))
        .expect("valid regex");
        let assign_re = Regex::new(&format!(r"(?P<obj>\w+)\.{field}\s*=(?!=)\s*(?P<rhs>[^\n]+)"))
            .expect("valid regex");
        let read_re = Regex::new(&format!(r"(?P<obj>\w+)\.{field}\b")).expect("valid regex");

        let mut children = Vec::new();

        for target in project.all_modules()? {
            let target_old = target.read()?;
            let mut rewritten = aug_re
                .replace_all(&target_old, |c: &regex::Captures| {
                    format!(
                        "{obj}.set_{field}({obj}.get_{field}() {op} {rhs})",
                        obj = &c["obj"],
                        field = self.field_name,
                        op = &c["op"],
                        rhs = &c["rhs"],
                    )
                })
                .into_owned();
            rewritten = assign_re
                .replace_all(&rewritten, |c: &regex::Captures| {
                    format!(
                        "{obj}.set_{field}({rhs})",
                        obj = &c["obj"],
                        field = self.field_name,
                        rhs = &c["rhs"],
                    )
                })
                .into_owned();
            rewritten = read_re
                .replace_all(&rewritten, |c: &regex::Captures| {
                    format!("{obj}.get_{field}()", obj = &c["obj"], field = self.field_name)
                })
                .into_owned();

            if rewritten != target_old {
                children.push(Change::Content {
                    path: target.path().clone(),
                    old_text: target_old,
                    new_text: rewritten,
                });
            }
        }

        let accessors = format!(
            "\n    def get_{field}(self):\n        return self.{field}\n\n    def set_{field}(self, value):\n        self.{field} = value\n",
            field = self.field_name,
        );

        let defining_idx = children
            .iter()
            .position(|c| matches!(c, Change::Content { path, .. } if *path == self.module));
        let (defining_old, defining_new) = if let Some(idx) = defining_idx {
            let Change::Content { old_text, new_text } = children.remove(idx) else {
                unreachable!()
            };
            (old_text, new_text)
        } else {
            (old_text.clone(), old_text.clone())
        };
        let mut defining_new = defining_new;
        defining_new.insert_str(class_def.end_byte().min(defining_new.len()), &accessors);

        children.push(Change::Content {
            path: self.module.clone(),
            old_text: defining_old,
            new_text: defining_new,
        });

        Ok(Change::set(format!("encapsulate field {}", self.field_name), children))
    }
}

fn find_class_def(node: tree_sitter::Node) -> Option<tree_sitter::Node> {
    let mut current = Some(node);
    while let Some(n) = current {
        if n.kind() == "class_definition" {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn encapsulates_field_with_augmented_assignment() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        let file = root.create_file("mod.py").unwrap();
        file.write(
            "class AClass(object):\n    def __init__(self):\n        self.attr = 0\n\n    def bump(self):\n        self.attr <<= 1\n",
        )
        .unwrap();

        let text = file.read().unwrap();
        let offset = text.find("AClass").unwrap();
        let op = EncapsulateField {
            module: file.path().clone(),
            class_offset: offset,
            field_name: "attr".to_string(),
        };
        assert!(op.validate(&project).unwrap().is_valid());
        let change = op.plan(&project).unwrap();
        change.apply(&project).unwrap();
        let updated = file.read().unwrap();
        assert!(updated.contains("def get_attr(self):"));
        assert!(updated.contains("def set_attr(self, value):"));
        assert!(updated.contains("self.set_attr(self.get_attr() << 1)"));
        assert!(updated.contains("self.set_attr(0)"));
    }
}
