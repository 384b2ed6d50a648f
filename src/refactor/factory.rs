//! Introduce-factory (§4.G): routes direct constructor calls through a
//! factory, either a `@staticmethod` on the class itself or a module-level
//! `global_factory` function.
//!
//! Only direct constructor calls (`ClassName(...)`) are rewritten. A use
//! of the class name that isn't immediately called — most commonly an
//! alias assignment like `Alias = ClassName` — is left untouched: the
//! resolver's textual-identity tie-break doesn't follow aliases, so a
//! subsequent `Alias()` call is never discovered as a constructor site.

use super::{RefactoringOperation, ValidationResult};
use crate::ast::Ast;
use crate::change::Change;
use crate::error::{EngineError, Result};
use crate::occurrence::OccurrenceKind;
use crate::resolver::Resolver;
use crate::resource::{Project, ResourcePath};
use crate::scope::{ScopeKind, ScopeTree};
use regex::Regex;

pub struct IntroduceFactory {
    pub module: ResourcePath,
    pub class_offset: usize,
    pub factory_name: String,
    pub global_factory: bool,
}

impl RefactoringOperation for IntroduceFactory {
    fn name(&self) -> &'static str {
        "introduce-factory"
    }

    fn validate(&self, project: &Project) -> Result<ValidationResult> {
        let file = project.get_file(self.module.clone())?;
        let text = file.read()?;
        let ast = Ast::parse(&text, file.real_path().as_path())?;
        let scopes = ScopeTree::build(&ast);
        let Some(node) = ast.node_at_offset(self.class_offset) else {
            return Ok(ValidationResult::error("offset out of range"));
        };
        let Some(class_def) = find_class_def(node) else {
            return Ok(ValidationResult::error("offset is not inside a class definition"));
        };
        let scope = scopes.scope_at_offset(class_def.start_byte());
        if scopes.get(scope).kind != ScopeKind::Module {
            return Ok(ValidationResult::error("only a module-level class can get a factory"));
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
        let name_node = class_def
            .child_by_field_name("name")
            .ok_or_else(|| EngineError::refactoring("class has no name"))?;
        let class_name = ast.text(&name_node).to_string();

        let resolver = Resolver::new(project);
        let mut occurrences = resolver.occurrences_of(&self.module, name_node.start_byte())?;
        occurrences.retain(|o| o.kind == OccurrenceKind::Read);

        let mut by_module: std::collections::HashMap<ResourcePath, Vec<crate::occurrence::Occurrence>> =
            std::collections::HashMap::new();
        for occ in occurrences {
            by_module.entry(occ.module.clone()).or_default().push(occ);
        }

        let mut children = Vec::new();
        let module_name = self.module.to_module_name();

        for (target_path, mut occs) in by_module {
            let is_defining = target_path == self.module;
            let target_old_text = if is_defining {
                old_text.clone()
            } else {
                project.get_file(target_path.clone())?.read()?
            };
            occs.sort_by(|a, b| b.start_offset.cmp(&a.start_offset));

            let mut new_text = target_old_text.clone();
            for occ in &occs {
                if !new_text[occ.end_offset..].starts_with('(') {
                    continue;
                }
                let replacement = if self.global_factory {
                    self.factory_name.clone()
                } else {
                    format!("{class_name}.{}", self.factory_name)
                };
                new_text.replace_range(occ.start_offset..occ.end_offset, &replacement);
            }

            if self.global_factory && !is_defining {
                let import_re = Regex::new(&format!(
                    r"from\s+{}\s+import\s+{}\b",
                    regex::escape(&module_name),
                    regex::escape(&class_name)
                ))
                .expect("valid regex");
                if let Some(m) = import_re.find(&new_text) {
                    let injection = format!("\nfrom {module_name} import {}", self.factory_name);
                    new_text.insert_str(m.end(), &injection);
                }
            }

            if new_text != target_old_text {
                children.push(Change::Content {
                    path: target_path,
                    old_text: target_old_text,
                    new_text,
                });
            }
        }

        let defining_old = old_text.clone();
        let mut defining_new = children
            .iter()
            .find(|c| matches!(c, Change::Content { path, .. } if *path == self.module))
            .map(|c| match c {
                Change::Content { new_text, .. } => new_text.clone(),
                _ => unreachable!(),
            })
            .unwrap_or_else(|| old_text.clone());

        if self.global_factory {
            let factory_src = format!(
                "\n\ndef {}(*args, **kwds):\n    return {}(*args, **kwds)\n",
                self.factory_name, class_name
            );
            let insert_at = defining_new[class_def.end_byte().min(defining_new.len())..]
                .find("\n\n")
                .map(|i| class_def.end_byte() + i + 2)
                .unwrap_or(defining_new.len());
            defining_new.insert_str(insert_at, &factory_src);
        } else {
            let factory_src = format!(
                "\n    @staticmethod\n    def {}(*args, **kwds):\n        return {}(*args, **kwds)\n",
                self.factory_name, class_name
            );
            let class_end = class_def.end_byte();
            defining_new.insert_str(class_end, &factory_src);
        }

        children.retain(|c| !matches!(c, Change::Content { path, .. } if *path == self.module));
        children.push(Change::Content {
            path: self.module.clone(),
            old_text: defining_old,
            new_text: defining_new,
        });

        Ok(Change::set(format!("introduce factory for {class_name}"), children))
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
    fn introduces_instance_factory_and_rewrites_calls() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        let file = root.create_file("mod.py").unwrap();
        file.write("class AClass(object):\n    pass\n\na = AClass()\n").unwrap();

        let text = file.read().unwrap();
        let offset = text.find("AClass").unwrap();
        let op = IntroduceFactory {
            module: file.path().clone(),
            class_offset: offset,
            factory_name: "create".to_string(),
            global_factory: false,
        };
        assert!(op.validate(&project).unwrap().is_valid());
        let change = op.plan(&project).unwrap();
        change.apply(&project).unwrap();
        let updated = file.read().unwrap();
        assert!(updated.contains("def create(*args, **kwds):"));
        assert!(updated.contains("a = AClass.create()"));
    }

    #[test]
    fn alias_construction_is_not_rewritten() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        let file = root.create_file("mod.py").unwrap();
        file.write("class AClass(object):\n    pass\n\nAlias = AClass\nAlias()\n")
            .unwrap();

        let text = file.read().unwrap();
        let offset = text.find("AClass").unwrap();
        let op = IntroduceFactory {
            module: file.path().clone(),
            class_offset: offset,
            factory_name: "create".to_string(),
            global_factory: false,
        };
        let change = op.plan(&project).unwrap();
        change.apply(&project).unwrap();
        let updated = file.read().unwrap();
        assert!(updated.contains("Alias = AClass"));
        assert!(updated.contains("Alias()"));
    }
}
