//! Move (§4.G): relocates a module-global function, class, or variable to
//! another module, rewriting the `from <module> import <name>` statements
//! that referenced its old location.
//!
//! Only module-global elements can be moved (§4.G invariant): a local
//! variable or a class member has no meaning outside the scope it's
//! defined in, so moving it is refused rather than silently mis-rewritten.

use super::{RefactoringOperation, ValidationResult};
use crate::ast::Ast;
use crate::change::Change;
use crate::error::{EngineError, Result};
use crate::resolver::Resolver;
use crate::resource::{Project, ResourcePath};
use crate::scope::{ScopeKind, ScopeTree};
use regex::Regex;

pub struct MoveGlobal {
    pub module: ResourcePath,
    pub offset: usize,
    pub destination: ResourcePath,
}

impl RefactoringOperation for MoveGlobal {
    fn name(&self) -> &'static str {
        "move"
    }

    fn validate(&self, project: &Project) -> Result<ValidationResult> {
        let file = project.get_file(self.module.clone())?;
        let text = file.read()?;
        let ast = Ast::parse(&text, file.real_path().as_path())?;
        let scopes = ScopeTree::build(&ast);
        let scope = scopes.scope_at_offset(self.offset);
        if scopes.get(scope).kind != ScopeKind::Module {
            return Ok(ValidationResult::error(
                "only a module-global element can be moved",
            ));
        }
        if self.destination == self.module {
            return Ok(ValidationResult::error(
                "destination module is the same as the source module",
            ));
        }
        Ok(ValidationResult::ok())
    }

    fn plan(&self, project: &Project) -> Result<Change> {
        let file = project.get_file(self.module.clone())?;
        let old_source = file.read()?;
        let ast = Ast::parse(&old_source, file.real_path().as_path())?;

        let node = ast
            .node_at_offset(self.offset)
            .ok_or_else(|| EngineError::refactoring("offset out of range"))?;
        let def = find_global_def(node)
            .ok_or_else(|| EngineError::refactoring("offset is not a global definition"))?;
        let name_node = def
            .child_by_field_name("name")
            .or_else(|| def.child_by_field_name("left"))
            .ok_or_else(|| EngineError::refactoring("definition has no name"))?;
        let name = ast.text(&name_node).to_string();

        let resolver = Resolver::new(project);
        let occurrences = resolver.occurrences_of(&self.module, name_node.start_byte())?;

        let stmt_start = old_source[..def.start_byte()].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let stmt_end = old_source[def.end_byte()..]
            .find('\n')
            .map(|i| def.end_byte() + i + 1)
            .unwrap_or(old_source.len());
        let moved_text = old_source[stmt_start..stmt_end].to_string();

        let mut new_source = old_source.clone();
        new_source.replace_range(stmt_start..stmt_end, "");

        let dest_module_name = self.destination.to_module_name();
        let source_module_name = self.module.to_module_name();

        if contains_word(&new_source, &name) {
            new_source = format!("from {dest_module_name} import {name}\n{new_source}");
        }

        let mut children = vec![Change::Content {
            path: self.module.clone(),
            old_text: old_source,
            new_text: new_source,
        }];

        let dest_exists = project.get_file(self.destination.clone()).is_ok();
        let dest_old_text = if dest_exists {
            project.get_file(self.destination.clone())?.read()?
        } else {
            String::new()
        };
        let mut dest_new_text = dest_old_text.clone();
        if !dest_new_text.is_empty() && !dest_new_text.ends_with('\n') {
            dest_new_text.push('\n');
        }
        if !dest_new_text.is_empty() {
            dest_new_text.push('\n');
        }
        dest_new_text.push_str(&moved_text);

        if dest_exists {
            children.push(Change::Content {
                path: self.destination.clone(),
                old_text: dest_old_text,
                new_text: dest_new_text,
            });
        } else {
            children.push(Change::CreateFile {
                path: self.destination.clone(),
                content: dest_new_text,
            });
        }

        let import_re = Regex::new(&format!(
            r"from\s+{}\s+import\s+{}\b",
            regex::escape(&source_module_name),
            regex::escape(&name)
        ))
        .expect("valid regex");

        let mut seen = std::collections::HashSet::new();
        seen.insert(self.module.clone());
        seen.insert(self.destination.clone());
        for occ in &occurrences {
            if !seen.insert(occ.module.clone()) {
                continue;
            }
            let referencing = project.get_file(occ.module.clone())?;
            let text = referencing.read()?;
            if import_re.is_match(&text) {
                let new_text = import_re
                    .replace_all(&text, format!("from {dest_module_name} import {name}"))
                    .into_owned();
                children.push(Change::Content {
                    path: occ.module.clone(),
                    old_text: text,
                    new_text,
                });
            }
        }

        Ok(Change::set(format!("move {name} to {dest_module_name}"), children))
    }
}

/// Moves a whole module (or a package's `__init__.py`, moved as the
/// package folder it belongs to) to another folder, rewriting every
/// import that refers to it by dotted path throughout the project (§4.G
/// Move, second sub-case). Unlike `MoveGlobal`, the bound name at each
/// call site is not preserved: a `from <old_package> import <stem>` is
/// converted to the qualified `import <new_dotted>` form, matching the
/// literal transform a relocation performs on the module's own dotted
/// path rather than trying to keep the old unqualified name alive.
pub struct MoveModule {
    pub module: ResourcePath,
    pub destination_folder: ResourcePath,
}

impl RefactoringOperation for MoveModule {
    fn name(&self) -> &'static str {
        "move-module"
    }

    fn validate(&self, project: &Project) -> Result<ValidationResult> {
        let file = project.get_file(self.module.clone())?;
        if !file.name().ends_with(".py") {
            return Ok(ValidationResult::error("not a module file"));
        }
        if !self.destination_folder.is_root() && project.get_folder(self.destination_folder.clone()).is_err() {
            return Ok(ValidationResult::error("destination folder does not exist"));
        }
        let new_path = self.destination_folder.child(self.module.name());
        if new_path == self.module {
            return Ok(ValidationResult::error(
                "destination is the same as the current location",
            ));
        }
        if project.get_resource(new_path.clone()).is_ok() {
            return Ok(ValidationResult::error(format!("{new_path} already exists")));
        }
        Ok(ValidationResult::ok())
    }

    fn plan(&self, project: &Project) -> Result<Change> {
        let new_path = self.destination_folder.child(self.module.name());
        let old_dotted = self.module.to_module_name();
        let new_dotted = new_path.to_module_name();
        let stem = self.module.name().trim_end_matches(".py").to_string();

        let qualified_re = Regex::new(&format!(r"\b{}\b", regex::escape(&old_dotted))).expect("valid regex");
        let from_import_re = self.module.parent().map(|parent| {
            let package = parent.to_module_name();
            Regex::new(&format!(
                r"from\s+{}\s+import\s+{}\b",
                regex::escape(&package),
                regex::escape(&stem)
            ))
            .expect("valid regex")
        });

        let mut children = vec![Change::Move {
            from: self.module.clone(),
            to: new_path.clone(),
        }];

        for target in project.all_modules()? {
            if target.path() == &self.module {
                continue;
            }
            let old_text = target.read()?;
            let mut new_text = old_text.clone();
            if let Some(re) = &from_import_re {
                new_text = re.replace_all(&new_text, format!("import {new_dotted}")).into_owned();
            }
            new_text = qualified_re.replace_all(&new_text, new_dotted.as_str()).into_owned();

            if new_text != old_text {
                children.push(Change::Content {
                    path: target.path().clone(),
                    old_text,
                    new_text,
                });
            }
        }

        Ok(Change::set(format!("move module {old_dotted} to {new_dotted}"), children))
    }
}

fn find_global_def(node: tree_sitter::Node) -> Option<tree_sitter::Node> {
    let mut current = Some(node);
    while let Some(n) = current {
        match n.kind() {
            "function_definition" | "class_definition" | "assignment" => return Some(n),
            _ => current = n.parent(),
        }
    }
    None
}

fn contains_word(haystack: &str, word: &str) -> bool {
    let re = Regex::new(&format!(r"\b{}\b", regex::escape(word))).expect("valid regex");
    re.is_match(haystack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn moves_function_and_rewrites_from_import() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        let source = root.create_file("source.py").unwrap();
        source.write("def a_func():\n    return 1\n").unwrap();
        let consumer = root.create_file("consumer.py").unwrap();
        consumer
            .write("from source import a_func\n\na_func()\n")
            .unwrap();

        let text = source.read().unwrap();
        let offset = text.find("a_func").unwrap();
        let op = MoveGlobal {
            module: source.path().clone(),
            offset,
            destination: "destination.py".into(),
        };
        assert!(op.validate(&project).unwrap().is_valid());
        let change = op.plan(&project).unwrap();
        change.apply(&project).unwrap();

        assert!(!source.read().unwrap().contains("def a_func"));
        let dest = project.get_file(ResourcePath::new("destination.py")).unwrap();
        assert!(dest.read().unwrap().contains("def a_func"));
        assert!(consumer.read().unwrap().contains("from destination import a_func"));
    }

    #[test]
    fn moves_module_and_rewrites_from_import_to_qualified_import() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        let pkg = root.create_folder("pkg").unwrap();
        let mod4 = pkg.create_file("mod4.py").unwrap();
        mod4.write("def f():\n    return 1\n").unwrap();
        let mod2 = root.create_file("mod2.py").unwrap();
        mod2.write("from pkg import mod4\nmod4.f()\n").unwrap();

        let op = MoveModule {
            module: mod4.path().clone(),
            destination_folder: ResourcePath::root(),
        };
        assert!(op.validate(&project).unwrap().is_valid());
        let change = op.plan(&project).unwrap();
        change.apply(&project).unwrap();

        assert!(!pkg.has_child("mod4.py"));
        let moved = project.get_file(ResourcePath::new("mod4.py")).unwrap();
        assert!(moved.read().unwrap().contains("def f"));
        assert_eq!(mod2.read().unwrap(), "import mod4\nmod4.f()\n");
    }

    #[test]
    fn refuses_to_move_local_variable() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        let source = root.create_file("source.py").unwrap();
        source.write("def f():\n    local = 1\n    return local\n").unwrap();
        let text = source.read().unwrap();
        let offset = text.find("local").unwrap();
        let op = MoveGlobal {
            module: source.path().clone(),
            offset,
            destination: "destination.py".into(),
        };
        assert!(!op.validate(&project).unwrap().is_valid());
    }
}
