//! Inline (§4.G): replaces uses of a local variable or a function with
//! its definition.

use super::{RefactoringOperation, ValidationResult};
use crate::ast::Ast;
use crate::change::Change;
use crate::error::{EngineError, Result};
use crate::occurrence::OccurrenceKind;
use crate::resolver::Resolver;
use crate::resource::{Project, ResourcePath};

pub struct InlineLocal {
    pub module: ResourcePath,
    pub offset: usize,
}

impl RefactoringOperation for InlineLocal {
    fn name(&self) -> &'static str {
        "inline-local"
    }

    fn validate(&self, project: &Project) -> Result<ValidationResult> {
        let resolver = Resolver::new(project);
        let occs = resolver.occurrences_of(&self.module, self.offset)?;
        let defs = occs.iter().filter(|o| o.kind == OccurrenceKind::Definition).count();
        if defs != 1 {
            return Ok(ValidationResult::error(
                "inline-local requires a single-assignment local variable",
            ));
        }
        Ok(ValidationResult::ok())
    }

    fn plan(&self, project: &Project) -> Result<Change> {
        let file = project.get_file(self.module.clone())?;
        let old_text = file.read()?;
        let resolver = Resolver::new(project);
        let mut occs = resolver.occurrences_of(&self.module, self.offset)?;

        let def = occs
            .iter()
            .find(|o| o.kind == OccurrenceKind::Definition)
            .cloned()
            .ok_or_else(|| EngineError::refactoring("no definition found to inline"))?;

        let ast = Ast::parse(&old_text, file.real_path().as_path())?;
        let name_node = ast
            .node_at_offset(def.start_offset)
            .ok_or_else(|| EngineError::refactoring("definition offset out of range"))?;
        let assignment = name_node
            .parent()
            .filter(|p| p.kind() == "assignment")
            .ok_or_else(|| EngineError::refactoring("definition is not a simple assignment"))?;
        let rhs = assignment
            .child_by_field_name("right")
            .ok_or_else(|| EngineError::refactoring("assignment has no right-hand side"))?;
        let rhs_text = ast.text(&rhs).to_string();

        let def_line_start = old_text[..assignment.start_byte()].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let def_line_end = old_text[assignment.end_byte()..]
            .find('\n')
            .map(|i| assignment.end_byte() + i + 1)
            .unwrap_or(old_text.len());

        occs.sort_by(|a, b| b.start_offset.cmp(&a.start_offset));
        let mut new_text = old_text.clone();
        for occ in &occs {
            if occ.kind == OccurrenceKind::Definition {
                new_text.replace_range(def_line_start..def_line_end, "");
            } else {
                new_text.replace_range(occ.start_offset..occ.end_offset, &format!("({rhs_text})"));
            }
        }

        Ok(Change::Content {
            path: self.module.clone(),
            old_text,
            new_text,
        })
    }
}

pub struct InlineMethod {
    pub module: ResourcePath,
    pub offset: usize,
}

impl RefactoringOperation for InlineMethod {
    fn name(&self) -> &'static str {
        "inline-method"
    }

    fn validate(&self, project: &Project) -> Result<ValidationResult> {
        let file = project.get_file(self.module.clone())?;
        let text = file.read()?;
        let ast = Ast::parse(&text, file.real_path().as_path())?;
        let Some(node) = ast.node_at_offset(self.offset) else {
            return Ok(ValidationResult::error("offset out of range"));
        };
        let Some(def) = find_function_def(node) else {
            return Ok(ValidationResult::error("offset is not inside a function"));
        };
        if single_return_expr(&ast, def).is_none() {
            return Ok(ValidationResult::error(
                "inline-method only supports a function whose body is a single return statement",
            ));
        }
        Ok(ValidationResult::ok())
    }

    fn plan(&self, project: &Project) -> Result<Change> {
        let file = project.get_file(self.module.clone())?;
        let old_text = file.read()?;
        let ast = Ast::parse(&old_text, file.real_path().as_path())?;
        let node = ast
            .node_at_offset(self.offset)
            .ok_or_else(|| EngineError::refactoring("offset out of range"))?;
        let def = find_function_def(node)
            .ok_or_else(|| EngineError::refactoring("offset is not inside a function"))?;
        let body_expr = single_return_expr(&ast, def)
            .ok_or_else(|| EngineError::refactoring("function body is not a single return"))?
            .to_string();
        let name_node = def
            .child_by_field_name("name")
            .ok_or_else(|| EngineError::refactoring("function has no name"))?;
        let name = ast.text(&name_node).to_string();

        let resolver = Resolver::new(project);
        let mut occs = resolver.occurrences_of(&self.module, name_node.start_byte())?;
        occs.retain(|o| o.kind != OccurrenceKind::Definition);
        occs.sort_by(|a, b| b.start_offset.cmp(&a.start_offset));

        let mut new_text = old_text.clone();
        for occ in &occs {
            let mut call_end = occ.end_offset;
            if new_text[call_end..].starts_with("()") {
                call_end += 2;
            }
            new_text.replace_range(occ.start_offset..call_end, &format!("({body_expr})"));
        }

        let def_start = old_text[..def.start_byte()].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let def_end = old_text[def.end_byte()..]
            .find("\n\n")
            .map(|i| def.end_byte() + i + 2)
            .unwrap_or(old_text.len());
        new_text.replace_range(def_start..def_end, "");

        let _ = name;
        Ok(Change::Content {
            path: self.module.clone(),
            old_text,
            new_text,
        })
    }
}

fn find_function_def(node: tree_sitter::Node) -> Option<tree_sitter::Node> {
    let mut current = Some(node);
    while let Some(n) = current {
        if n.kind() == "function_definition" {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

fn single_return_expr<'a>(ast: &'a Ast, def: tree_sitter::Node) -> Option<&'a str> {
    let body = def.child_by_field_name("body")?;
    if body.named_child_count() != 1 {
        return None;
    }
    let stmt = body.named_child(0)?;
    if stmt.kind() != "return_statement" {
        return None;
    }
    let value = stmt.named_child(0)?;
    Some(ast.text(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn inlines_local_variable() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        let file = root.create_file("mod.py").unwrap();
        file.write("def f():\n    total = 1 + 2\n    return total\n").unwrap();

        let text = file.read().unwrap();
        let offset = text.find("total").unwrap();
        let op = InlineLocal {
            module: file.path().clone(),
            offset,
        };
        assert!(op.validate(&project).unwrap().is_valid());
        let change = op.plan(&project).unwrap();
        change.apply(&project).unwrap();
        let updated = file.read().unwrap();
        assert!(updated.contains("return (1 + 2)"));
        assert!(!updated.contains("total"));
    }

    #[test]
    fn inlines_zero_arg_function() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        let file = root.create_file("mod.py").unwrap();
        file.write("def greeting():\n    return 'hi'\n\n\nprint(greeting())\n")
            .unwrap();

        let text = file.read().unwrap();
        let offset = text.find("greeting").unwrap();
        let op = InlineMethod {
            module: file.path().clone(),
            offset,
        };
        assert!(op.validate(&project).unwrap().is_valid());
        let change = op.plan(&project).unwrap();
        change.apply(&project).unwrap();
        let updated = file.read().unwrap();
        assert!(updated.contains("print(('hi'))"));
        assert!(!updated.contains("def greeting"));
    }
}
