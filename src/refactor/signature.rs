//! Change-signature and introduce-parameter (§4.G).

use super::{RefactoringOperation, ValidationResult};
use crate::ast::Ast;
use crate::change::Change;
use crate::error::{EngineError, Result};
use crate::occurrence::OccurrenceKind;
use crate::resolver::Resolver;
use crate::resource::{Project, ResourcePath};
use regex::Regex;
use std::collections::HashMap;
use tree_sitter::Node;

/// One entry of a function's new parameter list (§4.G change-signature:
/// add-with-default, remove, reorder, rename, convert-to-keyword-only).
/// Keyword arguments at call sites are tracked by name through reorder
/// and rename, not by position.
#[derive(Debug, Clone)]
pub enum ParameterSpec {
    /// Keep the original parameter at this index, in this new position.
    Keep(usize),
    /// Add a brand new parameter with a default, so existing call sites
    /// stay valid without rewriting.
    Add { name: String, default: String },
    /// Drop the original parameter at this index. Validated to either
    /// carry a default already or be unused positionally and by keyword
    /// at every call site.
    Remove(usize),
    /// Keep the original parameter at this index but give it a new name,
    /// in this new position. Keyword call-site arguments using the old
    /// name are rewritten to the new one.
    Rename { index: usize, new_name: String },
    /// Keep the original parameter at this index, in this new position,
    /// but force it keyword-only: a bare `*` is inserted before it in the
    /// definition, and call sites passing it positionally are rewritten
    /// to pass it by keyword.
    KeywordOnly(usize),
}

impl ParameterSpec {
    fn original_index(&self) -> Option<usize> {
        match self {
            ParameterSpec::Keep(i) | ParameterSpec::Remove(i) | ParameterSpec::KeywordOnly(i) => Some(*i),
            ParameterSpec::Rename { index, .. } => Some(*index),
            ParameterSpec::Add { .. } => None,
        }
    }
}

pub struct ChangeSignature {
    pub module: ResourcePath,
    pub offset: usize,
    pub params: Vec<ParameterSpec>,
}

impl RefactoringOperation for ChangeSignature {
    fn name(&self) -> &'static str {
        "change-signature"
    }

    fn validate(&self, project: &Project) -> Result<ValidationResult> {
        let file = project.get_file(self.module.clone())?;
        let text = file.read()?;
        let ast = Ast::parse(&text, file.real_path().as_path())?;
        let Some(node) = ast.node_at_offset(self.offset) else {
            return Ok(ValidationResult::error("offset out of range"));
        };
        let Some(def) = find_function_def(node) else {
            return Ok(ValidationResult::error("offset is not inside a function definition"));
        };

        let mut result = ValidationResult::ok();
        let Some(params_node) = def.child_by_field_name("parameters") else {
            return Ok(result);
        };
        let original_names = param_names(&ast, params_node);
        let kept: std::collections::HashSet<usize> = self.params.iter().filter_map(|s| s.original_index()).collect();

        if let Some(name_node) = def.child_by_field_name("name") {
            let resolver = Resolver::new(project);
            let mut occurrences = resolver.occurrences_of(&self.module, name_node.start_byte())?;
            occurrences.retain(|o| o.module == self.module && o.kind == OccurrenceKind::Read);

            for (i, original_name) in original_names.iter().enumerate() {
                if kept.contains(&i) {
                    continue;
                }
                let has_default = params_node
                    .named_child(i as u32)
                    .is_some_and(|n| matches!(n.kind(), "default_parameter" | "typed_default_parameter"));
                if has_default {
                    continue;
                }
                let used_somewhere = occurrences.iter().any(|occ| {
                    call_arguments_after(&ast, occ.end_offset)
                        .map(|call| call_args(&ast, call))
                        .is_some_and(|args| {
                            args.iter().enumerate().any(|(pos, a)| {
                                a.name.as_deref() == Some(original_name.as_str()) || (a.name.is_none() && pos == i)
                            })
                        })
                });
                if used_somewhere {
                    result.errors.push(format!(
                        "cannot remove parameter {original_name}: used at a call site and has no default"
                    ));
                }
            }
        }
        Ok(result)
    }

    fn plan(&self, project: &Project) -> Result<Change> {
        let file = project.get_file(self.module.clone())?;
        let old_text = file.read()?;
        let ast = Ast::parse(&old_text, file.real_path().as_path())?;
        let node = ast
            .node_at_offset(self.offset)
            .ok_or_else(|| EngineError::refactoring("offset out of range"))?;
        let def = find_function_def(node)
            .ok_or_else(|| EngineError::refactoring("offset is not inside a function definition"))?;
        let params_node = def
            .child_by_field_name("parameters")
            .ok_or_else(|| EngineError::refactoring("function has no parameter list"))?;
        let original: Vec<String> = param_texts(&ast, params_node);
        let original_names = param_names(&ast, params_node);

        let mut entries: Vec<String> = Vec::new();
        let mut keyword_only_inserted = false;
        for spec in &self.params {
            if !keyword_only_inserted && matches!(spec, ParameterSpec::KeywordOnly(_)) {
                entries.push("*".to_string());
                keyword_only_inserted = true;
            }
            match spec {
                ParameterSpec::Keep(i) | ParameterSpec::KeywordOnly(i) => {
                    entries.push(original.get(*i).cloned().unwrap_or_default());
                }
                ParameterSpec::Add { name, default } => entries.push(format!("{name}={default}")),
                ParameterSpec::Rename { index, new_name } => {
                    let text = original.get(*index).cloned().unwrap_or_default();
                    entries.push(rename_param_text(&text, new_name));
                }
                ParameterSpec::Remove(_) => {}
            }
        }
        let new_param_list = entries.join(", ");

        let mut new_text = old_text.clone();
        new_text.replace_range(params_node.start_byte()..params_node.end_byte(), &format!("({new_param_list})"));

        let name_node = def
            .child_by_field_name("name")
            .ok_or_else(|| EngineError::refactoring("function has no name"))?;
        let resolver = Resolver::new(project);
        let mut occurrences = resolver.occurrences_of(&self.module, name_node.start_byte())?;
        occurrences.retain(|o| o.module == self.module && o.kind == OccurrenceKind::Read);
        occurrences.sort_by(|a, b| b.start_offset.cmp(&a.start_offset));

        for occ in &occurrences {
            let Some(call_node) = call_arguments_after(&ast, occ.end_offset) else {
                continue;
            };
            let args = call_args(&ast, call_node);
            let new_args = rewrite_call_args(&original_names, &self.params, &args);
            new_text.replace_range(call_node.start_byte()..call_node.end_byte(), &format!("({new_args})"));
        }

        Ok(Change::Content {
            path: self.module.clone(),
            old_text,
            new_text,
        })
    }
}

/// One call-site argument: `name` is `Some` for `name=value` keyword
/// arguments, `None` for positional ones.
struct CallArg {
    name: Option<String>,
    text: String,
}

fn call_args<'a>(ast: &'a Ast, node: Node) -> Vec<CallArg> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "keyword_argument" {
            let name = child.child_by_field_name("name").map(|n| ast.text(&n).to_string());
            let value = child
                .child_by_field_name("value")
                .map(|n| ast.text(&n).to_string())
                .unwrap_or_default();
            out.push(CallArg { name, text: value });
        } else {
            out.push(CallArg {
                name: None,
                text: ast.text(&child).to_string(),
            });
        }
    }
    out
}

fn rewrite_call_args(original_names: &[String], specs: &[ParameterSpec], args: &[CallArg]) -> String {
    let mut by_index: HashMap<usize, &CallArg> = HashMap::new();
    let mut next_positional = 0usize;
    for arg in args {
        match &arg.name {
            None => {
                by_index.insert(next_positional, arg);
                next_positional += 1;
            }
            Some(name) => {
                if let Some(idx) = original_names.iter().position(|n| n == name) {
                    by_index.insert(idx, arg);
                }
            }
        }
    }

    let mut positional_out = Vec::new();
    let mut keyword_out = Vec::new();
    for spec in specs {
        match spec {
            ParameterSpec::Keep(i) => {
                if let Some(arg) = by_index.get(i) {
                    match &arg.name {
                        Some(_) => keyword_out.push(format!("{}={}", original_names[*i], arg.text)),
                        None => positional_out.push(arg.text.clone()),
                    }
                }
            }
            ParameterSpec::KeywordOnly(i) => {
                if let Some(arg) = by_index.get(i) {
                    keyword_out.push(format!("{}={}", original_names[*i], arg.text));
                }
            }
            ParameterSpec::Rename { index, new_name } => {
                if let Some(arg) = by_index.get(index) {
                    match &arg.name {
                        Some(_) => keyword_out.push(format!("{new_name}={}", arg.text)),
                        None => positional_out.push(arg.text.clone()),
                    }
                }
            }
            ParameterSpec::Add { .. } | ParameterSpec::Remove(_) => {}
        }
    }
    positional_out.extend(keyword_out);
    positional_out.join(", ")
}

/// Replaces a parameter's identifier, keeping any `*`/`**` prefix,
/// annotation, or default intact.
fn rename_param_text(text: &str, new_name: &str) -> String {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^(\*{0,2}\s*)([A-Za-z_][A-Za-z0-9_]*)(.*)$").unwrap());
    match re.captures(text) {
        Some(caps) => format!("{}{}{}", &caps[1], new_name, &caps[3]),
        None => new_name.to_string(),
    }
}

/// A parameter's bare identifier, stripped of any `*`/`**` prefix,
/// annotation, or default.
fn param_names(ast: &Ast, params_node: Node) -> Vec<String> {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^\*{0,2}\s*([A-Za-z_][A-Za-z0-9_]*)").unwrap());
    param_texts(ast, params_node)
        .iter()
        .map(|t| {
            re.captures(t)
                .map(|c| c[1].to_string())
                .unwrap_or_else(|| t.clone())
        })
        .collect()
}

pub struct IntroduceParameter {
    pub module: ResourcePath,
    pub function_offset: usize,
    pub expr_text: String,
    pub param_name: String,
}

impl RefactoringOperation for IntroduceParameter {
    fn name(&self) -> &'static str {
        "introduce-parameter"
    }

    fn validate(&self, project: &Project) -> Result<ValidationResult> {
        let file = project.get_file(self.module.clone())?;
        let text = file.read()?;
        let ast = Ast::parse(&text, file.real_path().as_path())?;
        let Some(node) = ast.node_at_offset(self.function_offset) else {
            return Ok(ValidationResult::error("offset out of range"));
        };
        let Some(def) = find_function_def(node) else {
            return Ok(ValidationResult::error("offset is not inside a function definition"));
        };
        let body = def.child_by_field_name("body").unwrap_or(def);
        if !ast.text(&body).contains(&self.expr_text) {
            return Ok(ValidationResult::error(
                "expression does not occur in the function body",
            ));
        }
        Ok(ValidationResult::ok())
    }

    fn plan(&self, project: &Project) -> Result<Change> {
        let file = project.get_file(self.module.clone())?;
        let old_text = file.read()?;
        let ast = Ast::parse(&old_text, file.real_path().as_path())?;
        let node = ast
            .node_at_offset(self.function_offset)
            .ok_or_else(|| EngineError::refactoring("offset out of range"))?;
        let def = find_function_def(node)
            .ok_or_else(|| EngineError::refactoring("offset is not inside a function definition"))?;
        let body = def.child_by_field_name("body").unwrap_or(def);
        let params_node = def
            .child_by_field_name("parameters")
            .ok_or_else(|| EngineError::refactoring("function has no parameter list"))?;

        let body_text = ast.text(&body);
        let rewritten_body = body_text.replace(&self.expr_text, &self.param_name);

        let mut new_text = old_text.clone();
        new_text.replace_range(body.start_byte()..body.end_byte(), &rewritten_body);
        let param_insert = format!("{}={}", self.param_name, self.expr_text);
        let original_params = ast.text(&params_node);
        let new_params = if original_params == "()" {
            format!("({param_insert})")
        } else {
            format!("({}, {param_insert})", &original_params[1..original_params.len() - 1])
        };
        new_text.replace_range(params_node.start_byte()..params_node.end_byte(), &new_params);

        Ok(Change::Content {
            path: self.module.clone(),
            old_text,
            new_text,
        })
    }
}

fn find_function_def(node: Node) -> Option<Node> {
    let mut current = Some(node);
    while let Some(n) = current {
        if n.kind() == "function_definition" {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

/// The comma-separated named-child texts of a `parameters` or `argument_list` node.
fn param_texts<'a>(ast: &'a Ast, node: Node) -> Vec<String> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        out.push(ast.text(&child).to_string());
    }
    out
}

/// Given the end offset of a call's function-name identifier, finds the
/// immediately following `argument_list` node, if the identifier is in
/// fact used as a call.
fn call_arguments_after<'a>(ast: &'a Ast, name_end: usize) -> Option<Node<'a>> {
    let node = ast.node_at_offset(name_end)?;
    let call = node.parent().filter(|p| p.kind() == "call")?;
    call.child_by_field_name("arguments")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn changes_signature_reordering_params() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        let file = root.create_file("mod.py").unwrap();
        file.write("def f(a, b):\n    return a - b\n\nf(1, 2)\n").unwrap();

        let text = file.read().unwrap();
        let offset = text.find("f(a").unwrap();
        let op = ChangeSignature {
            module: file.path().clone(),
            offset,
            params: vec![ParameterSpec::Keep(1), ParameterSpec::Keep(0)],
        };
        assert!(op.validate(&project).unwrap().is_valid());
        let change = op.plan(&project).unwrap();
        change.apply(&project).unwrap();
        let updated = file.read().unwrap();
        assert!(updated.contains("def f(b, a):"));
        assert!(updated.contains("f(2, 1)"));
    }

    #[test]
    fn introduces_parameter_from_body_expression() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        let file = root.create_file("mod.py").unwrap();
        file.write("def f():\n    return helper()\n").unwrap();

        let text = file.read().unwrap();
        let offset = text.find("def f").unwrap();
        let op = IntroduceParameter {
            module: file.path().clone(),
            function_offset: offset,
            expr_text: "helper()".to_string(),
            param_name: "value".to_string(),
        };
        assert!(op.validate(&project).unwrap().is_valid());
        let change = op.plan(&project).unwrap();
        change.apply(&project).unwrap();
        let updated = file.read().unwrap();
        assert!(updated.contains("def f(value=helper()):"));
        assert!(updated.contains("return value"));
    }

    #[test]
    fn removes_unused_parameter() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        let file = root.create_file("mod.py").unwrap();
        file.write("def f(a, b):\n    return a\n\nf(1, 2)\n").unwrap();

        let text = file.read().unwrap();
        let offset = text.find("f(a").unwrap();
        let op = ChangeSignature {
            module: file.path().clone(),
            offset,
            params: vec![ParameterSpec::Keep(0), ParameterSpec::Remove(1)],
        };
        assert!(op.validate(&project).unwrap().is_valid());
        let change = op.plan(&project).unwrap();
        change.apply(&project).unwrap();
        let updated = file.read().unwrap();
        assert!(updated.contains("def f(a):"));
        assert!(updated.contains("f(1)"));
    }

    #[test]
    fn rejects_removing_parameter_used_at_call_site() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        let file = root.create_file("mod.py").unwrap();
        file.write("def f(a, b):\n    return a + b\n\nf(1, 2)\n").unwrap();

        let text = file.read().unwrap();
        let offset = text.find("f(a").unwrap();
        let op = ChangeSignature {
            module: file.path().clone(),
            offset,
            params: vec![ParameterSpec::Keep(0), ParameterSpec::Remove(1)],
        };
        assert!(!op.validate(&project).unwrap().is_valid());
    }

    #[test]
    fn renames_parameter_and_rewrites_keyword_call_site() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        let file = root.create_file("mod.py").unwrap();
        file.write("def f(a, b):\n    return a - b\n\nf(a=1, b=2)\n").unwrap();

        let text = file.read().unwrap();
        let offset = text.find("f(a").unwrap();
        let op = ChangeSignature {
            module: file.path().clone(),
            offset,
            params: vec![
                ParameterSpec::Rename { index: 0, new_name: "x".to_string() },
                ParameterSpec::Keep(1),
            ],
        };
        assert!(op.validate(&project).unwrap().is_valid());
        let change = op.plan(&project).unwrap();
        change.apply(&project).unwrap();
        let updated = file.read().unwrap();
        assert!(updated.contains("def f(x, b):"));
        assert!(updated.contains("f(x=1, b=2)"));
    }

    #[test]
    fn converts_parameter_to_keyword_only() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        let file = root.create_file("mod.py").unwrap();
        file.write("def f(a, b):\n    return a - b\n\nf(1, 2)\n").unwrap();

        let text = file.read().unwrap();
        let offset = text.find("f(a").unwrap();
        let op = ChangeSignature {
            module: file.path().clone(),
            offset,
            params: vec![ParameterSpec::Keep(0), ParameterSpec::KeywordOnly(1)],
        };
        assert!(op.validate(&project).unwrap().is_valid());
        let change = op.plan(&project).unwrap();
        change.apply(&project).unwrap();
        let updated = file.read().unwrap();
        assert!(updated.contains("def f(a, *, b):"));
        assert!(updated.contains("f(1, b=2)"));
    }
}
