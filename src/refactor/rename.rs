//! Rename (§4.G): renames every occurrence of a binding.

use super::{RefactoringOperation, ValidationResult};
use crate::ast::Ast;
use crate::change::Change;
use crate::error::Result;
use crate::occurrence::Occurrence;
use crate::resolver::Resolver;
use crate::resource::{Project, ResourcePath};
use crate::scope::ScopeTree;

pub struct Rename {
    pub module: ResourcePath,
    pub offset: usize,
    pub new_name: String,
}

impl Rename {
    pub fn new(module: impl Into<ResourcePath>, offset: usize, new_name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            offset,
            new_name: new_name.into(),
        }
    }
}

impl RefactoringOperation for Rename {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn validate(&self, project: &Project) -> Result<ValidationResult> {
        if !is_valid_identifier(&self.new_name) {
            return Ok(ValidationResult::error(format!(
                "{} is not a valid identifier",
                self.new_name
            )));
        }
        let resolver = Resolver::new(project);
        let occurrences = resolver.occurrences_of(&self.module, self.offset)?;
        if occurrences.is_empty() {
            return Ok(ValidationResult::error(
                "no resolvable binding at the given offset",
            ));
        }
        if let Some(scope_desc) = find_collision(project, &self.module, self.offset, &self.new_name, &occurrences)? {
            return Ok(ValidationResult::error(format!(
                "{} already binds a name in {scope_desc}",
                self.new_name
            )));
        }
        Ok(ValidationResult::ok())
    }

    fn plan(&self, project: &Project) -> Result<Change> {
        let resolver = Resolver::new(project);
        let occurrences = resolver.occurrences_of(&self.module, self.offset)?;

        let mut by_module: std::collections::HashMap<ResourcePath, Vec<Occurrence>> =
            std::collections::HashMap::new();
        for occ in occurrences {
            by_module.entry(occ.module.clone()).or_default().push(occ);
        }

        let mut children = Vec::new();
        for (module, mut occs) in by_module {
            occs.sort_by(|a, b| b.start_offset.cmp(&a.start_offset));
            let file = project.get_file(module.clone())?;
            let mut text = file.read()?;
            for occ in &occs {
                text.replace_range(occ.start_offset..occ.end_offset, &self.new_name);
            }
            let old_text = file.read()?;
            children.push(Change::Content {
                path: module,
                old_text,
                new_text: text,
            });
        }

        Ok(Change::set(format!("rename to {}", self.new_name), children))
    }
}

/// Checks that `new_name` does not already bind a name in any scope the
/// renamed binding is reachable from (§4.G Rename). The reachable scopes
/// are exactly the defining scope plus the module scope of every module
/// the resolver already found an occurrence in.
fn find_collision(
    project: &Project,
    module: &ResourcePath,
    offset: usize,
    new_name: &str,
    occurrences: &[Occurrence],
) -> Result<Option<String>> {
    let file = project.get_file(module.clone())?;
    let text = file.read()?;
    let ast = Ast::parse(&text, file.real_path().as_path())?;
    let scopes = ScopeTree::build(&ast);
    let Some(node) = ast.node_at_offset(offset) else {
        return Ok(None);
    };
    let name = ast.text(&node).to_string();
    if name == new_name {
        return Ok(None);
    }
    let use_scope = scopes.scope_at_offset(node.start_byte());
    let Some((def_scope, _)) = scopes.lookup(use_scope, &name) else {
        return Ok(None);
    };

    let def_scope_ref = scopes.get(def_scope);
    if def_scope_ref.local_bindings.contains_key(new_name) {
        return Ok(Some(format!("{module} (same scope as {name})")));
    }

    let mut checked_modules = std::collections::HashSet::new();
    checked_modules.insert(module.clone());
    for occ in occurrences {
        if !checked_modules.insert(occ.module.clone()) {
            continue;
        }
        let target = project.get_file(occ.module.clone())?;
        let target_text = target.read()?;
        let target_ast = Ast::parse(&target_text, target.real_path().as_path())?;
        let target_scopes = ScopeTree::build(&target_ast);
        let scope_at_occ = target_scopes.scope_at_offset(occ.start_offset);
        if target_scopes.get(scope_at_occ).local_bindings.contains_key(new_name) {
            return Ok(Some(format!("{}", occ.module)));
        }
    }

    Ok(None)
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}
