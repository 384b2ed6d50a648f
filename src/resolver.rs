//! Name resolution: `occurrences_of` (§4.D).
//!
//! Resolution is occurrence-based, not type-based: a name resolves to a
//! binding site by walking the scope tree outward from the point of use,
//! the same way the target language itself resolves names at runtime. No
//! type inference is performed, so attribute accesses (`obj.attr`) are
//! matched by textual identity against the attribute name alone once the
//! defining binding is known to be a class member.

use crate::ast::{classify, Ast, NodeKind};
use crate::error::Result;
use crate::occurrence::{Occurrence, OccurrenceKind};
use crate::resource::{Project, Resource};
use crate::scope::{Binding, BindingKind, ScopeId, ScopeKind, ScopeTree};
use regex::Regex;
use tree_sitter::Node;

pub struct Resolver<'p> {
    project: &'p Project,
}

impl<'p> Resolver<'p> {
    pub fn new(project: &'p Project) -> Self {
        Self { project }
    }

    /// Every occurrence of the binding at `offset` in `module`, across
    /// every module the binding is reachable from. Returns an empty
    /// vector (not an error) when `offset` does not name a resolvable
    /// binding (§4.D edge case).
    pub fn occurrences_of(&self, module: &crate::resource::ResourcePath, offset: usize) -> Result<Vec<Occurrence>> {
        let resource = self.project.get_file(module.clone())?;
        let text = resource.read()?;
        let ast = Ast::parse(&text, &resource.real_path())?;
        let scopes = ScopeTree::build(&ast);

        let Some(node) = ast.node_at_offset(offset) else {
            return Ok(Vec::new());
        };
        if classify(&node) != NodeKind::Name {
            return Ok(Vec::new());
        }
        let name = ast.text(&node).to_string();
        let use_scope = scopes.scope_at_offset(node.start_byte());
        let Some((def_scope, binding)) = scopes.lookup(use_scope, &name) else {
            return Ok(Vec::new());
        };
        let binding = binding.clone();
        let def_scope_kind = scopes.get(def_scope).kind;

        let mut occurrences = Vec::new();

        match def_scope_kind {
            ScopeKind::Function => {
                let scope = scopes.get(def_scope);
                self.walk_module(
                    &resource,
                    &text,
                    &ast,
                    &scopes,
                    &name,
                    &resource,
                    &binding,
                    def_scope,
                    def_scope_kind,
                    Some((scope.start_byte, scope.end_byte)),
                    &mut occurrences,
                );
            }
            ScopeKind::Module | ScopeKind::Class => {
                for target in self.reachable_modules(&resource, &text)? {
                    let target_text = if target.path() == resource.path() {
                        text.clone()
                    } else {
                        target.read()?
                    };
                    let target_ast = Ast::parse(&target_text, &target.real_path())?;
                    let target_scopes = ScopeTree::build(&target_ast);
                    self.walk_module(
                        &target,
                        &target_text,
                        &target_ast,
                        &target_scopes,
                        &name,
                        &resource,
                        &binding,
                        def_scope,
                        def_scope_kind,
                        None,
                        &mut occurrences,
                    );
                }
            }
        }

        Ok(occurrences)
    }

    /// Modules from which the binding defined in `defining` is reachable:
    /// the defining module itself, plus every module whose source
    /// textually imports it (by dotted name or relative dots). Pruning by
    /// regex before parsing avoids building a scope tree for every module
    /// in the project on every lookup.
    fn reachable_modules(&self, defining: &Resource, _defining_text: &str) -> Result<Vec<Resource>> {
        let module_name = defining.path().to_module_name();
        let stem = defining.name().trim_end_matches(".py");
        let pattern = format!(
            r"(?m)^\s*(import\s+{mod}\b|from\s+\.*{mod}\s+import\b|from\s+\.+{stem}\s+import\b)",
            mod = regex::escape(&module_name),
            stem = regex::escape(stem),
        );
        let import_re = Regex::new(&pattern).expect("valid regex");

        let mut out = vec![defining.clone()];
        for candidate in self.project.all_modules()? {
            if candidate.path() == defining.path() {
                continue;
            }
            let text = candidate.read()?;
            if import_re.is_match(&text) {
                out.push(candidate);
            }
        }
        Ok(out)
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_module(
        &self,
        target: &Resource,
        target_text: &str,
        target_ast: &Ast,
        target_scopes: &ScopeTree,
        name: &str,
        defining_module: &Resource,
        def_binding: &Binding,
        def_scope: ScopeId,
        def_scope_kind: ScopeKind,
        restrict_to_range: Option<(usize, usize)>,
        out: &mut Vec<Occurrence>,
    ) {
        let is_defining_module = target.path() == defining_module.path();
        let range = restrict_to_range.map(|(start, end)| start..end);
        for node in target_ast.identifiers_named(name, range) {
            if let Some(occ) = self.classify_identifier(
                node,
                target,
                target_text,
                target_ast,
                target_scopes,
                name,
                is_defining_module,
                def_binding,
                def_scope,
                def_scope_kind,
            ) {
                out.push(occ);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn classify_identifier(
        &self,
        node: Node,
        target: &Resource,
        _target_text: &str,
        target_ast: &Ast,
        target_scopes: &ScopeTree,
        name: &str,
        is_defining_module: bool,
        def_binding: &Binding,
        def_scope: ScopeId,
        def_scope_kind: ScopeKind,
    ) -> Option<Occurrence> {
        let module_path = target.path().clone();

        // The binding's own defining token.
        if is_defining_module && node.start_byte() == def_binding.offset {
            let kind = match def_binding.kind {
                BindingKind::Import | BindingKind::ImportFromAs => OccurrenceKind::ImportAlias,
                _ => OccurrenceKind::Definition,
            };
            return Some(Occurrence::new(module_path, node.start_byte(), node.end_byte(), kind));
        }

        let parent = node.parent();
        let is_attribute_name = parent
            .map(|p| p.kind() == "attribute" && p.child_by_field_name("attribute") == Some(node))
            .unwrap_or(false);

        if is_attribute_name {
            if def_scope_kind == ScopeKind::Class {
                return Some(Occurrence::new(
                    module_path,
                    node.start_byte(),
                    node.end_byte(),
                    OccurrenceKind::AttributeAccess,
                ));
            }
            return None;
        }

        // A plain Name use: resolve locally in the target module and check
        // it lands back on the same logical binding.
        let use_scope = target_scopes.scope_at_offset(node.start_byte());
        let (found_scope, found_binding) = target_scopes.lookup(use_scope, name)?;

        let resolves_to_origin = if is_defining_module {
            found_scope == def_scope
        } else {
            matches!(
                found_binding.kind,
                BindingKind::Import | BindingKind::ImportFromAs
            ) && target_scopes.get(found_scope).kind == ScopeKind::Module
        };

        if !resolves_to_origin {
            return None;
        }

        let kind = if !is_defining_module && node.start_byte() == found_binding.offset {
            OccurrenceKind::ImportAlias
        } else if is_assignment_target(node) {
            OccurrenceKind::Write
        } else {
            OccurrenceKind::Read
        };

        Some(Occurrence::new(module_path, node.start_byte(), node.end_byte(), kind))
    }
}

fn is_assignment_target(node: Node) -> bool {
    node.parent()
        .map(|p| {
            (p.kind() == "assignment" || p.kind() == "augmented_assignment")
                && p.child_by_field_name("left") == Some(node)
        })
        .unwrap_or(false)
}
