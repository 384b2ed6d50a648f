//! Scope tree construction (§4.C) atop the AST layer.
//!
//! Builds, per module, the nested scope tree (module / class / function)
//! with name bindings, following the edge-case policy in spec §4.C: a name
//! assigned anywhere in a function body (and not imported/parameter-bound)
//! is local for the whole function; a name assigned at module level is
//! module-global; the "self"-like first parameter of a method is detected
//! by position, not by spelling.

mod binding;

pub use binding::{Binding, BindingKind, Scope, ScopeId, ScopeKind};

use crate::ast::Ast;
use tree_sitter::Node;

/// The scope tree for a single module, rooted at the module scope.
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn build(ast: &Ast) -> ScopeTree {
        let root = ast.root();
        let module_scope = Scope {
            id: ScopeId(0),
            kind: ScopeKind::Module,
            parent: None,
            children: Vec::new(),
            start_byte: root.start_byte(),
            end_byte: root.end_byte(),
            local_bindings: std::collections::HashMap::new(),
            self_param: None,
            redirected_names: std::collections::HashSet::new(),
        };
        let mut scopes = vec![module_scope];
        collect_bindings(ast, root, ScopeId(0), &mut scopes);
        ScopeTree { scopes }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn all(&self) -> &[Scope] {
        &self.scopes
    }

    /// The innermost scope whose range contains `offset`.
    pub fn scope_at_offset(&self, offset: usize) -> ScopeId {
        let mut best = ScopeId(0);
        for scope in &self.scopes {
            if scope.contains_offset(offset) && scope.end_byte - scope.start_byte <= {
                let b = self.get(best);
                b.end_byte - b.start_byte
            } {
                best = scope.id;
            }
        }
        best
    }

    /// Walks `scope` and its ancestors looking for `name`, per Scope.lookup
    /// in §4.C. Returns the defining scope and binding.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<(ScopeId, &Binding)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.get(id);
            if let Some(binding) = s.local_bindings.get(name) {
                return Some((id, binding));
            }
            current = s.parent;
        }
        None
    }
}

fn new_scope(
    scopes: &mut Vec<Scope>,
    kind: ScopeKind,
    parent: ScopeId,
    start_byte: usize,
    end_byte: usize,
) -> ScopeId {
    let id = ScopeId(scopes.len());
    scopes.push(Scope {
        id,
        kind,
        parent: Some(parent),
        children: Vec::new(),
        start_byte,
        end_byte,
        local_bindings: std::collections::HashMap::new(),
        self_param: None,
        redirected_names: std::collections::HashSet::new(),
    });
    scopes[parent.0].children.push(id);
    id
}

fn add_binding(scopes: &mut [Scope], scope: ScopeId, name: &str, kind: BindingKind, offset: usize) {
    scopes[scope.0]
        .local_bindings
        .entry(name.to_string())
        .or_insert(Binding {
            name: name.to_string(),
            kind,
            offset,
        });
}

/// Unwraps a possibly-decorated definition to the underlying def node.
fn unwrap_decorated<'a>(node: Node<'a>) -> Node<'a> {
    if node.kind() == "decorated_definition" {
        node.child_by_field_name("definition").unwrap_or(node)
    } else {
        node
    }
}

fn collect_bindings(ast: &Ast, node: Node, scope: ScopeId, scopes: &mut Vec<Scope>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let child = unwrap_decorated(child);
        match child.kind() {
            "function_definition" => handle_function_def(ast, child, scope, scopes),
            "class_definition" => handle_class_def(ast, child, scope, scopes),
            "assignment" => handle_assignment(ast, child, scope, scopes),
            "augmented_assignment" => handle_aug_assignment(ast, child, scope, scopes),
            "import_statement" => handle_import(ast, child, scope, scopes),
            "import_from_statement" => handle_import_from(ast, child, scope, scopes),
            // Names declared global/nonlocal are redirected to an
            // enclosing scope's existing binding; collect_redirected_names
            // already recorded them before the body was walked, so there
            // is nothing further to bind here.
            "global_statement" | "nonlocal_statement" => {}
            _ => collect_bindings(ast, child, scope, scopes),
        }
    }
}

/// Collects every name declared `global`/`nonlocal` directly within
/// `node`'s body, not descending into nested function/class definitions
/// (a global/nonlocal declaration in a nested function applies to that
/// function's own scope, not its enclosing one).
fn collect_redirected_names(ast: &Ast, node: Node, out: &mut std::collections::HashSet<String>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "function_definition" | "class_definition" => {}
            "global_statement" | "nonlocal_statement" => {
                let mut ncursor = child.walk();
                for name_node in child.named_children(&mut ncursor) {
                    if name_node.kind() == "identifier" {
                        out.insert(ast.text(&name_node).to_string());
                    }
                }
            }
            _ => collect_redirected_names(ast, child, out),
        }
    }
}

fn handle_function_def(ast: &Ast, node: Node, scope: ScopeId, scopes: &mut Vec<Scope>) {
    if let Some(name_node) = node.child_by_field_name("name") {
        add_binding(
            scopes,
            scope,
            ast.text(&name_node),
            BindingKind::FunctionDef,
            name_node.start_byte(),
        );
    }

    let body = node.child_by_field_name("body").unwrap_or(node);
    let fn_scope = new_scope(scopes, ScopeKind::Function, scope, node.start_byte(), node.end_byte());

    let is_method = scopes[scope.0].kind == ScopeKind::Class;
    let mut first_param: Option<String> = None;

    if let Some(params) = node.child_by_field_name("parameters") {
        let mut pcursor = params.walk();
        for param in params.children(&mut pcursor) {
            if let Some((name, offset)) = param_name(ast, param) {
                if first_param.is_none() {
                    first_param = Some(name.clone());
                }
                add_binding(scopes, fn_scope, &name, BindingKind::Parameter, offset);
            }
        }
    }

    if is_method {
        scopes[fn_scope.0].self_param = first_param;
    }

    let mut redirected = std::collections::HashSet::new();
    collect_redirected_names(ast, body, &mut redirected);
    scopes[fn_scope.0].redirected_names = redirected;

    collect_bindings(ast, body, fn_scope, scopes);
}

fn handle_class_def(ast: &Ast, node: Node, scope: ScopeId, scopes: &mut Vec<Scope>) {
    if let Some(name_node) = node.child_by_field_name("name") {
        add_binding(
            scopes,
            scope,
            ast.text(&name_node),
            BindingKind::ClassDef,
            name_node.start_byte(),
        );
    }
    let body = node.child_by_field_name("body").unwrap_or(node);
    let class_scope = new_scope(scopes, ScopeKind::Class, scope, node.start_byte(), node.end_byte());
    collect_bindings(ast, body, class_scope, scopes);
}

fn handle_assignment(ast: &Ast, node: Node, scope: ScopeId, scopes: &mut Vec<Scope>) {
    if let Some(left) = node.child_by_field_name("left") {
        let kind = if scopes[scope.0].kind == ScopeKind::Class {
            BindingKind::ClassBody
        } else {
            BindingKind::LocalAssignment
        };
        for (name, offset) in extract_identifier_targets(ast, left) {
            if scopes[scope.0].redirected_names.contains(&name) {
                continue;
            }
            add_binding(scopes, scope, &name, kind, offset);
        }
    }
    // Assignments may themselves contain nested constructs on the right
    // (lambdas aside, out of scope) -- nothing further to recurse into here.
}

fn handle_aug_assignment(ast: &Ast, node: Node, scope: ScopeId, scopes: &mut Vec<Scope>) {
    if let Some(left) = node.child_by_field_name("left") {
        let kind = if scopes[scope.0].kind == ScopeKind::Class {
            BindingKind::ClassBody
        } else {
            BindingKind::LocalAssignment
        };
        for (name, offset) in extract_identifier_targets(ast, left) {
            if scopes[scope.0].redirected_names.contains(&name) {
                continue;
            }
            add_binding(scopes, scope, &name, kind, offset);
        }
    }
}

fn handle_import(ast: &Ast, node: Node, scope: ScopeId, scopes: &mut Vec<Scope>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "dotted_name" => {
                // `import a.b.c` binds the top-level name `a`.
                if let Some(first) = child.child(0) {
                    add_binding(
                        scopes,
                        scope,
                        ast.text(&first),
                        BindingKind::Import,
                        first.start_byte(),
                    );
                } else {
                    add_binding(scopes, scope, ast.text(&child), BindingKind::Import, child.start_byte());
                }
            }
            "aliased_import" => {
                if let Some(alias) = child.child_by_field_name("alias") {
                    add_binding(
                        scopes,
                        scope,
                        ast.text(&alias),
                        BindingKind::Import,
                        alias.start_byte(),
                    );
                }
            }
            _ => {}
        }
    }
}

fn handle_import_from(ast: &Ast, node: Node, scope: ScopeId, scopes: &mut Vec<Scope>) {
    let mut cursor = node.walk();
    let mut seen_import_kw = false;
    for child in node.children(&mut cursor) {
        if child.kind() == "import" {
            seen_import_kw = true;
            continue;
        }
        if !seen_import_kw {
            continue;
        }
        match child.kind() {
            "dotted_name" | "identifier" => {
                add_binding(
                    scopes,
                    scope,
                    ast.text(&child),
                    BindingKind::ImportFromAs,
                    child.start_byte(),
                );
            }
            "aliased_import" => {
                if let Some(alias) = child.child_by_field_name("alias") {
                    add_binding(
                        scopes,
                        scope,
                        ast.text(&alias),
                        BindingKind::ImportFromAs,
                        alias.start_byte(),
                    );
                }
            }
            _ => {}
        }
    }
}

/// Extracts the identifier name and offset of a single parameter node,
/// looking through the `default_parameter`/`typed_parameter`/splat
/// wrapper kinds tree-sitter-python uses.
fn param_name<'a>(ast: &'a Ast, node: Node) -> Option<(String, usize)> {
    match node.kind() {
        "identifier" => Some((ast.text(&node).to_string(), node.start_byte())),
        "typed_parameter" | "default_parameter" | "typed_default_parameter" => {
            let inner = node.child_by_field_name("name").or_else(|| node.child(0))?;
            param_name(ast, inner)
        }
        "list_splat_pattern" | "dictionary_splat_pattern" => {
            let inner = node.named_child(0)?;
            param_name(ast, inner)
        }
        _ => None,
    }
}

/// Recursively collects identifier assignment targets, descending into
/// tuple/list unpacking patterns but skipping attribute and subscript
/// targets (those don't bind a scope name).
fn extract_identifier_targets(ast: &Ast, node: Node) -> Vec<(String, usize)> {
    match node.kind() {
        "identifier" => vec![(ast.text(&node).to_string(), node.start_byte())],
        "pattern_list" | "tuple_pattern" | "list_pattern" => {
            let mut out = Vec::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                out.extend(extract_identifier_targets(ast, child));
            }
            out
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn function_local_assignment_is_function_scoped() {
        let src = "class A(object):\n    def a_func(self):\n        var = 10\n";
        let ast = Ast::parse(src, &PathBuf::from("mod.py")).unwrap();
        let tree = ScopeTree::build(&ast);
        let offset = src.rfind("var").unwrap();
        let fn_scope = tree.scope_at_offset(offset);
        let (def_scope, binding) = tree.lookup(fn_scope, "var").unwrap();
        assert_eq!(def_scope, fn_scope);
        assert_eq!(binding.kind, BindingKind::LocalAssignment);
        assert_ne!(tree.get(fn_scope).kind, ScopeKind::Module);
    }

    #[test]
    fn self_param_detected_by_position_not_spelling() {
        let src = "class A(object):\n    def a_func(myself):\n        var = 10\n";
        let ast = Ast::parse(src, &PathBuf::from("mod.py")).unwrap();
        let tree = ScopeTree::build(&ast);
        let offset = src.rfind("var").unwrap();
        let fn_scope = tree.scope_at_offset(offset);
        assert_eq!(tree.get(fn_scope).self_param.as_deref(), Some("myself"));
    }

    #[test]
    fn global_declared_name_is_not_bound_locally() {
        let src = "count = 0\ndef bump():\n    global count\n    count = count + 1\n";
        let ast = Ast::parse(src, &PathBuf::from("mod.py")).unwrap();
        let tree = ScopeTree::build(&ast);
        let fn_offset = src.rfind("count = count").unwrap();
        let fn_scope = tree.scope_at_offset(fn_offset);
        assert_ne!(tree.get(fn_scope).kind, ScopeKind::Module);
        assert!(!tree.get(fn_scope).local_bindings.contains_key("count"));
        let (def_scope, _) = tree.lookup(fn_scope, "count").unwrap();
        assert_eq!(def_scope, tree.root());
    }

    #[test]
    fn module_level_assignment_is_global() {
        let src = "var = 10\ndef f():\n    b = var\n";
        let ast = Ast::parse(src, &PathBuf::from("mod.py")).unwrap();
        let tree = ScopeTree::build(&ast);
        let module = tree.root();
        assert!(tree.get(module).local_bindings.contains_key("var"));
    }
}
