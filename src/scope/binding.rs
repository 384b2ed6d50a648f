//! Scope and binding data types (§3 Scope, §4.C binding-site policy).

/// How a name came to be bound in a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Parameter,
    LocalAssignment,
    ClassBody,
    FunctionDef,
    ClassDef,
    Import,
    ImportFromAs,
}

/// A binding site: the defining statement kind and its source offset.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    /// Offset of the defining name token (not the whole statement).
    pub offset: usize,
}

/// A unique identifier for a scope within a module's scope tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Class,
    Function,
}

/// A node in the scope tree rooted at the module scope (§3 Scope).
#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Byte range this scope's defining node covers.
    pub start_byte: usize,
    pub end_byte: usize,
    pub local_bindings: std::collections::HashMap<String, Binding>,
    /// The spelling of the first formal parameter, if this is a method
    /// scope (a function scope whose parent is a class scope). Detected
    /// by position, not by the spelling `self` (§4.C edge-case policy).
    pub self_param: Option<String>,
    /// Names declared `global`/`nonlocal` anywhere in this function body:
    /// assignments to these names do not create a local binding here, so
    /// lookup falls through to the enclosing scope that already binds
    /// them (§4.C edge-case policy).
    pub redirected_names: std::collections::HashSet<String>,
}

impl Scope {
    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start_byte <= offset && offset <= self.end_byte
    }

    pub fn is_method(&self) -> bool {
        self.kind == ScopeKind::Function && self.self_param.is_some()
    }
}
