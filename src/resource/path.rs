//! Path arithmetic for resources: slash-separated, relative to the project root.

use std::path::{Path, PathBuf};

/// A project-relative, slash-separated resource path.
///
/// The empty path denotes the project root folder. Paths never carry a
/// leading or trailing slash; components are joined with `/` regardless
/// of host OS path separator conventions, matching the target language's
/// own treatment of module paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourcePath(String);

impl ResourcePath {
    pub fn root() -> Self {
        ResourcePath(String::new())
    }

    pub fn new(path: impl Into<String>) -> Self {
        let raw = path.into();
        let trimmed = raw.trim_matches('/');
        ResourcePath(trimmed.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The final path component ("mod.py" for "pkg/mod.py").
    pub fn name(&self) -> &str {
        match self.0.rsplit_once('/') {
            Some((_, last)) => last,
            None => &self.0,
        }
    }

    /// The parent resource path, or `None` for the root.
    pub fn parent(&self) -> Option<ResourcePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rsplit_once('/') {
            Some((head, _)) => Some(ResourcePath::new(head)),
            None => Some(ResourcePath::root()),
        }
    }

    /// Joins a child name onto this path.
    pub fn child(&self, name: &str) -> ResourcePath {
        if self.is_root() {
            ResourcePath::new(name)
        } else {
            ResourcePath::new(format!("{}/{}", self.0, name))
        }
    }

    /// Resolves this resource path against a project root to a real disk path.
    pub fn to_disk_path(&self, root: &Path) -> PathBuf {
        if self.is_root() {
            root.to_path_buf()
        } else {
            let mut p = root.to_path_buf();
            for part in self.0.split('/') {
                p.push(part);
            }
            p
        }
    }

    /// The dotted module name for a `.py` module path, eliding an `__init__`
    /// segment and stripping the module suffix, per the data model's
    /// definition of a module's logical name.
    pub fn to_module_name(&self) -> String {
        let without_suffix = self.0.strip_suffix(".py").unwrap_or(&self.0);
        let parts: Vec<&str> = without_suffix.split('/').collect();
        let parts: Vec<&str> = if parts.last() == Some(&"__init__") {
            parts[..parts.len() - 1].to_vec()
        } else {
            parts
        };
        parts.join(".")
    }
}

impl std::fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourcePath {
    fn from(value: &str) -> Self {
        ResourcePath::new(value)
    }
}

impl From<String> for ResourcePath {
    fn from(value: String) -> Self {
        ResourcePath::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_and_parent_roundtrip() {
        let root = ResourcePath::root();
        let pkg = root.child("pkg");
        let mod1 = pkg.child("mod1.py");
        assert_eq!(mod1.as_str(), "pkg/mod1.py");
        assert_eq!(mod1.parent(), Some(pkg.clone()));
        assert_eq!(mod1.name(), "mod1.py");
    }

    #[test]
    fn module_name_strips_suffix_and_init() {
        assert_eq!(ResourcePath::new("mod1.py").to_module_name(), "mod1");
        assert_eq!(
            ResourcePath::new("pkg/mod1.py").to_module_name(),
            "pkg.mod1"
        );
        assert_eq!(
            ResourcePath::new("pkg/__init__.py").to_module_name(),
            "pkg"
        );
    }
}
