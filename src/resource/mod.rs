//! Abstract file/folder tree: read/write/create/move/delete plus path
//! arithmetic, backed directly by the host filesystem so every mutation
//! is synchronous and visible immediately (§4.A).

mod path;

pub use path::ResourcePath;

use crate::error::{EngineError, Result};
use std::fs;
use std::path::PathBuf;

/// The kind of a resource node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    File,
    Folder,
}

/// A node in the project tree: a file or a folder.
///
/// Invariant: paths are unique within a project; a folder and a file
/// cannot share a path (enforced by the host filesystem itself).
#[derive(Debug, Clone)]
pub struct Resource {
    root: PathBuf,
    path: ResourcePath,
    kind: ResourceKind,
}

impl Resource {
    fn new(root: PathBuf, path: ResourcePath, kind: ResourceKind) -> Self {
        Self { root, path, kind }
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.kind == ResourceKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind == ResourceKind::Folder
    }

    pub fn real_path(&self) -> PathBuf {
        self.path.to_disk_path(&self.root)
    }

    pub fn exists(&self) -> bool {
        self.real_path().exists()
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Reads the full text content of a file resource.
    pub fn read(&self) -> Result<String> {
        debug_assert!(self.is_file());
        if !self.exists() {
            return Err(EngineError::ResourceNotFound(self.path.as_str().into()));
        }
        Ok(fs::read_to_string(self.real_path())?)
    }

    /// Replaces the full text content of a file resource.
    pub fn write(&self, text: &str) -> Result<()> {
        debug_assert!(self.is_file());
        if let Some(parent) = self.real_path().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(self.real_path(), text)?;
        Ok(())
    }

    /// Creates a child file under a folder resource.
    pub fn create_file(&self, name: &str) -> Result<Resource> {
        debug_assert!(self.is_folder());
        let child_path = self.path.child(name);
        let disk = child_path.to_disk_path(&self.root);
        if disk.exists() {
            return Err(EngineError::ResourceExists(child_path.as_str().into()));
        }
        if let Some(parent) = disk.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&disk, "")?;
        Ok(Resource::new(self.root.clone(), child_path, ResourceKind::File))
    }

    /// Creates a child folder under a folder resource.
    pub fn create_folder(&self, name: &str) -> Result<Resource> {
        debug_assert!(self.is_folder());
        let child_path = self.path.child(name);
        let disk = child_path.to_disk_path(&self.root);
        if disk.exists() {
            return Err(EngineError::ResourceExists(child_path.as_str().into()));
        }
        fs::create_dir_all(&disk)?;
        Ok(Resource::new(self.root.clone(), child_path, ResourceKind::Folder))
    }

    /// Returns whether a folder resource has a direct child of the given name.
    pub fn has_child(&self, name: &str) -> bool {
        debug_assert!(self.is_folder());
        self.path.child(name).to_disk_path(&self.root).exists()
    }

    /// Returns a direct child resource, erroring if it does not exist.
    pub fn get_child(&self, name: &str) -> Result<Resource> {
        debug_assert!(self.is_folder());
        let child_path = self.path.child(name);
        let disk = child_path.to_disk_path(&self.root);
        if !disk.exists() {
            return Err(EngineError::ResourceNotFound(child_path.as_str().into()));
        }
        let kind = if disk.is_dir() {
            ResourceKind::Folder
        } else {
            ResourceKind::File
        };
        Ok(Resource::new(self.root.clone(), child_path, kind))
    }

    /// Lists the direct children of a folder resource.
    pub fn children(&self) -> Result<Vec<Resource>> {
        debug_assert!(self.is_folder());
        let disk = self.real_path();
        let mut out = Vec::new();
        if !disk.exists() {
            return Ok(out);
        }
        for entry in fs::read_dir(disk)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let kind = if entry.path().is_dir() {
                ResourceKind::Folder
            } else {
                ResourceKind::File
            };
            out.push(Resource::new(
                self.root.clone(),
                self.path.child(&name),
                kind,
            ));
        }
        out.sort_by(|a, b| a.path.as_str().cmp(b.path.as_str()));
        Ok(out)
    }

    /// Moves this resource to become a child of `new_parent`, keeping its name.
    pub fn move_to(&mut self, new_parent: &Resource) -> Result<()> {
        debug_assert!(new_parent.is_folder());
        let dest_path = new_parent.path.child(self.path.name());
        let dest_disk = dest_path.to_disk_path(&self.root);
        if dest_disk.exists() {
            return Err(EngineError::ResourceExists(dest_path.as_str().into()));
        }
        if let Some(parent) = dest_disk.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(self.real_path(), &dest_disk)?;
        self.path = dest_path;
        Ok(())
    }

    /// Renames this resource in place (same parent, new name).
    pub fn rename_to(&mut self, new_name: &str) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| EngineError::refactoring("cannot rename the project root"))?;
        let dest_path = parent.child(new_name);
        let dest_disk = dest_path.to_disk_path(&self.root);
        if dest_disk.exists() {
            return Err(EngineError::ResourceExists(dest_path.as_str().into()));
        }
        fs::rename(self.real_path(), &dest_disk)?;
        self.path = dest_path;
        Ok(())
    }

    /// Removes this resource (file or folder, recursively).
    pub fn remove(&self) -> Result<()> {
        let disk = self.real_path();
        if !disk.exists() {
            return Err(EngineError::ResourceNotFound(self.path.as_str().into()));
        }
        if disk.is_dir() {
            fs::remove_dir_all(disk)?;
        } else {
            fs::remove_file(disk)?;
        }
        Ok(())
    }
}

/// A project workspace: owns a root folder and a metadata folder used
/// for cached databases (§3 Project).
pub struct Project {
    root: PathBuf,
    metadata_folder_name: String,
}

impl Project {
    /// Opens (creating if necessary) a project rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            metadata_folder_name: ".ropeproject".to_string(),
        })
    }

    /// Opens a project with a custom metadata folder name.
    pub fn with_metadata_folder(root: impl Into<PathBuf>, name: impl Into<String>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            metadata_folder_name: name.into(),
        })
    }

    pub fn root_path(&self) -> &PathBuf {
        &self.root
    }

    pub fn get_root_folder(&self) -> Resource {
        Resource::new(self.root.clone(), ResourcePath::root(), ResourceKind::Folder)
    }

    /// The project's distinguished metadata folder, created on first use.
    pub fn metadata_folder(&self) -> Result<Resource> {
        let root_folder = self.get_root_folder();
        if root_folder.has_child(&self.metadata_folder_name) {
            root_folder.get_child(&self.metadata_folder_name)
        } else {
            root_folder.create_folder(&self.metadata_folder_name)
        }
    }

    pub fn get_resource(&self, path: impl Into<ResourcePath>) -> Result<Resource> {
        let path = path.into();
        let disk = path.to_disk_path(&self.root);
        if !disk.exists() {
            return Err(EngineError::ResourceNotFound(path.as_str().into()));
        }
        let kind = if disk.is_dir() {
            ResourceKind::Folder
        } else {
            ResourceKind::File
        };
        Ok(Resource::new(self.root.clone(), path, kind))
    }

    pub fn get_file(&self, path: impl Into<ResourcePath>) -> Result<Resource> {
        let resource = self.get_resource(path)?;
        if !resource.is_file() {
            return Err(EngineError::refactoring(format!(
                "{} is not a file",
                resource.path()
            )));
        }
        Ok(resource)
    }

    pub fn get_folder(&self, path: impl Into<ResourcePath>) -> Result<Resource> {
        let resource = self.get_resource(path)?;
        if !resource.is_folder() {
            return Err(EngineError::refactoring(format!(
                "{} is not a folder",
                resource.path()
            )));
        }
        Ok(resource)
    }

    /// Walks every file resource under the root whose path ends in `.py`,
    /// in deterministic order. Used by the resolver to build reachability
    /// sets and scan for occurrences.
    pub fn all_modules(&self) -> Result<Vec<Resource>> {
        let mut out = Vec::new();
        let walker = walkdir::WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.file_name()
                    .to_str()
                    .map(|n| n != self.metadata_folder_name)
                    .unwrap_or(true)
            });
        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.file_name().to_string_lossy().ends_with(".py") {
                let rel = entry
                    .path()
                    .strip_prefix(&self.root)
                    .unwrap_or(entry.path())
                    .to_string_lossy()
                    .replace(std::path::MAIN_SEPARATOR, "/");
                out.push(Resource::new(self.root.clone(), ResourcePath::new(rel), ResourceKind::File));
            }
        }
        out.sort_by(|a, b| a.path().as_str().cmp(b.path().as_str()));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_read_write_file() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        let file = root.create_file("mod.py").unwrap();
        file.write("x = 1\n").unwrap();
        assert_eq!(file.read().unwrap(), "x = 1\n");
    }

    #[test]
    fn create_existing_errors() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        root.create_file("mod.py").unwrap();
        assert!(matches!(
            root.create_file("mod.py"),
            Err(EngineError::ResourceExists(_))
        ));
    }

    #[test]
    fn move_and_remove() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        let folder = root.create_folder("pkg").unwrap();
        let mut file = root.create_file("mod.py").unwrap();
        file.write("x = 1\n").unwrap();
        file.move_to(&folder).unwrap();
        assert_eq!(file.path().as_str(), "pkg/mod.py");
        assert!(!root.has_child("mod.py"));
        assert!(folder.has_child("mod.py"));
        file.remove().unwrap();
        assert!(!folder.has_child("mod.py"));
    }

    #[test]
    fn all_modules_walks_tree() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let root = project.get_root_folder();
        root.create_file("mod1.py").unwrap();
        let pkg = root.create_folder("pkg").unwrap();
        pkg.create_file("mod2.py").unwrap();
        let modules = project.all_modules().unwrap();
        assert_eq!(modules.len(), 2);
    }
}
