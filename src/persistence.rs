//! The object-observation sidecar database (§4.H).
//!
//! Mirrors the role of the original `MemoryDB`/`FileInfo`/`ScopeInfo`
//! pickle store: per-module, per-scope call-site observations that help
//! resolve dynamically-typed names the static scope/resolver layers can't
//! pin down on their own (e.g. which concrete type flows into a parameter
//! at a given call site). Serialized as JSON rather than a pickle stream,
//! with an explicit format version so a stale sidecar from an older
//! engine version is discarded and rebuilt instead of misread.

use crate::error::Result;
use crate::resource::Project;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const FORMAT_VERSION: u32 = 1;
const OBJECT_DB_FILE: &str = "objectdb.json";

/// Call-site observations recorded against a single scope (a function body
/// or a module top level).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeInfo {
    /// For each parameter/local name observed, the textual spellings of
    /// values seen flowing into it across calls.
    pub per_name: HashMap<String, Vec<String>>,
    /// For each call expression's textual callee, the argument spellings
    /// observed at that call site.
    pub call_info: HashMap<String, Vec<Vec<String>>>,
}

impl ScopeInfo {
    pub fn record_value(&mut self, name: &str, spelling: impl Into<String>) {
        self.per_name.entry(name.to_string()).or_default().push(spelling.into());
    }

    pub fn record_call(&mut self, callee: impl Into<String>, args: Vec<String>) {
        self.call_info.entry(callee.into()).or_default().push(args);
    }
}

/// Observations for a single module, keyed by a scope path such as
/// `"ClassName.method_name"` or `""` for the module top level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileInfo {
    pub scopes: HashMap<String, ScopeInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OnDisk {
    format_version: u32,
    files: HashMap<String, FileInfo>,
}

/// The project-wide sidecar database, lazily loaded from the project's
/// metadata folder and written back out on `sync`.
pub struct ObjectDb {
    files: HashMap<String, FileInfo>,
    dirty: bool,
}

impl ObjectDb {
    /// Loads the sidecar from `project`'s metadata folder, or starts a
    /// fresh, empty database if none exists yet or the on-disk format
    /// version doesn't match this engine's.
    pub fn open(project: &Project) -> Result<Self> {
        let folder = project.metadata_folder()?;
        if !folder.has_child(OBJECT_DB_FILE) {
            return Ok(Self {
                files: HashMap::new(),
                dirty: false,
            });
        }
        let resource = folder.get_child(OBJECT_DB_FILE)?;
        let text = resource.read()?;
        match serde_json::from_str::<OnDisk>(&text) {
            Ok(on_disk) if on_disk.format_version == FORMAT_VERSION => Ok(Self {
                files: on_disk.files,
                dirty: false,
            }),
            _ => Ok(Self {
                files: HashMap::new(),
                dirty: false,
            }),
        }
    }

    pub fn file(&mut self, module_name: &str) -> &mut FileInfo {
        self.dirty = true;
        self.files.entry(module_name.to_string()).or_default()
    }

    pub fn get_file(&self, module_name: &str) -> Option<&FileInfo> {
        self.files.get(module_name)
    }

    /// Drops all observations for a module, e.g. after it's deleted or
    /// moved in a way that invalidates its recorded call sites.
    pub fn forget(&mut self, module_name: &str) {
        if self.files.remove(module_name).is_some() {
            self.dirty = true;
        }
    }

    /// Writes the database back to the project's metadata folder if it
    /// has pending changes.
    pub fn sync(&mut self, project: &Project) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let folder = project.metadata_folder()?;
        let resource = if folder.has_child(OBJECT_DB_FILE) {
            folder.get_child(OBJECT_DB_FILE)?
        } else {
            folder.create_file(OBJECT_DB_FILE)?
        };
        let on_disk = OnDisk {
            format_version: FORMAT_VERSION,
            files: self.files.clone(),
        };
        resource.write(&serde_json::to_string_pretty(&on_disk)?)?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn records_and_reloads_observations() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();

        {
            let mut db = ObjectDb::open(&project).unwrap();
            db.file("pkg.mod").scopes.entry("a_func".to_string()).or_default().record_value("x", "1");
            db.sync(&project).unwrap();
        }

        let db = ObjectDb::open(&project).unwrap();
        let info = db.get_file("pkg.mod").unwrap();
        let scope = info.scopes.get("a_func").unwrap();
        assert_eq!(scope.per_name.get("x").unwrap(), &vec!["1".to_string()]);
    }

    #[test]
    fn stale_format_version_is_discarded() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path()).unwrap();
        let folder = project.metadata_folder().unwrap();
        let resource = folder.create_file(OBJECT_DB_FILE).unwrap();
        resource
            .write(r#"{"format_version":999,"files":{}}"#)
            .unwrap();

        let db = ObjectDb::open(&project).unwrap();
        assert!(db.get_file("anything").is_none());
    }
}
