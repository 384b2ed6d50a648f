//! Reversible changes and composite change sets (§3 Change, §4.E).
//!
//! Every refactoring orchestrator emits a `ChangeSet` rather than mutating
//! the project directly. `do_change`/`undo_change` are symmetric: applying
//! a change set and then applying its `inverse()` restores the project
//! byte-for-byte. Inverses are captured as immutable pre-image payloads at
//! construction time, not as closures over mutable state, so an undo stack
//! entry stays valid even if the in-memory project is dropped and reopened
//! (§9 design note).

use crate::error::{EngineError, Result};
use crate::resource::{Project, ResourcePath};

/// A single reversible mutation, or a labeled, ordered group of them.
#[derive(Debug, Clone)]
pub enum Change {
    /// Replaces a file's full text. Carries both images so the change is
    /// its own inverse material without re-reading disk.
    Content {
        path: ResourcePath,
        old_text: String,
        new_text: String,
    },
    /// Creates a new file with the given initial content.
    CreateFile { path: ResourcePath, content: String },
    /// Creates a new, empty folder.
    CreateFolder { path: ResourcePath },
    /// Moves a resource from `from` to `to` (both full resource paths).
    Move { from: ResourcePath, to: ResourcePath },
    /// Removes a resource, retaining its content for undo.
    /// `children` holds the full recursive pre-image of a removed folder,
    /// empty for a removed file whose own content is `content`.
    Remove {
        path: ResourcePath,
        content: Option<String>,
        children: Vec<(ResourcePath, String)>,
    },
    /// An ordered, named group of changes (§3 Change / ChangeSet).
    Set { label: String, children: Vec<Change> },
}

impl Change {
    pub fn set(label: impl Into<String>, children: Vec<Change>) -> Change {
        Change::Set {
            label: label.into(),
            children,
        }
    }

    /// Applies this change to `project`, returning the next undo-stack
    /// entry (this change's inverse) on success. On failure partway
    /// through a `Set`, already-applied children are unwound in reverse
    /// order before the error is returned, leaving the project untouched.
    pub fn apply(&self, project: &Project) -> Result<Change> {
        match self {
            Change::Content { path, new_text, old_text } => {
                let file = project.get_file(path.clone())?;
                file.write(new_text)?;
                Ok(Change::Content {
                    path: path.clone(),
                    old_text: new_text.clone(),
                    new_text: old_text.clone(),
                })
            }
            Change::CreateFile { path, content } => {
                let parent_path = path.parent().ok_or_else(|| {
                    EngineError::refactoring("cannot create a file at the project root path")
                })?;
                let parent = project.get_folder(parent_path)?;
                let file = parent.create_file(path.name())?;
                file.write(content)?;
                Ok(Change::Remove {
                    path: path.clone(),
                    content: Some(content.clone()),
                    children: Vec::new(),
                })
            }
            Change::CreateFolder { path } => {
                let parent_path = path.parent().ok_or_else(|| {
                    EngineError::refactoring("cannot create a folder at the project root path")
                })?;
                let parent = project.get_folder(parent_path)?;
                parent.create_folder(path.name())?;
                Ok(Change::Remove {
                    path: path.clone(),
                    content: None,
                    children: Vec::new(),
                })
            }
            Change::Move { from, to } => {
                let mut resource = project.get_resource(from.clone())?;
                let dest_parent_path = to.parent().ok_or_else(|| {
                    EngineError::refactoring("cannot move a resource to the project root path")
                })?;
                let dest_parent = project.get_folder(dest_parent_path)?;
                resource.move_to(&dest_parent)?;
                if resource.name() != to.name() {
                    resource.rename_to(to.name())?;
                }
                Ok(Change::Move {
                    from: to.clone(),
                    to: from.clone(),
                })
            }
            Change::Remove { path, content: _, children: _ } => {
                let resource = project.get_resource(path.clone())?;
                let preimage = capture_preimage(project, path)?;
                resource.remove()?;
                Ok(preimage)
            }
            Change::Set { label, children } => {
                let mut applied = Vec::with_capacity(children.len());
                for child in children {
                    match child.apply(project) {
                        Ok(inverse) => applied.push(inverse),
                        Err(e) => {
                            for inverse in applied.into_iter().rev() {
                                let _ = inverse.apply(project);
                            }
                            return Err(e);
                        }
                    }
                }
                applied.reverse();
                Ok(Change::Set {
                    label: format!("undo {label}"),
                    children: applied,
                })
            }
        }
    }
}

/// Captures the pre-image of a resource about to be removed, as a
/// `CreateFile`/`CreateFolder` (or nested `Set` of them) that recreates it.
fn capture_preimage(project: &Project, path: &ResourcePath) -> Result<Change> {
    let resource = project.get_resource(path.clone())?;
    if resource.is_file() {
        Ok(Change::CreateFile {
            path: path.clone(),
            content: resource.read()?,
        })
    } else {
        let mut children = vec![Change::CreateFolder { path: path.clone() }];
        for child in resource.children()? {
            children.push(capture_preimage(project, child.path())?);
        }
        Ok(Change::set(format!("recreate {path}"), children))
    }
}
