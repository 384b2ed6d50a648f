//! Undo/redo history over applied change sets (§4.F).
//!
//! `done` and `redoable` are plain stacks (last applied on top). Applying
//! a brand new change set clears `redoable`: once history branches, the
//! old future is gone, matching the target language's own undo history
//! model rather than a persistent/branching one.

use crate::change::Change;
use crate::error::Result;
use crate::resource::Project;

pub struct UndoManager {
    done: Vec<Change>,
    redoable: Vec<Change>,
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoManager {
    pub fn new() -> Self {
        Self {
            done: Vec::new(),
            redoable: Vec::new(),
        }
    }

    /// Applies `change` against `project`, pushing its inverse onto the
    /// done stack and discarding any redoable history.
    pub fn apply(&mut self, project: &Project, change: Change) -> Result<()> {
        let inverse = change.apply(project)?;
        self.done.push(inverse);
        self.redoable.clear();
        Ok(())
    }

    /// Undoes the most recently applied change set, moving its inverse
    /// onto the redoable stack.
    pub fn undo(&mut self, project: &Project) -> Result<bool> {
        let Some(inverse) = self.done.pop() else {
            return Ok(false);
        };
        let redo = inverse.apply(project)?;
        self.redoable.push(redo);
        Ok(true)
    }

    /// Re-applies the most recently undone change set.
    pub fn redo(&mut self, project: &Project) -> Result<bool> {
        let Some(change) = self.redoable.pop() else {
            return Ok(false);
        };
        let inverse = change.apply(project)?;
        self.done.push(inverse);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redoable.is_empty()
    }

    pub fn done_count(&self) -> usize {
        self.done.len()
    }
}
