//! Error types for the refactoring engine.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the refactoring engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The requested refactoring is inapplicable: wrong selection kind,
    /// unresolved name, name collision, non-global move, and so on.
    #[error("refactoring error: {0}")]
    Refactoring(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(PathBuf),

    #[error("resource already exists: {0}")]
    ResourceExists(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("tree-sitter query error: {0}")]
    Query(#[from] tree_sitter::QueryError),

    #[error("object-db error: {0}")]
    Json(#[from] serde_json::Error),

    /// A committed change's `do` failed partway through a change set;
    /// the already-applied prefix has been unwound.
    #[error("change failed: {0}")]
    ChangeFailed(String),

    /// Cooperative cancellation requested by the caller.
    #[error("operation cancelled")]
    Cancelled,
}

impl EngineError {
    pub fn refactoring(message: impl Into<String>) -> Self {
        EngineError::Refactoring(message.into())
    }
}

/// A specialized Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
