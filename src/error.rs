//! Error types for the scaffolding tool

use std::path::PathBuf;

use thiserror::Error;

/// Result type for expmvc operations
pub type Result<T> = std::result::Result<T, ExpmvcError>;

/// Scaffolding, patching and dependency errors
#[derive(Error, Debug)]
pub enum ExpmvcError {
    #[error("Entity not found: {entity} (expected {path:?}){}", suggestion_suffix(.suggestion))]
    EntityNotFound {
        entity: String,
        path: PathBuf,
        suggestion: Option<String>,
    },

    #[error("Cannot patch {entity} at {path:?}: {marker:?} marker not found (was the model edited by hand?)")]
    PatchTargetNotFound {
        entity: String,
        path: PathBuf,
        marker: String,
    },

    #[error("Marker not found: {marker:?}")]
    MarkerNotFound { marker: String },

    #[error("Install failed ({status}), run manually: {command}")]
    InstallFailure { command: String, status: String },

    #[error("Manifest unreadable at {path:?}: {reason}")]
    ManifestUnreadable { path: PathBuf, reason: String },

    #[error("Duplicate field {field:?} in entity {entity}")]
    DuplicateField { entity: String, field: String },

    #[error("Invalid relationship kind: {0} (expected belongsTo, hasMany or belongsToMany)")]
    InvalidRelationshipKind(String),

    #[error("Invalid field kind {kind:?} for field {field:?}")]
    InvalidFieldKind { field: String, kind: String },

    #[error("Unknown generator: {0} (use model, controller, route, service, validation, view or scaffold)")]
    UnknownGenerator(String),

    #[error("Already exists: {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(", did you mean {}?", name),
        None => String::new(),
    }
}
