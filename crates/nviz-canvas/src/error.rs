//! Error types for the 3D canvas bookkeeping layer.

use crate::engine::{ObjectId, ObjectKind};
use std::{fmt, path::PathBuf, time::Duration};
use thiserror::Error;

/// Why the engine refused a vector property push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyFailure {
    /// Engine status `-1`: no object with that id.
    NotFound,
    /// Engine status `-2`: the parameters were rejected.
    InvalidParameters,
}

impl ApplyFailure {
    /// Translates an engine status code; non-negative codes and unknown
    /// negatives are not failures.
    pub fn from_status(status: i32) -> Option<Self> {
        match status {
            -1 => Some(Self::NotFound),
            -2 => Some(Self::InvalidParameters),
            _ => None,
        }
    }
}

impl fmt::Display for ApplyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("vector layer not found"),
            Self::InvalidParameters => f.write_str("unable to set data layer properties"),
        }
    }
}

/// Main error type for canvas operations.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("loading {kind} map <{name}> failed")]
    Load { name: String, kind: ObjectKind },

    #[error("unable to unload {kind} map <{name}>")]
    Unload { name: String, kind: ObjectKind },

    #[error("setting data layer properties failed: {reason} (id = {id})")]
    PropertyApply { id: ObjectId, reason: ApplyFailure },

    #[error("at least one raster map or constant surface required")]
    InsufficientData,

    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error("display engine failed to start: {0}")]
    Startup(String),

    #[error("display engine not ready after {0:?}")]
    StartupTimeout(Duration),

    #[error("unable to save image to {}", .0.display())]
    Save(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for canvas operations.
pub type Result<T> = std::result::Result<T, SceneError>;
