use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MultiToolError {
    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("action already registered: {0}")]
    DuplicateAction(String),

    #[error("action '{0}' requires admin privileges")]
    PermissionDenied(String),

    #[error("action '{0}' does not support dry-run")]
    DryRunUnsupported(String),

    #[error("missing required param '{param}' for action '{action}'")]
    MissingParameter { action: String, param: String },

    #[error("invalid param '{0}': expected key=value")]
    InvalidParam(String),

    #[error("action '{action}' depends on unregistered action '{dependency}'")]
    MissingDependency { action: String, dependency: String },

    #[error("dependency cycle among actions: {}", .0.join(", "))]
    CyclicDependency(Vec<String>),

    #[error(
        "timed out after {}s waiting for lock {}{}",
        .timeout.as_secs_f64(),
        .path.display(),
        .holder.as_deref().map(|h| format!(" (held by {h})")).unwrap_or_default()
    )]
    LockTimeout {
        path: PathBuf,
        timeout: Duration,
        holder: Option<String>,
    },

    /// Error returned by an action handler, carried through unchanged.
    #[error(transparent)]
    Action(anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MultiToolError>;
