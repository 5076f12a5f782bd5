use thiserror::Error;

/// Fatal, process-level failures — §7 bullet 6. Domain outcomes (denials,
/// tool failures, oracle degradation) are never represented here; they are
/// values (`PolicyResult`, `ToolObservation`) produced by the components
/// that own them.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("tool manifest error: {0}")]
    Manifest(String),

    #[error("invalid conversation snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("unknown workspace: {0}")]
    UnknownWorkspace(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl CoreError {
    /// Stable, user-opaque identifier suitable for metrics labels and logs.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Manifest(_) => "manifest_error",
            CoreError::InvalidSnapshot(_) => "invalid_snapshot",
            CoreError::UnknownWorkspace(_) => "unknown_workspace",
            CoreError::Config(_) => "config_error",
            CoreError::Serde(_) => "serde_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
