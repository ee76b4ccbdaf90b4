use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Output location {} is inside protected directory {}", .path.display(), .root.display())]
    UnsafeOutputLocation { path: PathBuf, root: PathBuf },

    #[error("API specification file not found: {}", .0.display())]
    SpecFileNotFound(PathBuf),

    #[error("Planning failed: {0}")]
    Planning(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] db::DbError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrchestratorError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    /// Errors raised before any store write.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::UnsafeOutputLocation { .. } | Self::SpecFileNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
