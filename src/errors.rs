use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to list databases: {0}")]
    Enumeration(String),

    #[error("Dump failed for database {database}: {detail}")]
    Dump { database: String, detail: String },

    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Required tool not found in PATH: {0}")]
    MissingTool(String),

    #[error("Metrics push failed: {0}")]
    MetricsPush(String),
}

impl AppError {
    /// Process exit code for this error kind. Distinct non-zero codes so an
    /// external scheduler can tell failure classes apart.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) => 2,
            AppError::Enumeration(_) => 3,
            AppError::Dump { .. } => 4,
            AppError::Filesystem { .. } => 5,
            AppError::MissingTool(_) => 6,
            AppError::MetricsPush(_) => 1,
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
