use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    /// The requested transition is not legal in the current phase.
    #[error("{0}")]
    Conflict(String),

    /// The external scan command could not be spawned.
    #[error("Failed to launch scan command: {0}")]
    Launch(#[source] std::io::Error),

    #[error("Invalid scan name: {0}")]
    InvalidScanName(String),

    #[error("Scan not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Unexpected(#[from] std::io::Error),
}

impl ScanError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
