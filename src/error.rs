// Emogo Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmogoError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Store unavailable, write rejected, or schema cannot be brought up to date.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Asset library error: {0}")]
    AssetLibrary(String),

    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    #[error("Sharing is not available on this device")]
    SharingUnavailable,

    #[error("Share failed: {0}")]
    Share(String),

    #[error("{0}")]
    Other(String),
}

impl EmogoError {
    /// Message suitable for showing to the user as-is.
    pub fn user_message(&self) -> String {
        match self {
            EmogoError::SharingUnavailable => self.to_string(),
            other => format!("Failed to export data: {}", other),
        }
    }
}

pub type Result<T> = std::result::Result<T, EmogoError>;
