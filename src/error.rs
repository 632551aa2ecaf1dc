//! Error types for hpcgame

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HpcError {
    #[error("Partition catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Failed to fetch partition catalog: {0}")]
    FetchFailed(String),

    #[error("Failed to write partition cache: {0}")]
    WriteFailed(String),

    #[error("'{0}' uses the reserved default volume format (names containing '-default-pvc')")]
    ReservedName(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to provision {name}: {detail}")]
    ProvisioningFailed { name: String, detail: String },

    #[error("Failed to delete {name}: {detail}")]
    DeletionFailed { name: String, detail: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<serde_json::Error> for HpcError {
    fn from(e: serde_json::Error) -> Self {
        HpcError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for HpcError {
    fn from(e: serde_yaml::Error) -> Self {
        HpcError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HpcError>;
