use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TotpError {
    #[error("Invalid secret: {0}")]
    InvalidSecret(String),
    #[error("Invalid site name: {0}")]
    InvalidName(String),
    #[error("Site already exists: {0}")]
    DuplicateName(String),
    #[error("Site not found: {0}")]
    NotFound(String),
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to save sites: {0}")]
    PersistFailure(String),
    #[error("Secret backend unavailable: {0}")]
    BackendUnavailable(String),
}

pub type Result<T, E = TotpError> = std::result::Result<T, E>;
