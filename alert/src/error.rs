use thiserror::Error;

/// Errors returned by alert repositories.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("alert: not found: {0}")]
    NotFound(String),

    #[error("alert: storage error: {0}")]
    Storage(String),

    #[error("alert: serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RepoError {
    fn from(e: serde_json::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}
