use thiserror::Error;
use triage_alert::RepoError;

/// Errors returned by clustering operations.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("cluster: invalid params: {0}")]
    InvalidParams(String),

    #[error("cluster: cluster not found: {0}")]
    ClusterNotFound(String),

    #[error("cluster: alert not found: {0}")]
    AlertNotFound(String),

    #[error("cluster: {op}: {source}")]
    Repository {
        op: String,
        #[source]
        source: RepoError,
    },
}

impl ClusterError {
    pub(crate) fn repo(op: impl Into<String>) -> impl FnOnce(RepoError) -> Self {
        let op = op.into();
        move |source| ClusterError::Repository { op, source }
    }
}
