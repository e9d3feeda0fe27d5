use thiserror::Error;
use triage_alert::RepoError;

#[derive(Error, Debug)]
pub enum DedupError {
    #[error("dedup: {op}: {source}")]
    Repository {
        op: String,
        #[source]
        source: RepoError,
    },

    #[error("dedup: thread error: {0}")]
    Thread(String),
}
