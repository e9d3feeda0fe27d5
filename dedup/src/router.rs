use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use triage_alert::{Alert, AlertRepository, ThreadRef};

use crate::error::DedupError;
use crate::matcher::find_duplicate;

/// ThreadPoster publishes alerts to chat threads.
///
/// Implementations must be safe for concurrent use (Send + Sync).
#[async_trait::async_trait]
pub trait ThreadPoster: Send + Sync {
    /// Post `alert` as a reply in an existing thread.
    async fn post_to_thread(&self, thread: &ThreadRef, alert: &Alert) -> Result<(), DedupError>;

    /// Post `alert` as the root of a new thread and return it.
    async fn create_thread(&self, alert: &Alert) -> Result<ThreadRef, DedupError>;
}

/// Outcome of routing a new alert.
#[derive(Debug, Clone, PartialEq)]
pub enum Routing {
    /// Posted into the thread of an existing duplicate.
    Attached {
        duplicate_of: String,
        thread: ThreadRef,
        similarity: f32,
    },

    /// Posted as a new thread.
    NewThread { thread: ThreadRef },
}

impl Routing {
    pub fn thread(&self) -> &ThreadRef {
        match self {
            Routing::Attached { thread, .. } | Routing::NewThread { thread } => thread,
        }
    }
}

/// Decides where a newly ingested alert is discussed and records the
/// thread on the alert.
pub struct AlertRouter {
    repo: Arc<dyn AlertRepository>,
    poster: Arc<dyn ThreadPoster>,
}

impl AlertRouter {
    pub fn new(repo: Arc<dyn AlertRepository>, poster: Arc<dyn ThreadPoster>) -> Self {
        Self { repo, poster }
    }

    /// Route `alert`: reuse the thread of a duplicate when it has one,
    /// otherwise open a new thread. The chosen thread is stored on the
    /// alert and the alert is saved.
    pub async fn route(&self, alert: &mut Alert, now: DateTime<Utc>) -> Result<Routing, DedupError> {
        let duplicate = find_duplicate(self.repo.as_ref(), alert, now).await?;

        let attach = duplicate.and_then(|dup| {
            let thread = dup.alert.thread.clone()?;
            Some((dup, thread))
        });

        let routing = match attach {
            Some((dup, thread)) => {
                self.poster.post_to_thread(&thread, alert).await?;
                info!(
                    alert = %alert.id,
                    duplicate_of = %dup.alert.id,
                    similarity = dup.similarity,
                    "alert attached to existing thread"
                );
                Routing::Attached {
                    duplicate_of: dup.alert.id,
                    thread,
                    similarity: dup.similarity,
                }
            }
            None => {
                let thread = self.poster.create_thread(alert).await?;
                info!(alert = %alert.id, "alert posted to new thread");
                Routing::NewThread { thread }
            }
        };

        alert.thread = Some(routing.thread().clone());
        self.repo
            .put_alert(alert)
            .await
            .map_err(|source| DedupError::Repository {
                op: format!("save alert {}", alert.id),
                source,
            })?;
        Ok(routing)
    }
}
