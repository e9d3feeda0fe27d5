use chrono::{DateTime, Utc};

use crate::error::RepoError;
use crate::types::Alert;

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// AlertRepository is the persistence boundary for alerts.
///
/// Implementations must be safe for concurrent use (Send + Sync). Result
/// order is unspecified unless stated otherwise.
#[async_trait::async_trait]
pub trait AlertRepository: Send + Sync {
    /// Return alerts created within `[begin, end]`.
    async fn get_alerts_by_span(
        &self,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepoResult<Vec<Alert>>;

    /// Return one page of alerts that are not bound to a ticket.
    async fn get_alerts_without_ticket(&self, offset: usize, limit: usize) -> RepoResult<Vec<Alert>>;

    /// Return the alerts with the given ids. Unknown ids are skipped.
    async fn batch_get_alerts(&self, ids: &[String]) -> RepoResult<Vec<Alert>>;

    /// Return a single alert by id.
    async fn get_alert(&self, id: &str) -> RepoResult<Option<Alert>>;

    /// Insert or replace an alert.
    async fn put_alert(&self, alert: &Alert) -> RepoResult<()>;
}
