//! In-memory alert repository for testing and the command-line driver.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::error::RepoError;
use crate::repository::{AlertRepository, RepoResult};
use crate::types::{sort_stable, Alert};

/// An in-memory alert repository backed by a HashMap.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    alerts: Arc<Mutex<HashMap<String, Alert>>>,
}

impl MemoryRepository {
    /// Create a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository holding the given alerts.
    pub fn with_alerts(alerts: impl IntoIterator<Item = Alert>) -> Self {
        let map = alerts.into_iter().map(|a| (a.id.clone(), a)).collect();
        Self {
            alerts: Arc::new(Mutex::new(map)),
        }
    }

    /// Return the number of stored alerts.
    pub fn len(&self) -> RepoResult<usize> {
        let alerts = self
            .alerts
            .lock()
            .map_err(|e| RepoError::Storage(e.to_string()))?;
        Ok(alerts.len())
    }

    /// Return true if no alerts are stored.
    pub fn is_empty(&self) -> RepoResult<bool> {
        Ok(self.len()? == 0)
    }

    fn snapshot(&self) -> RepoResult<Vec<Alert>> {
        let alerts = self
            .alerts
            .lock()
            .map_err(|e| RepoError::Storage(e.to_string()))?;
        let mut all: Vec<Alert> = alerts.values().cloned().collect();
        sort_stable(&mut all);
        Ok(all)
    }
}

#[async_trait::async_trait]
impl AlertRepository for MemoryRepository {
    async fn get_alerts_by_span(
        &self,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepoResult<Vec<Alert>> {
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|a| a.created_at >= begin && a.created_at <= end)
            .collect())
    }

    async fn get_alerts_without_ticket(&self, offset: usize, limit: usize) -> RepoResult<Vec<Alert>> {
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(Alert::is_unbound)
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn batch_get_alerts(&self, ids: &[String]) -> RepoResult<Vec<Alert>> {
        let alerts = self
            .alerts
            .lock()
            .map_err(|e| RepoError::Storage(e.to_string()))?;
        Ok(ids.iter().filter_map(|id| alerts.get(id).cloned()).collect())
    }

    async fn get_alert(&self, id: &str) -> RepoResult<Option<Alert>> {
        let alerts = self
            .alerts
            .lock()
            .map_err(|e| RepoError::Storage(e.to_string()))?;
        Ok(alerts.get(id).cloned())
    }

    async fn put_alert(&self, alert: &Alert) -> RepoResult<()> {
        let mut alerts = self
            .alerts
            .lock()
            .map_err(|e| RepoError::Storage(e.to_string()))?;
        alerts.insert(alert.id.clone(), alert.clone());
        Ok(())
    }
}
