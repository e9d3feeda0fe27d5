use std::sync::Arc;

use tracing::debug;
use triage_alert::{Alert, AlertRepository};

use crate::cache::ClusterCache;
use crate::engine::cluster_alerts;
use crate::error::ClusterError;
use crate::keywords::{FrequencyExtractor, KeywordExtractor};
use crate::types::{AlertCluster, ClusterQuery, ClusteringSummary, DbscanParams};

/// Page size used when loading unbound alerts for clustering.
pub const UNBOUND_PAGE_SIZE: usize = 1000;

/// Cluster browsing on top of the repository and the result cache.
pub struct ClusterService {
    repo: Arc<dyn AlertRepository>,
    cache: Arc<ClusterCache>,
    extractor: Arc<dyn KeywordExtractor>,
}

impl ClusterService {
    /// Create a service using [FrequencyExtractor] for cluster keywords.
    pub fn new(repo: Arc<dyn AlertRepository>, cache: Arc<ClusterCache>) -> Self {
        Self {
            repo,
            cache,
            extractor: Arc::new(FrequencyExtractor::default()),
        }
    }

    /// Replace the keyword extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn KeywordExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn cache(&self) -> &Arc<ClusterCache> {
        &self.cache
    }

    /// Returns the unfiltered summary for `params`, computing and caching
    /// it on a miss. The population is every unbound alert.
    pub async fn summary(&self, params: &DbscanParams) -> Result<ClusteringSummary, ClusterError> {
        if let Some(s) = self.cache.get(params) {
            return Ok(s);
        }

        let alerts = self.load_unbound().await?;
        let summary = cluster_alerts(&alerts, params, self.extractor.as_ref())?;
        self.cache.set(params, summary.clone());
        Ok(summary)
    }

    /// Returns the clusters for `q.dbscan` narrowed by size and keyword,
    /// one page at a time. `total_count` counts the filtered clusters
    /// before pagination. Noise is returned unfiltered.
    pub async fn get_alert_clusters(&self, q: &ClusterQuery) -> Result<ClusteringSummary, ClusterError> {
        let mut summary = self.summary(&q.dbscan).await?;

        let mut kept: Vec<AlertCluster> = Vec::with_capacity(summary.clusters.len());
        for cluster in std::mem::take(&mut summary.clusters) {
            if cluster.size < q.min_cluster_size {
                continue;
            }
            if !q.keyword.is_empty() && !self.cluster_matches(&cluster, &q.keyword).await? {
                continue;
            }
            kept.push(cluster);
        }

        summary.total_count = kept.len();
        summary.clusters = paginate(kept, q.offset, q.limit);
        Ok(summary)
    }

    /// Returns the members of a cached cluster whose payload contains
    /// `keyword`, one page at a time, with the filtered count before
    /// pagination.
    pub async fn get_cluster_alerts(
        &self,
        cluster_id: &str,
        keyword: &str,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Alert>, usize), ClusterError> {
        let cluster = self
            .cache
            .find_cluster(cluster_id)
            .ok_or_else(|| ClusterError::ClusterNotFound(cluster_id.to_string()))?;

        let alerts = self
            .repo
            .batch_get_alerts(&cluster.alert_ids)
            .await
            .map_err(ClusterError::repo(format!(
                "batch get {} alerts of cluster {cluster_id}",
                cluster.alert_ids.len()
            )))?;

        let filtered: Vec<Alert> = alerts
            .into_iter()
            .filter(|a| a.data_contains(keyword))
            .collect();
        let total = filtered.len();
        Ok((paginate(filtered, offset, limit), total))
    }

    /// Center alert payload or cluster keywords contain `keyword`,
    /// case-insensitively.
    async fn cluster_matches(&self, cluster: &AlertCluster, keyword: &str) -> Result<bool, ClusterError> {
        let center = self
            .repo
            .get_alert(&cluster.center_alert_id)
            .await
            .map_err(ClusterError::repo(format!(
                "get center alert {}",
                cluster.center_alert_id
            )))?
            .ok_or_else(|| ClusterError::AlertNotFound(cluster.center_alert_id.clone()))?;

        if center.data_contains(keyword) {
            return Ok(true);
        }
        let needle = keyword.to_lowercase();
        Ok(cluster
            .keywords
            .iter()
            .any(|k| k.to_lowercase().contains(&needle)))
    }

    async fn load_unbound(&self) -> Result<Vec<Alert>, ClusterError> {
        let mut all = Vec::new();
        let mut offset = 0;
        loop {
            let page = self
                .repo
                .get_alerts_without_ticket(offset, UNBOUND_PAGE_SIZE)
                .await
                .map_err(ClusterError::repo(format!(
                    "get alerts without ticket (offset {offset}, limit {UNBOUND_PAGE_SIZE})"
                )))?;
            let n = page.len();
            all.extend(page.into_iter().filter(|a| a.is_unbound() && a.has_embedding()));
            if n < UNBOUND_PAGE_SIZE {
                break;
            }
            offset += n;
        }
        debug!(alerts = all.len(), "loaded unbound alerts for clustering");
        Ok(all)
    }
}

/// Skip `offset` items and keep at most `limit` (0 means all).
fn paginate<T>(items: Vec<T>, offset: usize, limit: usize) -> Vec<T> {
    let page = items.into_iter().skip(offset);
    if limit == 0 {
        page.collect()
    } else {
        page.take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate() {
        let items: Vec<i32> = (0..5).collect();
        assert_eq!(paginate(items.clone(), 0, 2), vec![0, 1]);
        assert_eq!(paginate(items.clone(), 4, 2), vec![4]);
        assert_eq!(paginate(items.clone(), 5, 2), Vec::<i32>::new());
        assert_eq!(paginate(items.clone(), 9, 2), Vec::<i32>::new());
        assert_eq!(paginate(items.clone(), 1, 0), vec![1, 2, 3, 4]);
    }
}
