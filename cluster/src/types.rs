use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// DBSCAN parameters over cosine distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DbscanParams {
    /// Maximum cosine distance (1 - cosine similarity) between neighbors.
    pub eps: f32,

    /// Minimum neighborhood size, the point itself included, for a core
    /// point. Also the minimum size of any cluster.
    pub min_samples: usize,
}

impl Default for DbscanParams {
    fn default() -> Self {
        Self {
            eps: 0.15,
            min_samples: 2,
        }
    }
}

impl DbscanParams {
    /// Serialized form used as the cache key. Parameter sets are equal for
    /// caching purposes iff their keys are equal.
    pub fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

/// A group of mutually similar alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCluster {
    /// Generated identifier, unique per clustering run.
    pub id: String,

    /// Medoid of the cluster: the member most similar to all others.
    pub center_alert_id: String,

    /// Members in ascending (created_at, id) order.
    pub alert_ids: Vec<String>,

    /// Always equals `alert_ids.len()`.
    pub size: usize,

    /// Representative terms from the members' payloads.
    pub keywords: Vec<String>,
}

/// Result of a clustering run, optionally narrowed by a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringSummary {
    pub clusters: Vec<AlertCluster>,
    pub noise_alert_ids: Vec<String>,
    pub parameters: DbscanParams,
    pub computed_at: DateTime<Utc>,

    /// Cluster count after filtering and before pagination.
    pub total_count: usize,
}

/// ClusterQuery narrows a clustering summary for browsing.
#[derive(Debug, Clone, Default)]
pub struct ClusterQuery {
    /// Drop clusters smaller than this. 0 keeps everything.
    pub min_cluster_size: usize,

    /// Page size. 0 means no limit.
    pub limit: usize,

    /// Number of filtered clusters to skip.
    pub offset: usize,

    /// Case-insensitive keyword. Empty disables keyword filtering.
    pub keyword: String,

    pub dbscan: DbscanParams,
}
