//! Density-based clustering of security alerts by embedding similarity.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use triage_cluster::{CacheConfig, ClusterCache, ClusterQuery, ClusterService};
//!
//! let cache = Arc::new(ClusterCache::new(CacheConfig::default()));
//! let _sweeper = cache.start_cleanup();
//! let svc = ClusterService::new(repo, Arc::clone(&cache));
//!
//! let summary = svc.get_alert_clusters(&ClusterQuery::default()).await?;
//! let (alerts, total) = svc
//!     .get_cluster_alerts(&summary.clusters[0].id, "", 20, 0)
//!     .await?;
//!
//! cache.close();
//! ```
//!
//! # Design
//!
//! [`cluster_alerts`] is a pure function of its input. [`ClusterCache`]
//! memoizes summaries per [`DbscanParams`] only, so alerts arriving within a
//! TTL window do not show up until the entry expires or the parameters
//! change. Recomputing on every data change would defeat the cache at
//! realistic alert rates.

mod cache;
mod dbscan;
mod engine;
mod error;
mod keywords;
mod service;
mod types;

pub use cache::{CacheConfig, ClusterCache, DEFAULT_CLEANUP_INTERVAL, DEFAULT_TTL};
pub use engine::cluster_alerts;
pub use error::ClusterError;
pub use keywords::{FrequencyExtractor, KeywordExtractor};
pub use service::{ClusterService, UNBOUND_PAGE_SIZE};
pub use types::{AlertCluster, ClusterQuery, ClusteringSummary, DbscanParams};

#[cfg(test)]
mod tests;
