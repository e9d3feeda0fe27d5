use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::types::{AlertCluster, ClusteringSummary, DbscanParams};

/// Default lifetime of a cached summary.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Default period of the background sweep.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Configures a [ClusterCache].
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Lifetime of an entry. Default: 1 hour.
    pub ttl: Duration,

    /// How often expired entries are swept. Default: 10 minutes.
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

impl CacheConfig {
    fn with_defaults(mut self) -> Self {
        if self.ttl.is_zero() {
            self.ttl = DEFAULT_TTL;
        }
        if self.cleanup_interval.is_zero() {
            self.cleanup_interval = DEFAULT_CLEANUP_INTERVAL;
        }
        self
    }
}

struct Entry {
    summary: ClusteringSummary,
    expires_at: Instant,
}

#[derive(Default)]
struct CacheInner {
    /// Params cache key -> entry.
    entries: HashMap<String, Entry>,

    /// Cluster id -> params cache key of the entry holding it.
    clusters: HashMap<String, String>,
}

impl CacheInner {
    fn remove(&mut self, key: &str) {
        if let Some(old) = self.entries.remove(key) {
            for c in &old.summary.clusters {
                self.clusters.remove(&c.id);
            }
        }
    }
}

/// Process-local cache of clustering summaries keyed by [DbscanParams].
///
/// Safe for concurrent use. Entries are visible only before their expiry;
/// a background task started with [ClusterCache::start_cleanup] sweeps
/// entries nobody reads again.
pub struct ClusterCache {
    inner: RwLock<CacheInner>,
    cfg: CacheConfig,
    cancel: CancellationToken,
}

impl ClusterCache {
    pub fn new(cfg: CacheConfig) -> Self {
        Self {
            inner: RwLock::new(CacheInner::default()),
            cfg: cfg.with_defaults(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.cfg
    }

    /// Returns the cached summary for `params`, or None if absent or
    /// expired. Expired entries are removed.
    pub fn get(&self, params: &DbscanParams) -> Option<ClusteringSummary> {
        let key = params.cache_key();
        let now = Instant::now();

        {
            let inner = self.inner.read();
            match inner.entries.get(&key) {
                None => {
                    debug!(key = %key, "cluster cache miss");
                    return None;
                }
                Some(e) if now < e.expires_at => {
                    debug!(key = %key, "cluster cache hit");
                    return Some(e.summary.clone());
                }
                Some(_) => {}
            }
        }

        // Re-check under the write lock: a concurrent set may have
        // refreshed the entry in between.
        let mut inner = self.inner.write();
        let expired = inner
            .entries
            .get(&key)
            .is_some_and(|e| now >= e.expires_at);
        if expired {
            inner.remove(&key);
            debug!(key = %key, "cluster cache entry expired");
        }
        None
    }

    /// Stores `summary` for `params`, replacing any previous entry.
    pub fn set(&self, params: &DbscanParams, summary: ClusteringSummary) {
        let key = params.cache_key();
        let expires_at = Instant::now() + self.cfg.ttl;

        let mut inner = self.inner.write();
        inner.remove(&key);
        for c in &summary.clusters {
            inner.clusters.insert(c.id.clone(), key.clone());
        }
        inner.entries.insert(key, Entry { summary, expires_at });
    }

    /// Returns the cluster with the given id from any live entry.
    pub fn find_cluster(&self, cluster_id: &str) -> Option<AlertCluster> {
        let now = Instant::now();
        let inner = self.inner.read();
        let key = inner.clusters.get(cluster_id)?;
        let entry = inner.entries.get(key)?;
        if now >= entry.expires_at {
            return None;
        }
        entry
            .summary
            .clusters
            .iter()
            .find(|c| c.id == cluster_id)
            .cloned()
    }

    /// Removes every expired entry. Returns the number removed.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.write();
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| now >= e.expires_at)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            inner.remove(key);
        }
        expired.len()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawns the periodic sweep on the current tokio runtime.
    ///
    /// The task holds only a weak reference; it stops on [ClusterCache::close]
    /// or once the cache is dropped.
    pub fn start_cleanup(self: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let cancel = self.cancel.clone();
        let interval = self.cfg.cleanup_interval;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("cluster cache sweep stopped");
                        return;
                    }
                    _ = tokio::time::sleep(interval) => {
                        let Some(cache) = weak.upgrade() else {
                            return;
                        };
                        let n = cache.evict_expired();
                        if n > 0 {
                            debug!(evicted = n, "cluster cache sweep");
                        }
                    }
                }
            }
        })
    }

    /// Stops the background sweep.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ClusterCache {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
