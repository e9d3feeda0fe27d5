use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use triage_alert::{Alert, AlertRepository, MemoryRepository, RepoError, RepoResult};

use crate::{
    AlertCluster, CacheConfig, ClusterCache, ClusterError, ClusterQuery, ClusterService,
    DbscanParams, KeywordExtractor, UNBOUND_PAGE_SIZE,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn alert(id: &str, secs: i64, emb: Vec<f32>, data: serde_json::Value) -> Alert {
    let mut a = Alert::new(id, at(secs), emb);
    a.data = data;
    a
}

fn service(repo: impl AlertRepository + 'static) -> ClusterService {
    ClusterService::new(Arc::new(repo), Arc::new(ClusterCache::new(CacheConfig::default())))
}

/// Three alerts: 1 and 2 nearly identical, 3 orthogonal.
fn three_alerts() -> MemoryRepository {
    MemoryRepository::with_alerts(vec![
        alert("1", 1, vec![1.0, 0.0, 0.0], json!({"rule": "ssh brute force"})),
        alert("2", 2, vec![0.99, 0.01, 0.0], json!({"rule": "ssh brute force"})),
        alert("3", 3, vec![0.0, 1.0, 0.0], json!({"rule": "dns tunnel"})),
    ])
}

fn scenario_params() -> DbscanParams {
    DbscanParams { eps: 0.15, min_samples: 2 }
}

/// Seven groups of well separated alerts with sizes 2..=8 plus a bound
/// alert and one without an embedding, neither of which may be clustered.
fn many_groups() -> MemoryRepository {
    let mut alerts = Vec::new();
    let mut t = 0;
    for g in 0..7usize {
        let size = g + 2;
        for m in 0..size {
            let mut emb = vec![0.0f32; 8];
            emb[g] = 1.0;
            emb[7] = 0.01 * m as f32;
            let owner = if g % 2 == 0 { "payments" } else { "identity" };
            alerts.push(alert(
                &format!("g{g}-m{m}"),
                t,
                emb,
                json!({"group": format!("group-{g}"), "service": owner}),
            ));
            t += 1;
        }
    }

    let mut bound = alert("bound", t, vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], json!({}));
    bound.ticket_id = Some("T-1".into());
    alerts.push(bound);
    alerts.push(alert("pending", t + 1, vec![], json!({"group": "group-0"})));

    MemoryRepository::with_alerts(alerts)
}

fn group_params() -> DbscanParams {
    DbscanParams { eps: 0.05, min_samples: 2 }
}

/// Repository whose every call fails.
struct FailingRepo;

#[async_trait::async_trait]
impl AlertRepository for FailingRepo {
    async fn get_alerts_by_span(&self, _: DateTime<Utc>, _: DateTime<Utc>) -> RepoResult<Vec<Alert>> {
        Err(RepoError::Storage("down".into()))
    }
    async fn get_alerts_without_ticket(&self, _: usize, _: usize) -> RepoResult<Vec<Alert>> {
        Err(RepoError::Storage("down".into()))
    }
    async fn batch_get_alerts(&self, _: &[String]) -> RepoResult<Vec<Alert>> {
        Err(RepoError::Storage("down".into()))
    }
    async fn get_alert(&self, _: &str) -> RepoResult<Option<Alert>> {
        Err(RepoError::Storage("down".into()))
    }
    async fn put_alert(&self, _: &Alert) -> RepoResult<()> {
        Err(RepoError::Storage("down".into()))
    }
}

/// Delegates to a MemoryRepository and counts unbound-alert page loads.
struct CountingRepo {
    inner: MemoryRepository,
    pages: AtomicUsize,
}

#[async_trait::async_trait]
impl AlertRepository for CountingRepo {
    async fn get_alerts_by_span(&self, b: DateTime<Utc>, e: DateTime<Utc>) -> RepoResult<Vec<Alert>> {
        self.inner.get_alerts_by_span(b, e).await
    }
    async fn get_alerts_without_ticket(&self, offset: usize, limit: usize) -> RepoResult<Vec<Alert>> {
        self.pages.fetch_add(1, Ordering::SeqCst);
        self.inner.get_alerts_without_ticket(offset, limit).await
    }
    async fn batch_get_alerts(&self, ids: &[String]) -> RepoResult<Vec<Alert>> {
        self.inner.batch_get_alerts(ids).await
    }
    async fn get_alert(&self, id: &str) -> RepoResult<Option<Alert>> {
        self.inner.get_alert(id).await
    }
    async fn put_alert(&self, alert: &Alert) -> RepoResult<()> {
        self.inner.put_alert(alert).await
    }
}

fn ids(clusters: &[AlertCluster]) -> Vec<String> {
    clusters.iter().map(|c| c.id.clone()).collect()
}

// ---------------------------------------------------------------------------
// End-to-end scenario
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_one_cluster_one_noise() {
    let svc = service(three_alerts());
    let q = ClusterQuery {
        dbscan: scenario_params(),
        ..Default::default()
    };

    let s = svc.get_alert_clusters(&q).await.unwrap();
    assert_eq!(s.clusters.len(), 1);
    assert_eq!(s.total_count, 1);
    let mut members = s.clusters[0].alert_ids.clone();
    members.sort();
    assert_eq!(members, vec!["1", "2"]);
    assert_eq!(s.clusters[0].size, 2);
    assert_eq!(s.noise_alert_ids, vec!["3"]);
}

#[tokio::test]
async fn scenario_min_cluster_size_drops_cluster_keeps_noise() {
    let svc = service(three_alerts());
    let q = ClusterQuery {
        dbscan: scenario_params(),
        min_cluster_size: 3,
        ..Default::default()
    };

    let s = svc.get_alert_clusters(&q).await.unwrap();
    assert!(s.clusters.is_empty());
    assert_eq!(s.total_count, 0);
    assert_eq!(s.noise_alert_ids, vec!["3"]);
}

// ---------------------------------------------------------------------------
// Filtering and pagination
// ---------------------------------------------------------------------------

#[tokio::test]
async fn excludes_bound_and_unembedded_alerts() {
    let svc = service(many_groups());
    let s = svc.summary(&group_params()).await.unwrap();

    let all: BTreeSet<String> = s
        .clusters
        .iter()
        .flat_map(|c| c.alert_ids.iter().cloned())
        .chain(s.noise_alert_ids.iter().cloned())
        .collect();
    assert!(!all.contains("bound"));
    assert!(!all.contains("pending"));
    assert_eq!(s.clusters.len(), 7);
    assert!(s.noise_alert_ids.is_empty());
}

#[tokio::test]
async fn min_cluster_size_filter() {
    let svc = service(many_groups());
    let q = ClusterQuery {
        dbscan: group_params(),
        min_cluster_size: 5,
        ..Default::default()
    };

    let s = svc.get_alert_clusters(&q).await.unwrap();
    // Sizes 5, 6, 7, 8.
    assert_eq!(s.total_count, 4);
    assert!(s.clusters.iter().all(|c| c.size >= 5));
}

#[tokio::test]
async fn pages_cover_filtered_list_exactly_once() {
    let svc = service(many_groups());
    let base = ClusterQuery {
        dbscan: group_params(),
        min_cluster_size: 3,
        ..Default::default()
    };
    let full = svc.get_alert_clusters(&base).await.unwrap();
    assert_eq!(full.total_count, 6);
    assert_eq!(full.clusters.len(), 6);

    let limit = 4;
    let mut seen = Vec::new();
    let mut offset = 0;
    loop {
        let q = ClusterQuery {
            limit,
            offset,
            ..base.clone()
        };
        let page = svc.get_alert_clusters(&q).await.unwrap();
        assert_eq!(page.total_count, 6);
        if page.clusters.is_empty() {
            break;
        }
        assert!(page.clusters.len() <= limit);
        seen.extend(ids(&page.clusters));
        offset += limit;
    }

    assert_eq!(seen, ids(&full.clusters));
}

#[tokio::test]
async fn offset_past_end_is_empty_not_error() {
    let svc = service(many_groups());
    let q = ClusterQuery {
        dbscan: group_params(),
        offset: 100,
        limit: 10,
        ..Default::default()
    };
    let s = svc.get_alert_clusters(&q).await.unwrap();
    assert!(s.clusters.is_empty());
    assert_eq!(s.total_count, 7);
}

#[tokio::test]
async fn keyword_matches_center_data_case_insensitively() {
    let svc = service(many_groups());
    let q = ClusterQuery {
        dbscan: group_params(),
        keyword: "PAYMENTS".into(),
        ..Default::default()
    };

    let s = svc.get_alert_clusters(&q).await.unwrap();
    // Groups 0, 2, 4, 6.
    assert_eq!(s.total_count, 4);
    for c in &s.clusters {
        assert!(c.center_alert_id.starts_with("g0")
            || c.center_alert_id.starts_with("g2")
            || c.center_alert_id.starts_with("g4")
            || c.center_alert_id.starts_with("g6"));
    }
}

#[tokio::test]
async fn keyword_matches_cluster_keywords() {
    struct Fixed;
    impl KeywordExtractor for Fixed {
        fn extract(&self, _: &[&Alert]) -> Vec<String> {
            vec!["Lateral-Movement".into()]
        }
    }

    let svc = service(three_alerts()).with_extractor(Arc::new(Fixed));
    let q = ClusterQuery {
        dbscan: scenario_params(),
        keyword: "lateral".into(),
        ..Default::default()
    };
    let s = svc.get_alert_clusters(&q).await.unwrap();
    assert_eq!(s.total_count, 1);
    assert_eq!(s.clusters[0].keywords, vec!["Lateral-Movement"]);

    let q = ClusterQuery {
        keyword: "exfiltration".into(),
        ..q
    };
    let s = svc.get_alert_clusters(&q).await.unwrap();
    assert_eq!(s.total_count, 0);
}

#[tokio::test]
async fn missing_center_alert_is_an_error() {
    let repo = three_alerts();
    let svc = service(repo.clone());
    let params = scenario_params();
    let s = svc.summary(&params).await.unwrap();
    let center = s.clusters[0].center_alert_id.clone();

    // Served from the cache, but the center alert is gone from storage.
    let empty = MemoryRepository::new();
    let svc = ClusterService::new(Arc::new(empty), Arc::clone(svc.cache()));
    let q = ClusterQuery {
        dbscan: params,
        keyword: "ssh".into(),
        ..Default::default()
    };
    let err = svc.get_alert_clusters(&q).await.unwrap_err();
    match err {
        ClusterError::AlertNotFound(id) => assert_eq!(id, center),
        other => panic!("unexpected error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Caching
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cached_summary_is_stale_by_design() {
    let repo = three_alerts();
    let svc = service(repo.clone());
    let params = scenario_params();
    let first = svc.summary(&params).await.unwrap();

    repo.put_alert(&alert("4", 4, vec![0.0, 0.99, 0.01], json!({}))).await.unwrap();

    let second = svc.summary(&params).await.unwrap();
    assert_eq!(first, second);

    // A different parameter set recomputes and sees the new alert.
    let other = DbscanParams { eps: 0.16, min_samples: 2 };
    let third = svc.summary(&other).await.unwrap();
    assert_eq!(third.clusters.len(), 2);
}

#[tokio::test]
async fn loads_every_unbound_page() {
    let alerts: Vec<Alert> = (0..UNBOUND_PAGE_SIZE + 5)
        .map(|i| alert(&format!("a{i:05}"), i as i64, vec![1.0, 0.0], json!({})))
        .collect();
    let repo = Arc::new(CountingRepo {
        inner: MemoryRepository::with_alerts(alerts),
        pages: AtomicUsize::new(0),
    });
    let cache = Arc::new(ClusterCache::new(CacheConfig::default()));
    let svc = ClusterService::new(repo.clone(), cache);

    let s = svc.summary(&DbscanParams { eps: 0.01, min_samples: 2 }).await.unwrap();
    assert_eq!(repo.pages.load(Ordering::SeqCst), 2);
    assert_eq!(s.clusters.len(), 1);
    assert_eq!(s.clusters[0].size, UNBOUND_PAGE_SIZE + 5);

    svc.summary(&DbscanParams { eps: 0.01, min_samples: 2 }).await.unwrap();
    assert_eq!(repo.pages.load(Ordering::SeqCst), 2, "second call is a cache hit");
}

#[tokio::test]
async fn repository_failure_is_wrapped() {
    let svc = service(FailingRepo);
    let err = svc.summary(&scenario_params()).await.unwrap_err();
    match &err {
        ClusterError::Repository { op, source } => {
            assert!(op.contains("without ticket"), "{op}");
            assert!(matches!(source, RepoError::Storage(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("down"));
}

// ---------------------------------------------------------------------------
// Cluster members
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cluster_alerts_unknown_id() {
    let svc = service(three_alerts());
    let err = svc.get_cluster_alerts("nope", "", 10, 0).await.unwrap_err();
    assert!(matches!(err, ClusterError::ClusterNotFound(ref id) if id == "nope"));
}

#[tokio::test]
async fn cluster_alerts_filter_and_page() {
    let svc = service(many_groups());
    let s = svc.summary(&group_params()).await.unwrap();
    let biggest = s.clusters.iter().max_by_key(|c| c.size).unwrap().clone();
    assert_eq!(biggest.size, 8);

    let (all, total) = svc.get_cluster_alerts(&biggest.id, "", 0, 0).await.unwrap();
    assert_eq!(total, 8);
    assert_eq!(all.len(), 8);
    let got: Vec<String> = all.iter().map(|a| a.id.clone()).collect();
    assert_eq!(got, biggest.alert_ids);

    let (page, total) = svc.get_cluster_alerts(&biggest.id, "Group-6", 3, 6).await.unwrap();
    assert_eq!(total, 8);
    assert_eq!(page.len(), 2);

    let (page, total) = svc.get_cluster_alerts(&biggest.id, "group-6", 3, 8).await.unwrap();
    assert_eq!(total, 8);
    assert!(page.is_empty());

    let (none, total) = svc.get_cluster_alerts(&biggest.id, "group-1", 10, 0).await.unwrap();
    assert_eq!(total, 0);
    assert!(none.is_empty());
}

#[tokio::test]
async fn cluster_alerts_fetch_failure_propagates() {
    let cache = Arc::new(ClusterCache::new(CacheConfig::default()));
    let svc = ClusterService::new(Arc::new(three_alerts()), Arc::clone(&cache));
    let s = svc.summary(&scenario_params()).await.unwrap();

    let broken = ClusterService::new(Arc::new(FailingRepo), cache);
    let err = broken
        .get_cluster_alerts(&s.clusters[0].id, "", 10, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, ClusterError::Repository { .. }));
}
