use chrono::Utc;
use tracing::debug;
use triage_alert::{sort_stable, Alert};
use triage_vecsim::cosine_similarity;

use crate::dbscan::dbscan;
use crate::error::ClusterError;
use crate::keywords::KeywordExtractor;
use crate::types::{AlertCluster, ClusteringSummary, DbscanParams};

/// Partition alerts into density-based clusters and noise.
///
/// Alerts without a usable embedding (empty or all-zero) are dropped
/// before clustering and appear neither in clusters nor in noise. The
/// rest is processed in ascending (created_at, id) order, so membership
/// and centers are stable for a given input. Cluster ids are freshly
/// generated on every run.
pub fn cluster_alerts(
    alerts: &[Alert],
    params: &DbscanParams,
    extractor: &dyn KeywordExtractor,
) -> Result<ClusteringSummary, ClusterError> {
    validate(params)?;

    let mut points: Vec<Alert> = alerts
        .iter()
        .filter(|a| is_usable(&a.embedding))
        .cloned()
        .collect();
    sort_stable(&mut points);

    let vectors: Vec<&[f32]> = points.iter().map(|a| a.embedding.as_slice()).collect();
    let labels = dbscan(&vectors, params.eps, params.min_samples);

    let max_label = labels.iter().copied().filter(|&l| l > 0).max().unwrap_or(0);

    let mut clusters = Vec::with_capacity(max_label as usize);
    for c in 1..=max_label {
        let members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == c)
            .map(|(i, _)| i)
            .collect();

        let center = medoid(&vectors, &members);
        let member_alerts: Vec<&Alert> = members.iter().map(|&i| &points[i]).collect();

        clusters.push(AlertCluster {
            id: uuid::Uuid::new_v4().to_string(),
            center_alert_id: points[center].id.clone(),
            alert_ids: member_alerts.iter().map(|a| a.id.clone()).collect(),
            size: members.len(),
            keywords: extractor.extract(&member_alerts),
        });
    }

    let noise_alert_ids: Vec<String> = labels
        .iter()
        .enumerate()
        .filter(|(_, l)| **l <= 0)
        .map(|(i, _)| points[i].id.clone())
        .collect();

    debug!(
        alerts = points.len(),
        clusters = clusters.len(),
        noise = noise_alert_ids.len(),
        eps = params.eps,
        min_samples = params.min_samples,
        "clustered alerts"
    );

    Ok(ClusteringSummary {
        total_count: clusters.len(),
        clusters,
        noise_alert_ids,
        parameters: *params,
        computed_at: Utc::now(),
    })
}

fn validate(params: &DbscanParams) -> Result<(), ClusterError> {
    if !params.eps.is_finite() || params.eps < 0.0 {
        return Err(ClusterError::InvalidParams(format!(
            "eps must be a non-negative number, got {}",
            params.eps
        )));
    }
    if params.min_samples == 0 {
        return Err(ClusterError::InvalidParams("min_samples must be positive".into()));
    }
    Ok(())
}

fn is_usable(embedding: &[f32]) -> bool {
    embedding.iter().any(|&x| x != 0.0)
}

/// Index (into `vectors`) of the member with the highest mean similarity to
/// the other members. The first member wins ties.
fn medoid(vectors: &[&[f32]], members: &[usize]) -> usize {
    if members.len() == 1 {
        return members[0];
    }

    let mut best = members[0];
    let mut best_score = f64::NEG_INFINITY;
    for &i in members {
        let total: f64 = members
            .iter()
            .filter(|&&j| j != i)
            .map(|&j| cosine_similarity(vectors[i], vectors[j]) as f64)
            .sum();
        let score = total / (members.len() - 1) as f64;
        if score > best_score {
            best_score = score;
            best = i;
        }
    }
    best
}
