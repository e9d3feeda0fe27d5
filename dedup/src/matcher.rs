use chrono::{DateTime, Duration, Utc};
use triage_alert::{sort_stable, Alert, AlertRepository};
use triage_vecsim::cosine_similarity;

use crate::error::DedupError;

/// Minimum cosine similarity for an alert to count as a duplicate.
pub const DUPLICATE_SIMILARITY_THRESHOLD: f32 = 0.99;

/// Length of the trailing window searched for duplicates.
pub const DUPLICATE_WINDOW_HOURS: i64 = 24;

/// An existing alert the new alert duplicates.
#[derive(Debug, Clone)]
pub struct Duplicate {
    pub alert: Alert,
    pub similarity: f32,
}

/// Returns the candidate most similar to `alert` at or above the
/// duplicate threshold.
///
/// Bound candidates, candidates without an embedding and the alert itself
/// are skipped. Candidates are scanned in the given order and only a
/// strictly higher similarity replaces the current best, so the first of
/// equally similar candidates wins.
pub fn best_match<'a>(alert: &Alert, candidates: &'a [Alert]) -> Option<(&'a Alert, f32)> {
    if !alert.has_embedding() {
        return None;
    }

    let mut best: Option<(&Alert, f32)> = None;
    for c in candidates {
        if c.id == alert.id || !c.is_unbound() || !c.has_embedding() {
            continue;
        }
        let sim = cosine_similarity(&alert.embedding, &c.embedding);
        if sim < DUPLICATE_SIMILARITY_THRESHOLD {
            continue;
        }
        if best.is_none_or(|(_, s)| sim > s) {
            best = Some((c, sim));
        }
    }
    best
}

/// Looks for an unbound alert created within the 24 hours before `now`
/// that `alert` duplicates.
///
/// Candidates are ordered by ascending (created_at, id) before matching,
/// so ties resolve to the oldest alert.
pub async fn find_duplicate(
    repo: &dyn AlertRepository,
    alert: &Alert,
    now: DateTime<Utc>,
) -> Result<Option<Duplicate>, DedupError> {
    if !alert.has_embedding() {
        return Ok(None);
    }

    let begin = now - Duration::hours(DUPLICATE_WINDOW_HOURS);
    let mut candidates = repo
        .get_alerts_by_span(begin, now)
        .await
        .map_err(|source| DedupError::Repository {
            op: format!("get alerts by span {begin} .. {now}"),
            source,
        })?;
    sort_stable(&mut candidates);

    Ok(best_match(alert, &candidates).map(|(a, similarity)| Duplicate {
        alert: a.clone(),
        similarity,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use triage_alert::MemoryRepository;

    fn at(hours: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::hours(hours)
    }

    /// 2-d unit vector with the given cosine similarity to [1, 0].
    fn with_similarity(s: f32) -> Vec<f32> {
        vec![s, (1.0 - s * s).sqrt()]
    }

    #[test]
    fn test_threshold() {
        let new = Alert::new("new", at(0), vec![1.0, 0.0]);

        let close = vec![Alert::new("old", at(-1), with_similarity(0.995))];
        let (m, sim) = best_match(&new, &close).unwrap();
        assert_eq!(m.id, "old");
        assert!((sim - 0.995).abs() < 1e-4);

        let far = vec![Alert::new("old", at(-1), with_similarity(0.98))];
        assert!(best_match(&new, &far).is_none());
    }

    #[test]
    fn test_highest_similarity_wins() {
        let new = Alert::new("new", at(0), vec![1.0, 0.0]);
        let candidates = vec![
            Alert::new("a", at(-3), with_similarity(0.991)),
            Alert::new("b", at(-2), with_similarity(0.999)),
            Alert::new("c", at(-1), with_similarity(0.995)),
        ];
        let (m, _) = best_match(&new, &candidates).unwrap();
        assert_eq!(m.id, "b");
    }

    #[test]
    fn test_tie_keeps_first() {
        let new = Alert::new("new", at(0), vec![1.0, 0.0]);
        let candidates = vec![
            Alert::new("first", at(-2), vec![2.0, 0.0]),
            Alert::new("second", at(-1), vec![3.0, 0.0]),
        ];
        let (m, _) = best_match(&new, &candidates).unwrap();
        assert_eq!(m.id, "first");
    }

    #[test]
    fn test_skips_bound_unembedded_and_self() {
        let new = Alert::new("new", at(0), vec![1.0, 0.0]);
        let mut bound = Alert::new("bound", at(-1), vec![1.0, 0.0]);
        bound.ticket_id = Some("T-9".into());
        let candidates = vec![
            bound,
            Alert::new("pending", at(-1), vec![]),
            Alert::new("zero", at(-1), vec![0.0, 0.0]),
            new.clone(),
        ];
        assert!(best_match(&new, &candidates).is_none());
    }

    #[test]
    fn test_new_alert_without_embedding_never_matches() {
        let new = Alert::new("new", at(0), vec![]);
        let candidates = vec![Alert::new("old", at(-1), vec![])];
        assert!(best_match(&new, &candidates).is_none());
    }

    #[tokio::test]
    async fn test_find_duplicate_window() {
        let repo = MemoryRepository::with_alerts(vec![
            Alert::new("too-old", at(-25), vec![1.0, 0.0]),
            Alert::new("recent", at(-23), with_similarity(0.995)),
        ]);
        let new = Alert::new("new", at(0), vec![1.0, 0.0]);

        let dup = find_duplicate(&repo, &new, at(0)).await.unwrap().unwrap();
        assert_eq!(dup.alert.id, "recent");

        // Move "now" forward: "recent" falls out of the window too.
        let none = find_duplicate(&repo, &new, at(24)).await.unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_find_duplicate_tie_prefers_oldest() {
        // Inserted out of order; ties resolve by creation time.
        let repo = MemoryRepository::with_alerts(vec![
            Alert::new("z-newer", at(-1), vec![1.0, 0.0]),
            Alert::new("a-older", at(-5), vec![1.0, 0.0]),
        ]);
        let new = Alert::new("new", at(0), vec![1.0, 0.0]);
        let dup = find_duplicate(&repo, &new, at(0)).await.unwrap().unwrap();
        assert_eq!(dup.alert.id, "a-older");
    }
}
