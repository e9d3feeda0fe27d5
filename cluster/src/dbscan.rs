use std::collections::VecDeque;

use triage_vecsim::cosine_distance;

pub(crate) const NOISE: i32 = -1;
const UNDEFINED: i32 = 0;

/// Runs the DBSCAN clustering algorithm using cosine distance.
///
/// # Parameters
/// - `vectors`: the data points
/// - `eps`: maximum cosine distance (1 - cosine_similarity) for neighbors
/// - `min_pts`: minimum neighborhood size, the point itself included
///
/// # Returns
/// Cluster labels for each vector. Label -1 means noise (unassigned).
/// Positive labels (1, 2, ...) identify clusters in order of discovery.
/// Every returned cluster has at least `min_pts` members; a core point whose
/// border was claimed by an earlier cluster is reported as noise.
pub(crate) fn dbscan(vectors: &[&[f32]], eps: f32, min_pts: usize) -> Vec<i32> {
    let n = vectors.len();
    if n == 0 {
        return Vec::new();
    }

    let mut labels = vec![UNDEFINED; n];
    let mut next: i32 = 0;

    for i in 0..n {
        if labels[i] != UNDEFINED {
            continue;
        }

        let neighbors = range_query(vectors, i, eps);
        if neighbors.len() < min_pts {
            labels[i] = NOISE;
            continue;
        }

        next += 1;
        labels[i] = next;
        expand(vectors, eps, min_pts, &mut labels, next, neighbors);
    }

    drop_undersized(&mut labels, next, min_pts);
    labels
}

/// Grows cluster `label` from the neighborhood of a core point. Only
/// unclaimed points enter the queue; noise points become border members and
/// are not expanded.
fn expand(
    vectors: &[&[f32]],
    eps: f32,
    min_pts: usize,
    labels: &mut [i32],
    label: i32,
    seeds: Vec<usize>,
) {
    let claimable = |l: i32| l == UNDEFINED || l == NOISE;
    let mut queue: VecDeque<usize> = seeds
        .into_iter()
        .filter(|&j| claimable(labels[j]))
        .collect();

    while let Some(q) = queue.pop_front() {
        match labels[q] {
            NOISE => labels[q] = label,
            UNDEFINED => {
                labels[q] = label;
                let reach = range_query(vectors, q, eps);
                if reach.len() >= min_pts {
                    queue.extend(reach.into_iter().filter(|&j| claimable(labels[j])));
                }
            }
            // Queued twice before being claimed.
            _ => {}
        }
    }
}

/// Turns clusters with fewer than `min_pts` members into noise and
/// renumbers the survivors 1, 2, ... in discovery order.
fn drop_undersized(labels: &mut [i32], max_label: i32, min_pts: usize) {
    let mut sizes = vec![0usize; max_label as usize + 1];
    for &l in labels.iter().filter(|&&l| l > 0) {
        sizes[l as usize] += 1;
    }

    let mut remap = vec![NOISE; max_label as usize + 1];
    let mut kept = 0;
    for (l, &size) in sizes.iter().enumerate().skip(1) {
        if size >= min_pts {
            kept += 1;
            remap[l] = kept;
        }
    }

    for l in labels.iter_mut().filter(|l| **l > 0) {
        *l = remap[*l as usize];
    }
}

/// Returns indices of all vectors within eps cosine distance of vectors[idx].
/// The point itself is always part of its own neighborhood.
fn range_query(vectors: &[&[f32]], idx: usize, eps: f32) -> Vec<usize> {
    let q = vectors[idx];
    vectors
        .iter()
        .enumerate()
        .filter(|(i, v)| *i == idx || cosine_distance(q, v) <= eps)
        .map(|(i, _)| i)
        .collect()
}
