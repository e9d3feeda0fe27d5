use crate::error::VecError;

/// Return the weighted mean of `vectors`.
///
/// `vectors` and `weights` must have the same non-zero length and the
/// weights must not sum to zero. All vectors are expected to share one
/// dimension; the output takes the dimension of the first vector and
/// shorter vectors contribute zeros beyond their length.
pub fn weighted_average(vectors: &[&[f32]], weights: &[f32]) -> Result<Vec<f32>, VecError> {
    if vectors.is_empty() {
        return Err(VecError::InvalidInput("no vectors".into()));
    }
    if vectors.len() != weights.len() {
        return Err(VecError::InvalidInput(format!(
            "{} vectors, {} weights",
            vectors.len(),
            weights.len()
        )));
    }

    let total: f64 = weights.iter().map(|&w| w as f64).sum();
    if total == 0.0 {
        return Err(VecError::InvalidInput("weights sum to zero".into()));
    }

    let dim = vectors[0].len();
    let mut acc = vec![0.0f64; dim];
    for (v, &w) in vectors.iter().zip(weights.iter()) {
        for (slot, &x) in acc.iter_mut().zip(v.iter()) {
            *slot += x as f64 * w as f64;
        }
    }

    Ok(acc.into_iter().map(|x| (x / total) as f32).collect())
}
