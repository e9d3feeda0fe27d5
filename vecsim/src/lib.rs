//! Similarity primitives over fixed-length `f32` embedding vectors.
//!
//! Degenerate inputs (mismatched lengths, all-zero vectors) are expected
//! states for alerts whose embedding has not been computed yet, so the
//! similarity functions return neutral values instead of failing.

pub mod average;
pub mod cosine;
pub mod error;

pub use average::weighted_average;
pub use cosine::{cosine_distance, cosine_similarity};
pub use error::VecError;
