//! Duplicate detection for newly ingested alerts.
//!
//! A new alert that is nearly identical (cosine similarity >= 0.99) to an
//! unbound alert from the last 24 hours is posted into that alert's chat
//! thread instead of opening a new one.

mod error;
mod matcher;
mod router;

pub use error::DedupError;
pub use matcher::{
    best_match, find_duplicate, Duplicate, DUPLICATE_SIMILARITY_THRESHOLD, DUPLICATE_WINDOW_HOURS,
};
pub use router::{AlertRouter, Routing, ThreadPoster};
