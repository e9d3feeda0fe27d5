//! Alert model and repository interface.
//!
//! Alerts are owned by the ingestion pipeline. The similarity and clustering
//! crates only read them through [`AlertRepository`], except for thread
//! routing which records the chat thread an alert was posted to.

pub mod error;
pub mod memory;
pub mod repository;
pub mod types;

pub use error::RepoError;
pub use memory::MemoryRepository;
pub use repository::{AlertRepository, RepoResult};
pub use types::{sort_stable, Alert, ThreadRef};
