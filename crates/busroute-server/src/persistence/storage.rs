//! Transactional storage seam used by the batch committer.

use async_trait::async_trait;
use busroute_core::{StopCandidate, SuggestedRoute};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Opens write transactions.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StorageTransaction>, StorageError>;
}

/// One open transaction. Dropping it without `commit` discards its writes.
#[async_trait]
pub trait StorageTransaction: Send {
    /// Persist the route header and return its generated id.
    async fn create_route(&mut self, route: &SuggestedRoute) -> Result<String, StorageError>;

    /// Persist one stop of `route_id` and return its generated row id.
    async fn create_stop(
        &mut self,
        route_id: &str,
        stop: &StopCandidate,
    ) -> Result<String, StorageError>;

    async fn assign_students_to_stop(
        &mut self,
        stop_row_id: &str,
        student_ids: &[String],
    ) -> Result<(), StorageError>;

    async fn commit(self: Box<Self>) -> Result<(), StorageError>;

    async fn rollback(self: Box<Self>) -> Result<(), StorageError>;
}
