//! Edit history persistence abstract Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::EditHistory;

/// Append-only edit history
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Append an entry
    async fn append(&self, entry: &EditHistory) -> CoreResult<()>;

    /// Entries of one instance, newest first
    ///
    /// # Arguments
    /// * `instance_id` - Instance ID
    /// * `limit` - maximum number of entries returned
    async fn list(&self, instance_id: &str, limit: usize) -> CoreResult<Vec<EditHistory>>;

    /// Get entry based on ID
    async fn find_by_id(&self, id: &str) -> CoreResult<Option<EditHistory>>;

    /// Purge the history of an instance
    async fn delete_by_instance(&self, instance_id: &str) -> CoreResult<()>;
}
