//! Edit history queries

use std::sync::Arc;

use crate::error::CoreResult;
use crate::services::validation::validate_id;
use crate::services::ServiceContext;
use crate::types::{EditHistory, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};

/// Read-only access to the edit history
///
/// History outlives its instance unless purged on delete, so lookups do not
/// require the instance to exist.
pub struct HistoryService {
    ctx: Arc<ServiceContext>,
}

impl HistoryService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Entries of an instance, newest first
    ///
    /// `limit` defaults to 50 and is clamped to `1..=500`.
    pub async fn list_history(
        &self,
        instance_id: &str,
        limit: Option<usize>,
    ) -> CoreResult<Vec<EditHistory>> {
        validate_id("instance", instance_id)?;
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        self.ctx.history_repository().list(instance_id, limit).await
    }

    pub async fn get_entry(&self, id: &str) -> CoreResult<Option<EditHistory>> {
        self.ctx.history_repository().find_by_id(id).await
    }
}
