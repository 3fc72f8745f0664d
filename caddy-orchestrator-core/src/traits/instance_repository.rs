//! Instance persistence abstract Trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreResult;
use crate::types::{Instance, InstanceHealth};

/// Instance Repository Trait
///
/// Health, pending-sync and detail updates each touch only their own
/// columns, so a probe result, a failed apply and a rename never clobber
/// one another. Readers see either the old or the new status.
#[async_trait]
pub trait InstanceRepository: Send + Sync {
    /// Get all instances
    async fn find_all(&self) -> CoreResult<Vec<Instance>>;

    /// Get instance based on ID
    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Instance>>;

    /// Save instance (new or update)
    async fn save(&self, instance: &Instance) -> CoreResult<()>;

    /// Delete instance
    async fn delete(&self, id: &str) -> CoreResult<()>;

    /// Record a probe result
    ///
    /// Returns `InstanceNotFound` if the instance is gone.
    async fn update_health(&self, id: &str, health: &InstanceHealth) -> CoreResult<()>;

    /// Replace name and admin URL only
    ///
    /// Returns `InstanceNotFound` if the instance is gone.
    async fn update_details(
        &self,
        id: &str,
        name: &str,
        admin_url: &str,
        updated_at: DateTime<Utc>,
    ) -> CoreResult<()>;

    /// Set or clear the pending-sync flag
    async fn set_sync_pending(&self, id: &str, pending: bool) -> CoreResult<()>;
}
