//! `InstanceRepository` implementation for `SqliteStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};

use caddy_orchestrator_core::error::{CoreError, CoreResult};
use caddy_orchestrator_core::traits::InstanceRepository;
use caddy_orchestrator_core::types::{Instance, InstanceHealth, InstanceStatus};
use caddy_orchestrator_core::utils::datetime::to_rfc3339;

use super::entity::instance;
use super::{parse_timestamp, SqliteStore};

impl instance::Model {
    fn into_instance(self) -> CoreResult<Instance> {
        let last_checked_at = self
            .last_checked_at
            .as_deref()
            .map(|s| parse_timestamp("last_checked_at", s))
            .transpose()?;

        Ok(Instance {
            id: self.id,
            name: self.name,
            admin_url: self.admin_url,
            status: InstanceStatus::parse(&self.status),
            latency_ms: self.latency_ms.and_then(|ms| u64::try_from(ms).ok()),
            last_error: self.last_error,
            last_checked_at,
            sync_pending: self.sync_pending != 0,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
        })
    }
}

fn latency_column(latency_ms: Option<u64>) -> Option<i64> {
    latency_ms.map(|ms| i64::try_from(ms).unwrap_or(i64::MAX))
}

fn instance_to_active_model(instance: &Instance) -> instance::ActiveModel {
    instance::ActiveModel {
        id: Set(instance.id.clone()),
        name: Set(instance.name.clone()),
        admin_url: Set(instance.admin_url.clone()),
        status: Set(instance.status.as_str().to_string()),
        latency_ms: Set(latency_column(instance.latency_ms)),
        last_error: Set(instance.last_error.clone()),
        last_checked_at: Set(instance.last_checked_at.as_ref().map(to_rfc3339)),
        sync_pending: Set(i32::from(instance.sync_pending)),
        created_at: Set(to_rfc3339(&instance.created_at)),
        updated_at: Set(to_rfc3339(&instance.updated_at)),
    }
}

impl SqliteStore {
    async fn require_instance_row(&self, id: &str) -> CoreResult<()> {
        let exists = instance::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to query instance: {e}")))?
            .is_some();
        if exists {
            Ok(())
        } else {
            Err(CoreError::InstanceNotFound(id.to_string()))
        }
    }
}

#[async_trait]
impl InstanceRepository for SqliteStore {
    async fn find_all(&self) -> CoreResult<Vec<Instance>> {
        let rows = instance::Entity::find()
            .all(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to query instances: {e}")))?;

        rows.into_iter().map(instance::Model::into_instance).collect()
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Instance>> {
        let row = instance::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to query instance: {e}")))?;

        row.map(instance::Model::into_instance).transpose()
    }

    async fn save(&self, instance: &Instance) -> CoreResult<()> {
        instance::Entity::insert(instance_to_active_model(instance))
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(instance::Column::Id)
                    .update_columns([
                        instance::Column::Name,
                        instance::Column::AdminUrl,
                        instance::Column::Status,
                        instance::Column::LatencyMs,
                        instance::Column::LastError,
                        instance::Column::LastCheckedAt,
                        instance::Column::SyncPending,
                        instance::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to save instance: {e}")))?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        instance::Entity::delete_many()
            .filter(instance::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to delete instance: {e}")))?;

        Ok(())
    }

    async fn update_health(&self, id: &str, health: &InstanceHealth) -> CoreResult<()> {
        self.require_instance_row(id).await?;

        let active = instance::ActiveModel {
            id: Set(id.to_string()),
            status: Set(health.status.as_str().to_string()),
            latency_ms: Set(latency_column(health.latency_ms)),
            last_error: Set(health.error.clone()),
            last_checked_at: Set(Some(to_rfc3339(&health.checked_at))),
            ..Default::default()
        };
        active
            .update(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to update health: {e}")))?;

        Ok(())
    }

    async fn update_details(
        &self,
        id: &str,
        name: &str,
        admin_url: &str,
        updated_at: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.require_instance_row(id).await?;

        let active = instance::ActiveModel {
            id: Set(id.to_string()),
            name: Set(name.to_string()),
            admin_url: Set(admin_url.to_string()),
            updated_at: Set(to_rfc3339(&updated_at)),
            ..Default::default()
        };
        active
            .update(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to update instance: {e}")))?;

        Ok(())
    }

    async fn set_sync_pending(&self, id: &str, pending: bool) -> CoreResult<()> {
        self.require_instance_row(id).await?;

        let active = instance::ActiveModel {
            id: Set(id.to_string()),
            sync_pending: Set(i32::from(pending)),
            ..Default::default()
        };
        active
            .update(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to update sync state: {e}")))?;

        Ok(())
    }
}
