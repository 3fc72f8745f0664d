//! `GlobalConfigRepository` implementation for `SqliteStore`.

use async_trait::async_trait;
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};

use caddy_orchestrator_core::error::{CoreError, CoreResult};
use caddy_orchestrator_core::traits::GlobalConfigRepository;
use caddy_orchestrator_core::types::GlobalConfig;
use caddy_orchestrator_core::utils::datetime::to_rfc3339;

use super::entity::global_config;
use super::{parse_timestamp, SqliteStore};

impl global_config::Model {
    fn into_global_config(self) -> CoreResult<GlobalConfig> {
        Ok(GlobalConfig {
            instance_id: self.instance_id,
            admin_url: self.admin_url,
            enable_encode: self.enable_encode != 0,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
        })
    }
}

#[async_trait]
impl GlobalConfigRepository for SqliteStore {
    async fn get(&self, instance_id: &str) -> CoreResult<Option<GlobalConfig>> {
        let row = global_config::Entity::find_by_id(instance_id)
            .one(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to query global config: {e}")))?;

        row.map(global_config::Model::into_global_config).transpose()
    }

    async fn set(&self, config: &GlobalConfig) -> CoreResult<()> {
        let active_model = global_config::ActiveModel {
            instance_id: Set(config.instance_id.clone()),
            admin_url: Set(config.admin_url.clone()),
            enable_encode: Set(i32::from(config.enable_encode)),
            updated_at: Set(to_rfc3339(&config.updated_at)),
        };

        global_config::Entity::insert(active_model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(global_config::Column::InstanceId)
                    .update_columns([
                        global_config::Column::AdminUrl,
                        global_config::Column::EnableEncode,
                        global_config::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to save global config: {e}")))?;

        Ok(())
    }

    async fn delete(&self, instance_id: &str) -> CoreResult<()> {
        global_config::Entity::delete_many()
            .filter(global_config::Column::InstanceId.eq(instance_id))
            .exec(&self.db)
            .await
            .map_err(|e| {
                CoreError::StorageError(format!("Failed to delete global config: {e}"))
            })?;

        Ok(())
    }
}
