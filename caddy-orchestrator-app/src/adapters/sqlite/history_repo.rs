//! `HistoryRepository` implementation for `SqliteStore`.

use async_trait::async_trait;
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};

use caddy_orchestrator_core::error::{CoreError, CoreResult};
use caddy_orchestrator_core::traits::HistoryRepository;
use caddy_orchestrator_core::types::EditHistory;
use caddy_orchestrator_core::utils::datetime::to_rfc3339;

use super::entity::edit_history;
use super::{parse_json, parse_timestamp, to_json, SqliteStore};

impl edit_history::Model {
    fn into_entry(self) -> CoreResult<EditHistory> {
        let previous_config = self
            .previous_config
            .as_deref()
            .map(|c| parse_json("previous_config", c))
            .transpose()?;

        Ok(EditHistory {
            id: self.id,
            instance_id: self.instance_id,
            actor: self.actor,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            previous_config,
            new_config: parse_json("new_config", &self.new_config)?,
        })
    }
}

#[async_trait]
impl HistoryRepository for SqliteStore {
    async fn append(&self, entry: &EditHistory) -> CoreResult<()> {
        let active_model = edit_history::ActiveModel {
            seq: NotSet,
            id: Set(entry.id.clone()),
            instance_id: Set(entry.instance_id.clone()),
            actor: Set(entry.actor.clone()),
            created_at: Set(to_rfc3339(&entry.created_at)),
            previous_config: Set(entry.previous_config.as_ref().map(to_json).transpose()?),
            new_config: Set(to_json(&entry.new_config)?),
        };

        edit_history::Entity::insert(active_model)
            .exec(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to append history: {e}")))?;

        Ok(())
    }

    async fn list(&self, instance_id: &str, limit: usize) -> CoreResult<Vec<EditHistory>> {
        let rows = edit_history::Entity::find()
            .filter(edit_history::Column::InstanceId.eq(instance_id))
            .order_by_desc(edit_history::Column::Seq)
            .limit(u64::try_from(limit).unwrap_or(u64::MAX))
            .all(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to query history: {e}")))?;

        rows.into_iter().map(edit_history::Model::into_entry).collect()
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<EditHistory>> {
        let row = edit_history::Entity::find()
            .filter(edit_history::Column::Id.eq(id))
            .one(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to query history: {e}")))?;

        row.map(edit_history::Model::into_entry).transpose()
    }

    async fn delete_by_instance(&self, instance_id: &str) -> CoreResult<()> {
        edit_history::Entity::delete_many()
            .filter(edit_history::Column::InstanceId.eq(instance_id))
            .exec(&self.db)
            .await
            .map_err(|e| {
                CoreError::StorageError(format!("Failed to delete history by instance: {e}"))
            })?;

        Ok(())
    }
}
