//! `RouteRepository` implementation for `SqliteStore`.

use async_trait::async_trait;
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use serde_json::{json, Value};

use caddy_orchestrator_core::error::{CoreError, CoreResult};
use caddy_orchestrator_core::traits::RouteRepository;
use caddy_orchestrator_core::types::{HeaderConfig, Route, RouteHandler};
use caddy_orchestrator_core::utils::datetime::to_rfc3339;

use super::entity::route;
use super::{parse_json, parse_timestamp, to_json, SqliteStore};

impl route::Model {
    /// Convert a `SeaORM` row model into a domain `Route`.
    ///
    /// Unknown handler types decode as `RouteHandler::Unsupported`.
    fn into_route(self) -> CoreResult<Route> {
        let config: Value = parse_json("handler_config", &self.handler_config)?;
        let handler: RouteHandler = serde_json::from_value(json!({
            "handler_type": self.handler_type,
            "config": config,
        }))
        .map_err(|e| CoreError::SerializationError(format!("Invalid handler: {e}")))?;
        let headers = self
            .headers
            .as_deref()
            .map(|h| parse_json::<HeaderConfig>("headers", h))
            .transpose()?;

        Ok(Route {
            id: self.id,
            instance_id: self.instance_id,
            domain: self.domain,
            path: self.path,
            strip_prefix: self.strip_prefix,
            handler,
            headers,
            enabled: self.enabled != 0,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
        })
    }
}

/// Convert a domain `Route` into a `SeaORM` active model for upsert.
fn route_to_active_model(route: &Route) -> CoreResult<route::ActiveModel> {
    let raw = serde_json::to_value(&route.handler)
        .map_err(|e| CoreError::SerializationError(e.to_string()))?;
    let handler_config = raw
        .get("config")
        .filter(|c| !c.is_null())
        .map_or_else(|| "{}".to_string(), Value::to_string);
    let headers = route.headers.as_ref().map(to_json).transpose()?;

    Ok(route::ActiveModel {
        id: Set(route.id.clone()),
        instance_id: Set(route.instance_id.clone()),
        domain: Set(route.domain.clone()),
        path: Set(route.path.clone()),
        strip_prefix: Set(route.strip_prefix.clone()),
        handler_type: Set(route.handler.handler_type().to_string()),
        handler_config: Set(handler_config),
        headers: Set(headers),
        enabled: Set(i32::from(route.enabled)),
        created_at: Set(to_rfc3339(&route.created_at)),
        updated_at: Set(to_rfc3339(&route.updated_at)),
    })
}

#[async_trait]
impl RouteRepository for SqliteStore {
    async fn find_all(&self) -> CoreResult<Vec<Route>> {
        let rows = route::Entity::find()
            .all(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to query routes: {e}")))?;

        rows.into_iter().map(route::Model::into_route).collect()
    }

    async fn find_by_instance(&self, instance_id: &str) -> CoreResult<Vec<Route>> {
        let rows = route::Entity::find()
            .filter(route::Column::InstanceId.eq(instance_id))
            .all(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to query routes: {e}")))?;

        rows.into_iter().map(route::Model::into_route).collect()
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Route>> {
        let row = route::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to query route: {e}")))?;

        row.map(route::Model::into_route).transpose()
    }

    async fn save(&self, route: &Route) -> CoreResult<()> {
        let active_model = route_to_active_model(route)?;

        route::Entity::insert(active_model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(route::Column::Id)
                    .update_columns([
                        route::Column::InstanceId,
                        route::Column::Domain,
                        route::Column::Path,
                        route::Column::StripPrefix,
                        route::Column::HandlerType,
                        route::Column::HandlerConfig,
                        route::Column::Headers,
                        route::Column::Enabled,
                        route::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to save route: {e}")))?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        route::Entity::delete_many()
            .filter(route::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to delete route: {e}")))?;

        Ok(())
    }

    async fn delete_by_instance(&self, instance_id: &str) -> CoreResult<()> {
        let result = route::Entity::delete_many()
            .filter(route::Column::InstanceId.eq(instance_id))
            .exec(&self.db)
            .await
            .map_err(|e| {
                CoreError::StorageError(format!("Failed to delete routes by instance: {e}"))
            })?;

        log::debug!(
            "Deleted {} route(s) of instance {instance_id}",
            result.rows_affected
        );
        Ok(())
    }
}
