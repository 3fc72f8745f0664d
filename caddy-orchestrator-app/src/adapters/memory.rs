//! In-memory unified store.
//!
//! Every write replaces a whole row under the map's write lock, so readers
//! never observe a partially updated route or instance.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use caddy_orchestrator_core::error::{CoreError, CoreResult};
use caddy_orchestrator_core::traits::{
    GlobalConfigRepository, HistoryRepository, InstanceRepository, RouteRepository,
};
use caddy_orchestrator_core::types::{EditHistory, GlobalConfig, Instance, InstanceHealth, Route};

/// Volatile store implementing all four repositories.
///
/// Used when `storage.backend = "memory"`; state is lost on restart.
#[derive(Default)]
pub struct InMemoryStore {
    routes: RwLock<HashMap<String, Route>>,
    instances: RwLock<HashMap<String, Instance>>,
    global_configs: RwLock<HashMap<String, GlobalConfig>>,
    /// Insertion order is chronological order
    history: RwLock<Vec<EditHistory>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RouteRepository for InMemoryStore {
    async fn find_all(&self) -> CoreResult<Vec<Route>> {
        Ok(self.routes.read().await.values().cloned().collect())
    }

    async fn find_by_instance(&self, instance_id: &str) -> CoreResult<Vec<Route>> {
        Ok(self
            .routes
            .read()
            .await
            .values()
            .filter(|r| r.instance_id == instance_id)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Route>> {
        Ok(self.routes.read().await.get(id).cloned())
    }

    async fn save(&self, route: &Route) -> CoreResult<()> {
        self.routes
            .write()
            .await
            .insert(route.id.clone(), route.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        self.routes.write().await.remove(id);
        Ok(())
    }

    async fn delete_by_instance(&self, instance_id: &str) -> CoreResult<()> {
        self.routes
            .write()
            .await
            .retain(|_, r| r.instance_id != instance_id);
        Ok(())
    }
}

#[async_trait]
impl InstanceRepository for InMemoryStore {
    async fn find_all(&self) -> CoreResult<Vec<Instance>> {
        Ok(self.instances.read().await.values().cloned().collect())
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Instance>> {
        Ok(self.instances.read().await.get(id).cloned())
    }

    async fn save(&self, instance: &Instance) -> CoreResult<()> {
        self.instances
            .write()
            .await
            .insert(instance.id.clone(), instance.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        self.instances.write().await.remove(id);
        Ok(())
    }

    async fn update_health(&self, id: &str, health: &InstanceHealth) -> CoreResult<()> {
        let mut instances = self.instances.write().await;
        let instance = instances
            .get_mut(id)
            .ok_or_else(|| CoreError::InstanceNotFound(id.to_string()))?;
        instance.apply_health(health);
        Ok(())
    }

    async fn update_details(
        &self,
        id: &str,
        name: &str,
        admin_url: &str,
        updated_at: DateTime<Utc>,
    ) -> CoreResult<()> {
        let mut instances = self.instances.write().await;
        let instance = instances
            .get_mut(id)
            .ok_or_else(|| CoreError::InstanceNotFound(id.to_string()))?;
        instance.name = name.to_string();
        instance.admin_url = admin_url.to_string();
        instance.updated_at = updated_at;
        Ok(())
    }

    async fn set_sync_pending(&self, id: &str, pending: bool) -> CoreResult<()> {
        let mut instances = self.instances.write().await;
        let instance = instances
            .get_mut(id)
            .ok_or_else(|| CoreError::InstanceNotFound(id.to_string()))?;
        instance.sync_pending = pending;
        Ok(())
    }
}

#[async_trait]
impl GlobalConfigRepository for InMemoryStore {
    async fn get(&self, instance_id: &str) -> CoreResult<Option<GlobalConfig>> {
        Ok(self.global_configs.read().await.get(instance_id).cloned())
    }

    async fn set(&self, config: &GlobalConfig) -> CoreResult<()> {
        self.global_configs
            .write()
            .await
            .insert(config.instance_id.clone(), config.clone());
        Ok(())
    }

    async fn delete(&self, instance_id: &str) -> CoreResult<()> {
        self.global_configs.write().await.remove(instance_id);
        Ok(())
    }
}

#[async_trait]
impl HistoryRepository for InMemoryStore {
    async fn append(&self, entry: &EditHistory) -> CoreResult<()> {
        self.history.write().await.push(entry.clone());
        Ok(())
    }

    async fn list(&self, instance_id: &str, limit: usize) -> CoreResult<Vec<EditHistory>> {
        Ok(self
            .history
            .read()
            .await
            .iter()
            .rev()
            .filter(|e| e.instance_id == instance_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<EditHistory>> {
        Ok(self
            .history
            .read()
            .await
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn delete_by_instance(&self, instance_id: &str) -> CoreResult<()> {
        self.history
            .write()
            .await
            .retain(|e| e.instance_id != instance_id);
        Ok(())
    }
}
