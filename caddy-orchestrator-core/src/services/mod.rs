//! Business logic service layer

mod global_config_service;
mod health_monitor;
mod history_service;
mod instance_service;
mod route_service;
mod sync_service;
mod validation;

pub use global_config_service::GlobalConfigService;
pub use health_monitor::{HealthMonitor, HealthMonitorConfig};
pub use history_service::HistoryService;
pub use instance_service::{InstanceService, RestoreResult};
pub use route_service::RouteService;
pub use sync_service::{SyncService, SYSTEM_ACTOR};

use std::sync::Arc;

use caddy_orchestrator_admin::AdminApi;

use crate::error::{CoreError, CoreResult};
use crate::traits::{
    AdminClientFactory, AdminClientRegistry, GlobalConfigRepository, HistoryRepository,
    InstanceRepository, RouteRepository,
};
use crate::types::{GlobalConfig, Instance};

/// Service context - holds all dependencies
///
/// The platform layer builds this context and injects its storage
/// implementation and admin client factory.
pub struct ServiceContext {
    route_repository: Arc<dyn RouteRepository>,
    instance_repository: Arc<dyn InstanceRepository>,
    global_config_repository: Arc<dyn GlobalConfigRepository>,
    history_repository: Arc<dyn HistoryRepository>,
    admin_registry: Arc<dyn AdminClientRegistry>,
    client_factory: Arc<dyn AdminClientFactory>,
}

impl ServiceContext {
    /// Create a service context
    #[must_use]
    pub fn new(
        route_repository: Arc<dyn RouteRepository>,
        instance_repository: Arc<dyn InstanceRepository>,
        global_config_repository: Arc<dyn GlobalConfigRepository>,
        history_repository: Arc<dyn HistoryRepository>,
        admin_registry: Arc<dyn AdminClientRegistry>,
        client_factory: Arc<dyn AdminClientFactory>,
    ) -> Self {
        Self {
            route_repository,
            instance_repository,
            global_config_repository,
            history_repository,
            admin_registry,
            client_factory,
        }
    }

    #[must_use]
    pub fn route_repository(&self) -> &Arc<dyn RouteRepository> {
        &self.route_repository
    }

    #[must_use]
    pub fn instance_repository(&self) -> &Arc<dyn InstanceRepository> {
        &self.instance_repository
    }

    #[must_use]
    pub fn global_config_repository(&self) -> &Arc<dyn GlobalConfigRepository> {
        &self.global_config_repository
    }

    #[must_use]
    pub fn history_repository(&self) -> &Arc<dyn HistoryRepository> {
        &self.history_repository
    }

    #[must_use]
    pub fn admin_registry(&self) -> &Arc<dyn AdminClientRegistry> {
        &self.admin_registry
    }

    #[must_use]
    pub fn client_factory(&self) -> &Arc<dyn AdminClientFactory> {
        &self.client_factory
    }

    /// Get an instance or fail with `InstanceNotFound`
    pub async fn require_instance(&self, instance_id: &str) -> CoreResult<Instance> {
        self.instance_repository
            .find_by_id(instance_id)
            .await?
            .ok_or_else(|| CoreError::InstanceNotFound(instance_id.to_string()))
    }

    /// Get the admin client of an instance
    pub async fn get_admin_client(&self, instance_id: &str) -> CoreResult<Arc<dyn AdminApi>> {
        self.admin_registry
            .get(instance_id)
            .await
            .ok_or_else(|| CoreError::InstanceNotFound(instance_id.to_string()))
    }

    /// Stored global config, or defaults derived from the instance
    pub async fn global_config_for(&self, instance: &Instance) -> CoreResult<GlobalConfig> {
        Ok(self
            .global_config_repository
            .get(&instance.id)
            .await?
            .unwrap_or_else(|| GlobalConfig::new(&instance.id, &instance.admin_url)))
    }

    /// Flag an instance whose live config lags the stored routes.
    pub async fn mark_sync_pending(&self, instance_id: &str, pending: bool) {
        if let Err(e) = self
            .instance_repository
            .set_sync_pending(instance_id, pending)
            .await
        {
            log::error!("Failed to update sync state of instance {instance_id}: {e}");
        }
    }
}
