//! Instance registry service
//!
//! Owns the lifecycle of managed instances: the stored row, the admin client
//! in the registry, the default global config and the health monitor task.

use std::sync::Arc;

use caddy_orchestrator_admin::{AdminApi, AdminError};
use chrono::Utc;

use crate::error::{CoreError, CoreResult};
use crate::services::validation::{validate_id, validate_name};
use crate::services::{HealthMonitor, ServiceContext, SyncService};
use crate::types::{
    CreateInstanceRequest, GlobalConfig, Instance, InstanceHealth, UpdateInstanceRequest,
    DEFAULT_INSTANCE_ID,
};

/// Instance recovery results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreResult {
    /// Number of instances whose client was registered
    pub success_count: usize,
    /// Number of instances whose stored URL could not be used
    pub error_count: usize,
}

/// Instance registry service
pub struct InstanceService {
    ctx: Arc<ServiceContext>,
    sync: Arc<SyncService>,
    monitor: Arc<HealthMonitor>,
}

impl InstanceService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>, sync: Arc<SyncService>, monitor: Arc<HealthMonitor>) -> Self {
        Self { ctx, sync, monitor }
    }

    // ===== CRUD operations =====

    /// List all instances, by ID
    pub async fn list_instances(&self) -> CoreResult<Vec<Instance>> {
        let mut instances = self.ctx.instance_repository().find_all().await?;
        instances.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(instances)
    }

    /// Get instance based on ID
    pub async fn get_instance(&self, instance_id: &str) -> CoreResult<Option<Instance>> {
        self.ctx.instance_repository().find_by_id(instance_id).await
    }

    /// Register an instance
    ///
    /// Complete process: validate URL -> save instance -> save default global
    /// config -> register admin client -> start health monitor.
    /// If the global config cannot be saved, the instance row is removed again.
    pub async fn create_instance(&self, request: CreateInstanceRequest) -> CoreResult<Instance> {
        validate_name(&request.name)?;
        let instance_id = request
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        validate_id("instance", &instance_id)?;

        if self
            .ctx
            .instance_repository()
            .find_by_id(&instance_id)
            .await?
            .is_some()
        {
            return Err(CoreError::InstanceExists(instance_id));
        }

        // 1. Validate the URL by building the client
        let client = self.create_client(&request.admin_url)?;

        // 2. Save the instance
        let instance = Instance::new(
            instance_id.clone(),
            request.name.trim().to_string(),
            client.base_url().to_string(),
        );
        self.ctx.instance_repository().save(&instance).await?;

        // 3. Default global config, cleanup if failed
        if let Err(e) = self
            .ctx
            .global_config_repository()
            .set(&GlobalConfig::new(&instance.id, &instance.admin_url))
            .await
        {
            log::error!("Failed to save global config of {instance_id}, cleaning up: {e}");
            if let Err(cleanup_err) = self.ctx.instance_repository().delete(&instance_id).await {
                log::warn!("Cleanup: failed to delete instance {instance_id}: {cleanup_err}");
            }
            return Err(e);
        }

        // 4. Register client and start monitoring
        self.ctx
            .admin_registry()
            .register(instance_id.clone(), client)
            .await;
        self.monitor.start(&instance_id).await;

        log::info!("Instance {instance_id} registered at {}", instance.admin_url);
        Ok(instance)
    }

    /// Rename an instance and/or point it at a new admin URL
    ///
    /// A URL change replaces the admin client, is mirrored into the global
    /// config and marks the instance pending so the new endpoint gets the
    /// current routes once it answers.
    pub async fn update_instance(&self, request: UpdateInstanceRequest) -> CoreResult<Instance> {
        if let Some(name) = &request.name {
            validate_name(name)?;
        }
        let new_client = request
            .admin_url
            .as_deref()
            .map(|url| self.create_client(url))
            .transpose()?;

        let _guard = self.sync.lock_instance(&request.id).await;
        let mut instance = self.ctx.require_instance(&request.id).await?;

        if let Some(name) = request.name {
            instance.name = name.trim().to_string();
        }
        let new_client = new_client.filter(|client| client.base_url() != instance.admin_url);
        if let Some(client) = &new_client {
            instance.admin_url = client.base_url().to_string();
        }

        instance.updated_at = Utc::now();
        self.ctx
            .instance_repository()
            .update_details(
                &instance.id,
                &instance.name,
                &instance.admin_url,
                instance.updated_at,
            )
            .await?;

        if let Some(client) = new_client {
            self.ctx
                .instance_repository()
                .set_sync_pending(&instance.id, true)
                .await?;
            instance.sync_pending = true;

            let mut global = self.ctx.global_config_for(&instance).await?;
            global.admin_url.clone_from(&instance.admin_url);
            global.updated_at = Utc::now();
            self.ctx.global_config_repository().set(&global).await?;

            self.ctx
                .admin_registry()
                .register(instance.id.clone(), client)
                .await;
            self.sync.forget_applied(&instance.id).await;
            log::info!("Instance {} now managed at {}", instance.id, instance.admin_url);
        }

        Ok(instance)
    }

    /// Remove an instance with its routes and global config
    ///
    /// The health monitor is stopped first. Edit history is kept unless
    /// `purge_history` is set.
    pub async fn delete_instance(&self, instance_id: &str, purge_history: bool) -> CoreResult<()> {
        self.ctx.require_instance(instance_id).await?;

        self.monitor.stop(instance_id).await;

        {
            // Let an in-flight sync finish before the rows disappear.
            let _guard = self.sync.lock_instance(instance_id).await;
            self.ctx
                .route_repository()
                .delete_by_instance(instance_id)
                .await?;
            self.ctx
                .global_config_repository()
                .delete(instance_id)
                .await?;
            if purge_history {
                self.ctx
                    .history_repository()
                    .delete_by_instance(instance_id)
                    .await?;
            }
            self.ctx.instance_repository().delete(instance_id).await?;
            self.ctx.admin_registry().unregister(instance_id).await;
        }
        self.sync.forget_instance(instance_id).await;

        log::info!("Instance {instance_id} deleted (history purged: {purge_history})");
        Ok(())
    }

    // ===== Startup =====

    /// Register clients and start monitors for all stored instances
    pub async fn restore_instances(&self) -> CoreResult<RestoreResult> {
        let instances = self.ctx.instance_repository().find_all().await?;
        let mut result = RestoreResult::default();

        for instance in instances {
            match self.create_client(&instance.admin_url) {
                Ok(client) => {
                    self.ctx
                        .admin_registry()
                        .register(instance.id.clone(), client)
                        .await;
                    self.monitor.start(&instance.id).await;
                    result.success_count += 1;
                }
                Err(e) => {
                    log::warn!("Failed to restore instance {}: {e}", instance.id);
                    let health = InstanceHealth::error(e.to_string());
                    if let Err(update_err) = self
                        .ctx
                        .instance_repository()
                        .update_health(&instance.id, &health)
                        .await
                    {
                        log::error!(
                            "Failed to record restore error of {}: {update_err}",
                            instance.id
                        );
                    }
                    result.error_count += 1;
                }
            }
        }

        log::info!(
            "Restored {} instance(s), {} failed",
            result.success_count,
            result.error_count
        );
        Ok(result)
    }

    /// Make sure the single-instance default exists and points at `admin_url`
    pub async fn ensure_default_instance(&self, name: &str, admin_url: &str) -> CoreResult<Instance> {
        match self.get_instance(DEFAULT_INSTANCE_ID).await? {
            Some(existing) => {
                self.update_instance(UpdateInstanceRequest {
                    id: existing.id,
                    name: (existing.name != name).then(|| name.to_string()),
                    admin_url: Some(admin_url.to_string()),
                })
                .await
            }
            None => {
                self.create_instance(CreateInstanceRequest {
                    id: Some(DEFAULT_INSTANCE_ID.to_string()),
                    name: name.to_string(),
                    admin_url: admin_url.to_string(),
                })
                .await
            }
        }
    }

    fn create_client(&self, admin_url: &str) -> CoreResult<Arc<dyn AdminApi>> {
        self.ctx
            .client_factory()
            .create(admin_url)
            .map_err(|e| match e {
                AdminError::InvalidUrl { url, detail } => {
                    CoreError::ValidationError(format!("invalid admin URL '{url}': {detail}"))
                }
                other => CoreError::Admin(other),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{harness, proxy_request, register_instance};
    use crate::traits::{
        GlobalConfigRepository, HistoryRepository, InstanceRepository, RouteRepository,
    };
    use crate::types::InstanceStatus;

    fn request(id: &str, url: &str) -> CreateInstanceRequest {
        CreateInstanceRequest {
            id: Some(id.to_string()),
            name: format!("Instance {id}"),
            admin_url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn create_instance_registers_everything() {
        let h = harness();

        let instance = h
            .instances
            .create_instance(request("edge", "http://edge:2019/"))
            .await
            .unwrap();

        assert_eq!(instance.admin_url, "http://edge:2019");
        assert_eq!(instance.status, InstanceStatus::Unknown);
        assert!(h.ctx.admin_registry().get("edge").await.is_some());
        assert!(h.monitor.is_running("edge").await);
        let global = h.store.get("edge").await.unwrap().unwrap();
        assert_eq!(global.admin_url, "http://edge:2019");
        assert!(!global.enable_encode);

        h.monitor.shutdown(std::time::Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn create_instance_validation() {
        let h = harness();

        assert!(matches!(
            h.instances
                .create_instance(request("edge", "edge:2019"))
                .await,
            Err(CoreError::ValidationError(_))
        ));
        let mut unnamed = request("edge", "http://edge:2019");
        unnamed.name = " ".to_string();
        assert!(matches!(
            h.instances.create_instance(unnamed).await,
            Err(CoreError::ValidationError(_))
        ));

        h.instances
            .create_instance(request("edge", "http://edge:2019"))
            .await
            .unwrap();
        assert!(matches!(
            h.instances
                .create_instance(request("edge", "http://other:2019"))
                .await,
            Err(CoreError::InstanceExists(_))
        ));

        h.monitor.shutdown(std::time::Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn update_instance_url_repoints_client() {
        let h = harness();
        h.instances
            .create_instance(request("edge", "http://old:2019"))
            .await
            .unwrap();

        let updated = h
            .instances
            .update_instance(UpdateInstanceRequest {
                id: "edge".to_string(),
                name: Some("Edge".to_string()),
                admin_url: Some("http://new:2019".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(updated.name, "Edge");
        assert_eq!(updated.admin_url, "http://new:2019");
        assert!(updated.sync_pending);
        let client = h.ctx.admin_registry().get("edge").await.unwrap();
        assert_eq!(client.base_url(), "http://new:2019");
        let global = h.store.get("edge").await.unwrap().unwrap();
        assert_eq!(global.admin_url, "http://new:2019");

        h.monitor.shutdown(std::time::Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn rename_keeps_concurrent_pending_flag_and_health() {
        let h = harness();
        register_instance(&h, "edge", "http://edge:2019").await;

        // A sync holds the instance while its apply fails and a probe lands.
        let guard = h.sync.lock_instance("edge").await;
        let (renamed, ()) = tokio::join!(
            h.instances.update_instance(UpdateInstanceRequest {
                id: "edge".to_string(),
                name: Some("Edge".to_string()),
                admin_url: None,
            }),
            async {
                tokio::task::yield_now().await;
                h.store.set_sync_pending("edge", true).await.unwrap();
                h.store
                    .update_health("edge", &InstanceHealth::offline("connection refused"))
                    .await
                    .unwrap();
                drop(guard);
            }
        );

        let renamed = renamed.unwrap();
        assert_eq!(renamed.name, "Edge");
        assert!(renamed.sync_pending);

        let stored = h.instances.get_instance("edge").await.unwrap().unwrap();
        assert_eq!(stored.name, "Edge");
        assert!(stored.sync_pending);
        assert_eq!(stored.status, InstanceStatus::Offline);
        assert_eq!(stored.last_error.as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn delete_instance_removes_owned_state() {
        let h = harness();
        h.instances
            .create_instance(request("edge", "http://edge:2019"))
            .await
            .unwrap();
        h.instances
            .create_instance(request("other", "http://other:2019"))
            .await
            .unwrap();
        h.routes
            .create_route(proxy_request("edge", "a.com", &["a:80"]), "alice")
            .await
            .unwrap();
        h.routes
            .create_route(proxy_request("other", "b.com", &["b:80"]), "alice")
            .await
            .unwrap();

        h.instances.delete_instance("edge", false).await.unwrap();

        assert!(h.instances.get_instance("edge").await.unwrap().is_none());
        assert!(!h.monitor.is_running("edge").await);
        assert!(h.ctx.admin_registry().get("edge").await.is_none());
        assert!(h.store.find_by_instance("edge").await.unwrap().is_empty());
        assert!(h.store.get("edge").await.unwrap().is_none());
        // History is kept by default.
        assert_eq!(h.store.list("edge", 10).await.unwrap().len(), 1);
        // Other instances are untouched.
        assert_eq!(h.store.find_by_instance("other").await.unwrap().len(), 1);
        assert!(h.monitor.is_running("other").await);

        h.instances.delete_instance("other", true).await.unwrap();
        assert!(h.store.list("other", 10).await.unwrap().is_empty());
        assert!(matches!(
            h.instances.delete_instance("other", true).await,
            Err(CoreError::InstanceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn restore_registers_valid_instances_only() {
        let h = harness();
        crate::test_utils::register_instance(&h, "good", "http://good:2019").await;
        let mut broken = Instance::new(
            "broken".to_string(),
            "Broken".to_string(),
            "not a url".to_string(),
        );
        broken.status = InstanceStatus::Online;
        crate::traits::InstanceRepository::save(h.store.as_ref(), &broken)
            .await
            .unwrap();

        let result = h.instances.restore_instances().await.unwrap();

        assert_eq!(
            result,
            RestoreResult {
                success_count: 1,
                error_count: 1
            }
        );
        assert!(h.monitor.is_running("good").await);
        assert!(!h.monitor.is_running("broken").await);
        let broken = h.instances.get_instance("broken").await.unwrap().unwrap();
        assert_eq!(broken.status, InstanceStatus::Error);

        h.monitor.shutdown(std::time::Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn ensure_default_instance_is_idempotent() {
        let h = harness();

        let first = h
            .instances
            .ensure_default_instance("Local", "http://localhost:2019")
            .await
            .unwrap();
        let second = h
            .instances
            .ensure_default_instance("Local", "http://localhost:2019")
            .await
            .unwrap();

        assert_eq!(first.id, DEFAULT_INSTANCE_ID);
        assert_eq!(second.created_at, first.created_at);
        assert!(!second.sync_pending);
        assert_eq!(h.instances.list_instances().await.unwrap().len(), 1);

        let moved = h
            .instances
            .ensure_default_instance("Local", "http://127.0.0.1:2020")
            .await
            .unwrap();
        assert_eq!(moved.admin_url, "http://127.0.0.1:2020");

        h.monitor.shutdown(std::time::Duration::from_secs(1)).await;
    }
}
