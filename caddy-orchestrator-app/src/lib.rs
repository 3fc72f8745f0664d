//! Platform-agnostic application bootstrap for Caddy Orchestrator.
//!
//! Provides `AppState` (service container), `AppStateBuilder` (adapter
//! injection) and `AppConfig` (TOML configuration).

pub mod adapters;
pub mod config;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use caddy_orchestrator_core::error::{CoreError, CoreResult};
use caddy_orchestrator_core::services::{
    GlobalConfigService, HealthMonitor, HistoryService, InstanceService, RouteService,
    ServiceContext, SyncService,
};
use caddy_orchestrator_core::traits::{
    AdminClientFactory, AdminClientRegistry, GlobalConfigRepository, HistoryRepository,
    HttpAdminClientFactory, InMemoryAdminClientRegistry, InstanceRepository, RouteRepository,
};

pub use config::AppConfig;

/// Platform-agnostic application state.
///
/// Holds all services and the `ServiceContext`. Every frontend constructs this
/// once at startup via `AppStateBuilder`.
pub struct AppState {
    /// Service context (holds all storage adapters)
    pub ctx: Arc<ServiceContext>,
    /// Sync orchestrator
    pub sync_service: Arc<SyncService>,
    /// Health monitor
    pub health_monitor: Arc<HealthMonitor>,
    /// Instance registry
    pub instance_service: Arc<InstanceService>,
    /// Route service
    pub route_service: RouteService,
    /// Global config service
    pub global_config_service: GlobalConfigService,
    /// History service
    pub history_service: HistoryService,
    /// Whether instance restoration has completed
    pub restore_completed: AtomicBool,
    config: AppConfig,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the full startup sequence: instance restoration, default
    /// instance, initial sync.
    ///
    /// With the initial sync disabled, instances left pending by an earlier
    /// run are still reconciled.
    ///
    /// # Errors
    /// Fails only if the configured default instance cannot be registered.
    pub async fn run_startup(&self) -> CoreResult<()> {
        self.run_instance_restore().await;

        if let Some(default_instance) = &self.config.default_instance {
            let instance = self
                .instance_service
                .ensure_default_instance(&default_instance.name, &default_instance.admin_url)
                .await?;
            log::info!(
                "Single-instance mode: managing {} at {}",
                instance.id,
                instance.admin_url
            );
        }

        if self.config.sync.sync_on_startup {
            self.run_initial_sync().await;
        } else {
            self.run_pending_reconcile().await;
        }
        Ok(())
    }

    /// Restore instances. Sets `restore_completed` to `true` when done.
    pub async fn run_instance_restore(&self) {
        match self.instance_service.restore_instances().await {
            Ok(result) => {
                log::info!(
                    "Instance restoration complete: {} succeeded, {} failed",
                    result.success_count,
                    result.error_count
                );
            }
            Err(e) => {
                log::error!("Failed to restore instances: {e}");
            }
        }
        self.restore_completed.store(true, Ordering::SeqCst);
    }

    /// Push the stored routes to every instance.
    pub async fn run_initial_sync(&self) {
        match self.sync_service.sync_all(&self.config.sync.actor).await {
            Ok(reports) => {
                let applied = reports.iter().filter(|r| r.applied).count();
                for report in reports.iter().filter(|r| !r.applied) {
                    log::warn!(
                        "Startup sync of {} did not apply: {}",
                        report.instance_id,
                        report.warning.as_deref().unwrap_or_default()
                    );
                }
                log::info!(
                    "Startup sync complete: {applied}/{} instance(s) applied",
                    reports.len()
                );
            }
            Err(e) => log::error!("Startup sync failed: {e}"),
        }
    }

    /// Push the stored routes to instances whose last apply failed.
    pub async fn run_pending_reconcile(&self) {
        match self
            .sync_service
            .reconcile_pending(&self.config.sync.actor)
            .await
        {
            Ok(reports) if reports.is_empty() => {}
            Ok(reports) => {
                let applied = reports.iter().filter(|r| r.applied).count();
                log::info!(
                    "Reconciled {applied}/{} pending instance(s)",
                    reports.len()
                );
            }
            Err(e) => log::error!("Pending reconcile failed: {e}"),
        }
    }

    /// Delete an instance, purging its history when configured to.
    pub async fn delete_instance(&self, instance_id: &str) -> CoreResult<()> {
        self.instance_service
            .delete_instance(
                instance_id,
                self.config.sync.purge_history_on_instance_delete,
            )
            .await
    }

    /// Stop all health monitor tasks within the configured grace period.
    ///
    /// In-flight syncs hold their instance lock and run to completion.
    pub async fn shutdown(&self) {
        log::info!("Shutting down");
        self.health_monitor
            .shutdown(self.config.grace_period())
            .await;
    }
}

/// Builder for constructing `AppState` with platform-specific adapters.
///
/// # Required adapters
/// - `route_repository`, `instance_repository`, `global_config_repository`,
///   `history_repository` (or all four at once via [`store`](Self::store))
///
/// # Optional
/// - `admin_registry`: defaults to `InMemoryAdminClientRegistry`
/// - `client_factory`: defaults to `HttpAdminClientFactory` with the
///   configured timeouts
/// - `config`: defaults to `AppConfig::default()`
pub struct AppStateBuilder {
    route_repository: Option<Arc<dyn RouteRepository>>,
    instance_repository: Option<Arc<dyn InstanceRepository>>,
    global_config_repository: Option<Arc<dyn GlobalConfigRepository>>,
    history_repository: Option<Arc<dyn HistoryRepository>>,
    admin_registry: Option<Arc<dyn AdminClientRegistry>>,
    client_factory: Option<Arc<dyn AdminClientFactory>>,
    config: AppConfig,
}

impl AppStateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            route_repository: None,
            instance_repository: None,
            global_config_repository: None,
            history_repository: None,
            admin_registry: None,
            client_factory: None,
            config: AppConfig::default(),
        }
    }

    /// Use one store for all four repositories.
    #[must_use]
    pub fn store<S>(self, store: Arc<S>) -> Self
    where
        S: RouteRepository
            + InstanceRepository
            + GlobalConfigRepository
            + HistoryRepository
            + 'static,
    {
        self.route_repository(store.clone())
            .instance_repository(store.clone())
            .global_config_repository(store.clone())
            .history_repository(store)
    }

    #[must_use]
    pub fn route_repository(mut self, repo: Arc<dyn RouteRepository>) -> Self {
        self.route_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn instance_repository(mut self, repo: Arc<dyn InstanceRepository>) -> Self {
        self.instance_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn global_config_repository(mut self, repo: Arc<dyn GlobalConfigRepository>) -> Self {
        self.global_config_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn history_repository(mut self, repo: Arc<dyn HistoryRepository>) -> Self {
        self.history_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn admin_registry(mut self, registry: Arc<dyn AdminClientRegistry>) -> Self {
        self.admin_registry = Some(registry);
        self
    }

    #[must_use]
    pub fn client_factory(mut self, factory: Arc<dyn AdminClientFactory>) -> Self {
        self.client_factory = Some(factory);
        self
    }

    #[must_use]
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the `AppState`.
    ///
    /// # Errors
    /// Returns `CoreError::ValidationError` if required adapters are missing
    /// or the configuration is invalid.
    pub fn build(self) -> CoreResult<AppState> {
        self.config.validate()?;

        let route_repository = self.route_repository.ok_or_else(|| {
            CoreError::ValidationError("route_repository is required".to_string())
        })?;
        let instance_repository = self.instance_repository.ok_or_else(|| {
            CoreError::ValidationError("instance_repository is required".to_string())
        })?;
        let global_config_repository = self.global_config_repository.ok_or_else(|| {
            CoreError::ValidationError("global_config_repository is required".to_string())
        })?;
        let history_repository = self.history_repository.ok_or_else(|| {
            CoreError::ValidationError("history_repository is required".to_string())
        })?;
        let admin_registry = self
            .admin_registry
            .unwrap_or_else(|| Arc::new(InMemoryAdminClientRegistry::new()));
        let client_factory = self.client_factory.unwrap_or_else(|| {
            Arc::new(HttpAdminClientFactory::new(self.config.client_options()))
        });

        let ctx = Arc::new(ServiceContext::new(
            route_repository,
            instance_repository,
            global_config_repository,
            history_repository,
            admin_registry,
            client_factory,
        ));

        let sync_service = Arc::new(SyncService::new(Arc::clone(&ctx)));
        let health_monitor = Arc::new(HealthMonitor::new(
            Arc::clone(&ctx),
            Arc::clone(&sync_service),
            self.config.health_monitor_config(),
        ));
        let instance_service = Arc::new(InstanceService::new(
            Arc::clone(&ctx),
            Arc::clone(&sync_service),
            Arc::clone(&health_monitor),
        ));
        let route_service = RouteService::new(Arc::clone(&ctx), Arc::clone(&sync_service));
        let global_config_service = GlobalConfigService::new(
            Arc::clone(&ctx),
            Arc::clone(&sync_service),
            Arc::clone(&instance_service),
        );
        let history_service = HistoryService::new(Arc::clone(&ctx));

        Ok(AppState {
            ctx,
            sync_service,
            health_monitor,
            instance_service,
            route_service,
            global_config_service,
            history_service,
            restore_completed: AtomicBool::new(false),
            config: self.config,
        })
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
