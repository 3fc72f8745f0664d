//! Test helper module
//!
//! Mock implementations and convenient factories for service tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use caddy_orchestrator_admin::{normalize_admin_url, AdminApi, AdminError, CaddyConfig};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{CoreError, CoreResult};
use crate::services::{
    GlobalConfigService, HealthMonitor, HealthMonitorConfig, HistoryService, InstanceService,
    RouteService, ServiceContext, SyncService,
};
use crate::traits::{
    AdminClientFactory, GlobalConfigRepository, HistoryRepository, InMemoryAdminClientRegistry,
    InstanceRepository, RouteRepository,
};
use crate::types::{
    CreateRouteRequest, EditHistory, GlobalConfig, Instance, InstanceHealth, ReverseProxyConfig,
    Route, RouteHandler,
};

// ===== MockStore =====

/// All four repositories over plain maps.
pub struct MockStore {
    routes: RwLock<HashMap<String, Route>>,
    instances: RwLock<HashMap<String, Instance>>,
    globals: RwLock<HashMap<String, GlobalConfig>>,
    history: RwLock<Vec<EditHistory>>,
    /// If Some, route saves fail with this error
    save_error: RwLock<Option<String>>,
    /// If Some, history appends fail with this error
    history_error: RwLock<Option<String>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
            instances: RwLock::new(HashMap::new()),
            globals: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
            save_error: RwLock::new(None),
            history_error: RwLock::new(None),
        }
    }

    pub async fn set_save_error(&self, err: Option<String>) {
        *self.save_error.write().await = err;
    }

    pub async fn set_history_error(&self, err: Option<String>) {
        *self.history_error.write().await = err;
    }

    pub async fn history_count(&self, instance_id: &str) -> usize {
        self.history
            .read()
            .await
            .iter()
            .filter(|e| e.instance_id == instance_id)
            .count()
    }
}

#[async_trait]
impl RouteRepository for MockStore {
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
        if let Some(ref msg) = *self.save_error.read().await {
            return Err(CoreError::StorageError(msg.clone()));
        }
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
impl InstanceRepository for MockStore {
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
        let mut store = self.instances.write().await;
        let instance = store
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
        let mut store = self.instances.write().await;
        let instance = store
            .get_mut(id)
            .ok_or_else(|| CoreError::InstanceNotFound(id.to_string()))?;
        instance.name = name.to_string();
        instance.admin_url = admin_url.to_string();
        instance.updated_at = updated_at;
        Ok(())
    }

    async fn set_sync_pending(&self, id: &str, pending: bool) -> CoreResult<()> {
        let mut store = self.instances.write().await;
        let instance = store
            .get_mut(id)
            .ok_or_else(|| CoreError::InstanceNotFound(id.to_string()))?;
        instance.sync_pending = pending;
        Ok(())
    }
}

#[async_trait]
impl GlobalConfigRepository for MockStore {
    async fn get(&self, instance_id: &str) -> CoreResult<Option<GlobalConfig>> {
        Ok(self.globals.read().await.get(instance_id).cloned())
    }

    async fn set(&self, config: &GlobalConfig) -> CoreResult<()> {
        self.globals
            .write()
            .await
            .insert(config.instance_id.clone(), config.clone());
        Ok(())
    }

    async fn delete(&self, instance_id: &str) -> CoreResult<()> {
        self.globals.write().await.remove(instance_id);
        Ok(())
    }
}

#[async_trait]
impl HistoryRepository for MockStore {
    async fn append(&self, entry: &EditHistory) -> CoreResult<()> {
        if let Some(ref msg) = *self.history_error.read().await {
            return Err(CoreError::StorageError(msg.clone()));
        }
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
        Ok(self.history.read().await.iter().find(|e| e.id == id).cloned())
    }

    async fn delete_by_instance(&self, instance_id: &str) -> CoreResult<()> {
        self.history
            .write()
            .await
            .retain(|e| e.instance_id != instance_id);
        Ok(())
    }
}

// ===== MockAdminClient =====

/// Fake Caddy admin endpoint. A successful apply becomes the live config.
pub struct MockAdminClient {
    base_url: String,
    live: RwLock<Value>,
    applied: RwLock<Vec<CaddyConfig>>,
    apply_error: RwLock<Option<AdminError>>,
    unreachable: RwLock<bool>,
    health_delay: RwLock<Duration>,
    health_calls: AtomicUsize,
}

impl MockAdminClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            live: RwLock::new(Value::Null),
            applied: RwLock::new(Vec::new()),
            apply_error: RwLock::new(None),
            unreachable: RwLock::new(false),
            health_delay: RwLock::new(Duration::ZERO),
            health_calls: AtomicUsize::new(0),
        }
    }

    fn transport_error(&self) -> AdminError {
        AdminError::Transport {
            instance: self.base_url.clone(),
            detail: "connection refused".to_string(),
        }
    }

    /// Every call fails at the transport level while set.
    pub async fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.write().await = unreachable;
    }

    pub async fn set_apply_error(&self, err: Option<AdminError>) {
        *self.apply_error.write().await = err;
    }

    /// Simulate an edit made directly against the instance.
    pub async fn set_live(&self, config: Value) {
        *self.live.write().await = config;
    }

    pub async fn set_health_delay(&self, delay: Duration) {
        *self.health_delay.write().await = delay;
    }

    pub async fn applied_count(&self) -> usize {
        self.applied.read().await.len()
    }

    pub async fn last_applied(&self) -> Option<CaddyConfig> {
        self.applied.read().await.last().cloned()
    }

    pub fn health_calls(&self) -> usize {
        self.health_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdminApi for MockAdminClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_config(&self) -> caddy_orchestrator_admin::Result<Value> {
        if *self.unreachable.read().await {
            return Err(self.transport_error());
        }
        Ok(self.live.read().await.clone())
    }

    async fn apply_config(&self, config: &CaddyConfig) -> caddy_orchestrator_admin::Result<()> {
        if *self.unreachable.read().await {
            return Err(self.transport_error());
        }
        if let Some(err) = self.apply_error.read().await.clone() {
            return Err(err);
        }
        *self.live.write().await = serde_json::to_value(config).unwrap();
        self.applied.write().await.push(config.clone());
        Ok(())
    }

    async fn health(&self) -> caddy_orchestrator_admin::Result<()> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.health_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if *self.unreachable.read().await {
            return Err(self.transport_error());
        }
        Ok(())
    }
}

// ===== MockClientFactory =====

/// Hands out one shared [`MockAdminClient`] per normalized URL.
pub struct MockClientFactory {
    clients: StdMutex<HashMap<String, Arc<MockAdminClient>>>,
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self {
            clients: StdMutex::new(HashMap::new()),
        }
    }

    /// The mock serving `base_url`, created on first use.
    pub fn client(&self, base_url: &str) -> Arc<MockAdminClient> {
        let url = normalize_admin_url(base_url).unwrap();
        Arc::clone(
            self.clients
                .lock()
                .unwrap()
                .entry(url.clone())
                .or_insert_with(|| Arc::new(MockAdminClient::new(&url))),
        )
    }
}

impl AdminClientFactory for MockClientFactory {
    fn create(&self, base_url: &str) -> caddy_orchestrator_admin::Result<Arc<dyn AdminApi>> {
        normalize_admin_url(base_url)?;
        let client: Arc<dyn AdminApi> = self.client(base_url);
        Ok(client)
    }
}

// ===== Factory methods =====

/// Fully wired services over [`MockStore`] and [`MockClientFactory`].
pub struct TestHarness {
    pub store: Arc<MockStore>,
    pub factory: Arc<MockClientFactory>,
    pub ctx: Arc<ServiceContext>,
    pub sync: Arc<SyncService>,
    pub monitor: Arc<HealthMonitor>,
    pub instances: Arc<InstanceService>,
    pub routes: RouteService,
    pub globals: GlobalConfigService,
    pub history: HistoryService,
}

/// Monitor settings that keep background probes out of the way of a test.
pub fn quiet_monitor_config() -> HealthMonitorConfig {
    HealthMonitorConfig {
        interval: Duration::from_secs(3600),
        timeout: Duration::from_millis(200),
        actor: "monitor".to_string(),
    }
}

pub fn harness() -> TestHarness {
    harness_with_monitor(quiet_monitor_config())
}

pub fn harness_with_monitor(monitor_config: HealthMonitorConfig) -> TestHarness {
    let store = Arc::new(MockStore::new());
    let factory = Arc::new(MockClientFactory::new());

    let ctx = Arc::new(ServiceContext::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(InMemoryAdminClientRegistry::new()),
        factory.clone(),
    ));
    let sync = Arc::new(SyncService::new(ctx.clone()));
    let monitor = Arc::new(HealthMonitor::new(ctx.clone(), sync.clone(), monitor_config));
    let instances = Arc::new(InstanceService::new(
        ctx.clone(),
        sync.clone(),
        monitor.clone(),
    ));

    TestHarness {
        routes: RouteService::new(ctx.clone(), sync.clone()),
        globals: GlobalConfigService::new(ctx.clone(), sync.clone(), instances.clone()),
        history: HistoryService::new(ctx.clone()),
        store,
        factory,
        ctx,
        sync,
        monitor,
        instances,
    }
}

/// Store an instance and register its mock client, without starting a monitor.
pub async fn register_instance(h: &TestHarness, id: &str, admin_url: &str) -> Arc<MockAdminClient> {
    let client = h.factory.client(admin_url);
    let instance = Instance::new(id.to_string(), id.to_uppercase(), client.base_url().to_string());
    InstanceRepository::save(h.store.as_ref(), &instance)
        .await
        .unwrap();
    h.store
        .set(&GlobalConfig::new(id, client.base_url()))
        .await
        .unwrap();
    h.ctx
        .admin_registry()
        .register(id.to_string(), client.clone())
        .await;
    client
}

pub fn proxy_request(instance_id: &str, domain: &str, upstreams: &[&str]) -> CreateRouteRequest {
    CreateRouteRequest {
        instance_id: Some(instance_id.to_string()),
        domain: domain.to_string(),
        path: None,
        strip_prefix: None,
        handler: RouteHandler::ReverseProxy(ReverseProxyConfig {
            upstreams: upstreams.iter().map(ToString::to_string).collect(),
            ..ReverseProxyConfig::default()
        }),
        headers: None,
        enabled: true,
    }
}
