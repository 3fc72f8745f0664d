//! Admin client registry abstract Trait

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use caddy_orchestrator_admin::{create_admin_client, AdminApi, ClientOptions};

/// Admin Client Registry Trait
///
/// Holds one admin client per instance, indexed by `instance_id`.
/// Provides a default memory implementation `InMemoryAdminClientRegistry`.
#[async_trait]
pub trait AdminClientRegistry: Send + Sync {
    /// Register (or replace) the client of an instance
    async fn register(&self, instance_id: String, client: Arc<dyn AdminApi>);

    /// Remove the client of an instance
    async fn unregister(&self, instance_id: &str);

    /// Get the client of an instance
    async fn get(&self, instance_id: &str) -> Option<Arc<dyn AdminApi>>;

    /// List all registered `instance_id`
    async fn list_instance_ids(&self) -> Vec<String>;
}

/// In-memory admin client registry
#[derive(Clone)]
pub struct InMemoryAdminClientRegistry {
    clients: Arc<RwLock<HashMap<String, Arc<dyn AdminApi>>>>,
}

impl InMemoryAdminClientRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryAdminClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdminClientRegistry for InMemoryAdminClientRegistry {
    async fn register(&self, instance_id: String, client: Arc<dyn AdminApi>) {
        self.clients.write().await.insert(instance_id, client);
    }

    async fn unregister(&self, instance_id: &str) {
        self.clients.write().await.remove(instance_id);
    }

    async fn get(&self, instance_id: &str) -> Option<Arc<dyn AdminApi>> {
        self.clients.read().await.get(instance_id).cloned()
    }

    async fn list_instance_ids(&self) -> Vec<String> {
        self.clients.read().await.keys().cloned().collect()
    }
}

/// Builds admin clients from base URLs.
///
/// Validates the URL as a side effect: an invalid URL yields
/// `AdminError::InvalidUrl`.
pub trait AdminClientFactory: Send + Sync {
    fn create(&self, base_url: &str) -> caddy_orchestrator_admin::Result<Arc<dyn AdminApi>>;
}

/// Factory producing reqwest-backed clients.
#[derive(Debug, Clone, Default)]
pub struct HttpAdminClientFactory {
    options: ClientOptions,
}

impl HttpAdminClientFactory {
    #[must_use]
    pub fn new(options: ClientOptions) -> Self {
        Self { options }
    }
}

impl AdminClientFactory for HttpAdminClientFactory {
    fn create(&self, base_url: &str) -> caddy_orchestrator_admin::Result<Arc<dyn AdminApi>> {
        create_admin_client(base_url, &self.options)
    }
}
