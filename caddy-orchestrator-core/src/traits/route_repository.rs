//! Route persistence abstract Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::Route;

/// Route Repository Trait
///
/// Platform implementation:
/// - `InMemoryStore` (tokio `RwLock` maps)
/// - `SqliteStore` (`SeaORM`)
#[async_trait]
pub trait RouteRepository: Send + Sync {
    /// Get all routes of all instances
    async fn find_all(&self) -> CoreResult<Vec<Route>>;

    /// Get the routes owned by one instance
    async fn find_by_instance(&self, instance_id: &str) -> CoreResult<Vec<Route>>;

    /// Get route based on ID
    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Route>>;

    /// Save route (new or update); the whole row is replaced
    async fn save(&self, route: &Route) -> CoreResult<()>;

    /// Delete route; deleting a missing route is not an error
    async fn delete(&self, id: &str) -> CoreResult<()>;

    /// Delete every route of an instance
    async fn delete_by_instance(&self, instance_id: &str) -> CoreResult<()>;
}
