//! Route service
//!
//! Every mutation is persisted first, then synced to the owning instance
//! inside the same per-instance critical section.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{CoreError, CoreResult};
use crate::services::validation::{validate_route, RouteFields};
use crate::services::{ServiceContext, SyncService};
use crate::types::{
    CreateRouteRequest, MutationResult, Route, UpdateRouteRequest, DEFAULT_INSTANCE_ID,
};

/// Route service
pub struct RouteService {
    ctx: Arc<ServiceContext>,
    sync: Arc<SyncService>,
}

impl RouteService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>, sync: Arc<SyncService>) -> Self {
        Self { ctx, sync }
    }

    // ===== Queries =====

    /// Get route based on ID
    pub async fn get_route(&self, route_id: &str) -> CoreResult<Option<Route>> {
        self.ctx.route_repository().find_by_id(route_id).await
    }

    /// List routes, optionally of one instance, in config order
    pub async fn list_routes(&self, instance_id: Option<&str>) -> CoreResult<Vec<Route>> {
        let mut routes = match instance_id {
            Some(id) => self.ctx.route_repository().find_by_instance(id).await?,
            None => self.ctx.route_repository().find_all().await?,
        };
        routes.sort_by(|a, b| {
            a.instance_id
                .cmp(&b.instance_id)
                .then_with(|| a.sort_key().cmp(&b.sort_key()))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(routes)
    }

    // ===== Mutations =====

    /// Create a route and sync its instance
    pub async fn create_route(
        &self,
        request: CreateRouteRequest,
        actor: &str,
    ) -> CoreResult<MutationResult<Route>> {
        let instance_id = request
            .instance_id
            .clone()
            .unwrap_or_else(|| DEFAULT_INSTANCE_ID.to_string());

        validate_route(&RouteFields {
            domain: &request.domain,
            path: request.path.as_deref(),
            strip_prefix: request.strip_prefix.as_deref(),
            handler: &request.handler,
            headers: request.headers.as_ref(),
        })?;
        self.ensure_instance(&instance_id).await?;

        let now = Utc::now();
        let route = Route {
            id: uuid::Uuid::new_v4().to_string(),
            instance_id: instance_id.clone(),
            domain: request.domain.trim().to_string(),
            path: request.path,
            strip_prefix: request.strip_prefix,
            handler: request.handler,
            headers: request.headers,
            enabled: request.enabled,
            created_at: now,
            updated_at: now,
        };

        let result = self
            .sync
            .run_mutation(&instance_id, actor, || async move {
                // Re-check under the lock; a concurrent instance delete wins.
                self.ctx.require_instance(&route.instance_id).await?;
                let mut route = route;
                route.created_at = Utc::now();
                route.updated_at = route.created_at;
                self.ctx.route_repository().save(&route).await?;
                Ok(route)
            })
            .await?;

        log::info!(
            "Route {} created for {} on instance {instance_id}",
            result.data.id,
            result.data.domain
        );
        Ok(result)
    }

    /// Replace the mutable fields of a route and sync its instance
    ///
    /// `id`, `instance_id` and `created_at` never change.
    pub async fn update_route(
        &self,
        request: UpdateRouteRequest,
        actor: &str,
    ) -> CoreResult<MutationResult<Route>> {
        validate_route(&RouteFields {
            domain: &request.domain,
            path: request.path.as_deref(),
            strip_prefix: request.strip_prefix.as_deref(),
            handler: &request.handler,
            headers: request.headers.as_ref(),
        })?;
        let instance_id = self.require_route(&request.id).await?.instance_id;
        let UpdateRouteRequest {
            id,
            domain,
            path,
            strip_prefix,
            handler,
            headers,
            enabled,
        } = request;

        self.sync
            .run_mutation(&instance_id, actor, || async move {
                // Re-read under the lock; a concurrent delete wins.
                let mut route = self.require_route(&id).await?;
                route.domain = domain.trim().to_string();
                route.path = path;
                route.strip_prefix = strip_prefix;
                route.handler = handler;
                route.headers = headers;
                if let Some(enabled) = enabled {
                    route.enabled = enabled;
                }
                route.updated_at = Utc::now();
                self.ctx.route_repository().save(&route).await?;
                Ok(route)
            })
            .await
    }

    /// Delete a route and sync its instance; returns the deleted route
    pub async fn delete_route(
        &self,
        route_id: &str,
        actor: &str,
    ) -> CoreResult<MutationResult<Route>> {
        let instance_id = self.require_route(route_id).await?.instance_id;

        let result = self
            .sync
            .run_mutation(&instance_id, actor, || async move {
                let route = self.require_route(route_id).await?;
                self.ctx.route_repository().delete(route_id).await?;
                Ok(route)
            })
            .await?;

        log::info!("Route {route_id} deleted from instance {instance_id}");
        Ok(result)
    }

    /// Flip the enabled flag of a route and sync its instance
    pub async fn toggle_route(
        &self,
        route_id: &str,
        actor: &str,
    ) -> CoreResult<MutationResult<Route>> {
        let instance_id = self.require_route(route_id).await?.instance_id;

        self.sync
            .run_mutation(&instance_id, actor, || async move {
                let mut route = self.require_route(route_id).await?;
                route.enabled = !route.enabled;
                route.updated_at = Utc::now();
                self.ctx.route_repository().save(&route).await?;
                log::info!(
                    "Route {route_id} {}",
                    if route.enabled { "enabled" } else { "disabled" }
                );
                Ok(route)
            })
            .await
    }

    // ===== Helpers =====

    async fn require_route(&self, route_id: &str) -> CoreResult<Route> {
        self.ctx
            .route_repository()
            .find_by_id(route_id)
            .await?
            .ok_or_else(|| CoreError::RouteNotFound(route_id.to_string()))
    }

    async fn ensure_instance(&self, instance_id: &str) -> CoreResult<()> {
        if self
            .ctx
            .instance_repository()
            .find_by_id(instance_id)
            .await?
            .is_none()
        {
            return Err(CoreError::ValidationError(format!(
                "instance '{instance_id}' is not registered"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{harness, proxy_request, register_instance};
    use crate::traits::RouteRepository;
    use crate::types::{RedirectConfig, RouteHandler};

    fn update_from(route: &Route, domain: &str, upstream: &str) -> UpdateRouteRequest {
        UpdateRouteRequest {
            id: route.id.clone(),
            domain: domain.to_string(),
            path: route.path.clone(),
            strip_prefix: route.strip_prefix.clone(),
            handler: RouteHandler::ReverseProxy(crate::types::ReverseProxyConfig {
                upstreams: vec![upstream.to_string()],
                ..Default::default()
            }),
            headers: None,
            enabled: None,
        }
    }

    #[tokio::test]
    async fn create_route_end_to_end() {
        let h = harness();
        let client = register_instance(&h, "default", "http://localhost:2019").await;

        let mut request = proxy_request("default", "api.example.com", &["127.0.0.1:9000"]);
        request.instance_id = None;
        let result = h.routes.create_route(request, "alice").await.unwrap();

        assert_eq!(result.data.instance_id, "default");
        assert!(result.warning.is_none());
        assert!(result.sync.as_ref().unwrap().applied);

        let applied = serde_json::to_value(client.last_applied().await.unwrap()).unwrap();
        assert_eq!(applied["admin"]["listen"], ":2019");
        let route = &applied["apps"]["http"]["servers"]["srv0"]["routes"][0];
        assert_eq!(route["match"][0]["host"][0], "api.example.com");
        assert_eq!(route["handle"][0]["handler"], "reverse_proxy");
        assert_eq!(route["handle"][0]["upstreams"][0]["dial"], "127.0.0.1:9000");
    }

    #[tokio::test]
    async fn create_route_rejects_invalid_input_before_store() {
        let h = harness();
        register_instance(&h, "edge", "http://edge:2019").await;

        let mut bad_domain = proxy_request("edge", "https://a.com", &["a:80"]);
        bad_domain.domain = "https://a.com".to_string();
        assert!(matches!(
            h.routes.create_route(bad_domain, "alice").await,
            Err(CoreError::ValidationError(_))
        ));

        let unknown_instance = proxy_request("nowhere", "a.com", &["a:80"]);
        assert!(matches!(
            h.routes.create_route(unknown_instance, "alice").await,
            Err(CoreError::ValidationError(_))
        ));

        assert!(RouteRepository::find_all(h.store.as_ref())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(h.store.history_count("edge").await, 0);
    }

    #[tokio::test]
    async fn update_keeps_identity_fields() {
        let h = harness();
        register_instance(&h, "edge", "http://edge:2019").await;
        let created = h
            .routes
            .create_route(proxy_request("edge", "a.com", &["a:80"]), "alice")
            .await
            .unwrap()
            .data;

        let updated = h
            .routes
            .update_route(update_from(&created, "b.com", "b:80"), "alice")
            .await
            .unwrap()
            .data;

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.instance_id, created.instance_id);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.domain, "b.com");
        assert!(updated.enabled);
    }

    #[tokio::test]
    async fn concurrent_updates_are_serialized() {
        let h = harness();
        let client = register_instance(&h, "edge", "http://edge:2019").await;
        let created = h
            .routes
            .create_route(proxy_request("edge", "a.com", &["a:80"]), "alice")
            .await
            .unwrap()
            .data;
        let history_before = h.store.history_count("edge").await;

        let (first, second) = tokio::join!(
            h.routes
                .update_route(update_from(&created, "first.com", "f:80"), "alice"),
            h.routes
                .update_route(update_from(&created, "second.com", "s:80"), "bob"),
        );
        let first = first.unwrap().data;
        let second = second.unwrap().data;

        assert_eq!(h.store.history_count("edge").await, history_before + 2);

        let last = if first.updated_at > second.updated_at {
            first
        } else {
            second
        };
        let stored = RouteRepository::find_by_id(h.store.as_ref(), &created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, last);

        // The instance runs the config of the last write.
        let applied = client.last_applied().await.unwrap();
        assert_eq!(applied.routes()[0].matchers[0].host[0], last.domain);
    }

    #[tokio::test]
    async fn toggle_hides_route_from_config() {
        let h = harness();
        let client = register_instance(&h, "edge", "http://edge:2019").await;
        let created = h
            .routes
            .create_route(proxy_request("edge", "a.com", &["a:80"]), "alice")
            .await
            .unwrap()
            .data;

        let toggled = h.routes.toggle_route(&created.id, "alice").await.unwrap();
        assert!(!toggled.data.enabled);
        assert!(client.last_applied().await.unwrap().routes().is_empty());

        let toggled = h.routes.toggle_route(&created.id, "alice").await.unwrap();
        assert!(toggled.data.enabled);
        assert_eq!(client.last_applied().await.unwrap().routes().len(), 1);
    }

    #[tokio::test]
    async fn delete_route_removes_it_from_store_and_config() {
        let h = harness();
        let client = register_instance(&h, "edge", "http://edge:2019").await;
        let created = h
            .routes
            .create_route(proxy_request("edge", "a.com", &["a:80"]), "alice")
            .await
            .unwrap()
            .data;

        let deleted = h.routes.delete_route(&created.id, "alice").await.unwrap();

        assert_eq!(deleted.data.id, created.id);
        assert!(h.routes.get_route(&created.id).await.unwrap().is_none());
        assert!(client.last_applied().await.unwrap().routes().is_empty());
        assert!(matches!(
            h.routes.delete_route(&created.id, "alice").await,
            Err(CoreError::RouteNotFound(_))
        ));
    }

    #[tokio::test]
    async fn incomplete_route_is_saved_and_reported_as_skipped() {
        let h = harness();
        register_instance(&h, "edge", "http://edge:2019").await;
        let mut request = proxy_request("edge", "old.example.com", &[]);
        request.handler = RouteHandler::Redirect(RedirectConfig::default());

        let result = h.routes.create_route(request, "alice").await.unwrap();

        let report = result.sync.unwrap();
        assert!(report.applied);
        assert_eq!(report.route_count, 0);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].route_id, result.data.id);
    }

    #[tokio::test]
    async fn list_routes_filters_by_instance_in_config_order() {
        let h = harness();
        register_instance(&h, "a", "http://a:2019").await;
        register_instance(&h, "b", "http://b:2019").await;
        for (instance, domain) in [("a", "z.com"), ("b", "m.com"), ("a", "c.com")] {
            h.routes
                .create_route(proxy_request(instance, domain, &["x:80"]), "alice")
                .await
                .unwrap();
        }

        let domains: Vec<String> = h
            .routes
            .list_routes(Some("a"))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.domain)
            .collect();
        assert_eq!(domains, vec!["c.com", "z.com"]);
        assert_eq!(h.routes.list_routes(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn create_route_loses_to_concurrent_instance_delete() {
        let h = harness();
        register_instance(&h, "edge", "http://edge:2019").await;

        let guard = h.sync.lock_instance("edge").await;
        let (deleted, created, ()) = tokio::join!(
            h.instances.delete_instance("edge", false),
            h.routes
                .create_route(proxy_request("edge", "a.com", &["a:80"]), "alice"),
            async {
                tokio::task::yield_now().await;
                drop(guard);
            }
        );

        deleted.unwrap();
        assert!(matches!(created, Err(CoreError::InstanceNotFound(_))));
        assert!(h.instances.get_instance("edge").await.unwrap().is_none());
        assert!(h.store.find_by_instance("edge").await.unwrap().is_empty());
    }
}
