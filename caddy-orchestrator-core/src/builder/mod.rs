//! Config builder
//!
//! Turns the stored routes of one instance plus its [`GlobalConfig`] into the
//! Caddy JSON document pushed through `POST /load`.
//!
//! The builder is pure and total: it does no I/O and never fails. Routes that
//! cannot be rendered are left out and reported in [`BuildOutput::skipped`].
//!
//! Output shape:
//!
//! ```json
//! {
//!   "admin": {"listen": ":2019"},
//!   "apps": {"http": {"servers": {"srv0": {
//!     "listen": [":80", ":443"],
//!     "routes": [{"match": [{"host": ["a.com"]}], "handle": [...], "terminal": true}]
//!   }}}}
//! }
//! ```
//!
//! Per route the handler chain is: `encode` (when enabled globally), `headers`
//! (when the route has rules), `rewrite` (when a prefix is stripped), then
//! exactly one content handler.

mod handlers;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use caddy_orchestrator_admin::{
    AdminConfig, Apps, CaddyConfig, CaddyRoute, HttpApp, HttpServer, MatcherSet, DEFAULT_LISTEN,
    DEFAULT_SERVER_NAME,
};

use crate::types::{GlobalConfig, Route};

/// Why a route was left out of the generated config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// `reverse_proxy` route without a usable upstream
    NoUpstreams,
    /// `redir` route without a destination
    MissingRedirectTarget,
    /// Handler type the builder cannot render
    UnsupportedHandler(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoUpstreams => write!(f, "reverse_proxy route has no upstreams"),
            Self::MissingRedirectTarget => write!(f, "redir route has no destination"),
            Self::UnsupportedHandler(handler_type) => {
                write!(f, "unsupported handler type '{handler_type}'")
            }
        }
    }
}

/// A route omitted from the generated config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRoute {
    pub route_id: String,
    pub domain: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Result of [`build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    pub config: CaddyConfig,
    pub skipped: Vec<SkippedRoute>,
}

impl BuildOutput {
    /// Number of routes rendered into the config.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.config.routes().len()
    }
}

/// Build the Caddy config of one instance.
///
/// Disabled routes are ignored. The rest are ordered by `(domain, path)`
/// (route ID breaks ties), so the output does not depend on input order.
/// With nothing to serve, only the admin block is emitted.
pub fn build(routes: &[Route], global: &GlobalConfig) -> BuildOutput {
    let mut enabled: Vec<&Route> = routes.iter().filter(|route| route.enabled).collect();
    enabled.sort_by(|a, b| {
        a.sort_key()
            .cmp(&b.sort_key())
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut rendered = Vec::with_capacity(enabled.len());
    let mut skipped = Vec::new();

    for route in enabled {
        match build_route(route, global) {
            Ok(caddy_route) => rendered.push(caddy_route),
            Err(reason) => {
                log::info!(
                    "Skipping route {} ({}) for instance {}: {reason}",
                    route.id,
                    route.domain,
                    route.instance_id
                );
                skipped.push(SkippedRoute {
                    route_id: route.id.clone(),
                    domain: route.domain.clone(),
                    reason,
                });
            }
        }
    }

    let config = if rendered.is_empty() {
        CaddyConfig::admin_only()
    } else {
        let server = HttpServer {
            listen: DEFAULT_LISTEN.iter().map(ToString::to_string).collect(),
            routes: rendered,
        };
        CaddyConfig {
            admin: AdminConfig::default(),
            apps: Some(Apps {
                http: HttpApp {
                    servers: BTreeMap::from([(DEFAULT_SERVER_NAME.to_string(), server)]),
                },
            }),
        }
    };

    BuildOutput { config, skipped }
}

fn build_route(route: &Route, global: &GlobalConfig) -> Result<CaddyRoute, SkipReason> {
    // Rendered first so a skipped route costs nothing else.
    let content = handlers::terminal(&route.handler)?;

    let mut handle = Vec::with_capacity(4);
    if global.enable_encode {
        handle.push(handlers::encode());
    }
    if let Some(headers) = route.headers.as_ref().and_then(handlers::headers) {
        handle.push(headers);
    }
    if let Some(rewrite) = route.strip_prefix.as_deref().and_then(handlers::strip_prefix) {
        handle.push(rewrite);
    }
    handle.push(content);

    let matcher = MatcherSet {
        host: vec![route.domain.trim().to_string()],
        path: route
            .path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(|path| vec![path.to_string()])
            .unwrap_or_default(),
    };

    Ok(CaddyRoute {
        matchers: vec![matcher],
        handle,
        terminal: true,
    })
}
