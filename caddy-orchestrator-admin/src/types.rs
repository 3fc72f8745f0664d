//! Typed model of the Caddy JSON configuration document.
//!
//! Only the subset the orchestrator emits is modelled. Every map is a
//! `BTreeMap` so that serializing the same tree always yields the same bytes.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Address the admin endpoint is pinned to in every generated config.
///
/// Caddy's default admin listener is loopback only, with a `Host` check to
/// match. Instances managed over the network must keep listening on every
/// interface after a load, so the port is pinned on the wildcard address,
/// which also disables the host check.
pub const ADMIN_LISTEN_ADDRESS: &str = ":2019";

/// Name of the single HTTP server emitted by the builder.
pub const DEFAULT_SERVER_NAME: &str = "srv0";

/// Listen addresses of the generated HTTP server.
pub const DEFAULT_LISTEN: [&str; 2] = [":80", ":443"];

/// An empty JSON object (`{}`), used where Caddy expects a module with no options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Root of the configuration document (`POST /load` body).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaddyConfig {
    pub admin: AdminConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apps: Option<Apps>,
}

impl CaddyConfig {
    /// A config that only keeps the admin endpoint alive and serves nothing.
    #[must_use]
    pub fn admin_only() -> Self {
        Self {
            admin: AdminConfig::default(),
            apps: None,
        }
    }

    /// Routes of the default server, in emission order.
    #[must_use]
    pub fn routes(&self) -> &[CaddyRoute] {
        self.apps
            .as_ref()
            .and_then(|apps| apps.http.servers.get(DEFAULT_SERVER_NAME))
            .map_or(&[], |server| server.routes.as_slice())
    }

    /// Serialize to compact JSON. Equal trees always produce identical bytes.
    pub fn to_canonical_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// `admin` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfig {
    pub listen: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            listen: ADMIN_LISTEN_ADDRESS.to_string(),
        }
    }
}

/// `apps` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Apps {
    pub http: HttpApp,
}

/// `apps.http` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpApp {
    pub servers: BTreeMap<String, HttpServer>,
}

/// One virtual server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpServer {
    pub listen: Vec<String>,
    pub routes: Vec<CaddyRoute>,
}

/// A route inside a server: matcher sets, handler chain, terminal flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaddyRoute {
    #[serde(rename = "match", default, skip_serializing_if = "Vec::is_empty")]
    pub matchers: Vec<MatcherSet>,
    pub handle: Vec<Handler>,
    #[serde(default)]
    pub terminal: bool,
}

/// A matcher set; all present matchers must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherSet {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
}

/// Header operations shared by the `headers` handler and reverse-proxy header rewrites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderOps {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub set: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub add: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delete: Vec<String>,
}

impl HeaderOps {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.add.is_empty() && self.delete.is_empty()
    }
}

/// Request-side header rewrites of a `reverse_proxy` handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyHeaders {
    pub request: HeaderOps,
}

/// One upstream of a `reverse_proxy` handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upstream {
    pub dial: String,
}

/// `load_balancing` block of a `reverse_proxy` handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancing {
    pub selection_policy: SelectionPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionPolicy {
    pub policy: String,
}

/// HTTP handler modules, tagged by Caddy's `handler` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "handler", rename_all = "snake_case")]
pub enum Handler {
    /// Response compression.
    Encode {
        encodings: BTreeMap<String, Empty>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        prefer: Vec<String>,
    },
    /// Response header manipulation.
    Headers { response: HeaderOps },
    /// URI rewrite; only prefix stripping is emitted.
    Rewrite { strip_path_prefix: String },
    ReverseProxy {
        upstreams: Vec<Upstream>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        headers: Option<ProxyHeaders>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        load_balancing: Option<LoadBalancing>,
        /// `-1` flushes immediately, needed for long-lived upgraded connections.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flush_interval: Option<i64>,
    },
    FileServer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        root: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        browse: Option<Empty>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        index_names: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        hide: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        precompressed: Option<BTreeMap<String, Empty>>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        precompressed_order: Vec<String>,
    },
    StaticResponse {
        status_code: u16,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, Vec<String>>,
    },
}

impl Handler {
    /// Caddy module name of this handler.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Encode { .. } => "encode",
            Self::Headers { .. } => "headers",
            Self::Rewrite { .. } => "rewrite",
            Self::ReverseProxy { .. } => "reverse_proxy",
            Self::FileServer { .. } => "file_server",
            Self::StaticResponse { .. } => "static_response",
        }
    }
}

/// Timeouts applied to every admin API request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_only_config_has_no_apps() {
        let json = serde_json::to_value(CaddyConfig::admin_only()).unwrap();
        assert_eq!(json["admin"]["listen"], ":2019");
        assert!(json.get("apps").is_none());
    }

    #[test]
    fn handler_is_tagged_by_module_name() {
        let handler = Handler::StaticResponse {
            status_code: 301,
            headers: BTreeMap::from([(
                "Location".to_string(),
                vec!["https://example.com".to_string()],
            )]),
        };
        let json = serde_json::to_value(&handler).unwrap();
        assert_eq!(json["handler"], "static_response");
        assert_eq!(json["status_code"], 301);
        assert_eq!(json["headers"]["Location"][0], "https://example.com");
        assert_eq!(handler.name(), "static_response");
    }

    #[test]
    fn route_serializes_match_keyword() {
        let route = CaddyRoute {
            matchers: vec![MatcherSet {
                host: vec!["a.com".to_string()],
                path: Vec::new(),
            }],
            handle: vec![Handler::Rewrite {
                strip_path_prefix: "/api".to_string(),
            }],
            terminal: true,
        };
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(json["match"][0]["host"][0], "a.com");
        assert!(json["match"][0].get("path").is_none());
        assert_eq!(json["terminal"], true);
    }

    #[test]
    fn parses_live_config_written_by_caddy() {
        let raw = r#"{
            "admin": {"listen": "localhost:2019"},
            "apps": {"http": {"servers": {"srv0": {
                "listen": [":443"],
                "routes": [{
                    "match": [{"host": ["x.com"]}],
                    "handle": [{"handler": "reverse_proxy", "upstreams": [{"dial": "10.0.0.1:80"}]}],
                    "terminal": true
                }]
            }}}}
        }"#;
        let config: CaddyConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.routes().len(), 1);
        assert_eq!(config.routes()[0].handle[0].name(), "reverse_proxy");
    }
}
