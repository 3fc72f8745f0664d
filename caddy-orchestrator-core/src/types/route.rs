//! Route model

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default load-balancing policy; omitted from generated configs.
pub const DEFAULT_LB_POLICY: &str = "round_robin";

/// Default status code of a redirect route.
pub const DEFAULT_REDIRECT_STATUS: u16 = 302;

/// `reverse_proxy` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverseProxyConfig {
    /// Upstream dial addresses, in order
    pub upstreams: Vec<String>,
    /// Static request headers set on proxied requests
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Load-balancing policy name (`round_robin` when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lb_policy: Option<String>,
    /// Flush responses immediately for upgraded connections
    pub websocket: bool,
}

/// `file_server` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileServerConfig {
    /// Site root; the server default is used when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    pub browse: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub index_names: Vec<String>,
    /// File patterns never served
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hide: Vec<String>,
    /// Serve pre-compressed sidecar files (`.zst`, `.gz`)
    pub precompressed: bool,
}

/// `redir` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectConfig {
    /// Destination URL
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl RedirectConfig {
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status_code.unwrap_or(DEFAULT_REDIRECT_STATUS)
    }
}

/// Response header rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// Overwrite
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub set: BTreeMap<String, String>,
    /// Append
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub add: BTreeMap<String, String>,
    /// Remove by name
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub delete: Vec<String>,
}

impl HeaderConfig {
    /// An empty rule set behaves exactly like no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.add.is_empty() && self.delete.is_empty()
    }
}

/// Terminal handler of a route, keyed by handler type.
///
/// Serialized as `{"handler_type": "...", "config": {...}}`. Unknown handler
/// types decode into [`RouteHandler::Unsupported`] so stored rows written by
/// other versions never fail to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRouteHandler", into = "RawRouteHandler")]
pub enum RouteHandler {
    ReverseProxy(ReverseProxyConfig),
    FileServer(FileServerConfig),
    Redirect(RedirectConfig),
    Unsupported { handler_type: String, config: Value },
}

impl RouteHandler {
    pub const REVERSE_PROXY: &'static str = "reverse_proxy";
    pub const FILE_SERVER: &'static str = "file_server";
    pub const REDIRECT: &'static str = "redir";

    /// Handler type tag as stored.
    #[must_use]
    pub fn handler_type(&self) -> &str {
        match self {
            Self::ReverseProxy(_) => Self::REVERSE_PROXY,
            Self::FileServer(_) => Self::FILE_SERVER,
            Self::Redirect(_) => Self::REDIRECT,
            Self::Unsupported { handler_type, .. } => handler_type,
        }
    }

    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported { .. })
    }
}

/// Wire shape of [`RouteHandler`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawRouteHandler {
    handler_type: String,
    #[serde(default)]
    config: Value,
}

fn decode_config<T>(handler_type: &str, config: Value) -> Result<T, String>
where
    T: serde::de::DeserializeOwned + Default,
{
    if config.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(config).map_err(|e| format!("invalid {handler_type} config: {e}"))
}

impl TryFrom<RawRouteHandler> for RouteHandler {
    type Error = String;

    fn try_from(raw: RawRouteHandler) -> Result<Self, Self::Error> {
        let RawRouteHandler {
            handler_type,
            config,
        } = raw;
        match handler_type.as_str() {
            Self::REVERSE_PROXY => decode_config(&handler_type, config).map(Self::ReverseProxy),
            Self::FILE_SERVER => decode_config(&handler_type, config).map(Self::FileServer),
            Self::REDIRECT => decode_config(&handler_type, config).map(Self::Redirect),
            _ => Ok(Self::Unsupported {
                handler_type,
                config,
            }),
        }
    }
}

impl From<RouteHandler> for RawRouteHandler {
    fn from(handler: RouteHandler) -> Self {
        let handler_type = handler.handler_type().to_string();
        // Payload structs hold only strings, bools and maps; encoding cannot fail.
        let config = match handler {
            RouteHandler::ReverseProxy(c) => serde_json::to_value(c),
            RouteHandler::FileServer(c) => serde_json::to_value(c),
            RouteHandler::Redirect(c) => serde_json::to_value(c),
            RouteHandler::Unsupported { config, .. } => Ok(config),
        }
        .unwrap_or(Value::Null);
        Self {
            handler_type,
            config,
        }
    }
}

/// A declarative domain/path match-and-handle rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Route ID (UUID), immutable
    pub id: String,
    /// Owning instance, immutable
    pub instance_id: String,
    /// Host match
    pub domain: String,
    /// Optional path match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Prefix removed from the request path before the handler runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip_prefix: Option<String>,
    #[serde(flatten)]
    pub handler: RouteHandler,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HeaderConfig>,
    pub enabled: bool,
    #[serde(with = "crate::utils::datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::utils::datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Route {
    /// Sort key of the config builder.
    #[must_use]
    pub fn sort_key(&self) -> (&str, &str) {
        (self.domain.as_str(), self.path.as_deref().unwrap_or(""))
    }
}

fn default_enabled() -> bool {
    true
}

/// Create route request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRouteRequest {
    /// Target instance; the single-instance default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    pub domain: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub strip_prefix: Option<String>,
    #[serde(flatten)]
    pub handler: RouteHandler,
    #[serde(default)]
    pub headers: Option<HeaderConfig>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Update route request
///
/// Replaces every mutable field; `enabled` is kept when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRouteRequest {
    pub id: String,
    pub domain: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub strip_prefix: Option<String>,
    #[serde(flatten)]
    pub handler: RouteHandler,
    #[serde(default)]
    pub headers: Option<HeaderConfig>,
    #[serde(default)]
    pub enabled: Option<bool>,
}
