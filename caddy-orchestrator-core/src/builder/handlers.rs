//! Per-route handler rendering.

use std::collections::BTreeMap;

use caddy_orchestrator_admin::{
    Empty, Handler, HeaderOps, LoadBalancing, ProxyHeaders, SelectionPolicy, Upstream,
};

use super::SkipReason;
use crate::types::{
    FileServerConfig, HeaderConfig, RedirectConfig, ReverseProxyConfig, RouteHandler,
    DEFAULT_LB_POLICY,
};

/// Encodings offered by the compression handler, most preferred first.
const PREFERRED_ENCODINGS: [&str; 2] = ["zstd", "gzip"];

fn single_values(map: &BTreeMap<String, String>) -> BTreeMap<String, Vec<String>> {
    map.iter()
        .map(|(name, value)| (name.clone(), vec![value.clone()]))
        .collect()
}

fn non_blank(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn encodings() -> BTreeMap<String, Empty> {
    PREFERRED_ENCODINGS
        .iter()
        .map(|name| ((*name).to_string(), Empty {}))
        .collect()
}

pub(super) fn encode() -> Handler {
    Handler::Encode {
        encodings: encodings(),
        prefer: PREFERRED_ENCODINGS.iter().map(ToString::to_string).collect(),
    }
}

/// `None` for an empty rule set.
pub(super) fn headers(rules: &HeaderConfig) -> Option<Handler> {
    if rules.is_empty() {
        return None;
    }
    Some(Handler::Headers {
        response: HeaderOps {
            set: single_values(&rules.set),
            add: single_values(&rules.add),
            delete: rules.delete.clone(),
        },
    })
}

/// `None` when stripping would be a no-op.
pub(super) fn strip_prefix(prefix: &str) -> Option<Handler> {
    let prefix = prefix.trim();
    if prefix.is_empty() || prefix == "/" {
        return None;
    }
    Some(Handler::Rewrite {
        strip_path_prefix: prefix.to_string(),
    })
}

/// Upstream entry to dial address: trimmed, without an `http://` scheme.
fn dial_address(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("http://")
        .unwrap_or(trimmed)
        .trim_end_matches('/')
}

/// The content handler that ends the chain.
pub(super) fn terminal(handler: &RouteHandler) -> Result<Handler, SkipReason> {
    match handler {
        RouteHandler::ReverseProxy(cfg) => reverse_proxy(cfg),
        RouteHandler::FileServer(cfg) => Ok(file_server(cfg)),
        RouteHandler::Redirect(cfg) => redirect(cfg),
        RouteHandler::Unsupported { handler_type, .. } => {
            Err(SkipReason::UnsupportedHandler(handler_type.clone()))
        }
    }
}

fn reverse_proxy(cfg: &ReverseProxyConfig) -> Result<Handler, SkipReason> {
    let upstreams: Vec<Upstream> = cfg
        .upstreams
        .iter()
        .map(String::as_str)
        .map(dial_address)
        .filter(|dial| !dial.is_empty())
        .map(|dial| Upstream {
            dial: dial.to_string(),
        })
        .collect();
    if upstreams.is_empty() {
        return Err(SkipReason::NoUpstreams);
    }

    let headers = (!cfg.headers.is_empty()).then(|| ProxyHeaders {
        request: HeaderOps {
            set: single_values(&cfg.headers),
            ..HeaderOps::default()
        },
    });

    let load_balancing = cfg
        .lb_policy
        .as_deref()
        .map(str::trim)
        .filter(|policy| !policy.is_empty() && *policy != DEFAULT_LB_POLICY)
        .map(|policy| LoadBalancing {
            selection_policy: SelectionPolicy {
                policy: policy.to_string(),
            },
        });

    Ok(Handler::ReverseProxy {
        upstreams,
        headers,
        load_balancing,
        flush_interval: cfg.websocket.then_some(-1),
    })
}

fn file_server(cfg: &FileServerConfig) -> Handler {
    let root = cfg
        .root
        .as_deref()
        .map(str::trim)
        .filter(|root| !root.is_empty())
        .map(str::to_string);

    Handler::FileServer {
        root,
        browse: cfg.browse.then_some(Empty {}),
        index_names: non_blank(&cfg.index_names),
        hide: non_blank(&cfg.hide),
        precompressed: cfg.precompressed.then(encodings),
        precompressed_order: if cfg.precompressed {
            PREFERRED_ENCODINGS.iter().map(ToString::to_string).collect()
        } else {
            Vec::new()
        },
    }
}

fn redirect(cfg: &RedirectConfig) -> Result<Handler, SkipReason> {
    let to = cfg.to.trim();
    if to.is_empty() {
        return Err(SkipReason::MissingRedirectTarget);
    }
    Ok(Handler::StaticResponse {
        status_code: cfg.status(),
        headers: BTreeMap::from([("Location".to_string(), vec![to.to_string()])]),
    })
}
