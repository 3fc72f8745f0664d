//! Shared helpers for admin client integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use caddy_orchestrator_admin::{
    AdminApi, AdminConfig, Apps, CaddyConfig, CaddyRoute, ClientOptions, DEFAULT_LISTEN,
    DEFAULT_SERVER_NAME, Handler, HttpApp, HttpServer, MatcherSet, Upstream, create_admin_client,
};

/// Client with short timeouts so failure tests finish quickly.
pub fn client_for(base_url: &str) -> Arc<dyn AdminApi> {
    let options = ClientOptions {
        connect_timeout: Duration::from_millis(500),
        request_timeout: Duration::from_millis(300),
    };
    create_admin_client(base_url, &options).expect("valid test URL")
}

/// Base URL on which nothing is listening.
pub fn unused_local_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

/// One reverse-proxy route for `host`.
pub fn sample_config(host: &str, dial: &str) -> CaddyConfig {
    let route = CaddyRoute {
        matchers: vec![MatcherSet {
            host: vec![host.to_string()],
            path: Vec::new(),
        }],
        handle: vec![Handler::ReverseProxy {
            upstreams: vec![Upstream {
                dial: dial.to_string(),
            }],
            headers: None,
            load_balancing: None,
            flush_interval: None,
        }],
        terminal: true,
    };

    CaddyConfig {
        admin: AdminConfig::default(),
        apps: Some(Apps {
            http: HttpApp {
                servers: BTreeMap::from([(
                    DEFAULT_SERVER_NAME.to_string(),
                    HttpServer {
                        listen: DEFAULT_LISTEN.iter().map(ToString::to_string).collect(),
                        routes: vec![route],
                    },
                )]),
            },
        }),
    }
}
