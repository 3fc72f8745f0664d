//! Type definitions

mod global_config;
mod history;
mod instance;
mod response;
mod route;

pub use global_config::{GlobalConfig, UpdateGlobalConfigRequest};
pub use history::{EditHistory, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
pub use instance::{
    CreateInstanceRequest, Instance, InstanceHealth, InstanceStatus, UpdateInstanceRequest,
    DEFAULT_INSTANCE_ID,
};
pub use response::{MutationResult, SyncReport};
pub use route::{
    CreateRouteRequest, FileServerConfig, HeaderConfig, RedirectConfig, ReverseProxyConfig, Route,
    RouteHandler, UpdateRouteRequest, DEFAULT_LB_POLICY, DEFAULT_REDIRECT_STATUS,
};

// Re-export the wire model of the admin client
pub use caddy_orchestrator_admin::CaddyConfig;
