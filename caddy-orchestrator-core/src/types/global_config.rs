//! Per-instance global settings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Settings shared by every route of one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub instance_id: String,
    /// Admin API base URL, mirrored from the instance
    pub admin_url: String,
    /// Prepend a zstd/gzip `encode` handler to every route
    #[serde(default)]
    pub enable_encode: bool,
    #[serde(with = "crate::utils::datetime")]
    pub updated_at: DateTime<Utc>,
}

impl GlobalConfig {
    /// Defaults for a freshly registered instance.
    #[must_use]
    pub fn new(instance_id: impl Into<String>, admin_url: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            admin_url: admin_url.into(),
            enable_encode: false,
            updated_at: Utc::now(),
        }
    }
}

/// Update global config request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateGlobalConfigRequest {
    pub instance_id: String,
    #[serde(default)]
    pub enable_encode: Option<bool>,
    #[serde(default)]
    pub admin_url: Option<String>,
}
