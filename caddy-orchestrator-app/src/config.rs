//! TOML application configuration.
//!
//! Every field has a default, so an empty file is a valid configuration.
//!
//! ```toml
//! [storage]
//! backend = "sqlite"
//! path = "/var/lib/caddy-orchestrator/state.db"
//!
//! [health]
//! interval_secs = 15
//! timeout_secs = 5
//!
//! [default_instance]
//! name = "Local Caddy"
//! admin_url = "http://localhost:2019"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use caddy_orchestrator_admin::{normalize_admin_url, ClientOptions};
use caddy_orchestrator_core::error::{CoreError, CoreResult};
use caddy_orchestrator_core::services::{HealthMonitorConfig, SYSTEM_ACTOR};
use serde::{Deserialize, Serialize};

/// Storage backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// State is lost on restart
    #[default]
    Memory,
    /// Single-file `SQLite` database (feature `sqlite-store`)
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Database file of the `sqlite` backend
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: PathBuf::from("caddy-orchestrator.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_secs: 15,
            timeout_secs: 5,
        }
    }
}

/// Timeouts of the admin API client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Actor recorded for syncs not triggered by a user
    pub actor: String,
    /// Push the stored routes to every instance at startup
    pub sync_on_startup: bool,
    /// Drop the edit history together with a deleted instance
    pub purge_history_on_instance_delete: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            actor: SYSTEM_ACTOR.to_string(),
            sync_on_startup: true,
            purge_history_on_instance_delete: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    pub grace_period_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 5,
        }
    }
}

/// Instance ensured under the `default` ID at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultInstanceConfig {
    #[serde(default = "default_instance_name")]
    pub name: String,
    pub admin_url: String,
}

fn default_instance_name() -> String {
    "Default".to_string()
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub health: HealthConfig,
    pub admin: AdminConfig,
    pub sync: SyncConfig,
    pub shutdown: ShutdownConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_instance: Option<DefaultInstanceConfig>,
}

impl AppConfig {
    /// Read and validate a TOML file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ValidationError(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| CoreError::ValidationError(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CoreResult<()> {
        let positive = [
            ("health.interval_secs", self.health.interval_secs),
            ("health.timeout_secs", self.health.timeout_secs),
            ("admin.connect_timeout_secs", self.admin.connect_timeout_secs),
            ("admin.request_timeout_secs", self.admin.request_timeout_secs),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(CoreError::ValidationError(format!(
                    "{field} must be at least 1"
                )));
            }
        }

        if self.sync.actor.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "sync.actor must not be empty".to_string(),
            ));
        }

        if self.storage.backend == StorageBackend::Sqlite
            && self.storage.path.as_os_str().is_empty()
        {
            return Err(CoreError::ValidationError(
                "storage.path is required for the sqlite backend".to_string(),
            ));
        }

        if let Some(default_instance) = &self.default_instance {
            normalize_admin_url(&default_instance.admin_url).map_err(|e| {
                CoreError::ValidationError(format!("default_instance.admin_url: {e}"))
            })?;
            if default_instance.name.trim().is_empty() {
                return Err(CoreError::ValidationError(
                    "default_instance.name must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn health_monitor_config(&self) -> HealthMonitorConfig {
        HealthMonitorConfig {
            interval: Duration::from_secs(self.health.interval_secs),
            timeout: Duration::from_secs(self.health.timeout_secs),
            actor: self.sync.actor.clone(),
        }
    }

    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            connect_timeout: Duration::from_secs(self.admin.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.admin.request_timeout_secs),
        }
    }

    #[must_use]
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.shutdown.grace_period_secs)
    }
}
