//! Instance related type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ID of the instance managed in single-instance mode.
pub const DEFAULT_INSTANCE_ID: &str = "default";

/// Last observed instance status
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    /// Not probed yet
    #[default]
    Unknown,
    /// Admin API reachable
    Online,
    /// Probe failed
    Offline,
    /// Probe could not run (no usable client)
    Error,
}

impl InstanceStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Error => "error",
        }
    }

    /// Parse a stored status; unrecognized values read as `Unknown`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "online" => Self::Online,
            "offline" => Self::Offline,
            "error" => Self::Error,
            _ => Self::Unknown,
        }
    }
}

/// Result of one health probe, written as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceHealth {
    pub status: InstanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(with = "crate::utils::datetime")]
    pub checked_at: DateTime<Utc>,
}

impl InstanceHealth {
    #[must_use]
    pub fn online(latency_ms: u64) -> Self {
        Self {
            status: InstanceStatus::Online,
            latency_ms: Some(latency_ms),
            error: None,
            checked_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn offline(error: impl Into<String>) -> Self {
        Self {
            status: InstanceStatus::Offline,
            latency_ms: None,
            error: Some(error.into()),
            checked_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            status: InstanceStatus::Error,
            ..Self::offline(error)
        }
    }
}

/// A managed Caddy instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Instance ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Normalized admin API base URL
    pub admin_url: String,
    #[serde(default)]
    pub status: InstanceStatus,
    /// Latency of the last successful probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    /// Error of the last failed probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, with = "crate::utils::datetime::option")]
    pub last_checked_at: Option<DateTime<Utc>>,
    /// Set when the last apply failed and the live config lags the stored routes
    #[serde(default)]
    pub sync_pending: bool,
    #[serde(with = "crate::utils::datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::utils::datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Instance {
    /// New instance that has not been probed yet.
    #[must_use]
    pub fn new(id: String, name: String, admin_url: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            admin_url,
            status: InstanceStatus::Unknown,
            latency_ms: None,
            last_error: None,
            last_checked_at: None,
            sync_pending: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_health(&mut self, health: &InstanceHealth) {
        self.status = health.status;
        self.latency_ms = health.latency_ms;
        self.last_error.clone_from(&health.error);
        self.last_checked_at = Some(health.checked_at);
    }
}

/// Create instance request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInstanceRequest {
    /// Explicit ID; a UUID is generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub admin_url: String,
}

/// Update instance request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateInstanceRequest {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// New admin URL; re-points the admin client when it changes
    #[serde(default)]
    pub admin_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            InstanceStatus::Unknown,
            InstanceStatus::Online,
            InstanceStatus::Offline,
            InstanceStatus::Error,
        ] {
            assert_eq!(InstanceStatus::parse(status.as_str()), status);
        }
        assert_eq!(InstanceStatus::parse("degraded"), InstanceStatus::Unknown);
    }

    #[test]
    fn apply_health_replaces_previous_probe() {
        let mut instance = Instance::new(
            "a".to_string(),
            "A".to_string(),
            "http://a:2019".to_string(),
        );
        instance.apply_health(&InstanceHealth::offline("connection refused"));
        assert_eq!(instance.status, InstanceStatus::Offline);
        assert_eq!(instance.last_error.as_deref(), Some("connection refused"));

        instance.apply_health(&InstanceHealth::online(12));
        assert_eq!(instance.status, InstanceStatus::Online);
        assert_eq!(instance.latency_ms, Some(12));
        assert!(instance.last_error.is_none());
    }
}
