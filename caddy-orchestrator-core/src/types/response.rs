//! Mutation and sync result types

use serde::{Deserialize, Serialize};

use crate::builder::SkippedRoute;

/// Outcome of one sync against one instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub instance_id: String,
    /// History entry written for this attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
    /// The instance accepted the new config
    pub applied: bool,
    /// The new config differs from what the instance was running
    pub changed: bool,
    /// The instance was edited out of band since the last apply
    pub drift_detected: bool,
    /// Routes rendered into the config
    pub route_count: usize,
    /// Routes left out of the config
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedRoute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl SyncReport {
    /// A sync that stopped before anything was applied.
    #[must_use]
    pub fn failed(instance_id: impl Into<String>, warning: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            warning: Some(warning.into()),
            ..Self::default()
        }
    }
}

/// Result of a store mutation followed by a sync.
///
/// `data` is always the committed entity. A sync problem never fails the
/// mutation; it shows up as `warning`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResult<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncReport>,
}

impl<T> MutationResult<T> {
    #[must_use]
    pub fn synced(data: T, report: SyncReport) -> Self {
        Self {
            data,
            warning: report.warning.clone(),
            sync: Some(report),
        }
    }
}
