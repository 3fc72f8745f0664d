//! Edit history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default page size of history listings.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Upper bound of one history listing.
pub const MAX_HISTORY_LIMIT: usize = 500;

/// Immutable record of one attempted apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditHistory {
    pub id: String,
    pub instance_id: String,
    /// Who triggered the sync
    pub actor: String,
    #[serde(with = "crate::utils::datetime")]
    pub created_at: DateTime<Utc>,
    /// Live config read before the apply; `None` when the read failed
    #[serde(default)]
    pub previous_config: Option<Value>,
    /// Config that was pushed
    pub new_config: Value,
}

impl EditHistory {
    #[must_use]
    pub fn new(
        instance_id: impl Into<String>,
        actor: impl Into<String>,
        previous_config: Option<Value>,
        new_config: Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            instance_id: instance_id.into(),
            actor: actor.into(),
            created_at: Utc::now(),
            previous_config,
            new_config,
        }
    }
}
