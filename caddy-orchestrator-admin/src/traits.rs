use async_trait::async_trait;

use crate::error::Result;
use crate::types::CaddyConfig;

/// Admin API of one managed Caddy instance.
///
/// Implementations are plain transport wrappers: they perform exactly one
/// request per call and never retry. Retry policy belongs to the caller.
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// Base URL of the instance's admin endpoint, e.g. `http://10.0.0.5:2019`.
    fn base_url(&self) -> &str;

    /// Read the instance's current configuration.
    ///
    /// Returns the raw document as served by the instance (`null` when the
    /// instance has no config loaded).
    async fn fetch_config(&self) -> Result<serde_json::Value>;

    /// Replace the instance's whole configuration.
    ///
    /// Fails with [`AdminError::ApplyRejected`](crate::AdminError::ApplyRejected)
    /// on any non-success status.
    async fn apply_config(&self, config: &CaddyConfig) -> Result<()>;

    /// Lightweight liveness probe. The response body is not inspected.
    async fn health(&self) -> Result<()>;
}
