//! Global config persistence abstract Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::GlobalConfig;

/// One `GlobalConfig` row per instance.
#[async_trait]
pub trait GlobalConfigRepository: Send + Sync {
    async fn get(&self, instance_id: &str) -> CoreResult<Option<GlobalConfig>>;

    async fn set(&self, config: &GlobalConfig) -> CoreResult<()>;

    async fn delete(&self, instance_id: &str) -> CoreResult<()>;
}
