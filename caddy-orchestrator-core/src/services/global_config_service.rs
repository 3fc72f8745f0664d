//! Per-instance global settings service

use std::sync::Arc;

use chrono::Utc;

use crate::error::CoreResult;
use crate::services::{InstanceService, ServiceContext, SyncService};
use crate::types::{GlobalConfig, MutationResult, UpdateGlobalConfigRequest, UpdateInstanceRequest};

/// Global config service
pub struct GlobalConfigService {
    ctx: Arc<ServiceContext>,
    sync: Arc<SyncService>,
    instances: Arc<InstanceService>,
}

impl GlobalConfigService {
    #[must_use]
    pub fn new(
        ctx: Arc<ServiceContext>,
        sync: Arc<SyncService>,
        instances: Arc<InstanceService>,
    ) -> Self {
        Self {
            ctx,
            sync,
            instances,
        }
    }

    /// Stored settings of an instance, or the defaults it would be built with
    pub async fn get(&self, instance_id: &str) -> CoreResult<GlobalConfig> {
        let instance = self.ctx.require_instance(instance_id).await?;
        self.ctx.global_config_for(&instance).await
    }

    /// Change settings and re-sync the instance
    ///
    /// A new admin URL re-points the instance first, so the sync lands on the
    /// new endpoint.
    pub async fn update(
        &self,
        request: UpdateGlobalConfigRequest,
        actor: &str,
    ) -> CoreResult<MutationResult<GlobalConfig>> {
        let UpdateGlobalConfigRequest {
            instance_id,
            enable_encode,
            admin_url,
        } = request;
        self.ctx.require_instance(&instance_id).await?;

        if let Some(admin_url) = admin_url {
            self.instances
                .update_instance(UpdateInstanceRequest {
                    id: instance_id.clone(),
                    name: None,
                    admin_url: Some(admin_url),
                })
                .await?;
        }

        let ctx = &self.ctx;
        let id = instance_id.as_str();
        self.sync
            .run_mutation(id, actor, || async move {
                let instance = ctx.require_instance(id).await?;
                let mut config = ctx.global_config_for(&instance).await?;
                if let Some(enable_encode) = enable_encode {
                    config.enable_encode = enable_encode;
                }
                config.updated_at = Utc::now();
                ctx.global_config_repository().set(&config).await?;
                Ok(config)
            })
            .await
    }
}
