//! Sync orchestrator
//!
//! Rebuilds the config of one instance from the store and pushes it through
//! the admin API, recording an [`EditHistory`] entry before every apply.
//!
//! All work for one instance (store mutation, build, apply) runs under a
//! per-instance mutex, so two overlapping mutations never apply configs built
//! from inconsistent route sets. Different instances never wait on each other.
//!
//! A failed apply is reported as a warning and marks the instance pending; the
//! stored routes stay authoritative and are never rolled back.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::builder::{build, BuildOutput};
use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;
use crate::types::{EditHistory, MutationResult, SyncReport};

/// Actor recorded for syncs not triggered by a user.
pub const SYSTEM_ACTOR: &str = "system";

/// Sync orchestrator service
pub struct SyncService {
    ctx: Arc<ServiceContext>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// Last config each instance accepted from us, for drift detection
    last_applied: RwLock<HashMap<String, Value>>,
}

impl SyncService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self {
            ctx,
            locks: Mutex::new(HashMap::new()),
            last_applied: RwLock::new(HashMap::new()),
        }
    }

    /// Enter the critical section of an instance.
    pub async fn lock_instance(&self, instance_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(instance_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Run a store mutation and the sync it triggers as one critical section.
    ///
    /// A failed `mutation` fails the whole operation and nothing is synced.
    /// Once it succeeded, any sync problem becomes the result's warning.
    pub async fn run_mutation<T, F, Fut>(
        &self,
        instance_id: &str,
        actor: &str,
        mutation: F,
    ) -> CoreResult<MutationResult<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CoreResult<T>>,
    {
        let _guard = self.lock_instance(instance_id).await;
        let data = mutation().await?;
        let report = self.sync_or_report(instance_id, actor).await;
        Ok(MutationResult::synced(data, report))
    }

    /// Re-run build and apply without a store mutation.
    pub async fn sync_now(&self, instance_id: &str, actor: &str) -> CoreResult<SyncReport> {
        let _guard = self.lock_instance(instance_id).await;
        self.sync_locked(instance_id, actor).await
    }

    /// Sync every registered instance concurrently.
    pub async fn sync_all(&self, actor: &str) -> CoreResult<Vec<SyncReport>> {
        let instances = self.ctx.instance_repository().find_all().await?;
        log::info!("Syncing {} instance(s)", instances.len());
        Ok(join_all(
            instances
                .iter()
                .map(|instance| self.locked_sync_or_report(&instance.id, actor)),
        )
        .await)
    }

    /// Sync the instances whose last apply failed.
    pub async fn reconcile_pending(&self, actor: &str) -> CoreResult<Vec<SyncReport>> {
        let pending: Vec<String> = self
            .ctx
            .instance_repository()
            .find_all()
            .await?
            .into_iter()
            .filter(|instance| instance.sync_pending)
            .map(|instance| instance.id)
            .collect();
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        log::info!("Reconciling {} pending instance(s)", pending.len());
        Ok(join_all(
            pending
                .iter()
                .map(|id| self.locked_sync_or_report(id, actor)),
        )
        .await)
    }

    /// Build the config an instance would receive, without applying it.
    pub async fn preview(&self, instance_id: &str) -> CoreResult<BuildOutput> {
        let instance = self.ctx.require_instance(instance_id).await?;
        let routes = self
            .ctx
            .route_repository()
            .find_by_instance(instance_id)
            .await?;
        let global = self.ctx.global_config_for(&instance).await?;
        Ok(build(&routes, &global))
    }

    /// The config an instance is running right now.
    pub async fn fetch_live_config(&self, instance_id: &str) -> CoreResult<Value> {
        self.ctx.require_instance(instance_id).await?;
        let client = self.ctx.get_admin_client(instance_id).await?;
        Ok(client.fetch_config().await?)
    }

    /// Drop the per-instance state of a removed instance.
    pub async fn forget_instance(&self, instance_id: &str) {
        self.locks.lock().await.remove(instance_id);
        self.last_applied.write().await.remove(instance_id);
    }

    /// Drop the remembered config of an instance whose endpoint changed.
    pub async fn forget_applied(&self, instance_id: &str) {
        self.last_applied.write().await.remove(instance_id);
    }

    async fn locked_sync_or_report(&self, instance_id: &str, actor: &str) -> SyncReport {
        let _guard = self.lock_instance(instance_id).await;
        self.sync_or_report(instance_id, actor).await
    }

    /// Sync with errors folded into the report. Caller holds the lock.
    async fn sync_or_report(&self, instance_id: &str, actor: &str) -> SyncReport {
        match self.sync_locked(instance_id, actor).await {
            Ok(report) => report,
            Err(e) => {
                log::error!("Sync of instance {instance_id} aborted: {e}");
                self.ctx.mark_sync_pending(instance_id, true).await;
                SyncReport::failed(
                    instance_id,
                    format!("Saved, but instance {instance_id} was not synced: {e}"),
                )
            }
        }
    }

    /// Build, record, apply. Caller holds the lock.
    async fn sync_locked(&self, instance_id: &str, actor: &str) -> CoreResult<SyncReport> {
        let instance = self.ctx.require_instance(instance_id).await?;
        let routes = self
            .ctx
            .route_repository()
            .find_by_instance(instance_id)
            .await?;
        let global = self.ctx.global_config_for(&instance).await?;

        let output = build(&routes, &global);
        let target = serde_json::to_value(&output.config)
            .map_err(|e| CoreError::SerializationError(e.to_string()))?;

        let mut report = SyncReport {
            instance_id: instance_id.to_string(),
            route_count: output.route_count(),
            skipped: output.skipped.clone(),
            ..SyncReport::default()
        };

        let Some(client) = self.ctx.admin_registry().get(instance_id).await else {
            log::warn!("No admin client registered for instance {instance_id}");
            self.ctx.mark_sync_pending(instance_id, true).await;
            report.warning = Some(format!(
                "Instance {instance_id} was not updated: no admin client is registered. \
                 The change is saved and will be applied on the next sync."
            ));
            return Ok(report);
        };

        let live = match client.fetch_config().await {
            Ok(live) => Some(live),
            Err(e) => {
                log::warn!("[{instance_id}] Could not read live config before apply: {e}");
                None
            }
        };

        report.changed = live.as_ref() != Some(&target);
        let last_applied = self.last_applied.read().await.get(instance_id).cloned();
        if let (Some(live), Some(last_applied)) = (&live, &last_applied) {
            if live != last_applied {
                report.drift_detected = true;
                log::warn!(
                    "[{instance_id}] Live config was modified outside the orchestrator, overwriting"
                );
            }
        }

        let entry = EditHistory::new(instance_id, actor, live, target.clone());
        if let Err(e) = self.ctx.history_repository().append(&entry).await {
            log::error!("[{instance_id}] Failed to record edit history, apply skipped: {e}");
            self.ctx.mark_sync_pending(instance_id, true).await;
            report.warning = Some(format!(
                "Instance {instance_id} was not updated: edit history could not be recorded ({e})."
            ));
            return Ok(report);
        }
        report.history_id = Some(entry.id);

        match client.apply_config(&output.config).await {
            Ok(()) => {
                report.applied = true;
                self.last_applied
                    .write()
                    .await
                    .insert(instance_id.to_string(), target);
                if instance.sync_pending {
                    self.ctx.mark_sync_pending(instance_id, false).await;
                }
                log::info!(
                    "[{instance_id}] Applied config: {} route(s), {} skipped, actor {actor}",
                    report.route_count,
                    report.skipped.len()
                );
            }
            Err(e) => {
                if e.is_expected() {
                    log::warn!("[{instance_id}] Apply failed: {e}");
                } else {
                    log::error!("[{instance_id}] Apply failed: {e}");
                }
                self.ctx.mark_sync_pending(instance_id, true).await;
                report.warning = Some(format!(
                    "Instance {instance_id} was not updated: {e}. \
                     The change is saved and will be applied on the next sync."
                ));
            }
        }

        Ok(report)
    }
}
