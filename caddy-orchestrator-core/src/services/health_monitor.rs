//! Health monitor
//!
//! One background task per instance probes its admin API on a fixed interval
//! and records the outcome. A slow or unreachable instance only stalls its own
//! task. When an instance comes back online with a failed apply behind it, the
//! monitor re-syncs it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{CoreError, CoreResult};
use crate::services::{ServiceContext, SyncService, SYSTEM_ACTOR};
use crate::types::{InstanceHealth, InstanceStatus};

/// Health monitor settings
#[derive(Debug, Clone)]
pub struct HealthMonitorConfig {
    /// Time between two probes of the same instance
    pub interval: Duration,
    /// Upper bound of a single probe
    pub timeout: Duration,
    /// Actor recorded for syncs the monitor triggers
    pub actor: String,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            timeout: Duration::from_secs(5),
            actor: SYSTEM_ACTOR.to_string(),
        }
    }
}

struct MonitorTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Probe state shared with the spawned tasks
#[derive(Clone)]
struct Prober {
    ctx: Arc<ServiceContext>,
    sync: Arc<SyncService>,
    config: Arc<HealthMonitorConfig>,
}

/// Per-instance health monitor
pub struct HealthMonitor {
    prober: Prober,
    shutdown: CancellationToken,
    tasks: Mutex<HashMap<String, MonitorTask>>,
}

impl HealthMonitor {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>, sync: Arc<SyncService>, config: HealthMonitorConfig) -> Self {
        let config = HealthMonitorConfig {
            // tokio intervals must be non-zero
            interval: config.interval.max(Duration::from_millis(1)),
            ..config
        };
        Self {
            prober: Prober {
                ctx,
                sync,
                config: Arc::new(config),
            },
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Start monitoring an instance. No-op if it is already monitored or the
    /// monitor has been shut down.
    pub async fn start(&self, instance_id: &str) {
        if self.shutdown.is_cancelled() {
            log::debug!("Health monitor is shut down, not starting {instance_id}");
            return;
        }

        let mut tasks = self.tasks.lock().await;
        if tasks
            .get(instance_id)
            .is_some_and(|task| !task.handle.is_finished())
        {
            return;
        }

        let cancel = self.shutdown.child_token();
        let handle = tokio::spawn(
            self.prober
                .clone()
                .run(instance_id.to_string(), cancel.clone()),
        );
        tasks.insert(instance_id.to_string(), MonitorTask { cancel, handle });
        log::debug!("Health monitor started for {instance_id}");
    }

    /// Stop monitoring an instance and wait for its task to exit.
    pub async fn stop(&self, instance_id: &str) {
        let task = self.tasks.lock().await.remove(instance_id);
        if let Some(task) = task {
            task.cancel.cancel();
            if let Err(e) = task.handle.await {
                log::error!("Health monitor task of {instance_id} failed: {e}");
            }
            log::debug!("Health monitor stopped for {instance_id}");
        }
    }

    pub async fn is_running(&self, instance_id: &str) -> bool {
        self.tasks
            .lock()
            .await
            .get(instance_id)
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Cancel all tasks, waiting up to `grace` before aborting the stragglers.
    pub async fn shutdown(&self, grace: Duration) {
        self.shutdown.cancel();
        let tasks: Vec<MonitorTask> = self.tasks.lock().await.drain().map(|(_, t)| t).collect();
        if tasks.is_empty() {
            return;
        }

        let aborts: Vec<_> = tasks.iter().map(|t| t.handle.abort_handle()).collect();
        let count = tasks.len();
        let joined = time::timeout(grace, join_all(tasks.into_iter().map(|t| t.handle))).await;
        if joined.is_err() {
            log::warn!("Health monitor tasks did not stop within {grace:?}, aborting");
            for abort in aborts {
                abort.abort();
            }
        }
        log::info!("Health monitor shut down ({count} task(s))");
    }

    /// Probe an instance once and record the result.
    pub async fn check_now(&self, instance_id: &str) -> CoreResult<InstanceHealth> {
        self.prober.ctx.require_instance(instance_id).await?;
        let health = self.prober.probe(instance_id).await;
        self.prober
            .ctx
            .instance_repository()
            .update_health(instance_id, &health)
            .await?;
        Ok(health)
    }
}

impl Prober {
    async fn run(self, instance_id: String, cancel: CancellationToken) {
        let mut ticker = time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_status: Option<InstanceStatus> = None;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let health = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                health = self.probe(&instance_id) => health,
            };

            match self
                .ctx
                .instance_repository()
                .update_health(&instance_id, &health)
                .await
            {
                Ok(()) => {}
                Err(CoreError::InstanceNotFound(_)) => {
                    log::info!("Instance {instance_id} is gone, health monitor exiting");
                    break;
                }
                Err(e) => {
                    log::error!("Failed to record health of {instance_id}: {e}");
                    continue;
                }
            }

            if last_status != Some(health.status) {
                match health.status {
                    InstanceStatus::Online => log::info!("[{instance_id}] Admin API is online"),
                    _ => log::warn!(
                        "[{instance_id}] Admin API is {}: {}",
                        health.status.as_str(),
                        health.error.as_deref().unwrap_or_default()
                    ),
                }
                last_status = Some(health.status);
            }

            if health.status == InstanceStatus::Online {
                self.reconcile_if_pending(&instance_id).await;
            }
        }
    }

    async fn probe(&self, instance_id: &str) -> InstanceHealth {
        let Some(client) = self.ctx.admin_registry().get(instance_id).await else {
            return InstanceHealth::error("no admin client registered");
        };

        let started = Instant::now();
        match time::timeout(self.config.timeout, client.health()).await {
            Ok(Ok(())) => {
                let latency = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                InstanceHealth::online(latency)
            }
            Ok(Err(e)) => InstanceHealth::offline(e.to_string()),
            Err(_) => InstanceHealth::offline(format!(
                "health probe timed out after {}ms",
                self.config.timeout.as_millis()
            )),
        }
    }

    async fn reconcile_if_pending(&self, instance_id: &str) {
        let pending = match self.ctx.instance_repository().find_by_id(instance_id).await {
            Ok(Some(instance)) => instance.sync_pending,
            Ok(None) => false,
            Err(e) => {
                log::error!("Failed to read sync state of {instance_id}: {e}");
                false
            }
        };
        if !pending {
            return;
        }

        log::info!("[{instance_id}] Back online with a pending sync, re-applying");
        match self.sync.sync_now(instance_id, &self.config.actor).await {
            Ok(report) if report.applied => {}
            Ok(report) => log::warn!(
                "[{instance_id}] Re-sync did not apply: {}",
                report.warning.unwrap_or_default()
            ),
            Err(e) => log::warn!("[{instance_id}] Re-sync failed: {e}"),
        }
    }
}
