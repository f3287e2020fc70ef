//! Periodic sweep over pending tasks.
//!
//! Recovery path for tasks that crashed mid-delivery, were parked by
//! configuration, or missed the async pool. Each tick visits pending tasks
//! oldest-first and sequentially re-drives the due ones; a slow retry chain
//! delays later tasks within the tick, accepted under low email volume.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff;
use crate::config::MailerConfig;
use crate::error::Result;
use crate::model::TaskStatus;
use crate::store::TaskStore;
use crate::worker::DeliveryWorker;

pub struct Scheduler {
    handle: JoinHandle<()>,
    shutdown: CancellationToken,
}

impl Scheduler {
    /// Spawn the sweep loop on the configured period.
    pub fn spawn(
        store: Arc<dyn TaskStore>,
        worker: Arc<DeliveryWorker>,
        config: MailerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let token = shutdown.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.scheduler_period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                period_ms = config.scheduler_period.as_millis() as u64,
                "delivery scheduler started"
            );
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match sweep(store.as_ref(), &worker, &config).await {
                            Ok(0) => {}
                            Ok(n) => debug!(processed = n, "scheduler sweep complete"),
                            Err(e) => warn!(error = %e, "scheduler sweep failed"),
                        }
                    }
                    () = token.cancelled() => break,
                }
            }
            info!("delivery scheduler stopped");
        });

        Self { handle, shutdown }
    }

    /// Stop ticking and wait for an in-flight sweep to finish.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        let _ = self.handle.await;
    }
}

/// One sweep: fetch pending tasks oldest-first and re-drive the due ones,
/// escalation disabled. Returns how many tasks were processed.
pub async fn sweep(
    store: &dyn TaskStore,
    worker: &DeliveryWorker,
    config: &MailerConfig,
) -> Result<usize> {
    let pending = store
        .find_pending(&[TaskStatus::Queued, TaskStatus::Retrying])
        .await?;
    let now = Utc::now();

    let mut processed = 0;
    for task in pending {
        if !backoff::is_due(&task, now, config.backoff_base, config.backoff_multiplier) {
            continue;
        }
        if let Err(e) = worker.process_one(task.id, false).await {
            warn!(task = %task.id, error = %e, "sweep delivery failed");
        }
        processed += 1;
    }

    Ok(processed)
}
