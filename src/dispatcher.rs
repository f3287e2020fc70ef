//! Dispatch entry points for business callers.
//!
//! `send_sync` runs delivery inline on the caller's task with escalation
//! disabled; `send_async` hands the id to a bounded worker pool with
//! escalation enabled. Both are fire-and-forget: delivery errors never
//! surface to the caller, who polls the store by id for final status.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::MailerConfig;
use crate::error::Result;
use crate::model::TaskId;
use crate::store::TaskStore;
use crate::worker::DeliveryWorker;

pub struct Dispatcher {
    store: Arc<dyn TaskStore>,
    worker: Arc<DeliveryWorker>,
    tx: mpsc::Sender<TaskId>,
    pool: Vec<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl Dispatcher {
    /// Create the dispatcher and spawn its worker pool.
    pub fn new(
        store: Arc<dyn TaskStore>,
        worker: Arc<DeliveryWorker>,
        config: &MailerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let mut pool = Vec::with_capacity(config.worker_count.max(1));
        for n in 0..config.worker_count.max(1) {
            let rx = rx.clone();
            let worker = worker.clone();
            let token = shutdown.clone();
            pool.push(tokio::spawn(async move {
                debug!(worker = n, "delivery pool worker started");
                loop {
                    let next = {
                        let mut rx = rx.lock().await;
                        tokio::select! {
                            id = rx.recv() => id,
                            () = token.cancelled() => None,
                        }
                    };
                    let Some(id) = next else { break };
                    // Top-level handler: a failed delivery must not kill the
                    // pool worker silently.
                    if let Err(e) = worker.process_one(id, true).await {
                        error!(task = %id, error = %e, "async delivery failed");
                    }
                }
                debug!(worker = n, "delivery pool worker stopped");
            }));
        }

        Self {
            store,
            worker,
            tx,
            pool,
            shutdown,
        }
    }

    /// Enqueue and deliver inline, with escalation disabled. Blocks the
    /// caller for the full retry loop, backoff sleeps included.
    pub async fn send_sync(&self, recipient: &str, subject: &str, body: &str) -> Result<TaskId> {
        let task = self.store.enqueue(recipient, subject, body).await?;
        if let Err(e) = self.worker.process_one(task.id, false).await {
            error!(task = %task.id, error = %e, "inline delivery failed");
        }
        Ok(task.id)
    }

    /// Enqueue and submit to the worker pool, with escalation enabled.
    ///
    /// When the pool queue is full the submission is dropped with a warning;
    /// the task is already durable and the next scheduler sweep delivers it.
    pub async fn send_async(&self, recipient: &str, subject: &str, body: &str) -> Result<TaskId> {
        let task = self.store.enqueue(recipient, subject, body).await?;
        match self.tx.try_send(task.id) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(task = %task.id, "delivery pool saturated, leaving task for scheduler");
            }
            Err(TrySendError::Closed(_)) => {
                warn!(task = %task.id, "delivery pool stopped, leaving task for scheduler");
            }
        }
        Ok(task.id)
    }

    /// Stop accepting pool work and wait for in-flight deliveries to wind
    /// down. Backoff sleeps observe the shutdown token, so this does not wait
    /// out full retry chains.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for handle in self.pool {
            let _ = handle.await;
        }
    }
}
