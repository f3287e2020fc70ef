//! Delivery worker. Drives one task through the retry state machine.
//!
//! Each transition is persisted individually, so the scheduler and any other
//! observer see live progress mid-loop, and a crash leaves the task in a
//! resumable state. Idempotent on terminal tasks: re-invoking on a sent or
//! failed task performs no transport call and mutates nothing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backoff;
use crate::config::MailerConfig;
use crate::error::Result;
use crate::escalation::EscalationNotifier;
use crate::model::{TaskId, TaskStatus, truncate_error};
use crate::store::TaskStore;
use crate::transport::{OutgoingEmail, Transport};

pub struct DeliveryWorker {
    store: Arc<dyn TaskStore>,
    transport: Arc<dyn Transport>,
    escalation: EscalationNotifier,
    config: MailerConfig,
    shutdown: CancellationToken,
}

impl DeliveryWorker {
    pub fn new(
        store: Arc<dyn TaskStore>,
        transport: Arc<dyn Transport>,
        config: MailerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let escalation = EscalationNotifier::new(transport.clone(), config.clone());
        Self {
            store,
            transport,
            escalation,
            config,
            shutdown,
        }
    }

    /// Drive a task to a terminal or parked state.
    ///
    /// Missing tasks are a no-op: a concurrent invocation may already have
    /// handled the id. Transport failures are absorbed into the task's
    /// durable state; only store errors propagate.
    pub async fn process_one(&self, id: TaskId, allow_escalation: bool) -> Result<()> {
        let Some(mut task) = self.store.get(id).await? else {
            debug!(task = %id, "task not found, skipping");
            return Ok(());
        };

        if task.status.is_terminal() {
            debug!(task = %id, status = %task.status, "task already terminal, skipping");
            return Ok(());
        }

        // Parked mode: no attempt consumed, no status change. The task is
        // picked up by a later sweep once configuration is fixed.
        if !self.config.enabled {
            info!(task = %id, "email delivery disabled, leaving task for later");
            return Ok(());
        }
        let Some(from_address) = self.config.from_address.as_deref() else {
            warn!(task = %id, "sender address unconfigured, leaving task for later");
            return Ok(());
        };

        while task.attempts < self.config.max_attempts && task.status != TaskStatus::Sent {
            task.status = TaskStatus::Retrying;
            task.updated_at = Utc::now();
            self.store.save(&task).await?;

            let mail = OutgoingEmail {
                from_address,
                from_name: self.config.from_name.as_deref(),
                to: &task.recipient,
                subject: &task.subject,
                body: &task.body,
            };

            match self.transport.send(&mail).await {
                Ok(()) => {
                    let now = Utc::now();
                    task.status = TaskStatus::Sent;
                    task.sent_at = Some(now);
                    task.last_error = None;
                    task.updated_at = now;
                    self.store.save(&task).await?;
                    info!(task = %task.id, attempts = task.attempts, "email sent");
                }
                Err(e) => {
                    task.attempts += 1;
                    task.last_error = Some(truncate_error(&e.to_string()));
                    task.updated_at = Utc::now();

                    if task.attempts >= self.config.max_attempts {
                        task.status = TaskStatus::Failed;
                        self.store.save(&task).await?;
                        error!(
                            task = %task.id,
                            attempts = task.attempts,
                            error = %e,
                            "delivery permanently failed"
                        );
                        if allow_escalation {
                            self.escalation.notify(&task).await;
                        }
                    } else {
                        self.store.save(&task).await?;
                        let wait = backoff::delay(
                            task.attempts,
                            self.config.backoff_base,
                            self.config.backoff_multiplier,
                        );
                        warn!(
                            task = %task.id,
                            attempt = task.attempts,
                            backoff_ms = wait.as_millis() as u64,
                            error = %e,
                            "send failed, backing off"
                        );
                        if !self.backoff_sleep(wait).await {
                            // Shutdown mid-backoff: the task stays Retrying
                            // in the store and a later sweep resumes it.
                            return Ok(());
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Sleep the backoff window unless shutdown is signalled first. Returns
    /// false when cancelled.
    async fn backoff_sleep(&self, wait: Duration) -> bool {
        tokio::select! {
            () = tokio::time::sleep(wait) => true,
            () = self.shutdown.cancelled() => false,
        }
    }
}
