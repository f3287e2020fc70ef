//! Best-effort escalation on terminal delivery failure.
//!
//! A one-off summary goes to the configured support address. Escalation is a
//! side channel: any failure here is logged and swallowed, never retried, and
//! never touches the task itself.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::MailerConfig;
use crate::model::EmailTask;
use crate::transport::{OutgoingEmail, Transport};

pub struct EscalationNotifier {
    transport: Arc<dyn Transport>,
    config: MailerConfig,
}

impl EscalationNotifier {
    pub fn new(transport: Arc<dyn Transport>, config: MailerConfig) -> Self {
        Self { transport, config }
    }

    /// Send the failure summary for a task that has exhausted its attempts.
    pub async fn notify(&self, task: &EmailTask) {
        let Some(support) = self.config.support_address.as_deref() else {
            debug!(task = %task.id, "no support address configured, skipping escalation");
            return;
        };
        // The task was attempted, so the sender address is known to be set.
        let Some(from_address) = self.config.from_address.as_deref() else {
            return;
        };

        let subject = format!("[mailer] delivery failed: task {}", task.id);
        let body = format!(
            "Email delivery permanently failed.\n\n\
             task id:    {}\n\
             recipient:  {}\n\
             subject:    {}\n\
             attempts:   {}\n\
             last error: {}\n",
            task.id,
            task.recipient,
            task.subject,
            task.attempts,
            task.last_error.as_deref().unwrap_or("-"),
        );

        let mail = OutgoingEmail {
            from_address,
            from_name: self.config.from_name.as_deref(),
            to: support,
            subject: &subject,
            body: &body,
        };

        match self.transport.send(&mail).await {
            Ok(()) => debug!(task = %task.id, support, "escalation sent"),
            Err(e) => warn!(task = %task.id, error = %e, "escalation send failed"),
        }
    }
}
