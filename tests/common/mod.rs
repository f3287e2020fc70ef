//! Shared test fixtures: scripted fake transport and config helpers.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use domus_mailer::config::MailerConfig;
use domus_mailer::error::{Error, Result};
use domus_mailer::transport::{OutgoingEmail, Transport};

/// A message the fake transport accepted.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Scripted transport: plays back a queue of outcomes, then falls back to a
/// fixed outcome. Records every call and every accepted message.
pub struct FakeTransport {
    script: Mutex<VecDeque<std::result::Result<(), String>>>,
    fallback: std::result::Result<(), String>,
    calls: AtomicU32,
    delivered: Mutex<Vec<SentMail>>,
}

impl FakeTransport {
    /// Every send succeeds.
    pub fn succeeding() -> Self {
        Self::with_script(Vec::new(), Ok(()))
    }

    /// Every send fails with the given message.
    pub fn failing(msg: &str) -> Self {
        Self::with_script(Vec::new(), Err(msg.to_string()))
    }

    /// Play back `outcomes` in order, then succeed.
    pub fn script(outcomes: Vec<std::result::Result<(), String>>) -> Self {
        Self::with_script(outcomes, Ok(()))
    }

    fn with_script(
        outcomes: Vec<std::result::Result<(), String>>,
        fallback: std::result::Result<(), String>,
    ) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            fallback,
            calls: AtomicU32::new(0),
            delivered: Mutex::new(Vec::new()),
        }
    }

    /// Total send invocations, failures included.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Messages the transport accepted.
    pub fn delivered(&self) -> Vec<SentMail> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, mail: &OutgoingEmail<'_>) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match outcome {
            Ok(()) => {
                self.delivered.lock().unwrap().push(SentMail {
                    from: mail.from_address.to_string(),
                    to: mail.to.to_string(),
                    subject: mail.subject.to_string(),
                    body: mail.body.to_string(),
                });
                Ok(())
            }
            Err(msg) => Err(Error::Transport(msg)),
        }
    }
}

/// Delivery policy with a configured sender and near-instant backoff.
pub fn test_config() -> MailerConfig {
    MailerConfig {
        from_address: Some("noreply@domus.test".to_string()),
        from_name: Some("Domus Listings".to_string()),
        max_attempts: 3,
        backoff_base: Duration::from_millis(5),
        backoff_multiplier: 2.0,
        ..MailerConfig::default()
    }
}

pub const SUPPORT: &str = "support@domus.test";
