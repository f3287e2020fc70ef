//! Core data model.
//!
//! An email task is one queued message awaiting delivery. It carries its
//! content, a fingerprint of the body for the audit trail, and the retry
//! bookkeeping the delivery worker mutates. Tasks are never deleted by this
//! subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::Error;

/// Longest `last_error` text persisted with a task. Anything longer is
/// truncated before the row is saved.
pub const MAX_LAST_ERROR_LEN: usize = 4000;

// ---------------------------------------------------------------------------
// Email Task
// ---------------------------------------------------------------------------

/// One queued email, as persisted in the task store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTask {
    /// Unique identifier, assigned at enqueue time.
    pub id: TaskId,

    pub recipient: String,
    pub subject: String,
    pub body: String,

    /// SHA-256 hex fingerprint of `body`. Audit/dedup aid only — duplicate
    /// enqueues of the same content are possible and accepted.
    pub content_hash: String,

    /// Current lifecycle status.
    pub status: TaskStatus,

    /// Number of failed send attempts so far. Never exceeds the configured
    /// maximum; a first-try success leaves it at zero.
    pub attempts: u32,

    /// Last transport error, truncated to [`MAX_LAST_ERROR_LEN`] characters.
    pub last_error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Set iff `status == Sent`.
    pub sent_at: Option<DateTime<Utc>>,
}

impl EmailTask {
    /// Build a fresh queued task. Used by store implementations at enqueue.
    pub fn new(recipient: &str, subject: &str, body: &str) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            content_hash: content_hash(body),
            status: TaskStatus::Queued,
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
            sent_at: None,
        }
    }
}

/// SHA-256 hex digest of an email body.
pub fn content_hash(body: &str) -> String {
    let digest = Sha256::digest(body.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Truncate text to at most `max` characters. Always cuts on a character
/// boundary, so multibyte input stays valid UTF-8.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Truncate transport error text to the persistable limit.
pub fn truncate_error(msg: &str) -> String {
    truncate_chars(msg, MAX_LAST_ERROR_LEN)
}

// ---------------------------------------------------------------------------
// Task Id
// ---------------------------------------------------------------------------

/// Newtype for task ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of an email task.
///
/// `Queued → Retrying → Sent | Failed`. `Failed` is reachable only once the
/// attempt budget is exhausted; both `Sent` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Enqueued, no delivery attempt made yet.
    Queued,
    /// Delivery in flight or waiting out a backoff window.
    Retrying,
    /// Delivered. Terminal.
    Sent,
    /// Attempt budget exhausted. Terminal.
    Failed,
}

impl TaskStatus {
    /// No further attempts are made on a terminal task.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Sent | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Retrying => "retrying",
            TaskStatus::Sent => "sent",
            TaskStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(TaskStatus::Queued),
            "retrying" => Ok(TaskStatus::Retrying),
            "sent" => Ok(TaskStatus::Sent),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(Error::UnknownStatus(other.to_string())),
        }
    }
}
