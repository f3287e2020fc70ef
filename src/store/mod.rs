//! Task persistence boundary.
//!
//! The delivery subsystem consumes the store as a plain CRUD interface: it
//! does not assume row locking or transactional isolation beyond what the
//! backend provides. Two invocations racing on the same task id are accepted
//! as part of the at-least-once guarantee.

pub mod memory;
pub mod postgres;

pub use memory::MemoryTaskStore;
pub use postgres::PgTaskStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{EmailTask, TaskId, TaskStatus};

/// Durable record of queued, in-flight, and terminal email tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new queued task and return it.
    async fn enqueue(&self, recipient: &str, subject: &str, body: &str) -> Result<EmailTask>;

    /// Fetch a task by id. `None` if it does not exist.
    async fn get(&self, id: TaskId) -> Result<Option<EmailTask>>;

    /// All tasks in any of the given statuses, oldest created first.
    async fn find_pending(&self, statuses: &[TaskStatus]) -> Result<Vec<EmailTask>>;

    /// Full-row upsert of a task's current state.
    async fn save(&self, task: &EmailTask) -> Result<()>;
}
