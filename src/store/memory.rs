//! In-memory task store for tests and local development.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::model::{EmailTask, TaskId, TaskStatus};
use crate::store::TaskStore;

/// Keeps tasks in a vector behind a mutex. Insertion order doubles as
/// creation order, matching the Postgres store's oldest-first queries.
#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: Mutex<Vec<EmailTask>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn enqueue(&self, recipient: &str, subject: &str, body: &str) -> Result<EmailTask> {
        let task = EmailTask::new(recipient, subject, body);
        self.tasks.lock().await.push(task.clone());
        Ok(task)
    }

    async fn get(&self, id: TaskId) -> Result<Option<EmailTask>> {
        Ok(self.tasks.lock().await.iter().find(|t| t.id == id).cloned())
    }

    async fn find_pending(&self, statuses: &[TaskStatus]) -> Result<Vec<EmailTask>> {
        let tasks = self.tasks.lock().await;
        let mut pending: Vec<EmailTask> = tasks
            .iter()
            .filter(|t| statuses.contains(&t.status))
            .cloned()
            .collect();
        pending.sort_by_key(|t| t.created_at);
        Ok(pending)
    }

    async fn save(&self, task: &EmailTask) -> Result<()> {
        let mut tasks = self.tasks.lock().await;
        match tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => *slot = task.clone(),
            None => tasks.push(task.clone()),
        }
        Ok(())
    }
}
