//! Contract tests for the in-memory task store.

use domus_mailer::model::{TaskId, TaskStatus, content_hash};
use domus_mailer::store::{MemoryTaskStore, TaskStore};

#[tokio::test]
async fn enqueue_creates_queued_task() {
    let store = MemoryTaskStore::new();

    let task = store
        .enqueue("buyer@example.test", "Viewing confirmed", "See you at 10am")
        .await
        .unwrap();

    assert_eq!(task.status, TaskStatus::Queued);
    assert_eq!(task.attempts, 0);
    assert_eq!(task.content_hash, content_hash("See you at 10am"));
    assert!(task.last_error.is_none());
    assert!(task.sent_at.is_none());
    assert_eq!(task.created_at, task.updated_at);

    let loaded = store.get(task.id).await.unwrap().expect("task persisted");
    assert_eq!(loaded.recipient, "buyer@example.test");
}

#[tokio::test]
async fn get_missing_task_returns_none() {
    let store = MemoryTaskStore::new();
    assert!(store.get(TaskId::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn find_pending_filters_by_status_oldest_first() {
    let store = MemoryTaskStore::new();

    let first = store.enqueue("a@x.test", "s1", "b1").await.unwrap();
    let mut second = store.enqueue("b@x.test", "s2", "b2").await.unwrap();
    let third = store.enqueue("c@x.test", "s3", "b3").await.unwrap();

    second.status = TaskStatus::Sent;
    store.save(&second).await.unwrap();

    let pending = store
        .find_pending(&[TaskStatus::Queued, TaskStatus::Retrying])
        .await
        .unwrap();

    let ids: Vec<_> = pending.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![first.id, third.id]);
}

#[tokio::test]
async fn save_upserts_full_row() {
    let store = MemoryTaskStore::new();

    let mut task = store.enqueue("a@x.test", "s", "b").await.unwrap();
    task.status = TaskStatus::Retrying;
    task.attempts = 2;
    task.last_error = Some("connection refused".to_string());
    store.save(&task).await.unwrap();

    let loaded = store.get(task.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, TaskStatus::Retrying);
    assert_eq!(loaded.attempts, 2);
    assert_eq!(loaded.last_error.as_deref(), Some("connection refused"));
}
