//! Dispatch-path tests: sync vs async submission and the escalation
//! asymmetry between them.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeTransport, SUPPORT, test_config};
use domus_mailer::config::MailerConfig;
use domus_mailer::dispatcher::Dispatcher;
use domus_mailer::model::{TaskId, TaskStatus};
use domus_mailer::store::{MemoryTaskStore, TaskStore};
use domus_mailer::worker::DeliveryWorker;
use tokio_util::sync::CancellationToken;

fn build(
    transport: Arc<FakeTransport>,
    config: MailerConfig,
) -> (Arc<MemoryTaskStore>, Dispatcher, CancellationToken) {
    let store = Arc::new(MemoryTaskStore::new());
    let shutdown = CancellationToken::new();
    let worker = Arc::new(DeliveryWorker::new(
        store.clone(),
        transport,
        config.clone(),
        shutdown.clone(),
    ));
    let dispatcher = Dispatcher::new(store.clone(), worker, &config, shutdown.clone());
    (store, dispatcher, shutdown)
}

async fn wait_terminal(store: &MemoryTaskStore, id: TaskId) -> TaskStatus {
    for _ in 0..500 {
        if let Some(task) = store.get(id).await.unwrap() {
            if task.status.is_terminal() {
                return task.status;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {id} never reached a terminal state");
}

#[tokio::test]
async fn send_sync_delivers_on_the_caller() {
    let transport = Arc::new(FakeTransport::succeeding());
    let (store, dispatcher, _) = build(transport.clone(), test_config());

    let id = dispatcher
        .send_sync("buyer@example.test", "Offer received", "Details inside")
        .await
        .unwrap();

    // Inline delivery: terminal by the time the call returns.
    let task = store.get(id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Sent);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn send_sync_swallows_delivery_failure() {
    let transport = Arc::new(FakeTransport::failing("relay down"));
    let (store, dispatcher, _) = build(transport, test_config());

    // Fire-and-forget: the caller still gets the task id.
    let id = dispatcher
        .send_sync("buyer@example.test", "Offer received", "Details inside")
        .await
        .unwrap();

    let task = store.get(id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
}

#[tokio::test]
async fn send_sync_never_escalates() {
    let transport = Arc::new(FakeTransport::failing("relay down"));
    let config = MailerConfig {
        support_address: Some(SUPPORT.to_string()),
        ..test_config()
    };
    let (store, dispatcher, _) = build(transport.clone(), config);

    let id = dispatcher
        .send_sync("buyer@example.test", "Offer received", "Details inside")
        .await
        .unwrap();

    assert_eq!(wait_terminal(&store, id).await, TaskStatus::Failed);
    // Three delivery attempts, no escalation send.
    assert_eq!(transport.calls(), 3);
    assert!(transport.delivered().is_empty());
}

#[tokio::test]
async fn send_async_delivers_through_the_pool() {
    let transport = Arc::new(FakeTransport::succeeding());
    let (store, dispatcher, _) = build(transport.clone(), test_config());

    let id = dispatcher
        .send_async("buyer@example.test", "Offer received", "Details inside")
        .await
        .unwrap();

    assert_eq!(wait_terminal(&store, id).await, TaskStatus::Sent);
    assert_eq!(transport.calls(), 1);
    dispatcher.shutdown().await;
}

#[tokio::test]
async fn send_async_escalates_on_exhaustion() {
    let transport = Arc::new(FakeTransport::script(vec![
        Err("timeout".to_string()),
        Err("timeout".to_string()),
        Err("timeout".to_string()),
    ]));
    let config = MailerConfig {
        support_address: Some(SUPPORT.to_string()),
        ..test_config()
    };
    let (store, dispatcher, _) = build(transport.clone(), config);

    let id = dispatcher
        .send_async("buyer@example.test", "Offer received", "Details inside")
        .await
        .unwrap();

    assert_eq!(wait_terminal(&store, id).await, TaskStatus::Failed);

    // The escalation send happens right after the terminal transition.
    for _ in 0..500 {
        if !transport.delivered().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let delivered = transport.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].to, SUPPORT);
    dispatcher.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_the_pool() {
    let transport = Arc::new(FakeTransport::succeeding());
    let (store, dispatcher, _) = build(transport, test_config());

    dispatcher.shutdown().await;

    // Tasks enqueued before shutdown but never submitted stay durable.
    let pending = store
        .find_pending(&[TaskStatus::Queued, TaskStatus::Retrying])
        .await
        .unwrap();
    assert!(pending.is_empty());
}
