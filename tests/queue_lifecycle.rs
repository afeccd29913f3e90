//! End-to-end lifecycle scenarios over a shared temporary store.

use queuectl::config::QueueConfig;
use queuectl::job::{EnqueueRequest, JobManager, JobState};
use queuectl::storage::JobStore;
use queuectl::subprocess::MockProcessRunner;
use queuectl::timestamps;
use queuectl::worker::Worker;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::{sleep, timeout};

async fn setup() -> (TempDir, QueueConfig, JobStore, JobManager) {
    let dir = TempDir::new().unwrap();
    let mut config = QueueConfig::load_from(dir.path());
    config.worker_poll_interval = 0.05;
    config.backoff_base = 0.2;
    let store = JobStore::open(&config.db_path()).await.unwrap();
    let manager = JobManager::new(store.clone(), config.clone());
    (dir, config, store, manager)
}

fn request(id: &str, command: &str, max_retries: Option<u32>) -> EnqueueRequest {
    EnqueueRequest {
        id: id.to_string(),
        command: command.to_string(),
        max_retries,
        scheduled_at: None,
    }
}

async fn wait_for_state(manager: &JobManager, id: &str, state: JobState) {
    let deadline = Duration::from_secs(15);
    timeout(deadline, async {
        loop {
            if let Some(job) = manager.get(id).await.unwrap() {
                if job.state == state {
                    return;
                }
            }
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("job {id} never reached state {state}"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn happy_path_completes_the_job() {
    let (_dir, config, store, manager) = setup().await;
    manager.enqueue(request("j1", "true", None)).await.unwrap();

    let shutdown = Arc::new(AtomicBool::new(false));
    let mut worker = Worker::new(
        "worker-e2e".to_string(),
        store.clone(),
        config.clone(),
        Arc::clone(&shutdown),
    );
    let handle = tokio::spawn(async move { worker.run().await });

    wait_for_state(&manager, "j1", JobState::Completed).await;

    shutdown.store(true, Ordering::SeqCst);
    handle.await.unwrap().unwrap();

    let job = manager.get("j1").await.unwrap().unwrap();
    assert_eq!(job.state, JobState::Completed);
    assert_eq!(job.lock_id, None);
    assert_eq!(job.error_message, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failing_job_retries_then_dead_letters() {
    let (_dir, config, store, manager) = setup().await;
    manager
        .enqueue(request("j3", "false", Some(2)))
        .await
        .unwrap();

    let shutdown = Arc::new(AtomicBool::new(false));
    let mut worker = Worker::new(
        "worker-e2e".to_string(),
        store.clone(),
        config.clone(),
        Arc::clone(&shutdown),
    );
    let handle = tokio::spawn(async move { worker.run().await });

    wait_for_state(&manager, "j3", JobState::Dead).await;

    shutdown.store(true, Ordering::SeqCst);
    handle.await.unwrap().unwrap();

    let job = manager.get("j3").await.unwrap().unwrap();
    assert_eq!(job.attempts, 2);
    assert_eq!(job.lock_id, None);
    assert!(job.error_message.unwrap().contains("exit code 1"));

    // Manual replay resets the job to a clean pending record.
    manager.retry_from_dlq("j3").await.unwrap();
    let replayed = manager.get("j3").await.unwrap().unwrap();
    assert_eq!(replayed.state, JobState::Pending);
    assert_eq!(replayed.attempts, 0);
    assert_eq!(replayed.error_message, None);
    assert_eq!(replayed.scheduled_at, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn one_job_five_workers_single_execution() {
    let (_dir, config, store, manager) = setup().await;
    manager.enqueue(request("j4", "true", None)).await.unwrap();

    let shutdown = Arc::new(AtomicBool::new(false));
    let mut handles = Vec::new();
    let mut mocks = Vec::new();

    for i in 0..5 {
        let mock = MockProcessRunner::new();
        let mut worker = Worker::with_runner(
            format!("worker-{i}"),
            store.clone(),
            config.clone(),
            Arc::clone(&shutdown),
            Arc::new(mock.clone()),
        );
        mocks.push(mock);
        handles.push(tokio::spawn(async move { worker.run().await }));
    }

    wait_for_state(&manager, "j4", JobState::Completed).await;

    shutdown.store(true, Ordering::SeqCst);
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let executions: usize = mocks.iter().map(|m| m.calls().len()).sum();
    assert_eq!(executions, 1);
}

#[tokio::test]
async fn future_scheduled_job_is_pending_but_not_ready() {
    let (_dir, _config, store, manager) = setup().await;

    let mut req = request("j6", "true", None);
    req.scheduled_at = Some(timestamps::to_canonical(
        timestamps::now() + chrono::Duration::seconds(60),
    ));
    manager.enqueue(req).await.unwrap();

    assert!(store.ready(10).await.unwrap().is_empty());

    let pending = manager.list(Some(JobState::Pending)).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, "j6");
}

#[tokio::test]
async fn status_counts_match_listing_under_mixed_states() {
    let (_dir, _config, _store, manager) = setup().await;

    for i in 0..4 {
        manager
            .enqueue(request(&format!("job-{i}"), "true", Some(1)))
            .await
            .unwrap();
    }
    manager.mark_completed("job-0").await.unwrap();
    manager.mark_failed("job-1", "boom").await.unwrap();

    let status = manager.status().await.unwrap();
    assert_eq!(status.completed, 1);
    assert_eq!(status.dead, 1);
    assert_eq!(status.pending, 2);

    let all = manager.list(None).await.unwrap();
    assert_eq!(status.total(), all.len() as i64);
}
