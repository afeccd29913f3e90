//! Lifecycle manager tests.

use super::*;
use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::storage::JobStore;
use crate::timestamps;
use chrono::Duration as ChronoDuration;
use tempfile::TempDir;

async fn setup() -> (TempDir, JobManager) {
    let dir = TempDir::new().unwrap();
    let config = QueueConfig::load_from(dir.path());
    let store = JobStore::open(&config.db_path()).await.unwrap();
    (dir, JobManager::new(store, config))
}

fn request(id: &str, command: &str) -> EnqueueRequest {
    EnqueueRequest {
        id: id.to_string(),
        command: command.to_string(),
        max_retries: None,
        scheduled_at: None,
    }
}

#[tokio::test]
async fn enqueue_applies_defaults() {
    let (_dir, manager) = setup().await;
    let job = manager.enqueue(request("j1", "true")).await.unwrap();

    assert_eq!(job.state, JobState::Pending);
    assert_eq!(job.attempts, 0);
    assert_eq!(job.max_retries, 3);
    assert_eq!(job.created_at, job.updated_at);

    let stored = manager.get("j1").await.unwrap().unwrap();
    assert_eq!(stored.command, "true");
    assert_eq!(stored.state, JobState::Pending);
}

#[tokio::test]
async fn enqueue_rejects_empty_fields() {
    let (_dir, manager) = setup().await;

    let err = manager.enqueue(request("", "true")).await.unwrap_err();
    assert!(matches!(err, QueueError::InvalidInput(_)));

    let err = manager.enqueue(request("j1", "  ")).await.unwrap_err();
    assert!(matches!(err, QueueError::InvalidInput(_)));

    assert!(manager.get("j1").await.unwrap().is_none());
}

#[tokio::test]
async fn enqueue_rejects_zero_max_retries() {
    let (_dir, manager) = setup().await;
    let mut req = request("j1", "true");
    req.max_retries = Some(0);
    let err = manager.enqueue(req).await.unwrap_err();
    assert!(matches!(err, QueueError::InvalidInput(_)));
}

#[tokio::test]
async fn enqueue_duplicate_id_keeps_original() {
    let (_dir, manager) = setup().await;
    manager.enqueue(request("j1", "true")).await.unwrap();

    let err = manager.enqueue(request("j1", "false")).await.unwrap_err();
    assert!(matches!(err, QueueError::Duplicate(_)));

    let job = manager.get("j1").await.unwrap().unwrap();
    assert_eq!(job.command, "true");
}

#[tokio::test]
async fn enqueue_parses_scheduled_at() {
    let (_dir, manager) = setup().await;

    let future = timestamps::now() + ChronoDuration::seconds(60);
    let mut req = request("j1", "true");
    req.scheduled_at = Some(timestamps::to_canonical(future));
    let job = manager.enqueue(req).await.unwrap();
    assert!(job.scheduled_at.is_some());

    let mut bad = request("j2", "true");
    bad.scheduled_at = Some("next tuesday".to_string());
    let err = manager.enqueue(bad).await.unwrap_err();
    assert!(matches!(err, QueueError::InvalidInput(_)));
}

#[tokio::test]
async fn mark_completed_is_idempotent() {
    let (_dir, manager) = setup().await;
    manager.enqueue(request("j1", "true")).await.unwrap();

    manager.mark_completed("j1").await.unwrap();
    let first = manager.get("j1").await.unwrap().unwrap();

    manager.mark_completed("j1").await.unwrap();
    let second = manager.get("j1").await.unwrap().unwrap();

    assert_eq!(first.state, JobState::Completed);
    assert_eq!(second.state, first.state);
    assert_eq!(second.attempts, first.attempts);
    assert_eq!(second.error_message, first.error_message);
}

#[tokio::test]
async fn mark_failed_schedules_retry_with_backoff() {
    let (_dir, manager) = setup().await;
    manager.enqueue(request("j1", "false")).await.unwrap();

    let before = timestamps::now();
    manager.mark_failed("j1", "boom").await.unwrap();

    let job = manager.get("j1").await.unwrap().unwrap();
    assert_eq!(job.state, JobState::Pending);
    assert_eq!(job.attempts, 1);
    assert_eq!(job.error_message.as_deref(), Some("boom"));
    assert_eq!(job.lock_id, None);

    // First retry with the default base of 2.0 lands ~2 s out.
    let scheduled = job.scheduled_at.unwrap();
    assert!(scheduled > before + ChronoDuration::seconds(1));
    assert!(scheduled < before + ChronoDuration::seconds(4));
}

#[tokio::test]
async fn mark_failed_dead_letters_at_the_limit() {
    let (_dir, manager) = setup().await;
    let mut req = request("j1", "false");
    req.max_retries = Some(2);
    manager.enqueue(req).await.unwrap();

    manager.mark_failed("j1", "first").await.unwrap();
    let after_first = manager.get("j1").await.unwrap().unwrap();
    assert_eq!(after_first.state, JobState::Pending);
    assert_eq!(after_first.attempts, 1);

    manager.mark_failed("j1", "second").await.unwrap();
    let after_second = manager.get("j1").await.unwrap().unwrap();
    assert_eq!(after_second.state, JobState::Dead);
    assert_eq!(after_second.attempts, 2);
    assert_eq!(after_second.error_message.as_deref(), Some("second"));
    assert_eq!(after_second.lock_id, None);
}

#[tokio::test]
async fn mark_failed_missing_job_is_a_noop() {
    let (_dir, manager) = setup().await;
    manager.mark_failed("ghost", "boom").await.unwrap();
}

#[tokio::test]
async fn retry_from_dlq_resets_the_job() {
    let (_dir, manager) = setup().await;
    let mut req = request("j1", "false");
    req.max_retries = Some(1);
    manager.enqueue(req).await.unwrap();
    manager.mark_failed("j1", "boom").await.unwrap();
    assert_eq!(
        manager.get("j1").await.unwrap().unwrap().state,
        JobState::Dead
    );

    manager.retry_from_dlq("j1").await.unwrap();
    let job = manager.get("j1").await.unwrap().unwrap();
    assert_eq!(job.state, JobState::Pending);
    assert_eq!(job.attempts, 0);
    assert_eq!(job.error_message, None);
    assert_eq!(job.scheduled_at, None);
    assert_eq!(job.lock_id, None);
}

#[tokio::test]
async fn replayed_job_can_die_again() {
    let (_dir, manager) = setup().await;
    let mut req = request("j1", "false");
    req.max_retries = Some(2);
    manager.enqueue(req).await.unwrap();
    manager.mark_failed("j1", "a").await.unwrap();
    manager.mark_failed("j1", "b").await.unwrap();
    manager.retry_from_dlq("j1").await.unwrap();

    manager.mark_failed("j1", "c").await.unwrap();
    manager.mark_failed("j1", "d").await.unwrap();

    let job = manager.get("j1").await.unwrap().unwrap();
    assert_eq!(job.state, JobState::Dead);
    assert_eq!(job.attempts, 2);
}

#[tokio::test]
async fn retry_from_dlq_requires_dead_state() {
    let (_dir, manager) = setup().await;
    manager.enqueue(request("j1", "true")).await.unwrap();

    let err = manager.retry_from_dlq("j1").await.unwrap_err();
    assert!(matches!(err, QueueError::InvalidState { .. }));

    let err = manager.retry_from_dlq("ghost").await.unwrap_err();
    assert!(matches!(err, QueueError::NotFound(_)));
}

#[tokio::test]
async fn delete_requires_existing_job() {
    let (_dir, manager) = setup().await;
    manager.enqueue(request("j1", "true")).await.unwrap();

    manager.delete("j1").await.unwrap();
    assert!(manager.get("j1").await.unwrap().is_none());

    let err = manager.delete("j1").await.unwrap_err();
    assert!(matches!(err, QueueError::NotFound(_)));
}

#[tokio::test]
async fn status_zero_fills_and_matches_list() {
    let (_dir, manager) = setup().await;
    let empty = manager.status().await.unwrap();
    assert_eq!(empty, QueueStatus::default());

    manager.enqueue(request("j1", "true")).await.unwrap();
    manager.enqueue(request("j2", "true")).await.unwrap();
    manager.enqueue(request("j3", "true")).await.unwrap();
    manager.mark_completed("j2").await.unwrap();

    let status = manager.status().await.unwrap();
    assert_eq!(status.pending, 2);
    assert_eq!(status.completed, 1);
    assert_eq!(status.processing, 0);
    assert_eq!(status.failed, 0);
    assert_eq!(status.dead, 0);

    let all = manager.list(None).await.unwrap();
    assert_eq!(status.total(), all.len() as i64);
}

#[tokio::test]
async fn list_filters_by_state() {
    let (_dir, manager) = setup().await;
    manager.enqueue(request("j1", "true")).await.unwrap();
    manager.enqueue(request("j2", "true")).await.unwrap();
    manager.mark_completed("j1").await.unwrap();

    let completed = manager.list(Some(JobState::Completed)).await.unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, "j1");

    let dead = manager.list(Some(JobState::Dead)).await.unwrap();
    assert!(dead.is_empty());
}

#[test]
fn job_state_parses_and_displays() {
    for state in JobState::ALL {
        assert_eq!(state.as_str().parse::<JobState>().unwrap(), state);
        assert_eq!(state.to_string(), state.as_str());
    }
    assert!("bogus".parse::<JobState>().is_err());
}
