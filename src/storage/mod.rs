//! SQLite-backed durable job store.
//!
//! One database file, shared by the CLI process and every worker process on
//! the host. The store's conditional updates are the only synchronization
//! primitive in the system: [`JobStore::try_claim`] is a single `UPDATE`
//! whose `rows_affected` decides the winner, so at most one claimant can
//! move a job from `pending` to `processing`.
//!
//! Timestamps are persisted in the canonical text form produced by
//! [`crate::timestamps`]; readiness and ordering comparisons in SQL are
//! plain string comparisons over that form.

pub mod error;


pub use error::{StorageError, StorageResult};

use crate::job::{Job, JobState};
use crate::timestamps;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Partial update applied to a job record.
///
/// Outer `None` leaves a column untouched; `Some(None)` clears a nullable
/// column. `updated_at` is always advanced, never set by callers.
#[derive(Debug, Clone, Default)]
pub struct JobChanges {
    pub state: Option<JobState>,
    pub attempts: Option<u32>,
    pub error_message: Option<Option<String>>,
    pub scheduled_at: Option<Option<DateTime<Utc>>>,
    pub lock_id: Option<Option<String>>,
}

/// Handle to the job table. Cheap to clone; all clones share one pool.
#[derive(Clone)]
pub struct JobStore {
    pool: SqlitePool,
}

impl JobStore {
    /// Open (creating if missing) the database at `db_path` and ensure the
    /// schema exists.
    ///
    /// WAL journaling keeps concurrent readers off the writers' backs; the
    /// busy timeout lets short write bursts from several workers serialize
    /// instead of failing.
    pub async fn open(db_path: &Path) -> StorageResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Access the underlying pool (tests, maintenance).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                command TEXT NOT NULL,
                state TEXT NOT NULL,
                attempts INTEGER NOT NULL DEFAULT 0,
                max_retries INTEGER NOT NULL DEFAULT 3,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                scheduled_at TEXT,
                error_message TEXT,
                lock_id TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_state ON jobs(state)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_scheduled_at ON jobs(scheduled_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert a new job record. Fails with [`StorageError::Duplicate`] if the
    /// id already exists.
    pub async fn create(&self, job: &Job) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO jobs
                (id, command, state, attempts, max_retries,
                 created_at, updated_at, scheduled_at, error_message, lock_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.command)
        .bind(job.state.as_str())
        .bind(job.attempts as i64)
        .bind(job.max_retries as i64)
        .bind(timestamps::to_canonical(job.created_at))
        .bind(timestamps::to_canonical(job.updated_at))
        .bind(job.scheduled_at.map(timestamps::to_canonical))
        .bind(&job.error_message)
        .bind(&job.lock_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StorageError::Duplicate(job.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch a job by id; absent jobs are `None`, not an error.
    pub async fn get(&self, id: &str) -> StorageResult<Option<Job>> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(job_from_row).transpose()
    }

    /// Merge `changes` into the record, always advancing `updated_at`.
    ///
    /// A missing id is a silent no-op, matching the conditional-update
    /// contract of the other mutators.
    pub async fn update(&self, id: &str, changes: JobChanges) -> StorageResult<()> {
        let mut sets: Vec<&str> = vec!["updated_at = ?"];
        if changes.state.is_some() {
            sets.push("state = ?");
        }
        if changes.attempts.is_some() {
            sets.push("attempts = ?");
        }
        if changes.error_message.is_some() {
            sets.push("error_message = ?");
        }
        if changes.scheduled_at.is_some() {
            sets.push("scheduled_at = ?");
        }
        if changes.lock_id.is_some() {
            sets.push("lock_id = ?");
        }

        let sql = format!("UPDATE jobs SET {} WHERE id = ?", sets.join(", "));
        let mut query = sqlx::query(&sql).bind(timestamps::now_canonical());
        if let Some(state) = changes.state {
            query = query.bind(state.as_str());
        }
        if let Some(attempts) = changes.attempts {
            query = query.bind(attempts as i64);
        }
        if let Some(error_message) = changes.error_message {
            query = query.bind(error_message);
        }
        if let Some(scheduled_at) = changes.scheduled_at {
            query = query.bind(scheduled_at.map(timestamps::to_canonical));
        }
        if let Some(lock_id) = changes.lock_id {
            query = query.bind(lock_id);
        }

        query.bind(id).execute(&self.pool).await?;
        Ok(())
    }

    /// List jobs ordered by creation time, optionally filtered by state.
    pub async fn list(&self, state: Option<JobState>) -> StorageResult<Vec<Job>> {
        let rows = match state {
            Some(state) => {
                sqlx::query("SELECT * FROM jobs WHERE state = ? ORDER BY created_at")
                    .bind(state.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT * FROM jobs ORDER BY created_at")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(job_from_row).collect()
    }

    /// Delete a job record.
    pub async fn delete(&self, id: &str) -> StorageResult<()> {
        sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Jobs eligible to run now: `pending`, with no schedule or a schedule
    /// at or before the current time. Oldest first, truncated to `limit`.
    pub async fn ready(&self, limit: i64) -> StorageResult<Vec<Job>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM jobs
            WHERE state = 'pending'
              AND (scheduled_at IS NULL OR scheduled_at <= ?)
            ORDER BY created_at
            LIMIT ?
            "#,
        )
        .bind(timestamps::now_canonical())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(job_from_row).collect()
    }

    /// Atomically claim a pending, unlocked job for `claimant`.
    ///
    /// Compare-and-swap via a conditional `UPDATE`: the row moves to
    /// `processing` with `lock_id = claimant` only if it is still `pending`
    /// and unlocked. SQLite serializes writers, so exactly one concurrent
    /// caller observes `rows_affected == 1`.
    pub async fn try_claim(&self, id: &str, claimant: &str) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'processing', lock_id = ?, updated_at = ?
            WHERE id = ?
              AND state = 'pending'
              AND (lock_id IS NULL OR lock_id = '')
            "#,
        )
        .bind(claimant)
        .bind(timestamps::now_canonical())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Release `claimant`'s lock on a job. No-op if the lock is held by
    /// someone else (or nobody). Leaves `state` untouched; the lifecycle
    /// manager records the terminal state before releasing.
    pub async fn release(&self, id: &str, claimant: &str) -> StorageResult<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET lock_id = NULL, updated_at = ?
            WHERE id = ? AND lock_id = ?
            "#,
        )
        .bind(timestamps::now_canonical())
        .bind(id)
        .bind(claimant)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Job counts grouped by state. States with no jobs are absent from the
    /// map; callers zero-fill.
    pub async fn counts_by_state(&self) -> StorageResult<HashMap<JobState, i64>> {
        let rows = sqlx::query("SELECT state, COUNT(*) AS n FROM jobs GROUP BY state")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = HashMap::new();
        for row in &rows {
            let name: String = row.try_get("state")?;
            let state = JobState::from_str(&name).map_err(StorageError::corrupt)?;
            let n: i64 = row.try_get("n")?;
            counts.insert(state, n);
        }
        Ok(counts)
    }
}

fn job_from_row(row: &SqliteRow) -> StorageResult<Job> {
    let state_name: String = row.try_get("state")?;
    let state = JobState::from_str(&state_name).map_err(StorageError::corrupt)?;

    let attempts: i64 = row.try_get("attempts")?;
    let max_retries: i64 = row.try_get("max_retries")?;

    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    let scheduled_at: Option<String> = row.try_get("scheduled_at")?;

    Ok(Job {
        id: row.try_get("id")?,
        command: row.try_get("command")?,
        state,
        attempts: u32::try_from(attempts).map_err(StorageError::corrupt)?,
        max_retries: u32::try_from(max_retries).map_err(StorageError::corrupt)?,
        created_at: timestamps::parse_canonical(&created_at).map_err(StorageError::corrupt)?,
        updated_at: timestamps::parse_canonical(&updated_at).map_err(StorageError::corrupt)?,
        scheduled_at: scheduled_at
            .map(|s| timestamps::parse_canonical(&s))
            .transpose()
            .map_err(StorageError::corrupt)?,
        error_message: row.try_get("error_message")?,
        lock_id: row.try_get("lock_id")?,
    })
}
