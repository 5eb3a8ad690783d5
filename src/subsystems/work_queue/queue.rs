use std::time::Duration;

use crate::uuid_id;
use anyhow::Context;
use jiff::{Zoned, civil};
use jiff_sqlx::ToSqlx;
use sqlx::{PgConnection, PgPool, types::Json};
use tracing::warn;

use super::tasks::TaskDomainArgs;

uuid_id!(TaskId);

/// Attempt-limited tasks still expire a day after they were first due.
const ATTEMPT_LIMITED_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(sqlx::FromRow)]
struct TaskRow {
    task_id: TaskId,
    domain_args: Json<TaskDomainArgs>,
}

#[derive(Clone)]
pub struct Task {
    pub task_id: TaskId,
    pub domain_args: TaskDomainArgs,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            task_id: row.task_id,
            domain_args: row.domain_args.0,
        }
    }
}

// Stored as INTEGER in the queue table.
#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq)]
#[repr(i32)]
pub enum TaskStatus {
    Queued,
    Running,
    /// Out of attempts or past its timeout. Kept for inspection, never pulled again.
    Failed,
}

#[derive(Debug, Clone)]
pub struct TaskArgs {
    pub trigger: TaskTrigger,
    pub limits: TaskLimit,
    pub domain_args: TaskDomainArgs,
}

#[derive(Debug, Clone)]
pub enum TaskLimit {
    MaxAttempts(i32),
    TimeoutAfter(Duration),
}

#[derive(Debug, Clone)]
pub enum TaskTrigger {
    /// Runs now, at most once per key and task type.
    Once(String),
    ScheduleNow,
    ScheduleFor(civil::DateTime),
}

/// Queue columns derived from a task's trigger and limits.
#[derive(Debug, PartialEq)]
struct Schedule {
    trigger_key: Option<String>,
    run_at: civil::DateTime,
    give_up_at: civil::DateTime,
    max_attempts: i32,
}

impl Schedule {
    fn plan(args: &TaskArgs, now: civil::DateTime) -> Self {
        let (trigger_key, run_at) = match &args.trigger {
            TaskTrigger::Once(key) => (Some(key.clone()), now),
            TaskTrigger::ScheduleNow => (None, now),
            TaskTrigger::ScheduleFor(at) => (None, *at),
        };
        let (give_up_at, max_attempts) = match args.limits {
            TaskLimit::MaxAttempts(attempts) => (run_at + ATTEMPT_LIMITED_TIMEOUT, attempts),
            TaskLimit::TimeoutAfter(timeout) => (run_at + timeout, i32::MAX),
        };
        Schedule {
            trigger_key,
            run_at,
            give_up_at,
            max_attempts,
        }
    }
}

// Queue times are civil times in the server's zone.
fn local_now() -> civil::DateTime {
    Zoned::now().datetime()
}

#[derive(Debug, Clone)]
pub struct WorkQueue {
    pool: PgPool,
}

impl WorkQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn delete_task(&self, task_id: TaskId) -> Result<(), anyhow::Error> {
        sqlx::query("DELETE FROM queue WHERE task_id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Problem removing completed task {task_id}."))?;
        Ok(())
    }

    /// Backs the task off exponentially from 125ms. Returns true when the task is out of
    /// attempts or time, in which case it is parked as [`TaskStatus::Failed`].
    pub async fn fail_task(&self, task_id: TaskId) -> Result<bool, anyhow::Error> {
        let status: TaskStatus = sqlx::query_scalar(
            "UPDATE queue
             SET
                 failed_attempts = failed_attempts + 1,
                 next_attempt_at = next_attempt_at + (INTERVAL '125 millisecond' * pow(2, failed_attempts)),
                 status = CASE
                     WHEN failed_attempts + 1 >= max_attempts
                       OR next_attempt_at + (INTERVAL '125 millisecond' * pow(2, failed_attempts)) >= timeout_at
                     THEN $1 ELSE $2 END,
                 updated_at = $3
             WHERE task_id = $4
             RETURNING status",
        )
        .bind(TaskStatus::Failed)
        .bind(TaskStatus::Queued)
        .bind(jiff::Timestamp::now().to_sqlx())
        .bind(task_id)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Problem recording failure of task {task_id}."))?;
        Ok(status == TaskStatus::Failed)
    }

    /// Claims up to `limit` due tasks. Concurrent pullers never claim the same task.
    pub async fn pull(&self, limit: i64) -> Result<Vec<Task>, anyhow::Error> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            "UPDATE queue
             SET status = $1, updated_at = $2
             WHERE task_id IN (
                 SELECT task_id
                 FROM queue
                 WHERE status = $3 AND scheduled_for <= $4 AND next_attempt_at <= $4
                 ORDER BY scheduled_for
                 FOR UPDATE SKIP LOCKED
                 LIMIT $5
             )
             RETURNING task_id, domain_args",
        )
        .bind(TaskStatus::Running)
        .bind(jiff::Timestamp::now().to_sqlx())
        .bind(TaskStatus::Queued)
        .bind(local_now().to_sqlx())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Problem claiming due tasks.")?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    pub async fn push(&self, args: TaskArgs) -> Result<(), sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        Self::push_with(&mut conn, args).await
    }

    /// Queues a task on the caller's connection so it commits or rolls back with the
    /// caller's transaction.
    pub async fn push_with(conn: &mut PgConnection, args: TaskArgs) -> Result<(), sqlx::Error> {
        let schedule = Schedule::plan(&args, local_now());
        let task_type = args.domain_args.to_string();

        let inserted = sqlx::query(
            "INSERT INTO queue
             (task_id, task_type, trigger_key, created_at, updated_at, scheduled_for,
              next_attempt_at, timeout_at, failed_attempts, max_attempts, status, domain_args)
             VALUES ($1, $2, $3, $4, $4, $5, $5, $6, 0, $7, $8, $9)
             ON CONFLICT ON CONSTRAINT queue_task_type_trigger_key_key DO NOTHING",
        )
        .bind(TaskId::new())
        .bind(&task_type)
        .bind(&schedule.trigger_key)
        .bind(jiff::Timestamp::now().to_sqlx())
        .bind(schedule.run_at.to_sqlx())
        .bind(schedule.give_up_at.to_sqlx())
        .bind(schedule.max_attempts)
        .bind(TaskStatus::Queued)
        .bind(Json(args.domain_args))
        .execute(conn)
        .await?
        .rows_affected();

        if inserted == 0 {
            warn!(
                "{task_type} task for {:?} is already queued, skipping",
                schedule.trigger_key
            );
        }
        Ok(())
    }
}

//---------------------------- Tests -----------------------------
