//! Postgres-backed task store.
//!
//! Owns the connection pool, runs migrations, and maps `email_tasks` rows to
//! the domain model. Rows are append-only in practice: the delivery subsystem
//! updates but never deletes them.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{EmailTask, TaskId, TaskStatus};
use crate::store::TaskStore;

pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    /// Connect to Postgres and create a connection pool.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run all pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| crate::error::Error::Config(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Simple health check — run a SELECT 1.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Most recent tasks, optionally filtered by status. Operator/CLI view
    /// onto the audit trail; not part of the [`TaskStore`] boundary.
    pub async fn list_recent(
        &self,
        status: Option<TaskStatus>,
        limit: i64,
    ) -> Result<Vec<EmailTask>> {
        let rows: Vec<EmailTaskRow> = match status {
            Some(status) => {
                sqlx::query_as(
                    "SELECT id, recipient, subject, body, content_hash, status, attempts, last_error, created_at, updated_at, sent_at
                     FROM email_tasks WHERE status = $1
                     ORDER BY created_at DESC LIMIT $2",
                )
                .bind(status.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT id, recipient, subject, body, content_hash, status, attempts, last_error, created_at, updated_at, sent_at
                     FROM email_tasks
                     ORDER BY created_at DESC LIMIT $1",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(EmailTaskRow::try_into_task).collect()
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn enqueue(&self, recipient: &str, subject: &str, body: &str) -> Result<EmailTask> {
        let task = EmailTask::new(recipient, subject, body);

        sqlx::query(
            "INSERT INTO email_tasks (id, recipient, subject, body, content_hash, status, attempts, last_error, created_at, updated_at, sent_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(task.id.0)
        .bind(&task.recipient)
        .bind(&task.subject)
        .bind(&task.body)
        .bind(&task.content_hash)
        .bind(task.status.as_str())
        .bind(task.attempts as i32)
        .bind(&task.last_error)
        .bind(task.created_at)
        .bind(task.updated_at)
        .bind(task.sent_at)
        .execute(&self.pool)
        .await?;

        Ok(task)
    }

    async fn get(&self, id: TaskId) -> Result<Option<EmailTask>> {
        let row: Option<EmailTaskRow> = sqlx::query_as(
            "SELECT id, recipient, subject, body, content_hash, status, attempts, last_error, created_at, updated_at, sent_at
             FROM email_tasks WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(EmailTaskRow::try_into_task).transpose()
    }

    async fn find_pending(&self, statuses: &[TaskStatus]) -> Result<Vec<EmailTask>> {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let rows: Vec<EmailTaskRow> = sqlx::query_as(
            "SELECT id, recipient, subject, body, content_hash, status, attempts, last_error, created_at, updated_at, sent_at
             FROM email_tasks WHERE status = ANY($1)
             ORDER BY created_at ASC",
        )
        .bind(&statuses)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EmailTaskRow::try_into_task).collect()
    }

    async fn save(&self, task: &EmailTask) -> Result<()> {
        sqlx::query(
            "INSERT INTO email_tasks (id, recipient, subject, body, content_hash, status, attempts, last_error, created_at, updated_at, sent_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (id) DO UPDATE SET
                 recipient = EXCLUDED.recipient,
                 subject = EXCLUDED.subject,
                 body = EXCLUDED.body,
                 content_hash = EXCLUDED.content_hash,
                 status = EXCLUDED.status,
                 attempts = EXCLUDED.attempts,
                 last_error = EXCLUDED.last_error,
                 updated_at = EXCLUDED.updated_at,
                 sent_at = EXCLUDED.sent_at",
        )
        .bind(task.id.0)
        .bind(&task.recipient)
        .bind(&task.subject)
        .bind(&task.body)
        .bind(&task.content_hash)
        .bind(task.status.as_str())
        .bind(task.attempts as i32)
        .bind(&task.last_error)
        .bind(task.created_at)
        .bind(task.updated_at)
        .bind(task.sent_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct EmailTaskRow {
    id: Uuid,
    recipient: String,
    subject: String,
    body: String,
    content_hash: String,
    status: String,
    attempts: i32,
    last_error: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    sent_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl EmailTaskRow {
    fn try_into_task(self) -> Result<EmailTask> {
        Ok(EmailTask {
            id: TaskId(self.id),
            recipient: self.recipient,
            subject: self.subject,
            body: self.body,
            content_hash: self.content_hash,
            status: self.status.parse()?,
            attempts: self.attempts as u32,
            last_error: self.last_error,
            created_at: self.created_at,
            updated_at: self.updated_at,
            sent_at: self.sent_at,
        })
    }
}
