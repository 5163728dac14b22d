use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::errors::{DomainError, Result};
use domains::models::{DeliveryOutcome, EmailAutomationLog, EmailStatus};
use domains::ports::EmailLogRepository;
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::{db_err, parse_text};

pub struct SqliteEmailLogRepo {
    pool: SqlitePool,
}

impl SqliteEmailLogRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct EmailLogRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    dedup_key: String,
    subject: String,
    payload: String,
    status: String,
    scheduled_for: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
    error: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EmailLogRow> for EmailAutomationLog {
    type Error = DomainError;

    fn try_from(row: EmailLogRow) -> Result<Self> {
        let payload = serde_json::from_str(&row.payload)
            .map_err(|e| DomainError::Internal(format!("corrupt email payload {}: {e}", row.id)))?;
        Ok(EmailAutomationLog {
            id: row.id,
            user_id: row.user_id,
            kind: parse_text(&row.kind)?,
            dedup_key: row.dedup_key,
            subject: row.subject,
            payload,
            status: parse_text(&row.status)?,
            scheduled_for: row.scheduled_for,
            sent_at: row.sent_at,
            error: row.error,
            created_at: row.created_at,
        })
    }
}

const COLUMNS: &str = "id, user_id, kind, dedup_key, subject, payload, status, scheduled_for, \
                       sent_at, error, created_at";

#[async_trait]
impl EmailLogRepository for SqliteEmailLogRepo {
    async fn enqueue(&self, log: &EmailAutomationLog) -> Result<bool> {
        let payload = serde_json::to_string(&log.payload)
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        let result = sqlx::query(&format!(
            "INSERT INTO email_automation_logs ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(dedup_key) DO NOTHING"
        ))
        .bind(log.id)
        .bind(log.user_id)
        .bind(log.kind.as_str())
        .bind(&log.dedup_key)
        .bind(&log.subject)
        .bind(payload)
        .bind(log.status.as_str())
        .bind(log.scheduled_for)
        .bind(log.sent_at)
        .bind(&log.error)
        .bind(log.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, id: Uuid) -> Result<Option<EmailAutomationLog>> {
        sqlx::query_as::<_, EmailLogRow>(&format!(
            "SELECT {COLUMNS} FROM email_automation_logs WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .map(EmailAutomationLog::try_from)
        .transpose()
    }

    async fn due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<EmailAutomationLog>> {
        sqlx::query_as::<_, EmailLogRow>(&format!(
            "SELECT {COLUMNS} FROM email_automation_logs \
             WHERE status = 'pending' AND scheduled_for <= ? ORDER BY scheduled_for LIMIT ?"
        ))
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(EmailAutomationLog::try_from)
        .collect()
    }

    async fn complete(&self, id: Uuid, outcome: &DeliveryOutcome) -> Result<bool> {
        let (sent_at, error) = match outcome {
            DeliveryOutcome::Sent { at } => (Some(*at), None),
            DeliveryOutcome::Failed { error } => (None, Some(error.as_str())),
            DeliveryOutcome::Cancelled { reason } => (None, Some(reason.as_str())),
        };
        // Guarded on 'pending' so each entry leaves that state exactly once.
        let result = sqlx::query(
            "UPDATE email_automation_logs SET status = ?, sent_at = ?, error = ? \
             WHERE id = ? AND status = 'pending'",
        )
        .bind(outcome.status().as_str())
        .bind(sent_at)
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn prune(&self, before: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM email_automation_logs WHERE status != 'pending' AND created_at < ?",
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    async fn count_by_status(&self, status: EmailStatus) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM email_automation_logs WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}
