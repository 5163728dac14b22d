use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::errors::{DomainError, Result};
use domains::models::{CreditTransaction, OfferStatus, Task, TaskStatus};
use domains::ports::TaskRepository;
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use super::credits::insert_credit;
use crate::{db_err, parse_text};

pub struct SqliteTaskRepo {
    pool: SqlitePool,
}

impl SqliteTaskRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    client_id: Uuid,
    title: String,
    description: String,
    category: String,
    city: String,
    budget: Option<i32>,
    status: String,
    assigned_provider_id: Option<Uuid>,
    is_generated: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<TaskRow> for Task {
    type Error = DomainError;

    fn try_from(row: TaskRow) -> Result<Self> {
        Ok(Task {
            id: row.id,
            client_id: row.client_id,
            title: row.title,
            description: row.description,
            category: row.category,
            city: row.city,
            budget: row.budget,
            status: parse_text(&row.status)?,
            assigned_provider_id: row.assigned_provider_id,
            is_generated: row.is_generated,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
        })
    }
}

const COLUMNS: &str = "id, client_id, title, description, category, city, budget, status, \
                       assigned_provider_id, is_generated, created_at, updated_at, completed_at";

fn collect(rows: Vec<TaskRow>) -> Result<Vec<Task>> {
    rows.into_iter().map(Task::try_from).collect()
}

/// Shared by the offer repository, which persists the task inside its own
/// transaction when an offer is accepted.
pub(crate) async fn update_task<'e, E>(executor: E, task: &Task) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        "UPDATE tasks SET title = ?, description = ?, category = ?, city = ?, budget = ?, \
         status = ?, assigned_provider_id = ?, updated_at = ?, completed_at = ? WHERE id = ?",
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(&task.category)
    .bind(&task.city)
    .bind(task.budget)
    .bind(task.status.as_str())
    .bind(task.assigned_provider_id)
    .bind(task.updated_at)
    .bind(task.completed_at)
    .bind(task.id)
    .execute(executor)
    .await
    .map_err(db_err)?;

    if result.rows_affected() == 0 {
        return Err(DomainError::not_found("Task", task.id));
    }
    Ok(())
}

#[async_trait]
impl TaskRepository for SqliteTaskRepo {
    async fn create(&self, task: &Task) -> Result<()> {
        sqlx::query(
            "INSERT INTO tasks (id, client_id, title, description, category, city, budget, status, \
             assigned_provider_id, is_generated, created_at, updated_at, completed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(task.id)
        .bind(task.client_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.category)
        .bind(&task.city)
        .bind(task.budget)
        .bind(task.status.as_str())
        .bind(task.assigned_provider_id)
        .bind(task.is_generated)
        .bind(task.created_at)
        .bind(task.updated_at)
        .bind(task.completed_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Task>> {
        sqlx::query_as::<_, TaskRow>(&format!("SELECT {COLUMNS} FROM tasks WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(Task::try_from)
            .transpose()
    }

    async fn update(&self, task: &Task) -> Result<()> {
        update_task(&self.pool, task).await
    }

    async fn list_open(&self, city: Option<String>, limit: i64) -> Result<Vec<Task>> {
        let rows = match city {
            Some(city) => {
                sqlx::query_as::<_, TaskRow>(&format!(
                    "SELECT {COLUMNS} FROM tasks WHERE status = 'open' AND city = ? COLLATE NOCASE \
                     ORDER BY created_at DESC LIMIT ?"
                ))
                .bind(city)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, TaskRow>(&format!(
                    "SELECT {COLUMNS} FROM tasks WHERE status = 'open' ORDER BY created_at DESC LIMIT ?"
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(db_err)?;
        collect(rows)
    }

    async fn list_open_created_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {COLUMNS} FROM tasks WHERE status = 'open' AND created_at >= ? AND created_at < ? \
             ORDER BY created_at DESC"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        collect(rows)
    }

    async fn list_completed_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {COLUMNS} FROM tasks WHERE status = 'completed' \
             AND completed_at >= ? AND completed_at < ? ORDER BY completed_at"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        collect(rows)
    }

    async fn count_by_status(&self, status: TaskStatus) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tasks WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn cancel(&self, task: &Task, refunds: &[CreditTransaction]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        update_task(&mut *tx, task).await?;

        sqlx::query("UPDATE offers SET status = ?, updated_at = ? WHERE task_id = ? AND status = ?")
            .bind(OfferStatus::Rejected.as_str())
            .bind(task.updated_at)
            .bind(task.id)
            .bind(OfferStatus::Pending.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for refund in refunds {
            insert_credit(&mut *tx, refund).await?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn list_generated_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {COLUMNS} FROM tasks WHERE is_generated = 1 AND created_at < ? ORDER BY created_at"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        collect(rows)
    }

    async fn delete_generated_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        // The is_generated predicate is what protects real tasks.
        let result = sqlx::query("DELETE FROM tasks WHERE is_generated = 1 AND created_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}
