use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::errors::{DomainError, Result};
use domains::models::{CreditTransaction, Offer, OfferStatus, Task};
use domains::ports::OfferRepository;
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use super::credits::insert_credit;
use super::tasks::update_task;
use crate::{db_err, parse_text};

pub struct SqliteOfferRepo {
    pool: SqlitePool,
}

impl SqliteOfferRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OfferRow {
    id: Uuid,
    task_id: Uuid,
    provider_id: Uuid,
    price: i32,
    message: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OfferRow> for Offer {
    type Error = DomainError;

    fn try_from(row: OfferRow) -> Result<Self> {
        Ok(Offer {
            id: row.id,
            task_id: row.task_id,
            provider_id: row.provider_id,
            price: row.price,
            message: row.message,
            status: parse_text(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const COLUMNS: &str = "id, task_id, provider_id, price, message, status, created_at, updated_at";

fn collect(rows: Vec<OfferRow>) -> Result<Vec<Offer>> {
    rows.into_iter().map(Offer::try_from).collect()
}

#[async_trait]
impl OfferRepository for SqliteOfferRepo {
    /// Offer and credit debit succeed or fail together, so a provider is
    /// never charged for an offer that was rejected as a duplicate.
    async fn submit(&self, offer: &Offer, debit: &CreditTransaction) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            "INSERT INTO offers (id, task_id, provider_id, price, message, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(offer.id)
        .bind(offer.task_id)
        .bind(offer.provider_id)
        .bind(offer.price)
        .bind(&offer.message)
        .bind(offer.status.as_str())
        .bind(offer.created_at)
        .bind(offer.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if debit.amount != 0 {
            insert_credit(&mut *tx, debit).await?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Offer>> {
        sqlx::query_as::<_, OfferRow>(&format!("SELECT {COLUMNS} FROM offers WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(Offer::try_from)
            .transpose()
    }

    async fn update(&self, offer: &Offer) -> Result<()> {
        let result = sqlx::query("UPDATE offers SET price = ?, message = ?, status = ?, updated_at = ? WHERE id = ?")
            .bind(offer.price)
            .bind(&offer.message)
            .bind(offer.status.as_str())
            .bind(offer.updated_at)
            .bind(offer.id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Offer", offer.id));
        }
        Ok(())
    }

    async fn list_for_task(&self, task_id: Uuid) -> Result<Vec<Offer>> {
        let rows = sqlx::query_as::<_, OfferRow>(&format!(
            "SELECT {COLUMNS} FROM offers WHERE task_id = ? ORDER BY created_at"
        ))
        .bind(task_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        collect(rows)
    }

    async fn count_for_task(&self, task_id: Uuid) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM offers WHERE task_id = ?")
            .bind(task_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn list_pending_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Offer>> {
        let rows = sqlx::query_as::<_, OfferRow>(&format!(
            "SELECT {COLUMNS} FROM offers WHERE status = 'pending' AND created_at < ? ORDER BY created_at"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        collect(rows)
    }

    /// Accepting an offer touches three things (the winning offer, the other
    /// pending offers, the task); a transaction keeps them consistent.
    async fn accept(&self, task: &Task, offer_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let accepted = sqlx::query(
            "UPDATE offers SET status = ?, updated_at = ? WHERE id = ? AND task_id = ? AND status = ?",
        )
        .bind(OfferStatus::Accepted.as_str())
        .bind(task.updated_at)
        .bind(offer_id)
        .bind(task.id)
        .bind(OfferStatus::Pending.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if accepted.rows_affected() == 0 {
            return Err(DomainError::Conflict(format!(
                "offer {offer_id} is no longer pending"
            )));
        }

        sqlx::query("UPDATE offers SET status = ?, updated_at = ? WHERE task_id = ? AND id != ? AND status = ?")
            .bind(OfferStatus::Rejected.as_str())
            .bind(task.updated_at)
            .bind(task.id)
            .bind(offer_id)
            .bind(OfferStatus::Pending.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        update_task(&mut *tx, task).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}
