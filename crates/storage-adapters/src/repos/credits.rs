use async_trait::async_trait;
use domains::errors::Result;
use domains::models::CreditTransaction;
use domains::ports::CreditRepository;
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::db_err;

pub struct SqliteCreditRepo {
    pool: SqlitePool,
}

impl SqliteCreditRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

pub(crate) async fn insert_credit<'e, E>(executor: E, tx: &CreditTransaction) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO credit_transactions (id, user_id, amount, reason, reference_id, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(tx.id)
    .bind(tx.user_id)
    .bind(tx.amount)
    .bind(tx.reason.as_str())
    .bind(tx.reference_id)
    .bind(tx.created_at)
    .execute(executor)
    .await
    .map_err(db_err)?;
    Ok(())
}

#[async_trait]
impl CreditRepository for SqliteCreditRepo {
    async fn record(&self, tx: &CreditTransaction) -> Result<()> {
        insert_credit(&self.pool, tx).await
    }

    async fn balance(&self, user_id: Uuid) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(amount), 0) FROM credit_transactions WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }
}
