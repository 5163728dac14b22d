use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::errors::{DomainError, Result};
use domains::models::Booking;
use domains::ports::BookingRepository;
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::{db_err, parse_text};

pub struct SqliteBookingRepo {
    pool: SqlitePool,
}

impl SqliteBookingRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    task_id: Uuid,
    client_id: Uuid,
    provider_id: Uuid,
    starts_at: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = DomainError;

    fn try_from(row: BookingRow) -> Result<Self> {
        Ok(Booking {
            id: row.id,
            task_id: row.task_id,
            client_id: row.client_id,
            provider_id: row.provider_id,
            starts_at: row.starts_at,
            status: parse_text(&row.status)?,
            created_at: row.created_at,
        })
    }
}

const COLUMNS: &str = "id, task_id, client_id, provider_id, starts_at, status, created_at";

#[async_trait]
impl BookingRepository for SqliteBookingRepo {
    async fn create(&self, booking: &Booking) -> Result<()> {
        sqlx::query(
            "INSERT INTO bookings (id, task_id, client_id, provider_id, starts_at, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(booking.id)
        .bind(booking.task_id)
        .bind(booking.client_id)
        .bind(booking.provider_id)
        .bind(booking.starts_at)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>> {
        sqlx::query_as::<_, BookingRow>(&format!("SELECT {COLUMNS} FROM bookings WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(Booking::try_from)
            .transpose()
    }

    async fn update(&self, booking: &Booking) -> Result<()> {
        let result = sqlx::query("UPDATE bookings SET starts_at = ?, status = ? WHERE id = ?")
            .bind(booking.starts_at)
            .bind(booking.status.as_str())
            .bind(booking.id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Booking", booking.id));
        }
        Ok(())
    }

    async fn list_confirmed_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>> {
        sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {COLUMNS} FROM bookings WHERE status = 'confirmed' \
             AND starts_at >= ? AND starts_at < ? ORDER BY starts_at"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(Booking::try_from)
        .collect()
    }
}
