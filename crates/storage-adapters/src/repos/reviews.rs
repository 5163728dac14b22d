use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::errors::{DomainError, Result};
use domains::models::{RatingSummary, Review};
use domains::ports::ReviewRepository;
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::db_err;

pub struct SqliteReviewRepo {
    pool: SqlitePool,
}

impl SqliteReviewRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    task_id: Uuid,
    reviewer_id: Uuid,
    reviewee_id: Uuid,
    rating: i64,
    comment: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = DomainError;

    fn try_from(row: ReviewRow) -> Result<Self> {
        let rating = u8::try_from(row.rating)
            .map_err(|_| DomainError::Internal(format!("corrupt rating {}", row.rating)))?;
        Ok(Review {
            id: row.id,
            task_id: row.task_id,
            reviewer_id: row.reviewer_id,
            reviewee_id: row.reviewee_id,
            rating,
            comment: row.comment,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl ReviewRepository for SqliteReviewRepo {
    async fn create(&self, review: &Review) -> Result<()> {
        sqlx::query(
            "INSERT INTO reviews (id, task_id, reviewer_id, reviewee_id, rating, comment, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(review.id)
        .bind(review.task_id)
        .bind(review.reviewer_id)
        .bind(review.reviewee_id)
        .bind(i64::from(review.rating))
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn exists(&self, task_id: Uuid, reviewer_id: Uuid) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reviews WHERE task_id = ? AND reviewer_id = ?",
        )
        .bind(task_id)
        .bind(reviewer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn list_for_user(&self, reviewee_id: Uuid) -> Result<Vec<Review>> {
        sqlx::query_as::<_, ReviewRow>(
            "SELECT id, task_id, reviewer_id, reviewee_id, rating, comment, created_at \
             FROM reviews WHERE reviewee_id = ? ORDER BY created_at DESC",
        )
        .bind(reviewee_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(Review::try_from)
        .collect()
    }

    async fn summary_for(&self, reviewee_id: Uuid) -> Result<RatingSummary> {
        let (count, average): (i64, Option<f64>) = sqlx::query_as(
            "SELECT COUNT(*), AVG(rating) FROM reviews WHERE reviewee_id = ?",
        )
        .bind(reviewee_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(RatingSummary {
            count,
            average: average.unwrap_or(0.0),
        })
    }
}
