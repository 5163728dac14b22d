use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::errors::{DomainError, Result};
use domains::models::{User, UserRole};
use domains::ports::UserRepository;
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::{db_err, parse_text};

pub struct SqliteUserRepo {
    pool: SqlitePool,
}

impl SqliteUserRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    city: Option<String>,
    email_notifications: bool,
    telegram_chat_id: Option<i64>,
    is_generated: bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: parse_text(&row.role)?,
            city: row.city,
            email_notifications: row.email_notifications,
            telegram_chat_id: row.telegram_chat_id,
            is_generated: row.is_generated,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
        })
    }
}

const COLUMNS: &str = "id, name, email, password_hash, role, city, email_notifications, \
                       telegram_chat_id, is_generated, last_login_at, created_at";

fn collect(rows: Vec<UserRow>) -> Result<Vec<User>> {
    rows.into_iter().map(User::try_from).collect()
}

#[async_trait]
impl UserRepository for SqliteUserRepo {
    async fn create(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, city, email_notifications, \
             telegram_chat_id, is_generated, last_login_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.city)
        .bind(user.email_notifications)
        .bind(user.telegram_chat_id)
        .bind(user.is_generated)
        .bind(user.last_login_at)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {COLUMNS} FROM users WHERE email = ?"))
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(User::try_from)
            .transpose()
    }

    async fn list_by_role(&self, role: UserRole) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {COLUMNS} FROM users WHERE role = ? ORDER BY created_at"
        ))
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        collect(rows)
    }

    async fn list_notifiable(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {COLUMNS} FROM users WHERE email_notifications = 1 AND is_generated = 0 \
             ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        collect(rows)
    }

    async fn list_created_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {COLUMNS} FROM users WHERE created_at >= ? AND created_at <= ? \
             AND is_generated = 0 ORDER BY created_at"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        collect(rows)
    }

    async fn list_inactive_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {COLUMNS} FROM users WHERE email_notifications = 1 AND is_generated = 0 \
             AND COALESCE(last_login_at, created_at) < ? \
             ORDER BY COALESCE(last_login_at, created_at)"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        collect(rows)
    }

    async fn set_email_notifications(&self, id: Uuid, enabled: bool) -> Result<()> {
        let result = sqlx::query("UPDATE users SET email_notifications = ? WHERE id = ?")
            .bind(enabled)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("User", id));
        }
        Ok(())
    }

    async fn count_by_role(&self, role: UserRole) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}
