//! # storage-adapters
//!
//! SQLite implementations of the `domains` repository ports.
//! UUIDs are stored as 16-byte BLOBs and timestamps as RFC 3339 TEXT, which
//! keeps lexical ordering equal to chronological ordering for UTC values.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use domains::errors::DomainError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub mod repos;

pub use repos::*;

/// Embedded migrations from `./migrations`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Owns the connection pool and hands out repositories.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (and creates if missing) the database at `url`.
    ///
    /// In-memory databases are limited to a single connection that never
    /// expires, otherwise every pooled connection would see its own empty
    /// database.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, DomainError> {
        let in_memory = url.contains(":memory:");
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_err)?
            .create_if_missing(true)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new();
        pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            pool_options.max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await.map_err(db_err)?;
        tracing::debug!(url, in_memory, "database pool ready");
        Ok(Self { pool })
    }

    /// Fresh migrated in-memory database, used by tests and demos.
    pub async fn in_memory() -> Result<Self, DomainError> {
        let db = Self::connect("sqlite::memory:", 1).await?;
        db.migrate().await?;
        Ok(db)
    }

    pub async fn migrate(&self) -> Result<(), DomainError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(format!("migration failed: {e}")))?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn users(&self) -> Arc<SqliteUserRepo> {
        Arc::new(SqliteUserRepo::new(self.pool.clone()))
    }

    pub fn tasks(&self) -> Arc<SqliteTaskRepo> {
        Arc::new(SqliteTaskRepo::new(self.pool.clone()))
    }

    pub fn offers(&self) -> Arc<SqliteOfferRepo> {
        Arc::new(SqliteOfferRepo::new(self.pool.clone()))
    }

    pub fn reviews(&self) -> Arc<SqliteReviewRepo> {
        Arc::new(SqliteReviewRepo::new(self.pool.clone()))
    }

    pub fn credits(&self) -> Arc<SqliteCreditRepo> {
        Arc::new(SqliteCreditRepo::new(self.pool.clone()))
    }

    pub fn bookings(&self) -> Arc<SqliteBookingRepo> {
        Arc::new(SqliteBookingRepo::new(self.pool.clone()))
    }

    pub fn catalog(&self) -> Arc<SqliteCatalogRepo> {
        Arc::new(SqliteCatalogRepo::new(self.pool.clone()))
    }

    pub fn content(&self) -> Arc<SqliteContentRepo> {
        Arc::new(SqliteContentRepo::new(self.pool.clone()))
    }

    pub fn email_logs(&self) -> Arc<SqliteEmailLogRepo> {
        Arc::new(SqliteEmailLogRepo::new(self.pool.clone()))
    }

    pub fn support(&self) -> Arc<SqliteSupportRepo> {
        Arc::new(SqliteSupportRepo::new(self.pool.clone()))
    }
}

/// Maps sqlx failures onto the domain error type.
pub(crate) fn db_err(e: sqlx::Error) -> DomainError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DomainError::Conflict(db.message().to_string())
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            DomainError::Validation(format!("reference not found: {}", db.message()))
        }
        _ => {
            tracing::error!(error = %e, "database error");
            DomainError::Internal(e.to_string())
        }
    }
}

/// Parses a TEXT column holding an enum.
pub(crate) fn parse_text<T>(value: &str) -> Result<T, DomainError>
where
    T: FromStr<Err = DomainError>,
{
    value.parse()
}
