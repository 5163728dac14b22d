//! # DomainError
//!
//! Centralized error handling for the ProchePro backend.
//! Adapters map their own failures (SQL, HTTP, mail transport) into these
//! variants so services and the API layer only ever match on one type.

use thiserror::Error;

/// The primary error type for every port and service operation.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Resource not found (e.g., Task, Offer, SupportTicket)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Business rule violation (e.g., offer on a closed task, rating out of range)
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource already exists (e.g., duplicate slug, second offer on a task)
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller is not allowed to perform the action
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Third-party failure (Telegram Bot API, mail transport)
    #[error("external service error: {0}")]
    External(String),

    /// Infrastructure failure (e.g., database unavailable, template error)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound(entity.to_string(), id.to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// A specialized Result type for domain logic.
pub type Result<T> = std::result::Result<T, DomainError>;
