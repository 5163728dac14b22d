use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::errors::{DomainError, Result};
use domains::models::{MessageSender, SupportMessage, SupportTicket, TicketStatus};
use domains::ports::SupportRepository;
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::{db_err, parse_text};

pub struct SqliteSupportRepo {
    pool: SqlitePool,
}

impl SqliteSupportRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    user_id: Option<Uuid>,
    contact: String,
    subject: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for SupportTicket {
    type Error = DomainError;

    fn try_from(row: TicketRow) -> Result<Self> {
        Ok(SupportTicket {
            id: row.id,
            user_id: row.user_id,
            contact: row.contact,
            subject: row.subject,
            status: parse_text(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: i64,
    ticket_id: Uuid,
    sender: String,
    body: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for SupportMessage {
    type Error = DomainError;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(SupportMessage {
            id: row.id,
            ticket_id: row.ticket_id,
            sender: parse_text(&row.sender)?,
            body: row.body,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl SupportRepository for SqliteSupportRepo {
    async fn create_ticket(&self, ticket: &SupportTicket) -> Result<()> {
        sqlx::query(
            "INSERT INTO support_tickets (id, user_id, contact, subject, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(ticket.id)
        .bind(ticket.user_id)
        .bind(&ticket.contact)
        .bind(&ticket.subject)
        .bind(ticket.status.as_str())
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Option<SupportTicket>> {
        sqlx::query_as::<_, TicketRow>(
            "SELECT id, user_id, contact, subject, status, created_at, updated_at \
             FROM support_tickets WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .map(SupportTicket::try_from)
        .transpose()
    }

    async fn set_ticket_status(&self, id: Uuid, status: TicketStatus, at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query("UPDATE support_tickets SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("SupportTicket", id));
        }
        Ok(())
    }

    async fn add_message(
        &self,
        ticket_id: Uuid,
        sender: MessageSender,
        body: &str,
        at: DateTime<Utc>,
    ) -> Result<SupportMessage> {
        let result = sqlx::query(
            "INSERT INTO support_messages (ticket_id, sender, body, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(ticket_id)
        .bind(sender.as_str())
        .bind(body)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(SupportMessage {
            id: result.last_insert_rowid(),
            ticket_id,
            sender,
            body: body.to_string(),
            created_at: at,
        })
    }

    async fn list_messages(&self, ticket_id: Uuid, after_id: i64, limit: i64) -> Result<Vec<SupportMessage>> {
        sqlx::query_as::<_, MessageRow>(
            "SELECT id, ticket_id, sender, body, created_at FROM support_messages \
             WHERE ticket_id = ? AND id > ? ORDER BY id LIMIT ?",
        )
        .bind(ticket_id)
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(SupportMessage::try_from)
        .collect()
    }
}
