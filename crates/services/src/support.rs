//! # Support chat
//!
//! Tickets with an append-only message stream. The chat widget polls
//! [`SupportService::messages_after`] with the last id it has seen and
//! merges the batch locally with [`merge_messages`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use domains::errors::{DomainError, Result};
use domains::models::{MessageSender, SupportMessage, SupportTicket, TicketStatus};
use domains::ports::{SupportRepository, TelegramApi};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

pub const MAX_MESSAGE_CHARS: usize = 2000;
pub const MAX_SUBJECT_CHARS: usize = 200;
const POLL_BATCH: i64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct NewTicket {
    pub user_id: Option<Uuid>,
    pub contact: String,
    pub subject: String,
    pub message: String,
}

fn validate_body(body: &str) -> Result<&str> {
    let body = body.trim();
    if body.is_empty() {
        return Err(DomainError::validation("message cannot be empty"));
    }
    if body.chars().count() > MAX_MESSAGE_CHARS {
        return Err(DomainError::validation(format!(
            "message exceeds {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(body)
}

fn validate_contact(contact: &str) -> Result<()> {
    let valid = match contact.strip_prefix("telegram:") {
        Some(chat_id) => chat_id.parse::<i64>().is_ok(),
        None => contact.contains('@'),
    };
    if !valid {
        return Err(DomainError::validation("contact must be an email address"));
    }
    Ok(())
}

/// Merges a polled batch into `existing`: no duplicate ids, ascending by id.
/// Returns how many messages were new.
pub fn merge_messages(existing: &mut Vec<SupportMessage>, incoming: Vec<SupportMessage>) -> usize {
    let before = existing.len();
    existing.extend(incoming);
    existing.sort_by_key(|m| m.id);
    existing.dedup_by_key(|m| m.id);
    existing.len() - before
}

pub struct SupportService {
    repo: Arc<dyn SupportRepository>,
    telegram: Option<Arc<dyn TelegramApi>>,
    admin_chat_id: Option<i64>,
}

impl SupportService {
    pub fn new(repo: Arc<dyn SupportRepository>) -> Self {
        Self {
            repo,
            telegram: None,
            admin_chat_id: None,
        }
    }

    /// Sends a Telegram message to `admin_chat_id` for every new ticket.
    pub fn with_admin_notifications(mut self, telegram: Arc<dyn TelegramApi>, admin_chat_id: i64) -> Self {
        self.telegram = Some(telegram);
        self.admin_chat_id = Some(admin_chat_id);
        self
    }

    async fn ticket(&self, id: Uuid) -> Result<SupportTicket> {
        self.repo
            .get_ticket(id)
            .await?
            .ok_or_else(|| DomainError::not_found("SupportTicket", id))
    }

    pub async fn open_ticket(&self, new: NewTicket, now: DateTime<Utc>) -> Result<(SupportTicket, SupportMessage)> {
        let contact = new.contact.trim().to_lowercase();
        validate_contact(&contact)?;
        let body = validate_body(&new.message)?;
        let subject = match new.subject.trim() {
            "" => "Demande d'assistance".to_string(),
            s => s.chars().take(MAX_SUBJECT_CHARS).collect(),
        };

        let ticket = SupportTicket {
            id: Uuid::now_v7(),
            user_id: new.user_id,
            contact,
            subject,
            status: TicketStatus::Open,
            created_at: now,
            updated_at: now,
        };
        self.repo.create_ticket(&ticket).await?;
        let message = self
            .repo
            .add_message(ticket.id, MessageSender::User, body, now)
            .await?;
        info!(ticket_id = %ticket.id, "support ticket opened");

        self.notify_admin(&ticket, body).await;
        Ok((ticket, message))
    }

    async fn notify_admin(&self, ticket: &SupportTicket, body: &str) {
        let (Some(telegram), Some(chat_id)) = (&self.telegram, self.admin_chat_id) else {
            return;
        };
        let text = format!(
            "🆘 Nouveau ticket support\nDe : {}\nSujet : {}\n\n{}",
            ticket.contact, ticket.subject, body
        );
        if let Err(e) = telegram.send_message(chat_id, &text).await {
            warn!(ticket_id = %ticket.id, error = %e, "admin notification failed");
        }
    }

    /// Appends a message. User messages reopen the ticket, agent messages
    /// put it back in the user's court.
    pub async fn post_message(
        &self,
        ticket_id: Uuid,
        sender: MessageSender,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<SupportMessage> {
        let ticket = self.ticket(ticket_id).await?;
        if ticket.status == TicketStatus::Closed {
            return Err(DomainError::validation(format!("ticket {ticket_id} is closed")));
        }
        let body = validate_body(body)?;
        let message = self.repo.add_message(ticket_id, sender, body, now).await?;

        let next = match sender {
            MessageSender::User => TicketStatus::Open,
            MessageSender::Agent => TicketStatus::Pending,
            MessageSender::Bot => ticket.status,
        };
        self.repo.set_ticket_status(ticket_id, next, now).await?;
        Ok(message)
    }

    pub async fn messages_after(&self, ticket_id: Uuid, after_id: i64) -> Result<Vec<SupportMessage>> {
        self.ticket(ticket_id).await?;
        self.repo
            .list_messages(ticket_id, after_id.max(0), POLL_BATCH)
            .await
    }

    pub async fn close_ticket(&self, ticket_id: Uuid, now: DateTime<Utc>) -> Result<SupportTicket> {
        let mut ticket = self.ticket(ticket_id).await?;
        if ticket.status != TicketStatus::Closed {
            self.repo
                .set_ticket_status(ticket_id, TicketStatus::Closed, now)
                .await?;
            ticket.status = TicketStatus::Closed;
            ticket.updated_at = now;
            info!(%ticket_id, "support ticket closed");
        }
        Ok(ticket)
    }

    pub async fn get_ticket(&self, ticket_id: Uuid) -> Result<SupportTicket> {
        self.ticket(ticket_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::ports::{MockSupportRepository, MockTelegramApi};

    fn message(id: i64) -> SupportMessage {
        SupportMessage {
            id,
            ticket_id: Uuid::nil(),
            sender: MessageSender::User,
            body: format!("m{id}"),
            created_at: Utc::now(),
        }
    }

    fn ticket(status: TicketStatus) -> SupportTicket {
        let now = Utc::now();
        SupportTicket {
            id: Uuid::now_v7(),
            user_id: None,
            contact: "lucas@example.fr".into(),
            subject: "Paiement".into(),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    fn echo_add_message(repo: &mut MockSupportRepository) {
        repo.expect_add_message().returning(|ticket_id, sender, body, at| {
            Ok(SupportMessage {
                id: 1,
                ticket_id,
                sender,
                body: body.to_string(),
                created_at: at,
            })
        });
    }

    #[test]
    fn merge_dedups_and_orders_by_id() {
        let mut local = vec![message(1), message(3)];
        let added = merge_messages(&mut local, vec![message(3), message(2), message(4)]);

        assert_eq!(added, 2);
        let ids: Vec<_> = local.iter().map(|m| m.id).collect();
        assert_eq!(ids, [1, 2, 3, 4]);
    }

    #[test]
    fn contact_accepts_email_or_telegram_chat() {
        assert!(validate_contact("a@b.fr").is_ok());
        assert!(validate_contact("telegram:-100123").is_ok());
        assert!(validate_contact("telegram:abc").is_err());
        assert!(validate_contact("nobody").is_err());
    }

    #[tokio::test]
    async fn test_open_ticket_notifies_admin_and_survives_telegram_errors() {
        let mut repo = MockSupportRepository::new();
        repo.expect_create_ticket().times(1).returning(|_| Ok(()));
        echo_add_message(&mut repo);
        let mut telegram = MockTelegramApi::new();
        telegram
            .expect_send_message()
            .withf(|chat_id, text| *chat_id == 42 && text.contains("Colis perdu"))
            .times(1)
            .returning(|_, _| Err(DomainError::External("telegram down".into())));

        let service = SupportService::new(Arc::new(repo)).with_admin_notifications(Arc::new(telegram), 42);
        let (ticket, first) = service
            .open_ticket(
                NewTicket {
                    user_id: None,
                    contact: " Lucas@Example.fr ".into(),
                    subject: "Colis perdu".into(),
                    message: "  Bonjour, mon colis n'est pas arrivé.  ".into(),
                },
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(ticket.contact, "lucas@example.fr");
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(first.body, "Bonjour, mon colis n'est pas arrivé.");
    }

    #[tokio::test]
    async fn test_agent_reply_sets_pending_and_closed_rejects() {
        let open = ticket(TicketStatus::Open);
        let open_id = open.id;
        let mut repo = MockSupportRepository::new();
        repo.expect_get_ticket().returning(move |_| Ok(Some(open.clone())));
        echo_add_message(&mut repo);
        repo.expect_set_ticket_status()
            .withf(|_, status, _| *status == TicketStatus::Pending)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = SupportService::new(Arc::new(repo));
        service
            .post_message(open_id, MessageSender::Agent, "Nous regardons.", Utc::now())
            .await
            .unwrap();

        let closed = ticket(TicketStatus::Closed);
        let closed_id = closed.id;
        let mut repo = MockSupportRepository::new();
        repo.expect_get_ticket().returning(move |_| Ok(Some(closed.clone())));
        repo.expect_add_message().never();
        let service = SupportService::new(Arc::new(repo));
        let err = service
            .post_message(closed_id, MessageSender::User, "Encore là ?", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_messages_are_rejected() {
        let open = ticket(TicketStatus::Open);
        let open_id = open.id;
        let mut repo = MockSupportRepository::new();
        repo.expect_get_ticket().returning(move |_| Ok(Some(open.clone())));
        repo.expect_add_message().never();

        let service = SupportService::new(Arc::new(repo));
        assert!(service
            .post_message(open_id, MessageSender::User, "   ", Utc::now())
            .await
            .is_err());
    }
}
