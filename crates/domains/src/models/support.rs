use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Waiting for an agent
    Open,
    /// Waiting for the user
    Pending,
    Closed,
}

text_enum!(TicketStatus {
    Open => "open",
    Pending => "pending",
    Closed => "closed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    User,
    Agent,
    Bot,
}

text_enum!(MessageSender {
    User => "user",
    Agent => "agent",
    Bot => "bot",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportTicket {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    /// Email address, or `telegram:{chat_id}` for tickets opened from the bot.
    pub contact: String,
    pub subject: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Chat line. The integer id is monotonic so pollers can ask for
/// "everything after N".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportMessage {
    pub id: i64,
    pub ticket_id: Uuid,
    pub sender: MessageSender,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
