use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailKind {
    Welcome,
    WeeklyDigest,
    TaskNoOffers,
    OffersPending,
    ReviewRequest,
    BookingReminder,
    ReEngagement,
}

text_enum!(EmailKind {
    Welcome => "welcome",
    WeeklyDigest => "weekly_digest",
    TaskNoOffers => "task_no_offers",
    OffersPending => "offers_pending",
    ReviewRequest => "review_request",
    BookingReminder => "booking_reminder",
    ReEngagement => "reengagement",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    Pending,
    Sent,
    Failed,
    Cancelled,
}

text_enum!(EmailStatus {
    Pending => "pending",
    Sent => "sent",
    Failed => "failed",
    Cancelled => "cancelled",
});

impl EmailStatus {
    pub fn is_terminal(self) -> bool {
        self != EmailStatus::Pending
    }
}

/// A queued automated email. Created `pending` by a scheduler and moved to a
/// terminal status exactly once by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAutomationLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: EmailKind,
    /// Unique per logical email, e.g. `weekly_digest:{user}:2026-W42`
    pub dedup_key: String,
    pub subject: String,
    /// Template data captured at scheduling time
    pub payload: serde_json::Value,
    pub status: EmailStatus,
    pub scheduled_for: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl EmailAutomationLog {
    pub fn pending(
        user_id: Uuid,
        kind: EmailKind,
        dedup_key: String,
        subject: String,
        payload: serde_json::Value,
        scheduled_for: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            kind,
            dedup_key,
            subject,
            payload,
            status: EmailStatus::Pending,
            scheduled_for,
            sent_at: None,
            error: None,
            created_at: Utc::now(),
        }
    }
}

/// Terminal outcome written back by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent { at: DateTime<Utc> },
    Failed { error: String },
    Cancelled { reason: String },
}

impl DeliveryOutcome {
    pub fn status(&self) -> EmailStatus {
        match self {
            DeliveryOutcome::Sent { .. } => EmailStatus::Sent,
            DeliveryOutcome::Failed { .. } => EmailStatus::Failed,
            DeliveryOutcome::Cancelled { .. } => EmailStatus::Cancelled,
        }
    }
}

/// A rendered message handed to a `Mailer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub to_name: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}
