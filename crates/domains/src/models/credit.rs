use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditReason {
    /// Credits granted on sign-up or by the seeder
    Grant,
    Purchase,
    /// Debit for sending an offer
    OfferSubmitted,
    /// Refund when the task closes with the offer still pending
    OfferRefund,
}

text_enum!(CreditReason {
    Grant => "grant",
    Purchase => "purchase",
    OfferSubmitted => "offer_submitted",
    OfferRefund => "offer_refund",
});

/// One ledger line. The balance is the sum of `amount` for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i32,
    pub reason: CreditReason,
    pub reference_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    pub fn new(user_id: Uuid, amount: i32, reason: CreditReason, reference_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            amount,
            reason,
            reference_id,
            created_at: Utc::now(),
        }
    }
}
