use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{DomainError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Assigned,
    Completed,
    Cancelled,
}

text_enum!(TaskStatus {
    Open => "open",
    Assigned => "assigned",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl TaskStatus {
    /// `open → assigned → completed`, and `open | assigned → cancelled`.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Open, TaskStatus::Assigned)
                | (TaskStatus::Assigned, TaskStatus::Completed)
                | (TaskStatus::Open, TaskStatus::Cancelled)
                | (TaskStatus::Assigned, TaskStatus::Cancelled)
        )
    }
}

/// A job posted by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub description: String,
    /// Slug of the matching `PopularService`.
    pub category: String,
    pub city: String,
    /// Whole euros.
    pub budget: Option<i32>,
    pub status: TaskStatus,
    pub assigned_provider_id: Option<Uuid>,
    /// Demo task created by the seeder; the only kind cleanup may delete.
    pub is_generated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn transition(&mut self, next: TaskStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::validation(format!(
                "task {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        self.updated_at = now;
        if next == TaskStatus::Completed {
            self.completed_at = Some(now);
        }
        Ok(())
    }

    /// Real tasks are never removed by automated cleanup.
    pub fn is_cleanup_candidate(&self, cutoff: DateTime<Utc>) -> bool {
        self.is_generated && self.created_at < cutoff
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub client_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub city: String,
    pub budget: Option<i32>,
    #[serde(default)]
    pub is_generated: bool,
}

impl NewTask {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().len() < 5 {
            return Err(DomainError::validation("task title must be at least 5 characters"));
        }
        if self.city.trim().is_empty() {
            return Err(DomainError::validation("task city is required"));
        }
        if matches!(self.budget, Some(b) if b <= 0) {
            return Err(DomainError::validation("task budget must be positive"));
        }
        Ok(())
    }

    pub fn into_task(self, now: DateTime<Utc>) -> Task {
        Task {
            id: Uuid::now_v7(),
            client_id: self.client_id,
            title: self.title.trim().to_string(),
            description: self.description,
            category: self.category,
            city: self.city.trim().to_string(),
            budget: self.budget,
            status: TaskStatus::Open,
            assigned_provider_id: None,
            is_generated: self.is_generated,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

text_enum!(OfferStatus {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
    Withdrawn => "withdrawn",
});

/// A provider's proposal on a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub task_id: Uuid,
    pub provider_id: Uuid,
    pub price: i32,
    pub message: String,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    pub fn transition(&mut self, next: OfferStatus, now: DateTime<Utc>) -> Result<()> {
        if self.status != OfferStatus::Pending || next == OfferStatus::Pending {
            return Err(DomainError::validation(format!(
                "offer {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}
