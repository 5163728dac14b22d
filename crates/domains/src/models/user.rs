use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marketplace role. A prestataire is a `Provider`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Client,
    Provider,
    Admin,
}

text_enum!(UserRole {
    Client => "client",
    Provider => "provider",
    Admin => "admin",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: UserRole,
    pub city: Option<String>,
    /// Opt-in flag for automated emails; cleared by the unsubscribe link.
    pub email_notifications: bool,
    pub telegram_chat_id: Option<i64>,
    /// Demo accounts created by the seeder.
    pub is_generated: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_provider(&self) -> bool {
        self.role == UserRole::Provider
    }

    /// First name for email greetings ("Bonjour Marie").
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub city: Option<String>,
    pub is_generated: bool,
}

impl NewUser {
    pub fn into_user(self, now: DateTime<Utc>) -> User {
        User {
            id: Uuid::now_v7(),
            name: self.name,
            email: self.email.trim().to_lowercase(),
            password_hash: self.password_hash,
            role: self.role,
            city: self.city,
            email_notifications: true,
            telegram_chat_id: None,
            is_generated: self.is_generated,
            last_login_at: None,
            created_at: now,
        }
    }
}
