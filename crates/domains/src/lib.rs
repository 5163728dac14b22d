//! # domains
//!
//! Entities, lifecycle rules and port traits for the ProchePro marketplace.
//! No I/O lives here.

pub mod errors;
pub mod models;
pub mod ports;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use models::*;
pub use ports::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use chrono::Utc;

    #[test]
    fn new_user_normalizes_email_and_opts_in() {
        let user = NewUser {
            name: "Marie Dupont".into(),
            email: "  Marie.Dupont@Example.FR ".into(),
            password_hash: "x".into(),
            role: UserRole::Client,
            city: Some("Lyon".into()),
            is_generated: false,
        }
        .into_user(Utc::now());

        assert_eq!(user.email, "marie.dupont@example.fr");
        assert!(user.email_notifications);
        assert_eq!(user.first_name(), "Marie");
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = NewUser {
            name: "Jean".into(),
            email: "jean@example.fr".into(),
            password_hash: "$argon2id$secret".into(),
            role: UserRole::Provider,
            city: None,
            is_generated: true,
        }
        .into_user(Utc::now());

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
    }
}
