//! # Email automation
//!
//! Schedulers queue `EmailAutomationLog` rows, the dispatcher renders and
//! sends them later. Every message links to a signed unsubscribe URL.

mod dispatcher;
mod render;
mod scheduler;
mod unsubscribe;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use domains::errors::{DomainError, Result};
use domains::ports::{EmailLogRepository, UserRepository};
use tracing::info;
use uuid::Uuid;

pub use dispatcher::{DispatchReport, EmailDispatcher};
pub use render::EmailRenderer;
pub use scheduler::{next_digest_slot, EmailScheduler, ScheduleReport};
pub use unsubscribe::UnsubscribeSigner;

/// Turns email notifications off for the user a token was signed for.
pub async fn unsubscribe(
    users: &dyn UserRepository,
    signer: &UnsubscribeSigner,
    token: &str,
) -> Result<Uuid> {
    let user_id = signer.verify(token)?;
    if users.get(user_id).await?.is_none() {
        return Err(DomainError::not_found("User", user_id));
    }
    users.set_email_notifications(user_id, false).await?;
    info!(%user_id, "email notifications disabled");
    Ok(user_id)
}

/// Deletes terminal log entries older than `days`.
pub async fn prune_logs(logs: Arc<dyn EmailLogRepository>, days: i64, now: DateTime<Utc>) -> Result<u64> {
    if days < 1 {
        return Err(DomainError::validation("retention must be at least one day"));
    }
    let deleted = logs.prune(now - Duration::days(days)).await?;
    info!(deleted, days, "email logs pruned");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::models::{NewUser, UserRole};
    use domains::ports::{MockEmailLogRepository, MockUserRepository};

    #[tokio::test]
    async fn test_unsubscribe_disables_notifications() {
        let signer = UnsubscribeSigner::new("k");
        let user = NewUser {
            name: "Zoé".into(),
            email: "zoe@example.fr".into(),
            password_hash: String::new(),
            role: UserRole::Client,
            city: None,
            is_generated: false,
        }
        .into_user(Utc::now());
        let user_id = user.id;

        let mut users = MockUserRepository::new();
        users.expect_get().returning(move |_| Ok(Some(user.clone())));
        users
            .expect_set_email_notifications()
            .withf(move |id, enabled| *id == user_id && !*enabled)
            .times(1)
            .returning(|_, _| Ok(()));

        let token = signer.sign(user_id).unwrap();
        assert_eq!(unsubscribe(&users, &signer, &token).await.unwrap(), user_id);
    }

    #[tokio::test]
    async fn test_unsubscribe_rejects_bad_token() {
        let users = MockUserRepository::new();
        let err = unsubscribe(&users, &UnsubscribeSigner::new("k"), "nope").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_prune_uses_retention_cutoff() {
        let now = Utc::now();
        let mut logs = MockEmailLogRepository::new();
        logs.expect_prune()
            .withf(move |before| *before == now - Duration::days(30))
            .returning(|_| Ok(7));

        assert_eq!(prune_logs(Arc::new(logs), 30, now).await.unwrap(), 7);
        assert!(prune_logs(Arc::new(MockEmailLogRepository::new()), 0, now).await.is_err());
    }
}
