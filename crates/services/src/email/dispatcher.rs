use std::sync::Arc;

use chrono::{DateTime, Utc};
use domains::errors::Result;
use domains::models::{DeliveryOutcome, EmailAutomationLog};
use domains::ports::{EmailLogRepository, Mailer, UserRepository};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::render::EmailRenderer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Entries another run completed first
    pub skipped: usize,
}

/// Drains due log entries through the mailer.
pub struct EmailDispatcher {
    logs: Arc<dyn EmailLogRepository>,
    users: Arc<dyn UserRepository>,
    mailer: Arc<dyn Mailer>,
    renderer: EmailRenderer,
}

impl EmailDispatcher {
    pub fn new(
        logs: Arc<dyn EmailLogRepository>,
        users: Arc<dyn UserRepository>,
        mailer: Arc<dyn Mailer>,
        renderer: EmailRenderer,
    ) -> Self {
        Self {
            logs,
            users,
            mailer,
            renderer,
        }
    }

    pub async fn send_due(&self, now: DateTime<Utc>, limit: i64) -> Result<DispatchReport> {
        let mut report = DispatchReport::default();
        let due = self.logs.due(now, limit).await?;
        debug!(count = due.len(), "due emails fetched");

        for log in due {
            let outcome = self.deliver(&log, now).await;
            match self.logs.complete(log.id, &outcome).await {
                Ok(true) => match outcome {
                    DeliveryOutcome::Sent { .. } => report.sent += 1,
                    DeliveryOutcome::Failed { error } => {
                        warn!(id = %log.id, kind = %log.kind, %error, "email delivery failed");
                        report.failed += 1;
                    }
                    DeliveryOutcome::Cancelled { reason } => {
                        debug!(id = %log.id, %reason, "email cancelled");
                        report.cancelled += 1;
                    }
                },
                Ok(false) => report.skipped += 1,
                Err(e) => error!(id = %log.id, error = %e, "failed to record email outcome"),
            }
        }

        info!(?report, "scheduled emails processed");
        Ok(report)
    }

    async fn deliver(&self, log: &EmailAutomationLog, now: DateTime<Utc>) -> DeliveryOutcome {
        let user = match self.users.get(log.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                return DeliveryOutcome::Cancelled {
                    reason: "recipient no longer exists".into(),
                }
            }
            Err(e) => return DeliveryOutcome::Failed { error: e.to_string() },
        };
        if !user.email_notifications {
            return DeliveryOutcome::Cancelled {
                reason: "recipient opted out".into(),
            };
        }

        let email = match self.renderer.render(log, &user) {
            Ok(email) => email,
            Err(e) => return DeliveryOutcome::Failed { error: e.to_string() },
        };
        match self.mailer.send(&email).await {
            Ok(()) => DeliveryOutcome::Sent { at: now },
            Err(e) => DeliveryOutcome::Failed { error: e.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::UnsubscribeSigner;
    use domains::errors::DomainError;
    use domains::models::{EmailKind, NewUser, User, UserRole};
    use domains::ports::{MockEmailLogRepository, MockMailer, MockUserRepository};
    use uuid::Uuid;

    fn user(notifications: bool) -> User {
        let mut user = NewUser {
            name: "Hugo Petit".into(),
            email: "hugo@example.fr".into(),
            password_hash: String::new(),
            role: UserRole::Client,
            city: None,
            is_generated: false,
        }
        .into_user(Utc::now());
        user.email_notifications = notifications;
        user
    }

    fn log_for(user_id: Uuid) -> EmailAutomationLog {
        EmailAutomationLog::pending(
            user_id,
            EmailKind::Welcome,
            format!("welcome:{user_id}"),
            "Bienvenue".into(),
            serde_json::json!({}),
            Utc::now(),
        )
    }

    fn dispatcher(logs: MockEmailLogRepository, users: MockUserRepository, mailer: MockMailer) -> EmailDispatcher {
        EmailDispatcher::new(
            Arc::new(logs),
            Arc::new(users),
            Arc::new(mailer),
            EmailRenderer::new("https://prochepro.fr", UnsubscribeSigner::new("k")),
        )
    }

    #[tokio::test]
    async fn test_each_entry_gets_exactly_one_terminal_outcome() {
        let active = user(true);
        let opted_out = user(false);
        let failing = user(true);
        let entries = vec![log_for(active.id), log_for(opted_out.id), log_for(failing.id), log_for(Uuid::now_v7())];
        let failing_email = "broken@example.fr".to_string();

        let mut logs = MockEmailLogRepository::new();
        logs.expect_due().return_once(move |_, _| Ok(entries));
        logs.expect_complete().times(4).returning(|_, _| Ok(true));

        let mut users = MockUserRepository::new();
        let (a, o, mut f) = (active.clone(), opted_out.clone(), failing.clone());
        f.email = failing_email.clone();
        users.expect_get().returning(move |id| {
            Ok([&a, &o, &f].into_iter().find(|u| u.id == id).cloned())
        });

        let mut mailer = MockMailer::new();
        mailer.expect_send().returning(move |email| {
            if email.to == failing_email {
                Err(DomainError::External("smtp down".into()))
            } else {
                Ok(())
            }
        });

        let report = dispatcher(logs, users, mailer).send_due(Utc::now(), 50).await.unwrap();
        assert_eq!(
            report,
            DispatchReport {
                sent: 1,
                failed: 1,
                cancelled: 2,
                skipped: 0
            }
        );
    }

    #[tokio::test]
    async fn test_already_completed_entries_are_skipped() {
        let recipient = user(true);
        let entry = log_for(recipient.id);

        let mut logs = MockEmailLogRepository::new();
        logs.expect_due().return_once(move |_, _| Ok(vec![entry]));
        logs.expect_complete().returning(|_, _| Ok(false));
        let mut users = MockUserRepository::new();
        users.expect_get().returning(move |_| Ok(Some(recipient.clone())));
        let mut mailer = MockMailer::new();
        mailer.expect_send().returning(|_| Ok(()));

        let report = dispatcher(logs, users, mailer).send_due(Utc::now(), 50).await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.sent, 0);
    }
}
