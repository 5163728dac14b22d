use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use domains::errors::Result;
use domains::models::{EmailAutomationLog, EmailKind, TaskStatus, User};
use domains::ports::{
    BookingRepository, EmailLogRepository, OfferRepository, ReviewRepository, TaskRepository,
    UserRepository,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::slug::slugify;

const DIGEST_MAX_TASKS: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleReport {
    pub enqueued: usize,
    /// Already queued under the same dedup key
    pub duplicates: usize,
    pub failed: usize,
}

impl ScheduleReport {
    fn merge(&mut self, other: ScheduleReport) {
        self.enqueued += other.enqueued;
        self.duplicates += other.duplicates;
        self.failed += other.failed;
    }
}

/// Next Monday at `hour`:00 UTC strictly after `now`.
pub fn next_digest_slot(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let days_ahead = (7 - now.weekday().num_days_from_monday()) % 7;
    let date = now.date_naive() + Duration::days(i64::from(days_ahead));
    let slot = date.and_time(NaiveTime::MIN).and_utc() + Duration::hours(i64::from(hour.min(23)));
    if slot <= now {
        slot + Duration::days(7)
    } else {
        slot
    }
}

fn task_path(task_id: Uuid) -> String {
    format!("/tasks/{task_id}")
}

/// Finds the users and tasks that deserve an email and queues one log row
/// per logical email. Dedup keys make every scheduler safe to re-run.
pub struct EmailScheduler {
    users: Arc<dyn UserRepository>,
    tasks: Arc<dyn TaskRepository>,
    offers: Arc<dyn OfferRepository>,
    reviews: Arc<dyn ReviewRepository>,
    bookings: Arc<dyn BookingRepository>,
    logs: Arc<dyn EmailLogRepository>,
    digest_hour: u32,
}

impl EmailScheduler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tasks: Arc<dyn TaskRepository>,
        offers: Arc<dyn OfferRepository>,
        reviews: Arc<dyn ReviewRepository>,
        bookings: Arc<dyn BookingRepository>,
        logs: Arc<dyn EmailLogRepository>,
        digest_hour: u32,
    ) -> Self {
        Self {
            users,
            tasks,
            offers,
            reviews,
            bookings,
            logs,
            digest_hour,
        }
    }

    async fn enqueue(&self, report: &mut ScheduleReport, log: EmailAutomationLog) {
        match self.logs.enqueue(&log).await {
            Ok(true) => report.enqueued += 1,
            Ok(false) => report.duplicates += 1,
            Err(e) => {
                warn!(dedup_key = %log.dedup_key, error = %e, "failed to enqueue email");
                report.failed += 1;
            }
        }
    }

    /// Resolves a recipient, skipping missing users and users who opted out.
    async fn recipient(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self
            .users
            .get(user_id)
            .await?
            .filter(|u| u.email_notifications))
    }

    pub async fn schedule_weekly_digests(&self, now: DateTime<Utc>) -> Result<ScheduleReport> {
        let mut report = ScheduleReport::default();
        let send_at = next_digest_slot(now, self.digest_hour);
        let week = send_at.iso_week();
        let week_key = format!("{}-W{:02}", week.year(), week.week());
        let recent = self
            .tasks
            .list_open_created_between(now - Duration::days(7), now)
            .await?;

        for user in self.users.list_notifiable().await? {
            let Some(city) = user.city.as_deref().map(slugify) else {
                continue;
            };
            let tasks: Vec<_> = recent
                .iter()
                .filter(|t| t.client_id != user.id && slugify(&t.city) == city)
                .take(DIGEST_MAX_TASKS)
                .map(|t| {
                    json!({
                        "title": t.title,
                        "city": t.city,
                        "budget": t.budget,
                        "path": task_path(t.id),
                    })
                })
                .collect();
            if tasks.is_empty() {
                continue;
            }

            let log = EmailAutomationLog::pending(
                user.id,
                EmailKind::WeeklyDigest,
                format!("weekly_digest:{}:{week_key}", user.id),
                format!("{} nouvelles demandes près de chez vous", tasks.len()),
                json!({ "name": user.name, "city": user.city, "tasks": tasks }),
                send_at,
            );
            self.enqueue(&mut report, log).await;
        }

        info!(?report, %send_at, "weekly digests scheduled");
        Ok(report)
    }

    /// Runs every reminder rule. A failing rule is logged and the others still run.
    pub async fn schedule_reminders(&self, now: DateTime<Utc>) -> Result<ScheduleReport> {
        let mut report = ScheduleReport::default();
        let rules = [
            ("welcome", self.schedule_welcome(now).await),
            ("task_no_offers", self.schedule_task_no_offers(now).await),
            ("offers_pending", self.schedule_offers_pending(now).await),
            ("review_request", self.schedule_review_requests(now).await),
            ("booking_reminder", self.schedule_booking_reminders(now).await),
            ("reengagement", self.schedule_reengagement(now).await),
        ];
        for (rule, outcome) in rules {
            match outcome {
                Ok(r) => report.merge(r),
                Err(e) => {
                    warn!(rule, error = %e, "reminder rule failed");
                    report.failed += 1;
                }
            }
        }
        info!(?report, "reminders scheduled");
        Ok(report)
    }

    pub async fn schedule_welcome(&self, now: DateTime<Utc>) -> Result<ScheduleReport> {
        let mut report = ScheduleReport::default();
        let users = self
            .users
            .list_created_between(now - Duration::hours(24), now)
            .await?;
        for user in users.into_iter().filter(|u| u.email_notifications) {
            let log = EmailAutomationLog::pending(
                user.id,
                EmailKind::Welcome,
                format!("welcome:{}", user.id),
                "Bienvenue sur ProchePro".into(),
                json!({ "name": user.name }),
                now,
            );
            self.enqueue(&mut report, log).await;
        }
        Ok(report)
    }

    pub async fn schedule_task_no_offers(&self, now: DateTime<Utc>) -> Result<ScheduleReport> {
        let mut report = ScheduleReport::default();
        let tasks = self
            .tasks
            .list_open_created_between(now - Duration::hours(72), now - Duration::hours(24))
            .await?;
        for task in tasks {
            if self.offers.count_for_task(task.id).await? > 0 {
                continue;
            }
            let Some(client) = self.recipient(task.client_id).await? else {
                continue;
            };
            let log = EmailAutomationLog::pending(
                client.id,
                EmailKind::TaskNoOffers,
                format!("task_no_offers:{}", task.id),
                "Votre demande n'a pas encore reçu d'offre".into(),
                json!({ "name": client.name, "task_title": task.title, "task_path": task_path(task.id) }),
                now,
            );
            self.enqueue(&mut report, log).await;
        }
        Ok(report)
    }

    pub async fn schedule_offers_pending(&self, now: DateTime<Utc>) -> Result<ScheduleReport> {
        let mut report = ScheduleReport::default();
        let mut per_task: BTreeMap<Uuid, usize> = BTreeMap::new();
        for offer in self
            .offers
            .list_pending_created_before(now - Duration::hours(48))
            .await?
        {
            *per_task.entry(offer.task_id).or_default() += 1;
        }

        for (task_id, offer_count) in per_task {
            let Some(task) = self.tasks.get(task_id).await? else {
                continue;
            };
            if task.status != TaskStatus::Open {
                continue;
            }
            let Some(client) = self.recipient(task.client_id).await? else {
                continue;
            };
            let log = EmailAutomationLog::pending(
                client.id,
                EmailKind::OffersPending,
                format!("offers_pending:{}", task.id),
                "Des prestataires attendent votre réponse".into(),
                json!({
                    "name": client.name,
                    "task_title": task.title,
                    "task_path": task_path(task.id),
                    "offer_count": offer_count,
                }),
                now,
            );
            self.enqueue(&mut report, log).await;
        }
        Ok(report)
    }

    pub async fn schedule_review_requests(&self, now: DateTime<Utc>) -> Result<ScheduleReport> {
        let mut report = ScheduleReport::default();
        let tasks = self
            .tasks
            .list_completed_between(now - Duration::days(7), now - Duration::days(1))
            .await?;
        for task in tasks {
            if self.reviews.exists(task.id, task.client_id).await? {
                continue;
            }
            let Some(client) = self.recipient(task.client_id).await? else {
                continue;
            };
            let log = EmailAutomationLog::pending(
                client.id,
                EmailKind::ReviewRequest,
                format!("review_request:{}", task.id),
                "Donnez votre avis sur votre prestation".into(),
                json!({ "name": client.name, "task_title": task.title, "task_path": task_path(task.id) }),
                now,
            );
            self.enqueue(&mut report, log).await;
        }
        Ok(report)
    }

    pub async fn schedule_booking_reminders(&self, now: DateTime<Utc>) -> Result<ScheduleReport> {
        let mut report = ScheduleReport::default();
        let bookings = self
            .bookings
            .list_confirmed_starting_between(now, now + Duration::hours(24))
            .await?;
        for booking in bookings {
            let Some(client) = self.recipient(booking.client_id).await? else {
                continue;
            };
            let task_title = self
                .tasks
                .get(booking.task_id)
                .await?
                .map(|t| t.title)
                .unwrap_or_default();
            let log = EmailAutomationLog::pending(
                client.id,
                EmailKind::BookingReminder,
                format!("booking_reminder:{}", booking.id),
                "Rappel : votre rendez-vous approche".into(),
                json!({
                    "name": client.name,
                    "task_title": task_title,
                    "task_path": task_path(booking.task_id),
                    "starts_at": booking.starts_at.format("%d/%m/%Y à %Hh%M UTC").to_string(),
                }),
                now,
            );
            self.enqueue(&mut report, log).await;
        }
        Ok(report)
    }

    pub async fn schedule_reengagement(&self, now: DateTime<Utc>) -> Result<ScheduleReport> {
        let mut report = ScheduleReport::default();
        let inactive = self
            .users
            .list_inactive_since(now - Duration::days(30))
            .await?;
        if inactive.is_empty() {
            return Ok(report);
        }
        let open_tasks = self.tasks.count_by_status(TaskStatus::Open).await?;
        let month = now.format("%Y-%m").to_string();

        for user in inactive {
            let log = EmailAutomationLog::pending(
                user.id,
                EmailKind::ReEngagement,
                format!("reengagement:{}:{month}", user.id),
                "Du nouveau sur ProchePro".into(),
                json!({ "name": user.name, "open_tasks": open_tasks }),
                now,
            );
            self.enqueue(&mut report, log).await;
        }
        Ok(report)
    }
}
