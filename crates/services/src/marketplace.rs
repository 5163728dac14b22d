//! # Marketplace
//!
//! Task, offer, review, credit and booking use cases. Lifecycle rules live
//! on the domain types; this service adds the ownership checks and keeps
//! the credit ledger consistent with offers.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use domains::errors::{DomainError, Result};
use domains::models::{
    Booking, BookingStatus, CreditReason, CreditTransaction, NewTask, NewUser, Offer, OfferStatus,
    RatingSummary, Review, Task, TaskStatus, User, UserRole,
};
use domains::ports::{
    BookingRepository, CreditRepository, OfferRepository, PasswordHasher, ReviewRepository,
    TaskRepository, UserRepository,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Clone)]
pub struct MarketplacePorts {
    pub users: Arc<dyn UserRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub offers: Arc<dyn OfferRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub credits: Arc<dyn CreditRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub hasher: Arc<dyn PasswordHasher>,
}

#[derive(Debug, Clone, Copy)]
pub struct MarketplaceRules {
    /// Credits debited per submitted offer
    pub offer_credit_cost: i32,
    /// Credits granted to new providers
    pub signup_credits: i32,
}

impl Default for MarketplaceRules {
    fn default() -> Self {
        Self {
            offer_credit_cost: 1,
            signup_credits: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub city: Option<String>,
    #[serde(default)]
    pub is_generated: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub matched: usize,
    pub deleted: u64,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MarketplaceStats {
    pub open_tasks: i64,
    pub assigned_tasks: i64,
    pub completed_tasks: i64,
    pub clients: i64,
    pub providers: i64,
}

pub struct MarketplaceService {
    ports: MarketplacePorts,
    rules: MarketplaceRules,
}

impl MarketplaceService {
    pub fn new(ports: MarketplacePorts, rules: MarketplaceRules) -> Self {
        Self { ports, rules }
    }

    async fn user(&self, id: Uuid) -> Result<User> {
        self.ports
            .users
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))
    }

    async fn task(&self, id: Uuid) -> Result<Task> {
        self.ports
            .tasks
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Task", id))
    }

    async fn offer(&self, id: Uuid) -> Result<Offer> {
        self.ports
            .offers
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Offer", id))
    }

    async fn booking(&self, id: Uuid) -> Result<Booking> {
        self.ports
            .bookings
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", id))
    }

    fn ensure_owner(task: &Task, client_id: Uuid) -> Result<()> {
        if task.client_id != client_id {
            return Err(DomainError::Forbidden(format!(
                "task {} does not belong to {client_id}",
                task.id
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, reg), fields(email = %reg.email, role = %reg.role))]
    pub async fn register(&self, reg: Registration, now: DateTime<Utc>) -> Result<User> {
        if reg.name.trim().is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        if !reg.email.contains('@') {
            return Err(DomainError::validation("email address is invalid"));
        }
        if reg.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let email = reg.email.trim().to_lowercase();
        if self.ports.users.find_by_email(&email).await?.is_some() {
            return Err(DomainError::Conflict(format!("email {email} is already registered")));
        }

        let password_hash = self.ports.hasher.hash(&reg.password)?;
        let user = NewUser {
            name: reg.name.trim().to_string(),
            email,
            password_hash,
            role: reg.role,
            city: reg.city,
            is_generated: reg.is_generated,
        }
        .into_user(now);
        self.ports.users.create(&user).await?;

        if user.is_provider() && self.rules.signup_credits > 0 {
            let grant = CreditTransaction::new(user.id, self.rules.signup_credits, CreditReason::Grant, None);
            self.ports.credits.record(&grant).await?;
        }
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub async fn grant_credits(&self, user_id: Uuid, amount: i32, reason: CreditReason) -> Result<i64> {
        if amount <= 0 {
            return Err(DomainError::validation("credit grants must be positive"));
        }
        self.user(user_id).await?;
        self.ports
            .credits
            .record(&CreditTransaction::new(user_id, amount, reason, None))
            .await?;
        self.ports.credits.balance(user_id).await
    }

    pub async fn credit_balance(&self, user_id: Uuid) -> Result<i64> {
        self.ports.credits.balance(user_id).await
    }

    #[instrument(skip(self, new), fields(client_id = %new.client_id))]
    pub async fn post_task(&self, new: NewTask, now: DateTime<Utc>) -> Result<Task> {
        new.validate()?;
        let client = self.user(new.client_id).await?;
        if client.role == UserRole::Provider {
            return Err(DomainError::Forbidden("providers cannot post tasks".into()));
        }
        let task = new.into_task(now);
        self.ports.tasks.create(&task).await?;
        info!(task_id = %task.id, city = %task.city, "task posted");
        Ok(task)
    }

    pub async fn open_tasks(&self, city: Option<String>, limit: i64) -> Result<Vec<Task>> {
        self.ports.tasks.list_open(city, limit.clamp(1, 100)).await
    }

    #[instrument(skip(self, message))]
    pub async fn submit_offer(
        &self,
        task_id: Uuid,
        provider_id: Uuid,
        price: i32,
        message: String,
        now: DateTime<Utc>,
    ) -> Result<Offer> {
        if price <= 0 {
            return Err(DomainError::validation("offer price must be positive"));
        }
        let task = self.task(task_id).await?;
        if task.status != TaskStatus::Open {
            return Err(DomainError::validation(format!("task {task_id} is not open for offers")));
        }
        let provider = self.user(provider_id).await?;
        if !provider.is_provider() {
            return Err(DomainError::Forbidden("only providers can send offers".into()));
        }
        if task.client_id == provider_id {
            return Err(DomainError::Forbidden("providers cannot bid on their own task".into()));
        }

        let cost = self.rules.offer_credit_cost;
        if cost > 0 && self.ports.credits.balance(provider_id).await? < i64::from(cost) {
            return Err(DomainError::validation("insufficient credits to send an offer"));
        }

        let offer = Offer {
            id: Uuid::now_v7(),
            task_id,
            provider_id,
            price,
            message: message.trim().to_string(),
            status: OfferStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        let debit = CreditTransaction::new(provider_id, -cost, CreditReason::OfferSubmitted, Some(offer.id));
        self.ports.offers.submit(&offer, &debit).await?;
        info!(offer_id = %offer.id, cost, "offer submitted");
        Ok(offer)
    }

    pub async fn withdraw_offer(&self, provider_id: Uuid, offer_id: Uuid, now: DateTime<Utc>) -> Result<Offer> {
        let mut offer = self.offer(offer_id).await?;
        if offer.provider_id != provider_id {
            return Err(DomainError::Forbidden(format!("offer {offer_id} belongs to another provider")));
        }
        offer.transition(OfferStatus::Withdrawn, now)?;
        self.ports.offers.update(&offer).await?;
        Ok(offer)
    }

    /// Accepts one offer, rejects the other pending ones and assigns the task.
    #[instrument(skip(self))]
    pub async fn accept_offer(&self, client_id: Uuid, offer_id: Uuid, now: DateTime<Utc>) -> Result<Task> {
        let offer = self.offer(offer_id).await?;
        let mut task = self.task(offer.task_id).await?;
        Self::ensure_owner(&task, client_id)?;
        if offer.status != OfferStatus::Pending {
            return Err(DomainError::validation(format!("offer {offer_id} is {}", offer.status)));
        }
        task.transition(TaskStatus::Assigned, now)?;
        task.assigned_provider_id = Some(offer.provider_id);
        self.ports.offers.accept(&task, offer.id).await?;
        info!(task_id = %task.id, provider_id = %offer.provider_id, "offer accepted");
        Ok(task)
    }

    pub async fn complete_task(&self, client_id: Uuid, task_id: Uuid, now: DateTime<Utc>) -> Result<Task> {
        let mut task = self.task(task_id).await?;
        Self::ensure_owner(&task, client_id)?;
        task.transition(TaskStatus::Completed, now)?;
        self.ports.tasks.update(&task).await?;
        info!(%task_id, "task completed");
        Ok(task)
    }

    /// Cancels the task and refunds every provider whose offer was still pending.
    #[instrument(skip(self))]
    pub async fn cancel_task(&self, client_id: Uuid, task_id: Uuid, now: DateTime<Utc>) -> Result<Task> {
        let mut task = self.task(task_id).await?;
        Self::ensure_owner(&task, client_id)?;
        task.transition(TaskStatus::Cancelled, now)?;

        let refunds: Vec<_> = if self.rules.offer_credit_cost > 0 {
            self.ports
                .offers
                .list_for_task(task_id)
                .await?
                .into_iter()
                .filter(|o| o.status == OfferStatus::Pending)
                .map(|o| {
                    CreditTransaction::new(
                        o.provider_id,
                        self.rules.offer_credit_cost,
                        CreditReason::OfferRefund,
                        Some(o.id),
                    )
                })
                .collect()
        } else {
            Vec::new()
        };

        self.ports.tasks.cancel(&task, &refunds).await?;
        info!(%task_id, refunds = refunds.len(), "task cancelled");
        Ok(task)
    }

    pub async fn leave_review(
        &self,
        task_id: Uuid,
        reviewer_id: Uuid,
        rating: u8,
        comment: String,
        now: DateTime<Utc>,
    ) -> Result<Review> {
        Review::validate_rating(rating)?;
        let task = self.task(task_id).await?;
        if task.status != TaskStatus::Completed {
            return Err(DomainError::validation("only completed tasks can be reviewed"));
        }
        let provider_id = task
            .assigned_provider_id
            .ok_or_else(|| DomainError::Internal(format!("completed task {task_id} has no provider")))?;
        let reviewee_id = if reviewer_id == task.client_id {
            provider_id
        } else if reviewer_id == provider_id {
            task.client_id
        } else {
            return Err(DomainError::Forbidden("only the client or the provider can review a task".into()));
        };
        if self.ports.reviews.exists(task_id, reviewer_id).await? {
            return Err(DomainError::Conflict(format!("task {task_id} already reviewed by {reviewer_id}")));
        }

        let review = Review {
            id: Uuid::now_v7(),
            task_id,
            reviewer_id,
            reviewee_id,
            rating,
            comment: comment.trim().to_string(),
            created_at: now,
        };
        self.ports.reviews.create(&review).await?;
        Ok(review)
    }

    pub async fn rating_summary(&self, user_id: Uuid) -> Result<RatingSummary> {
        self.ports.reviews.summary_for(user_id).await
    }

    pub async fn request_booking(
        &self,
        client_id: Uuid,
        task_id: Uuid,
        starts_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Booking> {
        let task = self.task(task_id).await?;
        Self::ensure_owner(&task, client_id)?;
        if task.status != TaskStatus::Assigned {
            return Err(DomainError::validation("bookings require an assigned task"));
        }
        if starts_at <= now {
            return Err(DomainError::validation("booking must start in the future"));
        }
        let provider_id = task
            .assigned_provider_id
            .ok_or_else(|| DomainError::Internal(format!("assigned task {task_id} has no provider")))?;

        let booking = Booking {
            id: Uuid::now_v7(),
            task_id,
            client_id,
            provider_id,
            starts_at,
            status: BookingStatus::Requested,
            created_at: now,
        };
        self.ports.bookings.create(&booking).await?;
        Ok(booking)
    }

    pub async fn confirm_booking(&self, provider_id: Uuid, booking_id: Uuid) -> Result<Booking> {
        let mut booking = self.booking(booking_id).await?;
        if booking.provider_id != provider_id {
            return Err(DomainError::Forbidden(format!("booking {booking_id} is not yours to confirm")));
        }
        if booking.status != BookingStatus::Requested {
            return Err(DomainError::validation(format!("booking {booking_id} is {}", booking.status)));
        }
        booking.status = BookingStatus::Confirmed;
        self.ports.bookings.update(&booking).await?;
        Ok(booking)
    }

    pub async fn cancel_booking(&self, user_id: Uuid, booking_id: Uuid) -> Result<Booking> {
        let mut booking = self.booking(booking_id).await?;
        if user_id != booking.client_id && user_id != booking.provider_id {
            return Err(DomainError::Forbidden(format!("booking {booking_id} is not yours to cancel")));
        }
        if booking.status == BookingStatus::Cancelled {
            return Err(DomainError::validation(format!("booking {booking_id} is already cancelled")));
        }
        booking.status = BookingStatus::Cancelled;
        self.ports.bookings.update(&booking).await?;
        Ok(booking)
    }

    /// Deletes generated demo tasks older than `older_than_days`. Real tasks
    /// are never matched.
    #[instrument(skip(self))]
    pub async fn cleanup_generated(
        &self,
        older_than_days: i64,
        dry_run: bool,
        now: DateTime<Utc>,
    ) -> Result<CleanupReport> {
        if older_than_days < 0 {
            return Err(DomainError::validation("age threshold cannot be negative"));
        }
        let cutoff = now - Duration::days(older_than_days);
        let matched = self
            .ports
            .tasks
            .list_generated_before(cutoff)
            .await?
            .iter()
            .filter(|t| t.is_cleanup_candidate(cutoff))
            .count();

        let deleted = if dry_run || matched == 0 {
            0
        } else {
            self.ports.tasks.delete_generated_before(cutoff).await?
        };
        info!(matched, deleted, dry_run, %cutoff, "generated task cleanup finished");
        Ok(CleanupReport {
            matched,
            deleted,
            dry_run,
        })
    }

    pub async fn stats(&self) -> Result<MarketplaceStats> {
        Ok(MarketplaceStats {
            open_tasks: self.ports.tasks.count_by_status(TaskStatus::Open).await?,
            assigned_tasks: self.ports.tasks.count_by_status(TaskStatus::Assigned).await?,
            completed_tasks: self.ports.tasks.count_by_status(TaskStatus::Completed).await?,
            clients: self.ports.users.count_by_role(UserRole::Client).await?,
            providers: self.ports.users.count_by_role(UserRole::Provider).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::ports::{
        MockBookingRepository, MockCreditRepository, MockOfferRepository, MockPasswordHasher,
        MockReviewRepository, MockTaskRepository, MockUserRepository,
    };

    #[derive(Default)]
    struct Mocks {
        users: MockUserRepository,
        tasks: MockTaskRepository,
        offers: MockOfferRepository,
        reviews: MockReviewRepository,
        credits: MockCreditRepository,
        bookings: MockBookingRepository,
        hasher: MockPasswordHasher,
    }

    impl Mocks {
        fn service(self) -> MarketplaceService {
            MarketplaceService::new(
                MarketplacePorts {
                    users: Arc::new(self.users),
                    tasks: Arc::new(self.tasks),
                    offers: Arc::new(self.offers),
                    reviews: Arc::new(self.reviews),
                    credits: Arc::new(self.credits),
                    bookings: Arc::new(self.bookings),
                    hasher: Arc::new(self.hasher),
                },
                MarketplaceRules::default(),
            )
        }
    }

    fn person(role: UserRole) -> User {
        NewUser {
            name: "Nathan Roux".into(),
            email: format!("{}@example.fr", Uuid::now_v7().simple()),
            password_hash: "hash".into(),
            role,
            city: Some("Marseille".into()),
            is_generated: false,
        }
        .into_user(Utc::now())
    }

    fn open_task(client_id: Uuid) -> Task {
        NewTask {
            client_id,
            title: "Changer un robinet".into(),
            description: String::new(),
            category: "plombier".into(),
            city: "Marseille".into(),
            budget: Some(90),
            is_generated: false,
        }
        .into_task(Utc::now())
    }

    fn pending_offer(task_id: Uuid, provider_id: Uuid) -> Offer {
        let now = Utc::now();
        Offer {
            id: Uuid::now_v7(),
            task_id,
            provider_id,
            price: 80,
            message: String::new(),
            status: OfferStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_register_provider_grants_signup_credits() {
        let mut m = Mocks::default();
        m.hasher.expect_hash().returning(|_| Ok("$argon2id$v=19$...".into()));
        m.users.expect_find_by_email().returning(|_| Ok(None));
        m.users.expect_create().times(1).returning(|_| Ok(()));
        m.credits
            .expect_record()
            .withf(|tx| tx.amount == 10 && tx.reason == CreditReason::Grant)
            .times(1)
            .returning(|_| Ok(()));

        let user = m
            .service()
            .register(
                Registration {
                    name: "Sarah".into(),
                    email: "Sarah@Example.fr".into(),
                    password: "motdepasse".into(),
                    role: UserRole::Provider,
                    city: None,
                    is_generated: false,
                },
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(user.email, "sarah@example.fr");
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email() {
        let mut m = Mocks::default();
        m.hasher.expect_hash().never();
        m.users
            .expect_find_by_email()
            .returning(|_| Ok(Some(person(UserRole::Client))));
        m.users.expect_create().never();

        let err = m
            .service()
            .register(
                Registration {
                    name: "Sarah".into(),
                    email: "sarah@example.fr".into(),
                    password: "motdepasse".into(),
                    role: UserRole::Client,
                    city: None,
                    is_generated: false,
                },
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_submit_offer_debits_credits() {
        let client = person(UserRole::Client);
        let provider = person(UserRole::Provider);
        let task = open_task(client.id);
        let task_id = task.id;
        let provider_id = provider.id;

        let mut m = Mocks::default();
        m.tasks.expect_get().returning(move |_| Ok(Some(task.clone())));
        m.users.expect_get().returning(move |_| Ok(Some(provider.clone())));
        m.credits.expect_balance().returning(|_| Ok(3));
        m.offers
            .expect_submit()
            .withf(move |offer, debit| {
                offer.task_id == task_id
                    && debit.user_id == provider_id
                    && debit.amount == -1
                    && debit.reference_id == Some(offer.id)
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let offer = m
            .service()
            .submit_offer(task_id, provider_id, 75, " Disponible demain ".into(), Utc::now())
            .await
            .unwrap();
        assert_eq!(offer.message, "Disponible demain");
        assert_eq!(offer.status, OfferStatus::Pending);
    }

    #[tokio::test]
    async fn test_submit_offer_requires_credits() {
        let client = person(UserRole::Client);
        let provider = person(UserRole::Provider);
        let task = open_task(client.id);
        let task_id = task.id;
        let provider_id = provider.id;

        let mut m = Mocks::default();
        m.tasks.expect_get().returning(move |_| Ok(Some(task.clone())));
        m.users.expect_get().returning(move |_| Ok(Some(provider.clone())));
        m.credits.expect_balance().returning(|_| Ok(0));
        m.offers.expect_submit().never();

        let err = m
            .service()
            .submit_offer(task_id, provider_id, 75, String::new(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_clients_cannot_send_offers() {
        let client = person(UserRole::Client);
        let other_client = person(UserRole::Client);
        let task = open_task(client.id);
        let task_id = task.id;
        let other_id = other_client.id;

        let mut m = Mocks::default();
        m.tasks.expect_get().returning(move |_| Ok(Some(task.clone())));
        m.users.expect_get().returning(move |_| Ok(Some(other_client.clone())));

        let err = m
            .service()
            .submit_offer(task_id, other_id, 75, String::new(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_accept_offer_assigns_task() {
        let client_id = Uuid::now_v7();
        let provider_id = Uuid::now_v7();
        let task = open_task(client_id);
        let offer = pending_offer(task.id, provider_id);
        let offer_id = offer.id;

        let mut m = Mocks::default();
        m.offers.expect_get().returning(move |_| Ok(Some(offer.clone())));
        m.tasks.expect_get().returning(move |_| Ok(Some(task.clone())));
        m.offers
            .expect_accept()
            .withf(move |task, id| {
                *id == offer_id
                    && task.status == TaskStatus::Assigned
                    && task.assigned_provider_id == Some(provider_id)
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let task = m.service().accept_offer(client_id, offer_id, Utc::now()).await.unwrap();
        assert_eq!(task.status, TaskStatus::Assigned);
    }

    #[tokio::test]
    async fn test_accept_offer_checks_ownership() {
        let task = open_task(Uuid::now_v7());
        let offer = pending_offer(task.id, Uuid::now_v7());
        let offer_id = offer.id;

        let mut m = Mocks::default();
        m.offers.expect_get().returning(move |_| Ok(Some(offer.clone())));
        m.tasks.expect_get().returning(move |_| Ok(Some(task.clone())));
        m.offers.expect_accept().never();

        let err = m
            .service()
            .accept_offer(Uuid::now_v7(), offer_id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_cancel_refunds_only_pending_offers() {
        let client_id = Uuid::now_v7();
        let task = open_task(client_id);
        let task_id = task.id;
        let pending = pending_offer(task_id, Uuid::now_v7());
        let pending_provider = pending.provider_id;
        let mut withdrawn = pending_offer(task_id, Uuid::now_v7());
        withdrawn.status = OfferStatus::Withdrawn;

        let mut m = Mocks::default();
        m.tasks.expect_get().returning(move |_| Ok(Some(task.clone())));
        m.offers
            .expect_list_for_task()
            .returning(move |_| Ok(vec![pending.clone(), withdrawn.clone()]));
        m.tasks
            .expect_cancel()
            .withf(move |task, refunds| {
                task.status == TaskStatus::Cancelled
                    && refunds.len() == 1
                    && refunds[0].user_id == pending_provider
                    && refunds[0].amount == 1
                    && refunds[0].reason == CreditReason::OfferRefund
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let task = m.service().cancel_task(client_id, task_id, Utc::now()).await.unwrap();
        assert_eq!(task.status, TaskStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_review_targets_the_other_party_once() {
        let client_id = Uuid::now_v7();
        let provider_id = Uuid::now_v7();
        let mut task = open_task(client_id);
        let now = Utc::now();
        task.transition(TaskStatus::Assigned, now).unwrap();
        task.assigned_provider_id = Some(provider_id);
        task.transition(TaskStatus::Completed, now).unwrap();
        let task_id = task.id;

        let mut m = Mocks::default();
        m.tasks.expect_get().returning(move |_| Ok(Some(task.clone())));
        m.reviews.expect_exists().returning(|_, _| Ok(false));
        m.reviews.expect_create().times(1).returning(|_| Ok(()));
        let service = m.service();

        let review = service
            .leave_review(task_id, provider_id, 5, "Client ponctuel".into(), now)
            .await
            .unwrap();
        assert_eq!(review.reviewee_id, client_id);

        let err = service
            .leave_review(task_id, Uuid::now_v7(), 4, String::new(), now)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
        assert!(service.leave_review(task_id, client_id, 6, String::new(), now).await.is_err());
    }

    #[tokio::test]
    async fn test_booking_requires_future_start_on_assigned_task() {
        let client_id = Uuid::now_v7();
        let mut task = open_task(client_id);
        let now = Utc::now();
        task.transition(TaskStatus::Assigned, now).unwrap();
        task.assigned_provider_id = Some(Uuid::now_v7());
        let task_id = task.id;

        let mut m = Mocks::default();
        m.tasks.expect_get().returning(move |_| Ok(Some(task.clone())));
        m.bookings.expect_create().times(1).returning(|_| Ok(()));
        let service = m.service();

        assert!(service
            .request_booking(client_id, task_id, now - Duration::hours(1), now)
            .await
            .is_err());
        let booking = service
            .request_booking(client_id, task_id, now + Duration::days(2), now)
            .await
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Requested);
    }

    #[tokio::test]
    async fn test_cleanup_dry_run_never_deletes() {
        let now = Utc::now();
        let mut old = open_task(Uuid::now_v7());
        old.is_generated = true;
        old.created_at = now - Duration::days(10);

        let mut m = Mocks::default();
        m.tasks
            .expect_list_generated_before()
            .returning(move |_| Ok(vec![old.clone()]));
        m.tasks.expect_delete_generated_before().never();

        let report = m.service().cleanup_generated(7, true, now).await.unwrap();
        assert_eq!(
            report,
            CleanupReport {
                matched: 1,
                deleted: 0,
                dry_run: true
            }
        );
    }

    #[tokio::test]
    async fn test_cleanup_deletes_generated_tasks() {
        let now = Utc::now();
        let mut old = open_task(Uuid::now_v7());
        old.is_generated = true;
        old.created_at = now - Duration::days(10);

        let mut m = Mocks::default();
        m.tasks
            .expect_list_generated_before()
            .returning(move |_| Ok(vec![old.clone()]));
        m.tasks
            .expect_delete_generated_before()
            .withf(move |cutoff| *cutoff == now - Duration::days(7))
            .times(1)
            .returning(|_| Ok(1));

        let report = m.service().cleanup_generated(7, false, now).await.unwrap();
        assert_eq!(report.deleted, 1);
    }
}
