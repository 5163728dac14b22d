//! # Ports
//!
//! Every adapter implements one of these traits; services only ever see
//! `Arc<dyn Port>`. Mock implementations are generated by mockall when the
//! `testing` feature is enabled.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{
    Booking, BotCommandSpec, BotUpdate, CityDistrict, CreditTransaction, DeliveryOutcome,
    EmailAutomationLog, EmailStatus, LocalSeoPage, MessageSender, Offer, OutgoingEmail,
    PopularService, PublishedUrl, RatingSummary, Review, SeoPageType, SupportMessage,
    SupportTicket, Task, TaskStatus, TicketStatus, User, UserRole, BlogPost,
};

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list_by_role(&self, role: UserRole) -> Result<Vec<User>>;
    /// Users with `email_notifications` on.
    async fn list_notifiable(&self) -> Result<Vec<User>>;
    /// Real users created in `[from, to]`.
    async fn list_created_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<User>>;
    /// Notifiable users whose last login, or signup when they never
    /// logged in, is older than `cutoff`.
    async fn list_inactive_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<User>>;
    async fn set_email_notifications(&self, id: Uuid, enabled: bool) -> Result<()>;
    async fn count_by_role(&self, role: UserRole) -> Result<i64>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: &Task) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Task>>;
    async fn update(&self, task: &Task) -> Result<()>;
    /// Latest open tasks, newest first.
    async fn list_open(&self, city: Option<String>, limit: i64) -> Result<Vec<Task>>;
    async fn list_open_created_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Task>>;
    async fn list_completed_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Task>>;
    async fn count_by_status(&self, status: TaskStatus) -> Result<i64>;
    /// Atomically cancels the task, rejects its pending offers and records the refunds.
    async fn cancel(&self, task: &Task, refunds: &[CreditTransaction]) -> Result<()>;
    /// Generated tasks created before `cutoff`. Never returns real tasks.
    async fn list_generated_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Task>>;
    /// Deletes generated tasks created before `cutoff`; returns the row count.
    async fn delete_generated_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait OfferRepository: Send + Sync {
    /// Inserts the offer and its credit debit in one transaction.
    async fn submit(&self, offer: &Offer, debit: &CreditTransaction) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Offer>>;
    async fn update(&self, offer: &Offer) -> Result<()>;
    async fn list_for_task(&self, task_id: Uuid) -> Result<Vec<Offer>>;
    async fn count_for_task(&self, task_id: Uuid) -> Result<i64>;
    async fn list_pending_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Offer>>;
    /// Atomically: accepts `offer_id`, rejects the other pending offers and
    /// persists the (already assigned) task.
    async fn accept(&self, task: &Task, offer_id: Uuid) -> Result<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn create(&self, review: &Review) -> Result<()>;
    async fn exists(&self, task_id: Uuid, reviewer_id: Uuid) -> Result<bool>;
    async fn list_for_user(&self, reviewee_id: Uuid) -> Result<Vec<Review>>;
    async fn summary_for(&self, reviewee_id: Uuid) -> Result<RatingSummary>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CreditRepository: Send + Sync {
    async fn record(&self, tx: &CreditTransaction) -> Result<()>;
    async fn balance(&self, user_id: Uuid) -> Result<i64>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create(&self, booking: &Booking) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Booking>>;
    async fn update(&self, booking: &Booking) -> Result<()>;
    async fn list_confirmed_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Insert or update by slug.
    async fn upsert_service(&self, service: &PopularService) -> Result<()>;
    async fn upsert_district(&self, district: &CityDistrict) -> Result<()>;
    /// Active services ordered by `sort_order`.
    async fn list_services(&self) -> Result<Vec<PopularService>>;
    /// Active districts ordered by city then name.
    async fn list_districts(&self) -> Result<Vec<CityDistrict>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn find_generated_post(&self, service_id: Uuid, district_id: Uuid) -> Result<Option<BlogPost>>;
    async fn insert_blog_post(&self, post: &BlogPost) -> Result<()>;
    async fn update_blog_post(&self, post: &BlogPost) -> Result<()>;
    async fn get_blog_post(&self, slug: &str) -> Result<Option<BlogPost>>;
    /// Published posts, newest first.
    async fn list_published_posts(&self, limit: i64, offset: i64) -> Result<Vec<BlogPost>>;
    async fn published_post_urls(&self) -> Result<Vec<PublishedUrl>>;

    async fn find_seo_page(
        &self,
        service_id: Uuid,
        district_id: Uuid,
        page_type: SeoPageType,
    ) -> Result<Option<LocalSeoPage>>;
    async fn insert_seo_page(&self, page: &LocalSeoPage) -> Result<()>;
    async fn update_seo_page(&self, page: &LocalSeoPage) -> Result<()>;
    async fn get_seo_page(&self, slug: &str) -> Result<Option<LocalSeoPage>>;
    async fn published_seo_urls(&self) -> Result<Vec<PublishedUrl>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait EmailLogRepository: Send + Sync {
    /// Returns `false` when an entry with the same `dedup_key` already exists.
    async fn enqueue(&self, log: &EmailAutomationLog) -> Result<bool>;
    async fn get(&self, id: Uuid) -> Result<Option<EmailAutomationLog>>;
    /// Pending entries with `scheduled_for <= now`, oldest first.
    async fn due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<EmailAutomationLog>>;
    /// Moves a pending entry to its terminal status. Returns `false` when
    /// the entry had already left `pending`.
    async fn complete(&self, id: Uuid, outcome: &DeliveryOutcome) -> Result<bool>;
    /// Deletes terminal entries created before `before`.
    async fn prune(&self, before: DateTime<Utc>) -> Result<u64>;
    async fn count_by_status(&self, status: EmailStatus) -> Result<i64>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SupportRepository: Send + Sync {
    async fn create_ticket(&self, ticket: &SupportTicket) -> Result<()>;
    async fn get_ticket(&self, id: Uuid) -> Result<Option<SupportTicket>>;
    async fn set_ticket_status(&self, id: Uuid, status: TicketStatus, at: DateTime<Utc>) -> Result<()>;
    /// Appends a message; the store assigns the monotonic id.
    async fn add_message(
        &self,
        ticket_id: Uuid,
        sender: MessageSender,
        body: &str,
        at: DateTime<Utc>,
    ) -> Result<SupportMessage>;
    /// Messages with `id > after_id`, ascending.
    async fn list_messages(&self, ticket_id: Uuid, after_id: i64, limit: i64) -> Result<Vec<SupportMessage>>;
}

/// Outbound email transport.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

/// The subset of the Telegram Bot API the backend uses.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TelegramApi: Send + Sync {
    async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<BotUpdate>>;
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;
    async fn set_webhook(&self, url: &str, secret_token: Option<String>) -> Result<()>;
    async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<()>;
    async fn set_my_commands(&self, commands: &[BotCommandSpec]) -> Result<()>;
}

/// Password hashing for account creation.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String>;
    fn verify(&self, password: &str, hash: &str) -> bool;
}
