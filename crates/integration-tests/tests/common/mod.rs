//! Shared fixtures: a migrated in-memory database wired into real services.

#![allow(dead_code)]

use std::sync::Arc;

use api_adapters::AppState;
use auth_adapters::Argon2PasswordHasher;
use chrono::{DateTime, Utc};
use domains::models::{NewTask, Task, User, UserRole};
use secrecy::SecretString;
use services::marketplace::{MarketplacePorts, MarketplaceRules, Registration};
use services::{
    ContentGenerator, DemoSeeder, EmailRenderer, EmailScheduler, MarketplaceService, SitemapBuilder,
    SupportService, TelegramBot, UnsubscribeSigner,
};
use storage_adapters::Database;

pub const BASE_URL: &str = "https://prochepro.test";
pub const APP_KEY: &str = "integration-key";
pub const WEBHOOK_SECRET: &str = "hook-secret";

pub struct TestApp {
    pub db: Database,
    pub marketplace: Arc<MarketplaceService>,
    pub support: Arc<SupportService>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::in_memory().await.expect("in-memory database");
        let marketplace = Arc::new(MarketplaceService::new(
            MarketplacePorts {
                users: db.users(),
                tasks: db.tasks(),
                offers: db.offers(),
                reviews: db.reviews(),
                credits: db.credits(),
                bookings: db.bookings(),
                hasher: Arc::new(Argon2PasswordHasher::new()),
            },
            MarketplaceRules::default(),
        ));
        let support = Arc::new(SupportService::new(db.support()));
        Self {
            db,
            marketplace,
            support,
        }
    }

    pub fn content_generator(&self) -> ContentGenerator {
        ContentGenerator::new(self.db.catalog(), self.db.content())
    }

    pub fn sitemap(&self) -> SitemapBuilder {
        SitemapBuilder::new(BASE_URL, self.db.catalog(), self.db.content())
    }

    pub fn seeder(&self) -> DemoSeeder {
        DemoSeeder::new(self.marketplace.clone(), self.db.catalog(), self.db.users()).with_seed(42)
    }

    pub fn scheduler(&self) -> EmailScheduler {
        EmailScheduler::new(
            self.db.users(),
            self.db.tasks(),
            self.db.offers(),
            self.db.reviews(),
            self.db.bookings(),
            self.db.email_logs(),
            8,
        )
    }

    pub fn renderer(&self) -> EmailRenderer {
        EmailRenderer::new(BASE_URL, UnsubscribeSigner::new(APP_KEY))
    }

    /// Router state; `bot` enables the webhook endpoint.
    pub fn state(&self, bot: Option<Arc<TelegramBot>>) -> AppState {
        AppState {
            catalog: self.db.catalog(),
            content: self.db.content(),
            users: self.db.users(),
            marketplace: self.marketplace.clone(),
            support: self.support.clone(),
            sitemap: Arc::new(self.sitemap()),
            signer: Arc::new(UnsubscribeSigner::new(APP_KEY)),
            bot,
            webhook_secret: Some(Arc::new(SecretString::from(WEBHOOK_SECRET))),
        }
    }

    pub async fn user(&self, name: &str, role: UserRole, city: &str, now: DateTime<Utc>) -> User {
        self.marketplace
            .register(
                Registration {
                    name: name.to_string(),
                    email: format!("{}@example.fr", name.to_lowercase().replace(' ', ".")),
                    password: "correct-horse".to_string(),
                    role,
                    city: Some(city.to_string()),
                    is_generated: false,
                },
                now,
            )
            .await
            .expect("registration")
    }

    pub async fn task(&self, client: &User, title: &str, generated: bool, now: DateTime<Utc>) -> Task {
        self.marketplace
            .post_task(
                NewTask {
                    client_id: client.id,
                    title: title.to_string(),
                    description: "Intervention à prévoir en semaine.".to_string(),
                    category: "plombier".to_string(),
                    city: client.city.clone().unwrap_or_else(|| "Paris".to_string()),
                    budget: Some(120),
                    is_generated: generated,
                },
                now,
            )
            .await
            .expect("task posted")
    }
}
