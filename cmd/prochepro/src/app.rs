//! Wiring: settings in, adapters and services out.

use std::sync::Arc;

use anyhow::{Context, Result};
use auth_adapters::Argon2PasswordHasher;
use configs::{MailTransport, Settings};
use domains::ports::{Mailer, TelegramApi};
use notify_adapters::{HttpMailer, LogMailer, TelegramHttpClient};
use secrecy::{ExposeSecret, SecretString};
use services::marketplace::{MarketplacePorts, MarketplaceRules};
use services::{
    ContentGenerator, DemoSeeder, EmailDispatcher, EmailRenderer, EmailScheduler, MarketplaceService,
    SitemapBuilder, SupportService, TelegramBot, UnsubscribeSigner,
};
use storage_adapters::Database;
use tracing::{debug, info};

pub struct App {
    pub settings: Settings,
    pub db: Database,
    pub marketplace: Arc<MarketplaceService>,
}

impl App {
    /// Opens the database and builds the marketplace service. Migrations
    /// only run when `migrate` is set.
    pub async fn connect(settings: Settings, migrate: bool) -> Result<Self> {
        // 1. Database
        let db = Database::connect(&settings.database.url, settings.database.max_connections)
            .await
            .with_context(|| format!("cannot open database {}", settings.database.url))?;
        if migrate {
            db.migrate().await.context("migrations failed")?;
            info!("database migrated");
        }

        // 2. Marketplace rules come from config, hashing is Argon2id
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
            MarketplaceRules {
                offer_credit_cost: settings.marketplace.offer_credit_cost,
                signup_credits: settings.marketplace.signup_credits,
            },
        ));

        Ok(Self {
            settings,
            db,
            marketplace,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.settings.app.base_url
    }

    /// Fails when no bot token is configured.
    pub fn telegram(&self) -> Result<Arc<dyn TelegramApi>> {
        let token = self
            .settings
            .telegram
            .bot_token
            .as_ref()
            .context("telegram.bot_token is not configured")?;
        let client = TelegramHttpClient::new(
            &self.settings.telegram.api_base,
            SecretString::from(token.expose_secret().to_owned()),
        )?;
        Ok(Arc::new(client))
    }

    /// Support desk, forwarding new tickets to the admin chat when both a
    /// bot token and `telegram.admin_chat_id` are set.
    pub fn support(&self) -> Result<Arc<SupportService>> {
        let service = SupportService::new(self.db.support());
        let service = match (&self.settings.telegram.bot_token, self.settings.telegram.admin_chat_id) {
            (Some(_), Some(chat_id)) => service.with_admin_notifications(self.telegram()?, chat_id),
            _ => {
                debug!("support admin notifications disabled");
                service
            }
        };
        Ok(Arc::new(service))
    }

    pub fn bot(&self, api: Arc<dyn TelegramApi>, support: Arc<SupportService>) -> TelegramBot {
        TelegramBot::new(
            api,
            self.db.catalog(),
            self.marketplace.clone(),
            support,
            self.base_url(),
        )
    }

    pub fn signer(&self) -> UnsubscribeSigner {
        UnsubscribeSigner::new(self.settings.app.key.expose_secret())
    }

    pub fn content_generator(&self) -> ContentGenerator {
        ContentGenerator::new(self.db.catalog(), self.db.content())
    }

    pub fn sitemap(&self) -> SitemapBuilder {
        SitemapBuilder::new(self.base_url(), self.db.catalog(), self.db.content())
    }

    pub fn seeder(&self) -> DemoSeeder {
        DemoSeeder::new(self.marketplace.clone(), self.db.catalog(), self.db.users())
    }

    pub fn scheduler(&self) -> EmailScheduler {
        EmailScheduler::new(
            self.db.users(),
            self.db.tasks(),
            self.db.offers(),
            self.db.reviews(),
            self.db.bookings(),
            self.db.email_logs(),
            self.settings.email.digest_hour,
        )
    }

    pub fn dispatcher(&self) -> Result<EmailDispatcher> {
        let renderer = EmailRenderer::new(self.base_url(), self.signer());
        Ok(EmailDispatcher::new(
            self.db.email_logs(),
            self.db.users(),
            self.mailer()?,
            renderer,
        ))
    }

    fn mailer(&self) -> Result<Arc<dyn Mailer>> {
        let email = &self.settings.email;
        match email.transport {
            MailTransport::Log => Ok(Arc::new(LogMailer)),
            MailTransport::Http => {
                let api_url = email.api_url.as_deref().context("email.api_url is not configured")?;
                let api_key = email
                    .api_key
                    .as_ref()
                    .map(|key| SecretString::from(key.expose_secret().to_owned()));
                let mailer = HttpMailer::new(api_url, api_key, &email.from_address, &email.from_name)?;
                Ok(Arc::new(mailer))
            }
        }
    }
}
