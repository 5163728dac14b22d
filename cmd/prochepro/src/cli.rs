use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use domains::models::SeoPageType;
use services::GenerateOptions;

#[derive(Debug, Parser)]
#[command(name = "prochepro", version, about = "ProchePro backend: API server and scheduled jobs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve,

    /// Apply pending database migrations
    #[command(name = "db:migrate")]
    DbMigrate,

    /// Generate guide posts for service × district pairs
    #[command(name = "blog:generate-posts")]
    BlogGeneratePosts(GenerateArgs),

    /// Generate local landing pages for service × district pairs
    #[command(name = "seo:generate-local-pages")]
    SeoGenerateLocalPages {
        #[command(flatten)]
        generate: GenerateArgs,
        /// Page types to generate (service, pricing, urgent); all by default
        #[arg(long = "types", value_delimiter = ',')]
        types: Vec<SeoPageType>,
    },

    /// Write sitemap.xml (split into sitemap-N.xml files when large)
    #[command(name = "sitemap:generate")]
    SitemapGenerate {
        /// Output file; defaults to content.sitemap_path
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Delete generated demo tasks older than N days
    #[command(name = "tasks:cleanup-generated")]
    TasksCleanupGenerated {
        /// Defaults to marketplace.generated_task_ttl_days
        #[arg(long)]
        days: Option<i64>,
        #[arg(long)]
        dry_run: bool,
    },

    /// Post generated demo tasks from the demo client accounts
    #[command(name = "tasks:generate-demo")]
    TasksGenerateDemo {
        #[arg(long, default_value_t = 10)]
        count: usize,
        /// Seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Queue next Monday's digest of new local tasks
    #[command(name = "email:schedule-weekly-digests")]
    EmailScheduleWeeklyDigests,

    /// Queue welcome, follow-up, review, booking and re-engagement emails
    #[command(name = "email:schedule-reminders")]
    EmailScheduleReminders,

    /// Send queued emails that are due
    #[command(name = "email:send-scheduled")]
    EmailSendScheduled {
        /// Defaults to email.batch_size
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Delete sent, failed and cancelled email logs older than N days
    #[command(name = "email:prune-logs")]
    EmailPruneLogs {
        #[arg(long, default_value_t = 90)]
        days: i64,
    },

    /// Run the Telegram bot with long polling
    #[command(name = "telegram:bot")]
    TelegramBot {
        /// Handle a single batch of updates and exit
        #[arg(long)]
        once: bool,
    },

    /// Point Telegram at the webhook endpoint
    #[command(name = "telegram:set-webhook")]
    TelegramSetWebhook {
        /// Defaults to {app.base_url}/api/telegram/webhook
        #[arg(long)]
        url: Option<String>,
    },

    /// Remove the webhook so long polling works again
    #[command(name = "telegram:delete-webhook")]
    TelegramDeleteWebhook {
        #[arg(long)]
        drop_pending: bool,
    },

    /// Publish the bot command menu
    #[command(name = "telegram:set-commands")]
    TelegramSetCommands,

    /// Print a new Web Push VAPID key pair as env lines
    #[command(name = "webpush:generate-vapid")]
    WebpushGenerateVapid,
}

#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    /// Max number of (service, district) pairs
    #[arg(long)]
    pub limit: Option<usize>,
    /// Only this service slug
    #[arg(long)]
    pub service: Option<String>,
    /// Only districts of this city
    #[arg(long)]
    pub city: Option<String>,
    /// Re-render rows that already exist
    #[arg(long)]
    pub force: bool,
    /// Publish new rows
    #[arg(long)]
    pub publish: bool,
    /// Render without writing
    #[arg(long)]
    pub dry_run: bool,
}

impl GenerateArgs {
    pub fn options(self, page_types: Vec<SeoPageType>) -> GenerateOptions {
        GenerateOptions {
            limit: self.limit,
            service: self.service,
            city: self.city,
            page_types,
            force: self.force,
            publish: self.publish,
            dry_run: self.dry_run,
        }
    }
}
