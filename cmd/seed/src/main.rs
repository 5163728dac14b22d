//! Fills a database with demo data: catalog, demo accounts, generated
//! tasks with offers and one completed task with reviews. Safe to run
//! again: catalog rows are upserted and demo accounts reused.

use std::sync::Arc;

use anyhow::{Context, Result};
use auth_adapters::Argon2PasswordHasher;
use chrono::Utc;
use clap::Parser;
use configs::Settings;
use services::demo::SeedOptions;
use services::marketplace::{MarketplacePorts, MarketplaceRules};
use services::{DemoSeeder, MarketplaceService};
use storage_adapters::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "seed", about = "Load ProchePro demo data")]
struct Args {
    /// Overrides database.url
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long, default_value_t = 5)]
    clients: usize,
    #[arg(long, default_value_t = 8)]
    providers: usize,
    #[arg(long, default_value_t = 30)]
    tasks: usize,
    #[arg(long, default_value_t = 2)]
    offers_per_task: usize,
    /// Password shared by every demo account
    #[arg(long, default_value = "demo-password")]
    password: String,
    /// Seed for reproducible data
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("seed error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load().context("cannot load settings")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log.level)))
        .with_writer(std::io::stderr)
        .init();

    let url = args.database_url.as_deref().unwrap_or(&settings.database.url);
    let db = Database::connect(url, settings.database.max_connections)
        .await
        .with_context(|| format!("cannot open database {url}"))?;
    db.migrate().await.context("migrations failed")?;

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
    let mut seeder = DemoSeeder::new(marketplace, db.catalog(), db.users());
    if let Some(seed) = args.seed {
        seeder = seeder.with_seed(seed);
    }

    let opts = SeedOptions {
        clients: args.clients,
        providers: args.providers,
        tasks: args.tasks,
        offers_per_task: args.offers_per_task,
        password: args.password,
    };
    let report = seeder.seed(&opts, Utc::now()).await?;
    info!(?report, "demo data loaded");
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
