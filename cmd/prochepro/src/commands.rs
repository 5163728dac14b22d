//! One function per subcommand. Reports go to stdout as JSON, logs to
//! stderr.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use api_adapters::{build_router, AppState};
use auth_adapters::VapidKeys;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use services::email::prune_logs;
use services::telegram::PollSettings;
use services::GenerationReport;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::app::App;
use crate::cli::Command;

pub async fn run(command: Command, settings: configs::Settings) -> Result<()> {
    if let Command::WebpushGenerateVapid = command {
        return generate_vapid();
    }

    let migrate = matches!(command, Command::Serve | Command::DbMigrate);
    let app = App::connect(settings, migrate).await?;
    let now = Utc::now();

    match command {
        Command::Serve => serve(app).await,
        Command::DbMigrate => Ok(()),
        Command::BlogGeneratePosts(args) => {
            let report = app
                .content_generator()
                .generate_blog_posts(&args.options(Vec::new()), now)
                .await?;
            finish_generation("blog posts", report)
        }
        Command::SeoGenerateLocalPages { generate, types } => {
            let report = app
                .content_generator()
                .generate_local_pages(&generate.options(types), now)
                .await?;
            finish_generation("local pages", report)
        }
        Command::SitemapGenerate { path } => {
            let path = path.unwrap_or_else(|| app.settings.content.sitemap_path.clone());
            let written = app.sitemap().write_to(&path, now).await?;
            print_json(&written)
        }
        Command::TasksCleanupGenerated { days, dry_run } => {
            let days = days.unwrap_or(app.settings.marketplace.generated_task_ttl_days);
            let report = app.marketplace.cleanup_generated(days, dry_run, now).await?;
            print_json(&report)
        }
        Command::TasksGenerateDemo { count, seed } => {
            let seeder = match seed {
                Some(seed) => app.seeder().with_seed(seed),
                None => app.seeder(),
            };
            let tasks = seeder.generate_tasks(count, now).await?;
            print_json(&serde_json::json!({ "created": tasks.len() }))
        }
        Command::EmailScheduleWeeklyDigests => {
            let report = app.scheduler().schedule_weekly_digests(now).await?;
            print_json(&report)
        }
        Command::EmailScheduleReminders => {
            let report = app.scheduler().schedule_reminders(now).await?;
            print_json(&report)
        }
        Command::EmailSendScheduled { limit } => {
            let limit = limit.unwrap_or(app.settings.email.batch_size);
            let report = app.dispatcher()?.send_due(now, limit).await?;
            print_json(&report)
        }
        Command::EmailPruneLogs { days } => {
            let deleted = prune_logs(app.db.email_logs(), days, now).await?;
            print_json(&serde_json::json!({ "deleted": deleted }))
        }
        Command::TelegramBot { once } => telegram_bot(app, once).await,
        Command::TelegramSetWebhook { url } => {
            let url = url.unwrap_or_else(|| format!("{}/api/telegram/webhook", app.base_url()));
            let secret = app
                .settings
                .telegram
                .webhook_secret
                .as_ref()
                .map(|s| s.expose_secret().to_owned());
            if secret.is_none() {
                warn!("telegram.webhook_secret is not set; the webhook will reject every update");
            }
            app.telegram()?.set_webhook(&url, secret).await?;
            info!(%url, "telegram webhook set");
            Ok(())
        }
        Command::TelegramDeleteWebhook { drop_pending } => {
            app.telegram()?.delete_webhook(drop_pending).await?;
            info!(drop_pending, "telegram webhook deleted");
            Ok(())
        }
        Command::TelegramSetCommands => {
            let bot = app.bot(app.telegram()?, app.support()?);
            bot.publish_commands().await?;
            info!("telegram command menu published");
            Ok(())
        }
        Command::WebpushGenerateVapid => generate_vapid(),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn finish_generation(what: &str, report: GenerationReport) -> Result<()> {
    print_json(&report)?;
    if report.failed > 0 {
        bail!("{} {what} failed to render or save", report.failed);
    }
    Ok(())
}

fn generate_vapid() -> Result<()> {
    let keys = VapidKeys::generate();
    print!("{}", keys.to_env_lines());
    Ok(())
}

/// Flips to `true` on Ctrl-C.
fn shutdown_channel() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(e) => warn!(error = %e, "cannot listen for ctrl-c"),
        }
        let _ = tx.send(true);
    });
    rx
}

async fn telegram_bot(app: App, once: bool) -> Result<()> {
    let api = app.telegram()?;
    let bot = app.bot(api.clone(), app.support()?);
    let telegram = &app.settings.telegram;

    if once {
        let (next, handled) = bot.poll_once(None, 0).await?;
        // confirm the batch so the next run does not answer it again
        if let Some(offset) = next {
            api.get_updates(Some(offset), 0).await?;
        }
        info!(handled, next_offset = ?next, "telegram batch handled");
        return Ok(());
    }

    let settings = PollSettings {
        interval: Duration::from_secs(telegram.poll_interval_secs),
        timeout_secs: telegram.poll_timeout_secs,
    };
    bot.run(settings, shutdown_channel()).await?;
    Ok(())
}

async fn serve(app: App) -> Result<()> {
    let support = app.support()?;
    let bot = match app.settings.telegram.bot_token {
        Some(_) => Some(Arc::new(app.bot(app.telegram()?, support.clone()))),
        None => None,
    };
    let webhook_secret = app
        .settings
        .telegram
        .webhook_secret
        .as_ref()
        .map(|s| Arc::new(SecretString::from(s.expose_secret().to_owned())));

    let state = AppState {
        catalog: app.db.catalog(),
        content: app.db.content(),
        users: app.db.users(),
        marketplace: app.marketplace.clone(),
        support,
        sitemap: Arc::new(app.sitemap()),
        signer: Arc::new(app.signer()),
        bot,
        webhook_secret,
    };
    let router = build_router(state);

    let addr = app.settings.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    info!(%addr, env = %app.settings.app.env, "{} listening", app.settings.app.name);

    let mut shutdown = shutdown_channel();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .context("server error")?;
    info!("server stopped");
    Ok(())
}
