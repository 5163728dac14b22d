//! # Telegram bot
//!
//! Command dispatch shared by the long-polling loop and the webhook
//! endpoint. Replies are plain text in French.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use domains::errors::Result;
use domains::models::{BotCommandSpec, BotUpdate};
use domains::ports::{CatalogRepository, TelegramApi};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::marketplace::MarketplaceService;
use crate::support::{NewTicket, SupportService};

const TASKS_PER_REPLY: i64 = 5;
const SERVICES_PER_REPLY: usize = 10;
const HELP_HINT: &str = "Je n'ai pas compris. Tapez /help pour voir les commandes disponibles.";
const FAILURE_REPLY: &str = "Une erreur est survenue, réessayez dans quelques instants.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Services,
    Tasks { city: Option<String> },
    Stats,
    Support { message: String },
    Unknown(String),
}

impl BotCommand {
    /// Parses `/command[@botname] [args]`. Returns `None` for plain text.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.trim().strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or(head).to_lowercase();

        Some(match name.as_str() {
            "start" => BotCommand::Start,
            "help" | "aide" => BotCommand::Help,
            "services" => BotCommand::Services,
            "tasks" | "taches" => BotCommand::Tasks {
                city: (!args.is_empty()).then(|| args.to_string()),
            },
            "stats" => BotCommand::Stats,
            "support" => BotCommand::Support {
                message: args.to_string(),
            },
            _ => BotCommand::Unknown(name),
        })
    }
}

/// The command list published with `setMyCommands`.
pub fn command_menu() -> Vec<BotCommandSpec> {
    [
        ("start", "Démarrer"),
        ("help", "Liste des commandes"),
        ("services", "Services les plus demandés"),
        ("tasks", "Dernières demandes, ex. /tasks Lyon"),
        ("stats", "Chiffres de la plateforme"),
        ("support", "Contacter le support, ex. /support mon message"),
    ]
    .into_iter()
    .map(|(command, description)| BotCommandSpec {
        command: command.to_string(),
        description: description.to_string(),
    })
    .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Pause after a failed or empty poll
    pub interval: Duration,
    /// `getUpdates` long-polling timeout
    pub timeout_secs: u64,
}

pub struct TelegramBot {
    api: Arc<dyn TelegramApi>,
    catalog: Arc<dyn CatalogRepository>,
    marketplace: Arc<MarketplaceService>,
    support: Arc<SupportService>,
    base_url: String,
}

impl TelegramBot {
    pub fn new(
        api: Arc<dyn TelegramApi>,
        catalog: Arc<dyn CatalogRepository>,
        marketplace: Arc<MarketplaceService>,
        support: Arc<SupportService>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api,
            catalog,
            marketplace,
            support,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn publish_commands(&self) -> Result<()> {
        self.api.set_my_commands(&command_menu()).await
    }

    /// Builds the reply for one update; `None` when there is nothing to answer.
    pub async fn reply_for(&self, update: &BotUpdate) -> Result<Option<String>> {
        let Some(text) = update.text.as_deref() else {
            return Ok(None);
        };
        let Some(command) = BotCommand::parse(text) else {
            return Ok(Some(HELP_HINT.to_string()));
        };
        debug!(chat_id = update.chat_id, ?command, "bot command");

        let reply = match command {
            BotCommand::Start => {
                let name = update.username.as_deref().unwrap_or("et bienvenue");
                format!(
                    "Bonjour {name} ! Je suis le bot ProchePro.\n\
                     Trouvez un prestataire près de chez vous sur {}.\n\
                     Tapez /help pour voir ce que je sais faire.",
                    self.base_url
                )
            }
            BotCommand::Help => {
                let mut lines = vec!["Commandes disponibles :".to_string()];
                lines.extend(
                    command_menu()
                        .into_iter()
                        .map(|c| format!("/{} : {}", c.command, c.description)),
                );
                lines.join("\n")
            }
            BotCommand::Services => {
                let services = self.catalog.list_services().await?;
                if services.is_empty() {
                    "Aucun service pour le moment.".to_string()
                } else {
                    let mut lines = vec!["Services les plus demandés :".to_string()];
                    lines.extend(services.iter().take(SERVICES_PER_REPLY).map(|s| {
                        format!("• {} ({} à {} €)", s.name, s.price_min, s.price_max)
                    }));
                    lines.join("\n")
                }
            }
            BotCommand::Tasks { city } => {
                let tasks = self.marketplace.open_tasks(city.clone(), TASKS_PER_REPLY).await?;
                let place = city.map(|c| format!(" à {c}")).unwrap_or_default();
                if tasks.is_empty() {
                    format!("Aucune demande ouverte{place} pour le moment.")
                } else {
                    let mut lines = vec![format!("Dernières demandes{place} :")];
                    for task in &tasks {
                        let budget = task.budget.map(|b| format!(", {b} €")).unwrap_or_default();
                        lines.push(format!(
                            "• {} ({}{budget})\n  {}/tasks/{}",
                            task.title, task.city, self.base_url, task.id
                        ));
                    }
                    lines.join("\n")
                }
            }
            BotCommand::Stats => {
                let stats = self.marketplace.stats().await?;
                format!(
                    "ProchePro en chiffres :\n• {} demandes ouvertes\n• {} demandes terminées\n• {} prestataires\n• {} clients",
                    stats.open_tasks, stats.completed_tasks, stats.providers, stats.clients
                )
            }
            BotCommand::Support { message } if message.is_empty() => {
                "Écrivez votre message après la commande, par exemple :\n/support Je n'arrive pas à publier ma demande".to_string()
            }
            BotCommand::Support { message } => {
                let subject = match update.username.as_deref() {
                    Some(username) => format!("Telegram @{username}"),
                    None => "Telegram".to_string(),
                };
                let (ticket, _) = self
                    .support
                    .open_ticket(
                        NewTicket {
                            user_id: None,
                            contact: format!("telegram:{}", update.chat_id),
                            subject,
                            message,
                        },
                        Utc::now(),
                    )
                    .await?;
                format!(
                    "Merci, votre demande a été transmise au support (ticket {}). Nous vous répondons au plus vite.",
                    ticket.id.simple()
                )
            }
            BotCommand::Unknown(_) => HELP_HINT.to_string(),
        };
        Ok(Some(reply))
    }

    /// Answers one update. Command failures are logged and answered with a
    /// generic message; only a failed `sendMessage` is returned as an error.
    pub async fn handle_update(&self, update: &BotUpdate) -> Result<()> {
        let reply = match self.reply_for(update).await {
            Ok(Some(reply)) => reply,
            Ok(None) => return Ok(()),
            Err(e) => {
                error!(update_id = update.update_id, error = %e, "bot command failed");
                FAILURE_REPLY.to_string()
            }
        };
        self.api.send_message(update.chat_id, &reply).await
    }

    /// Answers every update of a batch. Returns the offset for the next
    /// `getUpdates` call.
    async fn handle_batch(&self, offset: Option<i64>, updates: &[BotUpdate]) -> Option<i64> {
        let mut next = offset;
        for update in updates {
            let candidate = update.update_id + 1;
            next = Some(next.map_or(candidate, |n| n.max(candidate)));
            if let Err(e) = self.handle_update(update).await {
                warn!(update_id = update.update_id, error = %e, "failed to answer update");
            }
        }
        next
    }

    /// Fetches and handles one batch. Returns the offset for the next call.
    pub async fn poll_once(&self, offset: Option<i64>, timeout_secs: u64) -> Result<(Option<i64>, usize)> {
        let updates = self.api.get_updates(offset, timeout_secs).await?;
        let next = self.handle_batch(offset, &updates).await;
        Ok((next, updates.len()))
    }

    /// Long-polls until `shutdown` flips to `true`. Shutdown interrupts the
    /// wait for updates, never a batch being answered.
    pub async fn run(&self, settings: PollSettings, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(timeout_secs = settings.timeout_secs, "telegram polling started");
        let mut offset = None;

        while !*shutdown.borrow() {
            let fetched = tokio::select! {
                fetched = self.api.get_updates(offset, settings.timeout_secs) => fetched,
                _ = shutdown.changed() => break,
            };
            let pause = match fetched {
                Ok(updates) => {
                    offset = self.handle_batch(offset, &updates).await;
                    updates.is_empty()
                }
                Err(e) => {
                    error!(error = %e, "getUpdates failed");
                    true
                }
            };
            if pause && !*shutdown.borrow() {
                tokio::select! {
                    _ = tokio::time::sleep(settings.interval) => {}
                    _ = shutdown.changed() => break,
                }
            }
        }

        info!("telegram polling stopped");
        Ok(())
    }
}
