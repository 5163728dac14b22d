use askama::Template;
use domains::errors::{DomainError, Result};
use domains::models::{EmailAutomationLog, EmailKind, OutgoingEmail, User};
use serde_json::Value;

use super::unsubscribe::UnsubscribeSigner;

pub struct DigestItem {
    pub title: String,
    pub meta: String,
    pub url: String,
}

pub struct Cta {
    pub label: String,
    pub url: String,
}

#[derive(Template)]
#[template(path = "email/layout.html")]
struct HtmlEmail<'a> {
    heading: &'a str,
    first_name: &'a str,
    paragraphs: &'a [String],
    items: &'a [DigestItem],
    cta: &'a Option<Cta>,
    unsubscribe_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/layout.txt")]
struct TextEmail<'a> {
    heading: &'a str,
    first_name: &'a str,
    paragraphs: &'a [String],
    items: &'a [DigestItem],
    cta: &'a Option<Cta>,
    unsubscribe_url: &'a str,
}

struct Body {
    heading: String,
    paragraphs: Vec<String>,
    items: Vec<DigestItem>,
    cta: Option<Cta>,
}

fn text<'a>(payload: &'a Value, key: &str) -> &'a str {
    payload.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn number(payload: &Value, key: &str) -> i64 {
    payload.get(key).and_then(Value::as_i64).unwrap_or_default()
}

/// Turns a queued log entry into a ready-to-send message.
#[derive(Clone)]
pub struct EmailRenderer {
    base_url: String,
    signer: UnsubscribeSigner,
}

impl EmailRenderer {
    pub fn new(base_url: impl Into<String>, signer: UnsubscribeSigner) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            signer,
        }
    }

    pub fn signer(&self) -> &UnsubscribeSigner {
        &self.signer
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn render(&self, log: &EmailAutomationLog, user: &User) -> Result<OutgoingEmail> {
        let body = self.body(log);
        let token = self.signer.sign(user.id)?;
        let unsubscribe_url = self.url(&format!("/api/unsubscribe?token={token}"));

        let html = HtmlEmail {
            heading: &body.heading,
            first_name: user.first_name(),
            paragraphs: &body.paragraphs,
            items: &body.items,
            cta: &body.cta,
            unsubscribe_url: &unsubscribe_url,
        }
        .render()
        .map_err(|e| DomainError::Internal(format!("email template: {e}")))?;
        let plain = TextEmail {
            heading: &body.heading,
            first_name: user.first_name(),
            paragraphs: &body.paragraphs,
            items: &body.items,
            cta: &body.cta,
            unsubscribe_url: &unsubscribe_url,
        }
        .render()
        .map_err(|e| DomainError::Internal(format!("email template: {e}")))?;

        Ok(OutgoingEmail {
            to: user.email.clone(),
            to_name: user.name.clone(),
            subject: log.subject.clone(),
            html,
            text: plain,
        })
    }

    fn body(&self, log: &EmailAutomationLog) -> Body {
        let p = &log.payload;
        let task_cta = |label: &str| {
            Some(Cta {
                label: label.to_string(),
                url: self.url(text(p, "task_path")),
            })
        };

        match log.kind {
            EmailKind::Welcome => Body {
                heading: "Bienvenue sur ProchePro".into(),
                paragraphs: vec![
                    "Votre compte est prêt. Publiez une demande en quelques minutes et recevez des offres de prestataires près de chez vous.".into(),
                ],
                items: Vec::new(),
                cta: Some(Cta {
                    label: "Publier ma première demande".into(),
                    url: self.url("/tasks/new"),
                }),
            },
            EmailKind::WeeklyDigest => Body {
                heading: format!("Les nouvelles demandes à {}", text(p, "city")),
                paragraphs: vec!["Voici les demandes publiées cette semaine près de chez vous.".into()],
                items: p
                    .get("tasks")
                    .and_then(Value::as_array)
                    .map(|tasks| {
                        tasks
                            .iter()
                            .map(|t| DigestItem {
                                title: text(t, "title").to_string(),
                                meta: match t.get("budget").and_then(Value::as_i64) {
                                    Some(budget) => format!("{}, {budget} €", text(t, "city")),
                                    None => text(t, "city").to_string(),
                                },
                                url: self.url(text(t, "path")),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
                cta: Some(Cta {
                    label: "Voir toutes les demandes".into(),
                    url: self.url("/tasks"),
                }),
            },
            EmailKind::TaskNoOffers => Body {
                heading: "Votre demande attend encore des offres".into(),
                paragraphs: vec![format!(
                    "Votre demande « {} » n'a pas encore reçu d'offre. Ajoutez des détails ou des photos pour la rendre plus visible.",
                    text(p, "task_title")
                )],
                items: Vec::new(),
                cta: task_cta("Compléter ma demande"),
            },
            EmailKind::OffersPending => Body {
                heading: "Des offres vous attendent".into(),
                paragraphs: vec![format!(
                    "Vous avez {} offre(s) en attente sur « {} ». Choisissez votre prestataire avant qu'il ne soit plus disponible.",
                    number(p, "offer_count"),
                    text(p, "task_title")
                )],
                items: Vec::new(),
                cta: task_cta("Comparer les offres"),
            },
            EmailKind::ReviewRequest => Body {
                heading: "Comment s'est passée votre prestation ?".into(),
                paragraphs: vec![format!(
                    "« {} » est terminée. Votre avis aide les autres clients à choisir.",
                    text(p, "task_title")
                )],
                items: Vec::new(),
                cta: task_cta("Laisser un avis"),
            },
            EmailKind::BookingReminder => Body {
                heading: "Rappel de votre rendez-vous".into(),
                paragraphs: vec![format!(
                    "Votre rendez-vous pour « {} » est prévu le {}.",
                    text(p, "task_title"),
                    text(p, "starts_at")
                )],
                items: Vec::new(),
                cta: task_cta("Voir le rendez-vous"),
            },
            EmailKind::ReEngagement => Body {
                heading: "Vous nous avez manqué".into(),
                paragraphs: vec![format!(
                    "{} demandes sont ouvertes en ce moment sur ProchePro.",
                    number(p, "open_tasks")
                )],
                items: Vec::new(),
                cta: Some(Cta {
                    label: "Revenir sur ProchePro".into(),
                    url: self.url("/"),
                }),
            },
        }
    }
}
