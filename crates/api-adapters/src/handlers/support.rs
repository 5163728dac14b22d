//! Support chat endpoints. The widget polls `GET .../messages?after=N`
//! every few seconds with the highest id it holds.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use domains::models::{MessageSender, SupportMessage, SupportTicket};
use serde::{Deserialize, Serialize};
use services::support::NewTicket;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct OpenedTicket {
    pub ticket: SupportTicket,
    pub message: SupportMessage,
}

pub async fn open_ticket(
    State(state): State<AppState>,
    Json(new): Json<NewTicket>,
) -> ApiResult<(StatusCode, Json<OpenedTicket>)> {
    let (ticket, message) = state.support.open_ticket(new, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(OpenedTicket { ticket, message })))
}

#[derive(Debug, Deserialize)]
pub struct AfterQuery {
    #[serde(default)]
    pub after: i64,
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(q): Query<AfterQuery>,
) -> ApiResult<Json<Vec<SupportMessage>>> {
    Ok(Json(state.support.messages_after(id, q.after).await?))
}

#[derive(Debug, Deserialize)]
pub struct PostMessage {
    pub body: String,
    #[serde(default = "default_sender")]
    pub sender: MessageSender,
}

fn default_sender() -> MessageSender {
    MessageSender::User
}

pub async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<PostMessage>,
) -> ApiResult<(StatusCode, Json<SupportMessage>)> {
    if req.sender == MessageSender::Bot {
        return Err(ApiError::BadRequest("bot messages cannot be posted over HTTP".into()));
    }
    let message = state
        .support
        .post_message(id, req.sender, &req.body, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn close_ticket(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<SupportTicket>> {
    Ok(Json(state.support.close_ticket(id, Utc::now()).await?))
}
