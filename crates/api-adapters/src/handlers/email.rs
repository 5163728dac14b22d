use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use services::email;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UnsubscribeQuery {
    pub token: String,
}

/// Target of the link at the bottom of every automated email.
pub async fn unsubscribe(State(state): State<AppState>, Query(q): Query<UnsubscribeQuery>) -> ApiResult<Json<Value>> {
    let user_id = email::unsubscribe(state.users.as_ref(), &state.signer, &q.token).await?;
    Ok(Json(json!({ "unsubscribed": true, "user_id": user_id })))
}
