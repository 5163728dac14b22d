use axum::extract::{Query, State};
use axum::Json;
use domains::models::Task;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TasksQuery {
    pub city: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

/// Latest open tasks, optionally for one city.
pub async fn open_tasks(State(state): State<AppState>, Query(q): Query<TasksQuery>) -> ApiResult<Json<Vec<Task>>> {
    let city = q.city.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
    Ok(Json(state.marketplace.open_tasks(city, q.limit).await?))
}
