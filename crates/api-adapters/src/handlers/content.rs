use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use domains::errors::DomainError;
use domains::models::{BlogPost, LocalSeoPage, PopularService};
use serde::Deserialize;
use serde_json::{json, Value};
use services::sitemap::INDEX_FILE_NAME;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const MAX_PER_PAGE: i64 = 50;
const MAX_PAGE: i64 = 10_000;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn is_sitemap_part(name: &str) -> bool {
    name.strip_prefix("sitemap-")
        .and_then(|rest| rest.strip_suffix(".xml"))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

async fn sitemap_file(state: &AppState, name: &str) -> ApiResult<impl IntoResponse> {
    let file = state
        .sitemap
        .file(name, Utc::now())
        .await?
        .ok_or_else(|| DomainError::not_found("Sitemap", name))?;
    Ok(([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], file.xml))
}

/// Serves the single sitemap, or the index when the site is split.
pub async fn sitemap(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    sitemap_file(&state, INDEX_FILE_NAME).await
}

/// `sitemap-N.xml` parts referenced by the index. Any other root path is
/// a 404.
pub async fn sitemap_part(State(state): State<AppState>, Path(file): Path<String>) -> ApiResult<impl IntoResponse> {
    if !is_sitemap_part(&file) {
        return Err(DomainError::not_found("Page", file).into());
    }
    sitemap_file(&state, &file).await
}

pub async fn services(State(state): State<AppState>) -> ApiResult<Json<Vec<PopularService>>> {
    Ok(Json(state.catalog.list_services().await?))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn first_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    12
}

pub async fn blog_index(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Vec<BlogPost>>> {
    let per_page = q.per_page.clamp(1, MAX_PER_PAGE);
    let offset = (q.page.clamp(1, MAX_PAGE) - 1) * per_page;
    Ok(Json(state.content.list_published_posts(per_page, offset).await?))
}

pub async fn blog_post(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<Json<BlogPost>> {
    match state.content.get_blog_post(&slug).await? {
        Some(post) if post.is_published => Ok(Json(post)),
        _ => Err(ApiError::from(DomainError::not_found("BlogPost", slug))),
    }
}

pub async fn seo_page(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<Json<LocalSeoPage>> {
    match state.content.get_seo_page(&slug).await? {
        Some(page) if page.is_published => Ok(Json(page)),
        _ => Err(ApiError::from(DomainError::not_found("LocalSeoPage", slug))),
    }
}
