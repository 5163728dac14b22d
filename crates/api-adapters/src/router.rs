use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{content, email, marketplace, support, telegram};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(content::health))
        .route("/sitemap.xml", get(content::sitemap))
        .route("/{file}", get(content::sitemap_part))
        .route("/api/services", get(content::services))
        .route("/api/blog", get(content::blog_index))
        .route("/api/blog/{slug}", get(content::blog_post))
        .route("/api/seo/{slug}", get(content::seo_page))
        .route("/api/tasks", get(marketplace::open_tasks))
        .route("/api/support/tickets", post(support::open_ticket))
        .route(
            "/api/support/tickets/{id}/messages",
            get(support::list_messages).post(support::post_message),
        )
        .route("/api/support/tickets/{id}/close", post(support::close_ticket))
        .route("/api/unsubscribe", get(email::unsubscribe))
        .route("/api/telegram/webhook", post(telegram::webhook))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
