pub mod auth;
pub mod orders;
pub mod riders;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/orders", orders::router())
        .nest("/api/riders", riders::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// List envelope shared by every paged endpoint: 1-based pages, default
/// limit 10.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: u64,
    pub current_page: u64,
    pub total: u64,
}

pub fn paginate<T>(mut items: Vec<T>, page: u64, limit: u64) -> Page<T> {
    let total = items.len() as u64;
    let limit = limit.max(1);
    let page = page.max(1);
    let total_pages = total.div_ceil(limit);

    // Caller-controlled page numbers can overflow the offset; saturate so an
    // absurd page reads as past-the-end.
    let start = (page - 1).saturating_mul(limit) as usize;
    let items = if start >= items.len() {
        Vec::new()
    } else {
        let end = (start + limit as usize).min(items.len());
        items.drain(start..end).collect()
    };

    Page {
        items,
        total_pages,
        current_page: page,
        total,
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    users: usize,
    riders: usize,
    orders: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        users: state.store.users.len(),
        riders: state.store.riders.len(),
        orders: state.store.orders.len(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
