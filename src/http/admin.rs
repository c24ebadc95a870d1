//! Administrative cache endpoints.
//!
//! Not meant for public exposure; hosts mount this router on their admin
//! listener. Every operation delegates to the [`CacheManager`].

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;

use crate::cache::{CacheManager, CacheStats};

#[derive(Clone)]
pub struct AdminState {
    pub manager: CacheManager,
}

/// Router exposing cache stats, tag invalidation, and full clear.
pub fn admin_router(manager: CacheManager) -> Router {
    Router::new()
        .route("/cache/stats", get(cache_stats))
        .route("/cache/invalidate/{tag}", post(invalidate_tag))
        .route("/cache/clear", post(clear_cache))
        .with_state(AdminState { manager })
}

#[derive(Debug, Serialize)]
struct InvalidateResponse {
    tag: String,
    removed: usize,
}

async fn cache_stats(State(state): State<AdminState>) -> Json<CacheStats> {
    Json(state.manager.stats())
}

async fn invalidate_tag(
    State(state): State<AdminState>,
    Path(tag): Path<String>,
) -> Json<InvalidateResponse> {
    let removed = state.manager.invalidate_tag(&tag);
    Json(InvalidateResponse { tag, removed })
}

async fn clear_cache(State(state): State<AdminState>) -> Response {
    state.manager.clear();
    StatusCode::NO_CONTENT.into_response()
}
