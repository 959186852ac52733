//! Author API endpoints
//!
//! - GET /api/v1/authors/{id} - Author profile with a freshly computed rating

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::AuthorResponse;

pub fn public_router() -> Router<AppState> {
    Router::new().route("/authors/{id}", get(get_author))
}

/// Recompute the author's rating and return the profile
pub(crate) async fn refreshed_author(state: &AppState, id: i64) -> Result<AuthorResponse, ApiError> {
    state.rating_engine.recompute_author_rating(id).await?;
    let author = state
        .author_repo
        .get_by_id(id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found(format!("Author not found: {}", id)))?;
    Ok(author.into())
}

/// GET /api/v1/authors/{id}
async fn get_author(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<AuthorResponse>, ApiError> {
    Ok(Json(refreshed_author(&state, id).await?))
}
