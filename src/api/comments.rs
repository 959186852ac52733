//! Comment API endpoints
//!
//! - GET /api/v1/posts/{id}/comments - Comments on a post, oldest first
//! - POST /api/v1/posts/{id}/comments - Add a comment
//! - DELETE /api/v1/comments/{id} - Remove own comment
//! - POST /api/v1/comments/{id}/like, /dislike - Rate a comment

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{CommentResponse, PaginatedCommentsResponse, RatingResponse};
use crate::models::CreateCommentInput;
use crate::services::{RatingDelta, RatingTarget};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/posts/{id}/comments", get(list_comments))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}/comments", post(create_comment))
        .route("/comments/{id}", delete(delete_comment))
        .route("/comments/{id}/like", post(like_comment))
        .route("/comments/{id}/dislike", post(dislike_comment))
}

async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedCommentsResponse>, ApiError> {
    let params = query.params(state.post_service.page_size());
    let page = state.comment_service.list_for_post(post_id, &params).await?;
    Ok(Json(PaginatedCommentsResponse::new(page, &state.censor)))
}

async fn create_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(post_id): Path<i64>,
    Json(body): Json<CreateCommentInput>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    let comment = state.comment_service.create(&user.0, post_id, body).await?;
    Ok((StatusCode::CREATED, Json(CommentResponse::new(comment, &state.censor))))
}

async fn delete_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.comment_service.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn rate(state: &AppState, id: i64, delta: RatingDelta) -> Result<Json<RatingResponse>, ApiError> {
    let rating = state.rating_engine.adjust_rating(RatingTarget::Comment(id), delta).await?;
    Ok(Json(RatingResponse { id, rating }))
}

async fn like_comment(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<RatingResponse>, ApiError> {
    rate(&state, id, RatingDelta::Like).await
}

async fn dislike_comment(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<RatingResponse>, ApiError> {
    rate(&state, id, RatingDelta::Dislike).await
}
