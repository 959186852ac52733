//! Category API endpoints
//!
//! Handles HTTP requests for categories and subscriptions:
//! - GET /api/v1/categories - All categories
//! - GET /api/v1/categories/{id} - Category with its paginated posts
//! - POST /api/v1/categories/{id}/subscribe - Subscribe (idempotent)
//! - POST /api/v1/categories/{id}/unsubscribe - Unsubscribe (idempotent)

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{CategoryResponse, PaginationInfo, PostSummary};
use crate::services::SubscriptionStatus;

#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub categories: Vec<CategoryResponse>,
}

/// Category page
#[derive(Debug, Serialize)]
pub struct CategoryDetailResponse {
    pub category: CategoryResponse,
    pub subscribers: i64,
    /// Whether the caller is subscribed; absent for anonymous callers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribed: Option<bool>,
    pub posts: Vec<PostSummary>,
    pub pagination: PaginationInfo,
}

/// Readable without a session. A presented session adds the caller's
/// subscription state to the category page.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/categories/{id}", get(get_category))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/categories/{id}/subscribe", post(subscribe))
        .route("/categories/{id}/unsubscribe", post(unsubscribe))
}

/// GET /api/v1/categories
async fn list_categories(State(state): State<AppState>) -> Result<Json<CategoryListResponse>, ApiError> {
    let categories = state.category_service.list().await?;
    Ok(Json(CategoryListResponse {
        categories: categories.into_iter().map(CategoryResponse::from).collect(),
    }))
}

/// GET /api/v1/categories/{id}
async fn get_category(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    Path(id): Path<i64>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<CategoryDetailResponse>, ApiError> {
    let params = query.params(state.post_service.page_size());
    let (category, page) = state.post_service.list_by_category(id, &params).await?;

    let subscribed = match &user {
        Some(user) => Some(state.category_service.is_subscribed(&user.0, id).await?),
        None => None,
    };
    let subscribers = state.category_service.subscriber_count(id).await?;

    Ok(Json(CategoryDetailResponse {
        category: category.into(),
        subscribers,
        subscribed,
        pagination: PaginationInfo::of(&page),
        posts: page.items.iter().map(|p| PostSummary::new(p, &state.censor)).collect(),
    }))
}

/// POST /api/v1/categories/{id}/subscribe
async fn subscribe(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<SubscriptionStatus>, ApiError> {
    Ok(Json(state.category_service.subscribe(&user.0, id).await?))
}

/// POST /api/v1/categories/{id}/unsubscribe
async fn unsubscribe(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<SubscriptionStatus>, ApiError> {
    Ok(Json(state.category_service.unsubscribe(&user.0, id).await?))
}
