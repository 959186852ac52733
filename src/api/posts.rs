//! Post API endpoints
//!
//! Handles HTTP requests for news and articles:
//! - GET /api/v1 - Latest posts of every type (cached)
//! - GET /api/v1/news, /api/v1/articles - Paginated listings
//! - GET /api/v1/news/search - Filtered news listing
//! - GET /api/v1/news/{id}, /api/v1/articles/{id} - Post detail
//! - POST /api/v1/news, /api/v1/articles - Publish
//! - PUT/DELETE /api/v1/posts/{id} - Edit or remove own post
//! - POST /api/v1/posts/{id}/like, /dislike - Rate a post

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{PaginatedPostsResponse, PostResponse, PostSummary, RatingResponse};
use crate::models::{CreatePostInput, PostFilter, PostType, UpdatePostInput};
use crate::services::{RatingDelta, RatingTarget};

/// Query parameters for the news search
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    /// `YYYY-MM-DD`, posts created strictly after this day
    pub date_after: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl SearchQuery {
    fn filter(&self) -> PostFilter {
        PostFilter {
            post_type: Some(PostType::News),
            title: self.title.clone(),
            author: self.author.clone(),
            date_after: self.date_after,
        }
    }

    fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub posts: Vec<PostSummary>,
}

/// Routes readable without a session
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/news", get(list_news))
        .route("/news/search", get(search_news))
        .route("/news/{id}", get(get_news))
        .route("/articles", get(list_articles))
        .route("/articles/{id}", get(get_article))
}

/// Routes that need an authenticated user
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/news", post(create_news))
        .route("/articles", post(create_article))
        .route("/posts/{id}", put(update_post).delete(delete_post))
        .route("/posts/{id}/like", post(like_post))
        .route("/posts/{id}/dislike", post(dislike_post))
}

/// GET /api/v1 - Latest posts of every type
async fn home(State(state): State<AppState>) -> Result<Json<HomeResponse>, ApiError> {
    let posts = state.post_service.home().await?;
    Ok(Json(HomeResponse {
        posts: posts.iter().map(|p| PostSummary::new(p, &state.censor)).collect(),
    }))
}

async fn list_of_type(
    state: &AppState,
    post_type: PostType,
    query: &PaginationQuery,
) -> Result<Json<PaginatedPostsResponse>, ApiError> {
    let params = query.params(state.post_service.page_size());
    let page = state.post_service.list(Some(post_type), &params).await?;
    Ok(Json(PaginatedPostsResponse::new(page, &state.censor)))
}

/// GET /api/v1/news - Paginated news, newest first
async fn list_news(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedPostsResponse>, ApiError> {
    list_of_type(&state, PostType::News, &query).await
}

/// GET /api/v1/articles - Paginated articles, newest first
async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedPostsResponse>, ApiError> {
    list_of_type(&state, PostType::Article, &query).await
}

/// GET /api/v1/news/search - News filtered by title, author and date
async fn search_news(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<PaginatedPostsResponse>, ApiError> {
    let params = query.pagination().params(state.post_service.page_size());
    let page = state.post_service.search(&query.filter(), &params).await?;
    Ok(Json(PaginatedPostsResponse::new(page, &state.censor)))
}

/// GET /api/v1/news/{id}
async fn get_news(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<PostResponse>, ApiError> {
    let found = state.post_service.get_of_type(id, PostType::News).await?;
    Ok(Json(PostResponse::new(found, &state.censor)))
}

/// GET /api/v1/articles/{id}
async fn get_article(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<PostResponse>, ApiError> {
    let found = state.post_service.get_of_type(id, PostType::Article).await?;
    Ok(Json(PostResponse::new(found, &state.censor)))
}

async fn publish(
    state: &AppState,
    user: &AuthenticatedUser,
    post_type: PostType,
    input: CreatePostInput,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let created = state.post_service.create(&user.0, post_type, input).await?;
    Ok((StatusCode::CREATED, Json(PostResponse::new(created, &state.censor))))
}

/// POST /api/v1/news - Publish a news item
async fn create_news(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    publish(&state, &user, PostType::News, body).await
}

/// POST /api/v1/articles - Publish an article
async fn create_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    publish(&state, &user, PostType::Article, body).await
}

/// PUT /api/v1/posts/{id} - Edit title, text or categories
async fn update_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostInput>,
) -> Result<Json<PostResponse>, ApiError> {
    let updated = state.post_service.update(&user.0, id, body).await?;
    Ok(Json(PostResponse::new(updated, &state.censor)))
}

/// DELETE /api/v1/posts/{id}
async fn delete_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.post_service.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn rate(state: &AppState, id: i64, delta: RatingDelta) -> Result<Json<RatingResponse>, ApiError> {
    let rating = state.rating_engine.adjust_rating(RatingTarget::Post(id), delta).await?;
    Ok(Json(RatingResponse { id, rating }))
}

/// POST /api/v1/posts/{id}/like
async fn like_post(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<RatingResponse>, ApiError> {
    rate(&state, id, RatingDelta::Like).await
}

/// POST /api/v1/posts/{id}/dislike
async fn dislike_post(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<RatingResponse>, ApiError> {
    rate(&state, id, RatingDelta::Dislike).await
}
