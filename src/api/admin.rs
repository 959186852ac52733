//! Admin API endpoints
//!
//! Handles HTTP requests for admin management:
//! - POST /api/v1/admin/categories - Create a category
//! - DELETE /api/v1/admin/categories/{id} - Delete a category
//! - POST /api/v1/admin/digest - Queue a weekly digest run now
//! - POST /api/v1/admin/authors/{id}/rating - Recompute an author rating
//! - GET /api/v1/admin/jobs - Recent scheduled job runs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::authors::refreshed_author;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{AuthorResponse, CategoryResponse};
use crate::models::{CreateCategoryInput, JobRun};
use crate::tasks::Task;

const DEFAULT_JOB_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct JobsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub task: &'static str,
    pub queued: bool,
}

#[derive(Debug, Serialize)]
pub struct JobRunsResponse {
    pub jobs: Vec<JobRun>,
}

/// Admin routes; the caller layers `require_admin` and `require_auth`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/categories", post(create_category))
        .route("/admin/categories/{id}", delete(delete_category))
        .route("/admin/digest", post(run_digest))
        .route("/admin/authors/{id}/rating", post(recompute_rating))
        .route("/admin/jobs", get(list_jobs))
}

/// POST /api/v1/admin/categories
async fn create_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateCategoryInput>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let category = state.category_service.create(&user.0, body).await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

/// DELETE /api/v1/admin/categories/{id}
async fn delete_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.category_service.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/digest
///
/// The digest itself runs on the task worker; an overlapping run is skipped
/// there and shows up in the job log.
async fn run_digest(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<(StatusCode, Json<QueuedResponse>), ApiError> {
    let task = Task::WeeklyDigest;
    state.queue.enqueue(task)?;
    tracing::info!(user = %user.0.username, "Weekly digest queued manually");
    Ok((
        StatusCode::ACCEPTED,
        Json(QueuedResponse {
            task: task.name(),
            queued: true,
        }),
    ))
}

/// POST /api/v1/admin/authors/{id}/rating
async fn recompute_rating(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<AuthorResponse>, ApiError> {
    Ok(Json(refreshed_author(&state, id).await?))
}

/// GET /api/v1/admin/jobs
async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<JobRunsResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_JOB_LIMIT).clamp(1, 100);
    let jobs = state
        .job_runs
        .recent(limit)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    Ok(Json(JobRunsResponse { jobs }))
}
