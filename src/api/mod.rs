//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints of the news portal:
//! - Post endpoints (news, articles, search, ratings)
//! - Category and subscription endpoints
//! - Comment endpoints
//! - Author endpoints
//! - User/Auth endpoints
//! - Admin endpoints

pub mod admin;
pub mod auth;
pub mod authors;
pub mod categories;
pub mod comments;
pub mod common;
pub mod middleware;
pub mod posts;
pub mod responses;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Mount point of every API route
pub const API_PREFIX: &str = "/api/v1";

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = admin::router()
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .merge(auth::protected_router())
        .merge(posts::protected_router())
        .merge(categories::protected_router())
        .merge(comments::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes, with the caller attached when a session is presented
    Router::new()
        .merge(posts::public_router())
        .merge(categories::public_router())
        .merge(comments::public_router())
        .merge(authors::public_router())
        .merge(auth::public_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::optional_auth,
        ))
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;

    // Credentials are allowed for cookie-based sessions
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    Ok(Router::new()
        .nest(API_PREFIX, build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{HeaderMap, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::db::repositories::user::tests::setup_test_pool;
    use crate::tasks::{Task, TaskQueue, QUEUE_CAPACITY};

    const PASSWORD: &str = "s3cret-pass";

    struct TestApp {
        app: Router,
        tasks: mpsc::Receiver<Task>,
    }

    async fn setup() -> TestApp {
        let pool = setup_test_pool().await;
        let (queue, tasks) = TaskQueue::new(QUEUE_CAPACITY);
        let state = AppState::new(pool, &Config::default(), queue).unwrap();
        TestApp {
            app: build_router(state, "http://localhost:3000").unwrap(),
            tasks,
        }
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.expect("handler should respond");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, json)
    }

    async fn register(app: &Router, username: &str) -> (String, Value) {
        let (status, _, body) = call(
            app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "username": username, "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        (body["token"].as_str().unwrap().to_string(), body["user"].clone())
    }

    async fn create_category(app: &Router, admin: &str, name: &str) -> i64 {
        let (status, _, body) = call(
            app,
            Method::POST,
            "/api/v1/admin/categories",
            Some(admin),
            Some(json!({ "name": name })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }

    async fn publish(app: &Router, token: &str, title: &str, categories: &[i64]) -> (StatusCode, Value) {
        let (status, _, body) = call(
            app,
            Method::POST,
            "/api/v1/news",
            Some(token),
            Some(json!({ "title": title, "text": "Свежая редиска", "category_ids": categories })),
        )
        .await;
        (status, body)
    }

    #[tokio::test]
    async fn test_register_logs_in_and_first_user_is_admin() {
        let t = setup().await;
        let (status, headers, body) = call(
            &t.app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "username": "admin", "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["role"], "admin");
        let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("session="));
        assert!(cookie.contains("HttpOnly"));

        let token = body["token"].as_str().unwrap();
        let (status, _, me) = call(&t.app, Method::GET, "/api/v1/auth/me", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["user"]["username"], "admin");
        assert_eq!(me["subscriptions"], json!([]));

        let (_, reader) = register(&t.app, "reader").await;
        assert_eq!(reader["role"], "common");
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let t = setup().await;
        register(&t.app, "reader").await;
        let (status, _, body) = call(
            &t.app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "username": "reader", "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_login_and_logout() {
        let t = setup().await;
        register(&t.app, "reader").await;

        let (status, _, body) = call(
            &t.app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "reader", "password": "wrong-pass" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let (status, _, body) = call(
            &t.app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "reader", "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, headers, _) = call(&t.app, Method::POST, "/api/v1/auth/logout", Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));

        let (status, _, _) = call(&t.app, Method::GET, "/api/v1/auth/me", Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_session_cookie_authenticates() {
        let t = setup().await;
        let (token, _) = register(&t.app, "reader").await;
        let request = Request::builder()
            .uri("/api/v1/auth/me")
            .header(header::COOKIE, format!("session={}", token))
            .body(Body::empty())
            .unwrap();
        let response = t.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_routes_require_session() {
        let t = setup().await;
        let (status, _, body) = call(&t.app, Method::GET, "/api/v1/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let (status, _, _) = call(&t.app, Method::POST, "/api/v1/posts/1/like", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, body) = call(&t.app, Method::GET, "/api/v1/auth/me", Some("not-a-session"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "Invalid or expired session");
    }

    #[tokio::test]
    async fn test_publishing_requires_author_and_daily_quota() {
        let t = setup().await;
        let (admin, _) = register(&t.app, "admin").await;
        let category = create_category(&t.app, &admin, "Sport").await;
        let (reader, _) = register(&t.app, "reader").await;

        let (status, body) = publish(&t.app, &reader, "Match report", &[category]).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");

        let (status, _, body) = call(&t.app, Method::POST, "/api/v1/auth/upgrade", Some(reader.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "author");

        for i in 0..3 {
            let (status, body) = publish(&t.app, &reader, &format!("Report {}", i), &[category]).await;
            assert_eq!(status, StatusCode::CREATED, "{}", body);
            assert_eq!(body["post_type"], "NW");
            assert_eq!(body["categories"][0]["name"], "Sport");
        }

        let (status, body) = publish(&t.app, &reader, "Report 4", &[category]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (_, _, listing) = call(&t.app, Method::GET, "/api/v1/news", None, None).await;
        assert_eq!(listing["pagination"]["total"], 3);
    }

    #[tokio::test]
    async fn test_unknown_category_is_rejected() {
        let t = setup().await;
        let (admin, _) = register(&t.app, "admin").await;
        let (status, body) = publish(&t.app, &admin, "Orphan", &[404]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (_, _, listing) = call(&t.app, Method::GET, "/api/v1/news", None, None).await;
        assert_eq!(listing["posts"], json!([]));
    }

    #[tokio::test]
    async fn test_responses_are_censored_and_paginated() {
        let t = setup().await;
        let (admin, _) = register(&t.app, "admin").await;
        let (status, created) = publish(&t.app, &admin, "Редиска дня", &[]).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_i64().unwrap();
        assert_eq!(created["title"], "Р****** дня");

        let (status, _, detail) = call(&t.app, Method::GET, &format!("/api/v1/news/{}", id), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["text"], "Свежая р******");
        assert_eq!(detail["url"], format!("/news/{}", id));

        let (status, _, _) = call(&t.app, Method::GET, &format!("/api/v1/articles/{}", id), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, _, listing) = call(&t.app, Method::GET, "/api/v1/news?page=1", None, None).await;
        assert_eq!(listing["posts"][0]["title"], "Р****** дня");
        assert_eq!(listing["posts"][0]["preview"], "Свежая р******...");
        let pagination = &listing["pagination"];
        assert_eq!(pagination["total_pages"], 1);
        assert_eq!(pagination["pages"], json!([1]));
        assert_eq!(pagination["show_leading_ellipsis"], false);
        assert_eq!(pagination["show_trailing_ellipsis"], false);

        let (status, _, home) = call(&t.app, Method::GET, "/api/v1", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(home["posts"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_news_search_filters_by_title_and_author() {
        let t = setup().await;
        let (admin, _) = register(&t.app, "admin").await;
        publish(&t.app, &admin, "Football final", &[]).await;
        publish(&t.app, &admin, "Tennis open", &[]).await;

        let (status, _, found) = call(&t.app, Method::GET, "/api/v1/news/search?title=FOOT", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["pagination"]["total"], 1);
        assert_eq!(found["posts"][0]["title"], "Football final");

        let (_, _, found) = call(&t.app, Method::GET, "/api/v1/news/search?author=adm", None, None).await;
        assert_eq!(found["pagination"]["total"], 2);

        let (_, _, found) = call(&t.app, Method::GET, "/api/v1/news/search?author=nobody", None, None).await;
        assert_eq!(found["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn test_subscriptions_are_idempotent() {
        let t = setup().await;
        let (admin, _) = register(&t.app, "admin").await;
        let category = create_category(&t.app, &admin, "Science").await;
        let (reader, _) = register(&t.app, "reader").await;
        let uri = format!("/api/v1/categories/{}/subscribe", category);

        for _ in 0..2 {
            let (status, _, body) = call(&t.app, Method::POST, &uri, Some(reader.as_str()), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["subscribed"], true);
            assert_eq!(body["subscribers"], 1);
        }

        let page = format!("/api/v1/categories/{}", category);
        let (_, _, body) = call(&t.app, Method::GET, &page, Some(reader.as_str()), None).await;
        assert_eq!(body["subscribed"], true);
        assert_eq!(body["subscribers"], 1);
        assert_eq!(body["category"]["name"], "Science");

        let (status, _, body) = call(&t.app, Method::GET, &page, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("subscribed").is_none());

        let (_, _, me) = call(&t.app, Method::GET, "/api/v1/auth/me", Some(reader.as_str()), None).await;
        assert_eq!(me["subscriptions"][0]["id"], category);

        let uri = format!("/api/v1/categories/{}/unsubscribe", category);
        for _ in 0..2 {
            let (status, _, body) = call(&t.app, Method::POST, &uri, Some(reader.as_str()), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["subscribed"], false);
            assert_eq!(body["subscribers"], 0);
        }

        let (status, _, _) = call(&t.app, Method::POST, "/api/v1/categories/999/subscribe", Some(reader.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_ratings_and_author_recompute() {
        let t = setup().await;
        let (admin, _) = register(&t.app, "admin").await;
        let (reader, _) = register(&t.app, "reader").await;
        let (_, created) = publish(&t.app, &admin, "Rated", &[]).await;
        let post_id = created["id"].as_i64().unwrap();
        let author_id = created["author"]["id"].as_i64().unwrap();

        let like = format!("/api/v1/posts/{}/like", post_id);
        let (_, _, body) = call(&t.app, Method::POST, &like, Some(reader.as_str()), None).await;
        assert_eq!(body["rating"], 1);
        let (_, _, body) = call(&t.app, Method::POST, &like, Some(reader.as_str()), None).await;
        assert_eq!(body["rating"], 2);
        let dislike = format!("/api/v1/posts/{}/dislike", post_id);
        let (_, _, body) = call(&t.app, Method::POST, &dislike, Some(reader.as_str()), None).await;
        assert_eq!(body["rating"], 1);

        let (status, _, _) = call(&t.app, Method::POST, "/api/v1/posts/999/like", Some(reader.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let comments = format!("/api/v1/posts/{}/comments", post_id);
        let (status, _, comment) = call(
            &t.app,
            Method::POST,
            &comments,
            Some(reader.as_str()),
            Some(json!({ "text": "Какая редиска" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(comment["text"], "Какая р******");
        let comment_id = comment["id"].as_i64().unwrap();

        let (_, _, body) = call(
            &t.app,
            Method::POST,
            &format!("/api/v1/comments/{}/like", comment_id),
            Some(admin.as_str()),
            None,
        )
        .await;
        assert_eq!(body["rating"], 1);

        // 3 * post rating + comments on the author's posts
        let (status, _, author) = call(&t.app, Method::GET, &format!("/api/v1/authors/{}", author_id), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(author["rating"], 4);
        assert_eq!(author["username"], "admin");

        let (_, _, listing) = call(&t.app, Method::GET, &comments, None, None).await;
        assert_eq!(listing["comments"][0]["text"], "Какая р******");
        assert_eq!(listing["pagination"]["total"], 1);
    }

    #[tokio::test]
    async fn test_only_owner_or_admin_edits_posts() {
        let t = setup().await;
        let (admin, _) = register(&t.app, "admin").await;
        let (reader, _) = register(&t.app, "reader").await;
        let (_, created) = publish(&t.app, &admin, "Original", &[]).await;
        let uri = format!("/api/v1/posts/{}", created["id"]);

        let (status, _, _) = call(&t.app, Method::PUT, &uri, Some(reader.as_str()), Some(json!({ "title": "Hijacked" }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, body) = call(&t.app, Method::PUT, &uri, Some(admin.as_str()), Some(json!({ "title": "Edited" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Edited");
        assert_eq!(body["post_type"], "NW");

        let (status, _, _) = call(&t.app, Method::DELETE, &uri, Some(reader.as_str()), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _, _) = call(&t.app, Method::DELETE, &uri, Some(admin.as_str()), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _, _) = call(&t.app, Method::DELETE, &uri, Some(admin.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_routes() {
        let mut t = setup().await;
        let (admin, _) = register(&t.app, "admin").await;
        let (reader, _) = register(&t.app, "reader").await;

        let (status, _, body) = call(&t.app, Method::POST, "/api/v1/admin/digest", Some(reader.as_str()), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");

        let (status, _, body) = call(&t.app, Method::POST, "/api/v1/admin/digest", Some(admin.as_str()), None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["task"], "weekly_digest");
        assert_eq!(t.tasks.try_recv().unwrap(), Task::WeeklyDigest);

        let category = create_category(&t.app, &admin, "Culture").await;
        let (status, _, _) = call(
            &t.app,
            Method::POST,
            "/api/v1/admin/categories",
            Some(admin.as_str()),
            Some(json!({ "name": "Culture" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let uri = format!("/api/v1/admin/categories/{}", category);
        let (status, _, _) = call(&t.app, Method::DELETE, &uri, Some(admin.as_str()), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _, body) = call(&t.app, Method::GET, "/api/v1/admin/jobs", Some(admin.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["jobs"], json!([]));

        let (status, _, _) = call(&t.app, Method::POST, "/api/v1/admin/authors/42/rating", Some(admin.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
