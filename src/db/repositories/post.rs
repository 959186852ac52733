//! Post repository
//!
//! Database operations for news and articles, their category links and the
//! atomic rating counter.
//!
//! This module provides:
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL
//!
//! Creating and editing a post touches `posts` and `post_categories` in one
//! transaction; an unknown category rolls the whole write back.

use super::category::{row_to_category_mysql, row_to_category_sqlite};
use super::user::{row_to_user_mysql, row_to_user_sqlite};
use crate::db::{Backend, DynDatabasePool};
use crate::models::{Category, ListParams, Post, PostType, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{mysql::MySqlRow, sqlite::SqliteRow, MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Half-open window `[day_start, day_end)` and the number of posts an author
/// may create inside it.
#[derive(Debug, Clone, Copy)]
pub struct DailyQuota {
    pub day_start: DateTime<Utc>,
    pub day_end: DateTime<Utc>,
    pub limit: i64,
}

/// A post about to be written
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Acting user; their author profile is created on first use
    pub user_id: i64,
    pub post_type: PostType,
    pub title: String,
    pub text: String,
    pub category_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub quota: DailyQuota,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatePostOutcome {
    Created(i64),
    /// The author already has `count` posts in the quota window
    QuotaExceeded { count: i64 },
    UnknownCategory(i64),
}

/// Editable fields of a post. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub text: Option<String>,
    /// Replaces the whole category set when present
    pub category_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePostOutcome {
    Updated,
    NotFound,
    UnknownCategory(i64),
}

/// Listing criteria. Every field is optional and they combine with AND.
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub post_type: Option<PostType>,
    /// Lowercased substring of the title
    pub title_contains: Option<String>,
    /// Lowercased substring of the author's username
    pub author_contains: Option<String>,
    /// Strict lower bound on `created_at`
    pub created_after: Option<DateTime<Utc>>,
    pub category_id: Option<i64>,
}

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Check the quota, then insert the post and its category links atomically
    async fn create(&self, post: &NewPost) -> Result<CreatePostOutcome>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    async fn update(&self, id: i64, changes: &PostChanges) -> Result<UpdatePostOutcome>;

    /// Delete a post, returns false if it did not exist
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Newest first, with the total number of matches
    async fn list(&self, query: &PostQuery, params: &ListParams) -> Result<(Vec<Post>, i64)>;

    async fn categories_of(&self, post_id: i64) -> Result<Vec<Category>>;

    /// Add `delta` to the rating in a single statement and re-read it.
    /// Returns `None` if the post does not exist.
    async fn adjust_rating(&self, id: i64, delta: i64) -> Result<Option<i64>>;

    /// Posts filed under a category created at or after `since`, newest first
    async fn recent_for_category(&self, category_id: i64, since: DateTime<Utc>) -> Result<Vec<Post>>;

    /// Distinct users subscribed to any category of the post
    async fn subscribers_for_post(&self, post_id: i64) -> Result<Vec<User>>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_POST: &str = r#"
    SELECT p.id, p.author_id, a.user_id AS author_user_id, u.username AS author_username,
           p.post_type, p.title, p.text, p.rating, p.created_at
    FROM posts p
    INNER JOIN authors a ON a.id = p.author_id
    INNER JOIN users u ON u.id = a.user_id
"#;

const FILTER_CLAUSE: &str = r#"
    WHERE (? IS NULL OR p.post_type = ?)
      AND (? IS NULL OR p.title_search LIKE ? ESCAPE '!')
      AND (? IS NULL OR u.username_search LIKE ? ESCAPE '!')
      AND (? IS NULL OR p.created_at > ?)
      AND (? IS NULL OR EXISTS (
            SELECT 1 FROM post_categories pc WHERE pc.post_id = p.id AND pc.category_id = ?))
"#;

const COUNT_POSTS_IN_WINDOW: &str = r#"
    SELECT COUNT(*) FROM posts p
    INNER JOIN authors a ON a.id = p.author_id
    WHERE a.user_id = ? AND p.created_at >= ? AND p.created_at < ?
"#;

const INSERT_POST: &str = "INSERT INTO posts (author_id, post_type, title, title_search, text, rating, created_at) \
                           VALUES (?, ?, ?, ?, ?, 0, ?)";

const UPDATE_POST: &str = "UPDATE posts SET title = COALESCE(?, title), title_search = COALESCE(?, title_search), \
                           text = COALESCE(?, text) WHERE id = ?";

/// `%` and `_` in user input match literally; `!` is the escape character
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '!' | '%' | '_') {
            escaped.push('!');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Binds the `FILTER_CLAUSE` placeholders in order
macro_rules! bind_query_filter {
    ($query:expr, $q:expr) => {{
        let post_type = $q.post_type.map(|t| t.code());
        let title = $q.title_contains.as_deref().map(like_pattern);
        let author = $q.author_contains.as_deref().map(like_pattern);
        $query
            .bind(post_type)
            .bind(post_type)
            .bind(title.clone())
            .bind(title)
            .bind(author.clone())
            .bind(author)
            .bind($q.created_after)
            .bind($q.created_after)
            .bind($q.category_id)
            .bind($q.category_id)
    }};
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &NewPost) -> Result<CreatePostOutcome> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_post_sqlite(pool, post).await,
            Backend::Mysql(pool) => create_post_mysql(pool, post).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("{} WHERE p.id = ?", SELECT_POST);
        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get post by ID")?
                .as_ref()
                .map(row_to_post_sqlite)
                .transpose(),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get post by ID")?
                .as_ref()
                .map(row_to_post_mysql)
                .transpose(),
        }
    }

    async fn update(&self, id: i64, changes: &PostChanges) -> Result<UpdatePostOutcome> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => update_post_sqlite(pool, id, changes).await,
            Backend::Mysql(pool) => update_post_mysql(pool, id, changes).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM posts WHERE id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete post")?;
        Ok(affected > 0)
    }

    async fn list(&self, query: &PostQuery, params: &ListParams) -> Result<(Vec<Post>, i64)> {
        let select = format!(
            "{} {} ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?",
            SELECT_POST, FILTER_CLAUSE
        );
        let count = format!(
            "SELECT COUNT(*) FROM posts p \
             INNER JOIN authors a ON a.id = p.author_id \
             INNER JOIN users u ON u.id = a.user_id {}",
            FILTER_CLAUSE
        );

        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = bind_query_filter!(sqlx::query(&select), query)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list posts")?;
                let total: i64 = bind_query_filter!(sqlx::query_scalar(&count), query)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count posts")?;
                let posts = rows.iter().map(row_to_post_sqlite).collect::<Result<Vec<_>>>()?;
                Ok((posts, total))
            }
            Backend::Mysql(pool) => {
                let rows = bind_query_filter!(sqlx::query(&select), query)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list posts")?;
                let total: i64 = bind_query_filter!(sqlx::query_scalar(&count), query)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count posts")?;
                let posts = rows.iter().map(row_to_post_mysql).collect::<Result<Vec<_>>>()?;
                Ok((posts, total))
            }
        }
    }

    async fn categories_of(&self, post_id: i64) -> Result<Vec<Category>> {
        let sql = r#"
            SELECT c.id, c.name, c.created_at
            FROM categories c
            INNER JOIN post_categories pc ON pc.category_id = c.id
            WHERE pc.post_id = ?
            ORDER BY c.name
        "#;
        let categories = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(post_id)
                .fetch_all(pool)
                .await
                .context("Failed to get post categories")?
                .iter()
                .map(row_to_category_sqlite)
                .collect(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(post_id)
                .fetch_all(pool)
                .await
                .context("Failed to get post categories")?
                .iter()
                .map(row_to_category_mysql)
                .collect(),
        };
        Ok(categories)
    }

    async fn adjust_rating(&self, id: i64, delta: i64) -> Result<Option<i64>> {
        let update = "UPDATE posts SET rating = rating + ? WHERE id = ?";
        let select = "SELECT rating FROM posts WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let affected = sqlx::query(update)
                    .bind(delta)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to adjust post rating")?
                    .rows_affected();
                if affected == 0 {
                    return Ok(None);
                }
                sqlx::query_scalar(select)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to read post rating")
            }
            Backend::Mysql(pool) => {
                let affected = sqlx::query(update)
                    .bind(delta)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to adjust post rating")?
                    .rows_affected();
                if affected == 0 {
                    return Ok(None);
                }
                sqlx::query_scalar(select)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to read post rating")
            }
        }
    }

    async fn recent_for_category(&self, category_id: i64, since: DateTime<Utc>) -> Result<Vec<Post>> {
        let sql = format!(
            "{} INNER JOIN post_categories pc ON pc.post_id = p.id \
             WHERE pc.category_id = ? AND p.created_at >= ? \
             ORDER BY p.created_at DESC, p.id DESC",
            SELECT_POST
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(category_id)
                .bind(since)
                .fetch_all(pool)
                .await
                .context("Failed to list recent posts")?
                .iter()
                .map(row_to_post_sqlite)
                .collect(),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(category_id)
                .bind(since)
                .fetch_all(pool)
                .await
                .context("Failed to list recent posts")?
                .iter()
                .map(row_to_post_mysql)
                .collect(),
        }
    }

    async fn subscribers_for_post(&self, post_id: i64) -> Result<Vec<User>> {
        let sql = r#"
            SELECT DISTINCT u.id, u.username, u.email, u.first_name, u.last_name,
                   u.password_hash, u.role, u.created_at
            FROM users u
            INNER JOIN category_subscribers cs ON cs.user_id = u.id
            INNER JOIN post_categories pc ON pc.category_id = cs.category_id
            WHERE pc.post_id = ?
            ORDER BY u.id
        "#;
        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(post_id)
                .fetch_all(pool)
                .await
                .context("Failed to resolve post subscribers")?
                .iter()
                .map(row_to_user_sqlite)
                .collect(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(post_id)
                .fetch_all(pool)
                .await
                .context("Failed to resolve post subscribers")?
                .iter()
                .map(row_to_user_mysql)
                .collect(),
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, post: &NewPost) -> Result<CreatePostOutcome> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let count: i64 = sqlx::query_scalar(COUNT_POSTS_IN_WINDOW)
        .bind(post.user_id)
        .bind(post.quota.day_start)
        .bind(post.quota.day_end)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to count today's posts")?;
    if count >= post.quota.limit {
        tx.rollback().await?;
        return Ok(CreatePostOutcome::QuotaExceeded { count });
    }

    sqlx::query("INSERT OR IGNORE INTO authors (user_id, rating) VALUES (?, 0)")
        .bind(post.user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to create author")?;
    let author_id: i64 = sqlx::query_scalar("SELECT id FROM authors WHERE user_id = ?")
        .bind(post.user_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to load author")?;

    let post_id = sqlx::query(INSERT_POST)
        .bind(author_id)
        .bind(post.post_type.code())
        .bind(&post.title)
        .bind(post.title.to_lowercase())
        .bind(&post.text)
        .bind(post.created_at)
        .execute(&mut *tx)
        .await
        .context("Failed to create post")?
        .last_insert_rowid();

    for &category_id in &post.category_ids {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE id = ?")
            .bind(category_id)
            .fetch_one(&mut *tx)
            .await?;
        if exists == 0 {
            tx.rollback().await?;
            return Ok(CreatePostOutcome::UnknownCategory(category_id));
        }
        sqlx::query("INSERT OR IGNORE INTO post_categories (post_id, category_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(category_id)
            .execute(&mut *tx)
            .await
            .context("Failed to link post category")?;
    }

    tx.commit().await.context("Failed to commit post")?;
    Ok(CreatePostOutcome::Created(post_id))
}

async fn update_post_sqlite(pool: &SqlitePool, id: i64, changes: &PostChanges) -> Result<UpdatePostOutcome> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    if exists == 0 {
        tx.rollback().await?;
        return Ok(UpdatePostOutcome::NotFound);
    }

    sqlx::query(UPDATE_POST)
        .bind(&changes.title)
        .bind(changes.title.as_deref().map(str::to_lowercase))
        .bind(&changes.text)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to update post")?;

    if let Some(category_ids) = &changes.category_ids {
        sqlx::query("DELETE FROM post_categories WHERE post_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for &category_id in category_ids {
            let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE id = ?")
                .bind(category_id)
                .fetch_one(&mut *tx)
                .await?;
            if exists == 0 {
                tx.rollback().await?;
                return Ok(UpdatePostOutcome::UnknownCategory(category_id));
            }
            sqlx::query("INSERT OR IGNORE INTO post_categories (post_id, category_id) VALUES (?, ?)")
                .bind(id)
                .bind(category_id)
                .execute(&mut *tx)
                .await
                .context("Failed to link post category")?;
        }
    }

    tx.commit().await.context("Failed to commit post update")?;
    Ok(UpdatePostOutcome::Updated)
}

fn row_to_post_sqlite(row: &SqliteRow) -> Result<Post> {
    let post_type: String = row.get("post_type");
    Ok(Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        author_user_id: row.get("author_user_id"),
        author_username: row.get("author_username"),
        post_type: post_type.parse().map_err(anyhow::Error::msg)?,
        title: row.get("title"),
        text: row.get("text"),
        rating: row.get("rating"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, post: &NewPost) -> Result<CreatePostOutcome> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    // Lock the user's row so concurrent submissions see each other's count.
    sqlx::query("SELECT id FROM users WHERE id = ? FOR UPDATE")
        .bind(post.user_id)
        .fetch_optional(&mut *tx)
        .await?;

    let count: i64 = sqlx::query_scalar(COUNT_POSTS_IN_WINDOW)
        .bind(post.user_id)
        .bind(post.quota.day_start)
        .bind(post.quota.day_end)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to count today's posts")?;
    if count >= post.quota.limit {
        tx.rollback().await?;
        return Ok(CreatePostOutcome::QuotaExceeded { count });
    }

    sqlx::query("INSERT IGNORE INTO authors (user_id, rating) VALUES (?, 0)")
        .bind(post.user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to create author")?;
    let author_id: i64 = sqlx::query_scalar("SELECT id FROM authors WHERE user_id = ?")
        .bind(post.user_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to load author")?;

    let post_id = sqlx::query(INSERT_POST)
        .bind(author_id)
        .bind(post.post_type.code())
        .bind(&post.title)
        .bind(post.title.to_lowercase())
        .bind(&post.text)
        .bind(post.created_at)
        .execute(&mut *tx)
        .await
        .context("Failed to create post")?
        .last_insert_id() as i64;

    for &category_id in &post.category_ids {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE id = ?")
            .bind(category_id)
            .fetch_one(&mut *tx)
            .await?;
        if exists == 0 {
            tx.rollback().await?;
            return Ok(CreatePostOutcome::UnknownCategory(category_id));
        }
        sqlx::query("INSERT IGNORE INTO post_categories (post_id, category_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(category_id)
            .execute(&mut *tx)
            .await
            .context("Failed to link post category")?;
    }

    tx.commit().await.context("Failed to commit post")?;
    Ok(CreatePostOutcome::Created(post_id))
}

async fn update_post_mysql(pool: &MySqlPool, id: i64, changes: &PostChanges) -> Result<UpdatePostOutcome> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    if exists == 0 {
        tx.rollback().await?;
        return Ok(UpdatePostOutcome::NotFound);
    }

    sqlx::query(UPDATE_POST)
        .bind(&changes.title)
        .bind(changes.title.as_deref().map(str::to_lowercase))
        .bind(&changes.text)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to update post")?;

    if let Some(category_ids) = &changes.category_ids {
        sqlx::query("DELETE FROM post_categories WHERE post_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for &category_id in category_ids {
            let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE id = ?")
                .bind(category_id)
                .fetch_one(&mut *tx)
                .await?;
            if exists == 0 {
                tx.rollback().await?;
                return Ok(UpdatePostOutcome::UnknownCategory(category_id));
            }
            sqlx::query("INSERT IGNORE INTO post_categories (post_id, category_id) VALUES (?, ?)")
                .bind(id)
                .bind(category_id)
                .execute(&mut *tx)
                .await
                .context("Failed to link post category")?;
        }
    }

    tx.commit().await.context("Failed to commit post update")?;
    Ok(UpdatePostOutcome::Updated)
}

fn row_to_post_mysql(row: &MySqlRow) -> Result<Post> {
    let post_type: String = row.get("post_type");
    Ok(Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        author_user_id: row.get("author_user_id"),
        author_username: row.get("author_username"),
        post_type: post_type.parse().map_err(anyhow::Error::msg)?,
        title: row.get("title"),
        text: row.get("text"),
        rating: row.get("rating"),
        created_at: row.get("created_at"),
    })
}
