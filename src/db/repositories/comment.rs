//! Comment repository

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Comment, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{mysql::MySqlRow, sqlite::SqliteRow, Row};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, post_id: i64, user_id: i64, text: &str, created_at: DateTime<Utc>) -> Result<Comment>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Comments of a post, oldest first, with the total count
    async fn list_for_post(&self, post_id: i64, params: &ListParams) -> Result<(Vec<Comment>, i64)>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Add `delta` to the rating in a single statement and re-read it.
    /// Returns `None` if the comment does not exist.
    async fn adjust_rating(&self, id: i64, delta: i64) -> Result<Option<i64>>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_COMMENT: &str = r#"
    SELECT c.id, c.post_id, c.user_id, u.username, c.text, c.rating, c.created_at
    FROM comments c
    INNER JOIN users u ON u.id = c.user_id
"#;

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, post_id: i64, user_id: i64, text: &str, created_at: DateTime<Utc>) -> Result<Comment> {
        let sql = "INSERT INTO comments (post_id, user_id, text, rating, created_at) VALUES (?, ?, ?, 0, ?)";
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(post_id)
                .bind(user_id)
                .bind(text)
                .bind(created_at)
                .execute(pool)
                .await
                .context("Failed to create comment")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(post_id)
                .bind(user_id)
                .bind(text)
                .bind(created_at)
                .execute(pool)
                .await
                .context("Failed to create comment")?
                .last_insert_id() as i64,
        };

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Comment not found after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = format!("{} WHERE c.id = ?", SELECT_COMMENT);
        let comment = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get comment")?
                .as_ref()
                .map(row_to_comment_sqlite),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get comment")?
                .as_ref()
                .map(row_to_comment_mysql),
        };
        Ok(comment)
    }

    async fn list_for_post(&self, post_id: i64, params: &ListParams) -> Result<(Vec<Comment>, i64)> {
        let sql = format!(
            "{} WHERE c.post_id = ? ORDER BY c.created_at ASC, c.id ASC LIMIT ? OFFSET ?",
            SELECT_COMMENT
        );
        let count_sql = "SELECT COUNT(*) FROM comments WHERE post_id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let comments = sqlx::query(&sql)
                    .bind(post_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list comments")?
                    .iter()
                    .map(row_to_comment_sqlite)
                    .collect();
                let total: i64 = sqlx::query_scalar(count_sql)
                    .bind(post_id)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count comments")?;
                Ok((comments, total))
            }
            Backend::Mysql(pool) => {
                let comments = sqlx::query(&sql)
                    .bind(post_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list comments")?
                    .iter()
                    .map(row_to_comment_mysql)
                    .collect();
                let total: i64 = sqlx::query_scalar(count_sql)
                    .bind(post_id)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count comments")?;
                Ok((comments, total))
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM comments WHERE id = ?";
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
        .context("Failed to delete comment")?;
        Ok(affected > 0)
    }

    async fn adjust_rating(&self, id: i64, delta: i64) -> Result<Option<i64>> {
        let update = "UPDATE comments SET rating = rating + ? WHERE id = ?";
        let select = "SELECT rating FROM comments WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let affected = sqlx::query(update)
                    .bind(delta)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to adjust comment rating")?
                    .rows_affected();
                if affected == 0 {
                    return Ok(None);
                }
                sqlx::query_scalar(select)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to read comment rating")
            }
            Backend::Mysql(pool) => {
                let affected = sqlx::query(update)
                    .bind(delta)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to adjust comment rating")?
                    .rows_affected();
                if affected == 0 {
                    return Ok(None);
                }
                sqlx::query_scalar(select)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to read comment rating")
            }
        }
    }
}

fn row_to_comment_sqlite(row: &SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        user_id: row.get("user_id"),
        username: row.get("username"),
        text: row.get("text"),
        rating: row.get("rating"),
        created_at: row.get("created_at"),
    }
}

fn row_to_comment_mysql(row: &MySqlRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        user_id: row.get("user_id"),
        username: row.get("username"),
        text: row.get("text"),
        rating: row.get("rating"),
        created_at: row.get("created_at"),
    }
}
