//! Author repository
//!
//! Author profiles and the aggregates their rating is derived from.

use crate::db::{Backend, DynDatabasePool};
use crate::models::Author;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// The three sums an author's rating is computed from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingParts {
    /// Sum of ratings of the author's posts
    pub posts: i64,
    /// Sum of ratings of comments written by the author's user
    pub own_comments: i64,
    /// Sum of ratings of comments left on the author's posts
    pub comments_on_posts: i64,
}

/// Author repository trait
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<Author>>;

    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Author>>;

    /// Aggregate the rating sums for an author; empty sums are zero
    async fn rating_parts(&self, author_id: i64) -> Result<RatingParts>;

    /// Store a recomputed rating, returns false if the author does not exist
    async fn set_rating(&self, author_id: i64, rating: i64) -> Result<bool>;
}

/// SQLx-based author repository implementation
pub struct SqlxAuthorRepository {
    pool: DynDatabasePool,
}

impl SqlxAuthorRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AuthorRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_one_by(&self, column: &str, value: i64) -> Result<Option<Author>> {
        let sql = format!(
            "SELECT a.id, a.user_id, a.rating, u.username FROM authors a \
             INNER JOIN users u ON u.id = a.user_id WHERE a.{} = ?",
            column
        );
        let author = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(value)
                .fetch_optional(pool)
                .await
                .context("Failed to get author")?
                .map(|row| Author {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    username: row.get("username"),
                    rating: row.get("rating"),
                }),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(value)
                .fetch_optional(pool)
                .await
                .context("Failed to get author")?
                .map(|row| Author {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    username: row.get("username"),
                    rating: row.get("rating"),
                }),
        };
        Ok(author)
    }
}

#[async_trait]
impl AuthorRepository for SqlxAuthorRepository {
    async fn get_by_id(&self, id: i64) -> Result<Option<Author>> {
        self.fetch_one_by("id", id).await
    }

    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Author>> {
        self.fetch_one_by("user_id", user_id).await
    }

    async fn rating_parts(&self, author_id: i64) -> Result<RatingParts> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(
                    r#"
                    SELECT
                        (SELECT COALESCE(SUM(p.rating), 0) FROM posts p WHERE p.author_id = a.id) AS posts,
                        (SELECT COALESCE(SUM(c.rating), 0) FROM comments c WHERE c.user_id = a.user_id) AS own_comments,
                        (SELECT COALESCE(SUM(c.rating), 0) FROM comments c
                            INNER JOIN posts p ON p.id = c.post_id
                            WHERE p.author_id = a.id) AS comments_on_posts
                    FROM authors a
                    WHERE a.id = ?
                    "#,
                )
                .bind(author_id)
                .fetch_optional(pool)
                .await
                .context("Failed to aggregate author rating")?;

                Ok(row
                    .map(|row| RatingParts {
                        posts: row.get("posts"),
                        own_comments: row.get("own_comments"),
                        comments_on_posts: row.get("comments_on_posts"),
                    })
                    .unwrap_or_default())
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(
                    r#"
                    SELECT
                        CAST((SELECT COALESCE(SUM(p.rating), 0) FROM posts p WHERE p.author_id = a.id) AS SIGNED) AS posts,
                        CAST((SELECT COALESCE(SUM(c.rating), 0) FROM comments c WHERE c.user_id = a.user_id) AS SIGNED) AS own_comments,
                        CAST((SELECT COALESCE(SUM(c.rating), 0) FROM comments c
                            INNER JOIN posts p ON p.id = c.post_id
                            WHERE p.author_id = a.id) AS SIGNED) AS comments_on_posts
                    FROM authors a
                    WHERE a.id = ?
                    "#,
                )
                .bind(author_id)
                .fetch_optional(pool)
                .await
                .context("Failed to aggregate author rating")?;

                Ok(row
                    .map(|row| RatingParts {
                        posts: row.get("posts"),
                        own_comments: row.get("own_comments"),
                        comments_on_posts: row.get("comments_on_posts"),
                    })
                    .unwrap_or_default())
            }
        }
    }

    async fn set_rating(&self, author_id: i64, rating: i64) -> Result<bool> {
        let sql = "UPDATE authors SET rating = ? WHERE id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(rating)
                .bind(author_id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(rating)
                .bind(author_id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to update author rating")?;
        Ok(affected > 0)
    }
}
