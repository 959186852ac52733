//! Category repository
//!
//! Database operations for categories and their subscribers.
//!
//! This module provides:
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite and MySQL

use super::user::{row_to_user_mysql, row_to_user_sqlite};
use crate::db::{Backend, DynDatabasePool};
use crate::models::{Category, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{mysql::MySqlRow, sqlite::SqliteRow, Row};
use std::sync::Arc;

/// Returned by `create` when another category already has the name
#[derive(Debug, thiserror::Error)]
#[error("category name already exists: {0}")]
pub struct DuplicateCategoryName(pub String);

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Fails with [`DuplicateCategoryName`] if the name is taken
    async fn create(&self, name: &str, created_at: DateTime<Utc>) -> Result<Category>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// All categories ordered by name
    async fn list(&self) -> Result<Vec<Category>>;

    /// Delete a category, returns false if it did not exist
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Add a subscription, returns false if it already existed
    async fn subscribe(&self, user_id: i64, category_id: i64) -> Result<bool>;

    /// Remove a subscription, returns false if there was none
    async fn unsubscribe(&self, user_id: i64, category_id: i64) -> Result<bool>;

    async fn is_subscribed(&self, user_id: i64, category_id: i64) -> Result<bool>;

    async fn subscriber_count(&self, category_id: i64) -> Result<i64>;

    /// Users subscribed to a category
    async fn subscribers(&self, category_id: i64) -> Result<Vec<User>>;

    /// Categories a user is subscribed to
    async fn subscriptions_of(&self, user_id: i64) -> Result<Vec<Category>>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_CATEGORY: &str = "SELECT id, name, created_at FROM categories";

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, name: &str, created_at: DateTime<Utc>) -> Result<Category> {
        let sql = "INSERT INTO categories (name, created_at) VALUES (?, ?)";
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(name)
                .bind(created_at)
                .execute(pool)
                .await
                .map_err(|e| create_error(e, name))?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(name)
                .bind(created_at)
                .execute(pool)
                .await
                .map_err(|e| create_error(e, name))?
                .last_insert_id() as i64,
        };
        Ok(Category {
            id,
            name: name.to_string(),
            created_at,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let sql = format!("{} WHERE id = ?", SELECT_CATEGORY);
        let category = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get category by ID")?
                .as_ref()
                .map(row_to_category_sqlite),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
                .context("Failed to get category by ID")?
                .as_ref()
                .map(row_to_category_mysql),
        };
        Ok(category)
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let sql = format!("{} ORDER BY name", SELECT_CATEGORY);
        let categories = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .fetch_all(pool)
                .await
                .context("Failed to list categories")?
                .iter()
                .map(row_to_category_sqlite)
                .collect(),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .fetch_all(pool)
                .await
                .context("Failed to list categories")?
                .iter()
                .map(row_to_category_mysql)
                .collect(),
        };
        Ok(categories)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM categories WHERE id = ?";
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
        .context("Failed to delete category")?;
        Ok(affected > 0)
    }

    async fn subscribe(&self, user_id: i64, category_id: i64) -> Result<bool> {
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(
                "INSERT OR IGNORE INTO category_subscribers (user_id, category_id) VALUES (?, ?)",
            )
            .bind(user_id)
            .bind(category_id)
            .execute(pool)
            .await
            .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(
                "INSERT IGNORE INTO category_subscribers (user_id, category_id) VALUES (?, ?)",
            )
            .bind(user_id)
            .bind(category_id)
            .execute(pool)
            .await
            .map(|r| r.rows_affected()),
        }
        .context("Failed to subscribe")?;
        Ok(affected > 0)
    }

    async fn unsubscribe(&self, user_id: i64, category_id: i64) -> Result<bool> {
        let sql = "DELETE FROM category_subscribers WHERE user_id = ? AND category_id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(user_id)
                .bind(category_id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(user_id)
                .bind(category_id)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to unsubscribe")?;
        Ok(affected > 0)
    }

    async fn is_subscribed(&self, user_id: i64, category_id: i64) -> Result<bool> {
        let sql = "SELECT COUNT(*) FROM category_subscribers WHERE user_id = ? AND category_id = ?";
        let count: i64 = match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query_scalar(sql)
                    .bind(user_id)
                    .bind(category_id)
                    .fetch_one(pool)
                    .await
            }
            Backend::Mysql(pool) => {
                sqlx::query_scalar(sql)
                    .bind(user_id)
                    .bind(category_id)
                    .fetch_one(pool)
                    .await
            }
        }
        .context("Failed to check subscription")?;
        Ok(count > 0)
    }

    async fn subscriber_count(&self, category_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) FROM category_subscribers WHERE category_id = ?";
        let count: i64 = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query_scalar(sql).bind(category_id).fetch_one(pool).await,
            Backend::Mysql(pool) => sqlx::query_scalar(sql).bind(category_id).fetch_one(pool).await,
        }
        .context("Failed to count subscribers")?;
        Ok(count)
    }

    async fn subscribers(&self, category_id: i64) -> Result<Vec<User>> {
        let sql = r#"
            SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.password_hash, u.role, u.created_at
            FROM users u
            INNER JOIN category_subscribers cs ON cs.user_id = u.id
            WHERE cs.category_id = ?
            ORDER BY u.id
        "#;
        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(category_id)
                .fetch_all(pool)
                .await
                .context("Failed to list subscribers")?
                .iter()
                .map(row_to_user_sqlite)
                .collect(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(category_id)
                .fetch_all(pool)
                .await
                .context("Failed to list subscribers")?
                .iter()
                .map(row_to_user_mysql)
                .collect(),
        }
    }

    async fn subscriptions_of(&self, user_id: i64) -> Result<Vec<Category>> {
        let sql = r#"
            SELECT c.id, c.name, c.created_at
            FROM categories c
            INNER JOIN category_subscribers cs ON cs.category_id = c.id
            WHERE cs.user_id = ?
            ORDER BY c.name
        "#;
        let categories = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(user_id)
                .fetch_all(pool)
                .await
                .context("Failed to list subscriptions")?
                .iter()
                .map(row_to_category_sqlite)
                .collect(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(user_id)
                .fetch_all(pool)
                .await
                .context("Failed to list subscriptions")?
                .iter()
                .map(row_to_category_mysql)
                .collect(),
        };
        Ok(categories)
    }
}

pub(crate) fn row_to_category_sqlite(row: &SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

pub(crate) fn row_to_category_mysql(row: &MySqlRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

fn create_error(e: sqlx::Error, name: &str) -> anyhow::Error {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => DuplicateCategoryName(name.to_string()).into(),
        _ => anyhow::Error::new(e).context("Failed to create category"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::user::tests::{new_user, setup_test_pool};
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::models::UserRole;

    async fn setup() -> (SqlxCategoryRepository, SqlxUserRepository) {
        let pool = setup_test_pool().await;
        (
            SqlxCategoryRepository::new(pool.clone()),
            SqlxUserRepository::new(pool),
        )
    }

    #[tokio::test]
    async fn test_create_get_list() {
        let (repo, _) = setup().await;
        let sport = repo.create("Sport", Utc::now()).await.unwrap();
        repo.create("Culture", Utc::now()).await.unwrap();

        assert_eq!(repo.get_by_id(sport.id).await.unwrap().unwrap().name, "Sport");
        assert!(repo.get_by_id(999).await.unwrap().is_none());

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Culture", "Sport"]);
    }

    #[tokio::test]
    async fn test_duplicate_name_fails() {
        let (repo, _) = setup().await;
        repo.create("Sport", Utc::now()).await.unwrap();
        let err = repo.create("Sport", Utc::now()).await.unwrap_err();
        assert!(err.is::<DuplicateCategoryName>());
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent() {
        let (repo, users) = setup().await;
        let category = repo.create("Sport", Utc::now()).await.unwrap();
        let user = users.create(&new_user("alice", "a@example.com", UserRole::Common)).await.unwrap();

        assert!(repo.subscribe(user.id, category.id).await.unwrap());
        assert!(!repo.subscribe(user.id, category.id).await.unwrap());
        assert_eq!(repo.subscriber_count(category.id).await.unwrap(), 1);
        assert!(repo.is_subscribed(user.id, category.id).await.unwrap());

        let subscribers = repo.subscribers(category.id).await.unwrap();
        assert_eq!(subscribers.len(), 1);
        assert_eq!(subscribers[0].username, "alice");
        assert_eq!(repo.subscriptions_of(user.id).await.unwrap(), vec![category.clone()]);

        assert!(repo.unsubscribe(user.id, category.id).await.unwrap());
        assert!(!repo.unsubscribe(user.id, category.id).await.unwrap());
        assert_eq!(repo.subscriber_count(category.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_cascades_subscriptions() {
        let (repo, users) = setup().await;
        let category = repo.create("Sport", Utc::now()).await.unwrap();
        let user = users.create(&new_user("alice", "", UserRole::Common)).await.unwrap();
        repo.subscribe(user.id, category.id).await.unwrap();

        assert!(repo.delete(category.id).await.unwrap());
        assert!(!repo.delete(category.id).await.unwrap());
        assert!(repo.subscriptions_of(user.id).await.unwrap().is_empty());
    }
}
