//! Category service
//!
//! Implements business logic for categories and subscriptions:
//! - Listing and lookup
//! - Admin create/delete with unique names
//! - Idempotent subscribe/unsubscribe

use crate::db::repositories::{CategoryRepository, DuplicateCategoryName};
use crate::models::{Category, CreateCategoryInput, User};
use crate::tasks::{system_clock, Clock};
use std::sync::Arc;

/// Maximum category name length
const MAX_NAME_CHARS: usize = 128;

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// Category name already exists
    #[error("Category name already exists: {0}")]
    DuplicateName(String),

    /// Category not found
    #[error("Category not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Subscription state of one user for one category
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SubscriptionStatus {
    pub category_id: i64,
    pub subscribed: bool,
    pub subscribers: i64,
}

/// Category service
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    clock: Clock,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self {
            repo,
            clock: system_clock(),
        }
    }

    /// All categories ordered by name
    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        Ok(self.repo.list().await?)
    }

    pub async fn get(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| CategoryServiceError::NotFound(id.to_string()))
    }

    /// Create a category
    ///
    /// # Errors
    /// - `Forbidden` unless `user` is an admin
    /// - `ValidationError` for an empty or overlong name
    /// - `DuplicateName` if the name is taken
    pub async fn create(&self, user: &User, input: CreateCategoryInput) -> Result<Category, CategoryServiceError> {
        if !user.is_admin() {
            return Err(CategoryServiceError::Forbidden("Admin access required".to_string()));
        }

        let name = input.name.trim();
        if name.is_empty() {
            return Err(CategoryServiceError::ValidationError("Category name cannot be empty".to_string()));
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(CategoryServiceError::ValidationError(format!(
                "Category name cannot exceed {} characters",
                MAX_NAME_CHARS
            )));
        }
        let category = self.repo.create(name, (self.clock)()).await.map_err(|e| {
            if e.is::<DuplicateCategoryName>() {
                CategoryServiceError::DuplicateName(name.to_string())
            } else {
                CategoryServiceError::InternalError(e)
            }
        })?;
        tracing::info!(category_id = category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Delete a category; its subscriptions and post links go with it
    pub async fn delete(&self, user: &User, id: i64) -> Result<(), CategoryServiceError> {
        if !user.is_admin() {
            return Err(CategoryServiceError::Forbidden("Admin access required".to_string()));
        }
        if !self.repo.delete(id).await? {
            return Err(CategoryServiceError::NotFound(id.to_string()));
        }
        tracing::info!(category_id = id, "Category deleted");
        Ok(())
    }

    /// Subscribing twice is a no-op
    pub async fn subscribe(&self, user: &User, category_id: i64) -> Result<SubscriptionStatus, CategoryServiceError> {
        self.get(category_id).await?;
        if self.repo.subscribe(user.id, category_id).await? {
            tracing::debug!(user_id = user.id, category_id, "Subscribed");
        }
        self.status(user, category_id).await
    }

    /// Unsubscribing without a subscription is a no-op
    pub async fn unsubscribe(&self, user: &User, category_id: i64) -> Result<SubscriptionStatus, CategoryServiceError> {
        self.get(category_id).await?;
        if self.repo.unsubscribe(user.id, category_id).await? {
            tracing::debug!(user_id = user.id, category_id, "Unsubscribed");
        }
        self.status(user, category_id).await
    }

    pub async fn is_subscribed(&self, user: &User, category_id: i64) -> Result<bool, CategoryServiceError> {
        Ok(self.repo.is_subscribed(user.id, category_id).await?)
    }

    pub async fn subscriber_count(&self, category_id: i64) -> Result<i64, CategoryServiceError> {
        Ok(self.repo.subscriber_count(category_id).await?)
    }

    /// Categories the user is subscribed to
    pub async fn subscriptions_of(&self, user: &User) -> Result<Vec<Category>, CategoryServiceError> {
        Ok(self.repo.subscriptions_of(user.id).await?)
    }

    async fn status(&self, user: &User, category_id: i64) -> Result<SubscriptionStatus, CategoryServiceError> {
        Ok(SubscriptionStatus {
            category_id,
            subscribed: self.is_subscribed(user, category_id).await?,
            subscribers: self.subscriber_count(category_id).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::user::tests::{new_user, setup_test_pool};
    use crate::db::repositories::{SqlxCategoryRepository, SqlxUserRepository, UserRepository};
    use crate::models::UserRole;

    async fn setup() -> (CategoryService, User, User) {
        let pool = setup_test_pool().await;
        let users = SqlxUserRepository::new(pool.clone());
        let admin = users.create(&new_user("admin", "", UserRole::Admin)).await.unwrap();
        let reader = users.create(&new_user("reader", "", UserRole::Common)).await.unwrap();
        (CategoryService::new(SqlxCategoryRepository::boxed(pool)), admin, reader)
    }

    fn named(name: &str) -> CreateCategoryInput {
        CreateCategoryInput { name: name.to_string() }
    }

    #[tokio::test]
    async fn test_create_list_get() {
        let (service, admin, _) = setup().await;
        let sport = service.create(&admin, named("  Sport ")).await.unwrap();
        service.create(&admin, named("Culture")).await.unwrap();

        assert_eq!(sport.name, "Sport");
        let names: Vec<_> = service.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Culture", "Sport"]);
        assert_eq!(service.get(sport.id).await.unwrap().name, "Sport");
        assert!(matches!(service.get(999).await, Err(CategoryServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_rules() {
        let (service, admin, reader) = setup().await;
        assert!(matches!(
            service.create(&reader, named("Sport")).await,
            Err(CategoryServiceError::Forbidden(_))
        ));
        assert!(matches!(
            service.create(&admin, named("  ")).await,
            Err(CategoryServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(&admin, named(&"x".repeat(129))).await,
            Err(CategoryServiceError::ValidationError(_))
        ));
        service.create(&admin, named("Sport")).await.unwrap();
        assert!(matches!(
            service.create(&admin, named("Sport")).await,
            Err(CategoryServiceError::DuplicateName(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_creates_with_one_name() {
        let (service, admin, _) = setup().await;
        let (first, second) = tokio::join!(
            service.create(&admin, named("Sport")),
            service.create(&admin, named("Sport")),
        );

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(CategoryServiceError::DuplicateName(name)) if name == "Sport")));
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_and_unsubscribe_are_idempotent() {
        let (service, admin, reader) = setup().await;
        let sport = service.create(&admin, named("Sport")).await.unwrap();

        let first = service.subscribe(&reader, sport.id).await.unwrap();
        let second = service.subscribe(&reader, sport.id).await.unwrap();
        assert_eq!(first, second);
        assert!(second.subscribed);
        assert_eq!(second.subscribers, 1);
        assert_eq!(service.subscriptions_of(&reader).await.unwrap().len(), 1);

        let first = service.unsubscribe(&reader, sport.id).await.unwrap();
        let second = service.unsubscribe(&reader, sport.id).await.unwrap();
        assert_eq!(first, second);
        assert!(!second.subscribed);
        assert_eq!(second.subscribers, 0);

        assert!(matches!(
            service.subscribe(&reader, 999).await,
            Err(CategoryServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let (service, admin, reader) = setup().await;
        let sport = service.create(&admin, named("Sport")).await.unwrap();
        service.subscribe(&reader, sport.id).await.unwrap();

        assert!(matches!(
            service.delete(&reader, sport.id).await,
            Err(CategoryServiceError::Forbidden(_))
        ));
        service.delete(&admin, sport.id).await.unwrap();
        assert!(service.subscriptions_of(&reader).await.unwrap().is_empty());
        assert!(matches!(
            service.delete(&admin, sport.id).await,
            Err(CategoryServiceError::NotFound(_))
        ));
    }
}
