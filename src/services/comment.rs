//! Comment service

use std::sync::Arc;

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, CreateCommentInput, ListParams, PagedResult, User};
use crate::tasks::{system_clock, Clock};

#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
    clock: Clock,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self {
            comments,
            posts,
            clock: system_clock(),
        }
    }

    /// Comment on an existing post
    pub async fn create(
        &self,
        user: &User,
        post_id: i64,
        input: CreateCommentInput,
    ) -> Result<Comment, CommentServiceError> {
        let text = input.text.trim();
        if text.is_empty() {
            return Err(CommentServiceError::ValidationError("Comment cannot be empty".to_string()));
        }
        self.ensure_post(post_id).await?;

        let comment = self.comments.create(post_id, user.id, text, (self.clock)()).await?;
        tracing::debug!(comment_id = comment.id, post_id, user_id = user.id, "Comment added");
        Ok(comment)
    }

    /// Oldest first
    pub async fn list_for_post(
        &self,
        post_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<Comment>, CommentServiceError> {
        self.ensure_post(post_id).await?;
        let (items, total) = self.comments.list_for_post(post_id, params).await?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Owner or admin only
    pub async fn delete(&self, user: &User, id: i64) -> Result<(), CommentServiceError> {
        let comment = self
            .comments
            .get_by_id(id)
            .await?
            .ok_or_else(|| CommentServiceError::NotFound(format!("comment {}", id)))?;
        if !user.can_manage(comment.user_id) {
            return Err(CommentServiceError::Forbidden(
                "Only the commenter can delete this comment".to_string(),
            ));
        }

        self.comments.delete(id).await?;
        tracing::debug!(comment_id = id, user_id = user.id, "Comment deleted");
        Ok(())
    }

    async fn ensure_post(&self, post_id: i64) -> Result<(), CommentServiceError> {
        match self.posts.get_by_id(post_id).await? {
            Some(_) => Ok(()),
            None => Err(CommentServiceError::NotFound(format!("post {}", post_id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::post::tests::new_post;
    use crate::db::repositories::user::tests::{new_user, setup_test_pool};
    use crate::db::repositories::{
        CreatePostOutcome, SqlxCommentRepository, SqlxPostRepository, SqlxUserRepository, UserRepository,
    };
    use crate::models::UserRole;
    use chrono::Utc;

    struct Fixture {
        service: CommentService,
        writer: User,
        reader: User,
        admin: User,
        post_id: i64,
    }

    async fn setup() -> Fixture {
        let pool = setup_test_pool().await;
        let users = SqlxUserRepository::new(pool.clone());
        let posts = SqlxPostRepository::boxed(pool.clone());
        let writer = users.create(&new_user("writer", "", UserRole::Author)).await.unwrap();
        let reader = users.create(&new_user("reader", "", UserRole::Common)).await.unwrap();
        let admin = users.create(&new_user("admin", "", UserRole::Admin)).await.unwrap();
        let post_id = match posts.create(&new_post(writer.id, "Story", vec![], Utc::now())).await.unwrap() {
            CreatePostOutcome::Created(id) => id,
            other => panic!("expected Created, got {:?}", other),
        };

        Fixture {
            service: CommentService::new(SqlxCommentRepository::boxed(pool), posts),
            writer,
            reader,
            admin,
            post_id,
        }
    }

    fn text(s: &str) -> CreateCommentInput {
        CreateCommentInput { text: s.to_string() }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let f = setup().await;
        f.service.create(&f.reader, f.post_id, text("  first  ")).await.unwrap();
        f.service.create(&f.writer, f.post_id, text("second")).await.unwrap();

        let page = f.service.list_for_post(f.post_id, &ListParams::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].text, "first");
        assert_eq!(page.items[0].username, "reader");
        assert_eq!(page.items[1].text, "second");
    }

    #[tokio::test]
    async fn test_create_rejects_empty_text_and_missing_post() {
        let f = setup().await;
        assert!(matches!(
            f.service.create(&f.reader, f.post_id, text("   ")).await,
            Err(CommentServiceError::ValidationError(_))
        ));
        assert!(matches!(
            f.service.create(&f.reader, 999, text("hello")).await,
            Err(CommentServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.service.list_for_post(999, &ListParams::default()).await,
            Err(CommentServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_permissions() {
        let f = setup().await;
        let mine = f.service.create(&f.reader, f.post_id, text("mine")).await.unwrap();
        let other = f.service.create(&f.reader, f.post_id, text("moderated")).await.unwrap();

        assert!(matches!(
            f.service.delete(&f.writer, mine.id).await,
            Err(CommentServiceError::Forbidden(_))
        ));
        f.service.delete(&f.reader, mine.id).await.unwrap();
        f.service.delete(&f.admin, other.id).await.unwrap();
        assert!(matches!(
            f.service.delete(&f.admin, other.id).await,
            Err(CommentServiceError::NotFound(_))
        ));

        let page = f.service.list_for_post(f.post_id, &ListParams::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }
}
