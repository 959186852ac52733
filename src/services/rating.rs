//! Rating engine
//!
//! Likes and dislikes move a post or comment rating by one in a single
//! `UPDATE`. Author ratings are derived from those counters and only
//! recomputed on request.

use crate::db::repositories::{AuthorRepository, CommentRepository, PostRepository, RatingParts};
use std::sync::Arc;

/// Weight of the author's own post ratings in the author rating
pub const POST_WEIGHT: i64 = 3;

#[derive(Debug, thiserror::Error)]
pub enum RatingError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Something that can be liked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingTarget {
    Post(i64),
    Comment(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingDelta {
    Like,
    Dislike,
}

impl RatingDelta {
    pub fn value(self) -> i64 {
        match self {
            Self::Like => 1,
            Self::Dislike => -1,
        }
    }
}

/// `3 * posts + own comments + comments on the author's posts`
pub fn author_rating(parts: RatingParts) -> i64 {
    POST_WEIGHT * parts.posts + parts.own_comments + parts.comments_on_posts
}

pub struct RatingEngine {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    authors: Arc<dyn AuthorRepository>,
}

impl RatingEngine {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        authors: Arc<dyn AuthorRepository>,
    ) -> Self {
        Self {
            posts,
            comments,
            authors,
        }
    }

    /// Apply a like or dislike and return the new rating
    pub async fn adjust_rating(&self, target: RatingTarget, delta: RatingDelta) -> Result<i64, RatingError> {
        let updated = match target {
            RatingTarget::Post(id) => self.posts.adjust_rating(id, delta.value()).await?,
            RatingTarget::Comment(id) => self.comments.adjust_rating(id, delta.value()).await?,
        };

        match updated {
            Some(rating) => {
                tracing::debug!(?target, ?delta, rating, "Rating adjusted");
                Ok(rating)
            }
            None => Err(RatingError::NotFound(match target {
                RatingTarget::Post(id) => format!("post {}", id),
                RatingTarget::Comment(id) => format!("comment {}", id),
            })),
        }
    }

    /// Recompute and store the rating of an author
    pub async fn recompute_author_rating(&self, author_id: i64) -> Result<i64, RatingError> {
        if self.authors.get_by_id(author_id).await?.is_none() {
            return Err(RatingError::NotFound(format!("author {}", author_id)));
        }

        let parts = self.authors.rating_parts(author_id).await?;
        let rating = author_rating(parts);
        self.authors.set_rating(author_id, rating).await?;

        tracing::debug!(author_id, rating, "Author rating recomputed");
        Ok(rating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::post::tests::new_post;
    use crate::db::repositories::user::tests::{new_user, setup_test_pool};
    use crate::db::repositories::{
        CreatePostOutcome, SqlxAuthorRepository, SqlxCommentRepository, SqlxPostRepository,
        SqlxUserRepository, UserRepository,
    };
    use crate::models::UserRole;
    use chrono::Utc;
    use proptest::prelude::*;

    struct Fixture {
        engine: Arc<RatingEngine>,
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        authors: Arc<dyn AuthorRepository>,
        users: SqlxUserRepository,
    }

    async fn setup() -> Fixture {
        let pool = setup_test_pool().await;
        let posts = SqlxPostRepository::boxed(pool.clone());
        let comments = SqlxCommentRepository::boxed(pool.clone());
        let authors = SqlxAuthorRepository::boxed(pool.clone());
        Fixture {
            engine: Arc::new(RatingEngine::new(posts.clone(), comments.clone(), authors.clone())),
            posts,
            comments,
            authors,
            users: SqlxUserRepository::new(pool),
        }
    }

    async fn publish(f: &Fixture, user_id: i64, title: &str) -> i64 {
        match f.posts.create(&new_post(user_id, title, vec![], Utc::now())).await.unwrap() {
            CreatePostOutcome::Created(id) => id,
            other => panic!("expected Created, got {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn test_author_rating_formula(posts in -1000i64..1000, own in -1000i64..1000, on in -1000i64..1000) {
            let parts = RatingParts { posts, own_comments: own, comments_on_posts: on };
            prop_assert_eq!(author_rating(parts), 3 * posts + own + on);
        }
    }

    #[test]
    fn test_empty_parts_rate_zero() {
        assert_eq!(author_rating(RatingParts::default()), 0);
    }

    #[tokio::test]
    async fn test_like_then_dislike_restores_rating() {
        let f = setup().await;
        let user = f.users.create(&new_user("writer", "", UserRole::Author)).await.unwrap();
        let post_id = publish(&f, user.id, "Story").await;

        let liked = f.engine.adjust_rating(RatingTarget::Post(post_id), RatingDelta::Like).await.unwrap();
        assert_eq!(liked, 1);
        let back = f.engine.adjust_rating(RatingTarget::Post(post_id), RatingDelta::Dislike).await.unwrap();
        assert_eq!(back, 0);
    }

    #[tokio::test]
    async fn test_unknown_target_is_not_found() {
        let f = setup().await;
        let err = f.engine.adjust_rating(RatingTarget::Comment(404), RatingDelta::Like).await.unwrap_err();
        assert!(matches!(err, RatingError::NotFound(_)));
        let err = f.engine.recompute_author_rating(404).await.unwrap_err();
        assert!(matches!(err, RatingError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_recompute_author_rating() {
        let f = setup().await;
        let writer = f.users.create(&new_user("writer", "", UserRole::Author)).await.unwrap();
        let reader = f.users.create(&new_user("reader", "", UserRole::Common)).await.unwrap();
        let first = publish(&f, writer.id, "First").await;
        let second = publish(&f, writer.id, "Second").await;

        // posts: 2 + 1 = 3
        f.posts.adjust_rating(first, 2).await.unwrap();
        f.posts.adjust_rating(second, 1).await.unwrap();
        // own comment on an own post counts in both sums
        let own = f.comments.create(first, writer.id, "mine", Utc::now()).await.unwrap();
        f.comments.adjust_rating(own.id, 4).await.unwrap();
        // reader's comment on the writer's post
        let other = f.comments.create(second, reader.id, "nice", Utc::now()).await.unwrap();
        f.comments.adjust_rating(other.id, -1).await.unwrap();

        let author = f.authors.get_by_user_id(writer.id).await.unwrap().unwrap();
        assert_eq!(author.rating, 0);

        let rating = f.engine.recompute_author_rating(author.id).await.unwrap();
        // 3*3 + 4 + (4 - 1)
        assert_eq!(rating, 16);
        let stored = f.authors.get_by_id(author.id).await.unwrap().unwrap();
        assert_eq!(stored.rating, 16);
    }

    #[tokio::test]
    async fn test_author_without_activity_rates_zero() {
        let f = setup().await;
        let writer = f.users.create(&new_user("writer", "", UserRole::Author)).await.unwrap();
        let post_id = publish(&f, writer.id, "Quiet").await;
        assert!(post_id > 0);
        let author = f.authors.get_by_user_id(writer.id).await.unwrap().unwrap();
        assert_eq!(f.engine.recompute_author_rating(author.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_likes_are_not_lost() {
        let f = setup().await;
        let user = f.users.create(&new_user("writer", "", UserRole::Author)).await.unwrap();
        let post_id = publish(&f, user.id, "Popular").await;

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let engine = f.engine.clone();
                tokio::spawn(async move {
                    engine.adjust_rating(RatingTarget::Post(post_id), RatingDelta::Like).await
                })
            })
            .collect();
        for result in futures::future::join_all(handles).await {
            result.unwrap().unwrap();
        }

        let post = f.posts.get_by_id(post_id).await.unwrap().unwrap();
        assert_eq!(post.rating, 20);
    }
}
