//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for one aggregate.

pub mod author;
pub mod category;
pub mod comment;
pub mod job_run;
pub mod post;
pub mod session;
pub mod user;

pub use author::{AuthorRepository, RatingParts, SqlxAuthorRepository};
pub use category::{CategoryRepository, DuplicateCategoryName, SqlxCategoryRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use job_run::{JobRunRepository, SqlxJobRunRepository};
pub use post::{
    CreatePostOutcome, DailyQuota, NewPost, PostChanges, PostQuery, PostRepository,
    SqlxPostRepository, UpdatePostOutcome,
};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
