//! Data models
//!
//! Database entities (User, Session, Author, Category, Post, Comment, JobRun)
//! and the input types accepted by the services.

mod author;
mod category;
mod comment;
mod job_run;
mod post;
mod session;
mod user;

pub use author::Author;
pub use category::{Category, CreateCategoryInput};
pub use comment::{Comment, CreateCommentInput};
pub use job_run::{JobRun, JobStatus};
pub use post::{
    CreatePostInput, ListParams, PagedResult, Post, PostFilter, PostType, PostWithCategories,
    UpdatePostInput, PREVIEW_CHARS,
};
pub use session::{Session, SESSION_LIFETIME_DAYS};
pub use user::{CreateUserInput, User, UserRole};
