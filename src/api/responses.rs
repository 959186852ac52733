//! Shared API response types
//!
//! Every piece of user-written text (titles, bodies, comments) passes
//! through the censor before it leaves the API.

use serde::Serialize;

use crate::models::{Author, Category, Comment, PagedResult, Post, PostWithCategories, User};
use crate::services::{page_window, Censor, PageWindow};

// ============================================================================
// Post Response Types
// ============================================================================

/// Author info embedded in post responses
#[derive(Debug, Serialize, Clone)]
pub struct AuthorInfo {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
}

/// Full post response, used by detail and write endpoints
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: i64,
    pub post_type: String,
    pub title: String,
    pub text: String,
    pub rating: i64,
    pub author: AuthorInfo,
    pub categories: Vec<CategoryResponse>,
    pub url: String,
    pub created_at: String,
}

/// Post in a listing: title and preview only
#[derive(Debug, Serialize)]
pub struct PostSummary {
    pub id: i64,
    pub post_type: String,
    pub title: String,
    pub preview: String,
    pub rating: i64,
    pub author: AuthorInfo,
    pub url: String,
    pub created_at: String,
}

fn author_info(post: &Post) -> AuthorInfo {
    AuthorInfo {
        id: post.author_id,
        user_id: post.author_user_id,
        username: post.author_username.clone(),
    }
}

impl PostResponse {
    pub fn new(found: PostWithCategories, censor: &Censor) -> Self {
        let PostWithCategories { post, categories } = found;
        Self {
            id: post.id,
            post_type: post.post_type.code().to_string(),
            title: censor.apply(&post.title),
            text: censor.apply(&post.text),
            rating: post.rating,
            author: author_info(&post),
            categories: categories.into_iter().map(CategoryResponse::from).collect(),
            url: post.path(),
            created_at: post.created_at.to_rfc3339(),
        }
    }
}

impl PostSummary {
    pub fn new(post: &Post, censor: &Censor) -> Self {
        Self {
            id: post.id,
            post_type: post.post_type.code().to_string(),
            title: censor.apply(&post.title),
            preview: censor.apply(&post.preview()),
            rating: post.rating,
            author: author_info(post),
            url: post.path(),
            created_at: post.created_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Other Entities
// ============================================================================

#[derive(Debug, Serialize, Clone)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub text: String,
    pub rating: i64,
    pub created_at: String,
}

impl CommentResponse {
    pub fn new(comment: Comment, censor: &Censor) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            user_id: comment.user_id,
            username: comment.username,
            text: censor.apply(&comment.text),
            rating: comment.rating,
            created_at: comment.created_at.to_rfc3339(),
        }
    }
}

/// Response for user info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role.to_string(),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthorResponse {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub rating: i64,
}

impl From<Author> for AuthorResponse {
    fn from(author: Author) -> Self {
        Self {
            id: author.id,
            user_id: author.user_id,
            username: author.username,
            rating: author.rating,
        }
    }
}

/// New rating of a liked or disliked post or comment
#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub id: i64,
    pub rating: i64,
}

// ============================================================================
// Pagination Response Types
// ============================================================================

/// Page counters plus the page-number window for rendering a pager
#[derive(Debug, Serialize)]
pub struct PaginationInfo {
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    #[serde(flatten)]
    pub window: PageWindow,
}

impl PaginationInfo {
    pub fn of<T>(page: &PagedResult<T>) -> Self {
        let total_pages = page.total_pages();
        Self {
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            total_pages,
            window: page_window(page.page, total_pages),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedPostsResponse {
    pub posts: Vec<PostSummary>,
    pub pagination: PaginationInfo,
}

impl PaginatedPostsResponse {
    pub fn new(page: PagedResult<Post>, censor: &Censor) -> Self {
        Self {
            pagination: PaginationInfo::of(&page),
            posts: page.items.iter().map(|p| PostSummary::new(p, censor)).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedCommentsResponse {
    pub comments: Vec<CommentResponse>,
    pub pagination: PaginationInfo,
}

impl PaginatedCommentsResponse {
    pub fn new(page: PagedResult<Comment>, censor: &Censor) -> Self {
        Self {
            pagination: PaginationInfo::of(&page),
            comments: page.items.into_iter().map(|c| CommentResponse::new(c, censor)).collect(),
        }
    }
}
