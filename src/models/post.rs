//! Post model
//!
//! News items and articles share one table and differ only by `post_type`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Category;

/// Characters of body text shown in listings before the ellipsis
pub const PREVIEW_CHARS: usize = 124;

/// Kind of post, stored as a two-letter code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostType {
    #[serde(rename = "NW")]
    News,
    #[serde(rename = "AR")]
    Article,
}

impl PostType {
    /// Storage code
    pub fn code(&self) -> &'static str {
        match self {
            Self::News => "NW",
            Self::Article => "AR",
        }
    }

    /// URL segment of the public listing for this type
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Article => "articles",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PostType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NW" => Ok(Self::News),
            "AR" => Ok(Self::Article),
            _ => Err(format!("Invalid post type: {}", s)),
        }
    }
}

/// Post entity, joined with its author's user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    /// User that owns the author profile
    pub author_user_id: i64,
    pub author_username: String,
    pub post_type: PostType,
    pub title: String,
    pub text: String,
    pub rating: i64,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// First 124 characters of the text followed by `...`
    pub fn preview(&self) -> String {
        format!("{}...", take_chars(&self.text, PREVIEW_CHARS))
    }

    /// First `n` characters of the text, no ellipsis
    pub fn snippet(&self, n: usize) -> &str {
        take_chars(&self.text, n)
    }

    /// Site-relative URL of the post detail page
    pub fn path(&self) -> String {
        format!("/{}/{}", self.post_type.path_segment(), self.id)
    }
}

fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Post together with the categories it is filed under
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithCategories {
    #[serde(flatten)]
    pub post: Post,
    pub categories: Vec<Category>,
}

/// Input for publishing a post
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub category_ids: Vec<i64>,
}

/// Input for editing a post. The type and creation time never change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub text: Option<String>,
    pub category_ids: Option<Vec<i64>>,
}

/// Search filters for post listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostFilter {
    /// Restrict to one post type
    #[serde(skip)]
    pub post_type: Option<PostType>,
    /// Title contains (case-insensitive)
    pub title: Option<String>,
    /// Author username contains (case-insensitive)
    pub author: Option<String>,
    /// Created strictly after this date
    pub date_after: Option<NaiveDate>,
}

impl PostFilter {
    pub fn of_type(post_type: PostType) -> Self {
        Self {
            post_type: Some(post_type),
            ..Default::default()
        }
    }
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Total number of pages, never less than one
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 1;
        }
        let per_page = self.per_page as i64;
        ((self.total + per_page - 1) / per_page) as u32
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}
