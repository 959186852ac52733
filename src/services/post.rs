//! Post service
//!
//! Publishing workflow for news and articles:
//! - Author permission and the daily publishing quota
//! - Transactional create/update with category links
//! - Filtered, paginated listings and the cached home page
//! - Subscriber notification through the task queue

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

use crate::cache::PageCache;
use crate::config::PublishingConfig;
use crate::db::repositories::{
    CategoryRepository, CreatePostOutcome, DailyQuota, NewPost, PostChanges, PostQuery,
    PostRepository, UpdatePostOutcome,
};
use crate::models::{
    Category, CreatePostInput, ListParams, PagedResult, Post, PostFilter, PostType,
    PostWithCategories, UpdatePostInput, User,
};
use crate::tasks::{system_clock, Clock, Task, TaskQueue};

/// Cache key of the home page listing
const HOME_CACHE_KEY: &str = "posts:home";

const MAX_TITLE_CHARS: usize = 255;

#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// The author already published the daily maximum
    #[error("Daily limit of {0} posts reached, try again tomorrow")]
    QuotaExceeded(u32),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    cache: Arc<PageCache>,
    queue: TaskQueue,
    tz: Tz,
    daily_limit: u32,
    page_size: u32,
    clock: Clock,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        cache: Arc<PageCache>,
        queue: TaskQueue,
        tz: Tz,
        publishing: &PublishingConfig,
    ) -> Self {
        Self {
            posts,
            categories,
            cache,
            queue,
            tz,
            daily_limit: publishing.daily_post_limit,
            page_size: publishing.page_size,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Configured listing page size
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Publish a post of `post_type` on behalf of `user`
    pub async fn create(
        &self,
        user: &User,
        post_type: PostType,
        input: CreatePostInput,
    ) -> Result<PostWithCategories, PostServiceError> {
        if !user.can_publish() {
            return Err(PostServiceError::Forbidden(
                "Only authors can publish, upgrade your account first".to_string(),
            ));
        }
        let title = validate_title(&input.title)?;
        validate_text(&input.text)?;

        let now = (self.clock)();
        let (day_start, day_end) = day_bounds(now, self.tz);
        let new_post = NewPost {
            user_id: user.id,
            post_type,
            title,
            text: input.text,
            category_ids: dedup_ids(input.category_ids),
            created_at: now,
            quota: DailyQuota {
                day_start,
                day_end,
                limit: i64::from(self.daily_limit),
            },
        };

        let post_id = match self.posts.create(&new_post).await? {
            CreatePostOutcome::Created(id) => id,
            CreatePostOutcome::QuotaExceeded { count } => {
                tracing::info!(user_id = user.id, count, "Daily post limit reached");
                return Err(PostServiceError::QuotaExceeded(self.daily_limit));
            }
            CreatePostOutcome::UnknownCategory(id) => {
                return Err(PostServiceError::ValidationError(format!("Unknown category: {}", id)));
            }
        };

        tracing::info!(post_id, user_id = user.id, post_type = %post_type, "Post published");
        self.cache.clear();
        if let Err(e) = self.queue.enqueue(Task::NotifySubscribers { post_id }) {
            tracing::warn!(post_id, error = %e, "Subscribers will not be notified");
        }

        self.get(post_id).await
    }

    /// Edit title, text or categories. Owner or admin only.
    pub async fn update(
        &self,
        user: &User,
        id: i64,
        input: UpdatePostInput,
    ) -> Result<PostWithCategories, PostServiceError> {
        let post = self.find(id).await?;
        if !user.can_manage(post.author_user_id) {
            return Err(PostServiceError::Forbidden("Only the author can edit this post".to_string()));
        }

        let changes = PostChanges {
            title: input.title.as_deref().map(validate_title).transpose()?,
            text: match input.text {
                Some(text) => {
                    validate_text(&text)?;
                    Some(text)
                }
                None => None,
            },
            category_ids: input.category_ids.map(dedup_ids),
        };

        match self.posts.update(id, &changes).await? {
            UpdatePostOutcome::Updated => {}
            UpdatePostOutcome::NotFound => return Err(PostServiceError::NotFound(format!("post {}", id))),
            UpdatePostOutcome::UnknownCategory(category_id) => {
                return Err(PostServiceError::ValidationError(format!(
                    "Unknown category: {}",
                    category_id
                )));
            }
        }

        tracing::info!(post_id = id, user_id = user.id, "Post updated");
        self.cache.clear();
        self.get(id).await
    }

    /// Delete a post with its comments and category links. Owner or admin only.
    pub async fn delete(&self, user: &User, id: i64) -> Result<(), PostServiceError> {
        let post = self.find(id).await?;
        if !user.can_manage(post.author_user_id) {
            return Err(PostServiceError::Forbidden("Only the author can delete this post".to_string()));
        }

        if !self.posts.delete(id).await? {
            return Err(PostServiceError::NotFound(format!("post {}", id)));
        }

        tracing::info!(post_id = id, user_id = user.id, "Post deleted");
        self.cache.clear();
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<PostWithCategories, PostServiceError> {
        let post = self.find(id).await?;
        let categories = self.posts.categories_of(id).await?;
        Ok(PostWithCategories { post, categories })
    }

    /// Like `get`, but a post of another type is reported as missing
    pub async fn get_of_type(&self, id: i64, post_type: PostType) -> Result<PostWithCategories, PostServiceError> {
        let found = self.get(id).await?;
        if found.post.post_type != post_type {
            return Err(PostServiceError::NotFound(format!("post {}", id)));
        }
        Ok(found)
    }

    /// Newest first, optionally restricted to one type
    pub async fn list(
        &self,
        post_type: Option<PostType>,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let query = PostQuery {
            post_type,
            ..Default::default()
        };
        self.query(&query, params).await
    }

    pub async fn search(&self, filter: &PostFilter, params: &ListParams) -> Result<PagedResult<Post>, PostServiceError> {
        let query = PostQuery {
            post_type: filter.post_type,
            title_contains: normalize_needle(filter.title.as_deref()),
            author_contains: normalize_needle(filter.author.as_deref()),
            created_after: filter.date_after.map(|date| local_day_start(date, self.tz)),
            category_id: None,
        };
        self.query(&query, params).await
    }

    pub async fn list_by_category(
        &self,
        category_id: i64,
        params: &ListParams,
    ) -> Result<(Category, PagedResult<Post>), PostServiceError> {
        let category = self
            .categories
            .get_by_id(category_id)
            .await?
            .ok_or_else(|| PostServiceError::NotFound(format!("category {}", category_id)))?;
        let query = PostQuery {
            category_id: Some(category_id),
            ..Default::default()
        };
        let page = self.query(&query, params).await?;
        Ok((category, page))
    }

    /// Latest posts of every type, served from the page cache
    pub async fn home(&self) -> Result<Vec<Post>, PostServiceError> {
        if let Some(posts) = self.cache.get::<Vec<Post>>(HOME_CACHE_KEY).await? {
            return Ok(posts);
        }

        let params = ListParams::new(1, self.page_size);
        let (posts, _) = self.posts.list(&PostQuery::default(), &params).await?;
        self.cache.set(HOME_CACHE_KEY, &posts).await?;
        Ok(posts)
    }

    async fn query(&self, query: &PostQuery, params: &ListParams) -> Result<PagedResult<Post>, PostServiceError> {
        let (items, total) = self.posts.list(query, params).await?;
        Ok(PagedResult::new(items, total, params))
    }

    async fn find(&self, id: i64) -> Result<Post, PostServiceError> {
        self.posts
            .get_by_id(id)
            .await?
            .ok_or_else(|| PostServiceError::NotFound(format!("post {}", id)))
    }
}

fn validate_title(title: &str) -> Result<String, PostServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(PostServiceError::ValidationError("Title cannot be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(PostServiceError::ValidationError(format!(
            "Title cannot exceed {} characters",
            MAX_TITLE_CHARS
        )));
    }
    Ok(title.to_string())
}

fn validate_text(text: &str) -> Result<(), PostServiceError> {
    if text.trim().is_empty() {
        return Err(PostServiceError::ValidationError("Text cannot be empty".to_string()));
    }
    Ok(())
}

fn dedup_ids(mut ids: Vec<i64>) -> Vec<i64> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn normalize_needle(needle: Option<&str>) -> Option<String> {
    needle
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

/// Start of `date` in `tz` as UTC. Midnight skipped by a DST jump resolves
/// to the first local hour that exists.
fn local_day_start(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    (0..24)
        .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
        .find_map(|time| tz.from_local_datetime(&date.and_time(time)).earliest())
        .map(|at| at.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

/// `[start, end)` of the local calendar day containing `now`
fn day_bounds(now: DateTime<Utc>, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.with_timezone(&tz).date_naive();
    let tomorrow = today.succ_opt().unwrap_or(today);
    (local_day_start(today, tz), local_day_start(tomorrow, tz))
}
