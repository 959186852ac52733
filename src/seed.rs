//! Demo data
//!
//! Fills an empty portal with test users, categories, posts, comments and
//! subscriptions. Running it twice reuses the users and categories that
//! already exist and adds another batch of posts.
//!
//! Selection is driven by a seeded RNG so a given `rng_seed` always builds
//! the same data set.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;

use crate::db::repositories::{
    AuthorRepository, CategoryRepository, CommentRepository, CreatePostOutcome, DailyQuota, NewPost,
    PostRepository, SqlxAuthorRepository, SqlxCategoryRepository, SqlxCommentRepository, SqlxPostRepository,
    SqlxUserRepository, UserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{Category, PostType, User, UserRole};
use crate::services::{hash_password, RatingEngine};

/// Password of every seeded account
pub const DEMO_PASSWORD: &str = "testpass123";

const CATEGORY_NAMES: &[&str] = &[
    "Политика", "Экономика", "Технологии", "Спорт", "Культура", "Наука",
    "Здоровье", "Путешествия", "Образование", "Развлечения", "Бизнес", "Медиа",
];

const NEWS_TITLES: &[&str] = &[
    "Новые законы вступили в силу",
    "Встреча глав государств",
    "Реформа образования",
    "Новые технологии в медицине",
    "Спортивные достижения",
    "Культурные события",
    "Экономические показатели",
    "Научные открытия",
    "Здоровый образ жизни",
    "Туристические направления",
];

const ARTICLE_TITLES: &[&str] = &[
    "Как правильно инвестировать",
    "Анализ текущей ситуации",
    "Руководство по использованию",
    "Тенденции развития",
    "Практические советы",
    "Глубокий анализ проблемы",
    "Методы решения задач",
    "Опыт и рекомендации",
    "Теоретические основы",
    "Практические примеры",
];

const POST_TEXTS: &[&str] = &[
    "Это интересная новость о важных событиях в мире. Она содержит много полезной информации для читателей. ",
    "Данная статья рассказывает о последних изменениях и тенденциях в различных сферах жизни. ",
    "Автор рассматривает актуальные проблемы и предлагает различные подходы к их решению. ",
    "Материал основан на глубоком анализе фактов и данных, представленных экспертами. ",
    "Статья охватывает широкий спектр вопросов, связанных с современными вызовами и возможностями. ",
];

const COMMENT_TEXTS: &[&str] = &[
    "Очень интересная статья!",
    "Спасибо за информацию.",
    "Не согласен с некоторыми моментами.",
    "Отличный материал, рекомендую к прочтению.",
    "Есть что обсудить по этой теме.",
    "Много полезной информации.",
    "Требуется дополнительное изучение вопроса.",
];

/// How much data to create
#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub users: usize,
    /// Capped at the number of built-in category names
    pub categories: usize,
    pub posts: usize,
    pub rng_seed: u64,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            users: 5,
            categories: 8,
            posts: 30,
            rng_seed: 42,
        }
    }
}

/// Rows touched by one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub users: usize,
    pub categories: usize,
    pub posts: usize,
    pub comments: usize,
    pub subscriptions: usize,
}

pub struct Seeder {
    users: SqlxUserRepository,
    categories: SqlxCategoryRepository,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    authors: Arc<dyn AuthorRepository>,
}

impl Seeder {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self {
            users: SqlxUserRepository::new(pool.clone()),
            categories: SqlxCategoryRepository::new(pool.clone()),
            posts: SqlxPostRepository::boxed(pool.clone()),
            comments: SqlxCommentRepository::boxed(pool.clone()),
            authors: SqlxAuthorRepository::boxed(pool),
        }
    }

    /// Create the demo data set relative to `now`
    pub async fn run(&self, options: &SeedOptions, now: DateTime<Utc>) -> Result<SeedReport> {
        if options.users == 0 {
            anyhow::bail!("at least one user is needed to author posts");
        }
        let mut rng = StdRng::seed_from_u64(options.rng_seed);
        let mut report = SeedReport::default();

        let users = self.seed_users(options.users, now).await?;
        report.users = users.len();
        tracing::info!(users = users.len(), "Users ready");

        let categories = self.seed_categories(options.categories, now).await?;
        report.categories = categories.len();
        tracing::info!(categories = categories.len(), "Categories ready");

        let mut post_ids = Vec::with_capacity(options.posts);
        for i in 0..options.posts {
            let post_id = self.seed_post(&mut rng, i, &users, &categories, now).await?;
            post_ids.push(post_id);
        }
        report.posts = post_ids.len();
        tracing::info!(posts = report.posts, "Posts created");

        for &post_id in &post_ids {
            for _ in 0..rng.gen_range(1..=5) {
                self.seed_comment(&mut rng, post_id, &users, now).await?;
                report.comments += 1;
            }
        }
        tracing::info!(comments = report.comments, "Comments created");

        if !categories.is_empty() {
            for user in &users {
                let wanted = rng.gen_range(2..=4).min(categories.len());
                for category in categories.choose_multiple(&mut rng, wanted) {
                    self.categories.subscribe(user.id, category.id).await?;
                    report.subscriptions += 1;
                }
            }
        }
        tracing::info!(subscriptions = report.subscriptions, "Subscriptions created");

        let engine = RatingEngine::new(self.posts.clone(), self.comments.clone(), self.authors.clone());
        for user in &users {
            if let Some(author) = self.authors.get_by_user_id(user.id).await? {
                engine.recompute_author_rating(author.id).await?;
            }
        }

        Ok(report)
    }

    async fn seed_users(&self, count: usize, now: DateTime<Utc>) -> Result<Vec<User>> {
        let password_hash = hash_password(DEMO_PASSWORD)?;
        let mut users = Vec::with_capacity(count);
        for i in 1..=count {
            let username = format!("testuser{}", i);
            let user = match self.users.get_by_username(&username).await? {
                Some(existing) => existing,
                None => {
                    self.users
                        .create(&User {
                            id: 0,
                            username: username.clone(),
                            email: format!("{}@example.com", username),
                            first_name: format!("Test{}", i),
                            last_name: "User".to_string(),
                            password_hash: password_hash.clone(),
                            role: UserRole::Author,
                            created_at: now,
                        })
                        .await
                        .with_context(|| format!("Failed to create {}", username))?
                }
            };
            users.push(user);
        }
        Ok(users)
    }

    async fn seed_categories(&self, count: usize, now: DateTime<Utc>) -> Result<Vec<Category>> {
        let existing = self.categories.list().await?;
        let mut categories = Vec::new();
        for name in CATEGORY_NAMES.iter().take(count) {
            let category = match existing.iter().find(|c| c.name == *name) {
                Some(category) => category.clone(),
                None => self.categories.create(name, now).await?,
            };
            categories.push(category);
        }
        Ok(categories)
    }

    async fn seed_post(
        &self,
        rng: &mut StdRng,
        index: usize,
        users: &[User],
        categories: &[Category],
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let (post_type, titles) = if index % 2 == 0 {
            (PostType::News, NEWS_TITLES)
        } else {
            (PostType::Article, ARTICLE_TITLES)
        };
        let title = format!("{} #{}", titles[rng.gen_range(0..titles.len())], index + 1);
        let text = POST_TEXTS[rng.gen_range(0..POST_TEXTS.len())].repeat(rng.gen_range(2..=5));
        let author = &users[rng.gen_range(0..users.len())];
        let created_at = now - Duration::days(rng.gen_range(0..=30));

        let category_ids = if categories.is_empty() {
            Vec::new()
        } else {
            let wanted = rng.gen_range(1..=categories.len().min(3));
            categories.choose_multiple(rng, wanted).map(|c| c.id).collect()
        };

        let outcome = self
            .posts
            .create(&NewPost {
                user_id: author.id,
                post_type,
                title,
                text,
                category_ids,
                created_at,
                // Back-dated demo posts are not subject to the daily limit
                quota: DailyQuota {
                    day_start: created_at,
                    day_end: created_at,
                    limit: i64::MAX,
                },
            })
            .await?;
        let post_id = match outcome {
            CreatePostOutcome::Created(id) => id,
            other => anyhow::bail!("demo post was rejected: {:?}", other),
        };
        self.posts.adjust_rating(post_id, rng.gen_range(-10..=50)).await?;
        Ok(post_id)
    }

    async fn seed_comment(&self, rng: &mut StdRng, post_id: i64, users: &[User], now: DateTime<Utc>) -> Result<()> {
        let user = &users[rng.gen_range(0..users.len())];
        let text = COMMENT_TEXTS[rng.gen_range(0..COMMENT_TEXTS.len())];
        let created_at = now - Duration::days(rng.gen_range(0..=30));
        let comment = self.comments.create(post_id, user.id, text, created_at).await?;
        self.comments.adjust_rating(comment.id, rng.gen_range(-5..=10)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::user::tests::setup_test_pool;
    use crate::models::ListParams;
    use crate::services::verify_password;

    #[tokio::test]
    async fn test_seed_creates_demo_portal() {
        let pool = setup_test_pool().await;
        let seeder = Seeder::new(pool.clone());
        let options = SeedOptions { users: 3, categories: 4, posts: 6, rng_seed: 7 };

        let report = seeder.run(&options, Utc::now()).await.unwrap();

        assert_eq!(report.users, 3);
        assert_eq!(report.categories, 4);
        assert_eq!(report.posts, 6);
        assert!((6..=30).contains(&report.comments));
        assert!((6..=12).contains(&report.subscriptions));

        let users = SqlxUserRepository::new(pool.clone());
        let first = users.get_by_username("testuser1").await.unwrap().unwrap();
        assert_eq!(first.email, "testuser1@example.com");
        assert!(first.can_publish());
        assert!(verify_password(DEMO_PASSWORD, &first.password_hash).unwrap());

        let names: Vec<_> = SqlxCategoryRepository::new(pool.clone())
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names.len(), 4);
        assert!(names.contains(&"Спорт".to_string()));

        let posts = SqlxPostRepository::new(pool.clone());
        let (all, total) = posts.list(&Default::default(), &ListParams::default()).await.unwrap();
        assert_eq!(total, 6);
        assert_eq!(all.iter().filter(|p| p.post_type == PostType::News).count(), 3);
        for post in &all {
            assert!(!posts.categories_of(post.id).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_seed_twice_reuses_users_and_categories() {
        let pool = setup_test_pool().await;
        let seeder = Seeder::new(pool.clone());
        let options = SeedOptions { users: 2, categories: 3, posts: 2, rng_seed: 1 };

        seeder.run(&options, Utc::now()).await.unwrap();
        let again = seeder.run(&options, Utc::now()).await.unwrap();

        assert_eq!(again.users, 2);
        assert_eq!(again.categories, 3);
        assert_eq!(SqlxUserRepository::new(pool.clone()).count().await.unwrap(), 2);
        assert_eq!(SqlxCategoryRepository::new(pool.clone()).list().await.unwrap().len(), 3);
        let (_, total) = SqlxPostRepository::new(pool)
            .list(&Default::default(), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(total, 4);
    }

    #[tokio::test]
    async fn test_seed_needs_a_user() {
        let pool = setup_test_pool().await;
        let options = SeedOptions { users: 0, ..SeedOptions::default() };
        assert!(Seeder::new(pool).run(&options, Utc::now()).await.is_err());
    }
}
