//! Notification dispatcher
//!
//! Sends the new-post notification to category subscribers, the weekly
//! digest and the welcome email. Each recipient gets an independent message;
//! a failed delivery is logged and counted, never retried.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::censor::Censor;
use super::email::{Mailer, OutgoingEmail};
use super::templates::{DigestContext, DigestEntry, EmailTemplates, NewPostContext, WelcomeContext};
use crate::config::{Config, SiteConfig};
use crate::db::repositories::{
    CategoryRepository, JobRunRepository, PostRepository, SqlxCategoryRepository, SqlxJobRunRepository,
    SqlxPostRepository, SqlxUserRepository, UserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{JobStatus, User};

/// Job name recorded in `job_runs`
pub const DIGEST_JOB: &str = "weekly_digest";

/// Posts younger than this go into the digest
pub const DIGEST_PERIOD_DAYS: i64 = 7;

const FALLBACK_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Delivery counts of one dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NotificationOutcome {
    pub sent: usize,
    pub failed: usize,
    /// Recipients without an email address
    pub skipped: usize,
}

impl NotificationOutcome {
    fn record(&mut self, delivered: bool) {
        if delivered {
            self.sent += 1;
        } else {
            self.failed += 1;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DigestSummary {
    /// Categories that had fresh posts
    pub categories: usize,
    pub delivery: NotificationOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestOutcome {
    /// Another digest run was in progress
    Skipped,
    Completed(DigestSummary),
}

/// Builds absolute links to the public site
///
/// Post paths are appended to `site.link_prefix`, which points at the API
/// mount unless a front-end serves the posts.
#[derive(Debug, Clone)]
pub struct SiteLinks {
    origin: String,
    prefix: String,
}

impl SiteLinks {
    pub fn from_config(site: &SiteConfig) -> Self {
        let origin = match site.domain.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(domain) => {
                let scheme = if site.debug { "http" } else { "https" };
                format!("{}://{}", scheme, domain.trim_end_matches('/'))
            }
            None => FALLBACK_BASE_URL.to_string(),
        };
        Self {
            origin,
            prefix: site.link_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.origin, self.prefix, path)
    }

    pub fn home(&self) -> String {
        if self.prefix.is_empty() {
            format!("{}/", self.origin)
        } else {
            format!("{}{}", self.origin, self.prefix)
        }
    }
}

pub struct NotificationDispatcher {
    posts: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    users: Arc<dyn UserRepository>,
    job_runs: Arc<dyn JobRunRepository>,
    mailer: Arc<dyn Mailer>,
    templates: EmailTemplates,
    links: SiteLinks,
    from: String,
    site_name: String,
    snippet_chars: usize,
    digest_lock: Mutex<()>,
}

impl NotificationDispatcher {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        users: Arc<dyn UserRepository>,
        job_runs: Arc<dyn JobRunRepository>,
        mailer: Arc<dyn Mailer>,
        templates: EmailTemplates,
        config: &Config,
    ) -> Self {
        Self {
            posts,
            categories,
            users,
            job_runs,
            mailer,
            templates,
            links: SiteLinks::from_config(&config.site),
            from: config.mail.from.clone(),
            site_name: config.site.name.clone(),
            snippet_chars: config.publishing.snippet_chars,
            digest_lock: Mutex::new(()),
        }
    }

    /// Wire the dispatcher to SQL repositories on `pool`
    pub fn from_pool(pool: DynDatabasePool, mailer: Arc<dyn Mailer>, config: &Config) -> anyhow::Result<Self> {
        let censor = Censor::from_config(&config.censor)?;
        Ok(Self::new(
            SqlxPostRepository::boxed(pool.clone()),
            SqlxCategoryRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
            SqlxJobRunRepository::boxed(pool),
            mailer,
            EmailTemplates::new(censor)?,
            config,
        ))
    }

    pub fn links(&self) -> &SiteLinks {
        &self.links
    }

    /// Email every subscriber of the post's categories once
    pub async fn notify_subscribers(&self, post_id: i64) -> Result<NotificationOutcome, NotificationError> {
        let post = self
            .posts
            .get_by_id(post_id)
            .await?
            .ok_or_else(|| NotificationError::NotFound(format!("post {}", post_id)))?;
        let subscribers = self.posts.subscribers_for_post(post_id).await?;

        let url = self.links.url(&post.path());
        let snippet = post.snippet(self.snippet_chars);
        let mut outcome = NotificationOutcome::default();

        for user in subscribers {
            if !user.has_email() {
                outcome.skipped += 1;
                continue;
            }

            let text = format!(
                "{}\n{}…\n\nHello, {}. A new post in your favourite section!\n\nRead on the site: {}\n",
                post.title, snippet, user.username, url
            );
            let rendered = self.templates.new_post(&NewPostContext {
                title: &post.title,
                snippet,
                username: &user.username,
                url: &url,
            });
            let Some(html) = rendered_for(&user, rendered) else {
                outcome.failed += 1;
                continue;
            };
            let email = self.message(&user, post.title.clone(), text, html);
            outcome.record(self.deliver(&email).await);
        }

        tracing::info!(
            post_id,
            sent = outcome.sent,
            failed = outcome.failed,
            skipped = outcome.skipped,
            "Subscribers notified"
        );
        Ok(outcome)
    }

    /// Send each category's posts of the last week to its subscribers.
    ///
    /// Returns `DigestOutcome::Skipped` if a run is already in progress.
    pub async fn send_weekly_digest(&self, now: DateTime<Utc>) -> Result<DigestOutcome, NotificationError> {
        let Ok(_guard) = self.digest_lock.try_lock() else {
            tracing::warn!("Weekly digest already running, skipping");
            let run_id = self.job_runs.start(DIGEST_JOB, now).await?;
            self.job_runs
                .finish(run_id, JobStatus::Skipped, Utc::now(), Some("previous run in progress"))
                .await?;
            return Ok(DigestOutcome::Skipped);
        };

        let run_id = self.job_runs.start(DIGEST_JOB, now).await?;
        match self.run_digest(now).await {
            Ok(summary) => {
                let detail = format!(
                    "categories={} sent={} failed={} skipped={}",
                    summary.categories, summary.delivery.sent, summary.delivery.failed, summary.delivery.skipped
                );
                self.job_runs
                    .finish(run_id, JobStatus::Succeeded, Utc::now(), Some(&detail))
                    .await?;
                tracing::info!(
                    categories = summary.categories,
                    sent = summary.delivery.sent,
                    failed = summary.delivery.failed,
                    "Weekly digest sent"
                );
                Ok(DigestOutcome::Completed(summary))
            }
            Err(e) => {
                tracing::error!(error = %e, "Weekly digest failed");
                let detail = e.to_string();
                if let Err(finish_err) = self
                    .job_runs
                    .finish(run_id, JobStatus::Failed, Utc::now(), Some(&detail))
                    .await
                {
                    tracing::error!(error = %finish_err, "Failed to record digest failure");
                }
                Err(e)
            }
        }
    }

    async fn run_digest(&self, now: DateTime<Utc>) -> Result<DigestSummary, NotificationError> {
        let since = now - Duration::days(DIGEST_PERIOD_DAYS);
        let mut summary = DigestSummary::default();

        for category in self.categories.list().await? {
            let posts = self.posts.recent_for_category(category.id, since).await?;
            if posts.is_empty() {
                tracing::debug!(category = %category.name, "No new posts, digest skipped");
                continue;
            }
            summary.categories += 1;

            let entries: Vec<DigestEntry> = posts
                .iter()
                .map(|post| DigestEntry {
                    title: post.title.clone(),
                    url: self.links.url(&post.path()),
                })
                .collect();
            let subject = format!("Weekly digest: {}", category.name);

            for user in self.categories.subscribers(category.id).await? {
                if !user.has_email() {
                    summary.delivery.skipped += 1;
                    continue;
                }

                let mut text = format!(
                    "Hello, {}! Weekly digest for category \"{}\":\n",
                    user.username, category.name
                );
                for entry in &entries {
                    text.push_str(&format!("- {} ({})\n", entry.title, entry.url));
                }
                let rendered = self.templates.weekly_digest(&DigestContext {
                    username: &user.username,
                    category: &category.name,
                    posts: &entries,
                });
                let Some(html) = rendered_for(&user, rendered) else {
                    summary.delivery.failed += 1;
                    continue;
                };
                let email = self.message(&user, subject.clone(), text, html);
                summary.delivery.record(self.deliver(&email).await);
            }
        }

        Ok(summary)
    }

    /// Greet a freshly registered user
    pub async fn send_welcome(&self, user_id: i64) -> Result<NotificationOutcome, NotificationError> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| NotificationError::NotFound(format!("user {}", user_id)))?;

        let mut outcome = NotificationOutcome::default();
        if !user.has_email() {
            outcome.skipped += 1;
            return Ok(outcome);
        }

        let home = self.links.home();
        let text = format!(
            "Hello, {}!\nWelcome to {}.\n\nStart reading: {}\n",
            user.username, self.site_name, home
        );
        let rendered = self.templates.welcome(&WelcomeContext {
            username: &user.username,
            site_name: &self.site_name,
            home_url: &home,
        });
        let Some(html) = rendered_for(&user, rendered) else {
            outcome.failed += 1;
            return Ok(outcome);
        };
        let email = self.message(&user, format!("Welcome to {}", self.site_name), text, html);
        outcome.record(self.deliver(&email).await);
        Ok(outcome)
    }

    fn message(&self, to: &User, subject: String, text: String, html: String) -> OutgoingEmail {
        OutgoingEmail {
            from: self.from.clone(),
            to: to.email.clone(),
            subject,
            text,
            html,
        }
    }

    async fn deliver(&self, email: &OutgoingEmail) -> bool {
        match self.mailer.send(email).await {
            Ok(()) => {
                tracing::debug!(recipient = %email.to, subject = %email.subject, "Email sent");
                true
            }
            Err(e) => {
                tracing::warn!(recipient = %email.to, error = %e, "Email delivery failed");
                false
            }
        }
    }
}

/// A body that fails to render counts as a failed delivery for that recipient
fn rendered_for(user: &User, rendered: anyhow::Result<String>) -> Option<String> {
    match rendered {
        Ok(html) => Some(html),
        Err(e) => {
            tracing::warn!(recipient = %user.email, error = %e, "Failed to render email body");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::repositories::post::tests::new_post;
    use crate::db::repositories::user::tests::{new_user, setup_test_pool};
    use crate::db::repositories::CreatePostOutcome;
    use crate::models::{PostType, UserRole};
    use crate::services::email::testing::RecordingMailer;
    use crate::services::templates::{NEW_POST, WEEKLY_DIGEST, WELCOME};

    pub(crate) fn dispatcher(pool: &DynDatabasePool, mailer: Arc<dyn Mailer>, config: &Config) -> NotificationDispatcher {
        NotificationDispatcher::from_pool(pool.clone(), mailer, config).unwrap()
    }

    struct Fixture {
        pool: DynDatabasePool,
        posts: SqlxPostRepository,
        users: SqlxUserRepository,
        categories: SqlxCategoryRepository,
    }

    async fn setup() -> Fixture {
        let pool = setup_test_pool().await;
        Fixture {
            posts: SqlxPostRepository::new(pool.clone()),
            users: SqlxUserRepository::new(pool.clone()),
            categories: SqlxCategoryRepository::new(pool.clone()),
            pool,
        }
    }

    async fn user(f: &Fixture, name: &str, email: &str) -> User {
        f.users.create(&new_user(name, email, UserRole::Common)).await.unwrap()
    }

    async fn publish(f: &Fixture, author: &User, title: &str, categories: Vec<i64>, at: DateTime<Utc>) -> i64 {
        match f.posts.create(&new_post(author.id, title, categories, at)).await.unwrap() {
            CreatePostOutcome::Created(id) => id,
            other => panic!("expected Created, got {:?}", other),
        }
    }

    fn site_config() -> Config {
        let mut config = Config::default();
        config.site.domain = Some("news.example.com".to_string());
        config
    }

    #[test]
    fn test_site_links() {
        let mut site = SiteConfig::default();
        assert_eq!(SiteLinks::from_config(&site).url("/news/1"), "http://localhost:8000/api/v1/news/1");

        site.domain = Some("example.com".to_string());
        assert_eq!(SiteLinks::from_config(&site).url("/news/1"), "https://example.com/api/v1/news/1");
        assert_eq!(SiteLinks::from_config(&site).home(), "https://example.com/api/v1");

        site.debug = true;
        assert_eq!(SiteLinks::from_config(&site).url("/articles/2"), "http://example.com/api/v1/articles/2");
    }

    #[test]
    fn test_site_links_for_front_end() {
        let mut site = SiteConfig::default();
        site.domain = Some("example.com/".to_string());
        site.link_prefix = String::new();
        let links = SiteLinks::from_config(&site);
        assert_eq!(links.url("/news/1"), "https://example.com/news/1");
        assert_eq!(links.home(), "https://example.com/");

        site.link_prefix = "/portal/".to_string();
        assert_eq!(SiteLinks::from_config(&site).url("/articles/3"), "https://example.com/portal/articles/3");
    }

    #[tokio::test]
    async fn test_notify_each_subscriber_once() {
        let f = setup().await;
        let writer = f.users.create(&new_user("writer", "", UserRole::Author)).await.unwrap();
        let both = user(&f, "both", "both@example.com").await;
        let one = user(&f, "one", "one@example.com").await;
        let sport = f.categories.create("Sport", Utc::now()).await.unwrap();
        let culture = f.categories.create("Culture", Utc::now()).await.unwrap();
        f.categories.subscribe(both.id, sport.id).await.unwrap();
        f.categories.subscribe(both.id, culture.id).await.unwrap();
        f.categories.subscribe(one.id, culture.id).await.unwrap();

        let post_id = publish(&f, &writer, "Derby day", vec![sport.id, culture.id], Utc::now()).await;

        let mailer = Arc::new(RecordingMailer::default());
        let outcome = dispatcher(&f.pool, mailer.clone(), &site_config())
            .notify_subscribers(post_id)
            .await
            .unwrap();

        assert_eq!(outcome, NotificationOutcome { sent: 2, failed: 0, skipped: 0 });
        let sent = mailer.sent();
        let mut recipients: Vec<_> = sent.iter().map(|m| m.to.as_str()).collect();
        recipients.sort();
        assert_eq!(recipients, vec!["both@example.com", "one@example.com"]);

        let mail = sent.iter().find(|m| m.to == "one@example.com").unwrap();
        assert_eq!(mail.subject, "Derby day");
        assert!(mail.text.starts_with("Derby day\nDerby day body…\n"));
        assert!(mail.text.contains("Hello, one."));
        let link = format!("https://news.example.com/api/v1/news/{}", post_id);
        assert!(mail.text.contains(&link));
        assert!(mail.html.contains(&format!("href=\"{}\"", link)));
    }

    #[tokio::test]
    async fn test_notify_skips_missing_email_and_isolates_failures() {
        let f = setup().await;
        let writer = f.users.create(&new_user("writer", "", UserRole::Author)).await.unwrap();
        let silent = user(&f, "silent", "").await;
        let broken = user(&f, "broken", "broken@example.com").await;
        let fine = user(&f, "fine", "fine@example.com").await;
        let sport = f.categories.create("Sport", Utc::now()).await.unwrap();
        for u in [&silent, &broken, &fine] {
            f.categories.subscribe(u.id, sport.id).await.unwrap();
        }
        let post_id = publish(&f, &writer, "Result", vec![sport.id], Utc::now()).await;

        let mailer = Arc::new(RecordingMailer::failing_for(&["broken@example.com"]));
        let outcome = dispatcher(&f.pool, mailer.clone(), &site_config())
            .notify_subscribers(post_id)
            .await
            .unwrap();

        assert_eq!(outcome, NotificationOutcome { sent: 1, failed: 1, skipped: 1 });
        assert_eq!(mailer.sent().len(), 1);
        assert_eq!(mailer.sent()[0].to, "fine@example.com");
    }

    #[tokio::test]
    async fn test_notify_uses_article_path_and_snippet_length() {
        let f = setup().await;
        let writer = f.users.create(&new_user("writer", "", UserRole::Author)).await.unwrap();
        let reader = user(&f, "reader", "reader@example.com").await;
        let science = f.categories.create("Science", Utc::now()).await.unwrap();
        f.categories.subscribe(reader.id, science.id).await.unwrap();

        let mut post = new_post(writer.id, "Long read", vec![science.id], Utc::now());
        post.post_type = PostType::Article;
        post.text = "x".repeat(80);
        let post_id = match f.posts.create(&post).await.unwrap() {
            CreatePostOutcome::Created(id) => id,
            other => panic!("expected Created, got {:?}", other),
        };

        let mailer = Arc::new(RecordingMailer::default());
        dispatcher(&f.pool, mailer.clone(), &Config::default())
            .notify_subscribers(post_id)
            .await
            .unwrap();

        let mail = &mailer.sent()[0];
        assert!(mail.text.contains(&format!("\n{}…\n", "x".repeat(50))));
        assert!(mail.text.contains(&format!("http://localhost:8000/api/v1/articles/{}", post_id)));
    }

    #[tokio::test]
    async fn test_render_failure_counts_against_that_recipient_only() {
        let f = setup().await;
        let writer = f.users.create(&new_user("writer", "", UserRole::Author)).await.unwrap();
        let odd = user(&f, "odd", "odd@example.com").await;
        let fine = user(&f, "fine", "fine@example.com").await;
        let sport = f.categories.create("Sport", Utc::now()).await.unwrap();
        f.categories.subscribe(odd.id, sport.id).await.unwrap();
        f.categories.subscribe(fine.id, sport.id).await.unwrap();
        let post_id = publish(&f, &writer, "Result", vec![sport.id], Utc::now()).await;

        // `missing` is not in the context, so rendering fails for "odd" only
        let templates = EmailTemplates::from_sources(
            Censor::new(["редиска"]).unwrap(),
            vec![
                (NEW_POST, "{% if username == \"odd\" %}{{ missing }}{% endif %}{{ title }}"),
                (WEEKLY_DIGEST, "{% if username == \"odd\" %}{{ missing }}{% endif %}{{ category }}"),
                (WELCOME, "{{ username }}"),
            ],
        )
        .unwrap();
        let mailer = Arc::new(RecordingMailer::default());
        let dispatcher = NotificationDispatcher::new(
            SqlxPostRepository::boxed(f.pool.clone()),
            SqlxCategoryRepository::boxed(f.pool.clone()),
            SqlxUserRepository::boxed(f.pool.clone()),
            SqlxJobRunRepository::boxed(f.pool.clone()),
            mailer.clone(),
            templates,
            &Config::default(),
        );

        let outcome = dispatcher.notify_subscribers(post_id).await.unwrap();
        assert_eq!(outcome, NotificationOutcome { sent: 1, failed: 1, skipped: 0 });

        let DigestOutcome::Completed(summary) = dispatcher.send_weekly_digest(Utc::now()).await.unwrap() else {
            panic!("digest should run");
        };
        assert_eq!(summary.delivery, NotificationOutcome { sent: 1, failed: 1, skipped: 0 });

        let recipients: Vec<_> = mailer.sent().iter().map(|m| m.to.clone()).collect();
        assert_eq!(recipients, vec!["fine@example.com", "fine@example.com"]);
    }

    #[tokio::test]
    async fn test_notify_unknown_post() {
        let f = setup().await;
        let mailer = Arc::new(RecordingMailer::default());
        let err = dispatcher(&f.pool, mailer, &Config::default())
            .notify_subscribers(999)
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_weekly_digest() {
        let f = setup().await;
        let now = Utc::now();
        let writer = f.users.create(&new_user("writer", "", UserRole::Author)).await.unwrap();
        let reader = user(&f, "reader", "reader@example.com").await;
        let sport = f.categories.create("Sport", now).await.unwrap();
        let quiet = f.categories.create("Quiet", now).await.unwrap();
        f.categories.subscribe(reader.id, sport.id).await.unwrap();
        f.categories.subscribe(reader.id, quiet.id).await.unwrap();

        publish(&f, &writer, "Old news", vec![sport.id, quiet.id], now - Duration::days(8)).await;
        let older = publish(&f, &writer, "Monday", vec![sport.id], now - Duration::days(3)).await;
        let newer = publish(&f, &writer, "Friday", vec![sport.id], now - Duration::hours(1)).await;

        let mailer = Arc::new(RecordingMailer::default());
        let outcome = dispatcher(&f.pool, mailer.clone(), &site_config())
            .send_weekly_digest(now)
            .await
            .unwrap();

        let DigestOutcome::Completed(summary) = outcome else {
            panic!("digest should run");
        };
        assert_eq!(summary.categories, 1);
        assert_eq!(summary.delivery.sent, 1);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Weekly digest: Sport");
        assert!(sent[0].text.starts_with("Hello, reader! Weekly digest for category \"Sport\":\n"));
        let friday = sent[0].text.find(&format!("/news/{}", newer)).unwrap();
        let monday = sent[0].text.find(&format!("/news/{}", older)).unwrap();
        assert!(friday < monday);
        assert!(!sent[0].text.contains("Old news"));

        let runs = SqlxJobRunRepository::new(f.pool.clone()).recent(10).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, JobStatus::Succeeded);
        assert!(runs[0].finished_at.is_some());
    }

    #[tokio::test]
    async fn test_overlapping_digest_is_skipped() {
        let f = setup().await;
        let mailer = Arc::new(RecordingMailer::default());
        let dispatcher = dispatcher(&f.pool, mailer, &Config::default());

        let guard = dispatcher.digest_lock.lock().await;
        let outcome = dispatcher.send_weekly_digest(Utc::now()).await.unwrap();
        assert_eq!(outcome, DigestOutcome::Skipped);
        drop(guard);

        let outcome = dispatcher.send_weekly_digest(Utc::now()).await.unwrap();
        assert_eq!(outcome, DigestOutcome::Completed(DigestSummary::default()));

        let runs = SqlxJobRunRepository::new(f.pool.clone()).recent(10).await.unwrap();
        let statuses: Vec<_> = runs.iter().map(|r| r.status).collect();
        assert!(statuses.contains(&JobStatus::Skipped));
        assert!(statuses.contains(&JobStatus::Succeeded));
    }

    #[tokio::test]
    async fn test_welcome_email() {
        let f = setup().await;
        let alice = user(&f, "alice", "alice@example.com").await;
        let nobody = user(&f, "nobody", "").await;
        let mailer = Arc::new(RecordingMailer::default());
        let dispatcher = dispatcher(&f.pool, mailer.clone(), &site_config());

        let outcome = dispatcher.send_welcome(alice.id).await.unwrap();
        assert_eq!(outcome.sent, 1);
        let outcome = dispatcher.send_welcome(nobody.id).await.unwrap();
        assert_eq!(outcome.skipped, 1);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Welcome to News Portal");
        assert!(sent[0].text.contains("https://news.example.com/api/v1\n"));
        assert!(sent[0].html.contains("href=\"https://news.example.com/api/v1\""));
        assert!(matches!(
            dispatcher.send_welcome(999).await.unwrap_err(),
            NotificationError::NotFound(_)
        ));
    }
}
