//! Email body templates
//!
//! HTML bodies are rendered with Tera from templates compiled into the
//! binary. The `censor` filter is registered on the engine. Values are
//! autoescaped; links are built from configuration and marked `safe`.

use anyhow::{Context as _, Result};
use serde::Serialize;
use tera::{Context, Tera};

use super::censor::Censor;

pub(crate) const NEW_POST: &str = "new_post.html";
pub(crate) const WEEKLY_DIGEST: &str = "weekly_digest.html";
pub(crate) const WELCOME: &str = "welcome.html";

/// Context of the per-post notification
#[derive(Debug, Serialize)]
pub struct NewPostContext<'a> {
    pub title: &'a str,
    pub snippet: &'a str,
    pub username: &'a str,
    pub url: &'a str,
}

#[derive(Debug, Serialize)]
pub struct DigestEntry {
    pub title: String,
    pub url: String,
}

/// Context of the weekly digest
#[derive(Debug, Serialize)]
pub struct DigestContext<'a> {
    pub username: &'a str,
    pub category: &'a str,
    pub posts: &'a [DigestEntry],
}

#[derive(Debug, Serialize)]
pub struct WelcomeContext<'a> {
    pub username: &'a str,
    pub site_name: &'a str,
    pub home_url: &'a str,
}

pub struct EmailTemplates {
    tera: Tera,
}

impl EmailTemplates {
    pub fn new(censor: Censor) -> Result<Self> {
        Self::from_sources(
            censor,
            vec![
                (NEW_POST, include_str!("../../templates/emails/new_post.html")),
                (WEEKLY_DIGEST, include_str!("../../templates/emails/weekly_digest.html")),
                (WELCOME, include_str!("../../templates/emails/welcome.html")),
            ],
        )
    }

    pub(crate) fn from_sources(censor: Censor, sources: Vec<(&str, &str)>) -> Result<Self> {
        let mut tera = Tera::default();
        tera.register_filter("censor", censor);
        tera.add_raw_templates(sources)
            .context("Failed to load email templates")?;
        Ok(Self { tera })
    }

    pub fn new_post(&self, ctx: &NewPostContext<'_>) -> Result<String> {
        self.render(NEW_POST, ctx)
    }

    pub fn weekly_digest(&self, ctx: &DigestContext<'_>) -> Result<String> {
        self.render(WEEKLY_DIGEST, ctx)
    }

    pub fn welcome(&self, ctx: &WelcomeContext<'_>) -> Result<String> {
        self.render(WELCOME, ctx)
    }

    fn render<T: Serialize>(&self, name: &str, value: &T) -> Result<String> {
        let context = Context::from_serialize(value)
            .with_context(|| format!("Failed to build context for {}", name))?;
        self.tera
            .render(name, &context)
            .with_context(|| format!("Failed to render {}", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn templates() -> EmailTemplates {
        EmailTemplates::new(Censor::new(["редиска"]).unwrap()).unwrap()
    }

    #[test]
    fn test_new_post_is_censored() {
        let html = templates()
            .new_post(&NewPostContext {
                title: "Редиска в городе",
                snippet: "Сегодня",
                username: "reader",
                url: "https://example.com/news/1",
            })
            .unwrap();
        assert!(html.contains("Р****** в городе"));
        assert!(html.contains("Hello, reader."));
        assert!(html.contains("href=\"https://example.com/news/1\""));
    }

    #[test]
    fn test_digest_lists_every_post() {
        let posts = vec![
            DigestEntry { title: "First".to_string(), url: "http://x/news/2".to_string() },
            DigestEntry { title: "Second".to_string(), url: "http://x/articles/1".to_string() },
        ];
        let html = templates()
            .weekly_digest(&DigestContext { username: "reader", category: "Sport", posts: &posts })
            .unwrap();
        assert!(html.contains("\"Sport\""));
        assert!(html.contains("http://x/news/2"));
        assert!(html.contains("http://x/articles/1"));
    }

    #[test]
    fn test_welcome() {
        let html = templates()
            .welcome(&WelcomeContext { username: "alice", site_name: "News Portal", home_url: "http://localhost:8000/" })
            .unwrap();
        assert!(html.contains("Welcome to News Portal."));
        assert!(html.contains("href=\"http://localhost:8000/\""));
    }

    #[test]
    fn test_values_are_escaped_but_links_are_not() {
        let html = templates()
            .new_post(&NewPostContext {
                title: "<b>Loud</b>",
                snippet: "Tom & Jerry",
                username: "<script>",
                url: "https://example.com/api/v1/news/7",
            })
            .unwrap();
        assert!(html.contains("&lt;b&gt;Loud&lt;&#x2F;b&gt;"));
        assert!(html.contains("Tom &amp; Jerry"));
        assert!(html.contains("Hello, &lt;script&gt;."));
        assert!(html.contains("href=\"https://example.com/api/v1/news/7\""));
        assert!(!html.contains("&#x2F;api"));
    }
}
