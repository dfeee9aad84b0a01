//! # Feed
//!
//! RSS feed retrieval and article text extraction for the news digest.

pub mod article;
pub mod rss;

use std::{cmp::Reverse, future::Future};

use chrono::{DateTime, FixedOffset};
use itertools::Itertools;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub title: String,
    pub link: String,
    pub description: String,
    #[serde(rename = "pubDate")]
    pub pub_date: String,
    #[serde(skip)]
    pub image_url: Option<String>,
}

impl Article {
    pub fn published_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc2822(self.pub_date.trim()).ok()
    }
}

/// Text pulled out of an article page.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleContent {
    pub title: String,
    pub url: String,
    pub content: String,
}

pub trait FeedSource {
    fn fetch_feed(&self) -> impl Future<Output = anyhow::Result<Vec<Article>>> + Send;
}

pub trait ArticleFetcher {
    /// Never fails: fetch errors are folded into the returned content so the
    /// model can still be asked about the article.
    fn fetch_article(&self, url: &str) -> impl Future<Output = ArticleContent> + Send;
}

/// Serialises articles as pretty JSON for the selection prompt, without
/// image URLs.
pub fn format_articles_for_llm(articles: &[Article]) -> Result<String, crate::error::Error> {
    Ok(serde_json::to_string_pretty(articles)?)
}

/// Newest first. Articles whose date does not parse keep feed order at the end.
pub fn sort_newest_first(articles: Vec<Article>) -> Vec<Article> {
    articles
        .into_iter()
        .sorted_by_key(|a| match a.published_at() {
            Some(ts) => (0, Reverse(Some(ts))),
            None => (1, Reverse(None)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(link: &str, pub_date: &str) -> Article {
        Article {
            title: format!("title {link}"),
            link: link.to_string(),
            description: "desc".to_string(),
            pub_date: pub_date.to_string(),
            image_url: Some("https://img.example.com/x.jpg".to_string()),
        }
    }

    #[test]
    fn test_format_articles_omits_image_url() {
        let formatted =
            format_articles_for_llm(&[article("https://a", "No publication date")]).unwrap();
        assert!(formatted.contains("\"pubDate\": \"No publication date\""));
        assert!(formatted.contains("\"link\": \"https://a\""));
        assert!(!formatted.contains("image"));
    }

    #[test]
    fn test_sort_newest_first_with_unparseable_dates_last() {
        let articles = vec![
            article("https://undated-1", "yesterday-ish"),
            article("https://old", "Mon, 06 Oct 2025 08:00:00 GMT"),
            article("https://new", "Tue, 07 Oct 2025 09:30:00 +0000"),
            article("https://undated-2", "No publication date"),
        ];

        let links = sort_newest_first(articles)
            .into_iter()
            .map(|a| a.link)
            .collect::<Vec<_>>();

        assert_eq!(
            links,
            vec![
                "https://new",
                "https://old",
                "https://undated-1",
                "https://undated-2"
            ]
        );
    }
}
