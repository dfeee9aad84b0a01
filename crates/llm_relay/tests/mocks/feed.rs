use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use llm_relay::feed::{Article, ArticleContent, ArticleFetcher, FeedSource};
use relay_datastore::UrlLedger;

pub fn article(slug: &str, pub_date: &str) -> Article {
    Article {
        title: format!("Story {slug}"),
        link: format!("https://news.test/{slug}"),
        description: format!("About {slug}"),
        pub_date: pub_date.to_string(),
        image_url: None,
    }
}

#[derive(Clone)]
pub struct MockFeed {
    pub articles: Vec<Article>,
    pub fail_with: Option<String>,
}

impl MockFeed {
    pub fn new(articles: Vec<Article>) -> Self {
        Self {
            articles,
            fail_with: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            articles: Vec::new(),
            fail_with: Some(msg.to_string()),
        }
    }
}

impl FeedSource for MockFeed {
    async fn fetch_feed(&self) -> anyhow::Result<Vec<Article>> {
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(self.articles.clone())
    }
}

#[derive(Clone, Default)]
pub struct MockFetcher {
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl ArticleFetcher for MockFetcher {
    async fn fetch_article(&self, url: &str) -> ArticleContent {
        self.calls.lock().unwrap().push(url.to_string());
        ArticleContent {
            title: format!("Title of {url}"),
            url: url.to_string(),
            content: format!("Body of {url}"),
        }
    }
}

#[derive(Clone, Default)]
pub struct MockLedger {
    pub processed: HashSet<String>,
    pub recorded: Arc<Mutex<Vec<String>>>,
}

impl MockLedger {
    pub fn with_processed(urls: &[&str]) -> Self {
        Self {
            processed: urls.iter().map(|u| u.to_string()).collect(),
            ..Default::default()
        }
    }
}

impl UrlLedger for MockLedger {
    async fn processed_urls(&self) -> anyhow::Result<HashSet<String>> {
        Ok(self.processed.clone())
    }

    async fn record(&self, url: &str) -> anyhow::Result<()> {
        self.recorded.lock().unwrap().push(url.to_string());
        Ok(())
    }
}
