mod builder;

use std::{collections::HashSet, io::Write};

use anyhow::Context;
use rand::seq::SliceRandom;
use relay_datastore::UrlLedger;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

pub use builder::NewsDigestBuilder;

use crate::{
    feed::{format_articles_for_llm, sort_newest_first, Article, ArticleContent, ArticleFetcher, FeedSource},
    prompt::PromptSet,
    text::{first_url, non_blank_lines, strip_think_blocks},
    ChatModel,
};

const SYSTEM_PROMPT: &str = "You're an expert news analyst.";
const SELECT_PREPROMPT: &str = "You are given a list of recent articles in JSON format. Examine them and select the most important one. Do not construct the URL from the title; use the 'link' field exactly as provided. Respond with the exact URL from that field, and nothing else.";
const SELECT_POSTPROMPT: &str = "Select the article you think is most important. Return only the URL from the 'link' field of that article, exactly as it appears, with no additional text, no explanations, no formatting.";
const SUMMARY_PREPROMPT: &str = "Analyze the following article and provide a summary.";
const SUMMARY_POSTPROMPT: &str = "Provide a concise summary of the article's main points. Do not include any preamble or further explanation - just the summary.";

#[derive(Debug, Clone)]
pub struct DigestOptions {
    /// Skip and record processed URLs in the ledger.
    pub save: bool,
    /// Pick articles at random instead of asking the model.
    pub random: bool,
    pub max_articles: Option<usize>,
    /// Consecutive selections that name no listed article (or an already
    /// processed one) before giving up.
    pub max_selection_attempts: usize,
    pub temperature: f32,
}

impl Default for DigestOptions {
    fn default() -> Self {
        Self {
            save: false,
            random: false,
            max_articles: None,
            max_selection_attempts: 3,
            temperature: 0.6,
        }
    }
}

/// Text-to-speech through an external command such as `espeak`.
#[derive(Debug, Clone)]
pub struct Speaker {
    program: String,
}

impl Default for Speaker {
    fn default() -> Self {
        Self::new("espeak")
    }
}

impl Speaker {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    #[tracing::instrument(skip_all, fields(program = %self.program))]
    pub async fn speak(&self, text: &str) -> anyhow::Result<()> {
        let status = Command::new(&self.program)
            .arg(text)
            .status()
            .await
            .with_context(|| format!("Failed to run '{}'", self.program))?;

        if !status.success() {
            anyhow::bail!("'{}' exited with {status}", self.program);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct DigestReport {
    pub summarized: Vec<String>,
    pub skipped: Vec<String>,
    pub invalid_selections: usize,
}

/// Repeatedly picks the most important unread article from a feed and
/// summarizes it.
pub struct NewsDigest<C, F, A, L> {
    chat: C,
    feed: F,
    fetcher: A,
    ledger: L,
    options: DigestOptions,
    shutdown: CancellationToken,
    speaker: Option<Speaker>,
}

fn random_link(articles: &[Article]) -> Option<String> {
    articles
        .choose(&mut rand::thread_rng())
        .map(|article| article.link.clone())
}

impl<C, F, A, L> NewsDigest<C, F, A, L>
where
    C: ChatModel + Send + Sync,
    F: FeedSource + Send + Sync,
    A: ArticleFetcher + Send + Sync,
    L: UrlLedger + Send + Sync,
{
    /// Asks the model for the most important article. `None` when the reply
    /// holds no URL at all.
    #[tracing::instrument(skip_all, fields(articles = articles.len()))]
    async fn select_url(&self, articles: &[Article]) -> anyhow::Result<Option<String>> {
        let request = PromptSet::new(SYSTEM_PROMPT)
            .preprompt(SELECT_PREPROMPT)
            .document(format_articles_for_llm(articles)?)
            .postprompt(SELECT_POSTPROMPT)
            .into_request(self.options.temperature);

        let reply = self
            .chat
            .complete_streaming(request, |_| {})
            .await
            .map_err(|e| anyhow::anyhow!("Failed to select an article: {e}"))?;

        Ok(first_url(&strip_think_blocks(&reply)).map(str::to_string))
    }

    #[tracing::instrument(skip(self))]
    async fn summarize(&self, url: &str) -> anyhow::Result<String> {
        let ArticleContent {
            title,
            url,
            content,
        } = self.fetcher.fetch_article(url).await;

        let request = PromptSet::new(SYSTEM_PROMPT)
            .preprompt(SUMMARY_PREPROMPT)
            .document(format!("Title: {title}\nURL: {url}\nContent: {content}"))
            .postprompt(SUMMARY_POSTPROMPT)
            .into_request(self.options.temperature);

        let reply = self
            .chat
            .complete_streaming(request, |_| {})
            .await
            .map_err(|e| anyhow::anyhow!("Failed to summarize '{url}': {e}"))?;

        Ok(non_blank_lines(&strip_think_blocks(&reply)))
    }

    async fn processed_urls(&self) -> anyhow::Result<HashSet<String>> {
        if !self.options.save {
            return Ok(HashSet::new());
        }
        self.ledger
            .processed_urls()
            .await
            .context("Failed to load processed URLs")
    }

    pub async fn run<W: Write + Send>(&self, out: &mut W) -> anyhow::Result<DigestReport> {
        let articles = self
            .feed
            .fetch_feed()
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to fetch feed"))?;

        if articles.is_empty() {
            writeln!(out, "No articles found in the feed.")?;
            return Ok(DigestReport::default());
        }

        let processed = self.processed_urls().await?;
        let mut articles = sort_newest_first(articles)
            .into_iter()
            .filter(|a| !processed.contains(&a.link))
            .collect::<Vec<_>>();

        let mut report = DigestReport::default();
        let mut failed_selections = 0;

        while !articles.is_empty() && !self.shutdown.is_cancelled() {
            if self
                .options
                .max_articles
                .is_some_and(|max| report.summarized.len() >= max)
            {
                break;
            }

            let url = if self.options.random {
                let Some(url) = random_link(&articles) else {
                    break;
                };
                writeln!(out, "Randomly selected URL: {url}")?;
                url
            } else {
                let Some(url) = self.select_url(&articles).await? else {
                    tracing::warn!("No URL found in LLM response");
                    break;
                };

                // Ledger URLs were filtered out of `articles` above.
                let already_processed = processed.contains(&url);
                let listed = articles.iter().any(|a| a.link == url);
                if already_processed {
                    tracing::info!(%url, "Skipping already processed URL");
                    report.skipped.push(url.clone());
                } else if !listed {
                    tracing::warn!(%url, "URL not found in article list, skipping");
                    report.invalid_selections += 1;
                }

                if already_processed || !listed {
                    failed_selections += 1;
                    if failed_selections >= self.options.max_selection_attempts {
                        tracing::warn!(failed_selections, "Giving up on article selection");
                        break;
                    }
                    continue;
                }
                failed_selections = 0;

                writeln!(out, "Selected URL: {url}")?;
                url
            };

            let summary = self.summarize(&url).await?;
            if !summary.is_empty() {
                writeln!(out, "{summary}")?;
                if let Some(speaker) = &self.speaker {
                    if let Err(e) = speaker.speak(&summary).await {
                        tracing::warn!(error = ?e, "Failed to speak summary");
                    }
                }
            }
            writeln!(out)?;

            if self.options.save {
                self.ledger
                    .record(&url)
                    .await
                    .with_context(|| format!("Failed to record '{url}'"))?;
            }
            articles.retain(|a| a.link != url);
            report.summarized.push(url);

            if self.shutdown.is_cancelled() {
                writeln!(out, "Shutting down after current article...")?;
            }
        }

        writeln!(out, "Done.")?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = DigestOptions::default();
        assert!(!options.save);
        assert!(!options.random);
        assert_eq!(options.max_selection_attempts, 3);
    }

    #[test]
    fn test_random_link_picks_listed_article() {
        let articles = ["a", "b", "c"]
            .into_iter()
            .map(|l| Article {
                title: l.into(),
                link: format!("https://news.test/{l}"),
                description: String::new(),
                pub_date: String::new(),
                image_url: None,
            })
            .collect::<Vec<_>>();

        let link = random_link(&articles).unwrap();
        assert!(articles.iter().any(|a| a.link == link));
        assert!(random_link(&[]).is_none());
    }
}
