use std::io::Write;

use crate::{
    feed::article::HttpArticleFetcher,
    prompt::PromptSet,
    tools::echo_to,
    ChatMessage, ChatModel, ChatRequest,
};

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const SUMMARY_POSTPROMPT: &str =
    "Create a complete but concise multi-tier bullet point summary of this article.";
const RECONCILE_POSTPROMPT: &str =
    "Please reconcile these summaries into a single concise multi-tier bullet point summary.";

/// Bullet point summaries of several web pages, reconciled into one.
pub struct WebBullets<C> {
    chat: C,
    fetcher: HttpArticleFetcher,
    temperature: f32,
}

impl<C: ChatModel> WebBullets<C> {
    pub fn new(chat: C) -> Self {
        Self {
            chat,
            fetcher: HttpArticleFetcher::default(),
            temperature: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[tracing::instrument(skip(self, text), fields(chars = text.len()))]
    async fn summarize(&self, url: &str, text: String) -> anyhow::Result<String> {
        let request = PromptSet::new(SYSTEM_PROMPT)
            .preprompt(format!("The following is the text from {url}:"))
            .document(text)
            .postprompt(SUMMARY_POSTPROMPT)
            .into_request(self.temperature);

        self.chat
            .complete_streaming(request, |_| {})
            .await
            .map_err(|e| anyhow::anyhow!("Failed to summarize '{url}': {e}"))
    }

    /// One labelled user message pair per page, in the order given.
    fn reconcile_request(&self, summaries: &[(String, String)]) -> ChatRequest {
        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
        for (url, summary) in summaries {
            messages.push(ChatMessage::user(format!(
                "The following is the bullet point summary of {url}:"
            )));
            messages.push(ChatMessage::user(summary.as_str()));
        }
        messages.push(ChatMessage::user(RECONCILE_POSTPROMPT));

        ChatRequest::new(messages).with_temperature(self.temperature)
    }

    /// Fetches and summarizes every page, then streams the reconciled
    /// summary to `out`. Any page that cannot be fetched fails the run.
    pub async fn run<W: Write + Send>(&self, urls: &[String], out: &mut W) -> anyhow::Result<String> {
        if urls.is_empty() {
            anyhow::bail!("At least one URL is required");
        }

        let mut summaries = Vec::with_capacity(urls.len());
        for url in urls {
            let text = self.fetcher.fetch_body_text(url).await?;
            tracing::debug!(%url, %text, "Cleaned body text");

            let summary = self.summarize(url, text).await?;
            tracing::debug!(%url, %summary, "Bullet point summary");

            summaries.push((url.clone(), summary));
        }

        let reply = self
            .chat
            .complete_streaming(self.reconcile_request(&summaries), echo_to(out))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to reconcile summaries: {e}"))?;
        writeln!(out)?;

        Ok(reply)
    }
}
