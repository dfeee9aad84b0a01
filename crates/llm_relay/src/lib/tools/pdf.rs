use std::{io::Write, time::Duration};

use anyhow::Context;
use reqwest_middleware::ClientWithMiddleware;

use crate::{llm::openai::retrying_client, prompt::PromptSet, tools::echo_to, ChatModel};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a sophisticated technical paper examiner.";
pub const DEFAULT_PREPROMPT: &str = "The following is a scientific paper PDF we converted to text:";
pub const DEFAULT_POSTPROMPT: &str = "What is the main novel finding of this paper? Output only the novel finding with no preamble or explanation.";

/// Text of every page, in order. Parsing is CPU-bound so it runs on the
/// blocking pool.
pub async fn pdf_to_text(bytes: Vec<u8>) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .context("PDF extraction task failed")?
        .context("Failed to extract text from PDF")
}

/// Downloads a PDF and asks a question about its text.
pub struct PdfExaminer<C> {
    chat: C,
    client: ClientWithMiddleware,
    timeout: Duration,
    system: String,
    preprompt: String,
    postprompt: String,
    temperature: f32,
}

impl<C: ChatModel> PdfExaminer<C> {
    pub fn new(chat: C) -> Self {
        Self {
            chat,
            client: retrying_client(2),
            timeout: Duration::from_secs(120),
            system: DEFAULT_SYSTEM_PROMPT.into(),
            preprompt: DEFAULT_PREPROMPT.into(),
            postprompt: DEFAULT_POSTPROMPT.into(),
            temperature: 0.7,
        }
    }

    pub fn with_prompts(
        mut self,
        system: impl Into<String>,
        preprompt: impl Into<String>,
        postprompt: impl Into<String>,
    ) -> Self {
        self.system = system.into();
        self.preprompt = preprompt.into();
        self.postprompt = postprompt.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[tracing::instrument(skip(self))]
    async fn download(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("Error downloading PDF from '{url}'"))?
            .error_for_status()
            .with_context(|| format!("Error downloading PDF from '{url}'"))?;

        Ok(response.bytes().await?.to_vec())
    }

    /// Streams the answer about already extracted `text` to `out`.
    pub async fn examine_text<W: Write + Send>(&self, text: String, out: &mut W) -> anyhow::Result<String> {
        let request = PromptSet::new(&self.system)
            .preprompt(&self.preprompt)
            .document(text)
            .postprompt(&self.postprompt)
            .into_request(self.temperature);

        let reply = self
            .chat
            .complete_streaming(request, echo_to(out))
            .await
            .map_err(|e| anyhow::anyhow!("Error during completion: {e}"))?;
        writeln!(out)?;

        Ok(reply)
    }

    pub async fn run<W: Write + Send>(&self, url: &str, out: &mut W) -> anyhow::Result<String> {
        let bytes = self.download(url).await?;
        let text = pdf_to_text(bytes)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, url, "Failed to read PDF"))?;
        tracing::info!(url, chars = text.len(), "Extracted PDF text");

        self.examine_text(text, out).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_garbage_is_not_a_pdf() {
        let err = pdf_to_text(b"definitely not a pdf".to_vec()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to extract text from PDF"));
    }
}
