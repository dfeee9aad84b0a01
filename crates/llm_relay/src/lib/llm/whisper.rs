use std::{path::Path, time::Duration};

use reqwest::Client;

use crate::{llm::openai::OpenAIError, Transcriber};

/// Client for the `/inference` endpoint of a whisper.cpp server.
///
/// Uploads are multipart, which cannot be replayed by the retry middleware,
/// so this uses a plain client.
#[derive(Debug, Clone)]
pub struct WhisperCppClient {
    client: Client,
    server_url: String,
    timeout: Duration,
}

impl WhisperCppClient {
    pub const DEFAULT_SERVER_URL: &str = "http://localhost:9191/inference";

    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            server_url: server_url.into(),
            timeout: Duration::from_secs(3600),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for WhisperCppClient {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SERVER_URL)
    }
}

impl Transcriber for WhisperCppClient {
    type Error = OpenAIError;

    #[tracing::instrument(skip(self))]
    async fn transcribe(&self, wav_path: &Path, translate: bool) -> Result<String, Self::Error> {
        let bytes = tokio::fs::read(wav_path).await?;
        let file_name = wav_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/wav")?;

        let mut form = reqwest::multipart::Form::new()
            .text("response_format", "srt")
            .part("file", part);

        if translate {
            form = form.text("translate", "true");
        }

        let resp = self
            .client
            .post(&self.server_url)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(OpenAIError::Api { status, message });
        }

        Ok(resp.text().await?)
    }
}
