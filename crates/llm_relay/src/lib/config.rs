use std::time::Duration;

use clap::Args;

use crate::openai::OpenAIClient;

/// Connection settings for the OpenAI-compatible backend, shared by every
/// subcommand.
#[derive(Debug, Clone, Args)]
pub struct BackendArgs {
    /// Base URL of the chat completions API
    #[arg(long, env = "LLM_BASE_URL", default_value = OpenAIClient::DEFAULT_BASE_URL)]
    pub base_url: String,

    /// API key; local backends accept anything
    #[arg(long, env = "LLM_API_KEY", default_value = "none", hide_env_values = true)]
    pub api_key: String,

    /// Chat model name
    #[arg(long, env = "LLM_MODEL", default_value = "")]
    pub model: String,

    /// Base URL of the embeddings API, when served separately
    #[arg(long, env = "LLM_EMBEDDING_BASE_URL")]
    pub embedding_base_url: Option<String>,

    #[arg(long, env = "LLM_EMBEDDING_MODEL", default_value = OpenAIClient::DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// Request timeout in seconds
    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value = "7200")]
    pub timeout_secs: u64,

    /// Retries for transient HTTP failures
    #[arg(long, env = "LLM_MAX_RETRIES", default_value = "3")]
    pub max_retries: u32,
}

impl BackendArgs {
    fn client(&self, base_url: &str) -> OpenAIClient {
        OpenAIClient::new(&self.api_key)
            .with_base_url(base_url)
            .with_chat_model(&self.model)
            .with_embedding_model(&self.embedding_model)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_retries(self.max_retries)
    }

    pub fn chat_client(&self) -> OpenAIClient {
        self.client(&self.base_url)
    }

    pub fn embedding_client(&self) -> OpenAIClient {
        self.client(self.embedding_base_url.as_deref().unwrap_or(&self.base_url))
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        backend: BackendArgs,
    }

    #[test]
    fn test_embedding_url_falls_back_to_base_url() {
        let cli = TestCli::parse_from(["test", "--base-url", "http://gpu:8000/v1"]);
        assert_eq!(cli.backend.embedding_base_url, None);
        assert_eq!(cli.backend.max_retries, 3);
        assert_eq!(cli.backend.timeout_secs, 7200);

        let cli = TestCli::parse_from([
            "test",
            "--embedding-base-url",
            "http://gpu:8001/v1",
            "--embedding-model",
            "bge-small",
        ]);
        assert_eq!(cli.backend.embedding_base_url.as_deref(), Some("http://gpu:8001/v1"));
        assert_eq!(cli.backend.embedding_model, "bge-small");
    }
}
