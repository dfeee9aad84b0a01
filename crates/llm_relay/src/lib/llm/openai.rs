use std::time::Duration;

use futures::StreamExt;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{Deserialize, Serialize};

use crate::{
    llm::sse::{SseDecoder, SseEvent},
    ChatModel, ChatRequest, Embedder,
};

/// Client for any OpenAI-compatible backend (llama.cpp, vLLM, Ollama,
/// OpenAI itself).
#[derive(Clone)]
pub struct OpenAIClient {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
    chat_model: String,
    embedding_model: String,
    timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum OpenAIError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Malformed stream event: {0}")]
    Stream(String),
    #[error("Backend returned no content")]
    EmptyResponse,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    #[serde(flatten)]
    request: &'a ChatRequest,
    stream: bool,
}

pub(crate) fn retrying_client(max_retries: u32) -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);

    ClientBuilder::new(reqwest::Client::new())
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}

impl OpenAIClient {
    pub const DEFAULT_BASE_URL: &str = "http://localhost:9090/v1";
    pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text-v1.5.q8_0";
    const DEFAULT_MAX_RETRIES: u32 = 3;

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: retrying_client(Self::DEFAULT_MAX_RETRIES),
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.into(),
            chat_model: String::new(),
            embedding_model: Self::DEFAULT_EMBEDDING_MODEL.into(),
            timeout: Duration::from_secs(7200),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.client = retrying_client(max_retries);
        self
    }

    async fn post_completion(
        &self,
        model_name: &str,
        request: &ChatRequest,
        stream: bool,
    ) -> Result<reqwest::Response, OpenAIError> {
        let body = CompletionBody {
            model: model_name,
            request,
            stream,
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(OpenAIError::Api { status, message });
        }

        Ok(resp)
    }

    #[tracing::instrument(skip(self, request), fields(messages = request.messages.len()))]
    pub async fn send_completion_request(
        &self,
        model_name: &str,
        request: &ChatRequest,
    ) -> Result<CompletionResponse, OpenAIError> {
        let resp = self.post_completion(model_name, request, false).await?;
        Ok(resp.json::<CompletionResponse>().await?)
    }

    /// Sends a `stream: true` completion and feeds each content delta to
    /// `on_delta` in arrival order.
    #[tracing::instrument(skip(self, request, on_delta), fields(messages = request.messages.len()))]
    pub async fn stream_completion<F>(
        &self,
        model_name: &str,
        request: &ChatRequest,
        mut on_delta: F,
    ) -> Result<String, OpenAIError>
    where
        F: FnMut(&str) + Send,
    {
        let resp = self.post_completion(model_name, request, true).await?;

        let mut decoder = SseDecoder::default();
        let mut body = resp.bytes_stream();
        let mut reply = String::new();

        let mut handle = |event: SseEvent, reply: &mut String| -> Result<bool, OpenAIError> {
            let payload = match event {
                SseEvent::Done => return Ok(true),
                SseEvent::Data(payload) => payload,
            };

            let chunk = serde_json::from_str::<StreamChunk>(&payload)
                .inspect_err(|e| tracing::error!(error = %e, %payload, "Failed to decode stream chunk"))
                .map_err(|e| OpenAIError::Stream(e.to_string()))?;

            if let Some(delta) = chunk
                .choices
                .first()
                .and_then(|c| c.delta.content.as_deref())
            {
                on_delta(delta);
                reply.push_str(delta);
            }
            Ok(false)
        };

        while let Some(bytes) = body.next().await {
            for event in decoder.feed(&bytes?) {
                if handle(event, &mut reply)? {
                    return Ok(reply);
                }
            }
        }

        // backend closed the connection without [DONE]
        if let Some(event) = decoder.finish() {
            handle(event, &mut reply)?;
        }

        Ok(reply)
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn send_embedding_request(
        &self,
        model_name: &str,
        input: &str,
    ) -> Result<Vec<f32>, OpenAIError> {
        let body = serde_json::json!({
            "model": model_name,
            "input": [input],
        });

        let resp = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(OpenAIError::Api { status, message });
        }

        resp.json::<EmbeddingResponse>()
            .await?
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(OpenAIError::EmptyResponse)
    }
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub choices: Vec<CompletionChoice>,
}

impl CompletionResponse {
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub index: u32,
    pub message: CompletionMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub role: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl ChatModel for OpenAIClient {
    type Error = OpenAIError;

    async fn complete(&self, request: ChatRequest) -> Result<String, Self::Error> {
        let response = self
            .send_completion_request(&self.chat_model, &request)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to complete chat"))?;

        response
            .content()
            .map(|c| c.trim().to_string())
            .ok_or(OpenAIError::EmptyResponse)
    }

    async fn complete_streaming<F>(
        &self,
        request: ChatRequest,
        on_delta: F,
    ) -> Result<String, Self::Error>
    where
        F: FnMut(&str) + Send,
    {
        self.stream_completion(&self.chat_model, &request, on_delta)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to stream chat"))
    }
}

impl Embedder for OpenAIClient {
    type Error = OpenAIError;

    async fn embed(&self, input: &str) -> Result<Vec<f32>, Self::Error> {
        self.send_embedding_request(&self.embedding_model, input)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to embed input"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChatMessage;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> OpenAIClient {
        OpenAIClient::new("secret")
            .with_base_url(server.url("/v1"))
            .with_chat_model("gemma-3-4b-it-q8_0")
            .with_max_retries(0)
    }

    #[tokio::test]
    async fn test_complete_returns_trimmed_first_choice() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer secret")
                    .json_body_partial(
                        r#"{"model": "gemma-3-4b-it-q8_0", "stream": false, "temperature": 0.5}"#,
                    );
                then.status(200).json_body(json!({
                    "id": "cmpl-1",
                    "choices": [{
                        "index": 0,
                        "message": {"role": "assistant", "content": "  Paris.\n"},
                        "finish_reason": "stop"
                    }]
                }));
            })
            .await;

        let request =
            ChatRequest::new(vec![ChatMessage::user("Capital of France?")]).with_temperature(0.5);
        let reply = client_for(&server).complete(request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(reply, "Paris.");
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(400).body("model not loaded");
            })
            .await;

        let err = client_for(&server)
            .complete(ChatRequest::new(vec![ChatMessage::user("hi")]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OpenAIError::Api { status: 400, ref message } if message == "model not loaded"
        ));
    }

    #[tokio::test]
    async fn test_missing_content_is_empty_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({"choices": []}));
            })
            .await;

        let err = client_for(&server)
            .complete(ChatRequest::new(vec![ChatMessage::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, OpenAIError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_streaming_forwards_deltas_in_order() {
        let server = MockServer::start_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            ": keep-alive\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        );
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .json_body_partial(r#"{"stream": true}"#);
                then.status(200)
                    .header("content-type", "text/event-stream")
                    .body(body);
            })
            .await;

        let mut deltas = Vec::new();
        let reply = client_for(&server)
            .complete_streaming(ChatRequest::new(vec![ChatMessage::user("hi")]), |d| {
                deltas.push(d.to_string())
            })
            .await
            .unwrap();

        assert_eq!(reply, "Hello");
        assert_eq!(deltas, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_streaming_without_done_still_returns_reply() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200)
                    .body("data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}");
            })
            .await;

        let reply = client_for(&server)
            .complete_streaming(ChatRequest::new(vec![ChatMessage::user("hi")]), |_| {})
            .await
            .unwrap();
        assert_eq!(reply, "partial");
    }

    #[tokio::test]
    async fn test_malformed_stream_chunk_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).body("data: {not json}\n\n");
            })
            .await;

        let err = client_for(&server)
            .complete_streaming(ChatRequest::new(vec![ChatMessage::user("hi")]), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, OpenAIError::Stream(_)));
    }

    #[tokio::test]
    async fn test_embed_returns_first_vector() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/embeddings").json_body(json!({
                    "model": "nomic-embed-text-v1.5.q8_0",
                    "input": ["rust is fast"]
                }));
                then.status(200).json_body(json!({
                    "data": [{"index": 0, "embedding": [0.25, -0.5, 1.0]}]
                }));
            })
            .await;

        let embedding = client_for(&server).embed("rust is fast").await.unwrap();

        mock.assert_async().await;
        assert_eq!(embedding, vec![0.25, -0.5, 1.0]);
    }

    #[tokio::test]
    async fn test_embed_with_no_data_is_empty_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/embeddings");
                then.status(200).json_body(json!({"data": []}));
            })
            .await;

        let err = client_for(&server).embed("x").await.unwrap_err();
        assert!(matches!(err, OpenAIError::EmptyResponse));
    }
}
