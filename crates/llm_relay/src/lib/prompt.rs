//! Chat message types and the prompt shapes the tools send.
//!
//! Almost every tool sends the same layout: a system message followed by up
//! to three user messages (a preprompt, the document and a postprompt).
//! [`PromptSet`] captures that layout once.

use std::{borrow::Cow, path::Path};

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
    InputAudio { input_audio: InputAudio },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputAudio {
    pub data: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Content,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Content::Text(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::Text(content.into()),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::Text(content.into()),
        }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: Content::Parts(parts),
        }
    }

    /// The message text, if it is a plain text message.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            Content::Parts(_) => None,
        }
    }
}

/// Everything needed for a chat completion except the model name, which the
/// client owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i32>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<i32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PromptSet {
    pub system: String,
    pub preprompt: Option<String>,
    pub document: Option<String>,
    pub postprompt: Option<String>,
}

impl PromptSet {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            ..Default::default()
        }
    }

    pub fn preprompt(mut self, preprompt: impl Into<String>) -> Self {
        self.preprompt = Some(preprompt.into());
        self
    }

    pub fn document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    pub fn postprompt(mut self, postprompt: impl Into<String>) -> Self {
        self.postprompt = Some(postprompt.into());
        self
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        std::iter::once(ChatMessage::system(self.system))
            .chain(
                [self.preprompt, self.document, self.postprompt]
                    .into_iter()
                    .flatten()
                    .map(ChatMessage::user),
            )
            .collect()
    }

    pub fn into_request(self, temperature: f32) -> ChatRequest {
        ChatRequest::new(self.into_messages()).with_temperature(temperature)
    }
}

fn image_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// Reads an image and inlines it as a base64 `data:` URL.
pub async fn image_part(path: &Path) -> Result<ContentPart, Error> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::read_input(path, e))?;

    Ok(ContentPart::ImageUrl {
        image_url: ImageUrl {
            url: format!("data:{};base64,{}", image_mime(path), STANDARD.encode(bytes)),
        },
    })
}

pub async fn audio_part(path: &Path) -> Result<ContentPart, Error> {
    let format = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("mp3") => "mp3",
        _ => "wav",
    };

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::read_input(path, e))?;

    Ok(ContentPart::InputAudio {
        input_audio: InputAudio {
            data: STANDARD.encode(bytes),
            format: format.to_string(),
        },
    })
}

/// Cuts `text` down to at most `limit` cl100k tokens.
///
/// Returns the input untouched when it already fits.
pub fn truncate_to_tokens(text: &str, limit: usize) -> Result<Cow<'_, str>, Error> {
    let bpe = another_tiktoken_rs::cl100k_base().map_err(|e| Error::Tokenizer(e.to_string()))?;
    let tokens = bpe.encode_with_special_tokens(text);

    if tokens.len() <= limit {
        return Ok(Cow::Borrowed(text));
    }

    tracing::warn!(
        tokens = tokens.len(),
        limit,
        "Document exceeds context budget, truncating"
    );

    // a cut can land inside a multi-byte character; back off a few tokens
    for cut in (limit.saturating_sub(4)..=limit).rev() {
        if let Ok(truncated) = bpe.decode(tokens[..cut].to_vec()) {
            return Ok(Cow::Owned(truncated));
        }
    }

    Err(Error::Tokenizer(format!(
        "Failed to decode a prefix of {limit} tokens"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prompt_set_orders_messages() {
        let messages = PromptSet::new("You are a helpful assistant.")
            .preprompt("The following is the contents of a.txt:")
            .document("hello")
            .postprompt("Summarize it.")
            .into_messages();

        let rendered = messages
            .iter()
            .map(|m| (m.role, m.text().unwrap()))
            .collect::<Vec<_>>();
        assert_eq!(
            rendered,
            vec![
                (Role::System, "You are a helpful assistant."),
                (Role::User, "The following is the contents of a.txt:"),
                (Role::User, "hello"),
                (Role::User, "Summarize it."),
            ]
        );
    }

    #[test]
    fn test_prompt_set_skips_missing_parts() {
        let messages = PromptSet::new("sys").postprompt("only this").into_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text(), Some("only this"));
    }

    #[test]
    fn test_request_serializes_without_unset_options() {
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"messages": [{"role": "user", "content": "hi"}]})
        );
    }

    #[test]
    fn test_multimodal_parts_serialize_in_openai_shape() {
        let message = ChatMessage::user_parts(vec![
            ContentPart::Text {
                text: "what is this?".into(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: "data:image/png;base64,AAAA".into(),
                },
            },
            ContentPart::InputAudio {
                input_audio: InputAudio {
                    data: "BBBB".into(),
                    format: "wav".into(),
                },
            },
        ]);

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "what is this?"},
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}},
                    {"type": "input_audio", "input_audio": {"data": "BBBB", "format": "wav"}}
                ]
            })
        );
    }

    #[test]
    fn test_image_mime_from_extension() {
        assert_eq!(image_mime(Path::new("a.PNG")), "image/png");
        assert_eq!(image_mime(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(image_mime(Path::new("noext")), "image/jpeg");
    }

    #[tokio::test]
    async fn test_image_part_missing_file_names_path() {
        let err = image_part(Path::new("/definitely/not/here.png"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.png"));
    }

    #[test]
    fn test_truncate_to_tokens_keeps_short_text() {
        let text = "A short document.";
        let result = truncate_to_tokens(text, 100).unwrap();
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn test_truncate_to_tokens_cuts_long_text() {
        let text = "word ".repeat(500);
        let result = truncate_to_tokens(&text, 10).unwrap();
        assert!(result.len() < text.len());
        assert!(text.starts_with(result.as_ref()));
    }
}
