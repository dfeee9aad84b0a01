use std::path::PathBuf;

use itertools::Itertools;

use crate::{
    prompt::{audio_part, image_part, ContentPart},
    tools::read_document,
    ChatMessage, ChatModel, ChatRequest,
};

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// A prompt about one or more images, optionally grounded by a subtitle or
/// transcript file.
#[derive(Debug, Clone)]
pub struct VisionPrompt {
    pub prompt: String,
    pub images: Vec<PathBuf>,
    pub subtitles: Option<PathBuf>,
    pub max_tokens: Option<i32>,
}

impl VisionPrompt {
    fn image_list(&self) -> String {
        self.images
            .iter()
            .map(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| p.display().to_string())
            })
            .join(", ")
    }

    /// Builds the request: a system message, the text and image parts in one
    /// user message, then the subtitles (when given) as two more user messages.
    pub async fn into_request(self) -> anyhow::Result<ChatRequest> {
        if self.images.is_empty() {
            anyhow::bail!("At least one image is required");
        }

        let mut parts = vec![ContentPart::Text {
            text: format!("{} The images are: {}", self.prompt, self.image_list()),
        }];
        for image in &self.images {
            parts.push(image_part(image).await?);
        }

        let mut messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user_parts(parts),
        ];
        if let Some(subtitles) = &self.subtitles {
            let text = read_document(subtitles).await?;
            messages.push(ChatMessage::user("These are the subtitles for the video:"));
            messages.push(ChatMessage::user(text));
        }

        Ok(ChatRequest::new(messages).with_max_tokens(self.max_tokens))
    }
}

pub struct Vision<C> {
    chat: C,
}

impl<C: ChatModel> Vision<C> {
    pub fn new(chat: C) -> Self {
        Self { chat }
    }

    #[tracing::instrument(skip_all, fields(images = prompt.images.len()))]
    pub async fn describe(&self, prompt: VisionPrompt) -> anyhow::Result<String> {
        let request = prompt.into_request().await?;

        self.chat
            .complete(request)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to complete vision prompt: {e}"))
    }

    /// Sends a prompt together with a wav or mp3 file.
    #[tracing::instrument(skip(self))]
    pub async fn listen(&self, prompt: &str, audio: &std::path::Path) -> anyhow::Result<String> {
        let parts = vec![
            ContentPart::Text {
                text: prompt.to_string(),
            },
            audio_part(audio).await?,
        ];

        let request = ChatRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user_parts(parts),
        ])
        .with_temperature(0.8);

        self.chat
            .complete(request)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to complete audio prompt: {e}"))
    }
}
