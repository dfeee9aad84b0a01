use std::{io::Write, path::PathBuf};

use crate::{
    prompt::{truncate_to_tokens, PromptSet},
    tools::{echo_to, read_document},
    ChatMessage, ChatModel, ChatRequest,
};

/// A document prompt: system, preprompt, document, postprompt.
#[derive(Debug, Clone)]
pub struct FilePrompt {
    pub document_path: PathBuf,
    pub system: String,
    pub preprompt: String,
    pub postprompt: String,
    pub temperature: f32,
    pub max_context_tokens: Option<usize>,
}

/// Two documents in one request: system, preprompt, first document, first
/// postprompt, second document, second postprompt.
#[derive(Debug, Clone)]
pub struct FilePairPrompt {
    pub first_path: PathBuf,
    pub second_path: PathBuf,
    pub system: String,
    pub preprompt: String,
    pub first_postprompt: String,
    pub second_postprompt: String,
    pub temperature: f32,
}

impl FilePairPrompt {
    async fn into_request(self) -> anyhow::Result<ChatRequest> {
        let first = read_document(&self.first_path).await?;
        let second = read_document(&self.second_path).await?;

        let messages = vec![
            ChatMessage::system(self.system),
            ChatMessage::user(self.preprompt),
            ChatMessage::user(first),
            ChatMessage::user(self.first_postprompt),
            ChatMessage::user(second),
            ChatMessage::user(self.second_postprompt),
        ];
        Ok(ChatRequest::new(messages).with_temperature(self.temperature))
    }
}

pub struct Ask<C> {
    chat: C,
}

impl<C: ChatModel> Ask<C> {
    pub fn new(chat: C) -> Self {
        Self { chat }
    }

    /// Single system + user prompt, non-streaming.
    #[tracing::instrument(skip_all)]
    pub async fn chat(&self, system: &str, prompt: &str, temperature: f32) -> anyhow::Result<String> {
        let request = PromptSet::new(system)
            .postprompt(prompt)
            .into_request(temperature);

        let reply = self
            .chat
            .complete(request)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to complete prompt: {e}"))?;

        Ok(reply.trim().to_string())
    }

    /// Sends a document wrapped in a pre/post prompt and streams the reply to
    /// `out`.
    #[tracing::instrument(skip_all, fields(document = %prompt.document_path.display()))]
    pub async fn file<W: Write + Send>(
        &self,
        prompt: &FilePrompt,
        out: &mut W,
    ) -> anyhow::Result<String> {
        let document = read_document(&prompt.document_path).await?;
        let document = match prompt.max_context_tokens {
            Some(limit) => truncate_to_tokens(&document, limit)?.into_owned(),
            None => document,
        };

        let request = PromptSet::new(&prompt.system)
            .preprompt(&prompt.preprompt)
            .document(document)
            .postprompt(&prompt.postprompt)
            .into_request(prompt.temperature);

        let reply = self
            .chat
            .complete_streaming(request, echo_to(out))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to complete document prompt: {e}"))?;
        writeln!(out)?;

        Ok(reply)
    }

    /// Compares or combines two documents, non-streaming.
    #[tracing::instrument(skip_all, fields(first = %prompt.first_path.display(), second = %prompt.second_path.display()))]
    pub async fn file_pair(&self, prompt: FilePairPrompt) -> anyhow::Result<String> {
        let request = prompt.into_request().await?;

        let reply = self
            .chat
            .complete(request)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to complete two-document prompt: {e}"))?;

        Ok(reply.trim().to_string())
    }
}
