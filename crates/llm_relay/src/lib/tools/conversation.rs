use std::{
    io::{BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use tokio::io::AsyncWriteExt;

use crate::{
    prompt::{ChatMessage, ChatRequest, PromptSet},
    tools::read_document,
    ChatModel,
};

const EXIT_WORDS: [&str; 2] = ["exit", "quit"];
const MEMORY_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Interactive multi-turn chat, optionally backed by a memory file that the
/// model may extend with facts worth remembering.
pub struct Conversation<C> {
    chat: C,
    temperature: f32,
    memory_file: Option<PathBuf>,
    history: Vec<ChatMessage>,
}

impl<C: ChatModel> Conversation<C> {
    pub fn new(chat: C, system: &str, initial_prompt: &str, temperature: f32) -> Self {
        Self {
            chat,
            temperature,
            memory_file: None,
            history: vec![
                ChatMessage::system(system),
                ChatMessage::user(initial_prompt),
            ],
        }
    }

    /// Seeds the history with the memory file contents, right after the
    /// system message.
    pub async fn with_memory_file(mut self, path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let contents = read_document(&path).await?;
        self.history.insert(1, ChatMessage::user(contents));
        self.memory_file = Some(path);
        Ok(self)
    }

    /// Seeds the history with a reference document, right after the system
    /// message. Unlike a memory file it is never written to.
    pub async fn with_document(mut self, path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = read_document(path.as_ref()).await?;
        self.history.insert(1, ChatMessage::user(contents));
        Ok(self)
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Runs until the user types `exit`/`quit` or input ends. Returns the
    /// number of assistant replies.
    pub async fn run<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        out: &mut W,
    ) -> anyhow::Result<usize> {
        let mut replies = 0;

        loop {
            let request =
                ChatRequest::new(self.history.clone()).with_temperature(self.temperature);
            let reply = self
                .chat
                .complete(request)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to get assistant reply: {e}"))?;
            let reply = reply.trim().to_string();

            writeln!(out, "Assistant: {reply}")?;
            self.history.push(ChatMessage::assistant(reply));
            replies += 1;

            write!(out, "You: ")?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                break;
            }
            let user_input = line.trim_end_matches(['\r', '\n']).to_string();

            if EXIT_WORDS.contains(&user_input.trim().to_lowercase().as_str()) {
                break;
            }

            if let Some(path) = self.memory_file.clone() {
                self.update_memory(&path, &user_input, out).await?;
            }

            self.history.push(ChatMessage::user(user_input));
        }

        Ok(replies)
    }

    /// Asks the model whether `user_input` is worth remembering and, if so,
    /// appends the suggested text to the memory file.
    #[tracing::instrument(skip(self, user_input, out))]
    async fn update_memory<W: Write>(
        &self,
        path: &Path,
        user_input: &str,
        out: &mut W,
    ) -> anyhow::Result<Option<String>> {
        let memory = read_document(path).await?;

        let check = PromptSet::new(MEMORY_SYSTEM_PROMPT)
            .postprompt(format!(
                "Document content:\n{memory}\n\nUser input:\n{user_input}\n\nDoes the user input contain information we should save in the Document Content to help the user in the future? Answer with 'Yes' or 'No'."
            ))
            .into_request(self.temperature);

        let verdict = self
            .chat
            .complete(check)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run memory change check: {e}"))?;
        let verdict = verdict.trim();
        writeln!(out, "Change Check: {verdict}")?;

        if !verdict.starts_with("Yes") {
            return Ok(None);
        }

        let change = PromptSet::new(MEMORY_SYSTEM_PROMPT)
            .postprompt(format!(
                "Document content:\n{memory}\n\nUser input:\n{user_input}\n\nWhat changes should be made to the document to help you assist the user in the future?\n\nONLY output what should be added. Do NOT output any explanation or any prepended text.  ONLY output the text that should be appended to the document."
            ))
            .into_request(self.temperature);

        let addition = self
            .chat
            .complete(change)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get memory changes: {e}"))?;
        let addition = addition.trim().to_string();
        writeln!(out, "Suggested Changes: {addition}")?;

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("Failed to open memory file {}", path.display()))?;
        file.write_all(format!("\n{addition}").as_bytes()).await?;
        file.flush().await?;

        tracing::info!(path = %path.display(), "Appended to memory file");
        Ok(Some(addition))
    }
}
