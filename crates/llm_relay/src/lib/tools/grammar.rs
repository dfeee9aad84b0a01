use std::{io::Write, path::Path};

use crate::{prompt::PromptSet, tools::read_document, ChatModel};

const SYSTEM_PROMPT: &str = "You are a grammar checking assistant. You will be provided with a sentence, and you should respond with the corrected sentence. If the sentence is already grammatically correct, respond with the original sentence.";
const PREPROMPT: &str = "The following is the sentence. It may seem strange or archaic, but it is the sentence as provided and should be judged as is. If it is too archaic to fix, leave it as it is. There are no further rules or instructions. The following is the sentence you are correcting:";
const SEPARATOR: &str = "--------------------";

fn is_word_char(c: Option<char>) -> bool {
    c.is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Splits after `.`, `?` or `!` followed by whitespace.
///
/// Dotted abbreviations ("e.g.", "U.S.") and short titles ("Mr.", "Dr.") do
/// not end a sentence. Blank pieces are dropped and the rest trimmed.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let chars = text.char_indices().collect::<Vec<_>>();
    let mut sentences = Vec::new();
    let mut start = 0;

    for (n, &(i, c)) in chars.iter().enumerate() {
        if !c.is_whitespace() {
            continue;
        }
        let before = |k: usize| n.checked_sub(k).map(|j| chars[j].1);
        if !matches!(before(1), Some('.' | '?' | '!')) {
            continue;
        }

        let dotted = is_word_char(before(4)) && before(3) == Some('.') && is_word_char(before(2));
        let title = before(3).is_some_and(char::is_uppercase)
            && before(2).is_some_and(char::is_lowercase)
            && before(1) == Some('.');
        if dotted || title {
            continue;
        }

        sentences.push(&text[start..i]);
        start = i + c.len_utf8();
    }
    sentences.push(&text[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Sentence by sentence grammar correction of a text file.
pub struct GrammarChecker<C> {
    chat: C,
    temperature: f32,
}

impl<C: ChatModel> GrammarChecker<C> {
    pub fn new(chat: C) -> Self {
        Self {
            chat,
            temperature: 0.7,
        }
    }

    async fn correct(&self, sentence: &str) -> anyhow::Result<String> {
        let request = PromptSet::new(SYSTEM_PROMPT)
            .preprompt(PREPROMPT)
            .document(sentence)
            .into_request(self.temperature);

        let reply = self
            .chat
            .complete_streaming(request, |_| {})
            .await
            .map_err(|e| anyhow::anyhow!("Failed to check sentence: {e}"))?;

        Ok(reply.trim().to_string())
    }

    /// Prints each sentence with its correction. Returns the number of
    /// sentences checked.
    #[tracing::instrument(skip(self, out))]
    pub async fn run<W: Write>(&self, path: &Path, out: &mut W) -> anyhow::Result<usize> {
        let text = read_document(path).await?;
        let sentences = split_sentences(&text);

        for sentence in &sentences {
            writeln!(out, "Original: {sentence}")?;
            let corrected = self.correct(sentence).await?;
            writeln!(out, "Corrected: {corrected}")?;
            writeln!(out, "{SEPARATOR}")?;
        }

        Ok(sentences.len())
    }
}
