//! Post-processing helpers shared by every tool that reads model output.

use std::sync::LazyLock;

use regex::Regex;

static THINK_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"https?://[^\s"']+"#).unwrap());

/// Removes `<think>...</think>` reasoning blocks emitted by reasoning models.
pub fn strip_think_blocks(text: &str) -> String {
    THINK_BLOCK_RE.replace_all(text, "").into_owned()
}

/// Drops a leading ```` ```lang ```` line and a trailing ```` ``` ```` line.
pub fn strip_code_fence(text: &str) -> String {
    let mut lines = text.trim().lines().collect::<Vec<_>>();

    if lines.first().is_some_and(|l| l.trim_start().starts_with("```")) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|l| l.trim() == "```") {
        lines.pop();
    }

    lines.join("\n")
}

/// Normalises a line before it is sent to the embeddings endpoint.
pub fn clean_for_embedding(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '"' | '*' | '\''))
        .collect()
}

pub fn first_url(text: &str) -> Option<&str> {
    URL_RE.find(text).map(|m| m.as_str())
}

/// Interprets a fact extraction reply.
///
/// A JSON array of strings is taken as-is, anything else is split into
/// non-blank lines. A reply with neither is returned whole as a single fact.
pub fn parse_fact_lines(reply: &str) -> Vec<String> {
    if let Ok(facts) = serde_json::from_str::<Vec<String>>(reply) {
        return facts;
    }

    let lines = reply
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect::<Vec<_>>();

    if lines.is_empty() {
        vec![reply.to_string()]
    } else {
        lines
    }
}

pub fn non_blank_lines(text: &str) -> String {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
