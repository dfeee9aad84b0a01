use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::{
    prompt::PromptSet,
    text::strip_think_blocks,
    tools::{echo_to, read_document},
    ChatModel,
};

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const UNSORTED_DIR: &str = "unsorted";
const SORTED_DIR: &str = "sorted";

#[derive(Debug, Default)]
pub struct SortReport {
    /// (file name, category)
    pub copied: Vec<(String, String)>,
    /// (file name, category the model proposed)
    pub rejected: Vec<(String, String)>,
    pub failed: Vec<String>,
}

/// Drops think blocks, then any surrounding whitespace, backticks, quotes
/// and slashes, so "`recipes/`" names the `recipes` category.
fn normalize_category(reply: &str) -> String {
    strip_think_blocks(reply)
        .trim()
        .trim_matches(|c: char| matches!(c, '`' | '"' | '\'' | '/') || c.is_whitespace())
        .to_string()
}

/// Files documents from `<root>/unsorted` into one of the existing
/// subdirectories of `<root>/sorted`, letting the model pick the category.
///
/// Files are copied, never moved.
pub struct DocumentSorter<C> {
    chat: C,
    root: PathBuf,
    temperature: f32,
}

impl<C: ChatModel> DocumentSorter<C> {
    pub fn new(chat: C, root: impl Into<PathBuf>) -> Self {
        Self {
            chat,
            root: root.into(),
            temperature: 0.7,
        }
    }

    fn require_dir(&self, name: &str) -> anyhow::Result<PathBuf> {
        let dir = self.root.join(name);
        if !dir.is_dir() {
            anyhow::bail!("'{}' directory not found", dir.display());
        }
        Ok(dir)
    }

    async fn list_entries(dir: &Path, want_dirs: bool) -> anyhow::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("Error reading '{}' directory", dir.display()))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            let matches = if want_dirs {
                file_type.is_dir()
            } else {
                file_type.is_file()
            };
            if matches {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    #[tracing::instrument(skip(self, categories, out))]
    async fn choose_category<W: Write + Send>(
        &self,
        file_path: &Path,
        categories: &[String],
        out: &mut W,
    ) -> anyhow::Result<String> {
        let document = read_document(file_path).await?;
        let filename = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let request = PromptSet::new(SYSTEM_PROMPT)
            .preprompt(format!("The following is the contents of {filename}:\n\n"))
            .document(document)
            .postprompt(format!(
                "Based on the content of this document, which subdirectory in '{SORTED_DIR}' should it be placed in?  The options are: {}.  Just respond with the name of the directory.",
                categories.join(", ")
            ))
            .into_request(self.temperature);

        let reply = self
            .chat
            .complete_streaming(request, echo_to(out))
            .await
            .map_err(|e| anyhow::anyhow!("Error during LLM completion: {e}"))?;
        writeln!(out, "\n")?;

        Ok(normalize_category(&reply))
    }

    pub async fn run<W: Write + Send>(&self, out: &mut W) -> anyhow::Result<SortReport> {
        let unsorted = self.require_dir(UNSORTED_DIR)?;
        let sorted = self.require_dir(SORTED_DIR)?;

        let files = Self::list_entries(&unsorted, false).await?;
        let categories = Self::list_entries(&sorted, true).await?;
        tracing::info!(files = files.len(), categories = categories.len(), "Sorting documents");

        let mut report = SortReport::default();

        for filename in files {
            let file_path = unsorted.join(&filename);

            let category = match self.choose_category(&file_path, &categories, out).await {
                Ok(category) if !category.is_empty() => category,
                Ok(_) => {
                    writeln!(out, "Failed to process '{filename}'.")?;
                    report.failed.push(filename);
                    continue;
                }
                Err(e) => {
                    tracing::error!(error = %e, %filename, "Failed to categorize document");
                    writeln!(out, "Failed to process '{filename}': {e}")?;
                    report.failed.push(filename);
                    continue;
                }
            };

            // only accept one of the listed directories, never an arbitrary path
            if !categories.contains(&category) {
                writeln!(
                    out,
                    "Error: Category directory '{category}' does not exist in '{SORTED_DIR}'."
                )?;
                report.rejected.push((filename, category));
                continue;
            }

            let destination_dir = sorted.join(&category);
            match tokio::fs::copy(&file_path, destination_dir.join(&filename)).await {
                Ok(_) => {
                    writeln!(out, "Copied '{filename}' to '{}'.", destination_dir.display())?;
                    report.copied.push((filename, category));
                }
                Err(e) => {
                    tracing::error!(error = %e, %filename, "Failed to copy document");
                    writeln!(
                        out,
                        "Error copying '{filename}' to '{}': {e}",
                        destination_dir.display()
                    )?;
                    report.failed.push(filename);
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_category() {
        assert_eq!(normalize_category("  invoices\n"), "invoices");
        assert_eq!(normalize_category("`recipes/`"), "recipes");
        assert_eq!(normalize_category("'/food/recipes/'"), "food/recipes");
        assert_eq!(
            normalize_category("<think>hmm, food</think>\n\"recipes\""),
            "recipes"
        );
    }
}
