use std::{io::Write, path::Path};

use relay_datastore::{EmbeddingRecord, EmbeddingStore};

use crate::{text::clean_for_embedding, tools::read_document, Embedder};

#[derive(Debug, Default, PartialEq)]
pub struct LineEmbedReport {
    pub stored: usize,
    pub failed: usize,
}

/// Embeds every non-blank line of a file.
pub struct LineEmbedder<E, S> {
    embedder: E,
    store: S,
}

impl<E: Embedder, S: EmbeddingStore> LineEmbedder<E, S> {
    pub fn new(embedder: E, store: S) -> Self {
        Self { embedder, store }
    }

    /// Records are echoed to `out` as JSON lines and appended to the store.
    /// Lines that fail to embed are reported on `out` and skipped.
    #[tracing::instrument(skip(self, out))]
    pub async fn run<W: Write>(&self, path: &Path, out: &mut W) -> anyhow::Result<LineEmbedReport> {
        let document = read_document(path).await?;
        let source = path.display().to_string();

        let mut records = Vec::new();
        let mut failed = 0;

        for line in document.lines().map(clean_for_embedding) {
            if line.is_empty() {
                continue;
            }

            match self.embedder.embed(&line).await {
                Ok(embedding) => {
                    let record = EmbeddingRecord::new(&source, line, embedding);
                    writeln!(out, "{}", serde_json::to_string(&record)?)?;
                    records.push(record);
                }
                Err(e) => {
                    tracing::error!(error = %e, %line, "Failed to embed line");
                    writeln!(out, "Error processing line '{line}': {e}")?;
                    failed += 1;
                }
            }
        }

        let stored = self.store.append(&records).await?;
        Ok(LineEmbedReport { stored, failed })
    }
}
