use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::io::AsyncWriteExt;

use crate::{
    datastore::{EmbeddingStore, StoreError},
    EmbeddingRecord,
};

/// Embedding records stored as JSON lines, one record per line.
#[derive(Debug, Clone)]
pub struct JsonlEmbeddingStore {
    path: PathBuf,
}

impl JsonlEmbeddingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `notes/meeting.txt` -> `notes/meeting.embeddings`
    pub fn for_document(document: impl AsRef<Path>) -> Self {
        Self::new(document.as_ref().with_extension("embeddings"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode(records: &[EmbeddingRecord]) -> Result<String, StoreError> {
        let mut buf = String::new();
        for record in records {
            buf.push_str(&serde_json::to_string(record)?);
            buf.push('\n');
        }
        Ok(buf)
    }

    fn decode(contents: &str) -> Result<Vec<EmbeddingRecord>, StoreError> {
        contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str::<EmbeddingRecord>(line)
                    .map_err(|source| StoreError::Malformed {
                        line: idx + 1,
                        source,
                    })
            })
            .collect()
    }
}

impl EmbeddingStore for JsonlEmbeddingStore {
    async fn append(&self, records: &[EmbeddingRecord]) -> anyhow::Result<usize> {
        let buf = Self::encode(records)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, path = ?self.path, "Failed to open embeddings file"))
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;

        Ok(records.len())
    }

    async fn overwrite(&self, records: &[EmbeddingRecord]) -> anyhow::Result<usize> {
        let buf = Self::encode(records)?;

        tokio::fs::write(&self.path, buf)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, path = ?self.path, "Failed to write embeddings file"))
            .with_context(|| format!("Failed to write {}", self.path.display()))?;

        Ok(records.len())
    }

    async fn load(&self) -> anyhow::Result<Vec<EmbeddingRecord>> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        let records = Self::decode(&contents)
            .inspect_err(|e| tracing::error!(error = %e, path = ?self.path, "Failed to decode embeddings"))?;

        tracing::debug!(count = records.len(), path = ?self.path, "Loaded embeddings");
        Ok(records)
    }
}
