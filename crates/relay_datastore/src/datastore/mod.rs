use std::{collections::HashSet, future::Future};

pub mod jsonl;
pub mod ledger;

use crate::EmbeddingRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed record on line {line}: {source}")]
    Malformed {
        line: usize,
        source: serde_json::Error,
    },
    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

pub trait EmbeddingStore {
    fn append(
        &self,
        records: &[EmbeddingRecord],
    ) -> impl Future<Output = anyhow::Result<usize>> + Send;

    /// Replaces whatever the store held with `records`.
    fn overwrite(
        &self,
        records: &[EmbeddingRecord],
    ) -> impl Future<Output = anyhow::Result<usize>> + Send;

    fn load(&self) -> impl Future<Output = anyhow::Result<Vec<EmbeddingRecord>>> + Send;
}

impl<T: EmbeddingStore + Send + Sync> EmbeddingStore for &T {
    async fn append(&self, records: &[EmbeddingRecord]) -> anyhow::Result<usize> {
        (**self).append(records).await
    }

    async fn overwrite(&self, records: &[EmbeddingRecord]) -> anyhow::Result<usize> {
        (**self).overwrite(records).await
    }

    async fn load(&self) -> anyhow::Result<Vec<EmbeddingRecord>> {
        (**self).load().await
    }
}

/// Remembers which URLs have already been processed across runs.
pub trait UrlLedger {
    fn processed_urls(&self) -> impl Future<Output = anyhow::Result<HashSet<String>>> + Send;

    fn record(&self, url: &str) -> impl Future<Output = anyhow::Result<()>> + Send;
}

impl<T: UrlLedger + Send + Sync> UrlLedger for &T {
    async fn processed_urls(&self) -> anyhow::Result<HashSet<String>> {
        (**self).processed_urls().await
    }

    async fn record(&self, url: &str) -> anyhow::Result<()> {
        (**self).record(url).await
    }
}
