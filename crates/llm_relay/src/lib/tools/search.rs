use relay_datastore::{rank, EmbeddingStore, SearchHit};

use crate::Embedder;

/// Semantic search over a stored embeddings file.
pub struct Search<E, S> {
    embedder: E,
    store: S,
}

impl<E: Embedder, S: EmbeddingStore> Search<E, S> {
    pub fn new(embedder: E, store: S) -> Self {
        Self { embedder, store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn run(&self, query: &str, top_n: usize) -> anyhow::Result<Vec<SearchHit>> {
        let records = self.store.load().await?;
        if records.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(&query.to_lowercase())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to embed search phrase: {e}"))?;

        Ok(rank(&query_embedding, &records, top_n)?)
    }
}

/// `<rank>:"<text>":<score>` lines, best match first. Empty when there are
/// no hits.
pub fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("{}:\"{}\":{:.2}\n", i + 1, hit.text, hit.score))
        .collect()
}
