use std::{io::Write, path::Path};

use relay_datastore::{EmbeddingRecord, EmbeddingStore};

use crate::{
    prompt::{truncate_to_tokens, PromptSet},
    text::{clean_for_embedding, parse_fact_lines},
    tools::read_document,
    ChatModel, Embedder,
};

const SYSTEM_PROMPT: &str = "You are a concise fact extraction assistant. Given a document, extract every distinct factual statement or description, output each as a single short sentence on its own line. Do not include introductions, explanations, or duplicate information. For any code snippets, describe their purpose in one sentence instead of reproducing the code.";
const POSTPROMPT: &str = "List all extracted facts, one per line, using concise sentences. Ensure each fact is self‑contained and omit any extra commentary.";

#[derive(Debug, Default)]
pub struct FactReport {
    pub facts: Vec<String>,
    pub stored: usize,
    pub failed: usize,
}

/// Splits a document into standalone facts and stores an embedding for each.
pub struct FactExtractor<C, E, S> {
    chat: C,
    embedder: E,
    store: S,
    temperature: f32,
    max_context_tokens: Option<usize>,
}

impl<C, E, S> FactExtractor<C, E, S>
where
    C: ChatModel,
    E: Embedder,
    S: EmbeddingStore,
{
    pub fn new(chat: C, embedder: E, store: S) -> Self {
        Self {
            chat,
            embedder,
            store,
            temperature: 1.0,
            max_context_tokens: None,
        }
    }

    pub fn max_context_tokens(mut self, limit: Option<usize>) -> Self {
        self.max_context_tokens = limit;
        self
    }

    #[tracing::instrument(skip(self, out))]
    async fn extract_facts<W: Write>(
        &self,
        document_path: &Path,
        out: &mut W,
    ) -> anyhow::Result<Vec<String>> {
        let document = read_document(document_path).await?;
        let document = match self.max_context_tokens {
            Some(limit) => truncate_to_tokens(&document, limit)?.into_owned(),
            None => document,
        };

        let name = document_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let request = PromptSet::new(SYSTEM_PROMPT)
            .preprompt(format!("Document name: '{name}'. Analyze its content."))
            .document(document)
            .postprompt(POSTPROMPT)
            .into_request(self.temperature);

        let reply = self
            .chat
            .complete(request)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to extract facts: {e}"))?;

        let facts = parse_fact_lines(reply.trim());
        for fact in &facts {
            writeln!(out, "{fact}")?;
        }
        Ok(facts)
    }

    /// Extracts facts from `document_path`, prints them, then embeds each one.
    /// A fact that fails to embed is reported and skipped.
    pub async fn run<W: Write>(&self, document_path: &Path, out: &mut W) -> anyhow::Result<FactReport> {
        let facts = self.extract_facts(document_path, out).await?;
        let source = document_path.display().to_string();

        let mut records = Vec::with_capacity(facts.len());
        let mut failed = 0;

        for fact in facts.iter().filter(|f| !f.trim().is_empty()) {
            match self.embedder.embed(&clean_for_embedding(fact)).await {
                Ok(embedding) => records.push(EmbeddingRecord::new(&source, fact, embedding)),
                Err(e) => {
                    tracing::error!(error = %e, fact, "Failed to embed fact");
                    writeln!(out, "Error processing fact '{fact}': {e}")?;
                    failed += 1;
                }
            }
        }

        let stored = self.store.overwrite(&records).await?;
        tracing::info!(stored, failed, "Stored fact embeddings");

        Ok(FactReport {
            facts,
            stored,
            failed,
        })
    }
}
