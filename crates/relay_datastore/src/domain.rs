use serde::{Deserialize, Serialize};

/// A single embedded piece of text and the document it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub source: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

impl EmbeddingRecord {
    pub fn new(source: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            embedding,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub text: String,
    pub source: String,
    pub score: f32,
}
