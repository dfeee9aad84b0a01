use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use llm_relay::Embedder;

#[derive(Clone)]
pub struct MockEmbedder {
    pub vectors: HashMap<String, Vec<f32>>,
    pub default: Vec<f32>,
    pub calls: Arc<Mutex<Vec<String>>>,
    /// Inputs containing this text fail to embed.
    pub fail_on: Option<String>,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self {
            vectors: HashMap::new(),
            default: vec![0.5, 0.5, 0.5],
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_on: None,
        }
    }
}

impl MockEmbedder {
    pub fn with_vectors(vectors: &[(&str, Vec<f32>)]) -> Self {
        Self {
            vectors: vectors
                .iter()
                .map(|(text, v)| (text.to_string(), v.clone()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn failing_on(needle: &str) -> Self {
        Self {
            fail_on: Some(needle.to_string()),
            ..Default::default()
        }
    }
}

impl Embedder for MockEmbedder {
    type Error = anyhow::Error;

    async fn embed(&self, input: &str) -> Result<Vec<f32>, Self::Error> {
        self.calls.lock().unwrap().push(input.to_string());
        if let Some(ref needle) = self.fail_on {
            if input.contains(needle.as_str()) {
                return Err(anyhow::anyhow!("embedding backend unavailable"));
            }
        }
        Ok(self
            .vectors
            .get(input)
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }
}
