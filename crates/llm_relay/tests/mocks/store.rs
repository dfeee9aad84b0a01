use std::sync::{Arc, Mutex};

use relay_datastore::{EmbeddingRecord, EmbeddingStore};

#[derive(Clone, Default)]
pub struct MockEmbeddingStore {
    pub records: Arc<Mutex<Vec<EmbeddingRecord>>>,
    pub overwrites: Arc<Mutex<usize>>,
}

impl MockEmbeddingStore {
    pub fn with_records(records: Vec<EmbeddingRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            ..Default::default()
        }
    }
}

impl EmbeddingStore for MockEmbeddingStore {
    async fn append(&self, records: &[EmbeddingRecord]) -> anyhow::Result<usize> {
        self.records.lock().unwrap().extend_from_slice(records);
        Ok(records.len())
    }

    async fn overwrite(&self, records: &[EmbeddingRecord]) -> anyhow::Result<usize> {
        *self.overwrites.lock().unwrap() += 1;
        *self.records.lock().unwrap() = records.to_vec();
        Ok(records.len())
    }

    async fn load(&self) -> anyhow::Result<Vec<EmbeddingRecord>> {
        Ok(self.records.lock().unwrap().clone())
    }
}
