//! # DataStore Module
//!
//! Local persistence for the relay tools: embedding records written by the
//! fact extractor and line embedder, and the ledger of feed URLs that have
//! already been summarized.
//!
//! Both stores sit behind traits so the pipelines in `llm_relay` can be driven
//! by in-memory mocks in tests.

mod datastore;
mod domain;
mod similarity;

pub use datastore::jsonl::JsonlEmbeddingStore;
pub use datastore::ledger::FileUrlLedger;
pub use datastore::{EmbeddingStore, StoreError, UrlLedger};
pub use domain::{EmbeddingRecord, SearchHit};
pub use similarity::{cosine_similarity, rank};
