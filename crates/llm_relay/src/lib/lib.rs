pub mod config;
mod error;
pub mod feed;
pub mod llm;
pub mod media;
pub mod prompt;
pub mod text;
pub mod tools;
pub mod tracing;
pub mod tubearchivist;

pub use error::Error;
pub use llm::openai;
pub use llm::{chat::ChatModel, embedder::Embedder, transcriber::Transcriber};
pub use prompt::{ChatMessage, ChatRequest, PromptSet};
pub use tools::digest::NewsDigestBuilder;
