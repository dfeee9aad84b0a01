pub mod chat;
pub mod embedder;
pub mod openai;
mod sse;
pub mod transcriber;
pub mod whisper;
