pub mod chat;
pub mod embedder;
pub mod feed;
pub mod media;
pub mod store;
