use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Parse error: {0}")]
    ParseError(&'static str),
    #[error("Failed to decode feed: {0}")]
    Feed(#[from] quick_xml::de::DeError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to read '{path}': {source}")]
    ReadInput {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),
}

impl Error {
    pub fn read_input(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::ReadInput {
            path: path.into(),
            source,
        }
    }
}
