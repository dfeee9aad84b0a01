//! One module per command-line tool. Each tool is generic over the backend
//! traits so it can be driven by mocks.

pub mod ask;
pub mod bullets;
pub mod conversation;
pub mod digest;
pub mod embed_lines;
pub mod facts;
pub mod grammar;
pub mod mermaid;
pub mod pdf;
pub mod search;
pub mod sorter;
pub mod transcribe;
pub mod vision;

use std::{io::Write, path::Path};

use crate::error::Error;

/// Writes streamed reply fragments straight through to `out`.
pub(crate) fn echo_to<W: Write + Send>(out: &mut W) -> impl FnMut(&str) + Send + '_ {
    move |delta| {
        if let Err(e) = out
            .write_all(delta.as_bytes())
            .and_then(|_| out.flush())
        {
            tracing::warn!(error = %e, "Failed to write streamed output");
        }
    }
}

pub(crate) async fn read_document(path: &Path) -> Result<String, Error> {
    tokio::fs::read_to_string(path)
        .await
        .inspect_err(|e| tracing::error!(error = %e, path = %path.display(), "Failed to read document"))
        .map_err(|e| Error::read_input(path, e))
}
