use std::{collections::HashSet, io::ErrorKind, path::PathBuf};

use anyhow::Context;
use tokio::io::AsyncWriteExt;

use crate::datastore::UrlLedger;

/// Plain-text ledger with one processed URL per line.
#[derive(Debug, Clone)]
pub struct FileUrlLedger {
    path: PathBuf,
}

impl FileUrlLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl UrlLedger for FileUrlLedger {
    async fn processed_urls(&self) -> anyhow::Result<HashSet<String>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => {
                tracing::error!(error = ?e, path = ?self.path, "Failed to read ledger");
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };

        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    async fn record(&self, url: &str) -> anyhow::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        file.write_all(format!("{url}\n").as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
