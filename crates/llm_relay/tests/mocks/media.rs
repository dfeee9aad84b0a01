use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use llm_relay::{media::AudioExtractor, Transcriber};

#[derive(Clone, Default)]
pub struct MockAudioExtractor {
    pub calls: Arc<Mutex<Vec<(PathBuf, PathBuf)>>>,
    pub fail_with: Option<String>,
}

impl MockAudioExtractor {
    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Default::default()
        }
    }
}

impl AudioExtractor for MockAudioExtractor {
    async fn extract_wav(&self, input: &Path, output: &Path) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((input.to_path_buf(), output.to_path_buf()));
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        tokio::fs::write(output, b"RIFF....WAVE").await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct MockTranscriber {
    pub srt: String,
    /// (wav path, translate)
    pub calls: Arc<Mutex<Vec<(PathBuf, bool)>>>,
    pub fail_with: Option<String>,
}

impl MockTranscriber {
    pub fn new(srt: &str) -> Self {
        Self {
            srt: srt.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::new("")
        }
    }
}

impl Transcriber for MockTranscriber {
    type Error = anyhow::Error;

    async fn transcribe(&self, wav_path: &Path, translate: bool) -> Result<String, Self::Error> {
        self.calls
            .lock()
            .unwrap()
            .push((wav_path.to_path_buf(), translate));
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(self.srt.clone())
    }
}
