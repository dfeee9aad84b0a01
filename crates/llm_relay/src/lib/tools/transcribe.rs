use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::{media::AudioExtractor, Transcriber};

/// Turns a video into an `.srt` file next to it: audio is extracted to a
/// temporary WAV and handed to the transcription server.
pub struct VideoTranscriber<A, T> {
    extractor: A,
    transcriber: T,
    translate: bool,
}

impl<A, T> VideoTranscriber<A, T>
where
    A: AudioExtractor,
    T: Transcriber,
{
    pub fn new(extractor: A, transcriber: T) -> Self {
        Self {
            extractor,
            transcriber,
            translate: false,
        }
    }

    pub fn translate(mut self, translate: bool) -> Self {
        self.translate = translate;
        self
    }

    pub fn srt_path(video: &Path) -> PathBuf {
        video.with_extension("srt")
    }

    /// Returns the path of the written subtitle file.
    #[tracing::instrument(skip(self), fields(translate = self.translate))]
    pub async fn run(&self, video: &Path) -> anyhow::Result<PathBuf> {
        if !video.is_file() {
            anyhow::bail!("Video file not found at '{}'", video.display());
        }

        // removed on drop, including on the error paths below
        let wav = tempfile::Builder::new()
            .prefix("llm-relay-")
            .suffix(".wav")
            .tempfile()
            .context("Failed to create temporary audio file")?;

        self.extractor
            .extract_wav(video, wav.path())
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Audio extraction failed"))?;

        let srt = self
            .transcriber
            .transcribe(wav.path(), self.translate)
            .await
            .map_err(|e| anyhow::anyhow!("Transcription failed: {e}"))?;

        let srt_path = Self::srt_path(video);
        tokio::fs::write(&srt_path, srt)
            .await
            .with_context(|| format!("Failed to write '{}'", srt_path.display()))?;

        tracing::info!(srt = %srt_path.display(), "Wrote subtitles");
        Ok(srt_path)
    }
}
