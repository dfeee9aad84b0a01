pub mod ffmpeg;

use std::{future::Future, path::Path};

pub trait AudioExtractor {
    /// Writes the audio track of `input` to `output` as 16 kHz mono PCM WAV.
    fn extract_wav(
        &self,
        input: &Path,
        output: &Path,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}
