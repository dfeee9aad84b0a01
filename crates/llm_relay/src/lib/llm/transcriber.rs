use std::{fmt::Display, future::Future, path::Path};

pub trait Transcriber {
    type Error: Display;

    /// Transcribes a 16 kHz mono WAV file and returns the transcript as SRT.
    fn transcribe(
        &self,
        wav_path: &Path,
        translate: bool,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;
}
