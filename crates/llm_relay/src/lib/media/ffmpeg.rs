use std::{ffi::OsString, io::ErrorKind, path::{Path, PathBuf}};

use tokio::process::Command;

use crate::media::AudioExtractor;

#[derive(Debug, Clone)]
pub struct Ffmpeg {
    binary: PathBuf,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
        }
    }
}

impl Ffmpeg {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn wav_args(input: &Path, output: &Path) -> Vec<OsString> {
        let mut args = vec![OsString::from("-i"), input.into()];
        args.extend(
            ["-ar", "16000", "-ac", "1", "-c:a", "pcm_s16le", "-y", "-loglevel", "error"]
                .map(OsString::from),
        );
        args.push(output.into());
        args
    }
}

impl AudioExtractor for Ffmpeg {
    #[tracing::instrument(skip(self))]
    async fn extract_wav(&self, input: &Path, output: &Path) -> anyhow::Result<()> {
        let result = Command::new(&self.binary)
            .args(Self::wav_args(input, output))
            .output()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                anyhow::bail!(
                    "'{}' not found. Please make sure it is installed and in your PATH",
                    self.binary.display()
                );
            }
            Err(e) => return Err(e.into()),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(status = ?output.status, %stderr, "ffmpeg audio extraction failed");
            anyhow::bail!("ffmpeg audio extraction failed: {}", stderr.trim());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_args() {
        let args = Ffmpeg::wav_args(Path::new("talk.mp4"), Path::new("/tmp/out.wav"));
        let args = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(
            args,
            "-i talk.mp4 -ar 16000 -ac 1 -c:a pcm_s16le -y -loglevel error /tmp/out.wav"
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let ffmpeg = Ffmpeg::new("/nonexistent/ffmpeg-binary");
        let err = ffmpeg
            .extract_wav(Path::new("in.mp4"), Path::new("out.wav"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
