use crate::error::AudioError;
use async_trait::async_trait;
use relay_types::AudioFormat;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Converts engine-native audio into a target PCM format.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Transcodes `audio` (a WAV stream) into `format`.
    ///
    /// Deterministic for a fixed input: the same bytes and format always
    /// yield the same output.
    async fn transcode(&self, audio: &[u8], format: AudioFormat) -> Result<Vec<u8>, AudioError>;
}

/// A [`Transcoder`] that pipes audio through an external `sox` binary.
///
/// Invocation: `sox -t wav - -r <rate> -c <channels> -e signed-integer
/// -b <bits> -t wav -`, reading the source from stdin and writing the
/// converted WAV to stdout.
#[derive(Debug, Clone)]
pub struct ProcessTranscoder {
    binary: PathBuf,
    timeout: Duration,
}

impl ProcessTranscoder {
    /// Creates a transcoder around the given `sox`-compatible binary with a
    /// per-call execution timeout.
    pub fn new(binary: impl AsRef<Path>, timeout: Duration) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
            timeout,
        }
    }
}

#[async_trait]
impl Transcoder for ProcessTranscoder {
    async fn transcode(&self, audio: &[u8], format: AudioFormat) -> Result<Vec<u8>, AudioError> {
        if audio.is_empty() {
            return Err(AudioError::Transcode("empty input audio".to_string()));
        }

        let mut command = Command::new(&self.binary);
        command
            .arg("-t")
            .arg("wav")
            .arg("-")
            .arg("-r")
            .arg(format.sample_rate.to_string())
            .arg("-c")
            .arg(format.channels.to_string())
            .arg("-e")
            .arg("signed-integer")
            .arg("-b")
            .arg(format.bit_depth.to_string())
            .arg("-t")
            .arg("wav")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| {
            AudioError::Transcode(format!("failed to spawn {:?}: {}", self.binary, e))
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AudioError::Transcode("failed to open stdin".to_string()))?;
        let input = audio.to_vec();

        // Feed stdin from a task so a full stdout pipe cannot deadlock us.
        let write_task = tokio::spawn(async move {
            let res = stdin.write_all(&input).await;
            drop(stdin);
            res
        });

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| AudioError::Timeout {
                stage: "transcode",
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| {
                AudioError::Transcode(format!("failed to wait for {:?}: {}", self.binary, e))
            })?;

        match write_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                // A closed pipe here usually means the process died first;
                // prefer its stderr if the exit status is also bad.
                if output.status.success() {
                    return Err(AudioError::Transcode(format!(
                        "failed to write to transcoder stdin: {}",
                        e
                    )));
                }
            }
            Err(e) => {
                return Err(AudioError::Transcode(format!("stdin task failed: {}", e)));
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AudioError::Transcode(format!(
                "{:?} failed: {}",
                self.binary,
                stderr.trim()
            )));
        }

        tracing::debug!(
            in_bytes = audio.len(),
            out_bytes = output.stdout.len(),
            sample_rate = format.sample_rate,
            "transcoded audio"
        );
        Ok(output.stdout)
    }
}
