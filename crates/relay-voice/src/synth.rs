use crate::error::AudioError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Maximum text input size for synthesis (16 KiB). Prevents resource
/// exhaustion from pathological TTS input; the HTTP layer enforces a much
/// smaller character cap on top of this.
const MAX_INPUT_BYTES: usize = 16 * 1024;

/// Renders alert text into engine-native audio bytes.
///
/// Implementations must be safe to call concurrently; each call is
/// independent and owns its output buffer.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesizes speech from `text`.
    ///
    /// Returns audio in whatever container/sample format the engine
    /// produces. The caller is responsible for transcoding to the dialer
    /// format.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AudioError>;
}

/// A [`Synthesizer`] that shells out to an external TTS binary.
///
/// The binary is invoked as `<binary> -t <text> -o -` and must write WAV
/// audio to stdout — `flite` behaves this way, and other engines are easily
/// wrapped in a script with the same calling convention.
#[derive(Debug, Clone)]
pub struct ProcessSynthesizer {
    binary: PathBuf,
    timeout: Duration,
}

impl ProcessSynthesizer {
    /// Creates a synthesizer around the given TTS binary with a per-call
    /// execution timeout.
    pub fn new(binary: impl AsRef<Path>, timeout: Duration) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
            timeout,
        }
    }
}

#[async_trait]
impl Synthesizer for ProcessSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AudioError> {
        if text.is_empty() {
            return Err(AudioError::Synthesis("empty input text".to_string()));
        }
        if text.len() > MAX_INPUT_BYTES {
            return Err(AudioError::Synthesis(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_INPUT_BYTES
            )));
        }

        let mut command = Command::new(&self.binary);
        command
            .arg("-t")
            .arg(text)
            .arg("-o")
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = command.spawn().map_err(|e| {
            AudioError::Synthesis(format!("failed to spawn {:?}: {}", self.binary, e))
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| AudioError::Timeout {
                stage: "synthesis",
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| {
                AudioError::Synthesis(format!("failed to wait for {:?}: {}", self.binary, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AudioError::Synthesis(format!(
                "{:?} failed: {}",
                self.binary,
                stderr.trim()
            )));
        }

        if output.stdout.is_empty() {
            return Err(AudioError::Synthesis(format!(
                "{:?} produced no audio",
                self.binary
            )));
        }

        tracing::debug!(bytes = output.stdout.len(), "synthesized speech");
        Ok(output.stdout)
    }
}
