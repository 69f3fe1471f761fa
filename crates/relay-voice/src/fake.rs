//! In-memory adapter fakes for testing the request pipeline.
//!
//! Both fakes count invocations so tests can assert that unauthorized or
//! invalid requests never reach the audio stages.

use crate::error::AudioError;
use crate::synth::Synthesizer;
use crate::transcode::Transcoder;
use async_trait::async_trait;
use relay_types::AudioFormat;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A [`Synthesizer`] that returns canned bytes or a forced failure.
#[derive(Debug, Default)]
pub struct FakeSynthesizer {
    calls: AtomicUsize,
    fail: bool,
}

impl FakeSynthesizer {
    /// A fake that succeeds, echoing the input text as "audio".
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A fake whose every call fails with a synthesis error.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }

    /// Number of times `synthesize` was invoked.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AudioError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AudioError::Synthesis("forced failure".to_string()));
        }
        Ok(format!("RAW:{}", text).into_bytes())
    }
}

/// A [`Transcoder`] that tags its input or fails on demand.
#[derive(Debug, Default)]
pub struct FakeTranscoder {
    calls: AtomicUsize,
    fail: bool,
}

impl FakeTranscoder {
    /// A fake that succeeds, prefixing the input with the sample rate.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A fake whose every call fails with a transcode error.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }

    /// Number of times `transcode` was invoked.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(&self, audio: &[u8], format: AudioFormat) -> Result<Vec<u8>, AudioError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AudioError::Transcode("forced failure".to_string()));
        }
        let mut out = format!("PCM{}:", format.sample_rate).into_bytes();
        out.extend_from_slice(audio);
        Ok(out)
    }
}
