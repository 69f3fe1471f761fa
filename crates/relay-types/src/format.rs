//! Audio format description for transcoder output.

use serde::{Deserialize, Serialize};

/// A concrete PCM sample format.
///
/// The dialer's playback format is fixed at the service level; requests
/// cannot change it. The struct exists so the transcoder seam stays
/// format-agnostic and testable rather than hard-coding sox arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Samples per second.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Bits per sample (signed integer PCM).
    pub bit_depth: u16,
}

impl AudioFormat {
    /// The format the external dialer requires for playback:
    /// 8 kHz, mono, signed 16-bit PCM.
    pub const fn dialer() -> Self {
        Self {
            sample_rate: 8000,
            channels: 1,
            bit_depth: 16,
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::dialer()
    }
}
