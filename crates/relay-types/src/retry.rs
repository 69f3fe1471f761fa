//! Dialer retry policy embedded in every job descriptor.

use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_secs() -> u32 {
    30
}

fn default_wait_secs() -> u32 {
    45
}

/// Upper bound on retry attempts a caller may request. Keeps a single bad
/// request from ringing a phone all night.
pub const MAX_RETRIES_CEILING: u32 = 10;

/// Upper bound on the per-attempt ring timeout, in seconds.
pub const WAIT_SECS_CEILING: u32 = 300;

/// How the external dialer should retry an unanswered call.
///
/// These values are copied verbatim into the job descriptor; the relay never
/// retries anything itself. Callers may override the defaults per request
/// (there is a single shared-secret auth tier, so every authenticated caller
/// is trusted to do so).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of redial attempts after the first.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay between attempts, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u32,
    /// How long each attempt rings before giving up, in seconds.
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            wait_secs: default_wait_secs(),
        }
    }
}

/// Rejection reason for an out-of-bounds retry policy override.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetryPolicyError {
    #[error("max_retries {0} exceeds ceiling of {MAX_RETRIES_CEILING}")]
    TooManyRetries(u32),

    #[error("wait_secs must be between 1 and {WAIT_SECS_CEILING}, got {0}")]
    WaitOutOfRange(u32),
}

impl RetryPolicy {
    /// Checks a caller-supplied override against the service ceilings.
    pub fn validate(&self) -> Result<(), RetryPolicyError> {
        if self.max_retries > MAX_RETRIES_CEILING {
            return Err(RetryPolicyError::TooManyRetries(self.max_retries));
        }
        if self.wait_secs == 0 || self.wait_secs > WAIT_SECS_CEILING {
            return Err(RetryPolicyError::WaitOutOfRange(self.wait_secs));
        }
        Ok(())
    }
}
