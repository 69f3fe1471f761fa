//! Job identifiers for spooled dialer work.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of random hex characters appended to the timestamp prefix.
const SUFFIX_HEX_CHARS: usize = 6;

/// A unique, time-ordered identifier for one dialer job.
///
/// The identifier is a zero-padded millisecond timestamp followed by a random
/// hex suffix (`<millis>-<hex>`). The timestamp prefix keeps ids sortable by
/// submission time; the suffix keeps two jobs submitted within the same
/// millisecond from colliding on spool filenames.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generates a fresh job id from the current wall clock and thread-local
    /// RNG.
    pub fn generate() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let suffix: u32 = rand::thread_rng().gen_range(0..0x0100_0000);
        Self(format!(
            "{:013}-{:0width$x}",
            millis,
            suffix,
            width = SUFFIX_HEX_CHARS
        ))
    }

    /// Returns the id as a string slice, suitable for filename construction.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
