//! The dialer job descriptor and its on-disk rendering.

use relay_types::{JobId, RetryPolicy};

/// Prefix for every file the relay creates, in both the spool and sounds
/// directories. The stale-audio sweeper only ever touches files carrying it.
pub const FILE_PREFIX: &str = "alert-";

/// One unit of work for the external dialer.
///
/// Ownership transfers to the dialer the instant the descriptor is renamed
/// into the spool directory; the relay must not touch either file again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialerJob {
    /// Identifier tying the descriptor to its audio artifact.
    pub job_id: JobId,
    /// Destination number in E.164 form.
    pub destination: String,
    /// Trunk name the dialer should place the call through.
    pub trunk: String,
    /// Caller-id label shown to the callee.
    pub caller_id: String,
    /// Redial behavior, copied verbatim into the descriptor.
    pub retry: RetryPolicy,
}

impl DialerJob {
    /// The sound name referenced by the descriptor, without directory or
    /// extension — the form the dialer's playback directive expects.
    pub fn sound_name(&self) -> String {
        format!("{}{}", FILE_PREFIX, self.job_id)
    }

    /// Filename of the audio artifact in the sounds directory.
    pub fn audio_file_name(&self) -> String {
        format!("{}.wav", self.sound_name())
    }

    /// Final filename of the descriptor in the spool directory.
    pub fn descriptor_file_name(&self) -> String {
        format!("{}{}.call", FILE_PREFIX, self.job_id)
    }

    /// Renders the descriptor in the dialer's `Key: value` call-file
    /// grammar. Field names and ordering are part of the wire protocol; do
    /// not reorder.
    pub fn render_descriptor(&self) -> String {
        format!(
            "Channel: PJSIP/{dest}@{trunk}\n\
             Application: Playback\n\
             Data: custom/{sound}\n\
             MaxRetries: {max_retries}\n\
             RetryTime: {retry_time}\n\
             WaitTime: {wait_time}\n\
             CallerID: {caller_id}\n",
            dest = self.destination,
            trunk = self.trunk,
            sound = self.sound_name(),
            max_retries = self.retry.max_retries,
            retry_time = self.retry.retry_delay_secs,
            wait_time = self.retry.wait_secs,
            caller_id = self.caller_id,
        )
    }
}
