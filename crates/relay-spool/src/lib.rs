//! On-disk handoff to the external telephony dialer.
//!
//! The dialer (an Asterisk-style switch the relay does not control) polls a
//! spool directory for plain-text job descriptors and plays the referenced
//! audio file when the call is answered. The relay's half of that protocol
//! lives here: rendering the descriptor, and writing both artifacts so that
//! a partially written job is never observable.
//!
//! Visibility contract: the audio file is fully written and flushed before
//! the descriptor exists under its final name, and the descriptor appears
//! atomically via a same-directory rename. The dialer may begin processing
//! the instant the descriptor is visible.

pub mod error;
pub mod job;
pub mod writer;

pub use error::SpoolError;
pub use job::DialerJob;
pub use writer::SpoolWriter;
