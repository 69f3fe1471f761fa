//! Shared types for the alert call relay.
//!
//! This crate provides the foundational types used across the relay crates:
//! collision-resistant job identifiers, the dialer retry policy embedded in
//! every job descriptor, and the fixed audio format the external dialer
//! expects for playback.
//!
//! No crate in the workspace depends on anything *except* `relay-types` for
//! cross-cutting type definitions. This keeps the dependency graph clean and
//! prevents circular dependencies.

mod format;
mod job;
mod retry;

pub use format::AudioFormat;
pub use job::JobId;
pub use retry::RetryPolicy;
