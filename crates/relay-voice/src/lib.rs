//! Speech synthesis and audio transcoding adapters for the alert call relay.
//!
//! The relay turns alert text into audio the telephony dialer can play. That
//! takes two stages: a TTS engine renders the text to engine-native audio,
//! and a transcoder converts it to the dialer's fixed playback format
//! (8 kHz mono s16 PCM).
//!
//! Both stages are external processes in production (`flite` and `sox` by
//! default) but sit behind the [`Synthesizer`] and [`Transcoder`] traits so
//! the concrete engine is swappable and the request pipeline is testable
//! with the in-memory fakes in [`fake`].

pub mod error;
pub mod fake;
pub mod synth;
pub mod transcode;

pub use error::AudioError;
pub use fake::{FakeSynthesizer, FakeTranscoder};
pub use synth::{ProcessSynthesizer, Synthesizer};
pub use transcode::{ProcessTranscoder, Transcoder};
