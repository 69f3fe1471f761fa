//! Alert call relay server library logic.
//!
//! The relay accepts one authenticated operation — place a spoken-word
//! phone call — and turns it into a text-to-speech rendering, a transcode
//! to the dialer's playback format, and an atomically-visible job file in
//! the dialer's spool directory. Everything after that belongs to the
//! external dialer.

pub mod api_call;
pub mod background;
pub mod config;
pub mod middleware;

use axum::{extract::DefaultBodyLimit, routing::get, routing::post, Extension, Json, Router};
use relay_spool::SpoolWriter;
use relay_voice::{Synthesizer, Transcoder};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// Maximum request body size (64 KiB). A call request is a short JSON
/// document; anything larger is hostile or broken.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Application state shared across all request handlers.
///
/// Each request is handled independently; the only shared mutable resource
/// in the whole relay is the spool directory, and unique job-id derived
/// filenames plus atomic renames make that safe without locks.
#[derive(Clone)]
pub struct AppState {
    /// TTS engine adapter.
    pub synthesizer: Arc<dyn Synthesizer>,
    /// Audio format converter adapter.
    pub transcoder: Arc<dyn Transcoder>,
    /// Writer for the dialer's spool and sounds directories.
    pub spool: SpoolWriter,
    /// SHA-256 digest of the shared secret.
    pub token_digest: [u8; 32],
    /// Trunk name for outbound calls.
    pub trunk: String,
    /// Default caller-id display name.
    pub caller_name: String,
    /// Caller-id number, E.164.
    pub caller_number: String,
    /// Destination used when a request omits `to`.
    pub default_destination: Option<String>,
    /// Maximum message length in characters.
    pub max_message_chars: usize,
    /// Deadline for the synthesis stage.
    pub synthesis_timeout: Duration,
    /// Deadline for the transcode stage.
    pub transcode_timeout: Duration,
    /// Deadline for the spool write stage.
    pub spool_timeout: Duration,
}

impl AppState {
    /// Builds state from loaded configuration and the three service
    /// adapters.
    pub fn new(
        config: &config::Config,
        synthesizer: Arc<dyn Synthesizer>,
        transcoder: Arc<dyn Transcoder>,
        spool: SpoolWriter,
    ) -> Self {
        Self {
            synthesizer,
            transcoder,
            spool,
            token_digest: middleware::token_digest(&config.auth.token),
            trunk: config.dialer.trunk.clone(),
            caller_name: config.dialer.caller_name.clone(),
            caller_number: config.dialer.caller_number.clone(),
            default_destination: config.dialer.default_destination.clone(),
            max_message_chars: config.call.max_message_chars,
            synthesis_timeout: Duration::from_secs(config.call.synthesis_timeout_secs),
            transcode_timeout: Duration::from_secs(config.call.transcode_timeout_secs),
            spool_timeout: Duration::from_secs(config.call.spool_timeout_secs),
        }
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/call", post(api_call::place_call_handler))
        .layer(axum::middleware::from_fn(middleware::auth_middleware));

    Router::new()
        .route("/health", get(health))
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
