//! Relay server binary — the entry point for the alert call relay.
//!
//! Starts an axum HTTP server with structured logging, a fatal startup
//! probe of the dialer directories, a background audio sweeper, and
//! graceful shutdown on SIGTERM/SIGINT.

use relay_server::{app, background, config, AppState};
use relay_spool::SpoolWriter;
use relay_voice::{ProcessSynthesizer, ProcessTranscoder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("RELAY_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("relay.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration — the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Deployment mistakes that would make every request fail (or, worse,
    // leave the endpoint open) refuse startup instead.
    if config.auth.token.trim().is_empty() {
        tracing::error!("auth.token is not set — refusing to start an unauthenticated relay");
        std::process::exit(1);
    }
    if config.dialer.trunk.trim().is_empty() {
        tracing::error!("dialer.trunk is not set — outbound calls would have no route");
        std::process::exit(1);
    }
    if config.dialer.caller_number.trim().is_empty() {
        tracing::error!("dialer.caller_number is not set");
        std::process::exit(1);
    }

    // Wire up the pipeline
    let synthesizer = Arc::new(ProcessSynthesizer::new(
        &config.call.tts_binary,
        Duration::from_secs(config.call.synthesis_timeout_secs),
    ));
    let transcoder = Arc::new(ProcessTranscoder::new(
        &config.call.transcode_binary,
        Duration::from_secs(config.call.transcode_timeout_secs),
    ));
    let spool = SpoolWriter::new(&config.dialer.spool_dir, &config.dialer.sounds_dir);

    spool
        .check_writable()
        .await
        .expect("dialer directories are not writable — check dialer.spool_dir and dialer.sounds_dir");

    let state = AppState::new(&config, synthesizer, transcoder, spool);

    // Background sweep of consumed audio artifacts
    tokio::spawn(background::start_sweep_task(
        Arc::new(state.clone()),
        config.call.audio_max_age_secs,
    ));

    // Build application
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting alert call relay");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address — is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("alert call relay shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
