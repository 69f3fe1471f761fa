//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Shared-secret authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// External dialer settings (directories, trunk, caller id).
    #[serde(default)]
    pub dialer: DialerConfig,

    /// Per-call limits and stage timeouts.
    #[serde(default)]
    pub call: CallConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Shared-secret authentication configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// The bearer value expected in `X-Relay-Token`. The server refuses to
    /// start while this is empty.
    #[serde(default)]
    pub token: String,
}

/// Settings describing the external dialer this relay feeds.
#[derive(Debug, Clone, Deserialize)]
pub struct DialerConfig {
    /// Directory the dialer polls for job descriptors.
    #[serde(default = "default_spool_dir")]
    pub spool_dir: String,

    /// Directory the dialer loads custom playback audio from.
    #[serde(default = "default_sounds_dir")]
    pub sounds_dir: String,

    /// Trunk name for outbound calls. The server refuses to start while
    /// this is empty.
    #[serde(default)]
    pub trunk: String,

    /// Display name for the outbound caller id.
    #[serde(default = "default_caller_name")]
    pub caller_name: String,

    /// Number part of the outbound caller id, E.164. The server refuses to
    /// start while this is empty.
    #[serde(default)]
    pub caller_number: String,

    /// Destination used when a request omits `to`.
    #[serde(default)]
    pub default_destination: Option<String>,
}

/// Per-call limits, engine binaries, and stage timeouts.
#[derive(Debug, Clone, Deserialize)]
pub struct CallConfig {
    /// Maximum message length in characters after trimming.
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    /// TTS engine binary.
    #[serde(default = "default_tts_binary")]
    pub tts_binary: String,

    /// Transcoder binary (sox-compatible).
    #[serde(default = "default_transcode_binary")]
    pub transcode_binary: String,

    /// Deadline for the synthesis stage, in seconds.
    #[serde(default = "default_synthesis_timeout_secs")]
    pub synthesis_timeout_secs: u64,

    /// Deadline for the transcode stage, in seconds.
    #[serde(default = "default_transcode_timeout_secs")]
    pub transcode_timeout_secs: u64,

    /// Deadline for the spool write stage, in seconds.
    #[serde(default = "default_spool_timeout_secs")]
    pub spool_timeout_secs: u64,

    /// Age after which consumed audio artifacts are swept from the sounds
    /// directory, in seconds. Zero disables the sweeper.
    #[serde(default = "default_audio_max_age_secs")]
    pub audio_max_age_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "relay_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0))
}

fn default_port() -> u16 {
    18511
}

fn default_spool_dir() -> String {
    "/var/spool/asterisk/outgoing".to_string()
}

fn default_sounds_dir() -> String {
    "/var/lib/asterisk/sounds/custom".to_string()
}

fn default_caller_name() -> String {
    "Alert Relay".to_string()
}

fn default_max_message_chars() -> usize {
    1000
}

fn default_tts_binary() -> String {
    "flite".to_string()
}

fn default_transcode_binary() -> String {
    "sox".to_string()
}

fn default_synthesis_timeout_secs() -> u64 {
    10
}

fn default_transcode_timeout_secs() -> u64 {
    10
}

fn default_spool_timeout_secs() -> u64 {
    5
}

fn default_audio_max_age_secs() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DialerConfig {
    fn default() -> Self {
        Self {
            spool_dir: default_spool_dir(),
            sounds_dir: default_sounds_dir(),
            trunk: String::new(),
            caller_name: default_caller_name(),
            caller_number: String::new(),
            default_destination: None,
        }
    }
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            max_message_chars: default_max_message_chars(),
            tts_binary: default_tts_binary(),
            transcode_binary: default_transcode_binary(),
            synthesis_timeout_secs: default_synthesis_timeout_secs(),
            transcode_timeout_secs: default_transcode_timeout_secs(),
            spool_timeout_secs: default_spool_timeout_secs(),
            audio_max_age_secs: default_audio_max_age_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `RELAY_HOST` overrides `server.host`
/// - `RELAY_PORT` overrides `server.port`
/// - `RELAY_TOKEN` overrides `auth.token`
/// - `RELAY_SPOOL_DIR` overrides `dialer.spool_dir`
/// - `RELAY_SOUNDS_DIR` overrides `dialer.sounds_dir`
/// - `RELAY_TRUNK` overrides `dialer.trunk`
/// - `RELAY_CALLER_NAME` overrides `dialer.caller_name`
/// - `RELAY_CALLER_NUMBER` overrides `dialer.caller_number`
/// - `RELAY_OWNER_PHONE` overrides `dialer.default_destination`
/// - `RELAY_LOG_LEVEL` overrides `logging.level`
/// - `RELAY_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("RELAY_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("RELAY_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(token) = std::env::var("RELAY_TOKEN") {
        config.auth.token = token;
    }
    if let Ok(dir) = std::env::var("RELAY_SPOOL_DIR") {
        config.dialer.spool_dir = dir;
    }
    if let Ok(dir) = std::env::var("RELAY_SOUNDS_DIR") {
        config.dialer.sounds_dir = dir;
    }
    if let Ok(trunk) = std::env::var("RELAY_TRUNK") {
        config.dialer.trunk = trunk;
    }
    if let Ok(name) = std::env::var("RELAY_CALLER_NAME") {
        config.dialer.caller_name = name;
    }
    if let Ok(number) = std::env::var("RELAY_CALLER_NUMBER") {
        config.dialer.caller_number = number;
    }
    if let Ok(owner) = std::env::var("RELAY_OWNER_PHONE") {
        if !owner.trim().is_empty() {
            config.dialer.default_destination = Some(owner);
        }
    }
    if let Ok(level) = std::env::var("RELAY_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("RELAY_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}
