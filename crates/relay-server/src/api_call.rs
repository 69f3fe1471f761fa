//! The `POST /call` handler: validate, synthesize, transcode, spool.

use crate::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use relay_spool::{DialerJob, SpoolError};
use relay_types::{AudioFormat, JobId, RetryPolicy};
use relay_voice::AudioError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::timeout;

/// Request body for placing a call.
#[derive(Debug, Deserialize)]
pub struct PlaceCallRequest {
    /// Destination number in E.164 form. Falls back to the configured owner
    /// number when omitted.
    #[serde(default)]
    pub to: Option<String>,

    /// The text spoken to the callee when the call is answered.
    pub message: String,

    /// Optional display-name override for the outbound caller id.
    #[serde(rename = "callerLabel", default)]
    pub caller_label: Option<String>,

    /// Optional override of the dialer retry policy.
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
}

/// Response body for an accepted call.
///
/// "Accepted" means the job was durably handed to the dialer, nothing
/// stronger: the relay has no visibility into whether the phone rings or is
/// answered, and invents no such signal.
#[derive(Debug, Serialize)]
pub struct PlaceCallResponse {
    /// Always `"accepted"`.
    pub status: String,
    /// The job identifier; spool filenames derive from it.
    #[serde(rename = "jobId")]
    pub job_id: JobId,
    /// The destination the call was submitted for.
    pub to: String,
    /// The sound name the dialer will play.
    pub sound: String,
}

/// Typed failures surfaced to the HTTP caller.
///
/// All errors are reported synchronously; the relay never retries a stage
/// internally (retries for the call itself are the dialer's job, driven by
/// the policy embedded in the descriptor).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("no destination: request omitted 'to' and no default is configured")]
    NoDestination,

    #[error("invalid retry policy: {0}")]
    InvalidRetry(String),

    #[error("synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("spool write failed: {0}")]
    SpoolWriteFailed(String),

    #[error("{0} stage exceeded its deadline")]
    Timeout(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Stable machine-readable code for the JSON body.
    fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::InvalidDestination(_) => "invalid_destination",
            Self::InvalidMessage(_) => "invalid_message",
            Self::NoDestination => "no_destination",
            Self::InvalidRetry(_) => "invalid_retry",
            Self::SynthesisFailed(_) => "synthesis_failed",
            Self::TranscodeFailed(_) => "transcode_failed",
            Self::SpoolWriteFailed(_) => "spool_write_failed",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidDestination(_)
            | ApiError::InvalidMessage(_)
            | ApiError::NoDestination
            | ApiError::InvalidRetry(_) => StatusCode::BAD_REQUEST,
            ApiError::SynthesisFailed(_)
            | ApiError::TranscodeFailed(_)
            | ApiError::SpoolWriteFailed(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        };

        // Auth failures stay generic: the body must not hint at what exists
        // behind the endpoint.
        let reason = match &self {
            ApiError::Unauthorized => "unauthorized".to_string(),
            other => other.to_string(),
        };

        let body = Json(serde_json::json!({
            "status": "error",
            "error": self.code(),
            "reason": reason,
        }));

        (status, body).into_response()
    }
}

/// Validates an E.164-like destination: `+` followed by 8–15 digits.
fn validate_destination(raw: &str) -> Result<String, ApiError> {
    let digits = raw
        .strip_prefix('+')
        .ok_or_else(|| ApiError::InvalidDestination(format!("'{}' must start with '+'", raw)))?;
    if digits.len() < 8 || digits.len() > 15 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::InvalidDestination(format!(
            "'{}' must be '+' followed by 8-15 digits",
            raw
        )));
    }
    Ok(raw.to_string())
}

fn map_audio_error(e: AudioError) -> ApiError {
    match e {
        AudioError::Synthesis(msg) => ApiError::SynthesisFailed(msg),
        AudioError::Transcode(msg) => ApiError::TranscodeFailed(msg),
        AudioError::Timeout { stage, .. } => ApiError::Timeout(stage),
    }
}

/// Handler for `POST /call`.
///
/// Stages run strictly in sequence — synthesize, transcode, generate a job
/// id, write audio, write descriptor — each under its own deadline. Every
/// failure path leaves zero relay-created files behind; on success both
/// spool artifacts exist and reference each other.
pub async fn place_call_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<PlaceCallRequest>,
) -> Result<(StatusCode, Json<PlaceCallResponse>), ApiError> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(ApiError::InvalidMessage("message is empty".to_string()));
    }
    if message.chars().count() > state.max_message_chars {
        return Err(ApiError::InvalidMessage(format!(
            "message exceeds {} characters",
            state.max_message_chars
        )));
    }

    let destination = match payload.to.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(to) => validate_destination(to)?,
        None => state
            .default_destination
            .clone()
            .ok_or(ApiError::NoDestination)?,
    };

    let retry = payload.retry.unwrap_or_default();
    retry
        .validate()
        .map_err(|e| ApiError::InvalidRetry(e.to_string()))?;

    let caller_name = payload
        .caller_label
        .as_deref()
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .unwrap_or(&state.caller_name);
    let caller_id = format!("{} <{}>", caller_name, state.caller_number);

    // Stage 1: synthesis. Nothing has touched the filesystem yet, so a
    // failure here needs no cleanup.
    let raw_audio = timeout(state.synthesis_timeout, state.synthesizer.synthesize(message))
        .await
        .map_err(|_| ApiError::Timeout("synthesis"))?
        .map_err(map_audio_error)?;

    // Stage 2: transcode to the dialer's playback format. The synthesized
    // intermediate is an in-memory buffer and is simply dropped on failure.
    let pcm_audio = timeout(
        state.transcode_timeout,
        state.transcoder.transcode(&raw_audio, AudioFormat::dialer()),
    )
    .await
    .map_err(|_| ApiError::Timeout("transcode"))?
    .map_err(map_audio_error)?;

    // Stages 3-5: unique job id, then audio, then descriptor. The writer
    // owns the ordering and cleans up after its own failures; a stage
    // deadline expiring mid-write drops the future past that cleanup, so
    // the timeout path reclaims whatever was stranded.
    let job = DialerJob {
        job_id: JobId::generate(),
        destination: destination.clone(),
        trunk: state.trunk.clone(),
        caller_id,
        retry,
    };

    match timeout(state.spool_timeout, state.spool.write_job(&job, &pcm_audio)).await {
        Ok(Ok(())) => {}
        Ok(Err(SpoolError::Collision(path))) => {
            tracing::error!(job_id = %job.job_id, path = %path.display(), "spool filename collision");
            return Err(ApiError::SpoolWriteFailed(format!(
                "spool entry already exists: {}",
                path.display()
            )));
        }
        Ok(Err(e)) => {
            return Err(ApiError::SpoolWriteFailed(e.to_string()));
        }
        Err(_) => {
            // The dropped write may have stranded the audio or the staged
            // descriptor; reclaim both.
            state.spool.remove_artifacts(&job).await;
            return Err(ApiError::Timeout("spool write"));
        }
    }

    tracing::info!(job_id = %job.job_id, to = %destination, "call accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(PlaceCallResponse {
            status: "accepted".to_string(),
            sound: job.sound_name(),
            job_id: job.job_id,
            to: destination,
        }),
    ))
}
