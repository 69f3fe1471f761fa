//! Background tasks for the relay server.
//!
//! Includes:
//! - Sweeping consumed audio and abandoned staging files out of the
//!   dialer's directories.

use crate::AppState;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Starts the stale-artifact sweep task.
///
/// The dialer plays spooled audio but never deletes it, so consumed
/// artifacts accumulate in the sounds directory until this task reclaims
/// them; the same sweep also catches `.tmp` descriptors stranded by a
/// request abandoned mid-write. Runs indefinitely; sweep failures are
/// logged, never fatal.
pub async fn start_sweep_task(state: Arc<AppState>, max_age_secs: u64) {
    if max_age_secs == 0 {
        tracing::warn!("audio sweep task disabled (audio_max_age_secs=0)");
        return;
    }

    // Sweep every quarter of the age threshold, at least once a minute,
    // at most every 15 minutes.
    let interval_secs = (max_age_secs / 4).clamp(60, 900);
    let interval = Duration::from_secs(interval_secs);
    let max_age = Duration::from_secs(max_age_secs);

    tracing::info!(max_age_secs, interval_secs, "starting audio sweep task");

    loop {
        sleep(interval).await;

        match state.spool.sweep_stale_artifacts(max_age).await {
            Ok(0) => {}
            Ok(removed) => {
                tracing::info!(count = removed, "swept stale artifacts");
            }
            Err(e) => {
                tracing::error!("audio sweep failed: {}", e);
            }
        }
    }
}
