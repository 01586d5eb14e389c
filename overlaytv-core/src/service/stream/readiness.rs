//! Bounded polling for transcoder output
//!
//! The transcoder gives no signal when its first playlist is written, so
//! readiness is observed by polling the filesystem.

use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use super::launcher::{ProcessExit, TranscoderProcess};
use crate::Result;

/// Attempt budget for [`wait_for_playlist`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval: Duration::from_secs(1),
        }
    }
}

/// Outcome of waiting for the playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Playlist exists and is non-empty
    Ready { bytes: u64 },
    /// Attempt budget exhausted
    TimedOut,
    /// Transcoder exited before producing a playlist
    Exited(ProcessExit),
}

/// Size of `path` if it is a non-empty regular file
pub async fn non_empty_file_size(path: &Path) -> Option<u64> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Some(meta.len()),
        _ => None,
    }
}

/// Poll until `playlist` is non-empty, the attempts run out, or `process` exits.
pub async fn wait_for_playlist(
    playlist: &Path,
    policy: ReadinessPolicy,
    process: &mut dyn TranscoderProcess,
) -> Result<Readiness> {
    for attempt in 1..=policy.attempts {
        if let Some(bytes) = non_empty_file_size(playlist).await {
            debug!(attempt, bytes, "Playlist is ready");
            return Ok(Readiness::Ready { bytes });
        }

        if let Some(exit) = process.try_wait()? {
            warn!(attempt, %exit, "Transcoder exited before the playlist was written");
            return Ok(Readiness::Exited(exit));
        }

        debug!(attempt, max_attempts = policy.attempts, "Waiting for playlist...");
        if attempt < policy.attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Ok(Readiness::TimedOut)
}
