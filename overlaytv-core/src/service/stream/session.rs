//! Stream session manager
//!
//! Owns the single transcoder process of this server instance.
//!
//! State machine:
//! `Idle --start--> Starting --(playlist ready)--> Running --stop--> Stopping --> Idle`.
//! A start whose playlist never appears kills the process and returns to
//! `Idle`. A transcoder that dies on its own is noticed by [`StreamSessionManager::reconcile`]
//! (run periodically by the watchdog) and also returns the session to `Idle`.

use parking_lot::RwLock;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::launcher::{LaunchRequest, ProcessLauncher, TranscoderProcess};
use super::readiness::{self, Readiness, ReadinessPolicy};
use crate::config::StreamConfig;
use crate::{Error, Result};

/// Lifecycle state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Starting,
    Running,
    Stopping,
}

/// Point-in-time view of the session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StreamStatus {
    pub state: SessionState,
    /// Last source URL handed to `start`, kept after the session ends
    pub current_url: String,
    /// Public playlist URL while running
    pub hls_url: Option<String>,
}

impl StreamStatus {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }
}

struct ActiveSession {
    process: Box<dyn TranscoderProcess>,
    source_url: String,
}

/// Supervises at most one transcoder process.
///
/// `start`, `stop` and `reconcile` serialize on an async mutex that is held
/// for the whole operation, including the readiness poll. `status` reads a
/// separate snapshot and never waits on the process.
pub struct StreamSessionManager {
    config: StreamConfig,
    launcher: Arc<dyn ProcessLauncher>,
    session: Mutex<Option<ActiveSession>>,
    status: RwLock<StreamStatus>,
}

impl std::fmt::Debug for StreamSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSessionManager")
            .field("output_dir", &self.config.output_dir)
            .field("status", &*self.status.read())
            .finish_non_exhaustive()
    }
}

impl StreamSessionManager {
    #[must_use]
    pub fn new(config: StreamConfig, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self {
            config,
            launcher,
            session: Mutex::new(None),
            status: RwLock::new(StreamStatus::default()),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Current status snapshot
    #[must_use]
    pub fn status(&self) -> StreamStatus {
        self.status.read().clone()
    }

    /// Start transcoding `source_url`, replacing any running session.
    ///
    /// Returns the public playlist URL once the playlist is non-empty.
    pub async fn start(&self, source_url: &str) -> Result<String> {
        let source_url = source_url.trim();
        if source_url.is_empty() {
            return Err(Error::InvalidInput("rtsp_url is required".to_string()));
        }

        let mut session = self.session.lock().await;
        let _transition = TransitionGuard::new(&self.status);

        if let Some(previous) = session.take() {
            info!(source_url = %previous.source_url, "Stopping previous stream session");
            self.set_state(SessionState::Stopping);
            if let Err(e) = self.shut_down_process(previous.process).await {
                warn!("Previous transcoder did not shut down cleanly: {}", e);
            }
        }

        self.set_starting(source_url);

        if let Err(e) = self.prepare_output_dir().await {
            self.set_state(SessionState::Idle);
            return Err(e);
        }

        let playlist = self.config.playlist_path();
        let request = LaunchRequest {
            program: self.config.transcoder.program.clone(),
            args: self.config.transcoder.build_args(source_url, &playlist),
        };
        info!(source_url = %source_url, command = %request.command_line(), "Starting transcoder");

        let mut process = match self.launcher.launch(&request).await {
            Ok(process) => process,
            Err(e) => {
                error!(source_url = %source_url, "Failed to launch transcoder: {}", e);
                self.set_state(SessionState::Idle);
                return Err(e);
            }
        };

        let policy = ReadinessPolicy {
            attempts: self.config.readiness_attempts,
            interval: self.config.readiness_interval(),
        };

        match readiness::wait_for_playlist(&playlist, policy, process.as_mut()).await {
            Ok(Readiness::Ready { bytes }) => {
                info!(pid = ?process.id(), bytes, "HLS playlist created, stream running");
                *session = Some(ActiveSession {
                    process,
                    source_url: source_url.to_string(),
                });
                let hls_url = self.config.public_playlist_url();
                self.set_running(hls_url.clone());
                Ok(hls_url)
            }
            Ok(Readiness::TimedOut) => {
                warn!(
                    attempts = policy.attempts,
                    "HLS playlist was not created in time, stopping transcoder"
                );
                if let Err(e) = self.shut_down_process(process).await {
                    warn!("Failed to stop transcoder after readiness timeout: {}", e);
                }
                self.set_state(SessionState::Idle);
                Err(Error::NotReady("HLS file not created".to_string()))
            }
            Ok(Readiness::Exited(exit)) => {
                self.set_state(SessionState::Idle);
                Err(Error::Transcoder(format!(
                    "Transcoder exited before the stream was ready ({exit})"
                )))
            }
            Err(e) => {
                if let Err(stop_err) = self.shut_down_process(process).await {
                    warn!("Failed to stop transcoder: {}", stop_err);
                }
                self.set_state(SessionState::Idle);
                Err(e)
            }
        }
    }

    /// Stop the running session. Succeeds without side effects when idle.
    pub async fn stop(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        let _transition = TransitionGuard::new(&self.status);

        let Some(active) = session.take() else {
            return Ok(());
        };

        info!(source_url = %active.source_url, "Stopping stream session");
        self.set_state(SessionState::Stopping);
        let result = self.shut_down_process(active.process).await;
        self.set_state(SessionState::Idle);
        result
    }

    /// Stop the session on server exit, logging instead of returning errors
    pub async fn shutdown(&self) {
        if let Err(e) = self.stop().await {
            error!("Failed to stop transcoder during shutdown: {}", e);
        }
    }

    /// Drop the session if its transcoder has exited on its own.
    ///
    /// Returns `true` when a dead session was cleared. Skips the check while
    /// a start or stop is in progress.
    pub async fn reconcile(&self) -> bool {
        let Ok(mut session) = self.session.try_lock() else {
            return false;
        };

        let Some(active) = session.as_mut() else {
            return false;
        };

        match active.process.try_wait() {
            Ok(Some(exit)) => {
                warn!(
                    source_url = %active.source_url,
                    %exit,
                    "Transcoder exited unexpectedly, marking stream as stopped"
                );
                *session = None;
                self.set_state(SessionState::Idle);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Failed to probe transcoder liveness: {}", e);
                false
            }
        }
    }

    /// Periodically run [`Self::reconcile`] until the manager is dropped
    pub fn spawn_watchdog(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let manager: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    debug!("Stream session manager dropped, stopping watchdog");
                    break;
                };
                manager.reconcile().await;
            }
        })
    }

    /// Ask the process to exit, escalating to a kill after the stop timeout
    async fn shut_down_process(&self, mut process: Box<dyn TranscoderProcess>) -> Result<()> {
        let pid = process.id();

        if let Err(e) = process.terminate() {
            warn!(pid = ?pid, "Graceful termination failed: {}", e);
        }

        match tokio::time::timeout(self.config.stop_timeout(), process.wait()).await {
            Ok(Ok(exit)) => {
                info!(pid = ?pid, %exit, "Transcoder stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(pid = ?pid, "Failed waiting for transcoder, killing it: {}", e);
                process.kill().await
            }
            Err(_) => {
                warn!(
                    pid = ?pid,
                    timeout_ms = self.config.stop_timeout_ms,
                    "Transcoder did not exit in time, killing it"
                );
                process.kill().await
            }
        }
    }

    /// Create the output directory and remove files left by a previous run
    async fn prepare_output_dir(&self) -> Result<()> {
        let dir = &self.config.output_dir;
        let playlist = self.config.playlist_path();
        tokio::fs::create_dir_all(dir).await?;

        let mut removed = 0usize;
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            let name = entry.file_name();
            if !is_file || !name.to_string_lossy().starts_with(&self.config.segment_prefix) {
                continue;
            }

            let path: PathBuf = entry.path();
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), "Failed to remove stale HLS file: {}", e),
            }
        }

        // A leftover playlist would pass the readiness check before the new process wrote anything
        match tokio::fs::remove_file(&playlist).await {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                error!(path = %playlist.display(), "Failed to remove stale playlist: {}", e);
                return Err(e.into());
            }
        }

        if removed > 0 {
            debug!(removed, dir = %dir.display(), "Removed stale HLS files");
        }
        Ok(())
    }

    fn set_starting(&self, source_url: &str) {
        let mut status = self.status.write();
        status.state = SessionState::Starting;
        status.current_url = source_url.to_string();
        status.hls_url = None;
    }

    fn set_running(&self, hls_url: String) {
        let mut status = self.status.write();
        status.state = SessionState::Running;
        status.hls_url = Some(hls_url);
    }

    fn set_state(&self, state: SessionState) {
        let mut status = self.status.write();
        status.state = state;
        if state != SessionState::Running {
            status.hls_url = None;
        }
    }
}

/// Returns the status to `Idle` if a start or stop is dropped mid-transition
struct TransitionGuard<'a> {
    status: &'a RwLock<StreamStatus>,
}

impl<'a> TransitionGuard<'a> {
    fn new(status: &'a RwLock<StreamStatus>) -> Self {
        Self { status }
    }
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        let mut status = self.status.write();
        if matches!(status.state, SessionState::Starting | SessionState::Stopping) {
            debug!(state = ?status.state, "Session transition abandoned, resetting to idle");
            status.state = SessionState::Idle;
            status.hls_url = None;
        }
    }
}
