//! Live transcoding session
//!
//! At most one external transcoder converts the configured RTSP source into
//! a rolling HLS playlist. The session manager owns that process, serializes
//! start/stop, waits for the playlist to appear, and reconciles its status
//! with the actual process liveness.

pub mod launcher;
pub mod readiness;
pub mod session;

pub use launcher::{LaunchRequest, ProcessExit, ProcessLauncher, SystemLauncher, TranscoderProcess};
pub use readiness::{Readiness, ReadinessPolicy};
pub use session::{SessionState, StreamSessionManager, StreamStatus};
