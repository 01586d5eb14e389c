pub mod hls;
pub mod overlay;
pub mod settings;
pub mod stream;

pub use hls::{HlsFile, HlsFiles};
pub use overlay::OverlayService;
pub use settings::SettingsService;
pub use stream::{
    LaunchRequest, ProcessExit, ProcessLauncher, SessionState, StreamSessionManager,
    StreamStatus, SystemLauncher, TranscoderProcess,
};
