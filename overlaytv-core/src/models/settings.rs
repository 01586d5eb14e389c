//! Stream settings model
//!
//! Stored as a single document keyed by `type = "stream"`.

use serde::{Deserialize, Serialize};

/// Discriminator of the stream settings document
pub const STREAM_SETTINGS_TYPE: &str = "stream";

/// Persisted stream configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamSettings {
    #[serde(default)]
    pub rtsp_url: String,
}
