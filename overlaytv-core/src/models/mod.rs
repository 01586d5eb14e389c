pub mod id;
pub mod overlay;
pub mod settings;

pub use id::{generate_id, OverlayId};
pub use overlay::{NewOverlay, Overlay, OverlayKind, OverlayUpdate, Position, Size};
pub use settings::{StreamSettings, STREAM_SETTINGS_TYPE};
