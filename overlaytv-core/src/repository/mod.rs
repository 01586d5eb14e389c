//! Persistence for overlays and stream settings
//!
//! Each store is a trait with a PostgreSQL implementation and an in-memory
//! one, selected at startup from the database configuration.

pub mod memory;
pub mod overlay;
pub mod settings;

pub use memory::{MemoryOverlayRepository, MemorySettingsRepository};
pub use overlay::{OverlayRepository, PgOverlayRepository};
pub use settings::{PgSettingsRepository, SettingsRepository};
