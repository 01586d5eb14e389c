//! Overlay model
//!
//! An overlay is a text or image annotation drawn on top of the live video.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::OverlayId;
use crate::Error;

/// Overlay content interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayKind {
    /// `content` is literal text
    Text,
    /// `content` is an image reference (URL)
    Image,
}

impl OverlayKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

impl FromStr for OverlayKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            other => Err(Error::InvalidInput(format!("Unknown overlay type: {other}"))),
        }
    }
}

impl std::fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Stored overlay record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub id: OverlayId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OverlayKind,
    pub content: String,
    pub position: Position,
    pub size: Size,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Overlay {
    /// Build a fresh record with a generated ID
    #[must_use]
    pub fn from_new(new: NewOverlay) -> Self {
        Self {
            id: OverlayId::new(),
            name: new.name,
            kind: new.kind,
            content: new.content,
            position: new.position,
            size: new.size,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Merge the fields present in `update` and stamp `updated_at`
    pub fn apply(&mut self, update: OverlayUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(kind) = update.kind {
            self.kind = kind;
        }
        if let Some(content) = update.content {
            self.content = content;
        }
        if let Some(position) = update.position {
            self.position = position;
        }
        if let Some(size) = update.size {
            self.size = size;
        }
        self.updated_at = Some(Utc::now());
    }
}

/// Create request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOverlay {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OverlayKind,
    pub content: String,
    pub position: Position,
    pub size: Size,
}

/// Update request body; absent fields keep their stored value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverlayUpdate {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<OverlayKind>,
    pub content: Option<String>,
    pub position: Option<Position>,
    pub size: Option<Size>,
}

impl OverlayUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.kind.is_none()
            && self.content.is_none()
            && self.position.is_none()
            && self.size.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewOverlay {
        NewOverlay {
            name: "A".to_string(),
            kind: OverlayKind::Text,
            content: "hi".to_string(),
            position: Position { x: 0.0, y: 0.0 },
            size: Size { width: 10.0, height: 5.0 },
        }
    }

    #[test]
    fn test_kind_wire_format() {
        assert_eq!(serde_json::to_string(&OverlayKind::Image).unwrap(), "\"image\"");
        assert_eq!("text".parse::<OverlayKind>().unwrap(), OverlayKind::Text);
        assert!("video".parse::<OverlayKind>().is_err());
        assert!(serde_json::from_str::<OverlayKind>("\"video\"").is_err());
    }

    #[test]
    fn test_new_overlay_accepts_type_field() {
        let body = r#"{"name":"A","type":"text","content":"hi",
            "position":{"x":0,"y":0},"size":{"width":10,"height":5}}"#;
        let parsed: NewOverlay = serde_json::from_str(body).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_apply_merges_present_fields_only() {
        let mut overlay = Overlay::from_new(sample());
        assert!(overlay.updated_at.is_none());

        overlay.apply(OverlayUpdate {
            content: Some("bye".to_string()),
            ..OverlayUpdate::default()
        });

        assert_eq!(overlay.content, "bye");
        assert_eq!(overlay.name, "A");
        assert_eq!(overlay.size, Size { width: 10.0, height: 5.0 });
        assert!(overlay.updated_at.is_some());
    }

    #[test]
    fn test_serialized_overlay_shape() {
        let overlay = Overlay::from_new(sample());
        let json = serde_json::to_value(&overlay).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["id"], overlay.id.as_str());
        assert!(json.get("updated_at").is_none());
        assert!(json.get("kind").is_none());
    }
}
