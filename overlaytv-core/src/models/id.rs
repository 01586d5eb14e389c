use nanoid::nanoid;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Length of generated entity IDs
pub const ID_LENGTH: usize = 12;

/// Generate a 12-character nanoid for entity IDs
pub fn generate_id() -> String {
    nanoid!(ID_LENGTH)
}

/// Overlay ID type (CHAR(12) nanoid)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverlayId(pub String);

impl OverlayId {
    #[must_use]
    pub fn new() -> Self {
        Self(generate_id())
    }

    /// Parse an ID received from a client.
    ///
    /// Only well-formed nanoids are accepted, so malformed input is rejected
    /// before it ever reaches the store.
    pub fn parse(raw: &str) -> Result<Self> {
        if is_valid_id(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(Error::InvalidInput("Invalid overlay ID".to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OverlayId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OverlayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether `raw` has the shape of a generated ID
#[must_use]
pub fn is_valid_id(raw: &str) -> bool {
    raw.len() == ID_LENGTH
        && raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

// Database mapping: OverlayId <-> TEXT (transparent wrapper around String)
impl sqlx::Type<sqlx::Postgres> for OverlayId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl sqlx::Encode<'_, sqlx::Postgres> for OverlayId {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> std::result::Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OverlayId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> std::result::Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_parse() {
        let id = OverlayId::new();
        assert_eq!(id.as_str().len(), ID_LENGTH);
        assert_eq!(OverlayId::parse(id.as_str()).unwrap(), id);
    }

    #[test]
    fn test_malformed_ids_rejected() {
        for raw in ["not-an-id", "", "abc", "abcdefghijk!", "abcdefghijklm", "../../etc/pa"] {
            let err = OverlayId::parse(raw).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "accepted {raw:?}");
        }
    }
}
