use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifier of a keyboard key as delivered with a keyup event.
///
/// Single characters compare case-insensitively (`"a"` matches `"A"`), named
/// keys (`"Enter"`, `"ArrowLeft"`, ...) compare exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct KeyId(String);

impl KeyId {
    pub fn parse(raw: &str) -> Self {
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(' '), None) => Self("Space".to_string()),
            (Some(c), None) => Self(c.to_lowercase().collect()),
            _ if raw.eq_ignore_ascii_case("space") => Self("Space".to_string()),
            _ => Self(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for KeyId {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for KeyId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}
