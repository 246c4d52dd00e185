use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Longest display name kept after normalization (in characters)
pub const MAX_NAME_CHARS: usize = 50;

/// Errors raised while normalizing user input
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Room code must be 4 to 12 letters or digits")]
    InvalidRoomCode,
}

/// The local user's display name
///
/// Never empty: construction falls back to a generated `guest-XXXX` name and
/// renames with blank input are rejected, leaving the previous name in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    display_name: String,
}

impl Identity {
    /// Create an identity from an optional preferred name
    pub fn new(preferred: Option<&str>) -> Self {
        match preferred.map(normalize_name) {
            Some(Ok(display_name)) => Self { display_name },
            _ => Self::generated(),
        }
    }

    /// Create an identity with a generated default name
    pub fn generated() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            display_name: format!("guest-{}", &suffix[..4]),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Rename the identity
    ///
    /// Returns `Ok(true)` when the name changed and `Ok(false)` when the
    /// normalized name equals the current one.
    pub fn rename(&mut self, raw: &str) -> Result<bool, InputError> {
        let name = normalize_name(raw)?;
        if name == self.display_name {
            return Ok(false);
        }

        tracing::debug!(from = %self.display_name, to = %name, "identity renamed");
        self.display_name = name;
        Ok(true)
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::generated()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name)
    }
}

/// Trim a name and cap it at [`MAX_NAME_CHARS`] characters
pub fn normalize_name(raw: &str) -> Result<String, InputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InputError::EmptyName);
    }

    Ok(trimmed.chars().take(MAX_NAME_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_with_preferred_name() {
        let identity = Identity::new(Some("  Alice  "));
        assert_eq!(identity.display_name(), "Alice");
    }

    #[test]
    fn test_new_falls_back_to_generated() {
        let identity = Identity::new(Some("   "));
        assert!(identity.display_name().starts_with("guest-"));
        assert_eq!(identity.display_name().len(), "guest-".len() + 4);

        let identity = Identity::new(None);
        assert!(identity.display_name().starts_with("guest-"));
    }

    #[test]
    fn test_rename() {
        let mut identity = Identity::new(Some("Alice"));

        assert_eq!(identity.rename("Bob"), Ok(true));
        assert_eq!(identity.display_name(), "Bob");
    }

    #[test]
    fn test_rename_to_same_name() {
        let mut identity = Identity::new(Some("Alice"));

        assert_eq!(identity.rename(" Alice "), Ok(false));
        assert_eq!(identity.display_name(), "Alice");
    }

    #[test]
    fn test_blank_rename_keeps_previous_name() {
        let mut identity = Identity::new(Some("Alice"));

        for blank in ["", " ", "\t\n", "   \u{3000}"] {
            assert_eq!(identity.rename(blank), Err(InputError::EmptyName));
            assert_eq!(identity.display_name(), "Alice");
        }
    }

    #[test]
    fn test_long_name_is_truncated() {
        let mut identity = Identity::new(Some("Alice"));
        let long_name = "ä".repeat(80);

        identity.rename(&long_name).unwrap();

        assert_eq!(identity.display_name().chars().count(), MAX_NAME_CHARS);
    }

    #[test]
    fn test_display() {
        let identity = Identity::new(Some("Carol"));
        assert_eq!(identity.to_string(), "Carol");
    }

    #[test]
    fn test_serialization() {
        let identity = Identity::new(Some("Dave"));
        let json = serde_json::to_string(&identity).unwrap();
        let deserialized: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(identity, deserialized);
    }
}
