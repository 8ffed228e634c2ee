use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable key for an authenticated user
///
/// Derived from the verified credential's subject claim. Opaque to the gateway: two
/// identities are the same user iff their strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Identity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for Identity {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// A like recorded against a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikePayload {
    pub id: i64,
    /// User who liked the post
    pub user_id: i64,
    pub post_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A comment left on a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentPayload {
    pub id: i64,
    pub post_id: i64,
    /// Author of the comment
    pub user_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_from_numeric_id() {
        assert_eq!(Identity::from(42i64), Identity::new("42"));
        assert_eq!(Identity::from(42i64).to_string(), "42");
    }

    #[test]
    fn test_identity_serializes_as_plain_string() {
        let json = serde_json::to_string(&Identity::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
