//! Process-local session tokens.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Length of a generated session token (alphanumeric characters).
pub const SESSION_TOKEN_LENGTH: usize = 24;

/// Random identifier a client generates once per tab/process.
///
/// Stands in for a connection identity that survives reconnects. Uniqueness
/// is practical, not cryptographic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Self {
        let token: String = rand::rng()
            .sample_iter(&rand::distr::Alphanumeric)
            .take(SESSION_TOKEN_LENGTH)
            .map(char::from)
            .collect();
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn generated_token_is_alphanumeric() {
        let token = SessionToken::generate();
        assert_eq!(token.as_str().len(), SESSION_TOKEN_LENGTH);
        assert!(token.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generated_tokens_do_not_repeat() {
        let tokens: HashSet<_> = (0..1000).map(|_| SessionToken::generate()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn serializes_as_plain_string() {
        let token = SessionToken::from("abc123");
        assert_eq!(serde_json::to_string(&token).unwrap(), r#""abc123""#);
    }
}
