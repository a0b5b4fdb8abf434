//! Moderation commands broadcast to every attached client.
//!
//! Commands are fire-and-forget. Every receiver evaluates
//! [`ModerationCommand::matches`] against its own session and evicts itself
//! on a match; a client that is offline when the command is sent never sees
//! it.

use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::roles::Role;
use crate::session::SessionToken;
use crate::types::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationKind {
    Kick,
    Demote,
}

impl ModerationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationKind::Kick => "kick",
            ModerationKind::Demote => "demote",
        }
    }
}

/// Who a command is addressed to.
///
/// Either an exact session token, a full `(name, last_name, role)` triple,
/// or both. An identity selector hits every session claiming that identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_session_token: Option<SessionToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_type: Option<Role>,
}

impl TargetSelector {
    pub fn session(token: SessionToken) -> Self {
        Self {
            target_session_token: Some(token),
            ..Default::default()
        }
    }

    pub fn identity(name: impl Into<String>, last_name: impl Into<String>, role: Role) -> Self {
        Self {
            target_name: Some(name.into()),
            target_last_name: Some(last_name.into()),
            target_user_type: Some(role),
            ..Default::default()
        }
    }

    fn identity_parts(&self) -> Option<(&str, &str, Role)> {
        match (
            self.target_name.as_deref(),
            self.target_last_name.as_deref(),
            self.target_user_type,
        ) {
            (Some(name), Some(last_name), Some(role)) => Some((name, last_name, role)),
            _ => None,
        }
    }

    /// A selector must carry a token or a complete identity triple.
    pub fn validate(&self) -> Result<(), String> {
        let has_token = self
            .target_session_token
            .as_ref()
            .is_some_and(|t| !t.as_str().trim().is_empty());
        let has_identity = self
            .identity_parts()
            .is_some_and(|(name, last_name, _)| {
                !name.trim().is_empty() || !last_name.trim().is_empty()
            });
        if has_token || has_identity {
            return Ok(());
        }
        Err(
            "Target must include target_session_token or all of \
             target_name, target_last_name and target_user_type"
                .to_string(),
        )
    }

    /// Token match takes precedence; otherwise compare the identity triple.
    pub fn matches(&self, own_token: &SessionToken, own_identity: Option<&Identity>) -> bool {
        if self.target_session_token.as_ref() == Some(own_token) {
            return true;
        }
        match (self.identity_parts(), own_identity) {
            (Some((name, last_name, role)), Some(identity)) => {
                identity.matches(name, last_name, role)
            }
            _ => false,
        }
    }
}

/// A transient moderation message. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationCommand {
    pub kind: ModerationKind,
    #[serde(flatten)]
    pub target: TargetSelector,
    /// Display name of the issuing super-admin, for the evicted client's UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_by: Option<String>,
    pub issued_at: Timestamp,
}

impl ModerationCommand {
    pub fn new(kind: ModerationKind, target: TargetSelector) -> Self {
        Self {
            kind,
            target,
            issued_by: None,
            issued_at: chrono::Utc::now(),
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issued_by = Some(issuer.into());
        self
    }

    pub fn matches(&self, own_token: &SessionToken, own_identity: Option<&Identity>) -> bool {
        self.target.matches(own_token, own_identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_kick_matches_case_insensitively() {
        let cmd = ModerationCommand::new(
            ModerationKind::Kick,
            TargetSelector::identity("Ana", "Pérez", Role::Worker),
        );
        let me = Identity::new("ana", "pérez", Role::Worker);
        assert!(cmd.matches(&SessionToken::generate(), Some(&me)));
    }

    #[test]
    fn identity_kick_ignores_other_role() {
        let cmd = ModerationCommand::new(
            ModerationKind::Kick,
            TargetSelector::identity("Ana", "Pérez", Role::Worker),
        );
        let me = Identity::new("ana", "perez", Role::Admin);
        assert!(!cmd.matches(&SessionToken::generate(), Some(&me)));
    }

    #[test]
    fn token_match_wins_after_rename() {
        let token = SessionToken::generate();
        let mut selector = TargetSelector::session(token.clone());
        selector.target_name = Some("Old".into());
        selector.target_last_name = Some("Name".into());
        selector.target_user_type = Some(Role::Admin);
        let cmd = ModerationCommand::new(ModerationKind::Demote, selector);

        let renamed = Identity::new("New", "Name", Role::Admin);
        assert!(cmd.matches(&token, Some(&renamed)));
    }

    #[test]
    fn token_selector_without_identity_ignores_strangers() {
        let cmd = ModerationCommand::new(
            ModerationKind::Demote,
            TargetSelector::session(SessionToken::from("target")),
        );
        let me = Identity::new("Ana", "Pérez", Role::Admin);
        assert!(!cmd.matches(&SessionToken::from("someone-else"), Some(&me)));
    }

    #[test]
    fn unidentified_client_only_matches_by_token() {
        let cmd = ModerationCommand::new(
            ModerationKind::Kick,
            TargetSelector::identity("Ana", "Pérez", Role::Worker),
        );
        assert!(!cmd.matches(&SessionToken::generate(), None));
    }

    #[test]
    fn empty_selector_is_invalid() {
        assert!(TargetSelector::default().validate().is_err());
    }

    #[test]
    fn partial_identity_selector_is_invalid() {
        let selector = TargetSelector {
            target_name: Some("Ana".into()),
            target_user_type: Some(Role::Worker),
            ..Default::default()
        };
        assert!(selector.validate().is_err());
    }

    #[test]
    fn complete_selectors_are_valid() {
        assert!(TargetSelector::session(SessionToken::generate())
            .validate()
            .is_ok());
        assert!(TargetSelector::identity("Luis", "Gómez", Role::Worker)
            .validate()
            .is_ok());
    }

    #[test]
    fn command_flattens_selector_fields() {
        let cmd = ModerationCommand::new(
            ModerationKind::Kick,
            TargetSelector::identity("Luis", "Gómez", Role::Worker),
        );
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["kind"], "kick");
        assert_eq!(json["target_name"], "Luis");
        assert_eq!(json["target_user_type"], "worker");
        assert!(json.get("target_session_token").is_none());
    }
}
