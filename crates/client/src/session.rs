//! Per-process session identity.

use pricedesk_core::identity::Identity;
use pricedesk_core::session::SessionToken;

/// The token this process was started with plus whoever is logged in.
///
/// The token never changes for the lifetime of the value. The identity is
/// replaced on login, promotion or demotion and cleared on logout or
/// self-eviction.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    token: SessionToken,
    identity: Option<Identity>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::with_token(SessionToken::generate())
    }

    pub fn with_token(token: SessionToken) -> Self {
        Self {
            token,
            identity: None,
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    /// Drop the cached identity. Returns what was cleared.
    pub fn clear_identity(&mut self) -> Option<Identity> {
        self.identity.take()
    }

    pub fn is_identified(&self) -> bool {
        self.identity.is_some()
    }
}

impl Default for SessionIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use pricedesk_core::roles::Role;

    use super::*;

    #[test]
    fn each_session_gets_its_own_token() {
        let a = SessionIdentity::new();
        let b = SessionIdentity::new();
        assert_ne!(a.token(), b.token());
    }

    #[test]
    fn identity_can_change_without_touching_token() {
        let mut session = SessionIdentity::with_token(SessionToken::from("tab-1"));
        assert!(!session.is_identified());

        session.set_identity(Identity::new("Luis", "Gómez", Role::Worker));
        session.set_identity(Identity::new("Luis", "Gómez", Role::Admin));
        assert_eq!(session.identity().map(|i| i.role), Some(Role::Admin));

        let cleared = session.clear_identity();
        assert!(cleared.is_some());
        assert!(session.identity().is_none());
        assert_eq!(session.token().as_str(), "tab-1");
    }
}
