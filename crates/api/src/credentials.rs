//! Shared role passwords, held in memory and reloaded from the database.
//!
//! Three credentials exist: one per role plus a super-admin password that
//! yields an admin session with super-admin rights. Replacing any of them
//! bumps the credential revision, which invalidates every issued token.

use pricedesk_core::roles::Role;
use pricedesk_db::models::setting::keys;
use pricedesk_db::repositories::SettingRepo;
use pricedesk_db::DbPool;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::auth::password::{hash_password, verify_password};
use crate::config::BootstrapCredentials;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    Worker,
    Admin,
    SuperAdmin,
}

impl CredentialKind {
    /// Verification order. A password shared by two kinds unlocks the
    /// more privileged one.
    pub const ALL: [CredentialKind; 3] = [
        CredentialKind::SuperAdmin,
        CredentialKind::Admin,
        CredentialKind::Worker,
    ];

    pub fn hash_key(&self) -> &'static str {
        match self {
            CredentialKind::Worker => keys::WORKER_PASSWORD_HASH,
            CredentialKind::Admin => keys::ADMIN_PASSWORD_HASH,
            CredentialKind::SuperAdmin => keys::SUPER_PASSWORD_HASH,
        }
    }

    /// Role of the session this credential opens.
    pub fn role(&self) -> Role {
        match self {
            CredentialKind::Worker => Role::Worker,
            CredentialKind::Admin | CredentialKind::SuperAdmin => Role::Admin,
        }
    }
}

#[derive(Debug, Clone)]
struct Loaded {
    worker: Option<String>,
    admin: Option<String>,
    super_admin: Option<String>,
    revision: i64,
}

impl Loaded {
    fn hash(&self, kind: CredentialKind) -> Option<&str> {
        match kind {
            CredentialKind::Worker => self.worker.as_deref(),
            CredentialKind::Admin => self.admin.as_deref(),
            CredentialKind::SuperAdmin => self.super_admin.as_deref(),
        }
    }
}

impl Default for Loaded {
    fn default() -> Self {
        Self {
            worker: None,
            admin: None,
            super_admin: None,
            revision: 1,
        }
    }
}

/// In-memory copy of the credential hashes.
///
/// Owned by [`AppState`](crate::state::AppState). Call [`reload`](Self::reload)
/// after any write to the underlying settings rows.
#[derive(Debug, Default)]
pub struct CredentialStore {
    inner: RwLock<Loaded>,
}

impl CredentialStore {
    /// An empty store at revision 1. No password verifies until reloaded.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(pool: &DbPool) -> Result<Self, sqlx::Error> {
        let store = Self::new();
        store.reload(pool).await?;
        Ok(store)
    }

    /// Re-read all hashes and the revision. Returns the new revision.
    pub async fn reload(&self, pool: &DbPool) -> Result<i64, sqlx::Error> {
        let loaded = Loaded {
            worker: SettingRepo::get(pool, keys::WORKER_PASSWORD_HASH).await?,
            admin: SettingRepo::get(pool, keys::ADMIN_PASSWORD_HASH).await?,
            super_admin: SettingRepo::get(pool, keys::SUPER_PASSWORD_HASH).await?,
            revision: SettingRepo::credential_revision(pool).await?,
        };
        let revision = loaded.revision;
        let missing: Vec<&str> = CredentialKind::ALL
            .iter()
            .filter(|kind| loaded.hash(**kind).is_none())
            .map(|kind| kind.hash_key())
            .collect();
        if !missing.is_empty() {
            tracing::warn!(?missing, "Some credentials are not configured");
        }
        *self.inner.write().await = loaded;
        tracing::info!(revision, "Credentials loaded");
        Ok(revision)
    }

    pub async fn revision(&self) -> i64 {
        self.inner.read().await.revision
    }

    pub async fn is_configured(&self, kind: CredentialKind) -> bool {
        self.inner.read().await.hash(kind).is_some()
    }

    /// Find which credential `password` unlocks, if any.
    ///
    /// A malformed stored hash is logged and skipped so one bad row does not
    /// lock out the other roles.
    pub async fn verify(&self, password: &str) -> Option<CredentialKind> {
        let loaded = self.inner.read().await.clone();
        for kind in CredentialKind::ALL {
            let Some(hash) = loaded.hash(kind) else {
                continue;
            };
            match verify_password(password, hash) {
                Ok(true) => return Some(kind),
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(key = kind.hash_key(), error = %e, "Stored credential hash is malformed");
                }
            }
        }
        None
    }
}

/// Hash and store bootstrap passwords for credentials that have no hash yet.
///
/// Returns the kinds that were seeded. Existing hashes are left untouched.
pub async fn seed_missing(
    pool: &DbPool,
    bootstrap: &BootstrapCredentials,
) -> Result<Vec<CredentialKind>, SeedError> {
    let mut seeded = Vec::new();
    for (kind, password) in [
        (CredentialKind::Worker, bootstrap.worker.as_deref()),
        (CredentialKind::Admin, bootstrap.admin.as_deref()),
        (CredentialKind::SuperAdmin, bootstrap.super_admin.as_deref()),
    ] {
        let Some(password) = password else {
            continue;
        };
        if SettingRepo::get(pool, kind.hash_key()).await?.is_some() {
            continue;
        }
        let hash = hash_password(password).map_err(|e| SeedError::Hash(e.to_string()))?;
        SettingRepo::set(pool, kind.hash_key(), &hash).await?;
        tracing::info!(key = kind.hash_key(), "Seeded credential from bootstrap password");
        seeded.push(kind);
    }
    Ok(seeded)
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Password hashing failed: {0}")]
    Hash(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_store_verifies_nothing() {
        let store = CredentialStore::new();
        assert_eq!(store.revision().await, 1);
        assert_eq!(store.verify("anything").await, None);
        assert!(!store.is_configured(CredentialKind::Worker).await);
    }

    #[tokio::test]
    async fn more_privileged_kind_wins_on_shared_password() {
        let store = CredentialStore::new();
        {
            let mut inner = store.inner.write().await;
            inner.worker = Some(hash_password("shared").unwrap());
            inner.admin = Some(hash_password("shared").unwrap());
        }
        assert_eq!(store.verify("shared").await, Some(CredentialKind::Admin));
    }

    #[tokio::test]
    async fn malformed_hash_does_not_block_other_kinds() {
        let store = CredentialStore::new();
        {
            let mut inner = store.inner.write().await;
            inner.super_admin = Some("garbage".to_string());
            inner.worker = Some(hash_password("mostrador").unwrap());
        }
        assert_eq!(store.verify("mostrador").await, Some(CredentialKind::Worker));
    }

    #[test]
    fn kinds_map_to_roles() {
        assert_eq!(CredentialKind::Worker.role(), Role::Worker);
        assert_eq!(CredentialKind::Admin.role(), Role::Admin);
        assert_eq!(CredentialKind::SuperAdmin.role(), Role::Admin);
        assert_eq!(CredentialKind::SuperAdmin.hash_key(), "super_password_hash");
    }
}
