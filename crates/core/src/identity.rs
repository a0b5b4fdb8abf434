//! Claimed user identity and the deduplication key derived from it.
//!
//! A "logical user" is identified by the name they claim plus their role,
//! not by connection: several tabs showing the same name and role collapse
//! into one entry in the connected-user list.

use serde::{Deserialize, Serialize};

use crate::roles::Role;

/// Separator between the parts of a dedup key.
///
/// Keeps `("ab", "c")` and `("a", "bc")` from producing the same key.
const KEY_SEPARATOR: char = '|';

/// Display identity claimed by a client after login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
}

impl Identity {
    pub fn new(name: impl Into<String>, last_name: impl Into<String>, role: Role) -> Self {
        Self {
            name: Some(name.into()),
            last_name: Some(last_name.into()),
            role,
        }
    }

    /// Lowercased `name|last_name|role`. Missing names contribute `""`.
    pub fn dedup_key(&self) -> String {
        dedup_key(self.name.as_deref(), self.last_name.as_deref(), self.role)
    }

    /// Case-insensitive comparison against a `(name, last_name, role)` triple.
    ///
    /// Accents are significant: `"Pérez"` does not match `"perez"`.
    pub fn matches(&self, name: &str, last_name: &str, role: Role) -> bool {
        self.role == role
            && normalize(self.name.as_deref()) == normalize(Some(name))
            && normalize(self.last_name.as_deref()) == normalize(Some(last_name))
    }

    /// `"Name LastName"`, skipping missing parts.
    pub fn display_name(&self) -> String {
        [self.name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Build a dedup key from loose parts.
pub fn dedup_key(name: Option<&str>, last_name: Option<&str>, role: Role) -> String {
    format!(
        "{}{KEY_SEPARATOR}{}{KEY_SEPARATOR}{}",
        normalize(name),
        normalize(last_name),
        role.as_str()
    )
}

fn normalize(part: Option<&str>) -> String {
    part.unwrap_or_default().trim().to_lowercase()
}
