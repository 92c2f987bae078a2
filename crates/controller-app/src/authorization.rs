//! # Role-Based Authorization
//!
//! Static role → permission rules. A permission is granted when any of the
//! identity's roles lists it. Rules ship with built-in defaults and can be
//! replaced from configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::session::Identity;

/// Well-known permission names.
pub mod permissions {
    /// Read contacts
    pub const CONTACTS_READ: &str = "contacts:read";
    /// Create/update contacts
    pub const CONTACTS_UPDATE: &str = "contacts:update";
    /// Read demographics joined into contacts
    pub const DEMOGRAPHICS_READ: &str = "demographics:read";
    /// Edit demographics
    pub const DEMOGRAPHICS_UPDATE: &str = "demographics:update";
    /// Read credential exchanges
    pub const CREDENTIALS_READ: &str = "credentials:read";
    /// Issue credentials
    pub const CREDENTIALS_ISSUE: &str = "credentials:issue";
    /// Read roles
    pub const ROLES_READ: &str = "roles:read";
    /// Read user accounts
    pub const USERS_READ: &str = "users:read";
    /// Create user accounts
    pub const USERS_CREATE: &str = "users:create";
    /// Update user accounts
    pub const USERS_UPDATE: &str = "users:update";
    /// Delete user accounts
    pub const USERS_DELETE: &str = "users:delete";
    /// Create invitations
    pub const INVITATIONS_CREATE: &str = "invitations:create";
    /// Request presentations
    pub const PRESENTATIONS_REQUEST: &str = "presentations:request";
    /// Edit organization settings
    pub const SETTINGS_UPDATE: &str = "settings:update";
}

/// Grants for one role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRules {
    /// Permissions always granted to this role
    #[serde(rename = "static", default)]
    pub granted: Vec<String>,
}

/// Role name → grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rules {
    roles: BTreeMap<String, RoleRules>,
}

impl Default for Rules {
    fn default() -> Self {
        use permissions::*;

        let reader = [
            CONTACTS_READ,
            DEMOGRAPHICS_READ,
            CREDENTIALS_READ,
            ROLES_READ,
        ];
        let moderator: Vec<&str> = reader
            .iter()
            .copied()
            .chain([
                CONTACTS_UPDATE,
                DEMOGRAPHICS_UPDATE,
                CREDENTIALS_ISSUE,
                INVITATIONS_CREATE,
                PRESENTATIONS_REQUEST,
                USERS_READ,
            ])
            .collect();
        let admin: Vec<&str> = moderator
            .iter()
            .copied()
            .chain([USERS_CREATE, USERS_UPDATE, USERS_DELETE, SETTINGS_UPDATE])
            .collect();

        Self::new([
            ("admin", admin),
            ("moderator", moderator),
            ("user", reader.to_vec()),
        ])
    }
}

impl Rules {
    /// Build rules from `(role, permissions)` pairs.
    pub fn new<'a, R, P>(roles: R) -> Self
    where
        R: IntoIterator<Item = (&'a str, P)>,
        P: IntoIterator<Item = &'a str>,
    {
        Self {
            roles: roles
                .into_iter()
                .map(|(role, perms)| {
                    (
                        role.to_string(),
                        RoleRules {
                            granted: perms.into_iter().map(str::to_string).collect(),
                        },
                    )
                })
                .collect(),
        }
    }

    /// Check whether a single role grants a permission.
    pub fn role_grants(&self, role: &str, permission: &str) -> bool {
        self.roles
            .get(role)
            .is_some_and(|rules| rules.granted.iter().any(|p| p == permission))
    }

    /// Known role names.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }
}

/// True iff every permission is granted by at least one of the identity's
/// roles. An absent identity is granted nothing; an empty permission list is
/// always granted.
pub fn check(rules: &Rules, identity: Option<&Identity>, permissions: &[&str]) -> bool {
    let Some(identity) = identity else {
        return permissions.is_empty();
    };
    permissions.iter().all(|permission| {
        identity
            .roles
            .iter()
            .any(|role| rules.role_grants(role, permission))
    })
}
