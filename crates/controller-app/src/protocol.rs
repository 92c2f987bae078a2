//! # Wire Protocol
//!
//! Every message in either direction is one JSON text frame:
//!
//! ```text
//! { "context": <domain>, "type": <kind>, "data": <payload> }
//! ```
//!
//! There is no message id. A request and its answer are linked only by the
//! domain/kind convention (`CONTACTS`/`GET_ALL` is answered by
//! `CONTACTS`/`CONTACTS`), which the server has to honor.

use crate::views::{Contact, Credential, Role, Theme, User};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Domains
// =============================================================================

/// Closed set of top-level message categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    /// Server-level failures
    Error,
    /// Connection invitations
    Invitations,
    /// Contacts
    Contacts,
    /// Contact demographics
    Demographics,
    /// Roles
    Roles,
    /// User accounts
    Users,
    /// Credential exchanges
    Credentials,
    /// Proof presentations
    Presentations,
    /// Organization settings (theme, logo, name)
    Settings,
    /// Uploaded images
    Images,
    /// Organization record
    Organization,
}

impl Domain {
    /// Every domain, in wire-table order.
    pub const ALL: [Domain; 11] = [
        Domain::Error,
        Domain::Invitations,
        Domain::Contacts,
        Domain::Demographics,
        Domain::Roles,
        Domain::Users,
        Domain::Credentials,
        Domain::Presentations,
        Domain::Settings,
        Domain::Images,
        Domain::Organization,
    ];

    /// Wire tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Invitations => "INVITATIONS",
            Self::Contacts => "CONTACTS",
            Self::Demographics => "DEMOGRAPHICS",
            Self::Roles => "ROLES",
            Self::Users => "USERS",
            Self::Credentials => "CREDENTIALS",
            Self::Presentations => "PRESENTATIONS",
            Self::Settings => "SETTINGS",
            Self::Images => "IMAGES",
            Self::Organization => "ORGANIZATION",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Unknown domain tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown domain: {0}")]
pub struct UnknownDomain(pub String);

impl FromStr for Domain {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::ALL
            .iter()
            .copied()
            .find(|d| d.tag() == s)
            .ok_or_else(|| UnknownDomain(s.to_string()))
    }
}

// =============================================================================
// Envelope
// =============================================================================

/// One framed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Domain tag
    #[serde(rename = "context")]
    pub domain: String,
    /// Kind tag within the domain
    #[serde(rename = "type")]
    pub kind: String,
    /// Kind-specific payload
    #[serde(rename = "data", default)]
    pub payload: Value,
}

impl Envelope {
    /// Create an envelope for a known domain.
    pub fn new(domain: Domain, kind: impl Into<String>, payload: Value) -> Self {
        Self {
            domain: domain.tag().to_string(),
            kind: kind.into(),
            payload,
        }
    }

    /// Serialize to a text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a text frame.
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

// =============================================================================
// Outbound requests
// =============================================================================

/// Requests the engine itself issues.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// `SETTINGS`/`GET_THEME`
    GetTheme,
    /// `SETTINGS`/`SET_THEME`
    SetTheme(Theme),
    /// `SETTINGS`/`GET_ORGANIZATION_NAME`
    GetOrganizationName,
    /// `CONTACTS`/`GET_ALL`, joined with extra tables
    GetContacts {
        /// Tables the server joins into each contact
        additional_tables: Vec<String>,
    },
    /// `CREDENTIALS`/`GET_ALL`
    GetCredentials,
    /// `ROLES`/`GET_ALL`
    GetRoles,
    /// `IMAGES`/`GET_ALL`
    GetImages,
    /// `USERS`/`GET_ALL`
    GetUsers,
}

impl Request {
    /// Domain the request is sent under.
    pub fn domain(&self) -> Domain {
        match self {
            Self::GetTheme | Self::SetTheme(_) | Self::GetOrganizationName => Domain::Settings,
            Self::GetContacts { .. } => Domain::Contacts,
            Self::GetCredentials => Domain::Credentials,
            Self::GetRoles => Domain::Roles,
            Self::GetImages => Domain::Images,
            Self::GetUsers => Domain::Users,
        }
    }

    /// Kind tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GetTheme => "GET_THEME",
            Self::SetTheme(_) => "SET_THEME",
            Self::GetOrganizationName => "GET_ORGANIZATION_NAME",
            Self::GetContacts { .. }
            | Self::GetCredentials
            | Self::GetRoles
            | Self::GetImages
            | Self::GetUsers => "GET_ALL",
        }
    }

    /// Build the envelope.
    pub fn into_envelope(self) -> Envelope {
        let domain = self.domain();
        let kind = self.kind();
        let payload = match self {
            Self::SetTheme(theme) => serde_json::to_value(theme).unwrap_or_default(),
            Self::GetContacts { additional_tables } => {
                serde_json::json!({ "additional_tables": additional_tables })
            }
            _ => Value::Object(serde_json::Map::new()),
        };
        Envelope::new(domain, kind, payload)
    }
}

// =============================================================================
// Inbound messages
// =============================================================================

/// Decoded inbound message, one variant per recognized (domain, kind).
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// `ERROR`/`SERVER_ERROR`
    ServerError {
        /// Server error code
        code: String,
        /// Human-readable reason
        reason: String,
    },
    /// `INVITATIONS`/`INVITATION`
    InvitationCreated {
        /// URL to render as a QR code
        invitation_url: String,
    },
    /// `INVITATIONS`/`SINGLE_USE_USED`
    SingleUseUsed {
        /// Workflow marker the invitation was created for
        workflow: Option<String>,
        /// Connection that consumed the invitation
        connection_id: Option<String>,
    },
    /// `CONTACTS`/`CONTACTS`
    Contacts(Vec<Contact>),
    /// `ROLES`/`ROLES`
    Roles(Vec<Role>),
    /// `USERS`/`USERS`
    Users(Vec<User>),
    /// `USERS`/`USER`
    UserLoaded(User),
    /// `USERS`/`USER_CREATED`
    UserCreated(User),
    /// `USERS`/`USER_UPDATED`
    UserUpdated(User),
    /// `USERS`/`PASSWORD_UPDATED`
    PasswordUpdated(User),
    /// `USERS`/`USER_DELETED`
    UserDeleted(u64),
    /// `CREDENTIALS`/`CREDENTIALS`
    Credentials(Vec<Credential>),
    /// `PRESENTATIONS`/`VERIFIED`
    PresentationVerified,
    /// `SETTINGS`/`SETTINGS_THEME`
    Theme(Theme),
    /// `SETTINGS`/`LOGO` and `IMAGES`/`IMAGE_LIST`
    Logo(Value),
    /// `SETTINGS`/`SETTINGS_ORGANIZATION` and `ORGANIZATION`/`ORGANIZATION_NAME`
    OrganizationName(String),
    /// `*_SUCCESS`
    Success {
        /// Domain that reported success
        domain: Domain,
        /// Opaque success payload for the consuming view
        payload: Value,
    },
    /// `*_ERROR` under any domain
    DomainError {
        /// Domain that reported the error
        domain: Domain,
        /// Server-described reason
        message: String,
    },
}

// ─── Payload shapes ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct ServerErrorPayload {
    #[serde(rename = "errorCode", default)]
    pub error_code: Value,
    #[serde(rename = "errorReason", default)]
    pub error_reason: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InvitationRecord {
    pub invitation_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InvitationPayload {
    pub invitation_record: InvitationRecord,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SingleUsePayload {
    #[serde(default)]
    pub workflow: Option<String>,
    #[serde(default)]
    pub connection_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContactsPayload {
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RolesPayload {
    pub roles: Vec<Role>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsersPayload {
    pub users: Vec<User>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SingleUserPayload {
    pub user: Vec<User>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserUpdatedPayload {
    #[serde(rename = "updatedUser")]
    pub updated_user: User,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PasswordUpdatedPayload {
    #[serde(rename = "updatedUserPassword")]
    pub updated_user: User,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CredentialsPayload {
    pub credential_records: Vec<Credential>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ThemePayload {
    pub value: Theme,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrganizationSettingsPayload {
    #[serde(rename = "companyName")]
    pub company_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrganizationValue {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrganizationEntry {
    pub value: OrganizationValue,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DomainErrorPayload {
    #[serde(default)]
    pub error: Value,
}

/// Render a JSON scalar the way the server meant it: strings unquoted,
/// everything else as compact JSON.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_tags_roundtrip() {
        for domain in Domain::ALL {
            assert_eq!(domain.tag().parse::<Domain>(), Ok(domain));
        }
        assert_eq!(
            "NOPE".parse::<Domain>(),
            Err(UnknownDomain("NOPE".to_string()))
        );
    }

    #[test]
    fn test_envelope_wire_field_names() {
        let envelope = Request::GetContacts {
            additional_tables: vec!["Demographic".into(), "Passport".into()],
        }
        .into_envelope();

        let json: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(json["context"], "CONTACTS");
        assert_eq!(json["type"], "GET_ALL");
        assert_eq!(json["data"]["additional_tables"][1], "Passport");
    }

    #[test]
    fn test_envelope_missing_data_defaults_to_null() {
        let envelope = Envelope::from_json(r#"{"context":"PRESENTATIONS","type":"VERIFIED"}"#).unwrap();
        assert_eq!(envelope.payload, Value::Null);
    }

    #[test]
    fn test_plain_requests_send_empty_object() {
        let envelope = Request::GetTheme.into_envelope();
        assert_eq!(envelope.domain, "SETTINGS");
        assert_eq!(envelope.kind, "GET_THEME");
        assert_eq!(envelope.payload, serde_json::json!({}));
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&serde_json::json!("boom")), "boom");
        assert_eq!(display_value(&serde_json::json!(500)), "500");
        assert_eq!(display_value(&Value::Null), "");
    }
}
