//! # Message Router
//!
//! Two-level `(domain, kind)` lookup from a raw inbound frame to a typed
//! [`InboundMessage`], followed by the matching handler.
//!
//! Resolution order within a known domain:
//! 1. the domain's kind table,
//! 2. the generic `*_ERROR` rule (any domain may report an error),
//! 3. otherwise the frame is unrecognized.
//!
//! Every failure is absorbed here and turned into exactly one notification,
//! so a bad frame can never take down the event loop.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::errors::{ErrorCategory, CLIENT_WEBSOCKET_ERROR};
use crate::handlers::{self, HandlerContext, HandlerError};
use crate::protocol::{
    display_value, ContactsPayload, CredentialsPayload, Domain, DomainErrorPayload, Envelope,
    InboundMessage, InvitationPayload, OrganizationEntry, OrganizationSettingsPayload,
    PasswordUpdatedPayload, RolesPayload, ServerErrorPayload, SingleUsePayload,
    SingleUserPayload, ThemePayload, UserUpdatedPayload, UsersPayload,
};
use crate::views::notifications::Notification;

/// Suffix that marks a domain error kind.
const ERROR_SUFFIX: &str = "_ERROR";

// =============================================================================
// Errors
// =============================================================================

/// Why a frame could not be applied.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Unknown domain, or unknown kind within a known domain
    #[error("unrecognized message type: {0}")]
    Unrecognized(String),

    /// The frame was not a JSON envelope
    #[error("malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    /// The payload did not match the kind's shape
    #[error("malformed {domain}/{kind} payload: {source}")]
    Decode {
        /// Domain tag
        domain: Domain,
        /// Kind tag
        kind: String,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// A required element was absent (e.g. an empty `user` list)
    #[error("{domain}/{kind} payload is missing {field}")]
    Missing {
        /// Domain tag
        domain: Domain,
        /// Kind tag
        kind: String,
        /// Missing element
        field: &'static str,
    },

    /// The handler failed after decoding
    #[error("handler failed: {0}")]
    Handler(#[from] HandlerError),
}

impl DispatchError {
    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Handler(_) => ErrorCategory::Handler,
            _ => ErrorCategory::Protocol,
        }
    }

    /// The single notification this failure produces.
    pub fn to_notification(&self) -> Notification {
        match self {
            Self::Unrecognized(tag) => {
                Notification::error(format!("Error - Unrecognized Websocket Message Type: {tag}"))
            }
            _ => Notification::error(CLIENT_WEBSOCKET_ERROR),
        }
    }
}

/// Result of dispatching one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Decoded and applied
    Handled,
    /// No route; one notification emitted, nothing else changed
    Unrecognized,
    /// Decode or handler failure; one notification emitted
    Failed,
    /// Arrived while no socket was open, or after logout; not dispatched
    Discarded,
}

// =============================================================================
// Decode table
// =============================================================================

type Decoder = fn(Domain, &str, Value) -> Result<InboundMessage, DispatchError>;

fn parse<T: DeserializeOwned>(domain: Domain, kind: &str, payload: Value) -> Result<T, DispatchError> {
    serde_json::from_value(payload).map_err(|source| DispatchError::Decode {
        domain,
        kind: kind.to_string(),
        source,
    })
}

fn first<T>(items: Vec<T>, domain: Domain, kind: &str, field: &'static str) -> Result<T, DispatchError> {
    items.into_iter().next().ok_or_else(|| DispatchError::Missing {
        domain,
        kind: kind.to_string(),
        field,
    })
}

fn server_error(d: Domain, k: &str, v: Value) -> Result<InboundMessage, DispatchError> {
    let p: ServerErrorPayload = parse(d, k, v)?;
    Ok(InboundMessage::ServerError {
        code: display_value(&p.error_code),
        reason: display_value(&p.error_reason),
    })
}

fn invitation(d: Domain, k: &str, v: Value) -> Result<InboundMessage, DispatchError> {
    let p: InvitationPayload = parse(d, k, v)?;
    Ok(InboundMessage::InvitationCreated {
        invitation_url: p.invitation_record.invitation_url,
    })
}

fn single_use_used(d: Domain, k: &str, v: Value) -> Result<InboundMessage, DispatchError> {
    let p: SingleUsePayload = parse(d, k, v)?;
    Ok(InboundMessage::SingleUseUsed {
        workflow: p.workflow,
        connection_id: p.connection_id,
    })
}

fn contacts(d: Domain, k: &str, v: Value) -> Result<InboundMessage, DispatchError> {
    let p: ContactsPayload = parse(d, k, v)?;
    Ok(InboundMessage::Contacts(p.contacts))
}

fn roles(d: Domain, k: &str, v: Value) -> Result<InboundMessage, DispatchError> {
    let p: RolesPayload = parse(d, k, v)?;
    Ok(InboundMessage::Roles(p.roles))
}

fn users(d: Domain, k: &str, v: Value) -> Result<InboundMessage, DispatchError> {
    let p: UsersPayload = parse(d, k, v)?;
    Ok(InboundMessage::Users(p.users))
}

fn user(d: Domain, k: &str, v: Value) -> Result<InboundMessage, DispatchError> {
    let p: SingleUserPayload = parse(d, k, v)?;
    Ok(InboundMessage::UserLoaded(first(p.user, d, k, "user[0]")?))
}

fn user_created(d: Domain, k: &str, v: Value) -> Result<InboundMessage, DispatchError> {
    let p: SingleUserPayload = parse(d, k, v)?;
    Ok(InboundMessage::UserCreated(first(p.user, d, k, "user[0]")?))
}

fn user_updated(d: Domain, k: &str, v: Value) -> Result<InboundMessage, DispatchError> {
    let p: UserUpdatedPayload = parse(d, k, v)?;
    Ok(InboundMessage::UserUpdated(p.updated_user))
}

fn password_updated(d: Domain, k: &str, v: Value) -> Result<InboundMessage, DispatchError> {
    let p: PasswordUpdatedPayload = parse(d, k, v)?;
    Ok(InboundMessage::PasswordUpdated(p.updated_user))
}

fn user_deleted(d: Domain, k: &str, v: Value) -> Result<InboundMessage, DispatchError> {
    Ok(InboundMessage::UserDeleted(parse(d, k, v)?))
}

fn credentials(d: Domain, k: &str, v: Value) -> Result<InboundMessage, DispatchError> {
    let p: CredentialsPayload = parse(d, k, v)?;
    Ok(InboundMessage::Credentials(p.credential_records))
}

fn verified(_: Domain, _: &str, _: Value) -> Result<InboundMessage, DispatchError> {
    Ok(InboundMessage::PresentationVerified)
}

fn theme(d: Domain, k: &str, v: Value) -> Result<InboundMessage, DispatchError> {
    let p: ThemePayload = parse(d, k, v)?;
    Ok(InboundMessage::Theme(p.value))
}

fn logo(_: Domain, _: &str, v: Value) -> Result<InboundMessage, DispatchError> {
    Ok(InboundMessage::Logo(v))
}

fn organization_settings(d: Domain, k: &str, v: Value) -> Result<InboundMessage, DispatchError> {
    let p: OrganizationSettingsPayload = parse(d, k, v)?;
    Ok(InboundMessage::OrganizationName(p.company_name))
}

fn organization_name(d: Domain, k: &str, v: Value) -> Result<InboundMessage, DispatchError> {
    let entries: Vec<OrganizationEntry> = parse(d, k, v)?;
    let entry = first(entries, d, k, "[0].value")?;
    Ok(InboundMessage::OrganizationName(entry.value.name))
}

fn success(d: Domain, _: &str, v: Value) -> Result<InboundMessage, DispatchError> {
    Ok(InboundMessage::Success {
        domain: d,
        payload: v,
    })
}

fn domain_error(d: Domain, k: &str, v: Value) -> Result<InboundMessage, DispatchError> {
    // Some servers send the reason bare instead of wrapped in `{error}`.
    let message = match v {
        Value::Object(_) => display_value(&parse::<DomainErrorPayload>(d, k, v)?.error),
        other => display_value(&other),
    };
    Ok(InboundMessage::DomainError { domain: d, message })
}

static ROUTES: Lazy<HashMap<Domain, HashMap<&'static str, Decoder>>> = Lazy::new(|| {
    let table: &[(Domain, &'static str, Decoder)] = &[
        (Domain::Error, "SERVER_ERROR", server_error),
        (Domain::Invitations, "INVITATION", invitation),
        (Domain::Invitations, "SINGLE_USE_USED", single_use_used),
        (Domain::Contacts, "CONTACTS", contacts),
        (Domain::Roles, "ROLES", roles),
        (Domain::Users, "USERS", users),
        (Domain::Users, "USER", user),
        (Domain::Users, "USER_CREATED", user_created),
        (Domain::Users, "USER_UPDATED", user_updated),
        (Domain::Users, "PASSWORD_UPDATED", password_updated),
        (Domain::Users, "USER_DELETED", user_deleted),
        (Domain::Users, "USER_SUCCESS", success),
        (Domain::Credentials, "CREDENTIALS", credentials),
        (Domain::Presentations, "VERIFIED", verified),
        (Domain::Settings, "SETTINGS_THEME", theme),
        (Domain::Settings, "LOGO", logo),
        (Domain::Settings, "SETTINGS_ORGANIZATION", organization_settings),
        (Domain::Settings, "SETTINGS_SUCCESS", success),
        (Domain::Images, "IMAGE_LIST", logo),
        (Domain::Organization, "ORGANIZATION_NAME", organization_name),
    ];

    let mut routes: HashMap<Domain, HashMap<&'static str, Decoder>> = HashMap::new();
    for domain in Domain::ALL {
        routes.entry(domain).or_default();
    }
    for (domain, kind, decoder) in table {
        routes.entry(*domain).or_default().insert(*kind, *decoder);
    }
    routes
});

/// Resolve a (domain, kind) pair to its decoder.
///
/// The error names the tag that failed to match: the domain tag when the
/// domain is unknown, otherwise the kind tag.
fn resolve(domain_tag: &str, kind_tag: &str) -> Result<(Domain, Decoder), DispatchError> {
    let domain: Domain = domain_tag
        .parse()
        .map_err(|_| DispatchError::Unrecognized(domain_tag.to_string()))?;

    let decoder = ROUTES
        .get(&domain)
        .and_then(|kinds| kinds.get(kind_tag).copied());

    match decoder {
        Some(decoder) => Ok((domain, decoder)),
        None if kind_tag.ends_with(ERROR_SUFFIX) => Ok((domain, domain_error as Decoder)),
        None => Err(DispatchError::Unrecognized(kind_tag.to_string())),
    }
}

/// Decode a frame's payload without applying it.
pub fn decode(domain_tag: &str, kind_tag: &str, payload: Value) -> Result<InboundMessage, DispatchError> {
    let (domain, decoder) = resolve(domain_tag, kind_tag)?;
    decoder(domain, kind_tag, payload)
}

// =============================================================================
// Dispatch
// =============================================================================

/// Route one message to its handler.
///
/// Never fails: any error becomes exactly one notification in
/// `ctx.notifications`, and an unrecognized message changes nothing else.
pub fn dispatch(
    domain_tag: &str,
    kind_tag: &str,
    payload: Value,
    ctx: &mut HandlerContext<'_>,
) -> DispatchOutcome {
    tracing::debug!(domain = domain_tag, kind = kind_tag, "inbound message");

    let result = decode(domain_tag, kind_tag, payload)
        .and_then(|message| handlers::apply(message, ctx).map_err(DispatchError::from));

    match result {
        Ok(()) => DispatchOutcome::Handled,
        Err(error) => {
            let outcome = match error {
                DispatchError::Unrecognized(_) => DispatchOutcome::Unrecognized,
                _ => DispatchOutcome::Failed,
            };
            tracing::warn!(domain = domain_tag, kind = kind_tag, %error, "message not applied");
            ctx.notifications.push(error.to_notification());
            outcome
        }
    }
}

/// Parse a raw text frame and route it.
pub fn dispatch_frame(raw: &str, ctx: &mut HandlerContext<'_>) -> DispatchOutcome {
    match Envelope::from_json(raw) {
        Ok(envelope) => dispatch(&envelope.domain, &envelope.kind, envelope.payload, ctx),
        Err(source) => {
            let error = DispatchError::Envelope(source);
            tracing::warn!(%error, "dropping inbound frame");
            ctx.notifications.push(error.to_notification());
            DispatchOutcome::Failed
        }
    }
}
