//! # Message Handlers
//!
//! One arm per [`InboundMessage`] variant. Handlers only touch what they are
//! given through [`HandlerContext`]; collections are swapped for reconciled
//! copies, never edited in place.

use thiserror::Error;

use crate::barrier::{BarrierPolicy, FetchName, LoadingBarrier};
use crate::protocol::{Domain, InboundMessage};
use crate::views::notifications::{Notification, NotificationQueue};
use crate::views::theme::{ThemeCache, ThemeCacheError};
use crate::views::SyncState;

/// Local failure while applying a decoded message.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Theme was applied but could not be cached
    #[error("failed to cache theme: {0}")]
    ThemeCache(#[from] ThemeCacheError),
}

/// Mutable view of the engine handed to a handler.
pub struct HandlerContext<'a> {
    /// Synced state
    pub state: &'a mut SyncState,
    /// Initial-fetch barrier
    pub barrier: &'a mut LoadingBarrier,
    /// Toast sink
    pub notifications: &'a mut NotificationQueue,
    /// Local theme persistence
    pub theme_cache: &'a mut dyn ThemeCache,
    /// Whether domain errors release pending fetches
    pub policy: BarrierPolicy,
    /// Invitation workflow whose use focuses a connection
    pub workflow_marker: &'a str,
}

/// Fetches a domain error may answer under [`BarrierPolicy::ErrorsComplete`].
///
/// Settings errors cannot be attributed to one request, so they release
/// every settings-backed fetch.
pub fn fetches_for(domain: Domain) -> &'static [FetchName] {
    match domain {
        Domain::Contacts | Domain::Demographics => &[FetchName::Contacts],
        Domain::Credentials => &[FetchName::Credentials],
        Domain::Roles => &[FetchName::Roles],
        Domain::Users => &[FetchName::Users],
        Domain::Images => &[FetchName::Logo],
        Domain::Organization => &[FetchName::Organization],
        Domain::Settings => &[FetchName::Theme, FetchName::Organization],
        Domain::Error | Domain::Invitations | Domain::Presentations => &[],
    }
}

/// Apply one decoded message.
pub fn apply(message: InboundMessage, ctx: &mut HandlerContext<'_>) -> Result<(), HandlerError> {
    let state = &mut *ctx.state;

    match message {
        InboundMessage::ServerError { code, reason } => {
            ctx.notifications.push(Notification::error(format!(
                "Server Error - {code} \n Reason: '{reason}'"
            )));
        }

        InboundMessage::InvitationCreated { invitation_url } => {
            state.qr_code_url = Some(invitation_url);
        }

        InboundMessage::SingleUseUsed {
            workflow,
            connection_id,
        } => {
            if workflow.as_deref() == Some(ctx.workflow_marker) {
                state.focused_connection_id = connection_id;
            }
            state.qr_code_url = None;
        }

        InboundMessage::Contacts(incoming) => {
            state.contacts = state.contacts.reconciled(&incoming);
            ctx.barrier.deregister(FetchName::Contacts);
        }

        InboundMessage::Roles(incoming) => {
            state.roles = state.roles.reconciled(&incoming);
            ctx.barrier.deregister(FetchName::Roles);
        }

        InboundMessage::Users(incoming) => {
            state.users = state.users.reconciled(&incoming);
            ctx.barrier.deregister(FetchName::Users);
        }

        InboundMessage::UserLoaded(user) => {
            state.user = Some(user);
        }

        InboundMessage::UserCreated(user) => {
            state.users = state.users.appended(user.clone());
            state.user = Some(user);
        }

        InboundMessage::UserUpdated(user) => {
            state.users = state.users.replaced(user.clone());
            state.user = Some(user);
        }

        InboundMessage::PasswordUpdated(user) => {
            state.users = state.users.replaced(user);
        }

        InboundMessage::UserDeleted(user_id) => {
            state.users = state.users.without(&user_id);
        }

        InboundMessage::Credentials(incoming) => {
            let answered = state.focused_connection_id.as_deref().is_some_and(|focused| {
                incoming
                    .iter()
                    .any(|record| record.connection_id.as_deref() == Some(focused))
            });
            if answered {
                state.focused_connection_id = None;
            }
            state.credentials = state.credentials.reconciled(&incoming);
            ctx.barrier.deregister(FetchName::Credentials);
        }

        InboundMessage::PresentationVerified => {
            ctx.notifications
                .push(Notification::notice("Success - Verified Credential"));
        }

        InboundMessage::Theme(theme) => {
            state.theme = theme;
            ctx.barrier.deregister(FetchName::Theme);
            ctx.theme_cache.store(&state.theme)?;
        }

        InboundMessage::Logo(image) => {
            state.logo = Some(image);
            ctx.barrier.deregister(FetchName::Logo);
        }

        InboundMessage::OrganizationName(name) => {
            state.organization_name = Some(name);
            ctx.barrier.deregister(FetchName::Organization);
        }

        InboundMessage::Success { payload, .. } => {
            state.success_message = Some(payload);
        }

        InboundMessage::DomainError { domain, message } => {
            tracing::warn!(%domain, %message, "server reported domain error");
            state.error_message = Some(message);
            if ctx.policy == BarrierPolicy::ErrorsComplete {
                for fetch in fetches_for(domain) {
                    ctx.barrier.deregister(*fetch);
                }
            }
        }
    }

    Ok(())
}
