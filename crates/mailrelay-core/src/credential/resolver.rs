//! Token resolution: reuse a fresh cached token or exchange a new one.

use chrono::Utc;
use tracing::debug;

use super::model::{CredentialResource, TOKEN_REUSE_MARGIN_SECS};
use super::repository::CredentialRepository;
use crate::error::PollError;
use crate::provider::{MailFolder, MailboxProvider, TokenGrant};

/// Returns a valid access token for a credential resource.
///
/// A cached token that stays valid more than 60 seconds is returned
/// unchanged. Otherwise a new app-only token is exchanged and persisted with
/// its expiry shortened by the same 60-second margin. There is no in-cycle
/// retry: a failed exchange surfaces as [`PollError::Credential`] and the
/// next scheduled cycle tries again.
///
/// # Errors
///
/// [`PollError::Credential`] when the exchange fails, [`PollError::Storage`]
/// when persisting the new token fails.
pub async fn valid_token<P: MailboxProvider>(
    provider: &P,
    credentials: &CredentialRepository,
    resource: &CredentialResource,
) -> Result<String, PollError> {
    let now = Utc::now();
    if resource.has_fresh_token(now) {
        if let Some(token) = &resource.access_token {
            return Ok(token.clone());
        }
    }

    let grant = provider
        .exchange_client_credential(
            &resource.tenant_id,
            &resource.client_id,
            &resource.client_secret,
        )
        .await
        .map_err(|e| PollError::Credential(e.to_string()))?;

    let expires_at = now.timestamp() + i64::from(grant.expires_in) - TOKEN_REUSE_MARGIN_SECS;
    credentials
        .store_token(&resource.id, &grant.access_token, expires_at)
        .await?;

    debug!(resource = %resource.id, expires_at, "Refreshed app-only token");
    Ok(grant.access_token)
}

/// Validates that a set of credentials can actually read a mailbox.
///
/// Exchanges a token and performs one non-mutating unread fetch against the
/// primary folder; nothing is marked read. Used by the setup path before a
/// binding is created.
///
/// # Errors
///
/// [`PollError::Credential`] when the exchange fails, [`PollError::Fetch`]
/// when the probe read fails.
pub async fn verify_access<P: MailboxProvider>(
    provider: &P,
    tenant_id: &str,
    client_id: &str,
    client_secret: &str,
    mailbox_address: &str,
) -> Result<TokenGrant, PollError> {
    let grant = provider
        .exchange_client_credential(tenant_id, client_id, client_secret)
        .await
        .map_err(|e| PollError::Credential(e.to_string()))?;

    provider
        .fetch_unread(&grant.access_token, mailbox_address, MailFolder::Primary)
        .await
        .map_err(|e| PollError::Fetch(e.to_string()))?;

    Ok(grant)
}
