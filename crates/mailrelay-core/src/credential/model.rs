//! Credential resource model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::normalize_address;

/// Safety margin applied on both sides of token expiry: a cached token is
/// reused only if it stays valid this much longer, and stored expiries are
/// shortened by the same amount.
pub const TOKEN_REUSE_MARGIN_SECS: i64 = 60;

/// Tenant/application credentials for one mailbox, plus the cached token.
///
/// Kept separate from [`crate::MailboxBinding`] so several bindings could in
/// principle share one mailbox's credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialResource {
    /// Resource id; derived from the canonical mailbox address unless set
    /// explicitly.
    pub id: String,
    /// Mailbox address this registration covers, canonical form.
    pub mailbox_address: String,
    /// Azure AD tenant id.
    pub tenant_id: String,
    /// App registration client id.
    pub client_id: String,
    /// App registration client secret.
    pub client_secret: String,
    /// Cached access token, if one has been issued.
    pub access_token: Option<String>,
    /// Epoch seconds at which the cached token expires.
    pub token_expires_at: Option<i64>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl CredentialResource {
    /// Creates an unsaved resource keyed by the canonical mailbox address.
    #[must_use]
    pub fn new(
        mailbox_address: &str,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        let address = normalize_address(mailbox_address);
        let now = Utc::now();
        Self {
            id: address.clone(),
            mailbox_address: address,
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            access_token: None,
            token_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overrides the derived resource id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Whether the cached token is present and stays valid beyond the reuse
    /// margin at `now`.
    #[must_use]
    pub fn has_fresh_token(&self, now: DateTime<Utc>) -> bool {
        match (&self.access_token, self.token_expires_at) {
            (Some(_), Some(expires_at)) => {
                expires_at > now.timestamp() + TOKEN_REUSE_MARGIN_SECS
            }
            _ => false,
        }
    }
}
