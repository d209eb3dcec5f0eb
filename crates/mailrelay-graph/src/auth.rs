//! App-only token acquisition via the client-credential grant.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default authority for the Microsoft identity platform.
const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Scope requesting all application permissions granted to the registration.
const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Tenant/application credentials for an app-only registration.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    /// Azure AD tenant id.
    pub tenant_id: String,
    /// App registration client id.
    pub client_id: String,
    /// App registration client secret.
    pub client_secret: String,
}

/// Successful token response from the identity platform.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Bearer access token.
    pub access_token: String,
    /// Provider-reported lifetime in seconds.
    pub expires_in: u32,
}

/// Exchanges app credentials for an application-level access token.
///
/// Issues `grant_type=client_credentials` with the Graph `.default` scope
/// against the tenant's v2.0 token endpoint. An `authority` override is
/// accepted so tests can point at a local server.
///
/// # Errors
///
/// Returns [`Error::Status`] when the endpoint answers with a non-success
/// status (e.g. 401 for a bad secret), or a transport/decoding error.
pub async fn exchange_client_credential(
    http: &reqwest::Client,
    credentials: &AppCredentials,
    authority: Option<&str>,
) -> Result<TokenResponse> {
    let authority = authority.unwrap_or(DEFAULT_AUTHORITY);
    let url = format!(
        "{authority}/{tenant}/oauth2/v2.0/token",
        tenant = credentials.tenant_id
    );

    let mut params = HashMap::new();
    params.insert("grant_type", "client_credentials");
    params.insert("client_id", credentials.client_id.as_str());
    params.insert("client_secret", credentials.client_secret.as_str());
    params.insert("scope", GRAPH_DEFAULT_SCOPE);

    let response = http.post(&url).form(&params).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Status {
            status: status.as_u16(),
            body,
        });
    }

    let token: TokenResponse = response.json().await?;
    if token.access_token.is_empty() {
        return Err(Error::InvalidResponse(
            "token endpoint returned an empty access_token".into(),
        ));
    }

    Ok(token)
}
