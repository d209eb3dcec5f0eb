//! Mailbox provider contract and the Graph-backed implementation.
//!
//! The pipeline and scheduler are generic over [`MailboxProvider`] so tests
//! can drive them with in-memory doubles; production wires in
//! [`GraphMailboxProvider`].

use mailrelay_graph::{AppCredentials, GraphClient};

/// Mailbox folder the relay reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailFolder {
    /// The mailbox's main inbox.
    Primary,
    /// The junk/spam folder, consulted only when a binding opts in.
    Junk,
}

/// Format of a fetched message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyFormat {
    /// HTML body, needs stripping before display.
    Html,
    /// Plain text body.
    #[default]
    Text,
}

impl BodyFormat {
    /// Parses a provider-reported content type. Anything that is not `html`
    /// is treated as plain text.
    #[must_use]
    pub fn parse(content_type: &str) -> Self {
        if content_type.eq_ignore_ascii_case("html") {
            Self::Html
        } else {
            Self::Text
        }
    }
}

/// An application-level access token as granted by the provider.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    /// Bearer access token.
    pub access_token: String,
    /// Provider-reported lifetime in seconds.
    pub expires_in: u32,
}

/// An unread message as fetched from the provider.
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    /// Provider-assigned message id.
    pub id: String,
    /// Sender address, when reported.
    pub from: Option<String>,
    /// Subject line.
    pub subject: String,
    /// Raw body content.
    pub body: String,
    /// Body format.
    pub body_format: BodyFormat,
    /// Received timestamp as reported by the provider (RFC 3339).
    pub received_at: Option<String>,
}

/// Read-side mailbox operations the relay depends on.
///
/// Mark-read is the only write the relay ever performs upstream.
pub trait MailboxProvider {
    /// Provider-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Exchanges tenant/app credentials for an app-only access token.
    async fn exchange_client_credential(
        &self,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenGrant, Self::Error>;

    /// Fetches unread messages from one folder of a mailbox.
    async fn fetch_unread(
        &self,
        access_token: &str,
        mailbox_address: &str,
        folder: MailFolder,
    ) -> Result<Vec<FetchedMessage>, Self::Error>;

    /// Marks one message as read.
    async fn mark_read(
        &self,
        access_token: &str,
        mailbox_address: &str,
        message_id: &str,
    ) -> Result<(), Self::Error>;
}

/// [`MailboxProvider`] backed by Microsoft Graph.
#[derive(Debug, Clone, Default)]
pub struct GraphMailboxProvider {
    client: GraphClient,
    http: reqwest::Client,
    authority: Option<String>,
}

impl GraphMailboxProvider {
    /// Creates a provider against the public Graph endpoints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the identity authority and API root (tests).
    #[must_use]
    pub fn with_endpoints(
        mut self,
        authority: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        self.authority = Some(authority.into());
        self.client = self.client.with_base_url(api_base);
        self
    }

    const fn folder_name(folder: MailFolder) -> &'static str {
        match folder {
            MailFolder::Primary => "inbox",
            MailFolder::Junk => "junkemail",
        }
    }
}

impl MailboxProvider for GraphMailboxProvider {
    type Error = mailrelay_graph::Error;

    async fn exchange_client_credential(
        &self,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenGrant, Self::Error> {
        let credentials = AppCredentials {
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        };
        let token = mailrelay_graph::exchange_client_credential(
            &self.http,
            &credentials,
            self.authority.as_deref(),
        )
        .await?;

        Ok(TokenGrant {
            access_token: token.access_token,
            expires_in: token.expires_in,
        })
    }

    async fn fetch_unread(
        &self,
        access_token: &str,
        mailbox_address: &str,
        folder: MailFolder,
    ) -> Result<Vec<FetchedMessage>, Self::Error> {
        let messages = self
            .client
            .fetch_unread(access_token, mailbox_address, Self::folder_name(folder))
            .await?;

        Ok(messages
            .into_iter()
            .map(|m| FetchedMessage {
                id: m.id,
                from: m.from,
                subject: m.subject,
                body: m.body,
                body_format: BodyFormat::parse(&m.body_type),
                received_at: m.received_at,
            })
            .collect())
    }

    async fn mark_read(
        &self,
        access_token: &str,
        mailbox_address: &str,
        message_id: &str,
    ) -> Result<(), Self::Error> {
        self.client
            .mark_read(access_token, mailbox_address, message_id)
            .await
    }
}
