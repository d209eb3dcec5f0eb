//! Graph mail operations: unread fetch and mark-read.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default Graph API root.
const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Maximum number of messages requested per folder per fetch.
const FETCH_TOP: u32 = 10;

/// A message as returned by the Graph mail endpoints, reduced to the fields
/// the relay uses.
#[derive(Debug, Clone)]
pub struct GraphMessage {
    /// Graph message id.
    pub id: String,
    /// Sender address, when the provider reports one.
    pub from: Option<String>,
    /// Subject; `"(no subject)"` when absent.
    pub subject: String,
    /// Raw body content.
    pub body: String,
    /// Body content type (`html` or `text`).
    pub body_type: String,
    /// Received timestamp, RFC 3339, when reported.
    pub received_at: Option<String>,
}

/// Client for Graph mail operations against one access token at a time.
///
/// The token is passed per call rather than held here: tokens rotate per
/// mailbox and the relay shares one HTTP client across all of them.
#[derive(Debug, Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for GraphClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphClient {
    /// Creates a client against the public Graph endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the API root (used by tests against a local server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetches up to 10 unread messages from a mailbox folder.
    ///
    /// `folder` is a Graph well-known folder name (`inbox`, `junkemail`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`] for non-success responses and transport or
    /// decoding errors otherwise.
    pub async fn fetch_unread(
        &self,
        access_token: &str,
        mailbox_address: &str,
        folder: &str,
    ) -> Result<Vec<GraphMessage>> {
        let url = format!(
            "{base}/users/{mailbox_address}/mailFolders/{folder}/messages",
            base = self.base_url
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("$filter", "isRead eq false"),
                ("$top", &FETCH_TOP.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        let listing: MessageListing = response.json().await?;
        Ok(listing.value.into_iter().map(RawMessage::into_message).collect())
    }

    /// Marks a single message as read.
    ///
    /// Idempotent on the provider side; patching an already-read message
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Status`] for non-success responses and transport
    /// errors otherwise.
    pub async fn mark_read(
        &self,
        access_token: &str,
        mailbox_address: &str,
        message_id: &str,
    ) -> Result<()> {
        let url = format!(
            "{base}/users/{mailbox_address}/messages/{message_id}",
            base = self.base_url
        );

        let response = self
            .http
            .patch(&url)
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "isRead": true }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct MessageListing {
    #[serde(default)]
    value: Vec<RawMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    id: String,
    #[serde(default)]
    from: Option<RawRecipient>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    body: Option<RawBody>,
    #[serde(default)]
    received_date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecipient {
    #[serde(default)]
    email_address: Option<RawAddress>,
}

#[derive(Debug, Deserialize)]
struct RawAddress {
    #[serde(default)]
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBody {
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

impl RawMessage {
    fn into_message(self) -> GraphMessage {
        let (body, body_type) = self.body.map_or_else(
            || (String::new(), "text".to_string()),
            |b| {
                (
                    b.content.unwrap_or_default(),
                    b.content_type.unwrap_or_else(|| "text".to_string()),
                )
            },
        );

        GraphMessage {
            id: self.id,
            from: self.from.and_then(|r| r.email_address).and_then(|a| a.address),
            subject: self
                .subject
                .unwrap_or_else(|| "(no subject)".to_string()),
            body,
            body_type,
            received_at: self.received_date_time,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_decodes_graph_shape() {
        let json = r#"{
            "value": [{
                "id": "AAMk1",
                "subject": "Invoice",
                "from": {"emailAddress": {"address": "billing@example.com", "name": "Billing"}},
                "body": {"contentType": "html", "content": "<p>Hi</p>"},
                "receivedDateTime": "2024-06-01T10:00:00Z"
            }]
        }"#;

        let listing: MessageListing = serde_json::from_str(json).unwrap();
        let messages: Vec<GraphMessage> =
            listing.value.into_iter().map(RawMessage::into_message).collect();

        assert_eq!(messages.len(), 1);
        let m = &messages[0];
        assert_eq!(m.id, "AAMk1");
        assert_eq!(m.from.as_deref(), Some("billing@example.com"));
        assert_eq!(m.subject, "Invoice");
        assert_eq!(m.body, "<p>Hi</p>");
        assert_eq!(m.body_type, "html");
        assert_eq!(m.received_at.as_deref(), Some("2024-06-01T10:00:00Z"));
    }

    #[test]
    fn test_listing_tolerates_sparse_messages() {
        let json = r#"{"value": [{"id": "AAMk2"}]}"#;

        let listing: MessageListing = serde_json::from_str(json).unwrap();
        let m = listing.value.into_iter().next().unwrap().into_message();

        assert_eq!(m.id, "AAMk2");
        assert!(m.from.is_none());
        assert_eq!(m.subject, "(no subject)");
        assert_eq!(m.body, "");
        assert_eq!(m.body_type, "text");
        assert!(m.received_at.is_none());
    }

    #[test]
    fn test_empty_listing() {
        let listing: MessageListing = serde_json::from_str("{}").unwrap();
        assert!(listing.value.is_empty());
    }
}
