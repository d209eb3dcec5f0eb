//! Discord-backed notifier.

use mailrelay_core::{Notifier, OutboundNotification};
use serde::{Deserialize, Serialize};

/// Embed side-bar color, Discord's blurple.
const EMBED_COLOR: u32 = 0x5865_F2;

/// Errors posting to Discord.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Discord answered with a non-success status.
    #[error("Discord API error {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body as returned.
        body: String,
    },
}

/// Posts notifications as embeds via the Discord REST API.
#[derive(Debug, Clone)]
pub struct DiscordNotifier {
    http: reqwest::Client,
    bot_token: String,
    api_base: String,
}

#[derive(Serialize)]
struct CreateMessage {
    embeds: Vec<Embed>,
}

#[derive(Serialize)]
struct Embed {
    title: String,
    description: String,
    color: u32,
    fields: Vec<EmbedField>,
    footer: EmbedFooter,
}

#[derive(Serialize)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Serialize)]
struct EmbedFooter {
    text: String,
}

#[derive(Deserialize)]
struct CreatedMessage {
    id: String,
}

impl DiscordNotifier {
    /// Creates a notifier against an API root.
    pub fn new(
        http: reqwest::Client,
        bot_token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            http,
            bot_token: bot_token.into(),
            api_base: api_base.into(),
        }
    }

    fn build_embed(notification: &OutboundNotification) -> Embed {
        let mut description = if notification.preview.is_empty() {
            "_No content_".to_string()
        } else {
            notification.preview.clone()
        };
        if notification.truncated {
            description.push_str("\n\n_Message truncated_");
        }

        let mut fields = vec![EmbedField {
            name: "From".to_string(),
            value: notification
                .sender
                .clone()
                .unwrap_or_else(|| "Unknown sender".to_string()),
            inline: true,
        }];
        if let Some(received_at) = &notification.received_at {
            fields.push(EmbedField {
                name: "Received".to_string(),
                value: received_at.clone(),
                inline: true,
            });
        }

        Embed {
            title: notification.subject.clone(),
            description,
            color: EMBED_COLOR,
            fields,
            footer: EmbedFooter {
                text: "Awaiting acknowledgement".to_string(),
            },
        }
    }
}

impl Notifier for DiscordNotifier {
    type Error = NotifyError;

    async fn post(
        &self,
        channel_id: &str,
        notification: &OutboundNotification,
    ) -> Result<String, Self::Error> {
        let url = format!("{}/channels/{channel_id}/messages", self.api_base);
        let payload = CreateMessage {
            embeds: vec![Self::build_embed(notification)],
        };

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bot {}", self.bot_token))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let created: CreatedMessage = response.json().await?;
        Ok(created.id)
    }
}
