//! Rule model and matching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::normalize_address;

/// Unique identifier for a suppression rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub i64);

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A filter scoped to one (channel, mailbox) binding.
///
/// A rule matches a message when the sender matches exactly (canonical
/// comparison) and, if a subject filter is set, the subject contains it
/// case-insensitively. Matched messages are silently marked read upstream
/// and never delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionRule {
    /// Unique identifier (None for unsaved rules).
    pub id: Option<RuleId>,
    /// Owning channel id.
    pub channel_id: String,
    /// Mailbox address of the scope, canonical form.
    pub mailbox_address: String,
    /// Friendly name shown in settings.
    pub name: String,
    /// Sender address to match, canonical form.
    pub sender: String,
    /// Optional case-insensitive substring the subject must contain.
    pub subject_contains: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl SuppressionRule {
    /// Creates an unsaved rule. The sender and mailbox address are
    /// canonicalized; an empty subject filter becomes no filter.
    #[must_use]
    pub fn new(
        channel_id: impl Into<String>,
        mailbox_address: &str,
        name: impl Into<String>,
        sender: &str,
        subject_contains: Option<&str>,
    ) -> Self {
        Self {
            id: None,
            channel_id: channel_id.into(),
            mailbox_address: normalize_address(mailbox_address),
            name: name.into(),
            sender: normalize_address(sender),
            subject_contains: subject_contains
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string),
            created_at: Utc::now(),
        }
    }

    /// Whether this rule matches the given message metadata.
    ///
    /// Pure: depends only on the rule and the arguments. A message with no
    /// sender never matches, since sender equality cannot hold.
    #[must_use]
    pub fn is_match(&self, sender: Option<&str>, subject: &str) -> bool {
        let sender_match = sender
            .is_some_and(|s| normalize_address(s) == self.sender);

        let subject_match = self.subject_contains.as_ref().is_none_or(|filter| {
            subject.to_lowercase().contains(&filter.to_lowercase())
        });

        sender_match && subject_match
    }
}

/// Whether any rule in the set suppresses the message (OR across rules).
///
/// Order-independent: only the existence of a matching rule counts.
#[must_use]
pub fn is_suppressed(rules: &[SuppressionRule], sender: Option<&str>, subject: &str) -> bool {
    rules.iter().any(|rule| rule.is_match(sender, subject))
}
