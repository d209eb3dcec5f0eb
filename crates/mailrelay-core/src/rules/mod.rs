//! Suppression rules: per-(channel, mailbox) filters that keep noise out of
//! the channel.

mod model;
mod repository;

pub use model::{RuleId, SuppressionRule, is_suppressed};
pub use repository::RuleRepository;
