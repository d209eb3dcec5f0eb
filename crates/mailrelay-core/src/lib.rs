//! # mailrelay-core
//!
//! Core polling pipeline for the mailrelay bot.
//!
//! This crate provides:
//! - Mailbox bindings (channel ↔ mailbox pairings with policy)
//! - Credential resources and app-only token lifecycle
//! - Suppression rules and rule matching
//! - The delivery-receipt ledger (deduplication + acknowledgement)
//! - The per-binding delivery pipeline
//! - The acknowledgement/expiry sweep
//! - The single-flight polling scheduler
//!
//! External collaborators (mailbox provider, chat notifier) are expressed as
//! traits in [`provider`] and [`notify`]; the Graph-backed provider adapter
//! lives behind the same seam.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod ack;
pub mod binding;
pub mod credential;
mod error;
pub mod normalize;
pub mod notify;
pub mod pipeline;
pub mod provider;
pub mod receipt;
pub mod rules;
pub mod scheduler;
mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use ack::{AUTO_ACK_ACTOR_ID, AUTO_ACK_DISPLAY_NAME, AckEngine, SweepStats};
pub use binding::{BindingId, BindingRepository, DEFAULT_ACK_EXPIRY_DAYS, MailboxBinding};
pub use credential::{CredentialRepository, CredentialResource, valid_token, verify_access};
pub use error::{Error, PollError, Result};
pub use normalize::{BodyPreview, clean_body, normalize_address, preview};
pub use notify::{Notifier, OutboundNotification};
pub use pipeline::DeliveryPipeline;
pub use provider::{
    BodyFormat, FetchedMessage, GraphMailboxProvider, MailFolder, MailboxProvider, TokenGrant,
};
pub use receipt::{DeliveryReceipt, ReceiptRepository};
pub use rules::{RuleId, RuleRepository, SuppressionRule, is_suppressed};
pub use scheduler::Scheduler;
pub use store::Store;
