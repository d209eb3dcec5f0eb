//! Mailbox bindings: configured (channel, mailbox) pairings.

mod model;
mod repository;

pub use model::{BindingId, DEFAULT_ACK_EXPIRY_DAYS, MailboxBinding};
pub use repository::BindingRepository;
