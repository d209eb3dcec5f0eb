//! Credential resources and app-only token lifecycle.

mod model;
mod repository;
mod resolver;

pub use model::{CredentialResource, TOKEN_REUSE_MARGIN_SECS};
pub use repository::CredentialRepository;
pub use resolver::{valid_token, verify_access};
