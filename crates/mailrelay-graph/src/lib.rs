//! # mailrelay-graph
//!
//! Microsoft Graph client for the mailrelay poller.
//!
//! This crate covers the two provider surfaces the relay needs:
//! - **App-only authentication**: `OAuth2` client-credential exchange against
//!   the Microsoft identity platform (no user interaction, no refresh token).
//! - **Mail access**: fetching unread messages from a mailbox folder and
//!   marking individual messages as read.
//!
//! The crate is a leaf: it knows nothing about channels, rules, or receipts.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod auth;
mod client;
mod error;

pub use auth::{AppCredentials, TokenResponse, exchange_client_credential};
pub use client::{GraphClient, GraphMessage};
pub use error::{Error, Result};
