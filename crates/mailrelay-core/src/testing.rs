//! In-memory doubles for the provider and notifier seams, shared by the
//! unit tests across modules.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::notify::{Notifier, OutboundNotification};
use crate::provider::{BodyFormat, FetchedMessage, MailFolder, MailboxProvider, TokenGrant};

/// Error type shared by both doubles.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct MockError(pub String);

/// Scriptable [`MailboxProvider`].
#[derive(Debug, Default)]
pub struct MockProvider {
    inbox: Mutex<Vec<FetchedMessage>>,
    junk: Mutex<Vec<FetchedMessage>>,
    marked_read: Mutex<Vec<String>>,
    exchange_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    fail_exchange: Mutex<Option<String>>,
    fail_fetch: Mutex<Option<String>>,
    fail_mark_read: Mutex<Option<String>>,
}

impl MockProvider {
    /// Token every successful exchange hands out.
    pub const TOKEN: &'static str = "mock-access-token";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_inbox_message(
        &self,
        id: &str,
        from: Option<&str>,
        subject: &str,
        body: &str,
    ) {
        self.push_inbox(plain_message(id, from, subject, body));
    }

    pub fn push_inbox(&self, message: FetchedMessage) {
        self.inbox.lock().unwrap_or_else(|e| e.into_inner()).push(message);
    }

    pub fn push_junk(&self, message: FetchedMessage) {
        self.junk.lock().unwrap_or_else(|e| e.into_inner()).push(message);
    }

    pub fn fail_exchange(&self, reason: &str) {
        *self.fail_exchange.lock().unwrap_or_else(|e| e.into_inner()) = Some(reason.into());
    }

    pub fn fail_fetch(&self, reason: &str) {
        *self.fail_fetch.lock().unwrap_or_else(|e| e.into_inner()) = Some(reason.into());
    }

    pub fn fail_mark_read(&self, reason: &str) {
        *self.fail_mark_read.lock().unwrap_or_else(|e| e.into_inner()) = Some(reason.into());
    }

    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn marked_read(&self) -> Vec<String> {
        self.marked_read
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl MailboxProvider for MockProvider {
    type Error = MockError;

    async fn exchange_client_credential(
        &self,
        _tenant_id: &str,
        _client_id: &str,
        _client_secret: &str,
    ) -> Result<TokenGrant, Self::Error> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self
            .fail_exchange
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(MockError(reason));
        }
        Ok(TokenGrant {
            access_token: Self::TOKEN.to_string(),
            expires_in: 3600,
        })
    }

    async fn fetch_unread(
        &self,
        _access_token: &str,
        _mailbox_address: &str,
        folder: MailFolder,
    ) -> Result<Vec<FetchedMessage>, Self::Error> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self
            .fail_fetch
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(MockError(reason));
        }
        let source = match folder {
            MailFolder::Primary => &self.inbox,
            MailFolder::Junk => &self.junk,
        };
        Ok(source.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn mark_read(
        &self,
        _access_token: &str,
        _mailbox_address: &str,
        message_id: &str,
    ) -> Result<(), Self::Error> {
        if let Some(reason) = self
            .fail_mark_read
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(MockError(reason));
        }
        self.marked_read
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message_id.to_string());
        Ok(())
    }
}

/// Scriptable [`Notifier`] that records posts and mints sequential ids.
#[derive(Debug, Default)]
pub struct MockNotifier {
    posts: Mutex<Vec<(String, OutboundNotification)>>,
    next_id: AtomicUsize,
    fail: Mutex<Option<String>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, reason: &str) {
        *self.fail.lock().unwrap_or_else(|e| e.into_inner()) = Some(reason.into());
    }

    pub fn succeed(&self) {
        *self.fail.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn posts(&self) -> Vec<(String, OutboundNotification)> {
        self.posts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Notifier for MockNotifier {
    type Error = MockError;

    async fn post(
        &self,
        channel_id: &str,
        notification: &OutboundNotification,
    ) -> Result<String, Self::Error> {
        if let Some(reason) = self.fail.lock().unwrap_or_else(|e| e.into_inner()).clone() {
            return Err(MockError(reason));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.posts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((channel_id.to_string(), notification.clone()));
        Ok(format!("msg-{n}"))
    }
}

/// Builds a plain-text fetched message.
pub fn plain_message(
    id: &str,
    from: Option<&str>,
    subject: &str,
    body: &str,
) -> FetchedMessage {
    FetchedMessage {
        id: id.to_string(),
        from: from.map(ToString::to_string),
        subject: subject.to_string(),
        body: body.to_string(),
        body_format: BodyFormat::Text,
        received_at: Some("2024-06-01T10:00:00Z".to_string()),
    }
}
