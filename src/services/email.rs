//! Outbound email.

use async_trait::async_trait;

use crate::errors::AppError;

/// A rendered message.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivers mail. Callers never block on or depend on delivery succeeding.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), AppError>;
}

/// Records outgoing mail in the log instead of delivering it.
///
/// Only the envelope is logged. Bodies carry reset links and are dropped.
#[derive(Debug, Default)]
pub struct LogEmailSender;

impl LogEmailSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, email: OutgoingEmail) -> Result<(), AppError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            body_len = email.body.len(),
            "Email queued"
        );
        Ok(())
    }
}

/// Keeps every message in memory for assertions.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct OutboxEmailSender {
    outbox: std::sync::Mutex<Vec<OutgoingEmail>>,
}

#[cfg(test)]
impl OutboxEmailSender {
    /// Messages sent so far, oldest first.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.outbox.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl EmailSender for OutboxEmailSender {
    async fn send(&self, email: OutgoingEmail) -> Result<(), AppError> {
        self.outbox.lock().unwrap().push(email);
        Ok(())
    }
}
