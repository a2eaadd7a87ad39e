use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use vigil_core::{MailError, Mailer};

/// A message captured by [`MockMailer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mailer for tests that records every message instead of sending it
#[derive(Clone)]
pub struct MockMailer {
    /// Counter for tracking calls, including failed ones
    pub send_count: Arc<AtomicUsize>,
    pub sent: Arc<Mutex<Vec<SentMail>>>,
    pub should_fail_send: bool,
}

impl Default for MockMailer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMailer {
    pub fn new() -> Self {
        Self {
            send_count: Arc::new(AtomicUsize::new(0)),
            sent: Arc::new(Mutex::new(Vec::new())),
            should_fail_send: false,
        }
    }

    pub fn with_send_failure(mut self) -> Self {
        self.should_fail_send = true;
        self
    }

    pub fn send_calls(&self) -> usize {
        self.send_count.load(Ordering::SeqCst)
    }

    pub async fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        self.send_count.fetch_add(1, Ordering::SeqCst);

        if self.should_fail_send {
            return Err(MailError::Transport("mock send failure".to_string()));
        }

        self.sent.lock().await.push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
