use std::sync::Arc;
use tracing::{debug, error, info};
use vigil_core::{AlertAttempt, History, MailError, Mailer, RetryPolicy};

const TEST_SUBJECT: &str = "Vigil test email";
const TEST_BODY: &str = "This is a test message from Vigil. Alert delivery is configured correctly.";

/// Sends alerts and records one [`AlertAttempt`] per send, successful or not
pub struct AlertDispatcher {
    mailer: Arc<dyn Mailer>,
    history: Arc<dyn History>,
    retry: RetryPolicy,
}

impl AlertDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, history: Arc<dyn History>) -> Self {
        Self {
            mailer,
            history,
            retry: RetryPolicy::HISTORY,
        }
    }

    /// Override the retry applied to the history write
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Deliver an alert; failures are recorded and logged, never returned
    pub async fn dispatch(&self, recipient: &str, subject: &str, body: &str) {
        if let Err(e) = self.deliver(recipient, subject, body).await {
            debug!("Alert to {} not delivered: {}", recipient, e);
        }
    }

    /// Send a fixed test message, returning the delivery outcome
    pub async fn send_test(&self, recipient: &str) -> Result<(), MailError> {
        self.deliver(recipient, TEST_SUBJECT, TEST_BODY).await
    }

    async fn deliver(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let result = self.mailer.send(recipient, subject, body).await;
        match &result {
            Ok(()) => info!("Sent '{}' to {}", subject, recipient),
            Err(e) => error!("Failed to send '{}' to {}: {}", subject, recipient, e),
        }

        let attempt = AlertAttempt::new(
            recipient,
            subject,
            body,
            result.as_ref().err().map(|e| e.to_string()),
        );
        if let Err(e) = self
            .retry
            .run("Recording alert attempt", || self.history.record_alert(&attempt))
            .await
        {
            error!(
                "Dropping alert attempt for {} after {} tries: {}",
                recipient, self.retry.max_attempts, e
            );
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockMailer;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use vigil_core::{HistoryError, InMemoryHistory, StatusSample};

    /// History whose every write fails
    #[derive(Default)]
    struct FailingHistory {
        alert_writes: AtomicUsize,
    }

    #[async_trait]
    impl History for FailingHistory {
        async fn record_status(&self, _sample: &StatusSample) -> Result<(), HistoryError> {
            Err(HistoryError::Unavailable("offline".to_string()))
        }

        async fn record_script_run(&self, _code: i32, _output: &str) -> Result<(), HistoryError> {
            Err(HistoryError::Unavailable("offline".to_string()))
        }

        async fn record_alert(&self, _attempt: &AlertAttempt) -> Result<(), HistoryError> {
            self.alert_writes.fetch_add(1, Ordering::SeqCst);
            Err(HistoryError::WriteFailed("database is locked".to_string()))
        }
    }

    #[tokio::test]
    async fn test_successful_send_records_one_attempt() {
        let mailer = MockMailer::new();
        let history = Arc::new(InMemoryHistory::default());
        let dispatcher = AlertDispatcher::new(Arc::new(mailer.clone()), history.clone());

        dispatcher
            .dispatch("ops@example.com", "[Edge] System monitor alert", "CPU high")
            .await;

        assert_eq!(mailer.send_calls(), 1);
        let attempts = history.alerts().await;
        assert_eq!(attempts.len(), 1);
        assert!(attempts[0].succeeded);
        assert_eq!(attempts[0].recipient, "ops@example.com");
        assert_eq!(attempts[0].subject, "[Edge] System monitor alert");
    }

    #[tokio::test]
    async fn test_failed_send_is_recorded_not_raised() {
        let mailer = MockMailer::new().with_send_failure();
        let history = Arc::new(InMemoryHistory::default());
        let dispatcher = AlertDispatcher::new(Arc::new(mailer), history.clone());

        dispatcher.dispatch("ops@example.com", "s", "b").await;

        let alerts = history.alerts().await;
        assert_eq!(alerts.len(), 1);
        assert!(!alerts[0].succeeded);
        assert!(alerts[0].error.as_deref().unwrap().contains("mock send failure"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_write_is_retried_then_dropped() {
        let mailer = MockMailer::new().with_send_failure();
        let history = Arc::new(FailingHistory::default());
        let dispatcher = AlertDispatcher::new(Arc::new(mailer.clone()), history.clone());

        // Neither the send nor any of the history writes succeed
        let started = tokio::time::Instant::now();
        dispatcher.dispatch("ops@example.com", "s", "b").await;

        assert_eq!(mailer.send_calls(), 1);
        assert_eq!(history.alert_writes.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_custom_retry_controls_history_attempts() {
        let history = Arc::new(FailingHistory::default());
        let dispatcher = AlertDispatcher::new(Arc::new(MockMailer::new()), history.clone())
            .with_retry(RetryPolicy::new(5, Duration::ZERO));

        assert!(dispatcher.send_test("ops@example.com").await.is_ok());
        assert_eq!(history.alert_writes.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_send_test_reports_outcome_and_records_it() {
        let history = Arc::new(InMemoryHistory::default());

        let ok = AlertDispatcher::new(Arc::new(MockMailer::new()), history.clone());
        assert!(ok.send_test("ops@example.com").await.is_ok());

        let failing = AlertDispatcher::new(
            Arc::new(MockMailer::new().with_send_failure()),
            history.clone(),
        );
        assert!(matches!(
            failing.send_test("ops@example.com").await,
            Err(MailError::Transport(_))
        ));

        let alerts = history.alerts().await;
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].subject, TEST_SUBJECT);
        assert!(alerts[0].succeeded);
        assert!(!alerts[1].succeeded);
    }
}
