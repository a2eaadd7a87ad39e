//! Append-only history contract and an in-process implementation

use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use tokio::sync::RwLock;

use crate::error::HistoryError;
use crate::types::{AlertAttempt, ScriptRunRecord, StatusSample};

/// Append-only sink for samples, script runs and alert attempts
#[async_trait]
pub trait History: Send + Sync {
    async fn record_status(&self, sample: &StatusSample) -> Result<(), HistoryError>;

    async fn record_script_run(&self, code: i32, output: &str) -> Result<(), HistoryError>;

    async fn record_alert(&self, attempt: &AlertAttempt) -> Result<(), HistoryError>;
}

/// Bounded in-memory history, keeping the most recent `capacity` rows of
/// each kind
pub struct InMemoryHistory {
    capacity: usize,
    statuses: RwLock<VecDeque<StatusSample>>,
    script_runs: RwLock<VecDeque<ScriptRunRecord>>,
    alerts: RwLock<VecDeque<AlertAttempt>>,
}

impl InMemoryHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            statuses: RwLock::new(VecDeque::new()),
            script_runs: RwLock::new(VecDeque::new()),
            alerts: RwLock::new(VecDeque::new()),
        }
    }

    /// Recorded samples, oldest first
    pub async fn statuses(&self) -> Vec<StatusSample> {
        self.statuses.read().await.iter().cloned().collect()
    }

    pub async fn script_runs(&self) -> Vec<ScriptRunRecord> {
        self.script_runs.read().await.iter().cloned().collect()
    }

    pub async fn alerts(&self) -> Vec<AlertAttempt> {
        self.alerts.read().await.iter().cloned().collect()
    }

    async fn push<T>(&self, rows: &RwLock<VecDeque<T>>, row: T) {
        let mut rows = rows.write().await;
        rows.push_back(row);
        while rows.len() > self.capacity {
            rows.pop_front();
        }
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl History for InMemoryHistory {
    async fn record_status(&self, sample: &StatusSample) -> Result<(), HistoryError> {
        self.push(&self.statuses, sample.clone()).await;
        Ok(())
    }

    async fn record_script_run(&self, code: i32, output: &str) -> Result<(), HistoryError> {
        let record = ScriptRunRecord {
            code,
            output: output.to_string(),
            at: Utc::now(),
        };
        self.push(&self.script_runs, record).await;
        Ok(())
    }

    async fn record_alert(&self, attempt: &AlertAttempt) -> Result<(), HistoryError> {
        self.push(&self.alerts, attempt.clone()).await;
        Ok(())
    }
}
