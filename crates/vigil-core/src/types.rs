//! Records produced by the samplers and the alert path

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One point-in-time reading of machine health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSample {
    /// Global CPU usage (0-100)
    pub cpu_pct: f64,
    /// Memory usage (0-100)
    pub mem_pct: f64,
    /// Mean usage across all monitored partitions (0-100)
    pub disk_pct_avg: f64,
    /// Usage of each monitored partition, keyed by mount point
    pub disk_pct_by_mount: BTreeMap<String, f64>,
    /// When the sample was taken
    pub at: DateTime<Utc>,
}

impl StatusSample {
    /// Build a sample with no partition detail, mostly useful in tests
    pub fn new(cpu_pct: f64, mem_pct: f64, disk_pct_avg: f64) -> Self {
        Self {
            cpu_pct,
            mem_pct,
            disk_pct_avg,
            disk_pct_by_mount: BTreeMap::new(),
            at: Utc::now(),
        }
    }

    pub fn with_partition(mut self, mount_point: impl Into<String>, usage_pct: f64) -> Self {
        self.disk_pct_by_mount.insert(mount_point.into(), usage_pct);
        self
    }
}

/// Append-only record of a single alert delivery attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertAttempt {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub succeeded: bool,
    /// Delivery error when `succeeded` is false
    pub error: Option<String>,
    pub at: DateTime<Utc>,
}

impl AlertAttempt {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        error: Option<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
            succeeded: error.is_none(),
            error,
            at: Utc::now(),
        }
    }
}

/// Append-only record of one script execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptRunRecord {
    pub code: i32,
    pub output: String,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_attempt_success_follows_error() {
        let ok = AlertAttempt::new("ops@example.com", "subject", "body", None);
        assert!(ok.succeeded);
        assert!(ok.error.is_none());

        let failed = AlertAttempt::new(
            "ops@example.com",
            "subject",
            "body",
            Some("connection refused".to_string()),
        );
        assert!(!failed.succeeded);
        assert_eq!(failed.error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_status_sample_serializes_partitions_by_mount() {
        let sample = StatusSample::new(12.5, 40.0, 55.0)
            .with_partition("/data", 70.0)
            .with_partition("/", 40.0);

        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["cpu_pct"], 12.5);
        assert_eq!(json["disk_pct_by_mount"]["/data"], 70.0);

        let keys: Vec<_> = sample.disk_pct_by_mount.keys().cloned().collect();
        assert_eq!(keys, vec!["/".to_string(), "/data".to_string()]);
    }
}
