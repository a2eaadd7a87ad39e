//! Policies captured by the scheduler loops and the store they are read from

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::ConfigError;
use crate::mail::EmailSettings;

/// Name used in alert subjects when none is stored
pub const DEFAULT_SYSTEM_NAME: &str = "Alert Notification System";

/// Thresholds and cadence for the health monitor
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorPolicy {
    /// Time between two samples
    pub period: Duration,
    /// Number of samples averaged before an alert can fire (at least 1)
    pub window_size: usize,
    pub cpu_threshold: f64,
    pub mem_threshold: f64,
    pub disk_threshold: f64,
}

impl Default for MonitorPolicy {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(5 * 60),
            window_size: 3,
            cpu_threshold: 80.0,
            mem_threshold: 80.0,
            disk_threshold: 85.0,
        }
    }
}

/// External script invocation settings
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptPolicy {
    pub path: String,
    /// Whitespace separated argument string
    pub args: String,
    /// Zero disables the timeout
    pub timeout: Duration,
    /// Zero disables the script loop
    pub period: Duration,
}

impl ScriptPolicy {
    /// The default policy: no script, loop disabled
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        !self.period.is_zero()
    }
}

/// Script return code to alert text
pub type ReturnCodeMap = BTreeMap<i32, String>;

/// Read access to the stored configuration
///
/// Implementations are shared between the scheduler and whatever layer edits
/// the configuration, so every method takes `&self`.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Stored monitor policy, `None` when nothing has been saved
    async fn monitor_policy(&self) -> Result<Option<MonitorPolicy>, ConfigError>;

    /// Stored script policy, `None` when nothing has been saved
    async fn script_policy(&self) -> Result<Option<ScriptPolicy>, ConfigError>;

    async fn return_codes(&self) -> Result<ReturnCodeMap, ConfigError>;

    async fn email_settings(&self) -> Result<Option<EmailSettings>, ConfigError>;

    async fn system_name(&self) -> Result<String, ConfigError>;
}
