//! Stored settings document
//!
//! Intervals are kept in whole minutes and timeouts in seconds, the units an
//! operator edits; the scheduler works with the [`Duration`] based policies
//! these convert into.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use vigil_core::{
    ConfigError, EmailSettings, MonitorPolicy, ReturnCodeMap, ScriptPolicy, DEFAULT_SYSTEM_NAME,
};

/// Longest accepted loop interval: one year
pub const MAX_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

fn default_system_name() -> String {
    DEFAULT_SYSTEM_NAME.to_string()
}

/// The whole persisted configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_system_name")]
    pub system_name: String,
    #[serde(default)]
    pub email: Option<EmailSettings>,
    #[serde(default)]
    pub monitor: Option<MonitorSettings>,
    #[serde(default)]
    pub script: Option<ScriptSettings>,
    #[serde(default)]
    pub return_codes: ReturnCodeMap,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            system_name: default_system_name(),
            email: None,
            monitor: None,
            script: None,
            return_codes: ReturnCodeMap::new(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(monitor) = &self.monitor {
            monitor.validate()?;
        }
        if let Some(script) = &self.script {
            script.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSettings {
    pub interval_minutes: u64,
    pub avg_count: usize,
    pub cpu_threshold: f64,
    pub mem_threshold: f64,
    pub disk_threshold: f64,
}

impl MonitorSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_minutes == 0 {
            return Err(ConfigError::Validation(
                "monitor interval must be at least 1 minute".to_string(),
            ));
        }
        check_interval("monitor", self.interval_minutes)?;
        if self.avg_count == 0 {
            return Err(ConfigError::Validation(
                "avg_count must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("cpu_threshold", self.cpu_threshold),
            ("mem_threshold", self.mem_threshold),
            ("disk_threshold", self.disk_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{} must be between 0 and 100, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl From<&MonitorSettings> for MonitorPolicy {
    fn from(settings: &MonitorSettings) -> Self {
        MonitorPolicy {
            period: minutes(settings.interval_minutes),
            window_size: settings.avg_count,
            cpu_threshold: settings.cpu_threshold,
            mem_threshold: settings.mem_threshold,
            disk_threshold: settings.disk_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptSettings {
    pub path: String,
    #[serde(default)]
    pub parameters: String,
    /// Zero disables the timeout
    #[serde(default)]
    pub timeout_seconds: u64,
    /// Zero disables scheduled runs
    #[serde(default)]
    pub interval_minutes: u64,
}

impl ScriptSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_interval("script", self.interval_minutes)?;
        if self.interval_minutes > 0 && self.path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "script path is required when an interval is set".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&ScriptSettings> for ScriptPolicy {
    fn from(settings: &ScriptSettings) -> Self {
        ScriptPolicy {
            path: settings.path.clone(),
            args: settings.parameters.clone(),
            timeout: Duration::from_secs(settings.timeout_seconds),
            period: minutes(settings.interval_minutes),
        }
    }
}

fn check_interval(role: &str, interval_minutes: u64) -> Result<(), ConfigError> {
    if interval_minutes > MAX_INTERVAL_MINUTES {
        return Err(ConfigError::Validation(format!(
            "{} interval must be at most {} minutes, got {}",
            role, MAX_INTERVAL_MINUTES, interval_minutes
        )));
    }
    Ok(())
}

/// Saturates instead of overflowing; the loop clamps oversized periods
fn minutes(interval_minutes: u64) -> Duration {
    interval_minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor_settings() -> MonitorSettings {
        MonitorSettings {
            interval_minutes: 5,
            avg_count: 3,
            cpu_threshold: 80.0,
            mem_threshold: 80.0,
            disk_threshold: 85.0,
        }
    }

    #[test]
    fn test_monitor_settings_convert_to_policy() {
        let policy = MonitorPolicy::from(&monitor_settings());
        assert_eq!(policy, MonitorPolicy::default());
    }

    #[test]
    fn test_monitor_settings_validation() {
        assert!(monitor_settings().validate().is_ok());

        let zero_window = MonitorSettings {
            avg_count: 0,
            ..monitor_settings()
        };
        assert!(matches!(
            zero_window.validate(),
            Err(ConfigError::Validation(_))
        ));

        let zero_interval = MonitorSettings {
            interval_minutes: 0,
            ..monitor_settings()
        };
        assert!(zero_interval.validate().is_err());

        let bad_threshold = MonitorSettings {
            disk_threshold: 120.0,
            ..monitor_settings()
        };
        let err = bad_threshold.validate().unwrap_err();
        assert!(err.to_string().contains("disk_threshold"));

        let longest = MonitorSettings {
            interval_minutes: MAX_INTERVAL_MINUTES,
            ..monitor_settings()
        };
        assert!(longest.validate().is_ok());
    }

    #[test]
    fn test_oversized_intervals_are_rejected() {
        let monitor = MonitorSettings {
            interval_minutes: 200_000_000_000_000_000,
            ..monitor_settings()
        };
        let err = monitor.validate().unwrap_err();
        assert!(err.to_string().contains("monitor interval"));

        let script = ScriptSettings {
            path: "/opt/check.sh".to_string(),
            parameters: String::new(),
            timeout_seconds: 0,
            interval_minutes: MAX_INTERVAL_MINUTES + 1,
        };
        assert!(matches!(script.validate(), Err(ConfigError::Validation(_))));

        // Conversion of an unvalidated document saturates rather than panicking
        let policy = MonitorPolicy::from(&monitor);
        assert_eq!(policy.period, Duration::MAX);
        let policy = ScriptPolicy::from(&ScriptSettings {
            interval_minutes: u64::MAX,
            ..script
        });
        assert_eq!(policy.period, Duration::MAX);
    }

    #[test]
    fn test_script_settings_convert_to_policy() {
        let settings = ScriptSettings {
            path: "/opt/check.sh".to_string(),
            parameters: "--quick /data".to_string(),
            timeout_seconds: 30,
            interval_minutes: 10,
        };
        let policy = ScriptPolicy::from(&settings);

        assert_eq!(policy.timeout, Duration::from_secs(30));
        assert_eq!(policy.period, Duration::from_secs(600));
        assert!(policy.is_enabled());
    }

    #[test]
    fn test_script_interval_requires_path() {
        let settings = ScriptSettings {
            path: String::new(),
            parameters: String::new(),
            timeout_seconds: 0,
            interval_minutes: 1,
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_parse_from_yaml() {
        let yaml = r#"
system_name: Edge Box
monitor:
  interval_minutes: 1
  avg_count: 2
  cpu_threshold: 90
  mem_threshold: 75.5
  disk_threshold: 85
return_codes:
  2: "Disk check failed"
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(settings.system_name, "Edge Box");
        assert!(settings.email.is_none());
        assert_eq!(settings.monitor.as_ref().unwrap().avg_count, 2);
        assert_eq!(settings.return_codes.get(&2).unwrap(), "Disk check failed");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let settings: Settings = serde_yaml::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.system_name, DEFAULT_SYSTEM_NAME);
    }
}
