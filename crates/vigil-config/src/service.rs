use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};
use vigil_core::{
    ConfigError, ConfigStore, EmailSettings, MonitorPolicy, ReturnCodeMap, ScriptPolicy,
};

use crate::settings::{MonitorSettings, ScriptSettings, Settings};

/// Settings store backed by an optional YAML file
///
/// Every save replaces the in-memory document and, when a file is attached,
/// rewrites it. Callers that change a policy are expected to restart the
/// matching scheduler loop afterwards.
pub struct ConfigService {
    path: Option<PathBuf>,
    settings: RwLock<Settings>,
}

impl ConfigService {
    /// Create a store that never touches the filesystem
    pub fn in_memory(settings: Settings) -> Self {
        Self {
            path: None,
            settings: RwLock::new(settings),
        }
    }

    /// Load the settings file, starting from defaults when it does not exist
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let settings = read_settings(&path).await?;
        Ok(Self {
            path: Some(path),
            settings: RwLock::new(settings),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Snapshot of the whole document
    pub async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Re-read the attached file, replacing the in-memory document
    pub async fn reload(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            debug!("No settings file attached, nothing to reload");
            return Ok(());
        };
        let settings = read_settings(path).await?;
        *self.settings.write().await = settings;
        info!("Reloaded settings from {}", path.display());
        Ok(())
    }

    pub async fn save_monitor_policy(&self, monitor: MonitorSettings) -> Result<(), ConfigError> {
        monitor.validate()?;
        self.update(|settings| settings.monitor = Some(monitor)).await
    }

    pub async fn save_script_policy(&self, script: ScriptSettings) -> Result<(), ConfigError> {
        script.validate()?;
        self.update(|settings| settings.script = Some(script)).await
    }

    /// Set the alert text for a script return code; empty text removes it
    pub async fn save_return_code(&self, code: i32, alert_text: &str) -> Result<(), ConfigError> {
        let alert_text = alert_text.trim().to_string();
        self.update(|settings| {
            if alert_text.is_empty() {
                settings.return_codes.remove(&code);
            } else {
                settings.return_codes.insert(code, alert_text);
            }
        })
        .await
    }

    pub async fn save_email_settings(&self, email: EmailSettings) -> Result<(), ConfigError> {
        self.update(|settings| settings.email = Some(email)).await
    }

    pub async fn save_system_name(&self, name: &str) -> Result<(), ConfigError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::Validation(
                "system name cannot be empty".to_string(),
            ));
        }
        let name = name.to_string();
        self.update(|settings| settings.system_name = name).await
    }

    /// Apply `change` to a copy of the document, persist it, then publish it
    async fn update<F>(&self, change: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut Settings),
    {
        let mut guard = self.settings.write().await;
        let mut next = guard.clone();
        change(&mut next);

        if let Some(path) = &self.path {
            write_settings(path, &next).await?;
            debug!("Persisted settings to {}", path.display());
        }

        *guard = next;
        Ok(())
    }
}

async fn read_settings(path: &Path) -> Result<Settings, ConfigError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(
                "Settings file {} not found, using defaults",
                path.display()
            );
            return Ok(Settings::default());
        }
        Err(e) => return Err(e.into()),
    };

    if raw.trim().is_empty() {
        return Ok(Settings::default());
    }

    let settings: Settings =
        serde_yaml::from_str(&raw).map_err(|e| ConfigError::Format(e.to_string()))?;
    settings.validate()?;
    Ok(settings)
}

async fn write_settings(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    let raw = serde_yaml::to_string(settings).map_err(|e| ConfigError::Format(e.to_string()))?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, raw).await?;
    Ok(())
}

#[async_trait]
impl ConfigStore for ConfigService {
    async fn monitor_policy(&self) -> Result<Option<MonitorPolicy>, ConfigError> {
        Ok(self
            .settings
            .read()
            .await
            .monitor
            .as_ref()
            .map(MonitorPolicy::from))
    }

    async fn script_policy(&self) -> Result<Option<ScriptPolicy>, ConfigError> {
        Ok(self
            .settings
            .read()
            .await
            .script
            .as_ref()
            .map(ScriptPolicy::from))
    }

    async fn return_codes(&self) -> Result<ReturnCodeMap, ConfigError> {
        Ok(self.settings.read().await.return_codes.clone())
    }

    async fn email_settings(&self) -> Result<Option<EmailSettings>, ConfigError> {
        Ok(self.settings.read().await.email.clone())
    }

    async fn system_name(&self) -> Result<String, ConfigError> {
        Ok(self.settings.read().await.system_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vigil_core::TlsMode;

    fn email() -> EmailSettings {
        EmailSettings {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 465,
            username: "vigil".to_string(),
            password: "secret".to_string(),
            from: "vigil@example.com".to_string(),
            to: "ops@example.com".to_string(),
            tls_mode: TlsMode::Tls,
        }
    }

    #[tokio::test]
    async fn test_missing_file_starts_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let service = ConfigService::load(dir.path().join("vigil.yaml"))
            .await
            .unwrap();

        assert!(service.monitor_policy().await.unwrap().is_none());
        assert!(service.script_policy().await.unwrap().is_none());
        assert!(service.return_codes().await.unwrap().is_empty());
        assert_eq!(
            service.system_name().await.unwrap(),
            vigil_core::DEFAULT_SYSTEM_NAME
        );
    }

    #[tokio::test]
    async fn test_saves_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("vigil.yaml");
        let service = ConfigService::load(&path).await.unwrap();

        service
            .save_monitor_policy(MonitorSettings {
                interval_minutes: 1,
                avg_count: 2,
                cpu_threshold: 70.0,
                mem_threshold: 75.0,
                disk_threshold: 90.0,
            })
            .await
            .unwrap();
        service.save_email_settings(email()).await.unwrap();
        service.save_return_code(3, "Backup job failed").await.unwrap();

        let reopened = ConfigService::load(&path).await.unwrap();
        let policy = reopened.monitor_policy().await.unwrap().unwrap();
        assert_eq!(policy.period, Duration::from_secs(60));
        assert_eq!(policy.window_size, 2);
        assert_eq!(reopened.email_settings().await.unwrap(), Some(email()));
        assert_eq!(
            reopened.return_codes().await.unwrap().get(&3).unwrap(),
            "Backup job failed"
        );
    }

    #[tokio::test]
    async fn test_empty_alert_text_removes_return_code() {
        let service = ConfigService::in_memory(Settings::default());

        service.save_return_code(2, "Service down").await.unwrap();
        assert_eq!(service.return_codes().await.unwrap().len(), 1);

        service.save_return_code(2, "   ").await.unwrap();
        assert!(service.return_codes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_policy_is_rejected_and_not_stored() {
        let service = ConfigService::in_memory(Settings::default());

        let result = service
            .save_monitor_policy(MonitorSettings {
                interval_minutes: 5,
                avg_count: 0,
                cpu_threshold: 80.0,
                mem_threshold: 80.0,
                disk_threshold: 85.0,
            })
            .await;

        assert!(matches!(result, Err(ConfigError::Validation(_))));
        assert!(service.monitor_policy().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reload_picks_up_external_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigil.yaml");
        tokio::fs::write(&path, "system_name: Before\n").await.unwrap();

        let service = ConfigService::load(&path).await.unwrap();
        assert_eq!(service.system_name().await.unwrap(), "Before");

        tokio::fs::write(
            &path,
            "system_name: After\nscript:\n  path: /opt/check.sh\n  interval_minutes: 2\n",
        )
        .await
        .unwrap();
        service.reload().await.unwrap();

        assert_eq!(service.system_name().await.unwrap(), "After");
        let script = service.script_policy().await.unwrap().unwrap();
        assert_eq!(script.period, Duration::from_secs(120));
        assert!(script.timeout.is_zero());
    }

    #[tokio::test]
    async fn test_malformed_file_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigil.yaml");
        tokio::fs::write(&path, "monitor: [not, a, map]\n").await.unwrap();

        let result = ConfigService::load(&path).await;
        assert!(matches!(result, Err(ConfigError::Format(_))));
    }
}
