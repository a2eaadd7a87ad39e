//! Mail transport contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MailError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    None,     // No encryption
    Starttls, // STARTTLS upgrade of a plain connection
    Tls,      // Direct TLS connection
}

fn default_tls_mode() -> TlsMode {
    TlsMode::Tls
}

fn default_smtp_port() -> u16 {
    465
}

/// SMTP account used for alert delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailSettings {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub from: String,
    /// Recipient address; several may be given separated by commas
    pub to: String,
    #[serde(default = "default_tls_mode")]
    pub tls_mode: TlsMode,
}

impl EmailSettings {
    /// Alerts are only attempted once an SMTP host is known
    pub fn is_configured(&self) -> bool {
        !self.smtp_host.trim().is_empty()
    }
}

/// The sole transport boundary of the alert path
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_settings_defaults_from_yaml_like_json() {
        let settings: EmailSettings = serde_json::from_str(
            r#"{"smtp_host":"smtp.example.com","from":"vigil@example.com","to":"ops@example.com"}"#,
        )
        .unwrap();

        assert_eq!(settings.smtp_port, 465);
        assert_eq!(settings.tls_mode, TlsMode::Tls);
        assert!(settings.username.is_empty());
        assert!(settings.is_configured());
    }

    #[test]
    fn test_blank_host_is_not_configured() {
        let settings = EmailSettings {
            smtp_host: "  ".to_string(),
            smtp_port: 25,
            username: String::new(),
            password: String::new(),
            from: "vigil@example.com".to_string(),
            to: "ops@example.com".to_string(),
            tls_mode: TlsMode::None,
        };
        assert!(!settings.is_configured());
    }
}
