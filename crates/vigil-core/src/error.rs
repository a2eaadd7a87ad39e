//! Error types for the collaborator contracts

use thiserror::Error;

/// Errors raised by a [`crate::ConfigStore`] implementation
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Settings file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings format: {0}")]
    Format(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while appending to the [`crate::History`] collaborator
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("History write failed: {0}")]
    WriteFailed(String),

    #[error("History store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by a [`crate::Mailer`] while delivering a message
#[derive(Error, Debug)]
pub enum MailError {
    #[error("Mailer is not configured")]
    NotConfigured,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Message(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<ConfigError> for MailError {
    fn from(err: ConfigError) -> Self {
        MailError::Configuration(err.to_string())
    }
}
