use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Script path is empty")]
    EmptyPath,

    #[error("Failed to resolve script path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Failed to start script {path}: {reason}")]
    Spawn { path: String, reason: String },

    #[error("Script timed out after {0:?}")]
    Timeout(Duration),

    #[error("Script exited with {0}")]
    ExitStatus(String),

    #[error("Script output does not end with an integer result code (last token: {0:?})")]
    InvalidOutput(String),
}
