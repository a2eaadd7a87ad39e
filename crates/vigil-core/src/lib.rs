//! Core types and collaborator contracts shared across all Vigil crates

pub mod config;
pub mod error;
pub mod history;
pub mod mail;
pub mod retry;
pub mod types;

// Re-export commonly used types
pub use config::*;
pub use error::*;
pub use history::*;
pub use mail::*;
pub use retry::*;
pub use types::*;

// Re-export external dependencies
pub use async_trait;
pub use chrono;
