mod service;
mod settings;

pub use service::ConfigService;
pub use settings::{MonitorSettings, ScriptSettings, Settings, MAX_INTERVAL_MINUTES};
