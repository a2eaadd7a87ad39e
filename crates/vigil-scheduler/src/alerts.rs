use std::sync::Arc;
use tracing::warn;
use vigil_core::{ConfigStore, DEFAULT_SYSTEM_NAME};
use vigil_notifications::AlertDispatcher;

use crate::loop_runner::Role;

/// Routes alert bodies from either role to the dispatcher
///
/// Email settings and the system name are read on every alert, so they are
/// never captured by a loop.
#[derive(Clone)]
pub struct AlertNotifier {
    config: Arc<dyn ConfigStore>,
    dispatcher: Arc<AlertDispatcher>,
}

impl AlertNotifier {
    pub fn new(config: Arc<dyn ConfigStore>, dispatcher: Arc<AlertDispatcher>) -> Self {
        Self { config, dispatcher }
    }

    pub async fn notify(&self, role: Role, body: &str) {
        let recipient = match self.config.email_settings().await {
            Ok(Some(email)) if email.is_configured() => email.to,
            Ok(_) => {
                warn!("Email is not configured, {} alert not sent: {}", role, body);
                return;
            }
            Err(e) => {
                warn!("Failed to read email settings, {} alert not sent: {}", role, e);
                return;
            }
        };

        let system_name = match self.config.system_name().await {
            Ok(name) if !name.trim().is_empty() => name,
            Ok(_) => DEFAULT_SYSTEM_NAME.to_string(),
            Err(e) => {
                warn!("Failed to read system name: {}", e);
                DEFAULT_SYSTEM_NAME.to_string()
            }
        };

        self.dispatcher
            .dispatch(&recipient, &subject(role, &system_name), body)
            .await;
    }
}

pub(crate) fn subject(role: Role, system_name: &str) -> String {
    let title = match role {
        Role::Monitor => "System monitor alert",
        Role::Script => "Script alert",
    };
    format!("[{}] {}", system_name, title)
}
