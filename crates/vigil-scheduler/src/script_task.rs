use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use vigil_core::{ConfigStore, History, RetryPolicy, ScriptPolicy};
use vigil_scripts::{ScriptRunner, FAILURE_CODE};

use crate::alerts::AlertNotifier;
use crate::error::TickError;
use crate::loop_runner::{Cadence, LoopTask, Role};

/// Result code meaning the checked system is healthy
const NORMAL_CODE: i32 = 0;

/// One tick runs the script, records the run and maps its code to an alert
///
/// The script policy is captured; the return-code map is read on every tick.
pub struct ScriptTask {
    policy: ScriptPolicy,
    runner: Arc<dyn ScriptRunner>,
    config: Arc<dyn ConfigStore>,
    history: Arc<dyn History>,
    notifier: AlertNotifier,
    retry: RetryPolicy,
}

impl ScriptTask {
    pub fn new(
        policy: ScriptPolicy,
        runner: Arc<dyn ScriptRunner>,
        config: Arc<dyn ConfigStore>,
        history: Arc<dyn History>,
        notifier: AlertNotifier,
    ) -> Self {
        Self {
            policy,
            runner,
            config,
            history,
            notifier,
            retry: RetryPolicy::HISTORY,
        }
    }

    async fn alert_text(&self, code: i32) -> Option<String> {
        match self.config.return_codes().await {
            Ok(codes) => codes
                .get(&code)
                .filter(|text| !text.trim().is_empty())
                .cloned(),
            Err(e) => {
                warn!("Failed to read return codes: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl LoopTask for ScriptTask {
    fn cadence(&self) -> Cadence {
        Cadence::from_period(self.policy.period)
    }

    async fn tick(&mut self) -> Result<(), TickError> {
        let run = self
            .runner
            .run(&self.policy.path, &self.policy.args, self.policy.timeout)
            .await;
        let code = run.code();
        debug!("Script {} finished with code {}", self.policy.path, code);

        let history = &self.history;
        let output = run.output.as_str();
        if let Err(e) = self
            .retry
            .run("Recording script run", || history.record_script_run(code, output))
            .await
        {
            error!("Dropping script run record: {}", e);
        }

        match run.result {
            Err(e) => Err(e.into()),
            Ok(FAILURE_CODE) => {
                warn!("Script {} reported the failure code", self.policy.path);
                Ok(())
            }
            Ok(NORMAL_CODE) => {
                debug!("Script {} reports normal status", self.policy.path);
                Ok(())
            }
            Ok(code) => {
                match self.alert_text(code).await {
                    Some(text) => self.notifier.notify(Role::Script, &text).await,
                    None => info!("No alert configured for script code {}", code),
                }
                Ok(())
            }
        }
    }
}
