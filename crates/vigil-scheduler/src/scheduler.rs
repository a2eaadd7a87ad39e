use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};
use vigil_core::{ConfigStore, History, Mailer, MonitorPolicy, ScriptPolicy};
use vigil_monitoring::Sampler;
use vigil_notifications::AlertDispatcher;
use vigil_scripts::ScriptRunner;

use crate::alerts::AlertNotifier;
use crate::loop_runner::{ReconfigurableLoop, Role};
use crate::monitor_task::MonitorTask;
use crate::script_task::ScriptTask;

/// Owns the monitor and script loops
///
/// Each role sits behind its own lock, which is held across stop-then-start,
/// so concurrent restarts of one role are serialized and never leave two
/// live instances behind.
pub struct SchedulerCore {
    config: Arc<dyn ConfigStore>,
    history: Arc<dyn History>,
    sampler: Arc<dyn Sampler>,
    runner: Arc<dyn ScriptRunner>,
    notifier: AlertNotifier,
    monitor: Mutex<ReconfigurableLoop>,
    script: Mutex<ReconfigurableLoop>,
}

impl SchedulerCore {
    pub fn new(
        config: Arc<dyn ConfigStore>,
        history: Arc<dyn History>,
        mailer: Arc<dyn Mailer>,
        sampler: Arc<dyn Sampler>,
        runner: Arc<dyn ScriptRunner>,
    ) -> Self {
        let dispatcher = Arc::new(AlertDispatcher::new(mailer, history.clone()));
        Self::with_dispatcher(config, history, dispatcher, sampler, runner)
    }

    pub fn with_dispatcher(
        config: Arc<dyn ConfigStore>,
        history: Arc<dyn History>,
        dispatcher: Arc<AlertDispatcher>,
        sampler: Arc<dyn Sampler>,
        runner: Arc<dyn ScriptRunner>,
    ) -> Self {
        Self {
            notifier: AlertNotifier::new(config.clone(), dispatcher),
            config,
            history,
            sampler,
            runner,
            monitor: Mutex::new(ReconfigurableLoop::new(Role::Monitor)),
            script: Mutex::new(ReconfigurableLoop::new(Role::Script)),
        }
    }

    /// Start the monitor loop unless it is already running; returns the
    /// live generation either way
    pub async fn init_monitor(&self) -> u64 {
        let task = self.monitor_task().await;
        let mut monitor = self.monitor.lock().await;
        match (monitor.is_running(), monitor.generation()) {
            (true, Some(generation)) => generation,
            _ => monitor.restart(task).await,
        }
    }

    /// Start the script loop unless it is already running
    pub async fn init_script(&self) -> u64 {
        let task = self.script_task().await;
        let mut script = self.script.lock().await;
        match (script.is_running(), script.generation()) {
            (true, Some(generation)) => generation,
            _ => script.restart(task).await,
        }
    }

    /// Replace the monitor loop with one built from the current policy
    pub async fn restart_monitor(&self) -> u64 {
        let task = self.monitor_task().await;
        let generation = self.monitor.lock().await.restart(task).await;
        info!("Restarted monitor loop (generation {})", generation);
        generation
    }

    /// Replace the script loop with one built from the current policy
    pub async fn restart_script(&self) -> u64 {
        let task = self.script_task().await;
        let generation = self.script.lock().await.restart(task).await;
        info!("Restarted script loop (generation {})", generation);
        generation
    }

    pub async fn generation(&self, role: Role) -> Option<u64> {
        self.role_loop(role).lock().await.generation()
    }

    pub async fn is_running(&self, role: Role) -> bool {
        self.role_loop(role).lock().await.is_running()
    }

    /// Stop both loops and wait for them to exit
    pub async fn shutdown(&self) {
        let mut monitor = self.monitor.lock().await;
        let mut script = self.script.lock().await;
        // Both are signalled before either is joined
        monitor.signal_stop();
        script.signal_stop();
        monitor.stop().await;
        script.stop().await;
        info!("Scheduler stopped");
    }

    /// Stop both loops, aborting any still busy after `grace`; returns
    /// whether both exited on their own
    pub async fn shutdown_within(&self, grace: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(grace) else {
            self.shutdown().await;
            return true;
        };

        let mut monitor = self.monitor.lock().await;
        let mut script = self.script.lock().await;
        monitor.signal_stop();
        script.signal_stop();
        let monitor_done = monitor.stop_by(deadline).await;
        let script_done = script.stop_by(deadline).await;

        if monitor_done && script_done {
            info!("Scheduler stopped");
        } else {
            warn!("Scheduler stopped after aborting loops busy past {:?}", grace);
        }
        monitor_done && script_done
    }

    fn role_loop(&self, role: Role) -> &Mutex<ReconfigurableLoop> {
        match role {
            Role::Monitor => &self.monitor,
            Role::Script => &self.script,
        }
    }

    async fn monitor_task(&self) -> MonitorTask {
        let policy = match self.config.monitor_policy().await {
            Ok(Some(policy)) => policy,
            Ok(None) => {
                info!("No monitor policy stored, using defaults");
                MonitorPolicy::default()
            }
            Err(e) => {
                warn!("Failed to read monitor policy, using defaults: {}", e);
                MonitorPolicy::default()
            }
        };

        MonitorTask::new(
            policy,
            self.sampler.clone(),
            self.history.clone(),
            self.notifier.clone(),
        )
    }

    async fn script_task(&self) -> ScriptTask {
        let policy = match self.config.script_policy().await {
            Ok(Some(policy)) => policy,
            Ok(None) => {
                info!("No script policy stored, script loop disabled");
                ScriptPolicy::disabled()
            }
            Err(e) => {
                warn!("Failed to read script policy, script loop disabled: {}", e);
                ScriptPolicy::disabled()
            }
        };

        ScriptTask::new(
            policy,
            self.runner.clone(),
            self.config.clone(),
            self.history.clone(),
            self.notifier.clone(),
        )
    }
}
