use clap::Args;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use vigil_config::ConfigService;
use vigil_core::InMemoryHistory;
use vigil_monitoring::SystemSampler;
use vigil_notifications::SmtpMailer;
use vigil_scheduler::SchedulerCore;
use vigil_scripts::ProcessScriptRunner;

#[derive(Args)]
pub struct ServeCommand {
    /// Rows of each history kind kept in memory
    #[arg(long, default_value_t = 1000, env = "VIGIL_HISTORY_CAPACITY")]
    pub history_capacity: usize,

    /// Seconds to wait for in-flight ticks on shutdown before abandoning them
    #[arg(long, default_value_t = 30, env = "VIGIL_SHUTDOWN_TIMEOUT")]
    pub shutdown_timeout: u64,
}

impl ServeCommand {
    pub fn execute(self, settings_path: &Path) -> anyhow::Result<()> {
        let cleanup_timeout = Duration::from_secs(self.shutdown_timeout);
        let rt = tokio::runtime::Runtime::new()?;
        let result = rt.block_on(self.run(settings_path, cleanup_timeout));
        // Sampling threads may still be busy
        rt.shutdown_timeout(cleanup_timeout);
        result
    }

    async fn run(self, settings_path: &Path, cleanup_timeout: Duration) -> anyhow::Result<()> {
        info!("Loading settings from {}", settings_path.display());
        let config = Arc::new(ConfigService::load(settings_path).await?);
        let history = Arc::new(InMemoryHistory::new(self.history_capacity));
        let mailer = Arc::new(SmtpMailer::new(config.clone()));

        let core = SchedulerCore::new(
            config.clone(),
            history,
            mailer,
            Arc::new(SystemSampler::new()),
            Arc::new(ProcessScriptRunner::new()),
        );

        let monitor = core.init_monitor().await;
        let script = core.init_script().await;
        info!(
            "Vigil running (monitor generation {}, script generation {})",
            monitor, script
        );

        wait_for_shutdown(&config, &core).await?;

        if core.shutdown_within(cleanup_timeout).await {
            info!("All loops stopped within timeout");
        } else {
            warn!(
                "Shutdown timeout exceeded ({:?}), forcing shutdown",
                cleanup_timeout
            );
        }
        Ok(())
    }
}

/// Reload settings and restart both roles, as a configuration save would
#[cfg(unix)]
async fn reload(config: &ConfigService, core: &SchedulerCore) {
    match config.reload().await {
        Ok(()) => {
            core.restart_monitor().await;
            core.restart_script().await;
        }
        Err(e) => error!("Failed to reload settings, keeping current loops: {}", e),
    }
}

#[cfg(unix)]
async fn wait_for_shutdown(config: &ConfigService, core: &SchedulerCore) -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C, shutting down");
                return Ok(());
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM, shutting down");
                return Ok(());
            }
            _ = hangup.recv() => {
                info!("Received SIGHUP, reloading settings");
                // A restart can wait on a long tick; keep listening meanwhile
                tokio::select! {
                    _ = reload(config, core) => {}
                    result = tokio::signal::ctrl_c() => {
                        result?;
                        info!("Received Ctrl+C during reload, shutting down");
                        return Ok(());
                    }
                    _ = terminate.recv() => {
                        info!("Received SIGTERM during reload, shutting down");
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_config: &ConfigService, _core: &SchedulerCore) -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down");
    Ok(())
}
