use clap::Args;
use colored::Colorize;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use vigil_config::ConfigService;
use vigil_core::ConfigStore;
use vigil_scripts::{ProcessScriptRunner, ScriptRunner, FAILURE_CODE};

#[derive(Args)]
pub struct RunScriptCommand {
    /// Script to run instead of the configured one
    #[arg(long)]
    pub path: Option<String>,

    /// Whitespace separated arguments, replacing the configured ones
    #[arg(long)]
    pub args: Option<String>,

    /// Timeout in seconds, 0 to wait indefinitely
    #[arg(long)]
    pub timeout_seconds: Option<u64>,
}

impl RunScriptCommand {
    pub fn execute(self, settings_path: &Path) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run(settings_path))
    }

    async fn run(self, settings_path: &Path) -> anyhow::Result<()> {
        let config = ConfigService::load(settings_path).await?;
        let policy = config.script_policy().await?.unwrap_or_default();

        let path = self.path.unwrap_or(policy.path);
        if path.trim().is_empty() {
            anyhow::bail!(
                "No script configured in {}; pass --path to run one directly",
                settings_path.display()
            );
        }
        let args = self.args.unwrap_or(policy.args);
        let timeout = self
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(policy.timeout);

        info!("Running {} {}", path, args);
        let run = ProcessScriptRunner::new().run(&path, &args, timeout).await;

        match &run.result {
            Ok(code) => println!("{} {}", "Result code:".bright_white().bold(), code),
            Err(e) => println!(
                "{} {} ({})",
                "Result code:".bright_white().bold(),
                run.code().to_string().red(),
                e
            ),
        }
        if let Ok(code) = run.result.as_ref().copied() {
            if code != 0 && code != FAILURE_CODE {
                if let Some(text) = config.return_codes().await?.get(&code) {
                    println!("{} {}", "Alert text:".bright_white().bold(), text.yellow());
                }
            }
        }
        if !run.output.is_empty() {
            println!("{}", "Output:".bright_white().bold());
            print!("{}", run.output);
        }
        Ok(())
    }
}
