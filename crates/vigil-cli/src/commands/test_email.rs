use clap::Args;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use vigil_config::ConfigService;
use vigil_core::{ConfigStore, EmailSettings, InMemoryHistory};
use vigil_notifications::{AlertDispatcher, SmtpMailer};

#[derive(Args)]
pub struct TestEmailCommand {
    /// Recipient, defaulting to the configured alert address
    #[arg(long)]
    pub to: Option<String>,
}

impl TestEmailCommand {
    pub fn execute(self, settings_path: &Path) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run(settings_path))
    }

    async fn run(self, settings_path: &Path) -> anyhow::Result<()> {
        let config = Arc::new(ConfigService::load(settings_path).await?);
        let email = config
            .email_settings()
            .await?
            .filter(EmailSettings::is_configured)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No SMTP host configured in {}",
                    settings_path.display()
                )
            })?;
        let recipient = self.to.unwrap_or(email.to);

        let dispatcher = AlertDispatcher::new(
            Arc::new(SmtpMailer::new(config.clone())),
            Arc::new(InMemoryHistory::new(1)),
        );
        dispatcher.send_test(&recipient).await?;

        println!(
            "{} Test email sent to {}",
            "✓".bright_green(),
            recipient.bright_white()
        );
        Ok(())
    }
}
