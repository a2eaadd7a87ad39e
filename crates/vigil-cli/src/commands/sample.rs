use clap::Args;
use tracing::debug;
use vigil_monitoring::{Sampler, SystemSampler};

#[derive(Args)]
pub struct SampleCommand {
    /// Print the JSON on a single line
    #[arg(long)]
    pub compact: bool,
}

impl SampleCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        let sample = rt.block_on(SystemSampler::new().sample())?;
        debug!(
            "Sampled {} monitored partitions",
            sample.disk_pct_by_mount.len()
        );

        let json = if self.compact {
            serde_json::to_string(&sample)?
        } else {
            serde_json::to_string_pretty(&sample)?
        };
        println!("{}", json);
        Ok(())
    }
}
