//! Vigil CLI - machine health monitor and script alerting daemon
//!
//! `serve` runs the scheduler; the other commands exercise one piece of it
//! once against the same settings file.

mod commands;

use clap::{Parser, Subcommand};
use commands::{RunScriptCommand, SampleCommand, ServeCommand, TestEmailCommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "VIGIL_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "VIGIL_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    /// Settings file (YAML); a missing file means defaults
    #[arg(
        long,
        default_value = "vigil.yaml",
        env = "VIGIL_SETTINGS",
        global = true
    )]
    settings: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor and script loops until interrupted
    Serve(ServeCommand),
    /// Take one system sample and print it as JSON
    Sample(SampleCommand),
    /// Run the configured script once and print its result
    RunScript(RunScriptCommand),
    /// Send a test email with the stored SMTP settings
    TestEmail(TestEmailCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // If RUST_LOG is set, use it directly; otherwise use our default filter
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()?
    } else {
        tracing_subscriber::EnvFilter::new(format!(
            "vigil={level},\
             vigil_cli={level},\
             vigil_core={level},\
             vigil_config={level},\
             vigil_monitoring={level},\
             vigil_scripts={level},\
             vigil_notifications={level},\
             vigil_scheduler={level},\
             lettre=warn,\
             hyper=warn,\
             rustls=warn",
            level = cli.log_level
        ))
    };

    let fmt_layer = match cli.log_format.as_str() {
        "full" => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer() // "compact" or any other value
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve(serve_cmd) => serve_cmd.execute(&cli.settings),
        Commands::Sample(sample_cmd) => sample_cmd.execute(),
        Commands::RunScript(run_cmd) => run_cmd.execute(&cli.settings),
        Commands::TestEmail(test_cmd) => test_cmd.execute(&cli.settings),
    }
}
