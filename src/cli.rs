use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::{AppConfig, MonitorConfig, log_file_from};
use crate::logging::init_logging;
use crate::runtime;
use crate::service::checker::AppointmentChecker;
use crate::service::message_service::{format_appointment_message, test_message};
use crate::tasks::monitor_loop::MessageSender;

#[derive(Parser)]
#[command(
    about = "Watches the VFS Global booking portal and alerts a Telegram chat when slots open"
)]
struct Cli {
    /// KEY=VALUE config file; falls back to $CONFIG_FILE, then the environment alone.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll forever and send notifications (default).
    Run,
    /// Run a single check and print what would be sent.
    Check {
        /// Use the keyword scan instead of the calendar scan.
        #[arg(long)]
        enhanced: bool,
    },
    /// Send one test message to the configured chat.
    TestNotify,
}

pub async fn cli() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .or_else(|| env::var("CONFIG_FILE").ok().map(PathBuf::from));
    let file_config = match config_path {
        Some(path) => AppConfig::from_file(&path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => AppConfig::default(),
    };
    let get_prop =
        |key: &str| -> Option<String> { file_config.get(key).or_else(|| env::var(key).ok()) };

    let _log_guard =
        init_logging(&log_file_from(&get_prop)).context("Failed to initialize logging")?;
    let config = MonitorConfig::from_lookup(get_prop).context("Invalid configuration")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => runtime::run_monitor(config).await,
        Commands::Check { enhanced } => check_once(&config, enhanced).await,
        Commands::TestNotify => {
            let sender = runtime::build_sender(&config)?;
            let now = Utc::now().with_timezone(&config.timezone);
            sender
                .send_message(&test_message(now))
                .await
                .context("Failed to send test notification")?;
            info!("Test notification sent");
            Ok(())
        }
    }
}

async fn check_once(config: &MonitorConfig, enhanced: bool) -> Result<()> {
    let (primary, fallback) = runtime::build_checkers(config)?;
    let checker: &dyn AppointmentChecker = if enhanced { &fallback } else { &primary };
    let appointments = checker.check().await.context("Check failed")?;

    if appointments.is_empty() {
        println!("No appointments available");
        return Ok(());
    }
    let now = Utc::now().with_timezone(&config.timezone);
    for appointment in &appointments {
        println!("{}\n", format_appointment_message(appointment, now));
    }
    Ok(())
}
