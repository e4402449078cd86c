use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::clients::telegram_client::TelegramSender;
use crate::clients::vfs_client::{Credentials, PortalEndpoints, VfsSession};
use crate::config::MonitorConfig;
use crate::handlers::keep_alive;
use crate::service::calendar_checker::PortalCalendarChecker;
use crate::service::keyword_checker::KeywordScanChecker;
use crate::service::message_service::{USER_STOP_MESSAGE, critical_message, startup_message};
use crate::tasks::monitor_loop::{CycleDeps, LoopState, MessageSender, run_monitor_loop};
use crate::tasks::task_runner::TaskRunner;

pub fn build_sender(config: &MonitorConfig) -> Result<TelegramSender> {
    TelegramSender::new(
        &config.telegram_api_base,
        &config.telegram_bot_token,
        config.telegram_chat_id.clone(),
    )
    .context("Failed to build Telegram client")
}

fn build_session(config: &MonitorConfig) -> Result<VfsSession> {
    VfsSession::new(
        Credentials {
            email: config.vfs_email.clone(),
            password: config.vfs_password.clone(),
        },
        PortalEndpoints {
            login_url: config.vfs_login_url.clone(),
            appointment_url: config.vfs_appointment_url.clone(),
        },
        config.request_timeout,
    )
    .context("Failed to build VFS HTTP client")
}

pub fn build_checkers(
    config: &MonitorConfig,
) -> Result<(PortalCalendarChecker, KeywordScanChecker)> {
    let primary = PortalCalendarChecker::new(build_session(config)?, config.center_name.clone());
    let fallback = KeywordScanChecker::new(build_session(config)?, config.center_name.clone());
    Ok((primary, fallback))
}

/// Runs the monitor until the error cap or Ctrl-C. Anything that escapes is
/// reported as a critical error before being handed back to the caller.
pub async fn run_monitor(config: MonitorConfig) -> Result<()> {
    info!("Starting VFS Global Visa Appointment Monitor");
    let sender = build_sender(&config)?;

    match monitor(&config, &sender).await {
        Ok(()) => Ok(()),
        Err(err) => {
            let error_msg = format!("Critical error in main loop: {:#}", err);
            error!(critical = true, "{}", error_msg);
            if let Err(notify_err) = sender.send_message(&critical_message(&error_msg)).await {
                warn!(error = %notify_err, "failed to deliver critical error notification");
            }
            Err(err)
        }
    }
}

async fn monitor(config: &MonitorConfig, sender: &TelegramSender) -> Result<()> {
    let (primary, fallback) = build_checkers(config)?;

    let started_at = Utc::now().with_timezone(&config.timezone);
    sender
        .send_message(&startup_message(started_at))
        .await
        .context("Failed to send startup notification")?;

    let mut background = TaskRunner::new();
    if let Some(port) = config.keep_alive_port {
        background.add_task("keep-alive", keep_alive::serve(port));
    }
    let running = background.start_all();

    let deps = CycleDeps {
        primary: &primary,
        fallback: &fallback,
        sender,
    };
    let mut state = LoopState::new();

    let outcome = tokio::select! {
        cycles = run_monitor_loop(&mut state, &deps, config.check_interval, config.timezone) => {
            info!(cycles, "Monitor loop finished");
            Ok(())
        }
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => {
                    info!("Monitor stopped by user");
                    if let Err(err) = sender.send_message(USER_STOP_MESSAGE).await {
                        warn!(error = %err, "failed to deliver stop notification");
                    }
                    Ok(())
                }
                Err(err) => Err(err).context("Failed to listen for shutdown signal"),
            }
        }
    };

    running.abort_all();
    outcome
}
