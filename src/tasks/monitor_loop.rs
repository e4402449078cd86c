use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::service::checker::AppointmentChecker;
use crate::service::message_service::{
    format_appointment_message, format_timestamp, stop_reason, stopped_message, warning_message,
};

pub const MAX_CONSECUTIVE_ERRORS: u32 = 5;
pub const WARNING_THRESHOLD: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to reach messaging API: {0}")]
    Http(#[from] reqwest::Error),

    #[error("messaging API rejected the message (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<(), NotifyError>;
}

/// Errors that escape a cycle and count toward the consecutive-error cap.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("failed to deliver appointment notification: {0}")]
    Notify(#[from] NotifyError),
}

/// Which detection strategy drives the next cycle. The only transition is
/// `Primary -> Enhanced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectionMode {
    #[default]
    Primary,
    Enhanced,
}

impl DetectionMode {
    fn escalate(&mut self) {
        *self = DetectionMode::Enhanced;
    }
}

#[derive(Debug, Default)]
pub struct LoopState {
    consecutive_errors: u32,
    mode: DetectionMode,
    last_check_time: Option<DateTime<Tz>>,
}

impl LoopState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn mode(&self) -> DetectionMode {
        self.mode
    }

    pub fn last_check_time(&self) -> Option<DateTime<Tz>> {
        self.last_check_time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed { found: usize },
    Failed { consecutive_errors: u32 },
    Stopped,
}

pub struct CycleDeps<'a> {
    pub primary: &'a dyn AppointmentChecker,
    pub fallback: &'a dyn AppointmentChecker,
    pub sender: &'a dyn MessageSender,
}

pub async fn run_one_cycle(
    state: &mut LoopState,
    deps: &CycleDeps<'_>,
    now: DateTime<Tz>,
) -> CycleOutcome {
    state.last_check_time = Some(now);

    match check_and_notify(state, deps, now).await {
        Ok(found) => {
            state.consecutive_errors = 0;
            CycleOutcome::Completed { found }
        }
        Err(err) => {
            state.consecutive_errors += 1;
            let attempts = state.consecutive_errors;
            let error_msg = format!(
                "Error checking appointments (attempt {}/{}): {}",
                attempts, MAX_CONSECUTIVE_ERRORS, err
            );
            error!("{}", error_msg);

            if attempts == WARNING_THRESHOLD {
                send_best_effort(deps.sender, &warning_message(&error_msg)).await;
            }

            if attempts >= MAX_CONSECUTIVE_ERRORS {
                error!(critical = true, "{}", stop_reason(MAX_CONSECUTIVE_ERRORS));
                send_best_effort(deps.sender, &stopped_message(MAX_CONSECUTIVE_ERRORS)).await;
                return CycleOutcome::Stopped;
            }
            CycleOutcome::Failed {
                consecutive_errors: attempts,
            }
        }
    }
}

async fn check_and_notify(
    state: &mut LoopState,
    deps: &CycleDeps<'_>,
    now: DateTime<Tz>,
) -> Result<usize, CycleError> {
    let mut appointments = Vec::new();

    if state.mode == DetectionMode::Primary {
        match deps.primary.check().await {
            Ok(found) => appointments = found,
            Err(err) => {
                warn!("Primary method failed: {}", err);
                info!("Switching to enhanced monitoring method");
                state.mode.escalate();
            }
        }
    }

    if state.mode == DetectionMode::Enhanced || appointments.is_empty() {
        match deps.fallback.check().await {
            Ok(found) if !found.is_empty() => {
                appointments.extend(found);
                info!("Enhanced method detected potential appointments");
            }
            Ok(_) => {}
            Err(err) => error!("Enhanced method also failed: {}", err),
        }
    }

    if appointments.is_empty() {
        info!("No appointments available");
        return Ok(0);
    }

    info!("Found {} available appointments", appointments.len());
    for appointment in &appointments {
        let message = format_appointment_message(appointment, now);
        deps.sender.send_message(&message).await?;
        info!(?appointment, "Notification sent for appointment");
    }
    Ok(appointments.len())
}

async fn send_best_effort(sender: &dyn MessageSender, text: &str) {
    if let Err(err) = sender.send_message(text).await {
        warn!(error = %err, "failed to deliver monitor status notification");
    }
}

/// Runs cycles until the consecutive-error cap is hit and returns how many
/// cycles ran. External interruption is the caller's business.
pub async fn run_monitor_loop(
    state: &mut LoopState,
    deps: &CycleDeps<'_>,
    interval: Duration,
    timezone: Tz,
) -> u64 {
    let mut cycles = 0u64;
    loop {
        let now = Utc::now().with_timezone(&timezone);
        info!("Checking for appointments at {}", format_timestamp(&now));
        cycles += 1;
        if run_one_cycle(state, deps, now).await == CycleOutcome::Stopped {
            return cycles;
        }
        info!("Waiting {} seconds until next check...", interval.as_secs());
        sleep(interval).await;
    }
}
