use chrono::DateTime;
use chrono_tz::Tz;

use crate::models::appointment::{AppointmentRecord, present};

pub const DEFAULT_LOCATION: &str = "Italy Visa Center Morocco";
pub const NOT_SPECIFIED: &str = "Not specified";
pub const BOOKING_URL: &str = "https://visa.vfsglobal.com/mar/fr/ita/dashboard";
pub const USER_STOP_MESSAGE: &str = "🛑 VFS Monitor stopped by user";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

pub fn format_timestamp(at: &DateTime<Tz>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Renders one slot as a Telegram message. Missing fields fall back to
/// defaults; optional lines are left out entirely.
pub fn format_appointment_message(
    appointment: &AppointmentRecord,
    found_at: DateTime<Tz>,
) -> String {
    let mut message = String::from("🎯 **VISA APPOINTMENT AVAILABLE!**\n\n");
    message.push_str(&format!(
        "📍 **Location:** {}\n",
        present(&appointment.location).unwrap_or(DEFAULT_LOCATION)
    ));
    message.push_str(&format!(
        "📅 **Date:** {}\n",
        present(&appointment.date).unwrap_or(NOT_SPECIFIED)
    ));
    message.push_str(&format!(
        "⏰ **Time:** {}\n",
        present(&appointment.time).unwrap_or(NOT_SPECIFIED)
    ));

    if let Some(link) = present(&appointment.link) {
        message.push_str(&format!("🔗 **Book Now:** {}\n", link));
    }
    if let Some(confidence) = appointment.confidence {
        message.push_str(&format!(
            "{} **Confidence:** {}\n",
            confidence.marker(),
            confidence.label()
        ));
    }
    if let Some(source) = present(&appointment.source) {
        message.push_str(&format!("📊 **Source:** {}\n", source));
    }

    message.push_str(
        "\n⚡ **Action Required:** Log in to VFS Global immediately to book this slot!\n",
    );
    message.push_str(&format!("🌐 **Website:** {}\n", BOOKING_URL));
    message.push_str(&format!("⏱️ **Found at:** {}", format_timestamp(&found_at)));

    if let Some(note) = present(&appointment.note) {
        message.push_str(&format!("\n\n💡 **Note:** {}", note));
    }
    message
}

pub fn startup_message(started_at: DateTime<Tz>) -> String {
    format!(
        "🤖 VFS Appointment Monitor Started\n\
         Monitoring Italy visa appointments in Morocco with enhanced detection methods...\n\n\
         ⏰ Started at: {}",
        format_timestamp(&started_at)
    )
}

pub fn warning_message(detail: &str) -> String {
    format!("⚠️ Monitor Warning\n{}", detail)
}

pub fn stopped_message(max_consecutive_errors: u32) -> String {
    format!(
        "🚨 Monitor Stopped\n{}",
        stop_reason(max_consecutive_errors)
    )
}

pub fn stop_reason(max_consecutive_errors: u32) -> String {
    format!(
        "Too many consecutive errors ({}). Stopping monitor.",
        max_consecutive_errors
    )
}

pub fn critical_message(detail: &str) -> String {
    format!("🚨 Critical Error\n{}", detail)
}

pub fn test_message(sent_at: DateTime<Tz>) -> String {
    format!(
        "✅ VFS Monitor test notification\n\
         If you can read this, alerts will reach this chat.\n\n\
         ⏰ Sent at: {}",
        format_timestamp(&sent_at)
    )
}
