//! Time utilities for reset countdowns and capture timestamps

use chrono::{DateTime, Local, Utc};

/// Render the capture time in the operator's local timezone
pub fn format_capture_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S %d/%m/%Y").to_string()
}

/// Countdown until `reset_time` (RFC 3339), relative to now
pub fn format_reset_time(reset_time: &str) -> String {
    format_reset_time_at(reset_time, Utc::now())
}

/// `"3d 4h"` past a day, `"2h 15m"` otherwise, `"reset"` once passed, `"-"` when unknown
pub fn format_reset_time_at(reset_time: &str, now: DateTime<Utc>) -> String {
    let Ok(reset) = DateTime::parse_from_rfc3339(reset_time.trim()) else {
        return "-".to_string();
    };

    let remaining = reset.with_timezone(&Utc) - now;
    if remaining.num_seconds() <= 0 {
        return "reset".to_string();
    }

    let days = remaining.num_days();
    let hours = remaining.num_hours() % 24;
    let minutes = remaining.num_minutes() % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else {
        format!("{}h {}m", hours, minutes)
    }
}
