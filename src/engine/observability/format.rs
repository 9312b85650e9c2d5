//! Human-readable byte counts and uptimes

use serde::{Deserialize, Serialize};
use std::fmt;

const BYTE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Format a byte count by repeated division by 1024, rounded to 2 decimals
/// with trailing zeros dropped (`1536 -> "1.5 KB"`).
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < BYTE_UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    let rounded = format!("{:.2}", size);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, BYTE_UNITS[unit_idx])
}

/// Server-reported sizes arrive as doubles
pub fn format_byte_figure(bytes: f64) -> String {
    if bytes.is_finite() && bytes > 0.0 {
        format_bytes(bytes as u64)
    } else {
        format_bytes(0)
    }
}

/// Uptime split into whole days, hours and minutes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Uptime {
    pub seconds: u64,
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub formatted: String,
}

pub fn format_uptime(seconds: u64) -> Uptime {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;

    Uptime {
        seconds,
        days,
        hours,
        minutes,
        formatted: format!("{}d {}h {}m", days, hours, minutes),
    }
}

impl fmt::Display for Uptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted)
    }
}
