// SPDX-License-Identifier: AGPL-3.0
// SFTP Portal Core - Progress, throughput and ETA math
//
// These are best-effort estimates shared by single and batch transfers.
// Nothing here may fail; degenerate inputs produce 0 or the placeholder.

use std::time::Duration;

/// Shown when no ETA can be computed yet
pub const ETA_PLACEHOLDER: &str = "--:--";

const BYTE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Rounded percentage of `loaded` over `total`, capped at 100.
/// `None` when the total is unknown.
pub fn percent(loaded: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let pct = (loaded as f64 * 100.0 / total as f64).round();
    Some(pct.min(100.0) as u8)
}

/// Average bytes per second over `elapsed`, 0 when no time has passed
pub fn speed(loaded: u64, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0;
    }
    (loaded as f64 / secs).round() as u64
}

/// Seconds until `size` is reached at `speed`. `None` without throughput
/// or while the total is unknown.
pub fn eta_seconds(size: u64, loaded: u64, speed: u64) -> Option<u64> {
    if speed == 0 || size == 0 {
        return None;
    }
    Some(size.saturating_sub(loaded) / speed)
}

/// Remaining time as `H h M m` above one hour and `M:SS` otherwise
pub fn format_eta(size: u64, loaded: u64, speed: u64) -> String {
    let Some(seconds) = eta_seconds(size, loaded, speed) else {
        return ETA_PLACEHOLDER.to_string();
    };

    if seconds > 3600 {
        let h = seconds / 3600;
        let m = (seconds % 3600) / 60;
        return format!("{}h {}m", h, m);
    }
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Human-readable byte count in base 1024 with at most two decimals
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut exponent = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && exponent < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }

    let mut digits = format!("{:.2}", value);
    if digits.contains('.') {
        let trimmed = digits.trim_end_matches('0').trim_end_matches('.').len();
        digits.truncate(trimmed);
    }
    format!("{} {}", digits, BYTE_UNITS[exponent])
}
