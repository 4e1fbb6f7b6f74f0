//! Units formatting utilities
//!
//! Human-readable formatting of sizes, durations, and rates for the
//! one-line run summary and console output.

use std::time::Duration;

/// Format bytes into human-readable size with appropriate units
///
/// # Examples
/// ```
/// use logbench::util::units::format_bytes;
///
/// assert_eq!(format_bytes(1024), "1.0 KiB");
/// assert_eq!(format_bytes(1048576), "1.0 MiB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Format duration with precision suited to its magnitude
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use logbench::util::units::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// assert_eq!(format_duration(Duration::from_micros(500)), "500\u{3bc}s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 3600 {
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if total_secs >= 60 {
        let minutes = total_secs / 60;
        let seconds = total_secs % 60;
        format!("{}m {}s", minutes, seconds)
    } else if total_secs > 0 {
        if millis > 0 {
            format!("{}.{:02}s", total_secs, millis / 10)
        } else {
            format!("{}s", total_secs)
        }
    } else if millis > 0 {
        let micros = duration.as_micros();
        format!("{:.2}ms", micros as f64 / 1000.0)
    } else {
        format!("{}μs", duration.as_micros())
    }
}

/// Format a records-per-second rate with appropriate units
///
/// # Examples
/// ```
/// use logbench::util::units::format_rate;
///
/// assert_eq!(format_rate(10.0), "10.0 rec/s");
/// assert_eq!(format_rate(1500.0), "1.5K rec/s");
/// ```
pub fn format_rate(rate_hz: f64) -> String {
    if rate_hz >= 1_000_000.0 {
        format!("{:.1}M rec/s", rate_hz / 1_000_000.0)
    } else if rate_hz >= 1_000.0 {
        format!("{:.1}K rec/s", rate_hz / 1_000.0)
    } else {
        format!("{:.1} rec/s", rate_hz)
    }
}
