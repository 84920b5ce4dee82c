use chrono::{DateTime, Local};

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an entry timestamp as local wall-clock time (HH:MM:SS).
/// Returns the input unchanged when it is not RFC 3339.
pub fn format_entry_time(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(dt) => dt.with_timezone(&Local).format("%H:%M:%S").to_string(),
        Err(_) => timestamp.to_string(),
    }
}

/// Format a duration in seconds with two decimals, e.g. "3.50 seconds"
pub fn format_seconds(seconds: f64) -> String {
    if seconds.is_finite() {
        format!("{:.2} seconds", seconds)
    } else {
        "n/a".to_string()
    }
}
