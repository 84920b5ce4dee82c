//! Plain-text rendering of the console state.

use std::fmt::Write;

use checkin_core::models::{EntryDataPoint, EventCheckInStats, RecentEntry, Station, StationStats};
use checkin_core::utils::truncate_string;
use checkin_core::{AccessSession, CheckInConsole, SessionState};

/// Widest bar in the entries chart
const CHART_WIDTH: usize = 40;

/// Recent entries shown in the feed
const RECENT_ENTRIES_SHOWN: usize = 10;

const NAME_WIDTH: usize = 24;

pub fn render(console: &CheckInConsole) -> String {
    let dashboard = console.dashboard();
    let registry = console.registry();
    let mut out = String::new();

    let _ = writeln!(out, "=== {} ===", dashboard.title());
    if let Some(event) = dashboard.event() {
        let _ = writeln!(out, "{}", event.schedule_display());
    }
    let updated = dashboard.last_updated().unwrap_or_else(|| "never".to_string());
    let stale = if dashboard.is_stale() { " (stale)" } else { "" };
    let _ = writeln!(out, "Role: {}   Updated: {}{}", dashboard.role(), updated, stale);
    out.push('\n');

    out.push_str(&render_stats(&dashboard.stats()));
    out.push('\n');
    out.push_str(&render_recent_entries(dashboard.recent_entries()));
    out.push('\n');
    out.push_str(&render_chart(dashboard.entry_data()));
    out.push('\n');

    let stats_age = registry.stats_age().unwrap_or_else(|| "never".to_string());
    let _ = writeln!(out, "Stations (stats {})", stats_age);
    if registry.stations().is_empty() {
        let _ = writeln!(out, "  No stations");
    }
    for station in registry.stations() {
        let _ = writeln!(
            out,
            "{}",
            render_station(station, registry.stats_for(&station.id), registry.session(&station.id))
        );
    }
    if registry.controls_visible() {
        let _ = writeln!(out, "Controls: add | toggle <station> | remove <station>");
    }
    out
}

pub fn render_stats(stats: &EventCheckInStats) -> String {
    format!(
        "Total guests: {}\nChecked in:   {} ({:.0}%)\nNot arrived:  {}\n",
        stats.total_guests,
        stats.checked_in,
        stats.percent_checked_in(),
        stats.not_arrived()
    )
}

pub fn render_recent_entries(entries: &[RecentEntry]) -> String {
    let mut out = String::from("Recent entries\n");
    if entries.is_empty() {
        out.push_str("  None yet\n");
        return out;
    }
    for entry in entries.iter().take(RECENT_ENTRIES_SHOWN) {
        let _ = writeln!(
            out,
            "  {}  {}",
            entry.time_display(),
            truncate_string(&entry.guest_name, NAME_WIDTH)
        );
    }
    out
}

/// Horizontal bar chart scaled to the busiest point.
pub fn render_chart(points: &[EntryDataPoint]) -> String {
    let mut out = String::from("Entries over time\n");
    let max = points.iter().map(|p| p.entries).max().unwrap_or(0);
    if max == 0 {
        out.push_str("  No entries\n");
        return out;
    }
    let label_width = points.iter().map(|p| p.time.chars().count()).max().unwrap_or(0);
    for point in points {
        let len = (point.entries as usize * CHART_WIDTH).div_ceil(max as usize);
        let _ = writeln!(
            out,
            "  {:>width$} | {} {}",
            point.time,
            "#".repeat(len),
            point.entries,
            width = label_width
        );
    }
    out
}

pub fn render_station(
    station: &Station,
    stats: Option<&StationStats>,
    session: Option<&AccessSession>,
) -> String {
    let numbers = match stats {
        Some(s) => format!("{} entries, avg {}", s.entries_processed, s.average_display()),
        None => "no stats".to_string(),
    };
    let mut line = format!(
        "  [{}] {:<width$} {:<8} {}",
        station.id,
        truncate_string(&station.display_name(), NAME_WIDTH),
        station.status_display(),
        numbers,
        width = NAME_WIDTH
    );
    if let Some(session) = session {
        let _ = write!(line, "\n      {}", render_session_state(session.state()));
    }
    line
}

pub fn render_session_state(state: &SessionState) -> String {
    match state {
        SessionState::ResultShown(result) => {
            format!("{}: {}", state.label(), result.guest_name)
        }
        SessionState::ErrorShown(denial) => format!("{}: {}", state.label(), denial.message),
        SessionState::Scanning | SessionState::Verifying => state.label().to_string(),
    }
}
