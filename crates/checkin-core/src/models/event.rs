use serde::{Deserialize, Serialize};

use crate::utils::format_entry_time;

use super::string_or_number;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Event {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(rename = "startDate", default)]
    pub start_date: Option<String>,
    #[serde(rename = "endDate", default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub capacity: Option<u64>,
    #[serde(default)]
    pub location: Option<String>,
}

impl Event {
    /// Start/end range for headers, e.g. "2026-06-01 - 2026-06-02"
    pub fn schedule_display(&self) -> String {
        match (&self.start_date, &self.end_date) {
            (Some(start), Some(end)) if start != end => format!("{} - {}", start, end),
            (Some(start), _) => start.clone(),
            (None, Some(end)) => format!("until {}", end),
            (None, None) => "Unscheduled".to_string(),
        }
    }
}

/// Aggregate check-in counts for one event.
///
/// `notArrived` is optional on the wire. When it is missing, or when it
/// disagrees with the other two counts, it is derived as
/// `totalGuests - checkedIn` so the displayed numbers always add up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct EventCheckInStats {
    #[serde(rename = "totalGuests")]
    pub total_guests: u64,
    #[serde(rename = "checkedIn")]
    pub checked_in: u64,
    #[serde(rename = "notArrived", default)]
    pub not_arrived: Option<u64>,
}

impl EventCheckInStats {
    pub fn not_arrived(&self) -> u64 {
        let derived = self.total_guests.saturating_sub(self.checked_in);
        match self.not_arrived {
            Some(n) if n == derived => n,
            _ => derived,
        }
    }

    /// True when the backend sent a `notArrived` that matches the other counts.
    pub fn is_consistent(&self) -> bool {
        self.not_arrived
            .map(|n| self.checked_in.checked_add(n) == Some(self.total_guests))
            .unwrap_or(self.checked_in <= self.total_guests)
    }

    /// Percentage of guests checked in, 0 when the event has no guests.
    pub fn percent_checked_in(&self) -> f64 {
        if self.total_guests == 0 {
            0.0
        } else {
            self.checked_in as f64 * 100.0 / self.total_guests as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RecentEntry {
    #[serde(rename = "guestName")]
    pub guest_name: String,
    #[serde(rename = "entryTime")]
    pub entry_time: String,
}

impl RecentEntry {
    pub fn time_display(&self) -> String {
        format_entry_time(&self.entry_time)
    }
}

/// One bar of the entries chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct EntryDataPoint {
    pub time: String,
    pub entries: u64,
}
