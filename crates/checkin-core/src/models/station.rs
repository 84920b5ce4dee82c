use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::format_seconds;

use super::{optional_string_or_number, string_or_number};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Station {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "eventId", default, deserialize_with = "optional_string_or_number")]
    pub event_id: Option<String>,
    #[serde(rename = "isActive", default)]
    pub is_active: bool,
    #[serde(rename = "createdAt", default)]
    #[cfg_attr(feature = "ts", ts(type = "string | null"))]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Station {
    pub fn display_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => format!("Station {}", self.id),
        }
    }

    pub fn status_display(&self) -> &'static str {
        if self.is_active {
            "Active"
        } else {
            "Disabled"
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct StationStats {
    #[serde(rename = "entriesProcessed", default)]
    pub entries_processed: u64,
    /// Seconds
    #[serde(rename = "averageProcessingTime", default)]
    pub average_processing_time: f64,
}

impl StationStats {
    pub fn average_display(&self) -> String {
        format_seconds(self.average_processing_time)
    }
}

/// Per-station statistics keyed by station id, as returned by the backend.
pub type StationStatsMap = HashMap<String, StationStats>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_parses_backend_record() {
        let station: Station = serde_json::from_str(
            r#"{"id": 7, "eventId": "E1", "isActive": true, "createdAt": "2026-06-01T08:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(station.id, "7");
        assert_eq!(station.event_id.as_deref(), Some("E1"));
        assert!(station.is_active);
        assert!(station.created_at.is_some());
        assert_eq!(station.display_name(), "Station 7");
        assert_eq!(station.status_display(), "Active");
    }

    #[test]
    fn test_station_minimal_record() {
        let station: Station = serde_json::from_str(r#"{"id": "S1"}"#).unwrap();
        assert!(!station.is_active);
        assert_eq!(station.event_id, None);
        assert_eq!(station.status_display(), "Disabled");
    }

    #[test]
    fn test_station_named() {
        let station: Station =
            serde_json::from_str(r#"{"id": "S1", "name": "North gate", "isActive": true}"#)
                .unwrap();
        assert_eq!(station.display_name(), "North gate");
    }

    #[test]
    fn test_stats_map_parses() {
        let map: StationStatsMap = serde_json::from_str(
            r#"{
                "S1": {"entriesProcessed": 12, "averageProcessingTime": 3.5},
                "S2": {"entriesProcessed": 0, "averageProcessingTime": 0}
            }"#,
        )
        .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["S1"].entries_processed, 12);
        assert_eq!(map["S1"].average_display(), "3.50 seconds");
        assert_eq!(map["S2"].average_display(), "0.00 seconds");
    }
}
