//! Data models for check-in entities.
//!
//! This module contains the data structures exchanged with the backend:
//!
//! - `Event`, `EventCheckInStats`: the event and its aggregate counts
//! - `RecentEntry`, `EntryDataPoint`: the entry feed and chart series
//! - `Station`, `StationStats`: access-control stations and their numbers
//! - `ScanResult`, `ScanDenial`: outcome of one QR verification
//! - `UserRole`, `EventContext`: who operates which event

pub mod event;
pub mod role;
pub mod scan;
pub mod station;

use serde::{Deserialize, Deserializer};

pub use event::{EntryDataPoint, Event, EventCheckInStats, RecentEntry};
pub use role::{EventContext, RoleResponse, UserRole};
pub use scan::{DenialReason, ScanDenial, ScanResult};
pub use station::{Station, StationStats, StationStatsMap};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Int(i64),
    Uint(u64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Int(n) => n.to_string(),
            StringOrNumber::Uint(n) => n.to_string(),
        }
    }
}

// Backends disagree on whether ids are numbers or strings; keep them as strings.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(String::from)
}

pub(crate) fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<StringOrNumber>::deserialize(deserializer).map(|v| v.map(String::from))
}
