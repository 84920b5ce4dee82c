use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::polling::POLL_INTERVAL;

/// A fetched value is considered stale once two poll cycles have been missed.
const STALE_AFTER_POLLS: i64 = 2;

/// A value fetched from the backend together with the time it was fetched.
///
/// Views keep the last successful value in one of these and replace it
/// wholesale when a newer fetch succeeds. When fetches fail the old value
/// stays visible and `age_display` tells the operator how old it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_seconds(&self) -> i64 {
        (Utc::now() - self.cached_at).num_seconds()
    }

    pub fn age_display(&self) -> String {
        let seconds = self.age_seconds();
        if seconds < 10 {
            // Includes negative ages from clock skew
            "just now".to_string()
        } else if seconds < 60 {
            format!("{}s ago", seconds)
        } else if seconds < 3600 {
            format!("{}m ago", seconds / 60)
        } else {
            format!("{}h ago", seconds / 3600)
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_seconds() > POLL_INTERVAL.as_secs() as i64 * STALE_AFTER_POLLS
    }
}
