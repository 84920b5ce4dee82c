//! In-memory snapshots of backend data.
//!
//! Every cache in this crate is replaced wholesale by the latest successful
//! fetch. `CachedData` records when that happened so views can show
//! "stale but present" data with its age.

pub mod snapshot;

pub use snapshot::CachedData;
