//! Multi-station access control for one event.
//!
//! `StationRegistry` keeps the event's station list and per-station
//! statistics, runs the stats poller, and owns one `AccessSession` for
//! every active station. Add/toggle/remove are offered to `admin` and
//! `supervisor` roles only.

pub mod registry;

pub use registry::{RegistryError, StationRegistry};
