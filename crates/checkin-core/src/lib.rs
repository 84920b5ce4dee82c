//! Event check-in core - shared logic for the check-in console.
//!
//! This crate contains everything an operator-facing frontend needs to run
//! check-in for one event: the backend API client, the QR access session
//! state machine, the multi-station registry with its stats poller, and the
//! real-time event dashboard.
//!
//! All views are owned by a single task and mutated through `&mut self`;
//! background fetches deliver results over channels that are applied in
//! `check_background_tasks()`.

pub mod access;
pub mod api;
pub mod cache;
pub mod config;
pub mod console;
pub mod dashboard;
pub mod models;
pub mod polling;
pub mod stations;
pub mod utils;

pub use access::{AccessSession, QrVerifier, SessionState};
pub use api::{ApiClient, ApiError, DEFAULT_API_URL};
pub use config::Config;
pub use console::CheckInConsole;
pub use dashboard::{DashboardSnapshot, EventDashboard};
pub use polling::{PollHandle, RefreshTrigger, POLL_INTERVAL};
pub use stations::{RegistryError, StationRegistry};
