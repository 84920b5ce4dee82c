//! Real-time event dashboard.
//!
//! `EventDashboard` loads the event and the user's role once, then keeps a
//! `DashboardSnapshot` (check-in counts, recent entries, entries chart)
//! refreshed every 30 seconds, replacing it wholesale on each successful
//! cycle.

pub mod aggregator;

pub use aggregator::{DashboardSnapshot, EventDashboard};
