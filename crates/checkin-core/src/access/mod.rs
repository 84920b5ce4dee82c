//! Access control at a single station.
//!
//! - `QrVerifier`: submits a scanned payload to the backend and classifies
//!   the answer (granted, or a `ScanDenial` with a reason and message)
//! - `AccessSession`: the scan / result / error state machine of one station

pub mod session;
pub mod verifier;

pub use session::{AccessSession, SessionState};
pub use verifier::QrVerifier;
