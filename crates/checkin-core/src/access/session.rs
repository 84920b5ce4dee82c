//! Per-station scan-and-confirm state machine.
//!
//! ```text
//!   Scanning --scan--> Verifying --granted--> ResultShown --reset--> Scanning
//!                          |
//!                          +-----denied-----> ErrorShown  --reset--> Scanning
//!   Scanning --camera_error--> ErrorShown
//! ```
//!
//! The camera is only active in `Scanning`, so a scan that arrives while a
//! verification is in flight (or while an outcome is shown) is ignored.
//! That gives at most one in-flight verification per station without any
//! locking.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::models::{DenialReason, ScanDenial, ScanResult};
use crate::polling::RefreshTrigger;

use super::QrVerifier;

type VerifyOutcome = Result<ScanResult, ScanDenial>;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Camera active, nothing shown
    Scanning,
    /// Verification request in flight, camera inactive
    Verifying,
    ResultShown(ScanResult),
    ErrorShown(ScanDenial),
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Scanning => "scanning",
            SessionState::Verifying => "verifying",
            SessionState::ResultShown(_) => "access granted",
            SessionState::ErrorShown(_) => "access denied",
        }
    }
}

pub struct AccessSession {
    event_id: String,
    station_id: String,
    verifier: QrVerifier,
    state: SessionState,
    /// Fired after every granted scan
    refresh_triggers: Vec<RefreshTrigger>,
    result_tx: mpsc::Sender<VerifyOutcome>,
    result_rx: mpsc::Receiver<VerifyOutcome>,
    alive: CancellationToken,
}

impl AccessSession {
    pub fn new(
        verifier: QrVerifier,
        event_id: impl Into<String>,
        station_id: impl Into<String>,
    ) -> Self {
        let (result_tx, result_rx) = mpsc::channel(1);
        Self {
            event_id: event_id.into(),
            station_id: station_id.into(),
            verifier,
            state: SessionState::Scanning,
            refresh_triggers: Vec::new(),
            result_tx,
            result_rx,
            alive: CancellationToken::new(),
        }
    }

    /// Register a refresh trigger to fire after each granted scan.
    pub fn with_refresh(mut self, trigger: RefreshTrigger) -> Self {
        self.refresh_triggers.push(trigger);
        self
    }

    pub fn add_refresh(&mut self, trigger: RefreshTrigger) {
        self.refresh_triggers.push(trigger);
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn camera_active(&self) -> bool {
        !self.is_torn_down() && matches!(self.state, SessionState::Scanning)
    }

    pub fn is_verifying(&self) -> bool {
        matches!(self.state, SessionState::Verifying)
    }

    pub fn result(&self) -> Option<&ScanResult> {
        match &self.state {
            SessionState::ResultShown(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ScanDenial> {
        match &self.state {
            SessionState::ErrorShown(denial) => Some(denial),
            _ => None,
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.alive.is_cancelled()
    }

    /// Submit a scanned payload. Returns `false` (and does nothing) unless
    /// the camera is active.
    pub fn scan(&mut self, payload: &str) -> bool {
        if !self.camera_active() {
            debug!(
                station = %self.station_id,
                state = self.state.label(),
                "Scan ignored, camera inactive"
            );
            return false;
        }

        self.state = SessionState::Verifying;

        let verifier = self.verifier.clone();
        let event_id = self.event_id.clone();
        let payload = payload.to_string();
        let tx = self.result_tx.clone();
        let alive = self.alive.clone();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = alive.cancelled() => return,
                outcome = verifier.verify(&event_id, &payload) => outcome,
            };
            if alive.is_cancelled() {
                return;
            }
            // The receiver lives as long as the session; a send error only
            // means the session is gone.
            let _ = tx.send(outcome).await;
        });

        true
    }

    /// Report a camera/decoder failure while scanning.
    pub fn camera_error(&mut self, message: Option<&str>) -> bool {
        if !self.camera_active() {
            return false;
        }
        self.state = SessionState::ErrorShown(ScanDenial::new(DenialReason::CameraError, message));
        true
    }

    /// Clear a shown result or error and re-activate the camera.
    /// Does nothing while scanning or while a verification is in flight.
    pub fn reset(&mut self) -> bool {
        if self.is_torn_down() {
            return false;
        }
        match self.state {
            SessionState::ResultShown(_) | SessionState::ErrorShown(_) => {
                self.state = SessionState::Scanning;
                true
            }
            SessionState::Scanning | SessionState::Verifying => false,
        }
    }

    /// Apply a finished verification, if one is waiting. Returns true when
    /// the state changed.
    pub fn check_background_tasks(&mut self) -> bool {
        if self.is_torn_down() {
            return false;
        }
        match self.result_rx.try_recv() {
            Ok(outcome) => self.apply(outcome),
            Err(_) => false,
        }
    }

    /// Wait for the in-flight verification (if any) to land and return the
    /// resulting state.
    pub async fn wait_for_outcome(&mut self) -> &SessionState {
        if self.is_verifying() && !self.is_torn_down() {
            let outcome = tokio::select! {
                biased;
                _ = self.alive.cancelled() => None,
                outcome = self.result_rx.recv() => outcome,
            };
            if let Some(outcome) = outcome {
                self.apply(outcome);
            }
        }
        &self.state
    }

    fn apply(&mut self, outcome: VerifyOutcome) -> bool {
        if !self.is_verifying() {
            return false;
        }
        match outcome {
            Ok(result) => {
                info!(station = %self.station_id, guest = %result.guest_name, "Access granted");
                self.state = SessionState::ResultShown(result);
                for trigger in &self.refresh_triggers {
                    trigger.fire();
                }
            }
            Err(denial) => {
                info!(station = %self.station_id, reason = %denial.reason, "Access denied");
                self.state = SessionState::ErrorShown(denial);
            }
        }
        true
    }

    /// Stop the session. In-flight verifications are abandoned and no
    /// further state changes happen.
    pub fn teardown(&mut self) {
        if !self.alive.is_cancelled() {
            debug!(station = %self.station_id, "Access session torn down");
            self.alive.cancel();
        }
    }
}

impl Drop for AccessSession {
    fn drop(&mut self) {
        self.alive.cancel();
    }
}
