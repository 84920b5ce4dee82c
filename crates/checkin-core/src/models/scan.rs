use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A granted scan, held only while the session shows it.
///
/// Denials never produce a `ScanResult`; verification returns
/// `Result<ScanResult, ScanDenial>` and the session shows the denial in
/// `ErrorShown`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ScanResult {
    pub guest_name: String,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub scanned_at: DateTime<Utc>,
}

impl ScanResult {
    pub fn granted(guest_name: impl Into<String>) -> Self {
        Self {
            guest_name: guest_name.into(),
            scanned_at: Utc::now(),
        }
    }
}

/// Why a scan did not grant access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum DenialReason {
    Malformed,
    UnknownGuest,
    AlreadyCheckedIn,
    Unavailable,
    Rejected,
    CameraError,
}

impl DenialReason {
    /// Message used when the backend did not provide one.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            DenialReason::Malformed => "Invalid QR code",
            DenialReason::UnknownGuest => "Guest not found for this event",
            DenialReason::AlreadyCheckedIn => "Guest has already checked in",
            DenialReason::Unavailable => "Verification service unavailable",
            DenialReason::Rejected => "QR code verification failed",
            DenialReason::CameraError => "Unable to read QR code",
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenialReason::Malformed => write!(f, "Malformed code"),
            DenialReason::UnknownGuest => write!(f, "Unknown guest"),
            DenialReason::AlreadyCheckedIn => write!(f, "Already checked in"),
            DenialReason::Unavailable => write!(f, "Backend unavailable"),
            DenialReason::Rejected => write!(f, "Rejected"),
            DenialReason::CameraError => write!(f, "Camera error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ScanDenial {
    pub reason: DenialReason,
    pub message: String,
}

impl ScanDenial {
    /// Build a denial, using the reason's fallback when `message` is empty.
    pub fn new(reason: DenialReason, message: Option<&str>) -> Self {
        let message = match message.map(str::trim) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => reason.fallback_message().to_string(),
        };
        Self { reason, message }
    }
}

impl std::fmt::Display for ScanDenial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.reason, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denial_uses_backend_message() {
        let denial = ScanDenial::new(DenialReason::AlreadyCheckedIn, Some("Ticket used at 19:02"));
        assert_eq!(denial.message, "Ticket used at 19:02");
        assert_eq!(denial.to_string(), "Already checked in: Ticket used at 19:02");
    }

    #[test]
    fn test_denial_fallback_message() {
        assert_eq!(
            ScanDenial::new(DenialReason::Rejected, None).message,
            "QR code verification failed"
        );
        assert_eq!(
            ScanDenial::new(DenialReason::UnknownGuest, Some("   ")).message,
            "Guest not found for this event"
        );
    }

    #[test]
    fn test_granted_result() {
        let before = Utc::now();
        let result = ScanResult::granted("Ada Lovelace");
        assert_eq!(result.guest_name, "Ada Lovelace");
        assert!(result.scanned_at >= before);
    }
}
