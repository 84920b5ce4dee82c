use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{DenialReason, ScanDenial, ScanResult};

/// Longest payload submitted to the backend
const MAX_PAYLOAD_BYTES: usize = 4096;

/// Submits scanned QR payloads to the backend and interprets the answer.
///
/// Verification never touches station state: the caller decides what a
/// granted scan should refresh.
#[derive(Clone)]
pub struct QrVerifier {
    api: ApiClient,
}

impl QrVerifier {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn verify(&self, event_id: &str, payload: &str) -> Result<ScanResult, ScanDenial> {
        if payload.trim().is_empty() || payload.len() > MAX_PAYLOAD_BYTES {
            debug!(event_id, len = payload.len(), "Rejecting malformed QR payload locally");
            return Err(ScanDenial::new(DenialReason::Malformed, None));
        }

        match self.api.verify_qr(event_id, payload).await {
            Ok(resp) => {
                if resp.granted == Some(false) {
                    let message = resp.message.as_deref().or(resp.reason.as_deref());
                    return Err(ScanDenial::new(DenialReason::Rejected, message));
                }
                match resp.guest_name.filter(|name| !name.trim().is_empty()) {
                    Some(guest_name) => {
                        debug!(event_id, guest = %guest_name, "QR code accepted");
                        Ok(ScanResult::granted(guest_name))
                    }
                    None => {
                        warn!(event_id, "Verification succeeded without a guest name");
                        Err(ScanDenial::new(DenialReason::Rejected, resp.message.as_deref()))
                    }
                }
            }
            Err(e) => {
                let denial = denial_from_error(&e);
                warn!(event_id, error = %e, reason = %denial.reason, "QR verification failed");
                Err(denial)
            }
        }
    }
}

fn denial_from_error(error: &ApiError) -> ScanDenial {
    let reason = match error {
        ApiError::BadRequest(_) => DenialReason::Malformed,
        ApiError::NotFound(_) => DenialReason::UnknownGuest,
        ApiError::Conflict(_) => DenialReason::AlreadyCheckedIn,
        ApiError::NetworkError(_) | ApiError::ServerError(_) => DenialReason::Unavailable,
        ApiError::Unauthorized
        | ApiError::AccessDenied(_)
        | ApiError::RateLimited
        | ApiError::InvalidResponse(_) => DenialReason::Rejected,
    };
    ScanDenial::new(reason, error.backend_message())
}
