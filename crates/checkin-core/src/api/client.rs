//! API client for the event check-in REST backend.
//!
//! This module provides the `ApiClient` struct for the event, station,
//! verification and dashboard endpoints consumed by the check-in views.

use std::time::Duration;

use reqwest::{header, Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{
    EntryDataPoint, Event, EventCheckInStats, RecentEntry, RoleResponse, Station, StationStatsMap,
    UserRole,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default backend base URL when neither env nor config provide one
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) GET requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    #[serde(rename = "qrData")]
    qr_data: &'a str,
}

#[derive(Debug, Serialize)]
struct AddStationRequest<'a> {
    #[serde(rename = "eventId")]
    event_id: &'a str,
}

/// Success body of `POST /events/{id}/verify-qr`.
///
/// Most backends answer `{ guestName }`; some also flag a refusal in a
/// 200 body with `granted: false` and a `message` or `reason`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyResponse {
    #[serde(rename = "guestName", default)]
    pub guest_name: Option<String>,
    #[serde(default)]
    pub granted: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// API client for the check-in backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client against `base_url` (e.g. `http://localhost:5000/api`)
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_headers(&self) -> ApiResult<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| {
                    ApiError::InvalidResponse("Bearer token is not a valid header value".into())
                })?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> ApiResult<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(response: Response, url: &str) -> ApiResult<T> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            debug!(url = %url, "GET");
            let response = self
                .client
                .get(&url)
                .headers(self.auth_headers()?)
                .send()
                .await?;

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(ApiError::RateLimited);
                }
                warn!(
                    url = %url,
                    retry = retries,
                    backoff_ms = backoff_ms,
                    "Rate limited, backing off"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2; // Exponential backoff
                continue;
            }

            let response = Self::check_response(response).await?;
            return Self::parse_json(response, &url).await;
        }
    }

    // Writes are not retried: a verification or station creation must not be
    // submitted twice.
    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ApiResult<T> {
        let url = self.url(path);
        debug!(url = %url, "POST");
        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .json(body)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse_json(response, &url).await
    }

    async fn delete(&self, path: &str) -> ApiResult<()> {
        let url = self.url(path);
        debug!(url = %url, "DELETE");
        let response = self
            .client
            .delete(&url)
            .headers(self.auth_headers()?)
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }

    // ===== Event =====

    /// Fetch event details (name, schedule, capacity)
    pub async fn fetch_event(&self, event_id: &str) -> ApiResult<Event> {
        self.get(&format!("/events/{}", event_id)).await
    }

    /// Fetch aggregate check-in counts for an event
    pub async fn fetch_event_stats(&self, event_id: &str) -> ApiResult<EventCheckInStats> {
        self.get(&format!("/events/{}/stats", event_id)).await
    }

    /// Submit a scanned QR payload for verification
    pub async fn verify_qr(&self, event_id: &str, qr_data: &str) -> ApiResult<VerifyResponse> {
        self.post(
            &format!("/events/{}/verify-qr", event_id),
            &VerifyRequest { qr_data },
        )
        .await
    }

    // ===== Stations =====

    pub async fn fetch_stations(&self, event_id: &str) -> ApiResult<Vec<Station>> {
        self.get(&format!("/events/{}/stations", event_id)).await
    }

    pub async fn add_station(&self, event_id: &str) -> ApiResult<Station> {
        self.post(
            &format!("/events/{}/stations", event_id),
            &AddStationRequest { event_id },
        )
        .await
    }

    /// Flip a station's active flag; returns the backend's updated record
    pub async fn toggle_station(&self, event_id: &str, station_id: &str) -> ApiResult<Station> {
        self.post(
            &format!("/events/{}/stations/{}/toggle", event_id, station_id),
            &serde_json::json!({}),
        )
        .await
    }

    pub async fn remove_station(&self, event_id: &str, station_id: &str) -> ApiResult<()> {
        self.delete(&format!("/events/{}/stations/{}", event_id, station_id))
            .await
    }

    /// Fetch statistics for every station of an event, keyed by station id
    pub async fn fetch_station_stats(&self, event_id: &str) -> ApiResult<StationStatsMap> {
        self.get(&format!("/events/{}/stations/stats", event_id)).await
    }

    // ===== Dashboard =====

    /// Fetch the newest-first entry feed
    pub async fn fetch_recent_entries(&self, event_id: &str) -> ApiResult<Vec<RecentEntry>> {
        self.get(&format!("/events/{}/recent-entries", event_id)).await
    }

    /// Fetch time-bucketed entry counts for the chart
    pub async fn fetch_entry_data(&self, event_id: &str) -> ApiResult<Vec<EntryDataPoint>> {
        self.get(&format!("/events/{}/entry-data", event_id)).await
    }

    // ===== Auth =====

    pub async fn fetch_user_role(&self) -> ApiResult<UserRole> {
        let response: RoleResponse = self.get("/auth/user-role").await?;
        Ok(UserRole::from_str(&response.role))
    }
}
