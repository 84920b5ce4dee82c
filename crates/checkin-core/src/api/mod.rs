//! REST API client module for the check-in backend.
//!
//! This module provides the `ApiClient` for the event, station,
//! QR verification, dashboard and role endpoints.
//!
//! Requests carry an optional bearer token; obtaining it is left to the
//! surrounding application.

pub mod client;
pub mod error;

pub use client::{ApiClient, ApiResult, VerifyResponse, DEFAULT_API_URL};
pub use error::ApiError;
