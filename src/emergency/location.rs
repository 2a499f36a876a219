//! Best-effort device location for emergency alerts

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters
    pub accuracy: f64,
    pub captured_at: DateTime<Utc>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            captured_at: Utc::now(),
        }
    }

    pub fn maps_url(&self) -> String {
        format!(
            "https://www.google.com/maps?q={},{}",
            self.latitude, self.longitude
        )
    }
}

/// Single-attempt fix parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix that may be reused; zero means a fresh fix
    pub maximum_age: Duration,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::ZERO,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("position unavailable")]
    PositionUnavailable,

    #[error("timed out")]
    Timeout,

    #[error("geolocation not supported")]
    Unsupported,
}

impl GeolocationError {
    /// Notice shown to the user, if this failure deserves one
    pub fn user_notice(&self) -> Option<&'static str> {
        match self {
            GeolocationError::PermissionDenied => Some(
                "Location access was denied. Emergency contacts won't receive precise location.",
            ),
            GeolocationError::PositionUnavailable => Some("Location information is unavailable."),
            GeolocationError::Timeout => Some("Location request timed out."),
            GeolocationError::Unsupported => None,
        }
    }
}

impl From<GeolocationError> for crate::SahayakError {
    fn from(e: GeolocationError) -> Self {
        crate::SahayakError::GeolocationError(e.to_string())
    }
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(
        &self,
        request: &LocationRequest,
    ) -> Result<Location, GeolocationError>;
}

/// Provider for platforms without positioning
#[derive(Debug, Default)]
pub struct UnavailableLocation;

#[async_trait]
impl LocationProvider for UnavailableLocation {
    async fn current_position(
        &self,
        _request: &LocationRequest,
    ) -> Result<Location, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }
}

/// Provider that reports a configured position, e.g. a home address
#[derive(Debug, Clone)]
pub struct FixedLocation {
    latitude: f64,
    longitude: f64,
    accuracy: f64,
}

impl FixedLocation {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
        }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(
        &self,
        _request: &LocationRequest,
    ) -> Result<Location, GeolocationError> {
        Ok(Location::new(self.latitude, self.longitude, self.accuracy))
    }
}

/// One attempt, bounded by the request timeout
pub async fn acquire(
    provider: &dyn LocationProvider,
    request: &LocationRequest,
) -> Result<Location, GeolocationError> {
    let result = match tokio::time::timeout(request.timeout, provider.current_position(request))
        .await
    {
        Ok(result) => result,
        Err(_) => Err(GeolocationError::Timeout),
    };

    match &result {
        Ok(location) => info!(
            "Location obtained: {}, {} (±{} m)",
            location.latitude, location.longitude, location.accuracy
        ),
        Err(e) => warn!("Geolocation error: {}", e),
    }
    result
}
