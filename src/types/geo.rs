//! Geographic primitives: coordinates, position samples, map bounds

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A coordinate pair, longitude first.
///
/// Route geometry is interchanged as `[lng, lat]` arrays, so the wire order
/// is baked into the type rather than left to call sites.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat(pub f64, pub f64);

impl LngLat {
    /// Build from the spoken-order pair (latitude, longitude)
    pub fn from_lat_lng(lat: f64, lng: f64) -> Self {
        Self(lng, lat)
    }

    pub fn lng(&self) -> f64 {
        self.0
    }

    pub fn lat(&self) -> f64 {
        self.1
    }
}

/// One sample from the geolocation stream.
///
/// Ephemeral: each new sample overwrites the last, nothing is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
    /// Compass heading in degrees, when the platform reports one
    pub heading: Option<f64>,
    /// Horizontal accuracy in meters, when the platform reports one
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    /// Create a sample at the current time with no heading/accuracy
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            heading: None,
            accuracy: None,
            timestamp: Utc::now(),
        }
    }

    pub fn lng_lat(&self) -> LngLat {
        LngLat::from_lat_lng(self.lat, self.lng)
    }
}

/// Visible map viewport, for off-screen detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl MapBounds {
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.south && lat <= self.north && lng >= self.west && lng <= self.east
    }
}

/// Why the platform could not produce a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoError {
    PermissionDenied,
    Unavailable,
    TimedOut,
}

impl std::fmt::Display for GeoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GeoError::PermissionDenied => "location permission denied",
            GeoError::Unavailable => "location unavailable",
            GeoError::TimedOut => "location request timed out",
        };
        write!(f, "{}", name)
    }
}

/// Item on the sampler stream: a fix or an explicit failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeoUpdate {
    Fix(Position),
    Failed { error: GeoError },
}

// =============================================================================
// TESTS
// =============================================================================
