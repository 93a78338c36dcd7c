//! (re)Route core: conversational walk-route resolution + live navigation tracking
//!
//! The crate owns two state machines: the walk session (mood text → clarification
//! branches → concrete route) and the navigation tracker (GPS stream → remaining
//! distance/time, POI reveals, arrival). Everything behind them (mood
//! interpretation, route generation, place search) is an external service
//! reached through the contracts in `core::service`.

pub mod core;
pub mod types;

// =============================================================================
// RESOLUTION THRESHOLDS
// =============================================================================

/// Wall-clock deadline for one mood-resolution call (seconds)
pub const RESOLVE_TIMEOUT_SECS: u64 = 30;

/// Place options shown before the first "load more"
pub const PLACE_OPTIONS_PAGE_SIZE: usize = 5;

/// Fallback duration choices (minutes) when the server skips the prompt
/// without suggesting one; picked uniformly at random
pub const AUTO_DURATION_CHOICES: [u32; 3] = [10, 20, 40];

/// Quiet interval for debounced start-point search (milliseconds)
pub const SEARCH_DEBOUNCE_MS: u64 = 350;

// =============================================================================
// NAVIGATION THRESHOLDS
// =============================================================================

/// Assumed walking pace for remaining-time estimates (meters per minute)
pub const WALKING_PACE_M_PER_MIN: f64 = 80.0;

/// Arrival fires within this distance of the final route point (meters)
pub const ARRIVAL_RADIUS_M: f64 = 30.0;

/// Loop routes additionally require this progress fraction before arrival
/// is accepted near the shared start/end point
pub const LOOP_ARRIVAL_MIN_PROGRESS: f64 = 0.70;

/// A highlight is revealed within this distance of the walker (meters)
pub const POI_REVEAL_RADIUS_M: f64 = 50.0;

/// A reveal auto-dismisses after this long unless superseded (seconds)
pub const POI_REVEAL_DISPLAY_SECS: u64 = 8;

/// Transient advisories (e.g. refused start) auto-expire after this (seconds)
pub const ADVISORY_DISPLAY_SECS: u64 = 4;

/// With a custom start point, navigation may only begin within this
/// distance of the route's first coordinate (meters)
pub const START_PROXIMITY_LIMIT_M: f64 = 500.0;

// =============================================================================
// ALTERNATIVE-ROUTE COMPARISON
// =============================================================================

/// The quick plan is switchable only when it differs from the recommended
/// plan by more than both of these
pub const ALT_MIN_DURATION_DELTA_SECS: i64 = 120;
pub const ALT_MIN_DISTANCE_DELTA_M: f64 = 200.0;

// =============================================================================
// GEOGRAPHY
// =============================================================================

/// Mean Earth radius for great-circle distances (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Service area boundary (Barcelona); resolved start points outside are rejected
pub const SERVICE_AREA_MIN_LAT: f64 = 41.0;
pub const SERVICE_AREA_MAX_LAT: f64 = 42.0;
pub const SERVICE_AREA_MIN_LNG: f64 = 1.5;
pub const SERVICE_AREA_MAX_LNG: f64 = 2.5;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
