//! Navigation state: phases, the per-walk session record, events, snapshots

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::geo::{LngLat, Position};
use crate::types::route::{Highlight, RoutePlan};
use crate::{ADVISORY_DISPLAY_SECS, POI_REVEAL_DISPLAY_SECS};

/// Where the walk begins: the device's live location, or a searched point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StartPoint {
    DeviceLocation,
    Custom { coords: LngLat, name: String },
}

/// The four phases of the navigation tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NavPhase {
    /// No route on screen
    Idle,
    /// Route displayed, not tracking
    Browsing,
    /// Consuming the position stream
    Navigating,
    /// Arrival detected, awaiting acknowledgement
    Arrived,
}

impl NavPhase {
    /// Get ANSI color code for terminal display
    pub fn color_code(&self) -> &'static str {
        match self {
            NavPhase::Idle => "\x1b[90m",       // Gray
            NavPhase::Browsing => "\x1b[33m",   // Orange/Yellow
            NavPhase::Navigating => "\x1b[36m", // Cyan
            NavPhase::Arrived => "\x1b[32m",    // Green
        }
    }

    /// Reset ANSI color
    pub fn color_reset() -> &'static str {
        "\x1b[0m"
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self, NavPhase::Navigating)
    }
}

impl std::fmt::Display for NavPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NavPhase::Idle => "IDLE",
            NavPhase::Browsing => "BROWSING",
            NavPhase::Navigating => "NAVIGATING",
            NavPhase::Arrived => "ARRIVED",
        };
        write!(f, "{}", name)
    }
}

/// Live tracking state for one committed walk.
///
/// Exists only while a route result is displayed and the user explicitly
/// started navigating; discarded the instant the active route changes.
#[derive(Debug, Clone)]
pub struct NavigationSession {
    pub route: RoutePlan,
    pub is_loop: bool,
    /// Highlight keys already revealed; only grows within a session
    pub seen_poi_keys: HashSet<String>,
    pub last_known_position: Option<Position>,
    pub started_at: DateTime<Utc>,
    /// Highest progress fraction observed so far; loop arrival gates on this
    pub max_progress: f64,
    pub arrived: bool,
}

impl NavigationSession {
    pub fn new(route: RoutePlan, is_loop: bool) -> Self {
        Self {
            route,
            is_loop,
            seen_poi_keys: HashSet::new(),
            last_known_position: None,
            started_at: Utc::now(),
            max_progress: 0.0,
            arrived: false,
        }
    }
}

/// One-shot events for the presentation layer (toast, modal)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NavEvent {
    /// A highlight came within reveal range; display window 8 s
    PoiRevealed(Highlight),
    /// Arrival detected; fires once per session
    Arrived,
    /// Transient notice (e.g. refused start); display window 4 s
    Advisory { message: String },
}

impl NavEvent {
    /// Auto-dismiss window, where one applies
    pub fn display_secs(&self) -> Option<u64> {
        match self {
            NavEvent::PoiRevealed(_) => Some(POI_REVEAL_DISPLAY_SECS),
            NavEvent::Arrived => None,
            NavEvent::Advisory { .. } => Some(ADVISORY_DISPLAY_SECS),
        }
    }
}

/// Read-only tracking snapshot for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavSnapshot {
    pub phase: NavPhase,
    pub remaining_distance_m: f64,
    pub remaining_minutes: u32,
    /// 0.0–1.0 along the route
    pub progress: f64,
    pub off_screen: bool,
    pub remaining_distance_label: String,
    pub remaining_time_label: String,
}
