//! Live navigation tracker
//!
//! Phase machine over one displayed route:
//!
//! ```text
//! Idle → Browsing → Navigating → Arrived → Idle
//!           ↑            │
//!           └── stop ────┘
//! ```
//!
//! Position samples drive nearest-vertex projection onto the route polyline,
//! the remaining distance/time readout, one-per-tick POI reveals, and
//! arrival detection. A loop route additionally gates arrival on the highest
//! progress seen so far, so standing at the shared start/end point right
//! after starting never counts as arriving.

use crate::core::geometry::{
    format_distance, haversine_m, nearest_vertex, path_length_m, progress_fraction,
    remaining_from, walk_minutes,
};
use crate::types::geo::{GeoUpdate, LngLat, MapBounds, Position};
use crate::types::route::{RoutePlan, WalkRecommendation};
use crate::types::session::{NavEvent, NavPhase, NavSnapshot, NavigationSession, StartPoint};
use crate::types::{WalkError, WalkResult};
use crate::{
    ALT_MIN_DISTANCE_DELTA_M, ALT_MIN_DURATION_DELTA_SECS, ARRIVAL_RADIUS_M,
    LOOP_ARRIVAL_MIN_PROGRESS, POI_REVEAL_RADIUS_M, START_PROXIMITY_LIMIT_M,
};

pub struct NavigationTracker {
    phase: NavPhase,
    route: Option<RoutePlan>,
    is_loop: bool,
    session: Option<NavigationSession>,
    last_device_position: Option<Position>,
    viewport: Option<MapBounds>,
    off_screen: bool,
    /// Polyline length, cached when navigation starts
    route_length_m: f64,
    remaining_m: f64,
    remaining_min: u32,
    progress: f64,
}

impl Default for NavigationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationTracker {
    pub fn new() -> Self {
        Self {
            phase: NavPhase::Idle,
            route: None,
            is_loop: false,
            session: None,
            last_device_position: None,
            viewport: None,
            off_screen: false,
            route_length_m: 0.0,
            remaining_m: 0.0,
            remaining_min: 0,
            progress: 0.0,
        }
    }

    // =========================================================================
    // READ SURFACE
    // =========================================================================

    pub fn phase(&self) -> NavPhase {
        self.phase
    }

    pub fn route(&self) -> Option<&RoutePlan> {
        self.route.as_ref()
    }

    pub fn session(&self) -> Option<&NavigationSession> {
        self.session.as_ref()
    }

    pub fn last_position(&self) -> Option<Position> {
        self.last_device_position
    }

    pub fn snapshot(&self) -> NavSnapshot {
        NavSnapshot {
            phase: self.phase,
            remaining_distance_m: self.remaining_m,
            remaining_minutes: self.remaining_min,
            progress: self.progress,
            off_screen: self.off_screen,
            remaining_distance_label: format_distance(self.remaining_m),
            remaining_time_label: format!("{} min", self.remaining_min),
        }
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// Display a route. Any previous tracking session is discarded: route
    /// identity is what a session is bound to.
    pub fn show_route(&mut self, route: RoutePlan, is_loop: bool) {
        self.session = None;
        self.remaining_m = route.distance_meters;
        self.remaining_min = walk_minutes(route.distance_meters);
        self.progress = 0.0;
        self.is_loop = is_loop;
        self.route = Some(route);
        self.phase = NavPhase::Browsing;
        log::debug!("route displayed, phase -> {}", self.phase);
    }

    /// Begin tracking the displayed route.
    ///
    /// A custom start point is refused when the device's last known position
    /// is too far from the route's first coordinate; the caller surfaces the
    /// error as an advisory.
    pub fn start(&mut self, start: &StartPoint) -> WalkResult<()> {
        if self.phase != NavPhase::Browsing {
            return Err(WalkError::RefusedTransition(
                "no route ready to walk".to_string(),
            ));
        }
        let route = match &self.route {
            Some(r) if r.is_navigable() => r.clone(),
            _ => {
                return Err(WalkError::RefusedTransition(
                    "this route can't be walked".to_string(),
                ))
            }
        };

        if let StartPoint::Custom { name, .. } = start {
            // The gate measures against where the walk actually begins, not
            // against the marker the user dropped
            if let (Some(pos), Some(first)) = (&self.last_device_position, route.start()) {
                let d = haversine_m(pos.lng_lat(), first);
                if d > START_PROXIMITY_LIMIT_M {
                    return Err(WalkError::RefusedTransition(format!(
                        "You're {} from {} — get closer to start the walk.",
                        format_distance(d),
                        name
                    )));
                }
            }
        }

        self.route_length_m = path_length_m(&route.coordinates);
        self.remaining_m = self.route_length_m;
        self.remaining_min = walk_minutes(self.route_length_m);
        self.progress = 0.0;
        self.session = Some(NavigationSession::new(route, self.is_loop));
        self.phase = NavPhase::Navigating;
        log::info!("navigation started ({})", if self.is_loop { "loop" } else { "one-way" });
        Ok(())
    }

    /// Stop tracking but keep the route on screen. The session is discarded,
    /// so a later re-start reveals POIs afresh.
    pub fn stop(&mut self) {
        if self.route.is_none() {
            return;
        }
        self.session = None;
        self.progress = 0.0;
        if let Some(route) = &self.route {
            self.remaining_m = route.distance_meters;
            self.remaining_min = walk_minutes(route.distance_meters);
        }
        self.phase = NavPhase::Browsing;
        log::debug!("tracking stopped, phase -> {}", self.phase);
    }

    /// Leave the walk entirely: route, session and readouts all clear
    pub fn exit(&mut self) {
        self.session = None;
        self.route = None;
        self.is_loop = false;
        self.route_length_m = 0.0;
        self.remaining_m = 0.0;
        self.remaining_min = 0;
        self.progress = 0.0;
        self.off_screen = false;
        self.phase = NavPhase::Idle;
        log::debug!("walk exited, phase -> {}", self.phase);
    }

    // =========================================================================
    // POSITION STREAM
    // =========================================================================

    /// Feed one item from the position stream.
    ///
    /// Outside the navigating phase the sample only refreshes the last known
    /// position. While navigating it drives the readouts and may emit at most
    /// one POI reveal plus an arrival event.
    pub fn on_position(&mut self, update: GeoUpdate) -> Vec<NavEvent> {
        let pos = match update {
            GeoUpdate::Fix(pos) => pos,
            GeoUpdate::Failed { error } => {
                log::warn!("position update failed: {}", error);
                return Vec::new();
            }
        };
        self.last_device_position = Some(pos);
        self.refresh_off_screen();
        if self.phase != NavPhase::Navigating {
            return Vec::new();
        }

        let sample = pos.lng_lat();
        let mut events = Vec::new();
        let remaining;
        let progress;
        let arrived_now;
        {
            let session = match self.session.as_mut() {
                Some(s) => s,
                None => return Vec::new(),
            };
            session.last_known_position = Some(pos);

            let coords = &session.route.coordinates;
            let idx = match nearest_vertex(coords, sample) {
                Some((idx, _)) => idx,
                None => return Vec::new(),
            };
            remaining = remaining_from(coords, idx);
            progress = progress_fraction(self.route_length_m, remaining);
            let dist_to_final = coords
                .last()
                .map(|&c| haversine_m(c, sample))
                .unwrap_or(f64::INFINITY);

            // Progress high-water mark first; the loop gate reads it so a
            // projection back onto the shared start vertex cannot undo it
            if progress > session.max_progress {
                session.max_progress = progress;
            }

            let reveal = session
                .route
                .reveal_points()
                .find(|h| {
                    !session.seen_poi_keys.contains(&h.key())
                        && haversine_m(LngLat::from_lat_lng(h.lat, h.lng), sample)
                            < POI_REVEAL_RADIUS_M
                })
                .cloned();
            if let Some(highlight) = reveal {
                session.seen_poi_keys.insert(highlight.key());
                log::info!("poi revealed: {}", highlight.name);
                events.push(NavEvent::PoiRevealed(highlight));
            }

            arrived_now = !session.arrived
                && arrival_reached(dist_to_final, session.is_loop, session.max_progress);
            if arrived_now {
                session.arrived = true;
            }
        }

        self.remaining_m = remaining;
        self.remaining_min = walk_minutes(remaining);
        self.progress = progress;
        if arrived_now {
            self.phase = NavPhase::Arrived;
            log::info!("arrival detected");
            events.push(NavEvent::Arrived);
        }
        events
    }

    // =========================================================================
    // VIEWPORT
    // =========================================================================

    pub fn set_viewport(&mut self, bounds: MapBounds) {
        self.viewport = Some(bounds);
        self.refresh_off_screen();
    }

    fn refresh_off_screen(&mut self) {
        self.off_screen = match (&self.viewport, &self.last_device_position) {
            (Some(bounds), Some(pos)) => !bounds.contains(pos.lat, pos.lng),
            _ => false,
        };
    }
}

/// Arrival predicate. Distance is strict; a loop additionally requires
/// enough of the route behind the walker.
fn arrival_reached(dist_to_final_m: f64, is_loop: bool, progress: f64) -> bool {
    dist_to_final_m < ARRIVAL_RADIUS_M && (!is_loop || progress >= LOOP_ARRIVAL_MIN_PROGRESS)
}

/// Whether the quick alternative is worth a switch control: it must exist
/// and differ meaningfully in both time and length. Area exploration keeps
/// its single mood-weighted route.
pub fn alternative_switchable(rec: &WalkRecommendation) -> bool {
    let quick = match &rec.quick {
        Some(q) => q,
        None => return false,
    };
    if rec.pattern == crate::types::outcome::Pattern::AreaExploration {
        return false;
    }
    let duration_delta =
        (quick.duration_seconds as i64 - rec.recommended.duration_seconds as i64).abs();
    let distance_delta = (quick.distance_meters - rec.recommended.distance_meters).abs();
    duration_delta > ALT_MIN_DURATION_DELTA_SECS && distance_delta > ALT_MIN_DISTANCE_DELTA_M
}

// =============================================================================
// TESTS
// =============================================================================
