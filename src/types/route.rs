//! Route plans, highlights, and the displayable recommendation

use serde::{Deserialize, Serialize};

use crate::core::geometry::{format_distance, walk_minutes};
use crate::types::geo::LngLat;
use crate::types::outcome::{Intent, Pattern};

/// Marker kind for the route's terminal highlight
pub const HIGHLIGHT_KIND_DESTINATION: &str = "destination";

/// A point of interest along or at the end of a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    /// "destination" marks the terminal highlight; anything else is generic
    pub kind: String,
    pub description: Option<String>,
    pub photo_url: Option<String>,
}

impl Highlight {
    pub fn is_destination(&self) -> bool {
        self.kind == HIGHLIGHT_KIND_DESTINATION
    }

    /// Stable identity for the per-session seen set
    pub fn key(&self) -> String {
        format!("{}:{:.5}:{:.5}", self.name, self.lat, self.lng)
    }
}

/// One generated route. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    /// Ordered polyline, longitude-first pairs
    pub coordinates: Vec<LngLat>,
    pub duration_seconds: u32,
    pub distance_meters: f64,
    pub summary: String,
    pub highlights: Vec<Highlight>,
    pub pois: Vec<Highlight>,
}

impl RoutePlan {
    /// Navigation and formatting require at least two points
    pub fn is_navigable(&self) -> bool {
        self.coordinates.len() >= 2
    }

    pub fn start(&self) -> Option<LngLat> {
        self.coordinates.first().copied()
    }

    pub fn end(&self) -> Option<LngLat> {
        self.coordinates.last().copied()
    }

    /// Highlights plus POIs, in reveal-check order
    pub fn reveal_points(&self) -> impl Iterator<Item = &Highlight> {
        self.highlights.iter().chain(self.pois.iter())
    }

    /// The "destination"-typed highlight, when the route carries one
    pub fn destination_highlight(&self) -> Option<&Highlight> {
        self.highlights.iter().find(|h| h.is_destination())
    }

    pub fn distance_label(&self) -> String {
        if !self.is_navigable() {
            return "—".to_string();
        }
        format_distance(self.distance_meters)
    }

    pub fn duration_label(&self) -> String {
        if !self.is_navigable() {
            return "—".to_string();
        }
        format!("{} min", walk_minutes(self.distance_meters))
    }
}

/// The terminal, displayable result of a conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkRecommendation {
    pub recommended: RoutePlan,
    /// Fastest alternative, when the backend produced one
    pub quick: Option<RoutePlan>,
    pub pattern: Pattern,
    pub intent: Intent,
    pub destination_name: Option<String>,
    pub destination_address: Option<String>,
    pub destination_photo: Option<String>,
    pub destination_rating: Option<f64>,
    pub is_loop: bool,
    pub default_is_fastest: bool,
    pub routes_are_similar: bool,
}

impl WalkRecommendation {
    /// Display name for the destination: explicit metadata first, then the
    /// route's "destination"-typed highlight
    pub fn display_destination_name(&self) -> Option<String> {
        self.destination_name.clone().or_else(|| {
            self.recommended
                .destination_highlight()
                .map(|h| h.name.clone())
        })
    }

    pub fn display_destination_photo(&self) -> Option<String> {
        self.destination_photo.clone().or_else(|| {
            self.recommended
                .destination_highlight()
                .and_then(|h| h.photo_url.clone())
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
