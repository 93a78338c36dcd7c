//! Asynchronous service contracts for mood resolution and place search
//!
//! The backend that interprets mood text and generates routes is an external
//! collaborator. The session machine only depends on these traits; tests
//! inject scripted responses and the demo binary uses `DemoService`.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::core::classify::RawMoodResponse;
use crate::core::geometry::{offset_m, path_length_m};
use crate::types::geo::{LngLat, Position};
use crate::types::outcome::{DurationOption, Intent, Pattern, PlaceOption};
use crate::types::route::{Highlight, RoutePlan, HIGHLIGHT_KIND_DESTINATION};
use crate::types::{WalkError, WalkResult};
use crate::WALKING_PACE_M_PER_MIN;

/// Per-call options forwarded to the backend
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub force_night_mode: bool,
    /// Cancelled when the caller abandons the request (timeout or re-query);
    /// implementations may observe it to stop work early
    pub cancel: CancellationToken,
}

/// Destination metadata carried alongside a fixed-destination resolution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DestinationMeta {
    pub name: String,
    pub address: Option<String>,
    pub place_type: Option<String>,
}

/// A start-point search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceHit {
    pub lat: f64,
    pub lng: f64,
    pub name: String,
}

/// The three resolution calls plus place search
#[async_trait]
pub trait MoodService: Send + Sync {
    /// Single entry point for a mood query; the response variant is
    /// resolved by `classify`
    async fn resolve_mood(
        &self,
        origin: &Position,
        text: &str,
        opts: &ResolveOptions,
    ) -> WalkResult<RawMoodResponse>;

    /// Re-resolve the same mood text with an explicit duration
    async fn resolve_with_duration(
        &self,
        origin: &Position,
        text: &str,
        minutes: u32,
        opts: &ResolveOptions,
    ) -> WalkResult<RawMoodResponse>;

    /// Resolve toward a fixed destination, bypassing intent-based search
    async fn resolve_with_destination(
        &self,
        origin: &Position,
        destination: LngLat,
        intent: Intent,
        meta: &DestinationMeta,
        opts: &ResolveOptions,
    ) -> WalkResult<RawMoodResponse>;

    /// Next page of place options, excluding identities already shown
    async fn more_place_options(
        &self,
        origin: &Position,
        text: &str,
        exclude: &HashSet<String>,
    ) -> WalkResult<Vec<PlaceOption>>;

    /// Free-text place search (custom start points)
    async fn search_places(&self, query: &str, limit: usize) -> WalkResult<Vec<PlaceHit>>;
}

// =============================================================================
// SCRIPTED SERVICE (tests)
// =============================================================================

/// Pops canned responses in order, regardless of which call arrives.
/// Records load-more exclusion sets so tests can assert they were forwarded.
#[derive(Default)]
pub struct ScriptedService {
    responses: Mutex<VecDeque<WalkResult<RawMoodResponse>>>,
    pages: Mutex<VecDeque<Vec<PlaceOption>>>,
    pub recorded_exclusions: Mutex<Vec<HashSet<String>>>,
    pub recorded_durations: Mutex<Vec<u32>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: WalkResult<RawMoodResponse>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn push_page(&self, page: Vec<PlaceOption>) {
        self.pages.lock().unwrap().push_back(page);
    }

    fn pop_response(&self) -> WalkResult<RawMoodResponse> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(WalkError::NetworkFailure(
                    "script exhausted".to_string(),
                ))
            })
    }
}

#[async_trait]
impl MoodService for ScriptedService {
    async fn resolve_mood(
        &self,
        _origin: &Position,
        _text: &str,
        _opts: &ResolveOptions,
    ) -> WalkResult<RawMoodResponse> {
        self.pop_response()
    }

    async fn resolve_with_duration(
        &self,
        _origin: &Position,
        _text: &str,
        minutes: u32,
        _opts: &ResolveOptions,
    ) -> WalkResult<RawMoodResponse> {
        self.recorded_durations.lock().unwrap().push(minutes);
        self.pop_response()
    }

    async fn resolve_with_destination(
        &self,
        _origin: &Position,
        _destination: LngLat,
        _intent: Intent,
        _meta: &DestinationMeta,
        _opts: &ResolveOptions,
    ) -> WalkResult<RawMoodResponse> {
        self.pop_response()
    }

    async fn more_place_options(
        &self,
        _origin: &Position,
        _text: &str,
        exclude: &HashSet<String>,
    ) -> WalkResult<Vec<PlaceOption>> {
        self.recorded_exclusions
            .lock()
            .unwrap()
            .push(exclude.clone());
        Ok(self.pages.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn search_places(&self, _query: &str, _limit: usize) -> WalkResult<Vec<PlaceHit>> {
        Ok(vec![])
    }
}

// =============================================================================
// DEMO SERVICE (CLI + server)
// =============================================================================

/// Deterministic keyword-driven stand-in for the real backend.
///
/// "coffee"/"quick" asks for a duration, "museum"/"somewhere" offers places,
/// near-empty text hits the edge case, anything else gets a concrete route.
#[derive(Debug, Default)]
pub struct DemoService;

impl DemoService {
    pub fn new() -> Self {
        Self
    }

    fn route_near(origin: LngLat, legs: &[(f64, f64)], summary: &str) -> RoutePlan {
        let mut coordinates = vec![origin];
        let mut cursor = origin;
        for (north, east) in legs {
            cursor = offset_m(cursor, *north, *east);
            coordinates.push(cursor);
        }
        let distance_meters = path_length_m(&coordinates);
        let duration_seconds = (distance_meters / WALKING_PACE_M_PER_MIN * 60.0) as u32;
        RoutePlan {
            coordinates,
            duration_seconds,
            distance_meters,
            summary: summary.to_string(),
            highlights: vec![],
            pois: vec![],
        }
    }

    fn demo_places() -> Vec<PlaceOption> {
        let names = [
            ("Museu Picasso", Some(true)),
            ("MACBA", Some(true)),
            ("Museu Marítim", Some(true)),
            ("CosmoCaixa", None),
            ("Museu Blau", None),
            ("Fundació Miró", None),
            ("MNAC", None),
            ("Museu Egipci", None),
        ];
        names
            .iter()
            .enumerate()
            .map(|(i, (name, verified))| PlaceOption {
                lat: 41.38 + i as f64 * 0.004,
                lng: 2.17 + i as f64 * 0.003,
                name: name.to_string(),
                id: Some(format!("demo_place_{}", i)),
                rating: Some(4.0 + (i % 5) as f64 * 0.2),
                description: None,
                photo_url: None,
                primary_type: Some("museum".to_string()),
                qualifier_verified: *verified,
                qualifier_reason: None,
                qualifier_source: None,
            })
            .collect()
    }
}

#[async_trait]
impl MoodService for DemoService {
    async fn resolve_mood(
        &self,
        origin: &Position,
        text: &str,
        _opts: &ResolveOptions,
    ) -> WalkResult<RawMoodResponse> {
        let lower = text.to_lowercase();

        if text.trim().len() < 3 {
            return Ok(RawMoodResponse {
                edge_case: Some(crate::core::classify::EdgeCasePayload {
                    message: "I need a bit more to go on.".to_string(),
                    suggestion: Some("surprise me with a calm walk".to_string()),
                    theme_name: None,
                }),
                ..Default::default()
            });
        }

        if lower.contains("coffee") || lower.contains("quick") {
            return Ok(RawMoodResponse {
                needs_duration: Some(true),
                intent: Some(Intent::Quick),
                duration_message: Some("How much time do you have?".to_string()),
                duration_options: Some(vec![
                    DurationOption {
                        label: "10–20 min".to_string(),
                        minutes: 10,
                    },
                    DurationOption {
                        label: "Surprise me".to_string(),
                        minutes: 0,
                    },
                ]),
                ..Default::default()
            });
        }

        if lower.contains("museum") || lower.contains("somewhere") {
            return Ok(RawMoodResponse {
                place_options: Some(Self::demo_places().into_iter().take(5).collect()),
                intent: Some(Intent::Discover),
                heading: Some("A few museums nearby".to_string()),
                qualifier: lower.contains("modern").then(|| "modern".to_string()),
                ..Default::default()
            });
        }

        // Concrete route: a small loop through the neighborhood
        let start = origin.lng_lat();
        let recommended = Self::route_near(
            start,
            &[
                (250.0, 0.0),
                (250.0, 300.0),
                (0.0, 400.0),
                (-250.0, 300.0),
                (-125.0, -500.0),
                (-125.0, -500.0),
            ],
            "A calm loop through the old town",
        );
        let quick = Self::route_near(
            start,
            &[(400.0, 0.0), (0.0, 500.0), (-400.0, -500.0)],
            "Straight there and back",
        );
        let mut recommended = recommended;
        recommended.highlights = vec![Highlight {
            lat: offset_m(start, 500.0, 300.0).lat(),
            lng: offset_m(start, 500.0, 300.0).lng(),
            name: "Plaça del Sol".to_string(),
            kind: "poi".to_string(),
            description: Some("Quiet square with a morning market".to_string()),
            photo_url: None,
        }];

        Ok(RawMoodResponse {
            route: Some(recommended),
            quick_route: Some(quick),
            intent: Some(if lower.contains("beach") {
                Intent::Calm
            } else {
                Intent::Discover
            }),
            pattern: Some(Pattern::AreaExploration),
            is_loop: Some(true),
            ..Default::default()
        })
    }

    async fn resolve_with_duration(
        &self,
        origin: &Position,
        _text: &str,
        minutes: u32,
        _opts: &ResolveOptions,
    ) -> WalkResult<RawMoodResponse> {
        let start = origin.lng_lat();
        let leg = (minutes.max(5) as f64 * WALKING_PACE_M_PER_MIN) / 4.0;
        let route = Self::route_near(
            start,
            &[(leg, 0.0), (0.0, leg), (-leg, 0.0), (0.0, -leg)],
            "A timed loop from right here",
        );
        Ok(RawMoodResponse {
            route: Some(route),
            intent: Some(Intent::Quick),
            pattern: Some(Pattern::MoodWithDuration),
            is_loop: Some(true),
            ..Default::default()
        })
    }

    async fn resolve_with_destination(
        &self,
        origin: &Position,
        destination: LngLat,
        intent: Intent,
        meta: &DestinationMeta,
        _opts: &ResolveOptions,
    ) -> WalkResult<RawMoodResponse> {
        let start = origin.lng_lat();
        let mid = LngLat(
            (start.lng() + destination.lng()) / 2.0,
            (start.lat() + destination.lat()) / 2.0,
        );
        let coordinates = vec![start, mid, destination];
        let distance_meters = path_length_m(&coordinates);
        let route = RoutePlan {
            coordinates,
            duration_seconds: (distance_meters / WALKING_PACE_M_PER_MIN * 60.0) as u32,
            distance_meters,
            summary: format!("Straight to {}", meta.name),
            highlights: vec![Highlight {
                lat: destination.lat(),
                lng: destination.lng(),
                name: meta.name.clone(),
                kind: HIGHLIGHT_KIND_DESTINATION.to_string(),
                description: None,
                photo_url: None,
            }],
            pois: vec![],
        };
        Ok(RawMoodResponse {
            route: Some(route),
            intent: Some(intent),
            pattern: Some(Pattern::DestinationFixed),
            destination_name: Some(meta.name.clone()),
            destination_address: meta.address.clone(),
            is_loop: Some(false),
            ..Default::default()
        })
    }

    async fn more_place_options(
        &self,
        _origin: &Position,
        _text: &str,
        exclude: &HashSet<String>,
    ) -> WalkResult<Vec<PlaceOption>> {
        Ok(Self::demo_places()
            .into_iter()
            .filter(|p| !exclude.contains(&p.identity()))
            .take(crate::PLACE_OPTIONS_PAGE_SIZE)
            .collect())
    }

    async fn search_places(&self, query: &str, limit: usize) -> WalkResult<Vec<PlaceHit>> {
        let lower = query.to_lowercase();
        let all = [
            ("Plaça de Catalunya", 41.3870, 2.1701),
            ("Parc de la Ciutadella", 41.3888, 2.1870),
            ("Barceloneta Beach", 41.3784, 2.1925),
            ("Sagrada Família", 41.4036, 2.1744),
            ("Park Güell", 41.4145, 2.1527),
        ];
        Ok(all
            .iter()
            .filter(|(name, _, _)| name.to_lowercase().contains(&lower))
            .take(limit)
            .map(|(name, lat, lng)| PlaceHit {
                lat: *lat,
                lng: *lng,
                name: name.to_string(),
            })
            .collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Position {
        Position::new(41.3874, 2.1686)
    }

    #[tokio::test]
    async fn test_demo_route_is_navigable() {
        let service = DemoService::new();
        let raw = service
            .resolve_mood(&origin(), "calm walk by the beach", &ResolveOptions::default())
            .await
            .unwrap();
        let route = raw.route.unwrap();
        assert!(route.is_navigable());
        assert!(route.distance_meters > 500.0);
    }

    #[tokio::test]
    async fn test_demo_more_places_honors_exclusions() {
        let service = DemoService::new();
        let mut exclude = HashSet::new();
        exclude.insert("demo_place_0".to_string());
        exclude.insert("demo_place_1".to_string());
        let page = service
            .more_place_options(&origin(), "museum", &exclude)
            .await
            .unwrap();
        assert!(page.iter().all(|p| !exclude.contains(&p.identity())));
    }

    #[tokio::test]
    async fn test_scripted_exhaustion_is_network_failure() {
        let service = ScriptedService::new();
        let err = service
            .resolve_mood(&origin(), "anything", &ResolveOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WalkError::NetworkFailure(_)));
    }
}
