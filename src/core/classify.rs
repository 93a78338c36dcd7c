//! Branch resolution: one backend payload → one conversation branch
//!
//! The backend answers every resolution call with a single loosely-shaped
//! payload. Disjoint marker fields identify the branch; they are checked in
//! a fixed priority order and the first match wins:
//!
//! 1. edge-case marker      → EdgeCase
//! 2. duration-prompt marker → DurationPrompt
//! 3. place-options marker  → PlaceOptions
//! 4. otherwise             → RouteResult

use serde::{Deserialize, Serialize};

use crate::types::outcome::{
    ConversationOutcome, DurationOption, Intent, Pattern, PlaceChoices, PlaceOption,
};
use crate::types::route::{RoutePlan, WalkRecommendation};
use crate::types::{WalkError, WalkResult};

/// Edge-case payload: the turn ends here with a retry suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeCasePayload {
    pub message: String,
    pub suggestion: Option<String>,
    pub theme_name: Option<String>,
}

/// The backend response as it arrives, before branch resolution.
///
/// Optional everywhere: which fields are populated is exactly what
/// `classify` discriminates on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMoodResponse {
    // Branch markers, in priority order
    pub edge_case: Option<EdgeCasePayload>,
    pub needs_duration: Option<bool>,
    pub place_options: Option<Vec<PlaceOption>>,

    // Duration-prompt extras
    pub duration_message: Option<String>,
    pub duration_options: Option<Vec<DurationOption>>,
    /// Server asks the client to resolve the duration itself, silently
    pub skip_duration: Option<bool>,
    /// Server-suggested duration for the silent resolution
    pub auto_duration: Option<u32>,

    // Place-options extras
    pub heading: Option<String>,
    pub fallback_message: Option<String>,
    pub sort_label: Option<String>,
    pub qualifier: Option<String>,

    // Shared
    pub intent: Option<Intent>,
    pub pattern: Option<Pattern>,

    // Route result
    pub route: Option<RoutePlan>,
    pub quick_route: Option<RoutePlan>,
    pub destination_name: Option<String>,
    pub destination_address: Option<String>,
    pub destination_photo: Option<String>,
    pub destination_rating: Option<f64>,
    pub is_loop: Option<bool>,
    pub default_is_fastest: Option<bool>,
    pub routes_are_similar: Option<bool>,
}

impl RawMoodResponse {
    pub fn is_edge_case(&self) -> bool {
        self.edge_case.is_some()
    }

    pub fn is_duration_prompt(&self) -> bool {
        !self.is_edge_case() && self.needs_duration == Some(true)
    }

    /// True when the duration prompt should never reach the user: the
    /// session resolves it with `auto_duration` or a random fallback
    pub fn wants_silent_duration(&self) -> bool {
        self.is_duration_prompt() && self.skip_duration == Some(true)
    }
}

/// Resolve a payload into exactly one conversation branch.
///
/// Total and mutually exclusive: every payload lands in one variant or
/// fails as `MalformedResponse` (route branch with unusable geometry).
pub fn classify(raw: RawMoodResponse) -> WalkResult<ConversationOutcome> {
    if let Some(edge) = raw.edge_case {
        return Ok(ConversationOutcome::EdgeCase {
            message: edge.message,
            suggestion: edge.suggestion,
            theme_name: edge.theme_name,
        });
    }

    let intent = raw.intent.unwrap_or(Intent::Discover);

    if raw.needs_duration == Some(true) {
        return Ok(ConversationOutcome::DurationPrompt {
            intent,
            message: raw
                .duration_message
                .unwrap_or_else(|| "How long do you want to walk?".to_string()),
            options: raw.duration_options.unwrap_or_else(default_duration_options),
        });
    }

    if let Some(options) = raw.place_options {
        return Ok(ConversationOutcome::PlaceOptions(PlaceChoices::seeded(
            intent,
            options,
            raw.heading
                .unwrap_or_else(|| "Which one did you mean?".to_string()),
            raw.fallback_message,
            raw.sort_label,
            raw.qualifier,
        )));
    }

    let route = raw
        .route
        .ok_or_else(|| WalkError::MalformedResponse("no route in payload".to_string()))?;
    if !route.is_navigable() {
        return Err(WalkError::MalformedResponse(
            "route has fewer than 2 coordinates".to_string(),
        ));
    }

    Ok(ConversationOutcome::RouteResult(WalkRecommendation {
        recommended: route,
        quick: raw.quick_route.filter(|q| q.is_navigable()),
        pattern: raw.pattern.unwrap_or(Pattern::AreaExploration),
        intent,
        destination_name: raw.destination_name,
        destination_address: raw.destination_address,
        destination_photo: raw.destination_photo,
        destination_rating: raw.destination_rating,
        is_loop: raw.is_loop.unwrap_or(false),
        default_is_fastest: raw.default_is_fastest.unwrap_or(false),
        routes_are_similar: raw.routes_are_similar.unwrap_or(false),
    }))
}

fn default_duration_options() -> Vec<DurationOption> {
    vec![
        DurationOption {
            label: "10–20 min".to_string(),
            minutes: 10,
        },
        DurationOption {
            label: "20–40 min".to_string(),
            minutes: 20,
        },
        DurationOption {
            label: "Surprise me".to_string(),
            minutes: 0,
        },
    ]
}

// =============================================================================
// TESTS
// =============================================================================
