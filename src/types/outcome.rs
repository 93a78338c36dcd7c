//! Conversation model: mood queries and the single-active-variant outcome union
//!
//! One backend response resolves to exactly one `ConversationOutcome` variant.
//! Entering a new variant replaces the previous one wholesale, so contradictory
//! per-branch flags cannot coexist.

use serde::{Deserialize, Serialize};

use crate::types::geo::Position;
use crate::types::route::WalkRecommendation;
use crate::PLACE_OPTIONS_PAGE_SIZE;

/// Closed set of walk moods, used for labeling and color coding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Calm,
    Discover,
    Nature,
    Scenic,
    Lively,
    Exercise,
    Cafe,
    ThemedWalk,
    Quick,
}

impl Intent {
    pub fn label(&self) -> &'static str {
        match self {
            Intent::Calm => "Calm",
            Intent::Discover => "Discover",
            Intent::Nature => "Nature",
            Intent::Scenic => "Scenic",
            Intent::Lively => "Lively",
            Intent::Exercise => "Exercise",
            Intent::Cafe => "Café",
            Intent::ThemedWalk => "Themed walk",
            Intent::Quick => "Quick",
        }
    }

    /// ANSI color for terminal display
    pub fn color_code(&self) -> &'static str {
        match self {
            Intent::Calm => "\x1b[36m",       // Cyan
            Intent::Discover => "\x1b[35m",   // Magenta
            Intent::Nature => "\x1b[32m",     // Green
            Intent::Scenic => "\x1b[34m",     // Blue
            Intent::Lively => "\x1b[33m",     // Yellow
            Intent::Exercise => "\x1b[31m",   // Red
            Intent::Cafe => "\x1b[93m",       // Bright yellow
            Intent::ThemedWalk => "\x1b[95m", // Bright magenta
            Intent::Quick => "\x1b[37m",      // White
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Resolution strategy that produced a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    AreaExploration,
    MoodWithDuration,
    DestinationFixed,
}

impl Pattern {
    /// "Try another" only makes sense for the mood-weighted patterns;
    /// a destination-fixed route has nothing to reshuffle
    pub fn supports_reshuffle(&self) -> bool {
        matches!(self, Pattern::AreaExploration | Pattern::MoodWithDuration)
    }
}

/// One conversation turn: the user's mood text plus where they are
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodQuery {
    pub origin: Position,
    pub text: String,
    pub force_night_mode: bool,
}

impl MoodQuery {
    pub fn new(origin: Position, text: impl Into<String>) -> Self {
        Self {
            origin,
            text: text.into(),
            force_night_mode: false,
        }
    }
}

/// One choice in a duration prompt; `minutes == 0` means "pick automatically"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationOption {
    pub label: String,
    pub minutes: u32,
}

impl DurationOption {
    pub fn is_auto(&self) -> bool {
        self.minutes == 0
    }
}

/// A candidate destination offered for disambiguation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOption {
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    pub id: Option<String>,
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub primary_type: Option<String>,
    pub qualifier_verified: Option<bool>,
    pub qualifier_reason: Option<String>,
    pub qualifier_source: Option<String>,
}

impl PlaceOption {
    /// Identity for the load-more exclusion set: id, falling back to name
    pub fn identity(&self) -> String {
        self.id.clone().unwrap_or_else(|| self.name.clone())
    }
}

/// The place-disambiguation branch: a growing, never-replaced option list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceChoices {
    pub intent: Intent,
    pub options: Vec<PlaceOption>,
    /// How many options are currently displayed
    pub shown_count: usize,
    pub heading: String,
    pub fallback_message: Option<String>,
    pub sort_label: Option<String>,
    pub qualifier: Option<String>,
}

impl PlaceChoices {
    pub fn seeded(
        intent: Intent,
        options: Vec<PlaceOption>,
        heading: String,
        fallback_message: Option<String>,
        sort_label: Option<String>,
        qualifier: Option<String>,
    ) -> Self {
        let shown_count = options.len().min(PLACE_OPTIONS_PAGE_SIZE);
        Self {
            intent,
            options,
            shown_count,
            heading,
            fallback_message,
            sort_label,
            qualifier,
        }
    }

    /// Options currently on screen
    pub fn shown(&self) -> &[PlaceOption] {
        &self.options[..self.shown_count.min(self.options.len())]
    }

    /// Identities of everything already shown, forwarded as the
    /// load-more exclusion set
    pub fn shown_identities(&self) -> Vec<String> {
        self.shown().iter().map(|o| o.identity()).collect()
    }

    /// Append a page at the current length offset; never replaces
    pub fn append_page(&mut self, page: Vec<PlaceOption>) {
        self.options.extend(page);
        self.shown_count = self.options.len();
    }

    /// Index before which the "also nearby" divider goes: the first shown
    /// option that is not qualifier-verified, when a verified one precedes it.
    ///
    /// Assumes the backend sorts verified options first; the divider is
    /// computed, not enforced.
    pub fn also_nearby_divider(&self) -> Option<usize> {
        let shown = self.shown();
        shown.windows(2).position(|pair| {
            pair[0].qualifier_verified == Some(true) && pair[1].qualifier_verified != Some(true)
        }).map(|i| i + 1)
    }
}

/// The single active branch of one conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "branch", rename_all = "snake_case")]
pub enum ConversationOutcome {
    /// Terminal for the turn; offers retry or a canned "surprise me" resubmission
    EdgeCase {
        message: String,
        suggestion: Option<String>,
        theme_name: Option<String>,
    },
    /// Awaiting a duration choice
    DurationPrompt {
        intent: Intent,
        message: String,
        options: Vec<DurationOption>,
    },
    /// Awaiting a destination selection or a "load more" continuation
    PlaceOptions(PlaceChoices),
    /// The terminal, displayable result
    RouteResult(WalkRecommendation),
}

impl ConversationOutcome {
    pub fn branch_name(&self) -> &'static str {
        match self {
            ConversationOutcome::EdgeCase { .. } => "edge_case",
            ConversationOutcome::DurationPrompt { .. } => "duration_prompt",
            ConversationOutcome::PlaceOptions(_) => "place_options",
            ConversationOutcome::RouteResult(_) => "route_result",
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn place(name: &str, verified: Option<bool>) -> PlaceOption {
        PlaceOption {
            lat: 41.4,
            lng: 2.17,
            name: name.to_string(),
            id: None,
            rating: None,
            description: None,
            photo_url: None,
            primary_type: None,
            qualifier_verified: verified,
            qualifier_reason: None,
            qualifier_source: None,
        }
    }

    #[test]
    fn test_seeded_shows_at_most_page_size() {
        let options: Vec<_> = (0..8).map(|i| place(&format!("p{}", i), None)).collect();
        let choices =
            PlaceChoices::seeded(Intent::Cafe, options, "Pick one".into(), None, None, None);
        assert_eq!(choices.shown_count, 5);
        assert_eq!(choices.shown().len(), 5);
        assert_eq!(choices.options.len(), 8);
    }

    #[test]
    fn test_append_page_extends_and_shows() {
        let options: Vec<_> = (0..3).map(|i| place(&format!("p{}", i), None)).collect();
        let mut choices =
            PlaceChoices::seeded(Intent::Cafe, options, "Pick one".into(), None, None, None);
        assert_eq!(choices.shown_count, 3);

        choices.append_page(vec![place("p3", None), place("p4", None)]);
        assert_eq!(choices.options.len(), 5);
        assert_eq!(choices.shown_count, 5);
    }

    #[test]
    fn test_identity_falls_back_to_name() {
        let mut p = place("Café Central", None);
        assert_eq!(p.identity(), "Café Central");
        p.id = Some("place_42".into());
        assert_eq!(p.identity(), "place_42");
    }

    #[test]
    fn test_also_nearby_divider() {
        let options = vec![
            place("a", Some(true)),
            place("b", Some(true)),
            place("c", Some(false)),
            place("d", None),
        ];
        let choices =
            PlaceChoices::seeded(Intent::Cafe, options, "Pick".into(), None, None, None);
        assert_eq!(choices.also_nearby_divider(), Some(2));

        let all_verified = vec![place("a", Some(true)), place("b", Some(true))];
        let choices =
            PlaceChoices::seeded(Intent::Cafe, all_verified, "Pick".into(), None, None, None);
        assert_eq!(choices.also_nearby_divider(), None);
    }

    #[test]
    fn test_reshuffle_supported_patterns() {
        assert!(Pattern::AreaExploration.supports_reshuffle());
        assert!(Pattern::MoodWithDuration.supports_reshuffle());
        assert!(!Pattern::DestinationFixed.supports_reshuffle());
    }
}
