//! Data types for (re)Route

pub mod error;
pub mod geo;
pub mod outcome;
pub mod route;
pub mod session;

pub use error::{WalkError, WalkResult};
pub use geo::{GeoError, GeoUpdate, LngLat, MapBounds, Position};
pub use outcome::{
    ConversationOutcome, DurationOption, Intent, MoodQuery, Pattern, PlaceChoices, PlaceOption,
};
pub use route::{Highlight, RoutePlan, WalkRecommendation};
pub use session::{NavEvent, NavPhase, NavSnapshot, NavigationSession, StartPoint};
