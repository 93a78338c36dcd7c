//! Core logic for (re)Route
//!
//! - `classify` - backend payload → conversation branch
//! - `session` - the walk session state machine
//! - `tracker` - live navigation phases over a displayed route
//! - `geometry` - haversine, polyline projection, formatting
//! - `service` - async contracts to the mood/route backend
//! - `sampler` - position stream sources
//! - `search` - start-point search and service-area gate
//! - `api` - HTTP + WebSocket server

pub mod api;
pub mod classify;
pub mod geometry;
pub mod sampler;
pub mod search;
pub mod service;
pub mod session;
pub mod tracker;

pub use api::{create_router, run_server};
pub use classify::{classify, RawMoodResponse};
pub use sampler::{PositionSource, SimulatedSource};
pub use search::{in_service_area, validate_start_point, DebouncedSearch};
pub use service::{DemoService, MoodService, ResolveOptions, ScriptedService};
pub use session::WalkSession;
pub use tracker::{alternative_switchable, NavigationTracker};
