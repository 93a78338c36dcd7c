//! Custom start point search: service-area gate and debounced lookups
//!
//! Free-text search runs on a quiet-interval debounce. Every keystroke
//! cancels the pending lookup; a result is only accepted when it still
//! matches what is in the input box.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::service::{MoodService, PlaceHit};
use crate::types::geo::LngLat;
use crate::types::session::StartPoint;
use crate::types::{WalkError, WalkResult};
use crate::{
    SERVICE_AREA_MAX_LAT, SERVICE_AREA_MAX_LNG, SERVICE_AREA_MIN_LAT, SERVICE_AREA_MIN_LNG,
};

/// Hits returned per search
const RESULT_LIMIT: usize = 5;

/// The rectangle walks can start in
pub fn in_service_area(lat: f64, lng: f64) -> bool {
    (SERVICE_AREA_MIN_LAT..=SERVICE_AREA_MAX_LAT).contains(&lat)
        && (SERVICE_AREA_MIN_LNG..=SERVICE_AREA_MAX_LNG).contains(&lng)
}

/// Turn a search hit into a usable start point, or refuse it
pub fn validate_start_point(hit: &PlaceHit) -> WalkResult<StartPoint> {
    if !in_service_area(hit.lat, hit.lng) {
        log::info!("start point rejected, outside service area: {}", hit.name);
        return Err(WalkError::OutOfBounds);
    }
    Ok(StartPoint::Custom {
        coords: LngLat::from_lat_lng(hit.lat, hit.lng),
        name: hit.name.clone(),
    })
}

/// A completed lookup, tagged with the query that produced it
#[derive(Debug)]
pub struct SearchOutcome {
    pub query: String,
    pub result: WalkResult<Vec<PlaceHit>>,
}

/// Debounced free-text search over a `MoodService`
pub struct DebouncedSearch<S: MoodService + 'static> {
    service: Arc<S>,
    quiet: Duration,
    current: String,
    pending: Option<CancellationToken>,
    tx: mpsc::Sender<SearchOutcome>,
}

impl<S: MoodService + 'static> DebouncedSearch<S> {
    pub fn with_default_quiet(service: Arc<S>) -> (Self, mpsc::Receiver<SearchOutcome>) {
        Self::new(service, Duration::from_millis(crate::SEARCH_DEBOUNCE_MS))
    }

    pub fn new(service: Arc<S>, quiet: Duration) -> (Self, mpsc::Receiver<SearchOutcome>) {
        let (tx, rx) = mpsc::channel(8);
        (
            Self {
                service,
                quiet,
                current: String::new(),
                pending: None,
                tx,
            },
            rx,
        )
    }

    /// One keystroke: cancel the pending lookup and schedule a new one
    /// after the quiet interval. Blank input only cancels.
    pub fn input(&mut self, query: &str) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
        self.current = query.trim().to_string();
        if self.current.is_empty() {
            return;
        }

        let token = CancellationToken::new();
        self.pending = Some(token.clone());
        let service = self.service.clone();
        let tx = self.tx.clone();
        let quiet = self.quiet;
        let query = self.current.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(quiet) => {
                    let result = service.search_places(&query, RESULT_LIMIT).await;
                    let _ = tx.send(SearchOutcome { query, result }).await;
                }
            }
        });
    }

    /// Stale-result guard: only an outcome for the current input counts
    pub fn accepts(&self, outcome: &SearchOutcome) -> bool {
        outcome.query == self.current
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::service::DemoService;

    #[test]
    fn test_service_area_rectangle() {
        assert!(in_service_area(41.3874, 2.1686));
        assert!(!in_service_area(40.4168, -3.7038)); // Madrid
        assert!(!in_service_area(41.3874, 2.6));
    }

    #[test]
    fn test_validate_start_point() {
        let inside = PlaceHit {
            lat: 41.3888,
            lng: 2.1870,
            name: "Parc de la Ciutadella".into(),
        };
        match validate_start_point(&inside).unwrap() {
            StartPoint::Custom { name, .. } => assert_eq!(name, "Parc de la Ciutadella"),
            other => panic!("expected custom start, got {:?}", other),
        }

        let outside = PlaceHit {
            lat: 40.4168,
            lng: -3.7038,
            name: "Puerta del Sol".into(),
        };
        assert_eq!(validate_start_point(&outside).unwrap_err(), WalkError::OutOfBounds);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_typing_runs_one_lookup() {
        let (mut search, mut rx) =
            DebouncedSearch::new(Arc::new(DemoService::new()), Duration::from_millis(50));

        search.input("p");
        search.input("pa");
        search.input("parc");

        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.query, "parc");
        assert!(search.accepts(&outcome));
        let hits = outcome.result.unwrap();
        assert!(hits.iter().any(|h| h.name.contains("Parc")));

        // The earlier keystrokes never produced an outcome
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_outcome_is_rejected() {
        let (mut search, mut rx) =
            DebouncedSearch::new(Arc::new(DemoService::new()), Duration::from_millis(50));

        search.input("parc");
        let outcome = rx.recv().await.unwrap();
        assert!(search.accepts(&outcome));

        search.input("sagrada");
        assert!(!search.accepts(&outcome));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_input_only_cancels() {
        let (mut search, mut rx) =
            DebouncedSearch::new(Arc::new(DemoService::new()), Duration::from_millis(50));

        search.input("parc");
        search.input("   ");
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err());
    }
}
