//! Route session state machine: one mood query's lifecycle
//!
//! submission → branch resolution → display → optional re-query → dismissal.
//! Every resolution call races a wall-clock deadline; an abandoned call is
//! cancelled through its token and a stale result is discarded by generation.
//! Outcome transitions are atomic: a failure leaves the previous state intact
//! and sets a user-visible message.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio_util::sync::CancellationToken;

use crate::core::classify::classify;
use crate::core::service::{DestinationMeta, MoodService, ResolveOptions};
use crate::types::geo::LngLat;
use crate::types::outcome::{ConversationOutcome, Intent, MoodQuery, Pattern, PlaceOption};
use crate::types::route::WalkRecommendation;
use crate::types::{WalkError, WalkResult};
use crate::{AUTO_DURATION_CHOICES, RESOLVE_TIMEOUT_SECS};

/// Owns the conversation for one walk query at a time
pub struct WalkSession<S: MoodService> {
    service: Arc<S>,
    outcome: Option<ConversationOutcome>,
    last_query: Option<MoodQuery>,
    /// Duration used for the current mood-with-duration result, kept for
    /// "try another"
    last_duration: Option<u32>,
    message: Option<String>,
    /// Bumped per request; results from older generations are discarded
    generation: u64,
    in_flight: Option<CancellationToken>,
    timeout: Duration,
    busy: bool,
}

impl<S: MoodService> WalkSession<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self::with_timeout(service, Duration::from_secs(RESOLVE_TIMEOUT_SECS))
    }

    pub fn with_timeout(service: Arc<S>, timeout: Duration) -> Self {
        Self {
            service,
            outcome: None,
            last_query: None,
            last_duration: None,
            message: None,
            generation: 0,
            in_flight: None,
            timeout,
            busy: false,
        }
    }

    // =========================================================================
    // READ SURFACE
    // =========================================================================

    pub fn outcome(&self) -> Option<&ConversationOutcome> {
        self.outcome.as_ref()
    }

    /// Last user-visible failure/advisory message, if any
    pub fn last_message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn last_query(&self) -> Option<&MoodQuery> {
        self.last_query.as_ref()
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Submit a new mood query and resolve it into one branch
    pub async fn submit(&mut self, query: MoodQuery) -> WalkResult<()> {
        log::info!("mood submitted: {:?}", query.text);
        let opts = self.begin(query.force_night_mode);
        let gen = self.generation;

        let result = self
            .with_deadline(
                self.service.resolve_mood(&query.origin, &query.text, &opts),
                &opts.cancel,
            )
            .await;
        self.finish();

        if gen != self.generation {
            log::debug!("discarding stale mood resolution (gen {})", gen);
            return Ok(());
        }

        let raw = match result {
            Ok(raw) => raw,
            Err(e) => return self.fail(e),
        };

        // A silent duration prompt never reaches the user: resolve it
        // immediately with the suggested or a random duration
        if raw.wants_silent_duration() {
            let minutes = raw.auto_duration.unwrap_or_else(random_duration);
            log::debug!("silent duration prompt, resolving with {} min", minutes);
            self.last_query = Some(query.clone());
            return self.resolve_duration(&query, minutes).await;
        }

        let outcome = match classify(raw) {
            Ok(outcome) => outcome,
            Err(e) => return self.fail(e),
        };
        log::info!("resolved branch: {}", outcome.branch_name());
        self.last_query = Some(query);
        self.last_duration = None;
        self.apply(outcome);
        Ok(())
    }

    /// Duration choice from the prompt; `minutes == 0` picks automatically.
    /// The prompt clears optimistically, before the network call completes.
    pub async fn pick_duration(&mut self, minutes: u32) -> WalkResult<()> {
        let query = match self.last_query.clone() {
            Some(q) => q,
            None => {
                return Err(WalkError::RefusedTransition(
                    "no walk query to refine".to_string(),
                ))
            }
        };
        self.outcome = None;
        let minutes = if minutes == 0 {
            random_duration()
        } else {
            minutes
        };
        self.resolve_duration(&query, minutes).await
    }

    async fn resolve_duration(&mut self, query: &MoodQuery, minutes: u32) -> WalkResult<()> {
        let opts = self.begin(query.force_night_mode);
        let gen = self.generation;

        let result = self
            .with_deadline(
                self.service
                    .resolve_with_duration(&query.origin, &query.text, minutes, &opts),
                &opts.cancel,
            )
            .await;
        self.finish();

        if gen != self.generation {
            log::debug!("discarding stale duration resolution (gen {})", gen);
            return Ok(());
        }

        let outcome = match result.and_then(classify) {
            Ok(outcome) => outcome,
            Err(e) => return self.fail(e),
        };
        self.last_duration = Some(minutes);
        self.apply(outcome);
        Ok(())
    }

    /// Resolve toward a chosen place as a fixed destination
    pub async fn pick_place(&mut self, option: PlaceOption) -> WalkResult<()> {
        let query = match self.last_query.clone() {
            Some(q) => q,
            None => {
                return Err(WalkError::RefusedTransition(
                    "no walk query to refine".to_string(),
                ))
            }
        };
        let intent = match &self.outcome {
            Some(ConversationOutcome::PlaceOptions(pc)) => pc.intent,
            _ => Intent::Discover,
        };
        let meta = DestinationMeta {
            name: option.name.clone(),
            address: None,
            place_type: option.primary_type.clone(),
        };
        let destination = LngLat::from_lat_lng(option.lat, option.lng);

        let opts = self.begin(query.force_night_mode);
        let gen = self.generation;
        let result = self
            .with_deadline(
                self.service
                    .resolve_with_destination(&query.origin, destination, intent, &meta, &opts),
                &opts.cancel,
            )
            .await;
        self.finish();

        if gen != self.generation {
            log::debug!("discarding stale destination resolution (gen {})", gen);
            return Ok(());
        }

        let mut outcome = match result.and_then(classify) {
            Ok(outcome) => outcome,
            Err(e) => return self.fail(e),
        };
        if let ConversationOutcome::RouteResult(rec) = &mut outcome {
            merge_destination(rec, &option);
        }
        self.last_duration = None;
        self.apply(outcome);
        Ok(())
    }

    /// Fetch the next page of place options, excluding what is shown.
    /// No-op unless the place-options branch is active.
    pub async fn load_more_places(&mut self) -> WalkResult<()> {
        let query = match self.last_query.clone() {
            Some(q) => q,
            None => return Ok(()),
        };
        let exclude: HashSet<String> = match &self.outcome {
            Some(ConversationOutcome::PlaceOptions(pc)) => {
                pc.shown_identities().into_iter().collect()
            }
            _ => return Ok(()),
        };

        let opts = self.begin(query.force_night_mode);
        let gen = self.generation;
        let result = self
            .with_deadline(
                self.service
                    .more_place_options(&query.origin, &query.text, &exclude),
                &opts.cancel,
            )
            .await;
        self.finish();

        if gen != self.generation {
            return Ok(());
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => return self.fail(e),
        };
        if let Some(ConversationOutcome::PlaceOptions(pc)) = &mut self.outcome {
            log::debug!("appending {} place options", page.len());
            pc.append_page(page);
        }
        Ok(())
    }

    /// Re-issue the original query for a different route. Only meaningful
    /// for the mood-weighted patterns; a no-op otherwise.
    pub async fn try_another(&mut self) -> WalkResult<()> {
        let pattern = match &self.outcome {
            Some(ConversationOutcome::RouteResult(rec)) => rec.pattern,
            _ => return Ok(()),
        };
        if !pattern.supports_reshuffle() {
            log::debug!("try-another ignored for {:?}", pattern);
            return Ok(());
        }
        let query = match self.last_query.clone() {
            Some(q) => q,
            None => return Ok(()),
        };
        match pattern {
            Pattern::MoodWithDuration => {
                let minutes = self.last_duration.unwrap_or_else(random_duration);
                self.resolve_duration(&query, minutes).await
            }
            _ => self.submit(query).await,
        }
    }

    /// Discard the outcome and all per-turn state; ready for a new query
    pub fn clear(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        self.generation += 1;
        self.outcome = None;
        self.message = None;
        self.last_query = None;
        self.last_duration = None;
        self.busy = false;
        log::debug!("session cleared");
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn begin(&mut self, force_night_mode: bool) -> ResolveOptions {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        self.generation += 1;
        self.busy = true;
        let cancel = CancellationToken::new();
        self.in_flight = Some(cancel.clone());
        ResolveOptions {
            force_night_mode,
            cancel,
        }
    }

    fn finish(&mut self) {
        self.busy = false;
        self.in_flight = None;
    }

    async fn with_deadline<T>(
        &self,
        fut: impl std::future::Future<Output = WalkResult<T>>,
        cancel: &CancellationToken,
    ) -> WalkResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                Err(WalkError::Timeout)
            }
        }
    }

    fn apply(&mut self, outcome: ConversationOutcome) {
        self.message = None;
        self.outcome = Some(outcome);
    }

    fn fail(&mut self, e: WalkError) -> WalkResult<()> {
        log::warn!("resolution failed: {}", e);
        self.message = Some(e.user_message());
        Err(e)
    }
}

/// Uniform pick from the fallback duration choices
fn random_duration() -> u32 {
    AUTO_DURATION_CHOICES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(20)
}

/// Fill destination metadata from the picked option. A server-supplied
/// "destination"-typed highlight is more specific and wins for the name,
/// but the option's own photo still takes priority when present.
fn merge_destination(rec: &mut WalkRecommendation, option: &PlaceOption) {
    match rec.recommended.destination_highlight().cloned() {
        Some(highlight) => {
            if rec.destination_name.is_none() {
                rec.destination_name = Some(highlight.name);
            }
            rec.destination_photo = option
                .photo_url
                .clone()
                .or_else(|| rec.destination_photo.take())
                .or(highlight.photo_url);
        }
        None => {
            if rec.destination_name.is_none() {
                rec.destination_name = Some(option.name.clone());
            }
            if rec.destination_photo.is_none() {
                rec.destination_photo = option.photo_url.clone();
            }
        }
    }
    if rec.destination_rating.is_none() {
        rec.destination_rating = option.rating;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classify::RawMoodResponse;
    use crate::core::service::ScriptedService;
    use crate::types::geo::{LngLat, Position};
    use crate::types::route::RoutePlan;
    use async_trait::async_trait;

    fn origin_query(text: &str) -> MoodQuery {
        MoodQuery::new(Position::new(41.3874, 2.1686), text)
    }

    fn route_raw() -> RawMoodResponse {
        RawMoodResponse {
            route: Some(RoutePlan {
                coordinates: vec![LngLat(2.17, 41.38), LngLat(2.18, 41.39)],
                duration_seconds: 900,
                distance_meters: 1200.0,
                summary: "test".into(),
                highlights: vec![],
                pois: vec![],
            }),
            pattern: Some(Pattern::AreaExploration),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_submit_resolves_route() {
        let service = Arc::new(ScriptedService::new());
        service.push_response(Ok(route_raw()));
        let mut session = WalkSession::new(service);

        session.submit(origin_query("calm walk by the beach")).await.unwrap();
        assert_eq!(session.outcome().unwrap().branch_name(), "route_result");
        assert!(session.last_message().is_none());
    }

    #[tokio::test]
    async fn test_silent_duration_uses_auto_value() {
        let service = Arc::new(ScriptedService::new());
        service.push_response(Ok(RawMoodResponse {
            needs_duration: Some(true),
            skip_duration: Some(true),
            auto_duration: Some(20),
            ..Default::default()
        }));
        service.push_response(Ok(route_raw()));
        let mut session = WalkSession::new(service.clone());

        session.submit(origin_query("short stroll")).await.unwrap();
        // The prompt never surfaced; the turn resolved straight to a route
        assert_eq!(session.outcome().unwrap().branch_name(), "route_result");
        assert_eq!(*service.recorded_durations.lock().unwrap(), vec![20]);
    }

    #[tokio::test]
    async fn test_silent_duration_random_fallback() {
        let service = Arc::new(ScriptedService::new());
        service.push_response(Ok(RawMoodResponse {
            needs_duration: Some(true),
            skip_duration: Some(true),
            ..Default::default()
        }));
        service.push_response(Ok(route_raw()));
        let mut session = WalkSession::new(service.clone());

        session.submit(origin_query("short stroll")).await.unwrap();
        let recorded = service.recorded_durations.lock().unwrap();
        assert!(AUTO_DURATION_CHOICES.contains(&recorded[0]));
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_outcome() {
        let service = Arc::new(ScriptedService::new());
        service.push_response(Ok(route_raw()));
        service.push_response(Err(WalkError::NetworkFailure("refused".into())));
        let mut session = WalkSession::new(service);

        session.submit(origin_query("first")).await.unwrap();
        let err = session.submit(origin_query("second")).await.unwrap_err();
        assert!(matches!(err, WalkError::NetworkFailure(_)));
        // Pre-call state survives; only the message changed
        assert_eq!(session.outcome().unwrap().branch_name(), "route_result");
        assert!(session.last_message().is_some());
    }

    /// Service that never answers; used to force the deadline
    struct HangingService;

    #[async_trait]
    impl MoodService for HangingService {
        async fn resolve_mood(
            &self,
            _origin: &Position,
            _text: &str,
            _opts: &ResolveOptions,
        ) -> WalkResult<RawMoodResponse> {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            unreachable!("deadline should fire first")
        }

        async fn resolve_with_duration(
            &self,
            _origin: &Position,
            _text: &str,
            _minutes: u32,
            _opts: &ResolveOptions,
        ) -> WalkResult<RawMoodResponse> {
            unreachable!()
        }

        async fn resolve_with_destination(
            &self,
            _origin: &Position,
            _destination: LngLat,
            _intent: Intent,
            _meta: &DestinationMeta,
            _opts: &ResolveOptions,
        ) -> WalkResult<RawMoodResponse> {
            unreachable!()
        }

        async fn more_place_options(
            &self,
            _origin: &Position,
            _text: &str,
            _exclude: &HashSet<String>,
        ) -> WalkResult<Vec<PlaceOption>> {
            unreachable!()
        }

        async fn search_places(
            &self,
            _query: &str,
            _limit: usize,
        ) -> WalkResult<Vec<crate::core::service::PlaceHit>> {
            unreachable!()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_surfaces_distinct_error() {
        let mut session = WalkSession::with_timeout(
            Arc::new(HangingService),
            std::time::Duration::from_millis(50),
        );
        let err = session.submit(origin_query("anything")).await.unwrap_err();
        assert_eq!(err, WalkError::Timeout);
        // No partial state committed
        assert!(session.outcome().is_none());
        assert!(session.last_message().unwrap().contains("too long"));
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let service = Arc::new(ScriptedService::new());
        service.push_response(Ok(route_raw()));
        let mut session = WalkSession::new(service);

        session.submit(origin_query("walk")).await.unwrap();
        session.clear();
        assert!(session.outcome().is_none());
        assert!(session.last_query().is_none());
        assert!(session.last_message().is_none());
    }

    #[tokio::test]
    async fn test_try_another_noop_for_destination_fixed() {
        let service = Arc::new(ScriptedService::new());
        let mut raw = route_raw();
        raw.pattern = Some(Pattern::DestinationFixed);
        service.push_response(Ok(raw));
        let mut session = WalkSession::new(service);

        session.submit(origin_query("to the park")).await.unwrap();
        // No scripted response left: a real re-query would fail loudly
        session.try_another().await.unwrap();
        assert_eq!(session.outcome().unwrap().branch_name(), "route_result");
    }

    #[tokio::test]
    async fn test_try_another_reuses_original_duration() {
        let service = Arc::new(ScriptedService::new());
        service.push_response(Ok(RawMoodResponse {
            needs_duration: Some(true),
            ..Default::default()
        }));
        let mut duration_route = route_raw();
        duration_route.pattern = Some(Pattern::MoodWithDuration);
        service.push_response(Ok(duration_route.clone()));
        service.push_response(Ok(duration_route));
        let mut session = WalkSession::new(service.clone());

        session.submit(origin_query("quick break")).await.unwrap();
        session.pick_duration(10).await.unwrap();
        session.try_another().await.unwrap();
        assert_eq!(*service.recorded_durations.lock().unwrap(), vec![10, 10]);
    }

    #[tokio::test]
    async fn test_pick_duration_zero_draws_from_choices() {
        let service = Arc::new(ScriptedService::new());
        service.push_response(Ok(RawMoodResponse {
            needs_duration: Some(true),
            ..Default::default()
        }));
        service.push_response(Ok(route_raw()));
        let mut session = WalkSession::new(service.clone());

        session.submit(origin_query("quick coffee break")).await.unwrap();
        session.pick_duration(0).await.unwrap();
        let recorded = service.recorded_durations.lock().unwrap();
        assert!(AUTO_DURATION_CHOICES.contains(&recorded[0]));
    }
}
