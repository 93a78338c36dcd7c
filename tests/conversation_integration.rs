//! Integration tests for the conversation flow
//!
//! Drives `WalkSession` end to end through scripted and demo backends:
//! branch resolution, duration prompts, place disambiguation with paging,
//! and route re-query.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use reroute::core::classify::{EdgeCasePayload, RawMoodResponse};
use reroute::core::{DemoService, ScriptedService, WalkSession};
use reroute::types::{
    ConversationOutcome, Highlight, Intent, LngLat, MoodQuery, Pattern, PlaceOption, Position,
    RoutePlan,
};

fn origin() -> Position {
    Position::new(41.3874, 2.1686)
}

fn query(text: &str) -> MoodQuery {
    MoodQuery::new(origin(), text)
}

fn route() -> RoutePlan {
    RoutePlan {
        coordinates: vec![LngLat(2.17, 41.38), LngLat(2.18, 41.39)],
        duration_seconds: 1200,
        distance_meters: 1600.0,
        summary: "seafront stroll".into(),
        highlights: vec![],
        pois: vec![],
    }
}

fn place(i: usize) -> PlaceOption {
    PlaceOption {
        lat: 41.38 + i as f64 * 0.002,
        lng: 2.17,
        name: format!("Place {}", i),
        id: Some(format!("place_{}", i)),
        rating: Some(4.2),
        description: None,
        photo_url: None,
        primary_type: Some("museum".into()),
        qualifier_verified: None,
        qualifier_reason: None,
        qualifier_source: None,
    }
}

#[tokio::test]
async fn test_edge_case_then_successful_resubmission() {
    let service = Arc::new(ScriptedService::new());
    service.push_response(Ok(RawMoodResponse {
        edge_case: Some(EdgeCasePayload {
            message: "I can't route you to the moon.".into(),
            suggestion: Some("surprise me".into()),
            theme_name: None,
        }),
        ..Default::default()
    }));
    service.push_response(Ok(RawMoodResponse {
        route: Some(route()),
        ..Default::default()
    }));
    let mut session = WalkSession::new(service);

    session.submit(query("walk to the moon")).await.unwrap();
    assert_eq!(session.outcome().unwrap().branch_name(), "edge_case");

    // The suggested retry resolves normally and replaces the edge case
    session.submit(query("surprise me")).await.unwrap();
    assert_eq!(session.outcome().unwrap().branch_name(), "route_result");
}

#[tokio::test]
async fn test_place_paging_forwards_shown_identities() {
    let service = Arc::new(ScriptedService::new());
    service.push_response(Ok(RawMoodResponse {
        place_options: Some((0..6).map(place).collect()),
        intent: Some(Intent::Discover),
        heading: Some("Which museum?".into()),
        ..Default::default()
    }));
    service.push_page(vec![place(6), place(7)]);
    let mut session = WalkSession::new(service.clone());

    session.submit(query("take me to a museum")).await.unwrap();
    let shown_before = match session.outcome().unwrap() {
        ConversationOutcome::PlaceOptions(pc) => {
            assert_eq!(pc.shown().len(), 5);
            pc.shown_identities()
        }
        other => panic!("expected place options, got {}", other.branch_name()),
    };

    session.load_more_places().await.unwrap();
    match session.outcome().unwrap() {
        ConversationOutcome::PlaceOptions(pc) => {
            // The page is appended; nothing already shown was replaced
            assert_eq!(pc.shown().len(), 8);
            assert_eq!(pc.heading, "Which museum?");
        }
        other => panic!("expected place options, got {}", other.branch_name()),
    }

    let exclusions = service.recorded_exclusions.lock().unwrap();
    assert_eq!(exclusions.len(), 1);
    for identity in shown_before {
        assert!(exclusions[0].contains(&identity));
    }
}

#[tokio::test]
async fn test_pick_place_fills_destination_from_option() {
    let service = Arc::new(ScriptedService::new());
    service.push_response(Ok(RawMoodResponse {
        place_options: Some(vec![PlaceOption {
            photo_url: Some("option.jpg".into()),
            rating: Some(4.8),
            ..place(0)
        }]),
        ..Default::default()
    }));
    // Server answers with a bare route: no destination metadata at all
    service.push_response(Ok(RawMoodResponse {
        route: Some(route()),
        pattern: Some(Pattern::DestinationFixed),
        ..Default::default()
    }));
    let mut session = WalkSession::new(service);

    session.submit(query("somewhere nice")).await.unwrap();
    let option = match session.outcome().unwrap() {
        ConversationOutcome::PlaceOptions(pc) => pc.shown()[0].clone(),
        other => panic!("expected place options, got {}", other.branch_name()),
    };
    session.pick_place(option).await.unwrap();

    match session.outcome().unwrap() {
        ConversationOutcome::RouteResult(rec) => {
            assert_eq!(rec.destination_name.as_deref(), Some("Place 0"));
            assert_eq!(rec.destination_photo.as_deref(), Some("option.jpg"));
            assert_eq!(rec.destination_rating, Some(4.8));
        }
        other => panic!("expected route result, got {}", other.branch_name()),
    }
}

#[tokio::test]
async fn test_pick_place_prefers_server_highlight_name_but_option_photo() {
    let mut server_route = route();
    server_route.highlights.push(Highlight {
        lat: 41.39,
        lng: 2.18,
        name: "Museu Picasso (Carrer Montcada)".into(),
        kind: "destination".into(),
        description: None,
        photo_url: Some("server.jpg".into()),
    });

    let service = Arc::new(ScriptedService::new());
    service.push_response(Ok(RawMoodResponse {
        place_options: Some(vec![PlaceOption {
            photo_url: Some("option.jpg".into()),
            ..place(0)
        }]),
        ..Default::default()
    }));
    service.push_response(Ok(RawMoodResponse {
        route: Some(server_route),
        pattern: Some(Pattern::DestinationFixed),
        ..Default::default()
    }));
    let mut session = WalkSession::new(service);

    session.submit(query("somewhere nice")).await.unwrap();
    let option = match session.outcome().unwrap() {
        ConversationOutcome::PlaceOptions(pc) => pc.shown()[0].clone(),
        other => panic!("expected place options, got {}", other.branch_name()),
    };
    session.pick_place(option).await.unwrap();

    match session.outcome().unwrap() {
        ConversationOutcome::RouteResult(rec) => {
            assert_eq!(
                rec.display_destination_name().as_deref(),
                Some("Museu Picasso (Carrer Montcada)")
            );
            assert_eq!(rec.destination_photo.as_deref(), Some("option.jpg"));
        }
        other => panic!("expected route result, got {}", other.branch_name()),
    }
}

#[tokio::test]
async fn test_demo_duration_flow() {
    let mut session = WalkSession::new(Arc::new(DemoService::new()));

    session.submit(query("quick coffee break")).await.unwrap();
    let minutes = match session.outcome().unwrap() {
        ConversationOutcome::DurationPrompt { options, .. } => {
            assert!(!options.is_empty());
            options[0].minutes
        }
        other => panic!("expected duration prompt, got {}", other.branch_name()),
    };

    session.pick_duration(minutes).await.unwrap();
    match session.outcome().unwrap() {
        ConversationOutcome::RouteResult(rec) => {
            assert_eq!(rec.pattern, Pattern::MoodWithDuration);
            assert!(rec.is_loop);
            assert!(rec.recommended.is_navigable());
        }
        other => panic!("expected route result, got {}", other.branch_name()),
    }
}

#[tokio::test]
async fn test_demo_place_flow_resolves_fixed_destination() {
    let mut session = WalkSession::new(Arc::new(DemoService::new()));

    session.submit(query("take me to a museum")).await.unwrap();
    let option = match session.outcome().unwrap() {
        ConversationOutcome::PlaceOptions(pc) => pc.shown()[0].clone(),
        other => panic!("expected place options, got {}", other.branch_name()),
    };
    let picked_name = option.name.clone();

    session.pick_place(option).await.unwrap();
    match session.outcome().unwrap() {
        ConversationOutcome::RouteResult(rec) => {
            assert_eq!(rec.pattern, Pattern::DestinationFixed);
            assert_eq!(rec.display_destination_name(), Some(picked_name));
            assert!(!rec.is_loop);
        }
        other => panic!("expected route result, got {}", other.branch_name()),
    }
}

#[tokio::test]
async fn test_try_another_replaces_the_route() {
    let service = Arc::new(ScriptedService::new());
    let mut first = route();
    first.summary = "first".into();
    let mut second = route();
    second.summary = "second".into();
    service.push_response(Ok(RawMoodResponse {
        route: Some(first),
        pattern: Some(Pattern::AreaExploration),
        ..Default::default()
    }));
    service.push_response(Ok(RawMoodResponse {
        route: Some(second),
        pattern: Some(Pattern::AreaExploration),
        ..Default::default()
    }));
    let mut session = WalkSession::new(service);

    session.submit(query("wander a bit")).await.unwrap();
    session.try_another().await.unwrap();
    match session.outcome().unwrap() {
        ConversationOutcome::RouteResult(rec) => {
            assert_eq!(rec.recommended.summary, "second");
        }
        other => panic!("expected route result, got {}", other.branch_name()),
    }
}
