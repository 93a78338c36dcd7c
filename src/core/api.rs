//! HTTP + WebSocket API for (re)Route
//!
//! Endpoints:
//! - POST /walk/new          - Create a walk
//! - GET  /walk/{id}         - Current branch + tracking snapshot
//! - POST /walk/{id}/mood    - Submit mood text
//! - POST /walk/{id}/duration - Answer the duration prompt
//! - POST /walk/{id}/place   - Pick a place option (by shown index)
//! - POST /walk/{id}/more    - Load more place options
//! - POST /walk/{id}/another - Ask for a different route
//! - POST /walk/{id}/start   - Begin navigating
//! - POST /walk/{id}/position - Feed one position sample
//! - POST /walk/{id}/exit    - Leave the walk
//! - WS   /ws/{id}           - Live updates
//! - GET  /health            - Health check

use futures_util::{SinkExt, StreamExt};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::core::search::in_service_area;
use crate::core::service::DemoService;
use crate::core::session::WalkSession;
use crate::core::tracker::NavigationTracker;
use crate::types::geo::{GeoUpdate, Position};
use crate::types::outcome::{ConversationOutcome, MoodQuery};
use crate::types::session::{NavEvent, NavSnapshot, StartPoint};
use crate::types::WalkError;

/// One client's walk: conversation plus tracking
pub struct Walk {
    pub id: String,
    pub origin: Position,
    pub session: WalkSession<DemoService>,
    pub tracker: NavigationTracker,
    pub update_tx: broadcast::Sender<WalkUpdate>,
}

/// Live update message pushed over the WebSocket
#[derive(Debug, Clone, Serialize)]
pub struct WalkUpdate {
    pub phase: String,
    pub branch: Option<String>,
    pub snapshot: NavSnapshot,
    pub events: Vec<NavEvent>,
}

/// App state
pub struct AppState {
    pub walks: RwLock<HashMap<String, Walk>>,
    pub service: Arc<DemoService>,
}

#[derive(Debug, Deserialize)]
pub struct NewWalkRequest {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct NewWalkResponse {
    pub walk_id: String,
    pub websocket_url: String,
}

#[derive(Debug, Deserialize)]
pub struct MoodRequest {
    pub text: String,
    pub force_night_mode: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct DurationRequest {
    pub minutes: u32,
}

#[derive(Debug, Deserialize)]
pub struct PlaceRequest {
    /// Index into the currently shown options
    pub index: usize,
}

/// Shared status body returned by every conversation endpoint
#[derive(Debug, Serialize)]
pub struct WalkStatusResponse {
    pub walk_id: String,
    pub phase: String,
    pub branch: Option<String>,
    pub outcome: Option<ConversationOutcome>,
    pub message: Option<String>,
    pub snapshot: NavSnapshot,
}

#[derive(Debug, Serialize)]
pub struct PositionResponse {
    pub phase: String,
    pub events: Vec<NavEvent>,
    pub snapshot: NavSnapshot,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub walks_active: usize,
}

/// Create the API router
pub fn create_router() -> Router {
    let state = Arc::new(AppState {
        walks: RwLock::new(HashMap::new()),
        service: Arc::new(DemoService::new()),
    });

    Router::new()
        .route("/health", get(health))
        .route("/walk/new", post(create_walk))
        .route("/walk/:id", get(get_walk))
        .route("/walk/:id/mood", post(submit_mood))
        .route("/walk/:id/duration", post(pick_duration))
        .route("/walk/:id/place", post(pick_place))
        .route("/walk/:id/more", post(load_more))
        .route("/walk/:id/another", post(try_another))
        .route("/walk/:id/start", post(start_walk))
        .route("/walk/:id/position", post(push_position))
        .route("/walk/:id/exit", post(exit_walk))
        .route("/ws/:id", get(websocket_handler))
        .with_state(state)
}

fn status_of(walk: &Walk) -> WalkStatusResponse {
    WalkStatusResponse {
        walk_id: walk.id.clone(),
        phase: walk.tracker.phase().to_string(),
        branch: walk.session.outcome().map(|o| o.branch_name().to_string()),
        outcome: walk.session.outcome().cloned(),
        message: walk.session.last_message().map(str::to_string),
        snapshot: walk.tracker.snapshot(),
    }
}

/// Keep the tracker bound to the active route. Any outcome other than a
/// route result clears the map. An unchanged route is left alone, so a
/// no-op conversation turn cannot tear down live navigation.
fn sync_tracker(walk: &mut Walk) {
    match walk.session.outcome() {
        Some(ConversationOutcome::RouteResult(rec)) => {
            if walk.tracker.route() != Some(&rec.recommended) {
                walk.tracker.show_route(rec.recommended.clone(), rec.is_loop);
            }
        }
        _ => walk.tracker.exit(),
    }
}

fn broadcast_update(walk: &Walk, events: Vec<NavEvent>) {
    let _ = walk.update_tx.send(WalkUpdate {
        phase: walk.tracker.phase().to_string(),
        branch: walk.session.outcome().map(|o| o.branch_name().to_string()),
        snapshot: walk.tracker.snapshot(),
        events,
    });
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let walks = state.walks.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        walks_active: walks.len(),
    })
}

/// Create a walk anchored at the given origin (default: central Barcelona)
async fn create_walk(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewWalkRequest>,
) -> Result<Json<NewWalkResponse>, StatusCode> {
    let walk_id = generate_walk_id();
    let (tx, _) = broadcast::channel(100);

    let walk = Walk {
        id: walk_id.clone(),
        origin: Position::new(req.lat.unwrap_or(41.3874), req.lng.unwrap_or(2.1686)),
        session: WalkSession::new(state.service.clone()),
        tracker: NavigationTracker::new(),
        update_tx: tx,
    };

    let mut walks = state.walks.write().await;
    walks.insert(walk_id.clone(), walk);

    Ok(Json(NewWalkResponse {
        walk_id: walk_id.clone(),
        websocket_url: format!("/ws/{}", walk_id),
    }))
}

async fn get_walk(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WalkStatusResponse>, StatusCode> {
    let walks = state.walks.read().await;
    let walk = walks.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(status_of(walk)))
}

/// Submit mood text. Resolution failures come back as a message on the
/// unchanged pre-call state, not as an HTTP error.
async fn submit_mood(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<MoodRequest>,
) -> Result<Json<WalkStatusResponse>, StatusCode> {
    let mut walks = state.walks.write().await;
    let walk = walks.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;

    let mut query = MoodQuery::new(walk.origin, req.text);
    query.force_night_mode = req.force_night_mode.unwrap_or(false);
    let _ = walk.session.submit(query).await;

    sync_tracker(walk);
    broadcast_update(walk, Vec::new());
    Ok(Json(status_of(walk)))
}

async fn pick_duration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<DurationRequest>,
) -> Result<Json<WalkStatusResponse>, StatusCode> {
    let mut walks = state.walks.write().await;
    let walk = walks.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;

    let _ = walk.session.pick_duration(req.minutes).await;
    sync_tracker(walk);
    broadcast_update(walk, Vec::new());
    Ok(Json(status_of(walk)))
}

async fn pick_place(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PlaceRequest>,
) -> Result<Json<WalkStatusResponse>, StatusCode> {
    let mut walks = state.walks.write().await;
    let walk = walks.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;

    let option = match walk.session.outcome() {
        Some(ConversationOutcome::PlaceOptions(pc)) => pc.shown().get(req.index).cloned(),
        _ => None,
    };
    let option = option.ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;

    let _ = walk.session.pick_place(option).await;
    sync_tracker(walk);
    broadcast_update(walk, Vec::new());
    Ok(Json(status_of(walk)))
}

async fn load_more(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WalkStatusResponse>, StatusCode> {
    let mut walks = state.walks.write().await;
    let walk = walks.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;

    let _ = walk.session.load_more_places().await;
    broadcast_update(walk, Vec::new());
    Ok(Json(status_of(walk)))
}

async fn try_another(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WalkStatusResponse>, StatusCode> {
    let mut walks = state.walks.write().await;
    let walk = walks.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;

    let _ = walk.session.try_another().await;
    sync_tracker(walk);
    broadcast_update(walk, Vec::new());
    Ok(Json(status_of(walk)))
}

/// Begin navigating. A refused transition (too far from a custom start,
/// out-of-area point) surfaces as a transient advisory, not an error.
async fn start_walk(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(start): Json<StartPoint>,
) -> Result<Json<WalkStatusResponse>, StatusCode> {
    let mut walks = state.walks.write().await;
    let walk = walks.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;

    let mut events = Vec::new();
    let refused = match &start {
        StartPoint::Custom { coords, .. } if !in_service_area(coords.lat(), coords.lng()) => {
            Some(WalkError::OutOfBounds.user_message())
        }
        _ => walk.tracker.start(&start).err().map(|e| e.user_message()),
    };
    if let Some(message) = refused {
        events.push(NavEvent::Advisory { message });
    }
    broadcast_update(walk, events);
    Ok(Json(status_of(walk)))
}

/// Feed one position sample and return whatever it triggered
async fn push_position(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<GeoUpdate>,
) -> Result<Json<PositionResponse>, StatusCode> {
    let mut walks = state.walks.write().await;
    let walk = walks.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;

    let events = walk.tracker.on_position(update);
    broadcast_update(walk, events.clone());
    Ok(Json(PositionResponse {
        phase: walk.tracker.phase().to_string(),
        events,
        snapshot: walk.tracker.snapshot(),
    }))
}

async fn exit_walk(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WalkStatusResponse>, StatusCode> {
    let mut walks = state.walks.write().await;
    let walk = walks.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;

    walk.tracker.exit();
    walk.session.clear();
    broadcast_update(walk, Vec::new());
    Ok(Json(status_of(walk)))
}

/// WebSocket handler for live updates
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, StatusCode> {
    let walks = state.walks.read().await;
    let walk = walks.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let rx = walk.update_tx.subscribe();
    drop(walks);

    Ok(ws.on_upgrade(move |socket| async move {
        handle_websocket(socket, rx).await;
    }))
}

async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<WalkUpdate>) {
    let (mut sender, mut receiver) = socket.split();
    loop {
        tokio::select! {
            update = rx.recv() => {
                let update = match update {
                    Ok(update) => update,
                    Err(_) => break,
                };
                let json = serde_json::to_string(&update).unwrap_or_default();
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }
}

fn generate_walk_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("walk_{:x}", nanos as u64)
}

/// Run the API server
pub async fn run_server(addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let router = create_router();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("(re)Route API running on {}", addr);
    println!("  POST /walk/new           - Create walk");
    println!("  GET  /walk/:id           - Current status");
    println!("  POST /walk/:id/mood      - Submit mood text");
    println!("  POST /walk/:id/duration  - Answer duration prompt");
    println!("  POST /walk/:id/place     - Pick a place option");
    println!("  POST /walk/:id/more      - More place options");
    println!("  POST /walk/:id/another   - Different route");
    println!("  POST /walk/:id/start     - Start navigating");
    println!("  POST /walk/:id/position  - Position sample");
    println!("  POST /walk/:id/exit      - Leave the walk");
    println!("  WS   /ws/:id             - Live updates");
    println!("  GET  /health             - Health check");
    axum::serve(listener, router).await?;
    Ok(())
}
