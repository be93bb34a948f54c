//! Playback Routes
//!
//! Endpoints:
//! - POST /api/v1/playback/play
//! - POST /api/v1/playback/pause
//! - POST /api/v1/playback/next
//! - POST /api/v1/playback/previous
//! - POST /api/v1/playback/goto - `{ "page": n }`

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reader::PlaybackSnapshot;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackResponse {
    /// Whether the action changed anything
    pub changed: bool,
    #[serde(flatten)]
    pub state: PlaybackSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct GoToRequest {
    pub page: usize,
}

/// Create the playback router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/play", post(play))
        .route("/pause", post(pause))
        .route("/next", post(next))
        .route("/previous", post(previous))
        .route("/goto", post(go_to))
}

fn respond(state: &AppState, changed: bool) -> Json<PlaybackResponse> {
    Json(PlaybackResponse {
        changed,
        state: state.controller().snapshot(),
    })
}

async fn play(State(state): State<AppState>) -> Result<Json<PlaybackResponse>> {
    // The read loop runs detached; status is polled
    let started = state.controller().play().await?.is_some();
    Ok(respond(&state, started))
}

async fn pause(State(state): State<AppState>) -> Json<PlaybackResponse> {
    let changed = state.controller().pause().await;
    respond(&state, changed)
}

async fn next(State(state): State<AppState>) -> Json<PlaybackResponse> {
    let changed = state.controller().next_page().await;
    respond(&state, changed)
}

async fn previous(State(state): State<AppState>) -> Json<PlaybackResponse> {
    let changed = state.controller().previous_page().await;
    respond(&state, changed)
}

async fn go_to(
    State(state): State<AppState>,
    Json(request): Json<GoToRequest>,
) -> Json<PlaybackResponse> {
    let changed = state.controller().go_to_page(request.page).await;
    respond(&state, changed)
}
