//! Playback status, polled by the UI

use axum::{extract::State, Json};
use serde::Serialize;

use crate::reader::PlaybackSnapshot;
use crate::state::{AppState, LoadProgress};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(flatten)]
    pub playback: PlaybackSnapshot,
    /// Present while an upload is being processed
    pub loading: Option<LoadProgress>,
}

/// GET /api/v1/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        playback: state.controller().snapshot(),
        loading: state.loading(),
    })
}
