//! Speech settings and voices

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::reader::SettingsUpdate;
use crate::speech::{SpeechSettings, Voice, MAX_SPEED, MIN_SPEED};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    #[serde(flatten)]
    pub settings: SpeechSettings,
    pub min_speed: u32,
    pub max_speed: u32,
}

impl From<SpeechSettings> for SettingsResponse {
    fn from(settings: SpeechSettings) -> Self {
        Self {
            settings,
            min_speed: MIN_SPEED,
            max_speed: MAX_SPEED,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoicesResponse {
    pub engine: String,
    pub voices: Vec<Voice>,
    pub selected: usize,
}

/// Create the settings router
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_settings).put(update_settings))
}

async fn get_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    Json(state.controller().settings().into())
}

/// PUT /api/v1/settings - fields left out are unchanged
async fn update_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> Json<SettingsResponse> {
    Json(state.controller().update_settings(update).await.into())
}

/// GET /api/v1/voices
pub async fn list_voices(State(state): State<AppState>) -> Json<VoicesResponse> {
    let controller = state.controller();
    Json(VoicesResponse {
        engine: controller.engine_name().to_string(),
        voices: controller.voices(),
        selected: controller.settings().voice_idx,
    })
}
