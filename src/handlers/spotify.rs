//! # Streaming-Service Handlers (Placeholder Integration)
//!
//! The real streaming integration is out of scope; these endpoints model
//! only its control-interface shape. `config` serves the placeholder
//! credentials a client needs to render its connect flow, and `play` routes
//! the request through the streaming adapter so arbitration and event
//! fan-out behave exactly as they will once the integration is real.

use crate::error::AppError;
use crate::playback::TrackRef;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct SpotifyPlayRequest {
    pub track_uri: String,
}

pub async fn get_spotify_config(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "client_id": config.spotify.client_id,
        "client_secret": config.spotify.client_secret,
        "redirect_uri": config.spotify.redirect_uri
    })))
}

pub async fn play_spotify(
    state: web::Data<AppState>,
    body: web::Json<SpotifyPlayRequest>,
) -> Result<HttpResponse, AppError> {
    let track_uri = body.into_inner().track_uri;
    if track_uri.trim().is_empty() {
        return Err(AppError::ValidationError("track_uri cannot be empty".to_string()));
    }

    let playback_state = state.controller.request_play(TrackRef::Streaming {
        track_uri: track_uri.clone(),
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "playing",
        "track": track_uri,
        "state": playback_state
    })))
}
