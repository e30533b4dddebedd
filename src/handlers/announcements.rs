//! # Announcement Handlers
//!
//! Text-to-speech announcements enter here; recorded voice announcements
//! arrive over the WebSocket instead (see `websocket`). The request returns
//! as soon as the text is accepted — synthesis runs against an external
//! provider, so failures surface asynchronously as `announcement_failed`
//! events rather than HTTP errors.

use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct TextToSpeechRequest {
    pub text: String,
}

pub async fn text_to_speech(
    state: web::Data<AppState>,
    body: web::Json<TextToSpeechRequest>,
) -> Result<HttpResponse, AppError> {
    state.voice.synthesize_and_play(&body.text)?;

    Ok(HttpResponse::Accepted().json(json!({
        "status": "accepted",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
