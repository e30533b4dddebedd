//! Read access to the one "now playing" snapshot, for clients that want the
//! current picture without holding a WebSocket open.

use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};

pub async fn get_playback_state(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.controller.current_state()))
}
