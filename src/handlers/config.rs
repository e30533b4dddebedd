use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": {
            "server": {
                "host": config.server.host,
                "port": config.server.port
            },
            "storage": {
                "uploads_dir": config.storage.uploads_dir
            },
            "voice": {
                "inactivity_timeout_secs": config.voice.inactivity_timeout_secs,
                "max_chunk_bytes": config.voice.max_chunk_bytes,
                "assumed_bytes_per_sec": config.voice.assumed_bytes_per_sec
            },
            "synthesis": {
                "endpoint": config.synthesis.endpoint,
                "request_timeout_secs": config.synthesis.request_timeout_secs
            }
        }
    })))
}

pub async fn update_config(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, AppError> {
    let json_str = serde_json::to_string(&body.into_inner())?;

    let mut current_config = state.get_config();
    current_config.update_from_json(&json_str)?;

    state
        .update_config(current_config.clone())
        .map_err(AppError::ValidationError)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Configuration updated successfully",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "updated_config": {
            "server": {
                "host": current_config.server.host,
                "port": current_config.server.port
            },
            "storage": {
                "uploads_dir": current_config.storage.uploads_dir
            },
            "voice": {
                "inactivity_timeout_secs": current_config.voice.inactivity_timeout_secs,
                "max_chunk_bytes": current_config.voice.max_chunk_bytes,
                "assumed_bytes_per_sec": current_config.voice.assumed_bytes_per_sec
            },
            "synthesis": {
                "endpoint": current_config.synthesis.endpoint,
                "request_timeout_secs": current_config.synthesis.request_timeout_secs
            }
        }
    })))
}
