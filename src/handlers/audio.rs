//! # Audio Library and Playback Control Handlers
//!
//! HTTP endpoints for the uploaded-audio catalog and the playback controls
//! every client shares:
//! - `GET  /audio/files` - ordered catalog listing
//! - `POST /audio/upload` - multipart upload into the catalog
//! - `POST /audio/play/{id}` - start local-file playback
//! - `POST /audio/volume` - apply a clamped volume level
//! - `POST /audio/stop` - stop whatever is playing

use crate::error::AppError;
use crate::playback::TrackRef;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// Request body for `POST /audio/volume`.
///
/// The level is a plain integer so out-of-range values reach the controller
/// and are clamped there, observably, instead of being rejected by
/// deserialization.
#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    pub volume: i64,
}

pub async fn list_files(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(state.library.list()))
}

/// Accept a multipart upload with the audio file in a field named "file".
pub async fn upload_audio(
    state: web::Data<AppState>,
    mut payload: actix_multipart::Multipart,
) -> Result<HttpResponse, AppError> {
    use futures_util::stream::StreamExt;

    let mut content: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field = item
            .map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;

        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| AppError::BadRequest("Missing content disposition".to_string()))?;

        let field_name = content_disposition
            .get_name()
            .ok_or_else(|| AppError::BadRequest("Missing field name".to_string()))?;

        if field_name == "file" {
            filename = content_disposition.get_filename().map(|s| s.to_string());

            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk =
                    chunk.map_err(|e| AppError::BadRequest(format!("Chunk error: {}", e)))?;
                bytes.extend_from_slice(&chunk);
            }

            content = Some(bytes);
        }
    }

    let content =
        content.ok_or_else(|| AppError::BadRequest("No file field provided".to_string()))?;
    let filename =
        filename.ok_or_else(|| AppError::BadRequest("Upload carries no filename".to_string()))?;

    let meta = state.library.upload(&filename, &content).await?;
    Ok(HttpResponse::Ok().json(meta))
}

pub async fn play_file(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let file = state.library.get(path.into_inner())?;

    let playback_state = state.controller.request_play(TrackRef::Local {
        file_id: file.id,
        filename: file.filename.clone(),
        path: file.stored_path.clone(),
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "playing",
        "file_id": file.id,
        "state": playback_state
    })))
}

pub async fn set_volume(
    state: web::Data<AppState>,
    body: web::Json<VolumeRequest>,
) -> Result<HttpResponse, AppError> {
    let playback_state = state.controller.set_volume(body.volume);

    Ok(HttpResponse::Ok().json(json!({
        "status": "volume_set",
        "volume": playback_state.volume,
        "state": playback_state
    })))
}

/// Always succeeds, playing or not.
pub async fn stop_playback(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let playback_state = state.controller.stop();

    Ok(HttpResponse::Ok().json(json!({
        "status": "stopped",
        "state": playback_state
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};

    macro_rules! test_app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(AppState::for_tests()))
                    .route("/audio/files", web::get().to(list_files))
                    .route("/audio/play/{id}", web::post().to(play_file))
                    .route("/audio/volume", web::post().to(set_volume))
                    .route("/audio/stop", web::post().to(stop_playback)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_empty_library_lists_as_empty_array() {
        let app = test_app!();

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/audio/files").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, serde_json::json!([]));
    }

    #[actix_web::test]
    async fn test_play_unknown_file_is_404() {
        let app = test_app!();

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/audio/play/{}", Uuid::new_v4()))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["type"], "not_found");
    }

    #[actix_web::test]
    async fn test_volume_endpoint_reports_clamped_value() {
        let app = test_app!();

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/audio/volume")
                .set_json(serde_json::json!({"volume": 150}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["volume"], 100);
    }

    #[actix_web::test]
    async fn test_stop_is_always_200() {
        let app = test_app!();

        for _ in 0..2 {
            let resp = test::call_service(
                &app,
                test::TestRequest::post().uri("/audio/stop").to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::OK);

            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body["status"], "stopped");
        }
    }
}
