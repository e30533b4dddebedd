//! # WebSocket Event Channel
//!
//! The persistent connection every client holds: server→client it delivers
//! the event stream (`state_changed`, `audio_uploaded`,
//! `announcement_failed`), client→server it carries the voice recording
//! protocol.
//!
//! ## WebSocket Protocol:
//! 1. **Connection**: client connects to `/api/ws`; the actor registers
//!    itself with the event hub and starts receiving broadcasts
//! 2. **Voice recording**: `start_voice` opens a session (acked with
//!    `voice_started`), `voice_data` carries one base64-encoded chunk,
//!    `stop_voice` closes the session and plays the announcement
//! 3. **Heartbeat**: the server pings every 30s and drops connections that
//!    stay silent for 60s
//! 4. **Disconnect**: the actor unregisters from the hub; an abandoned
//!    voice session is reclaimed by the ingest inactivity timeout rather
//!    than by the disconnect itself
//!
//! Chunk payloads are base64 text because the reference client records with
//! `MediaRecorder` and ships `FileReader.readAsDataURL` output; a
//! `data:...;base64,` prefix is therefore tolerated and stripped.

use crate::error::AppError;
use crate::events::{EventHub, PushEvent};
use crate::state::AppState;
use crate::voice::VoiceIngest;
use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How often the server pings idle connections.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// How long a connection may stay silent before it is dropped.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Messages a client may send.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a voice recording session
    StartVoice,

    /// One chunk of recorded voice data for the active session
    VoiceData {
        session_id: Uuid,
        /// Base64 payload; a data-URL prefix is tolerated
        data: String,
    },

    /// Close the voice session and play the announcement
    StopVoice { session_id: Uuid },

    /// Heartbeat reply
    Pong { timestamp: u64 },
}

/// Messages the server sends outside the broadcast event stream.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Ack for `start_voice`, carrying the new session id
    VoiceStarted { session_id: Uuid },

    /// Ack for `stop_voice`
    VoiceStopped { session_id: Uuid },

    /// Request-level error on this connection
    Error { code: String, message: String },

    /// Heartbeat
    Ping { timestamp: u64 },
}

/// Decode a base64 chunk payload, stripping any data-URL prefix.
fn decode_chunk(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let encoded = match data.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    base64::engine::general_purpose::STANDARD.decode(encoded)
}

/// Machine-readable error code for WS-level error replies.
fn error_code(err: &AppError) -> &'static str {
    match err {
        AppError::UnknownSession(_) => "unknown_session",
        AppError::SessionAlreadyActive => "session_already_active",
        AppError::BadRequest(_) => "bad_request",
        _ => "voice_error",
    }
}

/// One actor per connected client.
pub struct ClientWebSocket {
    /// Connection identity used in the hub's observer registry
    id: Uuid,
    hub: Arc<EventHub>,
    voice: Arc<VoiceIngest>,
    last_heartbeat: Instant,
}

impl ClientWebSocket {
    pub fn new(hub: Arc<EventHub>, voice: Arc<VoiceIngest>) -> Self {
        Self {
            id: Uuid::new_v4(),
            hub,
            voice,
            last_heartbeat: Instant::now(),
        }
    }

    fn send(&self, ctx: &mut ws::WebsocketContext<Self>, msg: &ServerMessage) {
        if let Ok(json) = serde_json::to_string(msg) {
            ctx.text(json);
        }
    }

    fn send_error(&self, ctx: &mut ws::WebsocketContext<Self>, err: &AppError) {
        warn!("WebSocket {} error: {}", self.id, err);
        self.send(
            ctx,
            &ServerMessage::Error {
                code: error_code(err).to_string(),
                message: err.to_string(),
            },
        );
    }

    fn handle_client_message(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match msg {
            ClientMessage::StartVoice => match self.voice.begin_session() {
                Ok(session_id) => {
                    info!("Connection {} opened voice session {}", self.id, session_id);
                    self.send(ctx, &ServerMessage::VoiceStarted { session_id });
                }
                Err(err) => self.send_error(ctx, &err),
            },
            ClientMessage::VoiceData { session_id, data } => {
                let bytes = match decode_chunk(&data) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        self.send_error(
                            ctx,
                            &AppError::BadRequest(format!("undecodable voice chunk: {}", err)),
                        );
                        return;
                    }
                };
                debug!(
                    "Connection {} appended {} bytes to session {}",
                    self.id,
                    bytes.len(),
                    session_id
                );
                if let Err(err) = self.voice.append_chunk(session_id, bytes) {
                    self.send_error(ctx, &err);
                }
            }
            ClientMessage::StopVoice { session_id } => match self.voice.end_session(session_id) {
                Ok(()) => self.send(ctx, &ServerMessage::VoiceStopped { session_id }),
                Err(err) => self.send_error(ctx, &err),
            },
            ClientMessage::Pong { .. } => {
                self.last_heartbeat = Instant::now();
            }
        }
    }
}

impl Actor for ClientWebSocket {
    type Context = ws::WebsocketContext<Self>;

    /// Register with the hub and start the heartbeat.
    fn started(&mut self, ctx: &mut Self::Context) {
        info!("WebSocket connection {} started", self.id);
        self.hub.register(self.id, ctx.address().recipient());

        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > CLIENT_TIMEOUT {
                warn!("WebSocket {} heartbeat timeout, closing connection", act.id);
                ctx.stop();
                return;
            }

            let ping = ServerMessage::Ping {
                timestamp: chrono::Utc::now().timestamp_millis() as u64,
            };
            if let Ok(json) = serde_json::to_string(&ping) {
                ctx.text(json);
            }
        });
    }

    /// Unregister so broadcasts stop targeting this connection. Any voice
    /// session this client abandoned is reclaimed by the ingest timeout.
    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!("WebSocket connection {} stopped", self.id);
        self.hub.unregister(self.id);
    }
}

/// Broadcast events pushed by the hub.
impl Handler<PushEvent> for ClientWebSocket {
    type Result = ();

    fn handle(&mut self, msg: PushEvent, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ClientWebSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(message) => self.handle_client_message(message, ctx),
                Err(err) => self.send_error(
                    ctx,
                    &AppError::BadRequest(format!("invalid message: {}", err)),
                ),
            },
            Ok(ws::Message::Binary(_)) => {
                // Chunks travel as base64 text; binary frames are not part
                // of the protocol
                self.send_error(
                    ctx,
                    &AppError::BadRequest("binary frames are not supported".to_string()),
                );
            }
            Ok(ws::Message::Ping(data)) => {
                ctx.pong(&data);
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                info!("WebSocket {} closed: {:?}", self.id, reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                warn!("Received unexpected continuation frame");
            }
            Ok(ws::Message::Nop) => {}
            Err(err) => {
                warn!("WebSocket protocol error on {}: {}", self.id, err);
                ctx.stop();
            }
        }
    }
}

/// WebSocket endpoint handler: upgrades the HTTP request and hands the
/// connection to a fresh actor.
pub async fn event_socket(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    info!(
        "New WebSocket connection request from: {:?}",
        req.connection_info().peer_addr()
    );

    let socket = ClientWebSocket::new(app_state.hub.clone(), app_state.voice.clone());
    ws::start(socket, &req, stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_deserialization() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"start_voice"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::StartVoice));

        let id = Uuid::new_v4();
        let json = format!(
            r#"{{"type":"voice_data","session_id":"{}","data":"QUJD"}}"#,
            id
        );
        match serde_json::from_str::<ClientMessage>(&json).unwrap() {
            ClientMessage::VoiceData { session_id, data } => {
                assert_eq!(session_id, id);
                assert_eq!(data, "QUJD");
            }
            other => panic!("wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_server_message_serialization() {
        let id = Uuid::new_v4();
        let json = serde_json::to_string(&ServerMessage::VoiceStarted { session_id: id }).unwrap();
        assert!(json.contains(r#""type":"voice_started""#));
        assert!(json.contains(&id.to_string()));
    }

    #[test]
    fn test_decode_chunk_plain_base64() {
        assert_eq!(decode_chunk("QUJD").unwrap(), b"ABC");
    }

    #[test]
    fn test_decode_chunk_strips_data_url_prefix() {
        assert_eq!(
            decode_chunk("data:audio/webm;base64,QUJD").unwrap(),
            b"ABC"
        );
    }

    #[test]
    fn test_decode_chunk_rejects_garbage() {
        assert!(decode_chunk("not base64 at all!!!").is_err());
    }

    #[test]
    fn test_error_codes_are_specific() {
        assert_eq!(error_code(&AppError::UnknownSession("x".into())), "unknown_session");
        assert_eq!(
            error_code(&AppError::SessionAlreadyActive),
            "session_already_active"
        );
        assert_eq!(error_code(&AppError::EmptyText), "voice_error");
    }
}
